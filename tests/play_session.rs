use std::collections::{HashSet, VecDeque};

use proptest::prelude::*;
use rand::{SeedableRng, rngs::StdRng};

use quizdeck::{
    quiz::Quiz,
    session::{GameResult, Interaction, PlaySession, SessionState, Verdict, play, test_quiz},
    types::Score,
};

/// Answers by looking the question up in the snapshot; a fixed set of
/// questions is answered wrongly.
struct Player {
    quizzes: Vec<Quiz>,
    wrong_on: HashSet<String>,
    asked: Vec<String>,
    scores: Vec<Score>,
    verdicts: Vec<Verdict>,
}

impl Player {
    fn new(quizzes: &[Quiz]) -> Self {
        Self {
            quizzes: quizzes.to_vec(),
            wrong_on: HashSet::new(),
            asked: Vec::new(),
            scores: Vec::new(),
            verdicts: Vec::new(),
        }
    }

    fn missing(mut self, question: &str) -> Self {
        self.wrong_on.insert(question.to_string());
        self
    }
}

impl Interaction for Player {
    async fn ask(&mut self, question: &str) -> Option<String> {
        self.asked.push(question.to_string());
        if self.wrong_on.contains(question) {
            return Some("definitely wrong".to_string());
        }
        let quiz = self.quizzes.iter().find(|q| q.question == question)?;
        Some(quiz.answer.to_lowercase())
    }

    fn answered(&mut self, verdict: Verdict, score: Score) {
        self.verdicts.push(verdict);
        self.scores.push(score);
    }
}

/// Replays canned responses, then reports closed input.
struct Scripted(VecDeque<&'static str>);

impl Interaction for Scripted {
    async fn ask(&mut self, _question: &str) -> Option<String> {
        self.0.pop_front().map(str::to_string)
    }
}

fn capitals() -> Vec<Quiz> {
    vec![
        Quiz::new("Capital of Italy", "Rome"),
        Quiz::new("Capital of France", "Paris"),
        Quiz::new("Capital of Spain", "Madrid"),
    ]
}

#[tokio::test]
async fn empty_store_wins_with_zero() {
    let mut session = PlaySession::new(Vec::new());
    let mut rng = StdRng::seed_from_u64(0);
    let mut io = Scripted(VecDeque::new());

    let outcome = play(&mut session, &mut rng, &mut io).await.expect("finished");
    assert_eq!(outcome.result, GameResult::Won);
    assert_eq!(outcome.score, 0);
    assert_eq!(outcome.asked, 0);
}

#[tokio::test]
async fn all_correct_wins_with_full_score() {
    let quizzes = capitals();
    let mut session = PlaySession::new(quizzes.clone());
    let mut rng = StdRng::seed_from_u64(42);
    let mut player = Player::new(&quizzes);

    let outcome = play(&mut session, &mut rng, &mut player).await.expect("finished");
    assert_eq!(outcome.result, GameResult::Won);
    assert_eq!(outcome.score, 3);
    assert_eq!(session.state(), SessionState::Won);
    assert_eq!(player.scores, vec![1, 2, 3]);

    let distinct: HashSet<_> = player.asked.iter().collect();
    assert_eq!(distinct.len(), 3);
}

#[tokio::test]
async fn first_miss_ends_with_prior_correct_count() {
    let quizzes = capitals();
    for seed in 0..20 {
        let mut session = PlaySession::new(quizzes.clone());
        let mut rng = StdRng::seed_from_u64(seed);
        let mut player = Player::new(&quizzes).missing("Capital of France");

        let outcome = play(&mut session, &mut rng, &mut player).await.expect("finished");
        let miss_at = player
            .asked
            .iter()
            .position(|q| q == "Capital of France")
            .expect("France was asked");

        assert_eq!(outcome.result, GameResult::Lost);
        assert_eq!(outcome.score as usize, miss_at);
        assert_eq!(player.asked.len(), miss_at + 1);
        assert_eq!(player.verdicts.last(), Some(&Verdict::Incorrect));
    }
}

#[tokio::test]
async fn closed_input_cancels_without_result() {
    let quizzes = capitals();
    let mut session = PlaySession::new(quizzes);
    let mut rng = StdRng::seed_from_u64(9);
    let mut io = Scripted(VecDeque::new());

    assert_eq!(play(&mut session, &mut rng, &mut io).await, None);
    assert!(matches!(session.state(), SessionState::AwaitingAnswer { .. }));
}

#[tokio::test]
async fn single_test_compares_case_insensitively_without_trimming() {
    let quiz = Quiz::new("2+2?", "4");
    assert_eq!(test_quiz(&quiz, &mut Scripted(["4"].into())).await, Some(Verdict::Correct));
    assert_eq!(test_quiz(&quiz, &mut Scripted(["five"].into())).await, Some(Verdict::Incorrect));

    let madrid = Quiz::new("Capital of Spain", "Madrid");
    assert_eq!(test_quiz(&madrid, &mut Scripted(["madrid"].into())).await, Some(Verdict::Correct));
    assert_eq!(test_quiz(&madrid, &mut Scripted([" Madrid"].into())).await, Some(Verdict::Incorrect));
    assert_eq!(test_quiz(&madrid, &mut Scripted(VecDeque::new())).await, None);
}

#[test]
fn draws_cover_every_key_over_many_seeds() {
    let quizzes: Vec<Quiz> = (0..4).map(|i| Quiz::new(format!("q{i}"), "x")).collect();
    let mut first_keys = HashSet::new();
    for seed in 0..64 {
        let mut session = PlaySession::new(quizzes.clone());
        let mut rng = StdRng::seed_from_u64(seed);
        if let quizdeck::session::Step::Ask(pending) = session.next_question(&mut rng) {
            first_keys.insert(pending.key());
        }
    }
    assert_eq!(first_keys.len(), 4);
}

proptest! {
    #[test]
    fn each_key_visited_at_most_once_and_score_tracks_answers(
        n in 0usize..12,
        seed in any::<u64>(),
        answers in prop::collection::vec(any::<bool>(), 12),
    ) {
        let quizzes: Vec<Quiz> = (0..n).map(|i| Quiz::new(format!("q{i}"), format!("a{i}"))).collect();
        let mut session = PlaySession::new(quizzes);
        let mut rng = StdRng::seed_from_u64(seed);
        let mut seen = HashSet::new();
        let mut last_score = 0;

        for round in 0.. {
            match session.next_question(&mut rng) {
                quizdeck::session::Step::Finished(outcome) => {
                    prop_assert_eq!(outcome.asked, seen.len());
                    let all_right = answers.iter().take(seen.len()).all(|a| *a);
                    let expected = if all_right { GameResult::Won } else { GameResult::Lost };
                    prop_assert_eq!(outcome.result, expected);
                    break;
                }
                quizdeck::session::Step::Ask(pending) => {
                    let key = pending.key();
                    prop_assert!(key < n);
                    prop_assert!(seen.insert(key), "key {} asked twice", key);
                    let response = if answers[round] { format!("A{key}") } else { "wrong".to_string() };
                    let (_, score) = pending.answer(&response);
                    prop_assert!(score >= last_score);
                    prop_assert!(score as usize <= seen.len());
                    last_score = score;
                }
            }
        }
    }
}
