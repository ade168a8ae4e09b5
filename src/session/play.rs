use std::fmt;

use log::debug;
use rand::Rng;

use crate::{
    quiz::Quiz,
    types::{QuizKey, Score},
};

use super::Verdict;

/// How a finished session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameResult {
    /// Every quiz was answered correctly.
    Won,
    /// A response was wrong.
    Lost,
}

/// Final report of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayOutcome {
    /// Win or loss.
    pub result: GameResult,
    /// Correct answers given.
    pub score: Score,
    /// Questions asked, including the one answered wrongly.
    pub asked: usize,
}

/// Where the session is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Ready to draw the next quiz.
    Selecting,
    /// A question is out and unanswered.
    AwaitingAnswer {
        /// Snapshot key of the outstanding quiz.
        key: QuizKey,
    },
    /// Terminal: working set exhausted.
    Won,
    /// Terminal: a response was wrong.
    Lost,
}

/// Misuse of the session state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// [`PlaySession::submit`] was called with no question outstanding.
    NotAwaitingAnswer(SessionState),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::NotAwaitingAnswer(state) => {
                write!(f, "no question is awaiting an answer (state: {state:?})")
            }
        }
    }
}

impl std::error::Error for SessionError {}

/// Output of [`PlaySession::next_question`].
pub enum Step<'s> {
    /// A quiz was drawn; answer it through the pending question.
    Ask(PendingQuestion<'s>),
    /// The session is over.
    Finished(PlayOutcome),
}

/// The single outstanding question of a session.
///
/// Dropping it without answering leaves the session in
/// [`SessionState::AwaitingAnswer`]; [`PlaySession::submit`] can still resolve it.
pub struct PendingQuestion<'s> {
    session: &'s mut PlaySession,
    key: QuizKey,
}

impl PendingQuestion<'_> {
    /// Snapshot key of the drawn quiz.
    pub fn key(&self) -> QuizKey {
        self.key
    }

    /// Question text to present.
    pub fn question(&self) -> &str {
        &self.session.quizzes[self.key].question
    }

    /// Scores `response`; returns the verdict and the running score.
    pub fn answer(self, response: &str) -> (Verdict, Score) {
        let verdict = self.session.resolve(self.key, response);
        (verdict, self.session.score)
    }
}

/// One random play-through of a fixed quiz snapshot.
///
/// Each round draws uniformly from the keys not yet asked. A correct answer
/// scores a point and continues; the first wrong answer ends the session.
#[derive(Debug, Clone)]
pub struct PlaySession {
    quizzes: Vec<Quiz>,
    remaining: Vec<QuizKey>,
    asked: Vec<QuizKey>,
    score: Score,
    state: SessionState,
}

impl PlaySession {
    /// Starts a session over `snapshot`; later store changes are not seen.
    pub fn new(snapshot: Vec<Quiz>) -> Self {
        let remaining = (0..snapshot.len()).collect();
        Self {
            quizzes: snapshot,
            remaining,
            asked: Vec::new(),
            score: 0,
            state: SessionState::Selecting,
        }
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Correct answers so far.
    pub fn score(&self) -> Score {
        self.score
    }

    /// Keys not yet asked.
    pub fn remaining(&self) -> &[QuizKey] {
        &self.remaining
    }

    /// Keys asked so far, in order.
    pub fn asked(&self) -> &[QuizKey] {
        &self.asked
    }

    /// Number of quizzes in the snapshot.
    pub fn total(&self) -> usize {
        self.quizzes.len()
    }

    /// True once the session is won or lost.
    pub fn is_finished(&self) -> bool {
        matches!(self.state, SessionState::Won | SessionState::Lost)
    }

    /// Outcome of a finished session.
    pub fn outcome(&self) -> Option<PlayOutcome> {
        let result = match self.state {
            SessionState::Won => GameResult::Won,
            SessionState::Lost => GameResult::Lost,
            _ => return None,
        };
        Some(PlayOutcome {
            result,
            score: self.score,
            asked: self.asked.len(),
        })
    }

    /// Advances from `Selecting`.
    ///
    /// Draws the next quiz, or finishes with a win when none remain. While a
    /// question is outstanding the same question is handed out again, so at
    /// most one is ever open.
    pub fn next_question<R: Rng>(&mut self, rng: &mut R) -> Step<'_> {
        if let Some(outcome) = self.outcome() {
            return Step::Finished(outcome);
        }

        let key = match self.state {
            SessionState::AwaitingAnswer { key } => key,
            _ => {
                if self.remaining.is_empty() {
                    self.state = SessionState::Won;
                    debug!("play session won with score {}", self.score);
                    return Step::Finished(PlayOutcome {
                        result: GameResult::Won,
                        score: self.score,
                        asked: self.asked.len(),
                    });
                }
                let idx = rng.gen_range(0..self.remaining.len());
                let key = self.remaining.swap_remove(idx);
                self.asked.push(key);
                self.state = SessionState::AwaitingAnswer { key };
                key
            }
        };

        Step::Ask(PendingQuestion { session: self, key })
    }

    /// Scores a response to the outstanding question.
    pub fn submit(&mut self, response: &str) -> Result<Verdict, SessionError> {
        match self.state {
            SessionState::AwaitingAnswer { key } => Ok(self.resolve(key, response)),
            other => Err(SessionError::NotAwaitingAnswer(other)),
        }
    }

    fn resolve(&mut self, key: QuizKey, response: &str) -> Verdict {
        let verdict = Verdict::judge(&self.quizzes[key], response);
        match verdict {
            Verdict::Correct => {
                self.score += 1;
                self.state = SessionState::Selecting;
            }
            Verdict::Incorrect => {
                self.state = SessionState::Lost;
                debug!("play session lost on quiz {key} with score {}", self.score);
            }
        }
        verdict
    }
}
