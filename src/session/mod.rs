//! Play sessions and single-quiz tests.
//!
//! The session logic never touches a terminal. Questions go out and answers
//! come back through an [`Interaction`], one at a time: the next question is
//! only issued after the previous answer has been scored.

/// Random play-through state machine.
pub mod play;

use std::future::Future;

use rand::Rng;

use crate::{quiz::Quiz, types::Score};

pub use play::{GameResult, PendingQuestion, PlayOutcome, PlaySession, SessionError, SessionState, Step};

/// Result of scoring one response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The response matched the stored answer.
    Correct,
    /// Anything else.
    Incorrect,
}

impl Verdict {
    /// Scores `response` against `quiz`.
    pub fn judge(quiz: &Quiz, response: &str) -> Self {
        if quiz.accepts(response) {
            Verdict::Correct
        } else {
            Verdict::Incorrect
        }
    }

    /// True for [`Verdict::Correct`].
    pub fn is_correct(self) -> bool {
        self == Verdict::Correct
    }
}

/// Question/answer channel to whoever is playing.
pub trait Interaction {
    /// Presents `question` and suspends until exactly one response arrives.
    ///
    /// `None` means the player went away; the caller stops without a result.
    fn ask(&mut self, question: &str) -> impl Future<Output = Option<String>>;

    /// Called by [`play`] after each scored response with the running score.
    fn answered(&mut self, _verdict: Verdict, _score: Score) {}
}

/// Runs `session` to completion.
///
/// Returns `None` if the interaction was closed mid-session.
pub async fn play<R, I>(session: &mut PlaySession, rng: &mut R, io: &mut I) -> Option<PlayOutcome>
where
    R: Rng,
    I: Interaction,
{
    loop {
        match session.next_question(rng) {
            Step::Finished(outcome) => return Some(outcome),
            Step::Ask(pending) => {
                let response = io.ask(pending.question()).await?;
                let (verdict, score) = pending.answer(&response);
                io.answered(verdict, score);
            }
        }
    }
}

/// Asks a single quiz once and scores the response.
///
/// Returns `None` if the interaction was closed before answering.
pub async fn test_quiz<I: Interaction>(quiz: &Quiz, io: &mut I) -> Option<Verdict> {
    let response = io.ask(&quiz.question).await?;
    Some(Verdict::judge(quiz, &response))
}
