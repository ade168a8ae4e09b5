//! Quiz record and the answer comparison rule.

use serde::{Deserialize, Serialize};

/// A question/answer pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quiz {
    /// Question text shown to the user.
    pub question: String,
    /// Expected answer.
    pub answer: String,
}

impl Quiz {
    /// Builds a quiz from anything string-like.
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }

    /// Returns true when `response` is accepted for this quiz.
    pub fn accepts(&self, response: &str) -> bool {
        answers_match(&self.answer, response)
    }
}

/// Compares a response against the stored answer.
///
/// Both sides are uppercased before an exact comparison. Surrounding
/// whitespace is significant: `" Madrid"` does not match `"Madrid"`.
pub fn answers_match(stored: &str, response: &str) -> bool {
    stored.to_uppercase() == response.to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comparison_ignores_case_only() {
        assert!(answers_match("madrid", "Madrid"));
        assert!(answers_match("MADRID", "madrid"));
        assert!(!answers_match("Madrid", " Madrid"));
        assert!(!answers_match("Madrid", "Madrid "));
        assert!(!answers_match("Madrid", "Madri"));
    }

    #[test]
    fn empty_answer_only_matches_empty_response() {
        let quiz = Quiz::new("Say nothing", "");
        assert!(quiz.accepts(""));
        assert!(!quiz.accepts(" "));
    }
}
