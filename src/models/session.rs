//! Quiz session model
//!
//! A quiz session is one user's attempt at the questions of one category.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Quiz session entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuizSession {
    /// Unique identifier
    pub id: i64,
    /// Owning user
    pub user_id: i64,
    /// Category being quizzed
    pub category_id: i64,
    /// When the session was created
    pub started_at: DateTime<Utc>,
    /// When the session was finalized, if it was
    pub finished_at: Option<DateTime<Utc>>,
    /// Number of correct answers, set on finalization
    pub score: Option<i64>,
    /// Number of questions in the category at finalization
    pub total_questions: Option<i64>,
}

impl QuizSession {
    /// Create a new, open session.
    ///
    /// The ID will be set to 0 and should be assigned by the database.
    pub fn new(user_id: i64, category_id: i64) -> Self {
        Self {
            id: 0,
            user_id,
            category_id,
            started_at: Utc::now(),
            finished_at: None,
            score: None,
            total_questions: None,
        }
    }

    /// Whether the session has been finalized
    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }

    /// Whether `user_id` owns this session
    pub fn is_owned_by(&self, user_id: i64) -> bool {
        self.user_id == user_id
    }
}

/// Values fixed when a session is finalized.
///
/// The score is not part of it: storage counts the correct answers in the
/// same statement that closes the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOutcome {
    pub total_questions: i64,
    pub finished_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_open() {
        let session = QuizSession::new(7, 3);

        assert_eq!(session.id, 0);
        assert!(!session.is_finished());
        assert!(session.score.is_none());
        assert!(session.is_owned_by(7));
        assert!(!session.is_owned_by(8));
    }
}
