//! Answer model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user's response to one question within a quiz session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Answer {
    pub id: i64,
    pub session_id: i64,
    pub question_id: i64,
    /// Index of the chosen choice
    pub choice: i64,
    /// Computed when the answer is recorded
    pub is_correct: bool,
    pub answered_at: DateTime<Utc>,
}

/// Answer about to be inserted
#[derive(Debug, Clone, PartialEq)]
pub struct NewAnswer {
    pub session_id: i64,
    pub question_id: i64,
    pub choice: i64,
    pub is_correct: bool,
}

impl NewAnswer {
    /// Attach an ID and timestamp once stored
    pub fn into_answer(self, id: i64, answered_at: DateTime<Utc>) -> Answer {
        Answer {
            id,
            session_id: self.session_id,
            question_id: self.question_id,
            choice: self.choice,
            is_correct: self.is_correct,
            answered_at,
        }
    }
}
