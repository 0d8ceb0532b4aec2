//! Question model
//!
//! A question is a prompt with a list of choices, one of which is correct.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Question entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Question {
    /// Unique identifier
    pub id: i64,
    /// Owning category
    pub category_id: i64,
    /// The question text
    pub prompt: String,
    /// Answer choices, in display order
    pub choices: Vec<String>,
    /// Index into `choices` of the correct answer
    pub correct_choice: i64,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Question {
    /// Create a new Question.
    ///
    /// The ID will be set to 0 and should be assigned by the database.
    pub fn new(category_id: i64, prompt: String, choices: Vec<String>, correct_choice: i64) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            category_id,
            prompt,
            choices,
            correct_choice,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether `choice` is a valid index into this question's choices
    pub fn has_choice(&self, choice: i64) -> bool {
        choice >= 0 && (choice as usize) < self.choices.len()
    }

    /// Whether `choice` is the correct answer
    pub fn is_correct(&self, choice: i64) -> bool {
        choice == self.correct_choice
    }

    /// The question as shown to a quiz taker (no correct answer)
    pub fn to_public(&self) -> PublicQuestion {
        PublicQuestion {
            id: self.id,
            category_id: self.category_id,
            prompt: self.prompt.clone(),
            choices: self.choices.clone(),
        }
    }
}

/// Question without its correct answer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublicQuestion {
    pub id: i64,
    pub category_id: i64,
    pub prompt: String,
    pub choices: Vec<String>,
}

/// Input for creating a new question
#[derive(Debug, Clone, PartialEq)]
pub struct CreateQuestionInput {
    pub category_id: i64,
    pub prompt: String,
    pub choices: Vec<String>,
    pub correct_choice: i64,
}

/// Input for updating a question; absent fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateQuestionInput {
    pub category_id: Option<i64>,
    pub prompt: Option<String>,
    pub choices: Option<Vec<String>>,
    pub correct_choice: Option<i64>,
}
