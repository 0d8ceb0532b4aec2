//! Data models
//!
//! This module contains the data structures used throughout the quiz backend.
//! Models represent:
//! - Database entities (User, Category, Question, QuizSession, Answer)
//! - Service-level input types

mod answer;
mod category;
mod question;
mod session;
mod user;

pub use answer::{Answer, NewAnswer};
pub use category::{Category, CreateCategoryInput, UpdateCategoryInput};
pub use question::{CreateQuestionInput, PublicQuestion, Question, UpdateQuestionInput};
pub use session::{QuizSession, SessionOutcome};
pub use user::{ExternalIdentity, User, UserRole};
