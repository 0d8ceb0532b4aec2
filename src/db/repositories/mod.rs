//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles the queries for a specific entity and times every
//! query through the pool's slow-query monitor.

pub mod answer;
pub mod category;
pub mod question;
pub mod session;
pub mod user;

pub use answer::{AnswerInsert, AnswerRepository, SqlxAnswerRepository};
pub use category::{CategoryRepository, SqlxCategoryRepository};
pub use question::{QuestionRepository, SqlxQuestionRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use user::{SqlxUserRepository, UserRepository};
