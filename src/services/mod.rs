//! Services layer - Business logic
//!
//! Services are responsible for:
//! - Implementing business rules
//! - Coordinating between repositories
//! - Mapping storage outcomes to domain errors

pub mod auth;
pub mod category;
pub mod identity;
pub mod question;
pub mod session;
pub mod token;

pub use auth::{AuthOutcome, AuthService, AuthServiceError};
pub use category::{CategoryService, CategoryServiceError};
pub use identity::{AuthCode, IdentityError, IdentityProvider, OAuthIdentityProvider};
pub use question::{QuestionService, QuestionServiceError};
pub use session::{QuizSessionError, QuizSessionService, SessionDetail, SubmitAnswerInput};
pub use token::{IssuedToken, TokenError, TokenSigner};
