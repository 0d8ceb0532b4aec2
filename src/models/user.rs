//! User model
//!
//! Users are created on their first successful authorization-code exchange
//! and identified afterwards by the identity provider's subject.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// User entity representing an account holder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Subject identifier assigned by the identity provider (unique)
    pub external_id: String,
    /// Display name reported by the identity provider
    pub username: String,
    /// Email address, if the provider shared one
    pub email: Option<String>,
    /// User role
    pub role: UserRole,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new User from a provider identity.
    ///
    /// The ID will be set to 0 and should be assigned by the database.
    pub fn new(identity: ExternalIdentity, role: UserRole) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            external_id: identity.subject,
            username: identity.username,
            email: identity.email,
            role,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if the user is an administrator
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Whether the provider profile differs from what is stored
    pub fn differs_from(&self, identity: &ExternalIdentity) -> bool {
        self.username != identity.username || self.email != identity.email
    }
}

/// User role for authorization.
///
/// - Admin: may manage categories and questions
/// - Player: may take quizzes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    #[default]
    Player,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::Admin => write!(f, "admin"),
            UserRole::Player => write!(f, "player"),
        }
    }
}

impl FromStr for UserRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(UserRole::Admin),
            "player" => Ok(UserRole::Player),
            _ => Err(anyhow::anyhow!("Invalid user role: {}", s)),
        }
    }
}

/// Profile returned by the identity provider for an exchanged code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalIdentity {
    pub subject: String,
    pub username: String,
    pub email: Option<String>,
}
