//! Authentication service
//!
//! Turns authorization codes into local users and session tokens, and
//! resolves tokens back into users.
//!
//! The first user ever created becomes an admin; everyone after is a
//! player.

use std::sync::Arc;

use super::identity::{AuthCode, IdentityError, IdentityProvider};
use super::token::{IssuedToken, TokenError, TokenSigner};
use crate::db::repositories::UserRepository;
use crate::models::{ExternalIdentity, User, UserRole};

/// Error types for authentication
#[derive(Debug, thiserror::Error)]
pub enum AuthServiceError {
    /// Identity provider failed or rejected the code
    #[error(transparent)]
    Upstream(#[from] IdentityError),

    /// Token missing, malformed, tampered or expired
    #[error("Invalid session token: {0}")]
    InvalidToken(#[from] TokenError),

    /// Token is valid but its user no longer exists
    #[error("User no longer exists")]
    UnknownUser,

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Result of a successful code exchange
#[derive(Debug, Clone)]
pub struct AuthOutcome {
    pub user: User,
    pub token: IssuedToken,
}

/// Authentication service
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    identity: Arc<dyn IdentityProvider>,
    signer: TokenSigner,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        identity: Arc<dyn IdentityProvider>,
        signer: TokenSigner,
    ) -> Self {
        Self {
            users,
            identity,
            signer,
        }
    }

    /// Exchange an authorization code for a user and a session token
    pub async fn exchange_code(&self, code: &AuthCode) -> Result<AuthOutcome, AuthServiceError> {
        let identity = self.identity.exchange_code(code).await.map_err(|e| {
            tracing::warn!(error = %e, "authorization code exchange failed");
            e
        })?;

        let user = self.upsert_user(identity).await?;
        let token = self.signer.issue(user.id);
        tracing::info!(user_id = user.id, role = %user.role, "user signed in");

        Ok(AuthOutcome { user, token })
    }

    /// Resolve a session token to its user
    pub async fn authenticate(&self, token: &str) -> Result<User, AuthServiceError> {
        let user_id = self.signer.verify(token)?;
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(AuthServiceError::UnknownUser)
    }

    /// Token lifetime, for cookie max-age
    pub fn token_ttl(&self) -> chrono::Duration {
        self.signer.ttl()
    }

    async fn upsert_user(&self, identity: ExternalIdentity) -> Result<User, AuthServiceError> {
        if let Some(existing) = self.users.get_by_external_id(&identity.subject).await? {
            if !existing.differs_from(&identity) {
                return Ok(existing);
            }
            let refreshed = User {
                username: identity.username,
                email: identity.email,
                ..existing
            };
            return Ok(self.users.update(&refreshed).await?);
        }

        let role = if self.users.count().await? == 0 {
            UserRole::Admin
        } else {
            UserRole::Player
        };
        let subject = identity.subject.clone();

        match self.users.create(&User::new(identity, role)).await {
            Ok(user) => {
                tracing::info!(user_id = user.id, %role, "user created");
                Ok(user)
            }
            // Lost a race with a concurrent sign-in of the same subject
            Err(err) => match self.users.get_by_external_id(&subject).await? {
                Some(user) => Ok(user),
                None => Err(err.into()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxUserRepository;
    use crate::db::{create_test_pool, migrations};
    use async_trait::async_trait;
    use chrono::Duration;

    /// Provider whose identities are encoded in the code itself: "subject:username"
    struct FakeProvider;

    #[async_trait]
    impl IdentityProvider for FakeProvider {
        async fn exchange_code(&self, code: &AuthCode) -> Result<ExternalIdentity, IdentityError> {
            match code.as_str().split_once(':') {
                Some((subject, username)) => Ok(ExternalIdentity {
                    subject: subject.to_string(),
                    username: username.to_string(),
                    email: None,
                }),
                None => Err(IdentityError::Rejected { status: 401 }),
            }
        }
    }

    async fn service() -> AuthService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool).await.expect("Failed to run migrations");
        AuthService::new(
            SqlxUserRepository::boxed(pool),
            Arc::new(FakeProvider),
            TokenSigner::new("secret", Duration::hours(1)),
        )
    }

    fn code(raw: &str) -> AuthCode {
        AuthCode::parse(Some(raw.to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_first_user_is_admin() {
        let service = service().await;

        let first = service.exchange_code(&code("1:ada")).await.unwrap();
        let second = service.exchange_code(&code("2:grace")).await.unwrap();

        assert_eq!(first.user.role, UserRole::Admin);
        assert_eq!(second.user.role, UserRole::Player);
    }

    #[tokio::test]
    async fn test_repeat_sign_in_reuses_user() {
        let service = service().await;

        let first = service.exchange_code(&code("1:ada")).await.unwrap();
        let again = service.exchange_code(&code("1:ada")).await.unwrap();
        assert_eq!(first.user.id, again.user.id);

        let renamed = service.exchange_code(&code("1:countess")).await.unwrap();
        assert_eq!(renamed.user.id, first.user.id);
        assert_eq!(renamed.user.username, "countess");
        assert_eq!(renamed.user.role, UserRole::Admin);
    }

    #[tokio::test]
    async fn test_issued_token_authenticates() {
        let service = service().await;

        let outcome = service.exchange_code(&code("1:ada")).await.unwrap();
        let user = service.authenticate(&outcome.token.token).await.unwrap();

        assert_eq!(user.id, outcome.user.id);
    }

    #[tokio::test]
    async fn test_upstream_failure() {
        let service = service().await;

        let err = service.exchange_code(&code("no-separator")).await.unwrap_err();
        assert!(matches!(err, AuthServiceError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_invalid_tokens() {
        let service = service().await;

        assert!(matches!(
            service.authenticate("garbage").await,
            Err(AuthServiceError::InvalidToken(TokenError::Malformed))
        ));

        // Well-signed token for a user that does not exist
        let orphan = TokenSigner::new("secret", Duration::hours(1)).issue(999);
        assert!(matches!(
            service.authenticate(&orphan.token).await,
            Err(AuthServiceError::UnknownUser)
        ));
    }
}
