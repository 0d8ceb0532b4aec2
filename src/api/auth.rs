//! Authentication API endpoints
//!
//! - POST /api/auth/callback - Exchange an authorization code (JSON body)
//! - GET /api/auth/callback?code= - Same, for provider redirects
//! - GET /api/auth/me - Current user
//! - POST /api/auth/logout - Clear the session cookie
//!
//! The code is validated before anything else happens: a missing or blank
//! code never reaches the identity provider.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser, JsonBody, TOKEN_COOKIE};
use crate::models::User;
use crate::services::{AuthCode, AuthOutcome};
use crate::validation::ValidationError;

/// Request body for the code exchange
#[derive(Debug, Default, Deserialize)]
pub struct CallbackRequest {
    pub code: Option<String>,
}

impl CallbackRequest {
    pub fn validate(self) -> Result<AuthCode, ValidationError> {
        AuthCode::parse(self.code)
    }
}

/// Response for successful authentication
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Response for user info
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub role: String,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role.to_string(),
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

/// Build public auth routes (no auth required)
pub fn public_router() -> Router<AppState> {
    Router::new().route("/callback", post(callback_post).get(callback_get))
}

/// Build protected auth routes (requires auth middleware)
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_current_user))
        .route("/logout", post(logout))
}

/// POST /api/auth/callback
async fn callback_post(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<CallbackRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let code = body.validate()?;
    exchange(&state, code).await
}

/// GET /api/auth/callback?code=...
async fn callback_get(
    State(state): State<AppState>,
    query: Result<Query<CallbackRequest>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    let code = query.validate()?;
    exchange(&state, code).await
}

async fn exchange(state: &AppState, code: AuthCode) -> Result<impl IntoResponse, ApiError> {
    let AuthOutcome { user, token } = state.auth_service.exchange_code(&code).await?;

    let max_age = state.auth_service.token_ttl().num_seconds();
    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        TOKEN_COOKIE, token.token, max_age
    );

    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&cookie).map_err(ApiError::internal_error)?,
    );

    Ok((
        headers,
        Json(AuthResponse {
            user: user.into(),
            token: token.token,
            expires_at: token.expires_at,
        }),
    ))
}

/// GET /api/auth/me
async fn get_current_user(AuthenticatedUser(user): AuthenticatedUser) -> Json<UserResponse> {
    Json(user.into())
}

/// POST /api/auth/logout
///
/// Tokens are stateless, so logging out only expires the cookie.
async fn logout(AuthenticatedUser(user): AuthenticatedUser) -> impl IntoResponse {
    tracing::debug!(user_id = user.id, "user logged out");
    let cookie = format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", TOKEN_COOKIE);
    (
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, cookie)],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_request_validation() {
        let missing = CallbackRequest { code: None };
        assert_eq!(missing.validate(), Err(ValidationError::Missing("code")));

        let blank = CallbackRequest {
            code: Some(" \t".to_string()),
        };
        assert_eq!(blank.validate(), Err(ValidationError::Empty("code")));

        let ok = CallbackRequest {
            code: Some("abc".to_string()),
        };
        assert_eq!(ok.validate().unwrap().as_str(), "abc");
    }

    #[test]
    fn test_user_response_omits_external_id() {
        use crate::models::{ExternalIdentity, UserRole};

        let user = User::new(
            ExternalIdentity {
                subject: "secret-subject".to_string(),
                username: "ada".to_string(),
                email: None,
            },
            UserRole::Admin,
        );
        let json = serde_json::to_value(UserResponse::from(user)).unwrap();

        assert_eq!(json["role"], "admin");
        assert!(json.get("external_id").is_none());
    }
}
