//! API middleware
//!
//! Contains:
//! - Shared application state
//! - The JSON error type every handler returns
//! - Extractors that turn rejections into JSON errors
//! - Authentication (session token validation) and admin authorization

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRequest, FromRequestParts, Path, Request, State,
    },
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;

use crate::db::repositories::{
    SqlxAnswerRepository, SqlxCategoryRepository, SqlxQuestionRepository, SqlxSessionRepository,
    SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::models::{User, UserRole};
use crate::services::{
    AuthService, AuthServiceError, CategoryService, CategoryServiceError, IdentityProvider,
    QuestionService, QuestionServiceError, QuizSessionError, QuizSessionService, TokenSigner,
};
use crate::validation::{positive_id, ValidationError};

/// Name of the cookie carrying the session token
pub const TOKEN_COOKIE: &str = "quiz_token";

/// Application state containing shared services
///
/// Cloning is cheap; every clone shares the same pool and services.
#[derive(Clone)]
pub struct AppState {
    pub pool: DynDatabasePool,
    pub auth_service: Arc<AuthService>,
    pub category_service: Arc<CategoryService>,
    pub question_service: Arc<QuestionService>,
    pub session_service: Arc<QuizSessionService>,
}

impl AppState {
    /// Wire repositories and services around one pool
    pub fn new(
        pool: DynDatabasePool,
        identity: Arc<dyn IdentityProvider>,
        signer: TokenSigner,
    ) -> Self {
        let users = SqlxUserRepository::boxed(pool.clone());
        let categories = SqlxCategoryRepository::boxed(pool.clone());
        let questions = SqlxQuestionRepository::boxed(pool.clone());
        let sessions = SqlxSessionRepository::boxed(pool.clone());
        let answers = SqlxAnswerRepository::boxed(pool.clone());

        Self {
            auth_service: Arc::new(AuthService::new(users, identity, signer)),
            category_service: Arc::new(CategoryService::new(
                categories.clone(),
                questions.clone(),
                sessions.clone(),
            )),
            question_service: Arc::new(QuestionService::new(
                questions.clone(),
                categories.clone(),
                answers.clone(),
            )),
            session_service: Arc::new(QuizSessionService::new(
                sessions, answers, questions, categories,
            )),
            pool,
        }
    }
}

/// Authenticated user extracted from request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    /// Validation error pointing at one request field
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        Self::with_details(
            "VALIDATION_ERROR",
            message,
            serde_json::json!({ "field": field }),
        )
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn upstream_error(message: impl Into<String>) -> Self {
        Self::new("UPSTREAM_ERROR", message)
    }

    /// Log the cause and hide it behind a generic message
    pub fn internal_error(cause: impl std::fmt::Display) -> Self {
        tracing::error!(error = %cause, "internal error");
        Self::new("INTERNAL_ERROR", "Internal server error")
    }

    /// HTTP status for this error's code
    pub fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            "UPSTREAM_ERROR" => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        match err.field() {
            Some(field) => ApiError::invalid_field(field, err.to_string()),
            None => ApiError::validation_error(err.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ValidationError::MalformedBody(rejection.body_text()).into()
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::validation_error(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(_: PathRejection) -> Self {
        ValidationError::InvalidId("id").into()
    }
}

impl From<AuthServiceError> for ApiError {
    fn from(err: AuthServiceError) -> Self {
        match err {
            AuthServiceError::Upstream(_) => {
                ApiError::upstream_error("Identity provider request failed")
            }
            AuthServiceError::InvalidToken(_) | AuthServiceError::UnknownUser => {
                ApiError::unauthorized("Invalid or expired session")
            }
            AuthServiceError::Internal(e) => ApiError::internal_error(format!("{:#}", e)),
        }
    }
}

impl From<CategoryServiceError> for ApiError {
    fn from(err: CategoryServiceError) -> Self {
        match err {
            CategoryServiceError::DuplicateName(_) | CategoryServiceError::InUse(_) => {
                ApiError::conflict(err.to_string())
            }
            CategoryServiceError::NotFound(_) => ApiError::not_found(err.to_string()),
            CategoryServiceError::Internal(e) => ApiError::internal_error(format!("{:#}", e)),
        }
    }
}

impl From<QuestionServiceError> for ApiError {
    fn from(err: QuestionServiceError) -> Self {
        match err {
            QuestionServiceError::NotFound(_) | QuestionServiceError::CategoryNotFound(_) => {
                ApiError::not_found(err.to_string())
            }
            QuestionServiceError::Invalid(e) => e.into(),
            QuestionServiceError::InUse(_) => ApiError::conflict(err.to_string()),
            QuestionServiceError::Internal(e) => ApiError::internal_error(format!("{:#}", e)),
        }
    }
}

impl From<QuizSessionError> for ApiError {
    fn from(err: QuizSessionError) -> Self {
        match err {
            QuizSessionError::NotFound(_) | QuizSessionError::CategoryNotFound(_) => {
                ApiError::not_found(err.to_string())
            }
            QuizSessionError::QuestionNotInQuiz(_) => {
                ApiError::invalid_field("question_id", err.to_string())
            }
            QuizSessionError::InvalidChoice { .. } => {
                ApiError::invalid_field("choice", err.to_string())
            }
            QuizSessionError::AlreadyAnswered(_) | QuizSessionError::AlreadyFinished(_) => {
                ApiError::conflict(err.to_string())
            }
            QuizSessionError::Internal(e) => ApiError::internal_error(format!("{:#}", e)),
        }
    }
}

/// JSON body extractor whose rejection is an [`ApiError`]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

/// Positive numeric `{id}` path parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdPath(pub i64);

impl<S> FromRequestParts<S> for IdPath
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<i64>::from_request_parts(parts, state).await?;
        Ok(Self(positive_id(id, "id")?))
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

/// Extract session token from the `Authorization` header or the token cookie
pub fn extract_session_token(request: &Request) -> Option<String> {
    if let Some(auth_header) = request.headers().get(header::AUTHORIZATION) {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                return Some(token.trim().to_string());
            }
        }
    }

    let cookie_prefix = format!("{}=", TOKEN_COOKIE);
    for cookie_header in request.headers().get_all(header::COOKIE) {
        if let Ok(cookie_str) = cookie_header.to_str() {
            for cookie in cookie_str.split(';') {
                if let Some(token) = cookie.trim().strip_prefix(cookie_prefix.as_str()) {
                    if !token.is_empty() {
                        return Some(token.to_string());
                    }
                }
            }
        }
    }

    None
}

/// Authentication middleware
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_session_token(&request)
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

    let user = state.auth_service.authenticate(&token).await?;

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

/// Admin authorization middleware
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    if user.0.role != UserRole::Admin {
        tracing::debug!(user_id = user.0.id, "admin route refused");
        return Err(ApiError::forbidden("Admin privileges required"));
    }

    Ok(next.run(request).await)
}
