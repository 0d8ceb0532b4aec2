//! Quiz session API endpoints
//!
//! All routes require authentication and only ever expose the caller's own
//! sessions.
//!
//! - POST /api/sessions - Start a session
//! - GET /api/sessions - List own sessions
//! - GET /api/sessions/{id} - Session with answers
//! - GET /api/sessions/{id}/questions - Questions to answer
//! - POST /api/sessions/{id}/answers - Submit an answer
//! - POST /api/sessions/{id}/finalize - Score the session

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser, IdPath, JsonBody};
use crate::models::{Answer, PublicQuestion, QuizSession};
use crate::services::{SessionDetail, SubmitAnswerInput};
use crate::validation::{required_id, ValidationError};

/// Request body for starting a session
#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub category_id: Option<i64>,
}

impl CreateSessionRequest {
    /// Returns the category ID
    pub fn validate(self) -> Result<i64, ValidationError> {
        required_id(self.category_id, "category_id")
    }
}

/// Request body for submitting an answer
#[derive(Debug, Deserialize)]
pub struct SubmitAnswerRequest {
    pub question_id: Option<i64>,
    pub choice: Option<i64>,
}

impl SubmitAnswerRequest {
    pub fn validate(self) -> Result<SubmitAnswerInput, ValidationError> {
        let question_id = required_id(self.question_id, "question_id")?;
        let choice = self.choice.ok_or(ValidationError::Missing("choice"))?;
        if choice < 0 {
            return Err(ValidationError::OutOfRange("choice"));
        }
        Ok(SubmitAnswerInput {
            question_id,
            choice,
        })
    }
}

/// Build the session router (requires auth middleware)
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_sessions).post(create_session))
        .route("/{id}", get(get_session))
        .route("/{id}/questions", get(get_questions))
        .route("/{id}/answers", post(submit_answer))
        .route("/{id}/finalize", post(finalize_session))
}

/// POST /api/sessions
async fn create_session(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    JsonBody(body): JsonBody<CreateSessionRequest>,
) -> Result<(StatusCode, Json<QuizSession>), ApiError> {
    let category_id = body.validate()?;
    let session = state.session_service.create(&user, category_id).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// GET /api/sessions
async fn list_sessions(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<Vec<QuizSession>>, ApiError> {
    Ok(Json(state.session_service.list(&user).await?))
}

/// GET /api/sessions/{id}
async fn get_session(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    IdPath(id): IdPath,
) -> Result<Json<SessionDetail>, ApiError> {
    Ok(Json(state.session_service.get(&user, id).await?))
}

/// GET /api/sessions/{id}/questions
async fn get_questions(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    IdPath(id): IdPath,
) -> Result<Json<Vec<PublicQuestion>>, ApiError> {
    Ok(Json(state.session_service.questions(&user, id).await?))
}

/// POST /api/sessions/{id}/answers
async fn submit_answer(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    IdPath(id): IdPath,
    JsonBody(body): JsonBody<SubmitAnswerRequest>,
) -> Result<(StatusCode, Json<Answer>), ApiError> {
    let input = body.validate()?;
    let answer = state.session_service.submit_answer(&user, id, input).await?;
    Ok((StatusCode::CREATED, Json(answer)))
}

/// POST /api/sessions/{id}/finalize
async fn finalize_session(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    IdPath(id): IdPath,
) -> Result<Json<QuizSession>, ApiError> {
    Ok(Json(state.session_service.finalize(&user, id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_session_validation() {
        let ok = CreateSessionRequest { category_id: Some(4) };
        assert_eq!(ok.validate(), Ok(4));

        let missing = CreateSessionRequest { category_id: None };
        assert_eq!(missing.validate(), Err(ValidationError::Missing("category_id")));

        let negative = CreateSessionRequest { category_id: Some(-1) };
        assert_eq!(negative.validate(), Err(ValidationError::InvalidId("category_id")));
    }

    #[test]
    fn test_submit_answer_validation() {
        let ok = SubmitAnswerRequest {
            question_id: Some(3),
            choice: Some(0),
        };
        assert_eq!(
            ok.validate(),
            Ok(SubmitAnswerInput {
                question_id: 3,
                choice: 0
            })
        );

        let no_choice = SubmitAnswerRequest {
            question_id: Some(3),
            choice: None,
        };
        assert_eq!(no_choice.validate(), Err(ValidationError::Missing("choice")));

        let negative = SubmitAnswerRequest {
            question_id: Some(3),
            choice: Some(-2),
        };
        assert_eq!(negative.validate(), Err(ValidationError::OutOfRange("choice")));
    }
}
