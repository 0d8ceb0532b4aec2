//! Admin API endpoints
//!
//! Content management for categories and questions. Every route requires
//! an authenticated admin.
//!
//! - GET/POST /api/admin/categories
//! - GET/PUT/DELETE /api/admin/categories/{id}
//! - GET /api/admin/questions[?category_id=]
//! - POST /api/admin/questions
//! - GET/PUT/DELETE /api/admin/questions/{id}

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Deserializer, Serialize};

use crate::api::middleware::{ApiError, AppState, IdPath, JsonBody};
use crate::models::{
    Category, CreateCategoryInput, CreateQuestionInput, Question, UpdateCategoryInput,
    UpdateQuestionInput,
};
use crate::validation::{
    non_blank, optional_text, positive_id, required_id, required_text, validate_choices,
    validate_correct_choice, ValidationError, MAX_DESCRIPTION_LEN, MAX_NAME_LEN, MAX_PROMPT_LEN,
};

/// Distinguish an absent field (`None`) from an explicit `null` (`Some(None)`)
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// ============================================================================
// Requests
// ============================================================================

/// Request for creating a category
#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl CreateCategoryRequest {
    pub fn validate(self) -> Result<CreateCategoryInput, ValidationError> {
        Ok(CreateCategoryInput {
            name: required_text(self.name, "name", MAX_NAME_LEN)?,
            description: optional_text(self.description, "description", MAX_DESCRIPTION_LEN)?,
        })
    }
}

/// Request for updating a category; absent fields are left unchanged
#[derive(Debug, Default, Deserialize)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    /// `null` or blank clears the description
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
}

impl UpdateCategoryRequest {
    pub fn validate(self) -> Result<UpdateCategoryInput, ValidationError> {
        let name = self
            .name
            .map(|name| non_blank(name, "name", MAX_NAME_LEN))
            .transpose()?;
        let description = self
            .description
            .map(|d| optional_text(d, "description", MAX_DESCRIPTION_LEN))
            .transpose()?;
        Ok(UpdateCategoryInput { name, description })
    }
}

/// Request for creating a question
#[derive(Debug, Deserialize)]
pub struct CreateQuestionRequest {
    pub category_id: Option<i64>,
    pub prompt: Option<String>,
    pub choices: Option<Vec<String>>,
    pub correct_choice: Option<i64>,
}

impl CreateQuestionRequest {
    pub fn validate(self) -> Result<CreateQuestionInput, ValidationError> {
        let category_id = required_id(self.category_id, "category_id")?;
        let prompt = required_text(self.prompt, "prompt", MAX_PROMPT_LEN)?;
        let choices = validate_choices(self.choices.ok_or(ValidationError::Missing("choices"))?)?;
        let correct_choice = self
            .correct_choice
            .ok_or(ValidationError::Missing("correct_choice"))?;
        let correct_choice = validate_correct_choice(correct_choice, &choices)?;

        Ok(CreateQuestionInput {
            category_id,
            prompt,
            choices,
            correct_choice,
        })
    }
}

/// Request for updating a question; absent fields are left unchanged
#[derive(Debug, Default, Deserialize)]
pub struct UpdateQuestionRequest {
    pub category_id: Option<i64>,
    pub prompt: Option<String>,
    pub choices: Option<Vec<String>>,
    pub correct_choice: Option<i64>,
}

impl UpdateQuestionRequest {
    /// Field-level checks only; the correct choice is checked against the
    /// merged question by the service
    pub fn validate(self) -> Result<UpdateQuestionInput, ValidationError> {
        let category_id = self
            .category_id
            .map(|id| positive_id(id, "category_id"))
            .transpose()?;
        let prompt = self
            .prompt
            .map(|p| non_blank(p, "prompt", MAX_PROMPT_LEN))
            .transpose()?;
        let choices = self.choices.map(validate_choices).transpose()?;
        if let Some(correct_choice) = self.correct_choice {
            if correct_choice < 0 {
                return Err(ValidationError::OutOfRange("correct_choice"));
            }
            if let Some(choices) = &choices {
                validate_correct_choice(correct_choice, choices)?;
            }
        }

        Ok(UpdateQuestionInput {
            category_id,
            prompt,
            choices,
            correct_choice: self.correct_choice,
        })
    }
}

/// Query for listing questions
#[derive(Debug, Default, Deserialize)]
pub struct ListQuestionsQuery {
    pub category_id: Option<i64>,
}

impl ListQuestionsQuery {
    pub fn validate(self) -> Result<Option<i64>, ValidationError> {
        self.category_id
            .map(|id| positive_id(id, "category_id"))
            .transpose()
    }
}

// ============================================================================
// Responses
// ============================================================================

/// Response for a category
#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Category> for CategoryResponse {
    fn from(category: Category) -> Self {
        Self {
            id: category.id,
            name: category.name,
            description: category.description,
            created_at: category.created_at.to_rfc3339(),
            updated_at: category.updated_at.to_rfc3339(),
        }
    }
}

// ============================================================================
// Routes
// ============================================================================

/// Build the admin router (requires auth and admin middleware)
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/{id}",
            get(get_category).put(update_category).delete(delete_category),
        )
        .route("/questions", get(list_questions).post(create_question))
        .route(
            "/questions/{id}",
            get(get_question).put(update_question).delete(delete_question),
        )
}

/// GET /api/admin/categories
async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<CategoryResponse>>, ApiError> {
    let categories = state.category_service.list().await?;
    Ok(Json(categories.into_iter().map(Into::into).collect()))
}

/// POST /api/admin/categories
async fn create_category(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<CategoryResponse>), ApiError> {
    let input = body.validate()?;
    let category = state.category_service.create(input).await?;
    Ok((StatusCode::CREATED, Json(category.into())))
}

/// GET /api/admin/categories/{id}
async fn get_category(
    State(state): State<AppState>,
    IdPath(id): IdPath,
) -> Result<Json<CategoryResponse>, ApiError> {
    Ok(Json(state.category_service.get(id).await?.into()))
}

/// PUT /api/admin/categories/{id}
async fn update_category(
    State(state): State<AppState>,
    IdPath(id): IdPath,
    JsonBody(body): JsonBody<UpdateCategoryRequest>,
) -> Result<Json<CategoryResponse>, ApiError> {
    let input = body.validate()?;
    Ok(Json(state.category_service.update(id, input).await?.into()))
}

/// DELETE /api/admin/categories/{id}
async fn delete_category(
    State(state): State<AppState>,
    IdPath(id): IdPath,
) -> Result<StatusCode, ApiError> {
    state.category_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/admin/questions
async fn list_questions(
    State(state): State<AppState>,
    query: Result<Query<ListQuestionsQuery>, QueryRejection>,
) -> Result<Json<Vec<Question>>, ApiError> {
    let Query(query) = query?;
    let category_id = query.validate()?;
    Ok(Json(state.question_service.list(category_id).await?))
}

/// POST /api/admin/questions
async fn create_question(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<CreateQuestionRequest>,
) -> Result<(StatusCode, Json<Question>), ApiError> {
    let input = body.validate()?;
    let question = state.question_service.create(input).await?;
    Ok((StatusCode::CREATED, Json(question)))
}

/// GET /api/admin/questions/{id}
async fn get_question(
    State(state): State<AppState>,
    IdPath(id): IdPath,
) -> Result<Json<Question>, ApiError> {
    Ok(Json(state.question_service.get(id).await?))
}

/// PUT /api/admin/questions/{id}
async fn update_question(
    State(state): State<AppState>,
    IdPath(id): IdPath,
    JsonBody(body): JsonBody<UpdateQuestionRequest>,
) -> Result<Json<Question>, ApiError> {
    let input = body.validate()?;
    Ok(Json(state.question_service.update(id, input).await?))
}

/// DELETE /api/admin/questions/{id}
async fn delete_question(
    State(state): State<AppState>,
    IdPath(id): IdPath,
) -> Result<StatusCode, ApiError> {
    state.question_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_create_category_validation() {
        let ok = CreateCategoryRequest {
            name: Some("  Science ".to_string()),
            description: Some("   ".to_string()),
        }
        .validate()
        .unwrap();
        assert_eq!(ok.name, "Science");
        assert!(ok.description.is_none());

        let missing = CreateCategoryRequest {
            name: None,
            description: None,
        };
        assert_eq!(missing.validate(), Err(ValidationError::Missing("name")));

        let long = CreateCategoryRequest {
            name: Some("x".repeat(MAX_NAME_LEN + 1)),
            description: None,
        };
        assert!(matches!(long.validate(), Err(ValidationError::TooLong { .. })));
    }

    #[test]
    fn test_update_category_null_vs_absent() {
        let absent: UpdateCategoryRequest = serde_json::from_str(r#"{"name":"A"}"#).unwrap();
        assert_eq!(absent.validate().unwrap().description, None);

        let cleared: UpdateCategoryRequest =
            serde_json::from_str(r#"{"description":null}"#).unwrap();
        assert_eq!(cleared.validate().unwrap().description, Some(None));

        let set: UpdateCategoryRequest =
            serde_json::from_str(r#"{"description":" new "}"#).unwrap();
        assert_eq!(
            set.validate().unwrap().description,
            Some(Some("new".to_string()))
        );

        let blank_name: UpdateCategoryRequest = serde_json::from_str(r#"{"name":" "}"#).unwrap();
        assert_eq!(blank_name.validate(), Err(ValidationError::Empty("name")));
    }

    #[test]
    fn test_create_question_validation() {
        let request = || CreateQuestionRequest {
            category_id: Some(1),
            prompt: Some("Capital of France?".to_string()),
            choices: Some(strings(&["Paris", "Lyon"])),
            correct_choice: Some(0),
        };
        assert!(request().validate().is_ok());

        let out_of_range = CreateQuestionRequest {
            correct_choice: Some(2),
            ..request()
        };
        assert_eq!(
            out_of_range.validate(),
            Err(ValidationError::OutOfRange("correct_choice"))
        );

        let one_choice = CreateQuestionRequest {
            choices: Some(strings(&["Paris"])),
            ..request()
        };
        assert!(matches!(
            one_choice.validate(),
            Err(ValidationError::WrongCount { field: "choices", .. })
        ));

        let no_choices = CreateQuestionRequest {
            choices: None,
            ..request()
        };
        assert_eq!(no_choices.validate(), Err(ValidationError::Missing("choices")));
    }

    #[test]
    fn test_update_question_validation() {
        let empty = UpdateQuestionRequest::default().validate().unwrap();
        assert_eq!(empty, UpdateQuestionInput::default());

        let bad_index = UpdateQuestionRequest {
            choices: Some(strings(&["a", "b"])),
            correct_choice: Some(5),
            ..Default::default()
        };
        assert!(bad_index.validate().is_err());

        // Without new choices the index is checked later against stored ones
        let index_only = UpdateQuestionRequest {
            correct_choice: Some(5),
            ..Default::default()
        };
        assert_eq!(index_only.validate().unwrap().correct_choice, Some(5));
    }

    #[test]
    fn test_list_questions_query() {
        assert_eq!(ListQuestionsQuery::default().validate(), Ok(None));
        assert_eq!(
            ListQuestionsQuery {
                category_id: Some(0)
            }
            .validate(),
            Err(ValidationError::InvalidId("category_id"))
        );
    }
}
