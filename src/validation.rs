//! Request input validation
//!
//! Handlers turn raw request bodies into typed service inputs through
//! `validate()` functions built from the helpers here. Validation happens
//! before any service or database call; a failure is a [`ValidationError`]
//! naming the offending field.

/// Maximum length of a category name
pub const MAX_NAME_LEN: usize = 100;
/// Maximum length of a category description
pub const MAX_DESCRIPTION_LEN: usize = 1000;
/// Maximum length of a question prompt
pub const MAX_PROMPT_LEN: usize = 1000;
/// Maximum length of a single answer choice
pub const MAX_CHOICE_LEN: usize = 200;
/// Fewest choices a question may have
pub const MIN_CHOICES: usize = 2;
/// Most choices a question may have
pub const MAX_CHOICES: usize = 10;
/// Maximum length of an authorization code
pub const MAX_AUTH_CODE_LEN: usize = 512;

/// Reasons a request input is rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("{0} must be a positive integer")]
    InvalidId(&'static str),

    #[error("{field} must have between {min} and {max} entries")]
    WrongCount {
        field: &'static str,
        min: usize,
        max: usize,
    },

    #[error("{0} is out of range")]
    OutOfRange(&'static str),

    #[error("Malformed request body: {0}")]
    MalformedBody(String),
}

impl ValidationError {
    /// The request field the error refers to, if any
    pub fn field(&self) -> Option<&'static str> {
        match self {
            ValidationError::Missing(field)
            | ValidationError::Empty(field)
            | ValidationError::InvalidId(field)
            | ValidationError::OutOfRange(field) => Some(field),
            ValidationError::TooLong { field, .. } | ValidationError::WrongCount { field, .. } => {
                Some(field)
            }
            ValidationError::MalformedBody(_) => None,
        }
    }
}

/// A present, non-blank string of bounded length, trimmed
pub fn required_text(
    value: Option<String>,
    field: &'static str,
    max: usize,
) -> Result<String, ValidationError> {
    let value = value.ok_or(ValidationError::Missing(field))?;
    non_blank(value, field, max)
}

/// Like [`required_text`] but for a value already known to be present
pub fn non_blank(value: String, field: &'static str, max: usize) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty(field));
    }
    if trimmed.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(trimmed.to_string())
}

/// An optional string; blank values become `None`
pub fn optional_text(
    value: Option<String>,
    field: &'static str,
    max: usize,
) -> Result<Option<String>, ValidationError> {
    match value {
        None => Ok(None),
        Some(v) if v.trim().is_empty() => Ok(None),
        Some(v) => non_blank(v, field, max).map(Some),
    }
}

/// A present, positive database id
pub fn required_id(value: Option<i64>, field: &'static str) -> Result<i64, ValidationError> {
    let id = value.ok_or(ValidationError::Missing(field))?;
    positive_id(id, field)
}

pub fn positive_id(id: i64, field: &'static str) -> Result<i64, ValidationError> {
    if id <= 0 {
        return Err(ValidationError::InvalidId(field));
    }
    Ok(id)
}

/// Question choices: trimmed, each non-blank, between
/// [`MIN_CHOICES`] and [`MAX_CHOICES`] of them
pub fn validate_choices(choices: Vec<String>) -> Result<Vec<String>, ValidationError> {
    if choices.len() < MIN_CHOICES || choices.len() > MAX_CHOICES {
        return Err(ValidationError::WrongCount {
            field: "choices",
            min: MIN_CHOICES,
            max: MAX_CHOICES,
        });
    }
    choices
        .into_iter()
        .map(|c| non_blank(c, "choices", MAX_CHOICE_LEN))
        .collect()
}

/// The correct-choice index must point into `choices`
pub fn validate_correct_choice(correct_choice: i64, choices: &[String]) -> Result<i64, ValidationError> {
    if correct_choice < 0 || correct_choice as usize >= choices.len() {
        return Err(ValidationError::OutOfRange("correct_choice"));
    }
    Ok(correct_choice)
}
