//! Question service
//!
//! Admin management of quiz questions. Inputs arrive already validated;
//! this layer checks references (category exists) and cross-field rules
//! that depend on stored state, such as an update that shortens the choice
//! list under an existing correct answer.

use std::sync::Arc;

use crate::db::repositories::{AnswerRepository, CategoryRepository, QuestionRepository};
use crate::models::{CreateQuestionInput, Question, UpdateQuestionInput};
use crate::validation::{validate_correct_choice, ValidationError};

/// Error types for question service operations
#[derive(Debug, thiserror::Error)]
pub enum QuestionServiceError {
    #[error("Question not found: {0}")]
    NotFound(i64),

    #[error("Category not found: {0}")]
    CategoryNotFound(i64),

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// Answers have been recorded against the question
    #[error("Question {0} has recorded answers")]
    InUse(i64),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub struct QuestionService {
    repo: Arc<dyn QuestionRepository>,
    categories: Arc<dyn CategoryRepository>,
    answers: Arc<dyn AnswerRepository>,
}

impl QuestionService {
    pub fn new(
        repo: Arc<dyn QuestionRepository>,
        categories: Arc<dyn CategoryRepository>,
        answers: Arc<dyn AnswerRepository>,
    ) -> Self {
        Self {
            repo,
            categories,
            answers,
        }
    }

    pub async fn create(&self, input: CreateQuestionInput) -> Result<Question, QuestionServiceError> {
        self.ensure_category(input.category_id).await?;
        validate_correct_choice(input.correct_choice, &input.choices)?;

        let question = self
            .repo
            .create(&Question::new(
                input.category_id,
                input.prompt,
                input.choices,
                input.correct_choice,
            ))
            .await?;
        tracing::info!(
            question_id = question.id,
            category_id = question.category_id,
            "question created"
        );
        Ok(question)
    }

    pub async fn get(&self, id: i64) -> Result<Question, QuestionServiceError> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or(QuestionServiceError::NotFound(id))
    }

    /// List questions, optionally for one category
    pub async fn list(&self, category_id: Option<i64>) -> Result<Vec<Question>, QuestionServiceError> {
        if let Some(category_id) = category_id {
            self.ensure_category(category_id).await?;
        }
        Ok(self.repo.list(category_id).await?)
    }

    /// Update a question; absent fields are left unchanged
    ///
    /// Once answered, only the prompt may change: category, choices and
    /// correct choice all feed recorded answers and session scores.
    pub async fn update(
        &self,
        id: i64,
        input: UpdateQuestionInput,
    ) -> Result<Question, QuestionServiceError> {
        let mut question = self.get(id).await?;

        let changes_scoring = input
            .category_id
            .is_some_and(|c| c != question.category_id)
            || input.choices.as_ref().is_some_and(|c| *c != question.choices)
            || input
                .correct_choice
                .is_some_and(|c| c != question.correct_choice);
        if changes_scoring && self.answers.count_by_question(id).await? > 0 {
            return Err(QuestionServiceError::InUse(id));
        }

        if let Some(category_id) = input.category_id {
            if category_id != question.category_id {
                self.ensure_category(category_id).await?;
                question.category_id = category_id;
            }
        }
        if let Some(prompt) = input.prompt {
            question.prompt = prompt;
        }
        if let Some(choices) = input.choices {
            question.choices = choices;
        }
        if let Some(correct_choice) = input.correct_choice {
            question.correct_choice = correct_choice;
        }
        validate_correct_choice(question.correct_choice, &question.choices)?;

        Ok(self.repo.update(&question).await?)
    }

    /// Delete a question that no session has answered yet
    pub async fn delete(&self, id: i64) -> Result<(), QuestionServiceError> {
        self.get(id).await?;

        if self.answers.count_by_question(id).await? > 0 {
            return Err(QuestionServiceError::InUse(id));
        }
        if !self.repo.delete(id).await? {
            return Err(QuestionServiceError::NotFound(id));
        }
        tracing::info!(question_id = id, "question deleted");
        Ok(())
    }

    async fn ensure_category(&self, category_id: i64) -> Result<(), QuestionServiceError> {
        match self.categories.get_by_id(category_id).await? {
            Some(_) => Ok(()),
            None => Err(QuestionServiceError::CategoryNotFound(category_id)),
        }
    }
}
