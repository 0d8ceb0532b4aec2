//! Category service
//!
//! Implements business logic for category management:
//! - Create, read, update, delete categories
//! - Name uniqueness
//! - Refusing to delete categories that still have questions or sessions

use std::sync::Arc;

use crate::db::repositories::{CategoryRepository, QuestionRepository, SessionRepository};
use crate::models::{Category, CreateCategoryInput, UpdateCategoryInput};

/// Error types for category service operations
#[derive(Debug, thiserror::Error)]
pub enum CategoryServiceError {
    /// Category name already exists
    #[error("Category name already exists: {0}")]
    DuplicateName(String),

    /// Category not found
    #[error("Category not found: {0}")]
    NotFound(i64),

    /// Category still referenced by questions or sessions
    #[error("Category {0} still has questions or sessions")]
    InUse(i64),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Category service for managing quiz categories
pub struct CategoryService {
    repo: Arc<dyn CategoryRepository>,
    questions: Arc<dyn QuestionRepository>,
    sessions: Arc<dyn SessionRepository>,
}

impl CategoryService {
    pub fn new(
        repo: Arc<dyn CategoryRepository>,
        questions: Arc<dyn QuestionRepository>,
        sessions: Arc<dyn SessionRepository>,
    ) -> Self {
        Self {
            repo,
            questions,
            sessions,
        }
    }

    /// Create a new category
    ///
    /// # Errors
    /// - `DuplicateName` if a category with the same name already exists
    pub async fn create(&self, input: CreateCategoryInput) -> Result<Category, CategoryServiceError> {
        if self.repo.exists_by_name(&input.name).await? {
            return Err(CategoryServiceError::DuplicateName(input.name));
        }

        let category = self
            .repo
            .create(&Category::new(input.name, input.description))
            .await?;
        tracing::info!(category_id = category.id, name = %category.name, "category created");
        Ok(category)
    }

    /// Get a category by ID
    pub async fn get(&self, id: i64) -> Result<Category, CategoryServiceError> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or(CategoryServiceError::NotFound(id))
    }

    /// List all categories
    pub async fn list(&self) -> Result<Vec<Category>, CategoryServiceError> {
        Ok(self.repo.list().await?)
    }

    /// Update a category; absent fields are left unchanged
    pub async fn update(
        &self,
        id: i64,
        input: UpdateCategoryInput,
    ) -> Result<Category, CategoryServiceError> {
        let mut category = self.get(id).await?;

        if let Some(name) = input.name {
            if name != category.name {
                if let Some(other) = self.repo.get_by_name(&name).await? {
                    if other.id != id {
                        return Err(CategoryServiceError::DuplicateName(name));
                    }
                }
                category.name = name;
            }
        }
        if let Some(description) = input.description {
            category.description = description;
        }

        Ok(self.repo.update(&category).await?)
    }

    /// Delete a category
    ///
    /// # Errors
    /// - `NotFound` if the category doesn't exist
    /// - `InUse` if questions or sessions still reference it
    pub async fn delete(&self, id: i64) -> Result<(), CategoryServiceError> {
        self.get(id).await?;

        if self.questions.count_by_category(id).await? > 0
            || self.sessions.count_by_category(id).await? > 0
        {
            return Err(CategoryServiceError::InUse(id));
        }

        if !self.repo.delete(id).await? {
            return Err(CategoryServiceError::NotFound(id));
        }
        tracing::info!(category_id = id, "category deleted");
        Ok(())
    }
}
