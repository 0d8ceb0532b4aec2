//! Question repository
//!
//! Choices are stored as a JSON array in a text column.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Question;

/// Question repository trait
#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Create a new question
    async fn create(&self, question: &Question) -> Result<Question>;

    /// Get question by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Question>>;

    /// List questions, optionally restricted to one category, in creation order
    async fn list(&self, category_id: Option<i64>) -> Result<Vec<Question>>;

    /// Update every mutable field
    async fn update(&self, question: &Question) -> Result<Question>;

    /// Delete a question; returns whether a row was removed
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Number of questions in a category
    async fn count_by_category(&self, category_id: i64) -> Result<i64>;
}

#[derive(Debug, sqlx::FromRow)]
struct QuestionRow {
    id: i64,
    category_id: i64,
    prompt: String,
    choices: String,
    correct_choice: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<QuestionRow> for Question {
    type Error = anyhow::Error;

    fn try_from(row: QuestionRow) -> Result<Self> {
        let choices: Vec<String> = serde_json::from_str(&row.choices)
            .with_context(|| format!("Corrupt choices for question {}", row.id))?;
        Ok(Question {
            id: row.id,
            category_id: row.category_id,
            prompt: row.prompt,
            choices,
            correct_choice: row.correct_choice,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const SELECT_COLUMNS: &str =
    "SELECT id, category_id, prompt, choices, correct_choice, created_at, updated_at FROM questions";

/// SQLx-based question repository implementation
pub struct SqlxQuestionRepository {
    pool: DynDatabasePool,
}

impl SqlxQuestionRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn QuestionRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl QuestionRepository for SqlxQuestionRepository {
    async fn create(&self, question: &Question) -> Result<Question> {
        let _timer = self.pool.monitor().start("questions.create");
        let sql = "INSERT INTO questions (category_id, prompt, choices, correct_choice, created_at, updated_at) \
                   VALUES (?, ?, ?, ?, ?, ?)";
        let choices = serde_json::to_string(&question.choices)?;

        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(question.category_id)
                .bind(&question.prompt)
                .bind(&choices)
                .bind(question.correct_choice)
                .bind(question.created_at)
                .bind(question.updated_at)
                .execute(self.pool.sqlite()?)
                .await
                .map(|r| r.last_insert_rowid()),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(question.category_id)
                .bind(&question.prompt)
                .bind(&choices)
                .bind(question.correct_choice)
                .bind(question.created_at)
                .bind(question.updated_at)
                .execute(self.pool.mysql()?)
                .await
                .map(|r| r.last_insert_id() as i64),
        }
        .context("Failed to create question")?;

        Ok(Question {
            id,
            ..question.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Question>> {
        let _timer = self.pool.monitor().start("questions.get_by_id");
        let sql = format!("{} WHERE id = ?", SELECT_COLUMNS);

        let row = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query_as::<_, QuestionRow>(&sql)
                    .bind(id)
                    .fetch_optional(self.pool.sqlite()?)
                    .await
            }
            DatabaseDriver::Mysql => {
                sqlx::query_as::<_, QuestionRow>(&sql)
                    .bind(id)
                    .fetch_optional(self.pool.mysql()?)
                    .await
            }
        }
        .context("Failed to get question by id")?;

        row.map(Question::try_from).transpose()
    }

    async fn list(&self, category_id: Option<i64>) -> Result<Vec<Question>> {
        let _timer = self.pool.monitor().start("questions.list");
        let sql = match category_id {
            Some(_) => format!("{} WHERE category_id = ? ORDER BY id", SELECT_COLUMNS),
            None => format!("{} ORDER BY id", SELECT_COLUMNS),
        };

        let rows = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let mut query = sqlx::query_as::<_, QuestionRow>(&sql);
                if let Some(id) = category_id {
                    query = query.bind(id);
                }
                query.fetch_all(self.pool.sqlite()?).await
            }
            DatabaseDriver::Mysql => {
                let mut query = sqlx::query_as::<_, QuestionRow>(&sql);
                if let Some(id) = category_id {
                    query = query.bind(id);
                }
                query.fetch_all(self.pool.mysql()?).await
            }
        }
        .context("Failed to list questions")?;

        rows.into_iter().map(Question::try_from).collect()
    }

    async fn update(&self, question: &Question) -> Result<Question> {
        let _timer = self.pool.monitor().start("questions.update");
        let sql = "UPDATE questions SET category_id = ?, prompt = ?, choices = ?, correct_choice = ?, updated_at = ? \
                   WHERE id = ?";
        let choices = serde_json::to_string(&question.choices)?;
        let now = Utc::now();

        match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(question.category_id)
                .bind(&question.prompt)
                .bind(&choices)
                .bind(question.correct_choice)
                .bind(now)
                .bind(question.id)
                .execute(self.pool.sqlite()?)
                .await
                .map(|_| ()),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(question.category_id)
                .bind(&question.prompt)
                .bind(&choices)
                .bind(question.correct_choice)
                .bind(now)
                .bind(question.id)
                .execute(self.pool.mysql()?)
                .await
                .map(|_| ()),
        }
        .context("Failed to update question")?;

        Ok(Question {
            updated_at: now,
            ..question.clone()
        })
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let _timer = self.pool.monitor().start("questions.delete");
        let sql = "DELETE FROM questions WHERE id = ?";

        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(id)
                .execute(self.pool.sqlite()?)
                .await
                .map(|r| r.rows_affected()),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(id)
                .execute(self.pool.mysql()?)
                .await
                .map(|r| r.rows_affected()),
        }
        .context("Failed to delete question")?;

        Ok(affected > 0)
    }

    async fn count_by_category(&self, category_id: i64) -> Result<i64> {
        let _timer = self.pool.monitor().start("questions.count_by_category");
        let sql = "SELECT COUNT(*) FROM questions WHERE category_id = ?";

        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query_scalar::<_, i64>(sql)
                    .bind(category_id)
                    .fetch_one(self.pool.sqlite()?)
                    .await
            }
            DatabaseDriver::Mysql => {
                sqlx::query_scalar::<_, i64>(sql)
                    .bind(category_id)
                    .fetch_one(self.pool.mysql()?)
                    .await
            }
        }
        .context("Failed to count questions")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{CategoryRepository, SqlxCategoryRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::Category;

    async fn setup() -> (DynDatabasePool, i64, i64) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool).await.expect("Failed to run migrations");

        let categories = SqlxCategoryRepository::new(pool.clone());
        let math = categories.create(&Category::new("Math".to_string(), None)).await.unwrap();
        let art = categories.create(&Category::new("Art".to_string(), None)).await.unwrap();
        (pool, math.id, art.id)
    }

    fn question(category_id: i64, prompt: &str) -> Question {
        Question::new(
            category_id,
            prompt.to_string(),
            vec!["yes".to_string(), "no".to_string()],
            0,
        )
    }

    #[tokio::test]
    async fn test_create_and_get_question() {
        let (pool, math, _) = setup().await;
        let repo = SqlxQuestionRepository::new(pool);

        let created = repo.create(&question(math, "Is 2 prime?")).await.unwrap();
        assert!(created.id > 0);

        let found = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(found.prompt, "Is 2 prime?");
        assert_eq!(found.choices, vec!["yes", "no"]);
        assert_eq!(found.correct_choice, 0);
        assert!(repo.get_by_id(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_filters_by_category() {
        let (pool, math, art) = setup().await;
        let repo = SqlxQuestionRepository::new(pool);

        repo.create(&question(math, "q1")).await.unwrap();
        repo.create(&question(art, "q2")).await.unwrap();
        repo.create(&question(math, "q3")).await.unwrap();

        assert_eq!(repo.list(None).await.unwrap().len(), 3);
        let prompts: Vec<String> = repo
            .list(Some(math))
            .await
            .unwrap()
            .into_iter()
            .map(|q| q.prompt)
            .collect();
        assert_eq!(prompts, vec!["q1", "q3"]);
        assert_eq!(repo.count_by_category(math).await.unwrap(), 2);
        assert_eq!(repo.count_by_category(art).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_create_requires_existing_category() {
        let (pool, _, _) = setup().await;
        let repo = SqlxQuestionRepository::new(pool);

        assert!(repo.create(&question(999, "orphan")).await.is_err());
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let (pool, math, art) = setup().await;
        let repo = SqlxQuestionRepository::new(pool);

        let mut q = repo.create(&question(math, "before")).await.unwrap();
        q.prompt = "after".to_string();
        q.category_id = art;
        q.choices.push("maybe".to_string());
        q.correct_choice = 2;
        repo.update(&q).await.unwrap();

        let stored = repo.get_by_id(q.id).await.unwrap().unwrap();
        assert_eq!(stored.prompt, "after");
        assert_eq!(stored.category_id, art);
        assert_eq!(stored.choices.len(), 3);
        assert_eq!(stored.correct_choice, 2);

        assert!(repo.delete(q.id).await.unwrap());
        assert!(!repo.delete(q.id).await.unwrap());
    }
}
