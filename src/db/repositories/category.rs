//! Category repository
//!
//! Database operations for quiz categories.
//!
//! This module provides:
//! - `CategoryRepository` trait defining the interface for category data access
//! - `SqlxCategoryRepository` implementing the trait for SQLite and MySQL

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Category;

/// Category repository trait
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Create a new category
    async fn create(&self, category: &Category) -> Result<Category>;

    /// Get category by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Category>>;

    /// Get category by exact name
    async fn get_by_name(&self, name: &str) -> Result<Option<Category>>;

    /// List all categories ordered by name
    async fn list(&self) -> Result<Vec<Category>>;

    /// Update name and description
    async fn update(&self, category: &Category) -> Result<Category>;

    /// Delete a category; returns whether a row was removed
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Check if a category name already exists
    async fn exists_by_name(&self, name: &str) -> Result<bool>;
}

#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    id: i64,
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            id: row.id,
            name: row.name,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const SELECT_COLUMNS: &str = "SELECT id, name, description, created_at, updated_at FROM categories";

/// SQLx-based category repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxCategoryRepository {
    pool: DynDatabasePool,
}

impl SqlxCategoryRepository {
    /// Create a new SQLx category repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CategoryRepository> {
        Arc::new(Self::new(pool))
    }

    async fn fetch_one_where(&self, clause: &str, value: QueryValue<'_>) -> Result<Option<Category>> {
        let sql = format!("{} WHERE {}", SELECT_COLUMNS, clause);

        let row = match (self.pool.driver(), value) {
            (DatabaseDriver::Sqlite, QueryValue::Id(id)) => {
                sqlx::query_as::<_, CategoryRow>(&sql)
                    .bind(id)
                    .fetch_optional(self.pool.sqlite()?)
                    .await
            }
            (DatabaseDriver::Sqlite, QueryValue::Text(text)) => {
                sqlx::query_as::<_, CategoryRow>(&sql)
                    .bind(text)
                    .fetch_optional(self.pool.sqlite()?)
                    .await
            }
            (DatabaseDriver::Mysql, QueryValue::Id(id)) => {
                sqlx::query_as::<_, CategoryRow>(&sql)
                    .bind(id)
                    .fetch_optional(self.pool.mysql()?)
                    .await
            }
            (DatabaseDriver::Mysql, QueryValue::Text(text)) => {
                sqlx::query_as::<_, CategoryRow>(&sql)
                    .bind(text)
                    .fetch_optional(self.pool.mysql()?)
                    .await
            }
        }
        .with_context(|| format!("Failed to get category where {}", clause))?;

        Ok(row.map(Category::from))
    }
}

#[derive(Clone, Copy)]
enum QueryValue<'a> {
    Id(i64),
    Text(&'a str),
}

#[async_trait]
impl CategoryRepository for SqlxCategoryRepository {
    async fn create(&self, category: &Category) -> Result<Category> {
        let _timer = self.pool.monitor().start("categories.create");
        let sql = "INSERT INTO categories (name, description, created_at, updated_at) VALUES (?, ?, ?, ?)";

        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(&category.name)
                .bind(&category.description)
                .bind(category.created_at)
                .bind(category.updated_at)
                .execute(self.pool.sqlite()?)
                .await
                .map(|r| r.last_insert_rowid()),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(&category.name)
                .bind(&category.description)
                .bind(category.created_at)
                .bind(category.updated_at)
                .execute(self.pool.mysql()?)
                .await
                .map(|r| r.last_insert_id() as i64),
        }
        .context("Failed to create category")?;

        Ok(Category {
            id,
            ..category.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Category>> {
        let _timer = self.pool.monitor().start("categories.get_by_id");
        self.fetch_one_where("id = ?", QueryValue::Id(id)).await
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Category>> {
        let _timer = self.pool.monitor().start("categories.get_by_name");
        self.fetch_one_where("name = ?", QueryValue::Text(name)).await
    }

    async fn list(&self) -> Result<Vec<Category>> {
        let _timer = self.pool.monitor().start("categories.list");
        let sql = format!("{} ORDER BY name, id", SELECT_COLUMNS);

        let rows = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query_as::<_, CategoryRow>(&sql)
                    .fetch_all(self.pool.sqlite()?)
                    .await
            }
            DatabaseDriver::Mysql => {
                sqlx::query_as::<_, CategoryRow>(&sql)
                    .fetch_all(self.pool.mysql()?)
                    .await
            }
        }
        .context("Failed to list categories")?;

        Ok(rows.into_iter().map(Category::from).collect())
    }

    async fn update(&self, category: &Category) -> Result<Category> {
        let _timer = self.pool.monitor().start("categories.update");
        let sql = "UPDATE categories SET name = ?, description = ?, updated_at = ? WHERE id = ?";
        let now = Utc::now();

        match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(&category.name)
                .bind(&category.description)
                .bind(now)
                .bind(category.id)
                .execute(self.pool.sqlite()?)
                .await
                .map(|_| ()),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(&category.name)
                .bind(&category.description)
                .bind(now)
                .bind(category.id)
                .execute(self.pool.mysql()?)
                .await
                .map(|_| ()),
        }
        .context("Failed to update category")?;

        Ok(Category {
            updated_at: now,
            ..category.clone()
        })
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let _timer = self.pool.monitor().start("categories.delete");
        let sql = "DELETE FROM categories WHERE id = ?";

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
        .context("Failed to delete category")?;

        Ok(affected > 0)
    }

    async fn exists_by_name(&self, name: &str) -> Result<bool> {
        let _timer = self.pool.monitor().start("categories.exists_by_name");
        let sql = "SELECT COUNT(*) FROM categories WHERE name = ?";

        let count = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query_scalar::<_, i64>(sql)
                    .bind(name)
                    .fetch_one(self.pool.sqlite()?)
                    .await
            }
            DatabaseDriver::Mysql => {
                sqlx::query_scalar::<_, i64>(sql)
                    .bind(name)
                    .fetch_one(self.pool.mysql()?)
                    .await
            }
        }
        .context("Failed to check category name")?;

        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_db() -> DynDatabasePool {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool).await.expect("Failed to run migrations");
        pool
    }

    #[tokio::test]
    async fn test_create_and_get_category() {
        let pool = setup_test_db().await;
        let repo = SqlxCategoryRepository::new(pool);

        let created = repo
            .create(&Category::new("History".to_string(), Some("Dates".to_string())))
            .await
            .expect("Failed to create category");
        assert!(created.id > 0);

        let found = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(found.name, "History");
        assert_eq!(found.description.as_deref(), Some("Dates"));

        let by_name = repo.get_by_name("History").await.unwrap().unwrap();
        assert_eq!(by_name.id, created.id);
        assert!(repo.get_by_id(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_sorted_by_name() {
        let pool = setup_test_db().await;
        let repo = SqlxCategoryRepository::new(pool);

        for name in ["Zoology", "Art", "Math"] {
            repo.create(&Category::new(name.to_string(), None)).await.unwrap();
        }

        let names: Vec<String> = repo.list().await.unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Art", "Math", "Zoology"]);
    }

    #[tokio::test]
    async fn test_exists_by_name_and_unique() {
        let pool = setup_test_db().await;
        let repo = SqlxCategoryRepository::new(pool);

        assert!(!repo.exists_by_name("Math").await.unwrap());
        repo.create(&Category::new("Math".to_string(), None)).await.unwrap();
        assert!(repo.exists_by_name("Math").await.unwrap());
        assert!(repo.create(&Category::new("Math".to_string(), None)).await.is_err());
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let pool = setup_test_db().await;
        let repo = SqlxCategoryRepository::new(pool);

        let mut category = repo
            .create(&Category::new("Old".to_string(), Some("desc".to_string())))
            .await
            .unwrap();
        category.name = "New".to_string();
        category.description = None;
        repo.update(&category).await.unwrap();

        let stored = repo.get_by_id(category.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "New");
        assert!(stored.description.is_none());

        assert!(repo.delete(category.id).await.unwrap());
        assert!(!repo.delete(category.id).await.unwrap());
        assert!(repo.get_by_id(category.id).await.unwrap().is_none());
    }
}
