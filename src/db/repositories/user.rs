//! User repository
//!
//! Database operations for users authenticated through the identity
//! provider.
//!
//! This module provides:
//! - `UserRepository` trait defining the interface for user data access
//! - `SqlxUserRepository` implementing the trait for SQLite and MySQL

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{User, UserRole};

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user
    async fn create(&self, user: &User) -> Result<User>;

    /// Get user by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Get user by identity provider subject
    async fn get_by_external_id(&self, external_id: &str) -> Result<Option<User>>;

    /// Update profile fields and role
    async fn update(&self, user: &User) -> Result<User>;

    /// Total number of users
    async fn count(&self) -> Result<i64>;
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i64,
    external_id: String,
    username: String,
    email: Option<String>,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            external_id: row.external_id,
            username: row.username,
            email: row.email,
            // Unknown roles never grant admin
            role: row.role.parse().unwrap_or(UserRole::Player),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const SELECT_COLUMNS: &str =
    "SELECT id, external_id, username, email, role, created_at, updated_at FROM users";

/// SQLx-based user repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        let _timer = self.pool.monitor().start("users.create");
        let sql = "INSERT INTO users (external_id, username, email, role, created_at, updated_at) \
                   VALUES (?, ?, ?, ?, ?, ?)";
        let role = user.role.to_string();

        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(&user.external_id)
                .bind(&user.username)
                .bind(&user.email)
                .bind(&role)
                .bind(user.created_at)
                .bind(user.updated_at)
                .execute(self.pool.sqlite()?)
                .await
                .map(|r| r.last_insert_rowid()),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(&user.external_id)
                .bind(&user.username)
                .bind(&user.email)
                .bind(&role)
                .bind(user.created_at)
                .bind(user.updated_at)
                .execute(self.pool.mysql()?)
                .await
                .map(|r| r.last_insert_id() as i64),
        }
        .context("Failed to create user")?;

        Ok(User {
            id,
            ..user.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let _timer = self.pool.monitor().start("users.get_by_id");
        let sql = format!("{} WHERE id = ?", SELECT_COLUMNS);

        let row = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query_as::<_, UserRow>(&sql)
                    .bind(id)
                    .fetch_optional(self.pool.sqlite()?)
                    .await
            }
            DatabaseDriver::Mysql => {
                sqlx::query_as::<_, UserRow>(&sql)
                    .bind(id)
                    .fetch_optional(self.pool.mysql()?)
                    .await
            }
        }
        .context("Failed to get user by id")?;

        Ok(row.map(User::from))
    }

    async fn get_by_external_id(&self, external_id: &str) -> Result<Option<User>> {
        let _timer = self.pool.monitor().start("users.get_by_external_id");
        let sql = format!("{} WHERE external_id = ?", SELECT_COLUMNS);

        let row = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query_as::<_, UserRow>(&sql)
                    .bind(external_id)
                    .fetch_optional(self.pool.sqlite()?)
                    .await
            }
            DatabaseDriver::Mysql => {
                sqlx::query_as::<_, UserRow>(&sql)
                    .bind(external_id)
                    .fetch_optional(self.pool.mysql()?)
                    .await
            }
        }
        .context("Failed to get user by external id")?;

        Ok(row.map(User::from))
    }

    async fn update(&self, user: &User) -> Result<User> {
        let _timer = self.pool.monitor().start("users.update");
        let sql = "UPDATE users SET username = ?, email = ?, role = ?, updated_at = ? WHERE id = ?";
        let now = Utc::now();
        let role = user.role.to_string();

        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(&user.username)
                    .bind(&user.email)
                    .bind(&role)
                    .bind(now)
                    .bind(user.id)
                    .execute(self.pool.sqlite()?)
                    .await
                    .map(|_| ())
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(&user.username)
                    .bind(&user.email)
                    .bind(&role)
                    .bind(now)
                    .bind(user.id)
                    .execute(self.pool.mysql()?)
                    .await
                    .map(|_| ())
            }
        }
        .context("Failed to update user")?;

        Ok(User {
            updated_at: now,
            ..user.clone()
        })
    }

    async fn count(&self) -> Result<i64> {
        let _timer = self.pool.monitor().start("users.count");
        let sql = "SELECT COUNT(*) FROM users";

        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query_scalar::<_, i64>(sql)
                    .fetch_one(self.pool.sqlite()?)
                    .await
            }
            DatabaseDriver::Mysql => {
                sqlx::query_scalar::<_, i64>(sql)
                    .fetch_one(self.pool.mysql()?)
                    .await
            }
        }
        .context("Failed to count users")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use crate::models::ExternalIdentity;

    async fn setup_test_db() -> DynDatabasePool {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool).await.expect("Failed to run migrations");
        pool
    }

    fn identity(subject: &str) -> ExternalIdentity {
        ExternalIdentity {
            subject: subject.to_string(),
            username: format!("user-{}", subject),
            email: Some(format!("{}@example.com", subject)),
        }
    }

    #[tokio::test]
    async fn test_create_and_get_user() {
        let pool = setup_test_db().await;
        let repo = SqlxUserRepository::new(pool);

        let created = repo
            .create(&User::new(identity("42"), UserRole::Admin))
            .await
            .expect("Failed to create user");
        assert!(created.id > 0);

        let by_id = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(by_id.external_id, "42");
        assert_eq!(by_id.role, UserRole::Admin);
        assert_eq!(by_id.email.as_deref(), Some("42@example.com"));

        let by_external = repo.get_by_external_id("42").await.unwrap().unwrap();
        assert_eq!(by_external.id, created.id);
    }

    #[tokio::test]
    async fn test_get_missing_user() {
        let pool = setup_test_db().await;
        let repo = SqlxUserRepository::new(pool);

        assert!(repo.get_by_id(999).await.unwrap().is_none());
        assert!(repo.get_by_external_id("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_external_id_rejected() {
        let pool = setup_test_db().await;
        let repo = SqlxUserRepository::new(pool);

        repo.create(&User::new(identity("7"), UserRole::Player)).await.unwrap();
        assert!(repo.create(&User::new(identity("7"), UserRole::Player)).await.is_err());
    }

    #[tokio::test]
    async fn test_update_and_count() {
        let pool = setup_test_db().await;
        let repo = SqlxUserRepository::new(pool);

        assert_eq!(repo.count().await.unwrap(), 0);

        let mut user = repo
            .create(&User::new(identity("1"), UserRole::Player))
            .await
            .unwrap();
        user.username = "renamed".to_string();
        user.email = None;
        repo.update(&user).await.unwrap();

        let stored = repo.get_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.username, "renamed");
        assert!(stored.email.is_none());
        assert_eq!(repo.count().await.unwrap(), 1);
    }
}
