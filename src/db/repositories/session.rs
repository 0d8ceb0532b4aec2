//! Quiz session repository
//!
//! Finalization is a conditional update on `finished_at IS NULL`, so of two
//! concurrent finalize calls exactly one writes the outcome. The score is
//! counted inside that update; answers are only inserted while
//! `finished_at IS NULL`, so none can land after the count.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{QuizSession, SessionOutcome};

/// Quiz session repository trait
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Create a new session
    async fn create(&self, session: &QuizSession) -> Result<QuizSession>;

    /// Get session by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<QuizSession>>;

    /// Sessions of one user, newest first
    async fn list_by_user(&self, user_id: i64) -> Result<Vec<QuizSession>>;

    /// Close the session and store its score if it is still open.
    ///
    /// Returns `false` when the session was already finalized (or missing).
    async fn finalize(&self, id: i64, outcome: &SessionOutcome) -> Result<bool>;

    /// Number of sessions taken over a category
    async fn count_by_category(&self, category_id: i64) -> Result<i64>;
}

#[derive(Debug, sqlx::FromRow)]
struct SessionRow {
    id: i64,
    user_id: i64,
    category_id: i64,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    score: Option<i64>,
    total_questions: Option<i64>,
}

impl From<SessionRow> for QuizSession {
    fn from(row: SessionRow) -> Self {
        QuizSession {
            id: row.id,
            user_id: row.user_id,
            category_id: row.category_id,
            started_at: row.started_at,
            finished_at: row.finished_at,
            score: row.score,
            total_questions: row.total_questions,
        }
    }
}

const SELECT_COLUMNS: &str = "SELECT id, user_id, category_id, started_at, finished_at, score, total_questions \
                              FROM sessions";

/// SQLx-based session repository implementation
pub struct SqlxSessionRepository {
    pool: DynDatabasePool,
}

impl SqlxSessionRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SessionRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SessionRepository for SqlxSessionRepository {
    async fn create(&self, session: &QuizSession) -> Result<QuizSession> {
        let _timer = self.pool.monitor().start("sessions.create");
        let sql = "INSERT INTO sessions (user_id, category_id, started_at) VALUES (?, ?, ?)";

        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(session.user_id)
                .bind(session.category_id)
                .bind(session.started_at)
                .execute(self.pool.sqlite()?)
                .await
                .map(|r| r.last_insert_rowid()),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(session.user_id)
                .bind(session.category_id)
                .bind(session.started_at)
                .execute(self.pool.mysql()?)
                .await
                .map(|r| r.last_insert_id() as i64),
        }
        .context("Failed to create session")?;

        Ok(QuizSession {
            id,
            ..session.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<QuizSession>> {
        let _timer = self.pool.monitor().start("sessions.get_by_id");
        let sql = format!("{} WHERE id = ?", SELECT_COLUMNS);

        let row = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query_as::<_, SessionRow>(&sql)
                    .bind(id)
                    .fetch_optional(self.pool.sqlite()?)
                    .await
            }
            DatabaseDriver::Mysql => {
                sqlx::query_as::<_, SessionRow>(&sql)
                    .bind(id)
                    .fetch_optional(self.pool.mysql()?)
                    .await
            }
        }
        .context("Failed to get session by id")?;

        Ok(row.map(QuizSession::from))
    }

    async fn list_by_user(&self, user_id: i64) -> Result<Vec<QuizSession>> {
        let _timer = self.pool.monitor().start("sessions.list_by_user");
        let sql = format!(
            "{} WHERE user_id = ? ORDER BY started_at DESC, id DESC",
            SELECT_COLUMNS
        );

        let rows = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query_as::<_, SessionRow>(&sql)
                    .bind(user_id)
                    .fetch_all(self.pool.sqlite()?)
                    .await
            }
            DatabaseDriver::Mysql => {
                sqlx::query_as::<_, SessionRow>(&sql)
                    .bind(user_id)
                    .fetch_all(self.pool.mysql()?)
                    .await
            }
        }
        .context("Failed to list sessions")?;

        Ok(rows.into_iter().map(QuizSession::from).collect())
    }

    async fn finalize(&self, id: i64, outcome: &SessionOutcome) -> Result<bool> {
        let _timer = self.pool.monitor().start("sessions.finalize");
        let sql = "UPDATE sessions SET finished_at = ?, total_questions = ?, \
                   score = (SELECT COUNT(*) FROM answers WHERE answers.session_id = ? AND answers.is_correct = ?) \
                   WHERE id = ? AND finished_at IS NULL";

        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(outcome.finished_at)
                .bind(outcome.total_questions)
                .bind(id)
                .bind(true)
                .bind(id)
                .execute(self.pool.sqlite()?)
                .await
                .map(|r| r.rows_affected()),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(outcome.finished_at)
                .bind(outcome.total_questions)
                .bind(id)
                .bind(true)
                .bind(id)
                .execute(self.pool.mysql()?)
                .await
                .map(|r| r.rows_affected()),
        }
        .context("Failed to finalize session")?;

        Ok(affected > 0)
    }

    async fn count_by_category(&self, category_id: i64) -> Result<i64> {
        let _timer = self.pool.monitor().start("sessions.count_by_category");
        let sql = "SELECT COUNT(*) FROM sessions WHERE category_id = ?";

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
        .context("Failed to count sessions")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use chrono::Duration;

    async fn setup() -> DynDatabasePool {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool).await.expect("Failed to run migrations");
        pool.execute("INSERT INTO users (external_id, username) VALUES ('ext-1', 'ada')")
            .await
            .unwrap();
        pool.execute("INSERT INTO users (external_id, username) VALUES ('ext-2', 'grace')")
            .await
            .unwrap();
        pool.execute("INSERT INTO categories (name) VALUES ('Math')")
            .await
            .unwrap();
        pool
    }

    #[tokio::test]
    async fn test_create_and_get_session() {
        let repo = SqlxSessionRepository::new(setup().await);

        let created = repo.create(&QuizSession::new(1, 1)).await.unwrap();
        assert!(created.id > 0);

        let found = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(found.user_id, 1);
        assert_eq!(found.category_id, 1);
        assert!(!found.is_finished());
        assert!(repo.get_by_id(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_by_user_newest_first() {
        let repo = SqlxSessionRepository::new(setup().await);

        let mut older = QuizSession::new(1, 1);
        older.started_at = Utc::now() - Duration::hours(1);
        let older = repo.create(&older).await.unwrap();
        let newer = repo.create(&QuizSession::new(1, 1)).await.unwrap();
        repo.create(&QuizSession::new(2, 1)).await.unwrap();

        let ids: Vec<i64> = repo
            .list_by_user(1)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec![newer.id, older.id]);
    }

    #[tokio::test]
    async fn test_finalize_only_once() {
        let pool = setup().await;
        let repo = SqlxSessionRepository::new(pool.clone());
        let session = repo.create(&QuizSession::new(1, 1)).await.unwrap();
        for sql in [
            "INSERT INTO questions (category_id, prompt, choices, correct_choice) VALUES (1, 'q1', '[\"a\",\"b\"]', 0)",
            "INSERT INTO questions (category_id, prompt, choices, correct_choice) VALUES (1, 'q2', '[\"a\",\"b\"]', 0)",
            "INSERT INTO answers (session_id, question_id, choice, is_correct) VALUES (1, 1, 0, 1)",
            "INSERT INTO answers (session_id, question_id, choice, is_correct) VALUES (1, 2, 1, 0)",
        ] {
            pool.execute(sql).await.unwrap();
        }

        let first = SessionOutcome {
            total_questions: 3,
            finished_at: Utc::now(),
        };
        assert!(repo.finalize(session.id, &first).await.unwrap());

        let second = SessionOutcome {
            total_questions: 9,
            finished_at: Utc::now(),
        };
        assert!(!repo.finalize(session.id, &second).await.unwrap());

        let stored = repo.get_by_id(session.id).await.unwrap().unwrap();
        assert_eq!(stored.score, Some(1));
        assert_eq!(stored.total_questions, Some(3));
        assert!(stored.is_finished());
    }

    #[tokio::test]
    async fn test_count_by_category() {
        let repo = SqlxSessionRepository::new(setup().await);

        assert_eq!(repo.count_by_category(1).await.unwrap(), 0);
        repo.create(&QuizSession::new(1, 1)).await.unwrap();
        assert_eq!(repo.count_by_category(1).await.unwrap(), 1);
    }
}
