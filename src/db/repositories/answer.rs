//! Answer repository
//!
//! The `(session_id, question_id)` unique key decides duplicate submissions,
//! and the insert only happens while the session's `finished_at` is still
//! NULL. Both outcomes are reported through [`AnswerInsert`] rather than as
//! errors.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Answer, NewAnswer};

/// Outcome of [`AnswerRepository::create`]
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerInsert {
    Recorded(Answer),
    /// The question was already answered in this session
    Duplicate,
    /// The session is finalized (or gone)
    SessionClosed,
}

/// Answer repository trait
#[async_trait]
pub trait AnswerRepository: Send + Sync {
    /// Insert an answer into a session that is still open
    async fn create(&self, answer: NewAnswer) -> Result<AnswerInsert>;

    /// Answers of one session in submission order
    async fn list_by_session(&self, session_id: i64) -> Result<Vec<Answer>>;

    /// Number of answers recorded for a question across all sessions
    async fn count_by_question(&self, question_id: i64) -> Result<i64>;

}

#[derive(Debug, sqlx::FromRow)]
struct AnswerRow {
    id: i64,
    session_id: i64,
    question_id: i64,
    choice: i64,
    is_correct: bool,
    answered_at: DateTime<Utc>,
}

impl From<AnswerRow> for Answer {
    fn from(row: AnswerRow) -> Self {
        Answer {
            id: row.id,
            session_id: row.session_id,
            question_id: row.question_id,
            choice: row.choice,
            is_correct: row.is_correct,
            answered_at: row.answered_at,
        }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// SQLx-based answer repository implementation
pub struct SqlxAnswerRepository {
    pool: DynDatabasePool,
}

impl SqlxAnswerRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn AnswerRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl AnswerRepository for SqlxAnswerRepository {
    async fn create(&self, answer: NewAnswer) -> Result<AnswerInsert> {
        let _timer = self.pool.monitor().start("answers.create");
        let sql = "INSERT INTO answers (session_id, question_id, choice, is_correct, answered_at) \
                   SELECT ?, ?, ?, ?, ? FROM sessions WHERE id = ? AND finished_at IS NULL";
        let now = Utc::now();

        let result = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(answer.session_id)
                .bind(answer.question_id)
                .bind(answer.choice)
                .bind(answer.is_correct)
                .bind(now)
                .bind(answer.session_id)
                .execute(self.pool.sqlite()?)
                .await
                .map(|r| (r.rows_affected(), r.last_insert_rowid())),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(answer.session_id)
                .bind(answer.question_id)
                .bind(answer.choice)
                .bind(answer.is_correct)
                .bind(now)
                .bind(answer.session_id)
                .execute(self.pool.mysql()?)
                .await
                .map(|r| (r.rows_affected(), r.last_insert_id() as i64)),
        };

        match result {
            Ok((0, _)) => Ok(AnswerInsert::SessionClosed),
            Ok((_, id)) => Ok(AnswerInsert::Recorded(answer.into_answer(id, now))),
            Err(err) if is_unique_violation(&err) => Ok(AnswerInsert::Duplicate),
            Err(err) => Err(err).context("Failed to create answer"),
        }
    }

    async fn list_by_session(&self, session_id: i64) -> Result<Vec<Answer>> {
        let _timer = self.pool.monitor().start("answers.list_by_session");
        let sql = "SELECT id, session_id, question_id, choice, is_correct, answered_at \
                   FROM answers WHERE session_id = ? ORDER BY id";

        let rows = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query_as::<_, AnswerRow>(sql)
                    .bind(session_id)
                    .fetch_all(self.pool.sqlite()?)
                    .await
            }
            DatabaseDriver::Mysql => {
                sqlx::query_as::<_, AnswerRow>(sql)
                    .bind(session_id)
                    .fetch_all(self.pool.mysql()?)
                    .await
            }
        }
        .context("Failed to list answers")?;

        Ok(rows.into_iter().map(Answer::from).collect())
    }

    async fn count_by_question(&self, question_id: i64) -> Result<i64> {
        let _timer = self.pool.monitor().start("answers.count_by_question");
        let sql = "SELECT COUNT(*) FROM answers WHERE question_id = ?";

        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query_scalar::<_, i64>(sql)
                    .bind(question_id)
                    .fetch_one(self.pool.sqlite()?)
                    .await
            }
            DatabaseDriver::Mysql => {
                sqlx::query_scalar::<_, i64>(sql)
                    .bind(question_id)
                    .fetch_one(self.pool.mysql()?)
                    .await
            }
        }
        .context("Failed to count answers")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> DynDatabasePool {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool).await.expect("Failed to run migrations");
        for sql in [
            "INSERT INTO users (external_id, username) VALUES ('ext-1', 'ada')",
            "INSERT INTO categories (name) VALUES ('Math')",
            "INSERT INTO questions (category_id, prompt, choices, correct_choice) VALUES (1, 'q1', '[\"a\",\"b\"]', 0)",
            "INSERT INTO questions (category_id, prompt, choices, correct_choice) VALUES (1, 'q2', '[\"a\",\"b\"]', 1)",
            "INSERT INTO sessions (user_id, category_id) VALUES (1, 1)",
        ] {
            pool.execute(sql).await.unwrap();
        }
        pool
    }

    fn new_answer(question_id: i64, choice: i64, is_correct: bool) -> NewAnswer {
        NewAnswer {
            session_id: 1,
            question_id,
            choice,
            is_correct,
        }
    }

    async fn recorded(repo: &SqlxAnswerRepository, answer: NewAnswer) -> Answer {
        match repo.create(answer).await.unwrap() {
            AnswerInsert::Recorded(answer) => answer,
            other => panic!("answer not recorded: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_and_list_answers() {
        let repo = SqlxAnswerRepository::new(setup().await);

        let first = recorded(&repo, new_answer(1, 0, true)).await;
        let second = recorded(&repo, new_answer(2, 0, false)).await;
        assert!(first.id > 0);

        let answers = repo.list_by_session(1).await.unwrap();
        assert_eq!(answers.len(), 2);
        assert_eq!(answers[0].id, first.id);
        assert_eq!(answers[1].id, second.id);
        assert!(answers[0].is_correct);
        assert!(!answers[1].is_correct);
    }

    #[tokio::test]
    async fn test_duplicate_answer_is_reported() {
        let repo = SqlxAnswerRepository::new(setup().await);

        recorded(&repo, new_answer(1, 0, true)).await;
        assert_eq!(
            repo.create(new_answer(1, 1, false)).await.unwrap(),
            AnswerInsert::Duplicate
        );
        assert_eq!(repo.list_by_session(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_no_insert_into_finalized_session() {
        let pool = setup().await;
        let repo = SqlxAnswerRepository::new(pool.clone());
        recorded(&repo, new_answer(1, 0, true)).await;

        pool.execute("UPDATE sessions SET finished_at = CURRENT_TIMESTAMP, score = 1, total_questions = 2 WHERE id = 1")
            .await
            .unwrap();

        assert_eq!(
            repo.create(new_answer(2, 1, true)).await.unwrap(),
            AnswerInsert::SessionClosed
        );
        assert_eq!(repo.list_by_session(1).await.unwrap().len(), 1);

        let mut missing = new_answer(2, 1, true);
        missing.session_id = 42;
        assert_eq!(repo.create(missing).await.unwrap(), AnswerInsert::SessionClosed);
    }

    #[tokio::test]
    async fn test_unknown_question_is_an_error() {
        let repo = SqlxAnswerRepository::new(setup().await);

        assert!(repo.create(new_answer(999, 0, false)).await.is_err());
    }

    #[tokio::test]
    async fn test_counts() {
        let repo = SqlxAnswerRepository::new(setup().await);

        repo.create(new_answer(1, 0, true)).await.unwrap();
        repo.create(new_answer(2, 0, false)).await.unwrap();

        assert_eq!(repo.count_by_question(1).await.unwrap(), 1);
        assert_eq!(repo.count_by_question(2).await.unwrap(), 1);
    }
}
