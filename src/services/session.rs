//! Quiz session service
//!
//! Drives one user's attempt at a category: start a session, show the
//! questions, record answers, finalize with a score.
//!
//! Sessions are private. A session owned by another user is reported as
//! not found rather than forbidden, so session IDs can't be probed.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use crate::db::repositories::{
    AnswerInsert, AnswerRepository, CategoryRepository, QuestionRepository, SessionRepository,
};
use crate::models::{Answer, NewAnswer, PublicQuestion, QuizSession, SessionOutcome, User};

/// Error types for quiz session operations
#[derive(Debug, thiserror::Error)]
pub enum QuizSessionError {
    #[error("Session not found: {0}")]
    NotFound(i64),

    #[error("Category not found: {0}")]
    CategoryNotFound(i64),

    /// Question missing or belonging to another category
    #[error("Question {0} is not part of this quiz")]
    QuestionNotInQuiz(i64),

    #[error("Choice {choice} is not valid for question {question_id}")]
    InvalidChoice { question_id: i64, choice: i64 },

    #[error("Question {0} was already answered in this session")]
    AlreadyAnswered(i64),

    #[error("Session {0} is already finalized")]
    AlreadyFinished(i64),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// A session together with its recorded answers
#[derive(Debug, Clone, Serialize)]
pub struct SessionDetail {
    #[serde(flatten)]
    pub session: QuizSession,
    pub answers: Vec<Answer>,
}

/// An answer submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitAnswerInput {
    pub question_id: i64,
    pub choice: i64,
}

pub struct QuizSessionService {
    sessions: Arc<dyn SessionRepository>,
    answers: Arc<dyn AnswerRepository>,
    questions: Arc<dyn QuestionRepository>,
    categories: Arc<dyn CategoryRepository>,
}

impl QuizSessionService {
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        answers: Arc<dyn AnswerRepository>,
        questions: Arc<dyn QuestionRepository>,
        categories: Arc<dyn CategoryRepository>,
    ) -> Self {
        Self {
            sessions,
            answers,
            questions,
            categories,
        }
    }

    /// Start a new session over `category_id` for `user`
    pub async fn create(&self, user: &User, category_id: i64) -> Result<QuizSession, QuizSessionError> {
        if self.categories.get_by_id(category_id).await?.is_none() {
            return Err(QuizSessionError::CategoryNotFound(category_id));
        }

        let session = self
            .sessions
            .create(&QuizSession::new(user.id, category_id))
            .await?;
        tracing::info!(
            session_id = session.id,
            user_id = user.id,
            category_id,
            "quiz session started"
        );
        Ok(session)
    }

    /// The user's sessions, newest first
    pub async fn list(&self, user: &User) -> Result<Vec<QuizSession>, QuizSessionError> {
        Ok(self.sessions.list_by_user(user.id).await?)
    }

    /// A session and its answers
    pub async fn get(&self, user: &User, id: i64) -> Result<SessionDetail, QuizSessionError> {
        let session = self.owned_session(user, id).await?;
        let answers = self.answers.list_by_session(id).await?;
        Ok(SessionDetail { session, answers })
    }

    /// Questions of the session's category, without correct answers
    pub async fn questions(&self, user: &User, id: i64) -> Result<Vec<PublicQuestion>, QuizSessionError> {
        let session = self.owned_session(user, id).await?;
        let questions = self.questions.list(Some(session.category_id)).await?;
        Ok(questions.iter().map(|q| q.to_public()).collect())
    }

    /// Record an answer; correctness is decided now and never recomputed
    pub async fn submit_answer(
        &self,
        user: &User,
        id: i64,
        input: SubmitAnswerInput,
    ) -> Result<Answer, QuizSessionError> {
        let session = self.owned_session(user, id).await?;
        if session.is_finished() {
            return Err(QuizSessionError::AlreadyFinished(id));
        }

        let question = self
            .questions
            .get_by_id(input.question_id)
            .await?
            .filter(|q| q.category_id == session.category_id)
            .ok_or(QuizSessionError::QuestionNotInQuiz(input.question_id))?;

        if !question.has_choice(input.choice) {
            return Err(QuizSessionError::InvalidChoice {
                question_id: question.id,
                choice: input.choice,
            });
        }

        let answer = NewAnswer {
            session_id: id,
            question_id: question.id,
            choice: input.choice,
            is_correct: question.is_correct(input.choice),
        };

        // The open check above can race a finalize; the insert re-checks it
        let answer = match self.answers.create(answer).await? {
            AnswerInsert::Recorded(answer) => answer,
            AnswerInsert::Duplicate => return Err(QuizSessionError::AlreadyAnswered(question.id)),
            AnswerInsert::SessionClosed => return Err(QuizSessionError::AlreadyFinished(id)),
        };
        tracing::debug!(
            session_id = id,
            question_id = question.id,
            correct = answer.is_correct,
            "answer recorded"
        );
        Ok(answer)
    }

    /// Score the session.
    ///
    /// Idempotent: finalizing an already finalized session returns the
    /// stored result unchanged.
    pub async fn finalize(&self, user: &User, id: i64) -> Result<QuizSession, QuizSessionError> {
        let session = self.owned_session(user, id).await?;
        if session.is_finished() {
            return Ok(session);
        }

        let outcome = SessionOutcome {
            total_questions: self.questions.count_by_category(session.category_id).await?,
            finished_at: Utc::now(),
        };
        let closed_here = self.sessions.finalize(id, &outcome).await?;

        // Re-read: the score is computed by storage, and a concurrent
        // finalize may have won
        let session = self
            .sessions
            .get_by_id(id)
            .await?
            .ok_or(QuizSessionError::NotFound(id))?;
        if closed_here {
            tracing::info!(
                session_id = id,
                score = session.score,
                total_questions = session.total_questions,
                "quiz session finalized"
            );
        }
        Ok(session)
    }

    async fn owned_session(&self, user: &User, id: i64) -> Result<QuizSession, QuizSessionError> {
        self.sessions
            .get_by_id(id)
            .await?
            .filter(|s| s.is_owned_by(user.id))
            .ok_or(QuizSessionError::NotFound(id))
    }
}
