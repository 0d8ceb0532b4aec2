//! Quiz backend - A small REST service for category-based quizzes
//!
//! Players sign in through an external identity provider, start quiz
//! sessions over a category, answer its questions and get a score. Admins
//! manage categories and questions.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod validation;
