//! Database layer
//!
//! Persistence for the quiz backend. It supports:
//! - SQLite (default, single file or in-memory for tests)
//! - MySQL
//!
//! The driver is selected by configuration. Application code only sees the
//! [`DatabasePool`] trait; repositories dispatch on [`DatabasePool::driver`].
//!
//! # Usage
//!
//! ```ignore
//! use quiz_backend::config::DatabaseConfig;
//! use quiz_backend::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! pool.ping().await?;
//! ```

pub mod cleanup;
pub mod migrations;
pub mod monitor;
pub mod pool;
pub mod repositories;

pub use cleanup::{clear_all, table_counts, CleanupReport, CLEANUP_ORDER};
pub use monitor::{QueryMonitor, QueryTimer};
pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};
