//! Helpers for tests that need a real database. Enabled with the `test_utils` feature.
#[cfg(feature = "sqlite")]
pub mod prepare_env;
#[cfg(feature = "sqlite")]
pub use prepare_env::{create_database, prepare_test_env, random_db_path, run_migrations};
