//! SQLite persistence for wallet records using Diesel ORM.

pub mod connection;
pub mod model;
pub mod repository;
pub mod schema;

pub use connection::{create_pool, open, run_migrations, DbPool};
pub use repository::SqliteWalletRepository;
