//! Database access for offload
//!
//! PostgreSQL implementation of `offload_core::FileRepository` and pool setup.

pub mod file;
pub mod setup;

pub use file::PgFileRepository;
pub use setup::setup_database;
