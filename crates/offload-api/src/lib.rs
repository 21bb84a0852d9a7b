//! Offload API Library
//!
//! HTTP surface over `CloudStorage`: the signed download redirect, the record hooks and the
//! operator endpoints (migration, connection test).

pub mod error;
pub mod handlers;
pub mod setup;
pub mod state;

pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
