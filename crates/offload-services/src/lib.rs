//! Offload Services
//!
//! Moves file attachments from the host's local disk to remote storage:
//!
//! - `upload`: offloads one file record (upload, repoint, remove the local copy)
//! - `migration`: bulk migration of every local file with a bounded worker pool
//! - `controller`: the surface the host application and operators call

pub mod controller;
pub mod migration;
pub mod upload;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use controller::{CloudStorage, ConnectionTestResult, GenerateFileResponse};
pub use migration::MigrationEngine;
pub use upload::{SkipReason, UploadOrchestrator, UploadOutcome};
