//! Offload Storage Library
//!
//! This crate provides the storage contract shared by the remote providers and its S3 and
//! Google Cloud Storage implementations.
//!
//! # Key format
//!
//! Every backend derives keys the same way (see `keys`):
//!
//! `[{folder}/]{YYYY}/{MM}/{DD}/{owner_type}/{SUFFIX}_{sanitized_file_name}`
//!
//! where `SUFFIX` is 8 characters from `A-Z0-9`. A deployment may replace the layout with a
//! key override hook.
//!
//! # References
//!
//! A stored object is addressed by its reference (`private:<key>` or `public:<key>`), which
//! host records keep in their `content_hash` column. See `reference`.

pub mod content;
pub mod factory;
#[cfg(feature = "storage-gcs")]
pub mod gcs;
pub mod keys;
pub mod reference;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use content::detect_content_type;
pub use factory::create_storage;
#[cfg(feature = "storage-gcs")]
pub use gcs::GcsStorage;
pub use keys::{KeyGenerator, KeyOverride, SanitizePolicy};
pub use offload_core::{StorageBackend, Visibility};
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{ConnectionStatus, Storage, StorageError, StorageResult};
