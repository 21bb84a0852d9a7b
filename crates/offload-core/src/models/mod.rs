//! Data models shared by the storage services, the repository and the HTTP surface

mod file;
mod migration;

pub use file::*;
pub use migration::*;
