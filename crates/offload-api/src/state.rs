//! Application state shared by all handlers

use offload_services::CloudStorage;

pub struct AppState {
    pub cloud: CloudStorage,
}

impl AppState {
    pub fn new(cloud: CloudStorage) -> Self {
        Self { cloud }
    }
}
