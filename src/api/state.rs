use std::sync::Arc;

use crate::{models::Catalog, services::driver::StatusHandle};

/// Shared state for the status API
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub status: StatusHandle,
}

impl AppState {
    pub fn new(catalog: Arc<Catalog>, status: StatusHandle) -> Self {
        Self { catalog, status }
    }
}
