//! Application state shared across handlers.

use std::sync::Arc;

use crate::services::InventoryService;

/// Application state shared across all handlers.
///
/// Cheap to clone; the service lives behind one `Arc`.
#[derive(Clone, Debug)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

#[derive(Debug)]
struct AppStateInner {
    inventory: InventoryService,
}

impl AppState {
    /// Create application state around a ready service.
    #[must_use]
    pub fn new(inventory: InventoryService) -> Self {
        Self {
            inner: Arc::new(AppStateInner { inventory }),
        }
    }

    /// Get a reference to the inventory service.
    #[must_use]
    pub fn inventory(&self) -> &InventoryService {
        &self.inner.inventory
    }
}
