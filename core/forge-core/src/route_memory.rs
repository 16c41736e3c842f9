//! Route Memory: the last authorized path, persisted across restarts.
//!
//! Written on every completed navigation except to the login and register
//! views (remembering those would bounce a signed-in user back into a
//! PublicOnly route forever). Read once, when a signed-in user lands on a
//! PublicOnly route.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::Result;
use crate::kv::{KeyValueSlot, LAST_ROUTE_KEY};
use crate::routes::{is_auth_entry_route, normalize_path};

#[derive(Clone)]
pub struct RouteMemory {
    kv: Arc<dyn KeyValueSlot>,
}

impl RouteMemory {
    pub fn new(kv: Arc<dyn KeyValueSlot>) -> Self {
        Self { kv }
    }

    pub fn get(&self) -> Option<String> {
        self.kv
            .get(LAST_ROUTE_KEY)
            .filter(|route| !route.trim().is_empty())
    }

    pub fn set(&self, path: &str) -> Result<()> {
        self.kv.set(LAST_ROUTE_KEY, path)
    }

    pub fn clear(&self) -> Result<()> {
        self.kv.remove(LAST_ROUTE_KEY)
    }

    /// Remembered route, or `fallback` when none was recorded.
    pub fn get_or(&self, fallback: &str) -> String {
        self.get().unwrap_or_else(|| fallback.to_string())
    }

    /// Records a completed navigation. Returns whether the path was stored.
    /// Persistence failures are logged; navigation never fails because of them.
    pub fn record_navigation(&self, path: &str) -> bool {
        if is_auth_entry_route(path) {
            debug!(path, "Not remembering auth entry route");
            return false;
        }
        let normalized = normalize_path(path);
        match self.set(&normalized) {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, path = %normalized, "Failed to persist last route");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::{FileKeyValueStore, MemoryKeyValueStore};
    use crate::routes::DEFAULT_LANDING_ROUTE;

    fn memory() -> RouteMemory {
        RouteMemory::new(Arc::new(MemoryKeyValueStore::new()))
    }

    #[test]
    fn records_regular_navigation() {
        let memory = memory();
        assert!(memory.record_navigation("/dashboard"));
        assert_eq!(memory.get().as_deref(), Some("/dashboard"));
    }

    #[test]
    fn login_and_register_never_overwrite() {
        let memory = memory();
        memory.record_navigation("/friends");

        assert!(!memory.record_navigation("/login"));
        assert!(!memory.record_navigation("/register"));
        assert_eq!(memory.get().as_deref(), Some("/friends"));
    }

    #[test]
    fn falls_back_when_nothing_recorded() {
        let memory = memory();
        assert_eq!(memory.get_or(DEFAULT_LANDING_ROUTE), "/dashboard");
    }

    #[test]
    fn clear_forgets_route() {
        let memory = memory();
        memory.record_navigation("/practice");
        memory.clear().unwrap();
        assert_eq!(memory.get(), None);
    }

    #[test]
    fn survives_restart() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("local-storage.json");

        RouteMemory::new(Arc::new(FileKeyValueStore::open(&path))).record_navigation("/achievements/");

        let reopened = RouteMemory::new(Arc::new(FileKeyValueStore::open(&path)));
        assert_eq!(reopened.get().as_deref(), Some("/achievements"));
    }
}
