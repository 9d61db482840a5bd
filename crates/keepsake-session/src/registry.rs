//! Name-to-backend registry.
//!
//! Backends are registered while the process starts up and the finished
//! registry is installed once into a process-wide slot. After installation
//! it is read-only: lookups need no locking and no backend can be added or
//! replaced.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::memory::{MEMORY_BACKEND, MemoryStore};
use crate::store::SharedStore;

static GLOBAL: OnceLock<StoreRegistry> = OnceLock::new();

/// Mapping from backend name to backend instance.
#[derive(Default, Clone)]
pub struct StoreRegistry {
    stores: HashMap<String, SharedStore>,
}

impl fmt::Debug for StoreRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreRegistry")
            .field("backends", &self.names())
            .finish()
    }
}

impl StoreRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding one in-memory backend named `"memory"`.
    pub fn with_memory() -> Self {
        let mut registry = Self::new();
        registry
            .stores
            .insert(MEMORY_BACKEND.to_string(), Arc::new(MemoryStore::new()));
        registry
    }

    /// Register a backend under `name`.
    ///
    /// Registering the same name twice is a startup configuration error.
    pub fn register(&mut self, name: impl Into<String>, store: SharedStore) -> Result<()> {
        let name = name.into();
        if self.stores.contains_key(&name) {
            return Err(Error::DuplicateBackend(name));
        }
        debug!(backend = %name, kind = store.kind(), "Registered session backend");
        self.stores.insert(name, store);
        Ok(())
    }

    /// Look up a backend by name.
    pub fn get(&self, name: &str) -> Result<SharedStore> {
        self.stores
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownBackend(name.to_string()))
    }

    /// Registered backend names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.stores.keys().cloned().collect();
        names.sort();
        names
    }

    /// Install this registry as the process-wide registry.
    ///
    /// Succeeds at most once per process.
    pub fn install(self) -> Result<&'static StoreRegistry> {
        let names = self.names();
        GLOBAL.set(self).map_err(|_| Error::RegistryInstalled)?;
        info!(backends = ?names, "Session backend registry installed");
        GLOBAL.get().ok_or(Error::RegistryInstalled)
    }
}

/// The installed process-wide registry, if any.
pub fn global_registry() -> Option<&'static StoreRegistry> {
    GLOBAL.get()
}

/// Look up a backend in the process-wide registry.
pub fn lookup(name: &str) -> Result<SharedStore> {
    global_registry()
        .ok_or_else(|| Error::UnknownBackend(name.to_string()))?
        .get(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_get() {
        let mut registry = StoreRegistry::new();
        registry
            .register("primary", Arc::new(MemoryStore::new()))
            .unwrap();

        let store = registry.get("primary").unwrap();
        assert_eq!(store.kind(), MEMORY_BACKEND);
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = StoreRegistry::with_memory();
        let result = registry.register(MEMORY_BACKEND, Arc::new(MemoryStore::new()));

        assert!(matches!(result, Err(Error::DuplicateBackend(name)) if name == "memory"));
    }

    #[test]
    fn test_unknown_backend() {
        let registry = StoreRegistry::with_memory();
        let result = registry.get("redis");

        assert!(matches!(result, Err(Error::UnknownBackend(name)) if name == "redis"));
    }

    #[test]
    fn test_lookups_share_instance() {
        let registry = StoreRegistry::with_memory();
        let a = registry.get(MEMORY_BACKEND).unwrap();
        let b = registry.get(MEMORY_BACKEND).unwrap();

        a.init("session-1").unwrap();
        assert!(b.exists("session-1"));
    }

    #[test]
    fn test_names_sorted() {
        let mut registry = StoreRegistry::with_memory();
        registry
            .register("archive", Arc::new(MemoryStore::new()))
            .unwrap();

        assert_eq!(registry.names(), vec!["archive", "memory"]);
    }

    #[test]
    fn test_install_once() {
        // The only test in this crate that touches the process-wide slot.
        let installed = StoreRegistry::with_memory().install().unwrap();
        assert!(installed.get(MEMORY_BACKEND).is_ok());
        assert!(lookup(MEMORY_BACKEND).is_ok());
        assert!(matches!(lookup("nope"), Err(Error::UnknownBackend(_))));

        let second = StoreRegistry::new().install();
        assert!(matches!(second, Err(Error::RegistryInstalled)));
    }
}
