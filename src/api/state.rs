//! Application state for the billing trigger API.
//!
//! Handlers share one engine over an in-memory store. Engine jobs are
//! synchronous, so access is serialized behind a `Mutex` that is never held
//! across an await point.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::billing::BillingEngine;
use crate::config::ConfigLoader;
use crate::store::InMemoryStore;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    engine: Arc<Mutex<BillingEngine<InMemoryStore>>>,
}

impl AppState {
    /// Creates a state with an empty store and the loaded configuration.
    pub fn new(config: ConfigLoader) -> Self {
        Self::from_engine(BillingEngine::new(
            InMemoryStore::new(),
            config.config().clone(),
        ))
    }

    /// Wraps an existing engine.
    pub fn from_engine(engine: BillingEngine<InMemoryStore>) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
        }
    }

    /// Locks the engine.
    ///
    /// A poisoned lock is recovered: every engine job runs in a store
    /// transaction, so a panicking job leaves no partial writes behind.
    pub fn engine(&self) -> MutexGuard<'_, BillingEngine<InMemoryStore>> {
        self.engine.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
