//! Shared application state: the supervisor behind a lock, plus the
//! process-wide shutdown flag the orchestrator's tasks watch.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::core::domain::MarketRegistry;
use crate::core::supervisor::{RuntimeConfig, Supervisor};

/// Everything the orchestrator's tasks share. Cloned cheaply (it's an `Arc`)
/// and handed to every spawned task.
#[derive(Clone)]
pub struct AppState {
    supervisor: Arc<RwLock<Supervisor>>,
    markets: Arc<RwLock<MarketRegistry>>,
    shutting_down: Arc<AtomicBool>,
}

impl AppState {
    #[must_use]
    pub fn new(config: RuntimeConfig, started_at: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            supervisor: Arc::new(RwLock::new(Supervisor::new(config, started_at))),
            markets: Arc::new(RwLock::new(MarketRegistry::new())),
            shutting_down: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn supervisor(&self) -> parking_lot::RwLockReadGuard<'_, Supervisor> {
        self.supervisor.read()
    }

    pub fn supervisor_mut(&self) -> parking_lot::RwLockWriteGuard<'_, Supervisor> {
        self.supervisor.write()
    }

    pub fn markets(&self) -> parking_lot::RwLockReadGuard<'_, MarketRegistry> {
        self.markets.read()
    }

    pub fn markets_mut(&self) -> parking_lot::RwLockWriteGuard<'_, MarketRegistry> {
        self.markets.write()
    }

    pub fn begin_shutdown(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }
}
