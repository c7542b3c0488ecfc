//! The scoring platform as seen by the notifier: its settings, solve pipeline and event bus.

pub mod events;
pub mod hooks;
pub mod solve;

use std::sync::atomic::{AtomicBool, Ordering};

use sea_orm::DatabaseConnection;

use crate::utils::config::ConfigStore;
use events::EventBus;
use hooks::SolveHooks;

pub struct Host {
    pub db: DatabaseConnection,
    pub config: ConfigStore,
    pub hooks: SolveHooks,
    pub events: EventBus,
    timing_poller: AtomicBool,
}

impl Host {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            config: ConfigStore::new(db.clone()),
            db,
            hooks: SolveHooks::default(),
            events: EventBus::new(64),
            timing_poller: AtomicBool::new(false),
        }
    }

    /// Claims the host's single timing poller slot. False if another load already holds it.
    pub fn claim_timing_poller(&self) -> bool {
        !self.timing_poller.swap(true, Ordering::SeqCst)
    }

    pub fn release_timing_poller(&self) {
        self.timing_poller.store(false, Ordering::SeqCst);
    }
}
