use std::net::IpAddr;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use log::{debug, error, info};

use crate::entities::{challenges, teams, users};
use crate::error::HookError;

/// Where the accepted submission came from.
#[derive(Clone, Debug, Default)]
pub struct SolveRequest {
    pub ip: Option<IpAddr>,
    pub provided: String,
}

#[derive(Clone, Debug)]
pub struct SolveEvent {
    pub user: users::Model,
    pub team: Option<teams::Model>,
    pub challenge: challenges::Model,
    pub request: SolveRequest,
}

/// Runs after the platform has recorded a solve.
#[async_trait]
pub trait SolveObserver: Send + Sync {
    /// Stable identifier, registering a second observer with the same id is a no-op.
    fn id(&self) -> &'static str;

    async fn on_solve(&self, event: &SolveEvent) -> Result<(), HookError>;
}

#[derive(Default)]
pub struct SolveHooks {
    observers: RwLock<Vec<Arc<dyn SolveObserver>>>,
}

impl SolveHooks {
    /// Returns false when an observer with the same id is already registered.
    pub fn register(&self, observer: Arc<dyn SolveObserver>) -> bool {
        let mut observers = self.observers.write().unwrap_or_else(|e| e.into_inner());
        if observers.iter().any(|o| o.id() == observer.id()) {
            debug!("Solve observer {} already registered", observer.id());
            return false;
        }
        info!("Registered solve observer {}", observer.id());
        observers.push(observer);
        true
    }

    pub fn len(&self) -> usize {
        self.observers.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) async fn notify(&self, event: &SolveEvent) {
        let observers = self.observers.read().unwrap_or_else(|e| e.into_inner()).clone();
        for observer in observers {
            if let Err(err) = observer.on_solve(event).await {
                let (id, challenge) = (observer.id(), event.challenge.id);
                error!("Solve observer {id} failed on challenge {challenge}: {err:?}");
            }
        }
    }
}
