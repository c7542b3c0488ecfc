use log::debug;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;

/// A message pushed to connected browsers.
#[derive(Clone, Debug, Serialize)]
pub struct ServerEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: Value,
}

#[derive(Clone, Debug)]
pub struct EventBus {
    tx: broadcast::Sender<ServerEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.tx.subscribe()
    }

    /// Returns how many subscribers received the event.
    pub fn publish(&self, kind: &str, data: Value) -> usize {
        let event = ServerEvent { kind: kind.to_string(), data };
        match self.tx.send(event) {
            Ok(n) => n,
            Err(_) => {
                debug!("No subscriber for {kind} event");
                0
            }
        }
    }
}
