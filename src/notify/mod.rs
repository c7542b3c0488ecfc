pub mod telegram;
pub mod toast;

use log::warn;
use sea_orm::DatabaseConnection;

use crate::host::Host;
use crate::host::events::EventBus;
use crate::utils::config::NotifyConfig;
use telegram::TelegramClient;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub title: String,
    pub body: String,
}

impl Message {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self { title: title.into(), body: body.into() }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    Skipped,
    Failed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DispatchReport {
    pub chat: Delivery,
    pub in_app: Delivery,
}

/// Fans a message out to the chat bot and the in-app feed.
pub struct Dispatcher {
    db: DatabaseConnection,
    events: EventBus,
    chat: TelegramClient,
}

impl Dispatcher {
    pub fn new(host: &Host, chat: TelegramClient) -> Self {
        Self {
            db: host.db.clone(),
            events: host.events.clone(),
            chat,
        }
    }

    /// Both sinks run concurrently and neither can fail the other.
    pub async fn dispatch(&self, cfg: &NotifyConfig, msg: &Message) -> DispatchReport {
        let (in_app, chat) = futures::join!(
            toast::send(&self.db, &self.events, cfg, msg),
            telegram::send(&self.chat, cfg, &msg.body),
        );
        let in_app = in_app.unwrap_or_else(|err| {
            warn!("In-app notification \"{}\" was not delivered: {err}", msg.title);
            Delivery::Failed
        });
        DispatchReport { chat, in_app }
    }

    pub async fn send_chat(&self, cfg: &NotifyConfig, text: &str) -> Delivery {
        telegram::send(&self.chat, cfg, text).await
    }
}
