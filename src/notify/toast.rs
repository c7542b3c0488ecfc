use chrono::Utc;
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::{ActiveModelTrait, DatabaseConnection};
use serde::Serialize;
use serde_json::json;

use super::{Delivery, Message};
use crate::entities::notifications;
use crate::error::{FieldErrors, NotificationError};
use crate::host::events::EventBus;
use crate::utils::config::NotifyConfig;

#[derive(Clone, Debug, Serialize)]
pub struct ToastPayload {
    pub title: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub sound: bool,
}

impl ToastPayload {
    pub fn new(msg: &Message) -> Self {
        Self {
            title: msg.title.clone(),
            content: msg.body.clone(),
            kind: "toast",
            sound: true,
        }
    }

    pub fn validate(&self) -> Result<(), NotificationError> {
        let mut errors = FieldErrors::new();
        if self.title.trim().is_empty() {
            errors.entry("title").or_default().push("Title must not be empty".to_string());
        }
        if self.content.trim().is_empty() {
            errors.entry("content").or_default().push("Content must not be empty".to_string());
        }
        if errors.is_empty() { Ok(()) } else { Err(NotificationError::Invalid(errors)) }
    }
}

/// Stores a toast notification for everyone and pushes it to connected browsers.
pub async fn send(
    db: &DatabaseConnection,
    events: &EventBus,
    cfg: &NotifyConfig,
    msg: &Message,
) -> Result<Delivery, NotificationError> {
    if !cfg.notify_ctfd {
        return Ok(Delivery::Skipped);
    }

    let payload = ToastPayload::new(msg);
    payload.validate()?;

    let stored = notifications::ActiveModel {
        id: NotSet,
        title: Set(payload.title.clone()),
        content: Set(payload.content.clone()),
        date: Set(Utc::now()),
        user_id: Set(None),
        team_id: Set(None),
    }
    .insert(db)
    .await?;

    events.publish(
        "notification",
        json!({
            "id": stored.id,
            "title": stored.title,
            "content": stored.content,
            "date": stored.date.to_rfc3339(),
            "user_id": stored.user_id,
            "team_id": stored.team_id,
            "type": payload.kind,
            "sound": payload.sound,
        }),
    );
    Ok(Delivery::Sent)
}
