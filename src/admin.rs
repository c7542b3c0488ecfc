//! Backing operations for the notification settings page.

use log::info;
use sea_orm::DbErr;
use serde::{Deserialize, Serialize};

use crate::notify::{Delivery, Dispatcher};
use crate::utils::config::*;

pub const TEST_MESSAGE: &str = "✅";

/// What the settings page shows and submits. Missing form fields fall back to off/empty.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminSettings {
    pub notify_ctfd: bool,
    pub notify_telegram: bool,
    pub telegram_bot_token: Option<String>,
    pub telegram_admin_id: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub notify_firstblood: bool,
    pub firstblood_text: String,
    pub notify_timing: bool,
    pub ctf_warn_start_text: String,
    pub ctf_start_text: String,
    pub ctf_warn_end_text: String,
    pub ctf_end_text: String,
    pub ctf_warn_minutes: i64,
}

impl AdminSettings {
    pub async fn load(store: &ConfigStore) -> Result<Self, DbErr> {
        let cfg = NotifyConfig::load(store).await?;
        Ok(Self {
            notify_ctfd: cfg.notify_ctfd,
            notify_telegram: cfg.notify_telegram,
            telegram_bot_token: cfg.telegram_bot_token,
            telegram_admin_id: cfg.telegram_admin_id,
            telegram_chat_id: cfg.telegram_chat_id,
            notify_firstblood: cfg.notify_firstblood,
            firstblood_text: cfg.firstblood_text,
            notify_timing: cfg.notify_timing,
            ctf_warn_start_text: cfg.warn_start_text,
            ctf_start_text: cfg.start_text,
            ctf_warn_end_text: cfg.warn_end_text,
            ctf_end_text: cfg.end_text,
            ctf_warn_minutes: cfg.warn_minutes.unwrap_or(DEFAULT_WARN_MINUTES),
        })
    }

    pub async fn save(&self, store: &ConfigStore) -> Result<(), DbErr> {
        store.set_flag(NOTIFY_CTFD, self.notify_ctfd).await?;
        store.set_flag(NOTIFY_TELEGRAM, self.notify_telegram).await?;
        for (key, value) in [
            (TELEGRAM_BOT_TOKEN, &self.telegram_bot_token),
            (TELEGRAM_ADMIN_ID, &self.telegram_admin_id),
            (TELEGRAM_CHAT_ID, &self.telegram_chat_id),
        ] {
            store.set(key, value.as_deref().unwrap_or_default().trim()).await?;
        }
        store.set_flag(NOTIFY_FIRSTBLOOD, self.notify_firstblood).await?;
        store.set_flag(NOTIFY_TIMING, self.notify_timing).await?;
        for (key, value) in [
            (FIRSTBLOOD_TEXT, &self.firstblood_text),
            (CTF_WARN_START_TEXT, &self.ctf_warn_start_text),
            (CTF_START_TEXT, &self.ctf_start_text),
            (CTF_WARN_END_TEXT, &self.ctf_warn_end_text),
            (CTF_END_TEXT, &self.ctf_end_text),
        ] {
            store.set(key, value.trim()).await?;
        }
        let warn_minutes = self.ctf_warn_minutes.clamp(0, MAX_WARN_MINUTES);
        store.set(CTF_WARN_MINUTES, warn_minutes.to_string()).await
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct AdminUpdate {
    #[serde(flatten)]
    pub settings: AdminSettings,
    #[serde(default)]
    pub test_message: bool,
}

/// Stores the submitted settings, then sends a test chat message if one was asked for.
pub async fn apply(
    update: &AdminUpdate,
    store: &ConfigStore,
    dispatcher: &Dispatcher,
) -> Result<Option<Delivery>, DbErr> {
    update.settings.save(store).await?;
    info!("Notification settings updated");

    if !update.test_message {
        return Ok(None);
    }
    let cfg = NotifyConfig::load(store).await?;
    Ok(Some(dispatcher.send_chat(&cfg, TEST_MESSAGE).await))
}
