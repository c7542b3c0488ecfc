use std::collections::HashMap;

use sea_orm::ActiveValue::Set;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter};

use crate::entities::{configs, prelude::*};
use crate::error::ConfigError;

pub const NOTIFY_CTFD: &str = "notify_ctfd";
pub const NOTIFY_TELEGRAM: &str = "notify_telegram";
pub const TELEGRAM_BOT_TOKEN: &str = "telegram_bot_token";
pub const TELEGRAM_ADMIN_ID: &str = "telegram_admin_id";
pub const TELEGRAM_CHAT_ID: &str = "telegram_chat_id";
pub const NOTIFY_FIRSTBLOOD: &str = "notify_firstblood";
pub const FIRSTBLOOD_TEXT: &str = "firstblood_text";
pub const NOTIFY_TIMING: &str = "notify_timing";
pub const CTF_WARN_START_TEXT: &str = "ctf_warn_start_text";
pub const CTF_START_TEXT: &str = "ctf_start_text";
pub const CTF_WARN_END_TEXT: &str = "ctf_warn_end_text";
pub const CTF_END_TEXT: &str = "ctf_end_text";
pub const CTF_WARN_MINUTES: &str = "ctf_warn_minutes";
pub const START: &str = "start";
pub const END: &str = "end";
pub const USER_MODE: &str = "user_mode";

const KEYS: [&str; 16] = [
    NOTIFY_CTFD,
    NOTIFY_TELEGRAM,
    TELEGRAM_BOT_TOKEN,
    TELEGRAM_ADMIN_ID,
    TELEGRAM_CHAT_ID,
    NOTIFY_FIRSTBLOOD,
    FIRSTBLOOD_TEXT,
    NOTIFY_TIMING,
    CTF_WARN_START_TEXT,
    CTF_START_TEXT,
    CTF_WARN_END_TEXT,
    CTF_END_TEXT,
    CTF_WARN_MINUTES,
    START,
    END,
    USER_MODE,
];

pub const DEFAULT_FIRSTBLOOD_TEXT: &str = "First task solve {challenge} by {solver}!";
pub const DEFAULT_WARN_START_TEXT: &str = "The CTF starts in {minutes} minutes!";
pub const DEFAULT_START_TEXT: &str = "The CTF has started, good luck!";
pub const DEFAULT_WARN_END_TEXT: &str = "The CTF ends in {minutes} minutes!";
pub const DEFAULT_END_TEXT: &str = "The CTF is over, thanks for playing!";
pub const DEFAULT_WARN_MINUTES: i64 = 15;
/// Longest accepted warning lead, one week. Larger values are rejected as out of range.
pub const MAX_WARN_MINUTES: i64 = 7 * 24 * 60;

/// Key-value settings shared with the platform, read straight from its `config` table.
#[derive(Clone, Debug)]
pub struct ConfigStore {
    db: DatabaseConnection,
}

impl ConfigStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, DbErr> {
        let row = Configs::find()
            .filter(configs::Column::Key.eq(key))
            .one(&self.db)
            .await?;
        Ok(row.and_then(|r| r.value))
    }

    pub async fn set(&self, key: &str, value: impl Into<String>) -> Result<(), DbErr> {
        let value = value.into();
        let existing = Configs::find()
            .filter(configs::Column::Key.eq(key))
            .one(&self.db)
            .await?;
        match existing {
            Some(row) => {
                let mut model: configs::ActiveModel = row.into();
                model.value = Set(Some(value));
                model.update(&self.db).await?;
            }
            None => {
                configs::ActiveModel {
                    key: Set(key.to_string()),
                    value: Set(Some(value)),
                    ..Default::default()
                }
                .insert(&self.db)
                .await?;
            }
        }
        Ok(())
    }

    pub async fn set_flag(&self, key: &str, enabled: bool) -> Result<(), DbErr> {
        self.set(key, if enabled { "1" } else { "0" }).await
    }

    pub async fn user_mode(&self) -> Result<UserMode, DbErr> {
        Ok(UserMode::from_setting(self.get(USER_MODE).await?.as_deref()))
    }

    async fn snapshot(&self) -> Result<HashMap<String, String>, DbErr> {
        let rows = Configs::find()
            .filter(configs::Column::Key.is_in(KEYS))
            .all(&self.db)
            .await?;
        Ok(rows
            .into_iter()
            .filter_map(|r| r.value.map(|v| (r.key, v)))
            .collect())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UserMode {
    Users,
    Teams,
}

impl UserMode {
    /// Anything other than `teams` (surrounding whitespace ignored) is users mode.
    pub fn from_setting(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("teams") => Self::Teams,
            _ => Self::Users,
        }
    }
}

/// Competition window. A zero timestamp means unset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Schedule {
    pub start: i64,
    pub end: i64,
    pub warn_minutes: i64,
}

/// Everything the notifier reads from the platform settings, taken in a single query.
#[derive(Clone, Debug)]
pub struct NotifyConfig {
    pub notify_ctfd: bool,
    pub notify_telegram: bool,
    pub telegram_bot_token: Option<String>,
    pub telegram_admin_id: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub notify_firstblood: bool,
    pub firstblood_text: String,
    pub notify_timing: bool,
    pub warn_start_text: String,
    pub start_text: String,
    pub warn_end_text: String,
    pub end_text: String,
    pub user_mode: UserMode,
    /// Parsed on its own so a bad `start` or `end` does not hide it.
    pub warn_minutes: Result<i64, ConfigError>,
    pub schedule: Result<Schedule, ConfigError>,
}

impl NotifyConfig {
    pub async fn load(store: &ConfigStore) -> Result<Self, DbErr> {
        Ok(Self::from_values(&store.snapshot().await?))
    }

    pub fn from_values(values: &HashMap<String, String>) -> Self {
        let text = |key: &str| {
            values
                .get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        let template = |key: &str, default: &str| text(key).unwrap_or_else(|| default.to_string());
        let flag = |key: &str| text(key).is_some_and(|v| parse_flag(&v));
        let warn_minutes = parse_warn_minutes(values);

        Self {
            notify_ctfd: flag(NOTIFY_CTFD),
            notify_telegram: flag(NOTIFY_TELEGRAM),
            telegram_bot_token: text(TELEGRAM_BOT_TOKEN),
            telegram_admin_id: text(TELEGRAM_ADMIN_ID),
            telegram_chat_id: text(TELEGRAM_CHAT_ID),
            notify_firstblood: flag(NOTIFY_FIRSTBLOOD),
            firstblood_text: template(FIRSTBLOOD_TEXT, DEFAULT_FIRSTBLOOD_TEXT),
            notify_timing: flag(NOTIFY_TIMING),
            warn_start_text: template(CTF_WARN_START_TEXT, DEFAULT_WARN_START_TEXT),
            start_text: template(CTF_START_TEXT, DEFAULT_START_TEXT),
            warn_end_text: template(CTF_WARN_END_TEXT, DEFAULT_WARN_END_TEXT),
            end_text: template(CTF_END_TEXT, DEFAULT_END_TEXT),
            user_mode: UserMode::from_setting(values.get(USER_MODE).map(String::as_str)),
            schedule: parse_schedule(values, warn_minutes.clone()),
            warn_minutes,
        }
    }

    /// Chat recipients in delivery order: the admin first, then the broadcast chat.
    pub fn telegram_recipients(&self) -> Vec<&str> {
        [&self.telegram_admin_id, &self.telegram_chat_id]
            .into_iter()
            .filter_map(|id| id.as_deref())
            .collect()
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "y" | "yes" | "on"
    )
}

fn parse_int(
    values: &HashMap<String, String>,
    key: &'static str,
    default: i64,
) -> Result<i64, ConfigError> {
    match values.get(key).map(|v| v.trim()) {
        None | Some("") => Ok(default),
        Some(v) => v.parse::<i64>().map_err(|_| ConfigError::Malformed {
            key,
            value: v.to_string(),
        }),
    }
}

/// Negative leads clamp to 0; anything above [`MAX_WARN_MINUTES`] is an error.
fn parse_warn_minutes(values: &HashMap<String, String>) -> Result<i64, ConfigError> {
    let minutes = parse_int(values, CTF_WARN_MINUTES, DEFAULT_WARN_MINUTES)?;
    if minutes > MAX_WARN_MINUTES {
        return Err(ConfigError::OutOfRange {
            key: CTF_WARN_MINUTES,
            value: minutes,
            max: MAX_WARN_MINUTES,
        });
    }
    Ok(minutes.max(0))
}

fn parse_schedule(
    values: &HashMap<String, String>,
    warn_minutes: Result<i64, ConfigError>,
) -> Result<Schedule, ConfigError> {
    Ok(Schedule {
        start: parse_int(values, START, 0)?,
        end: parse_int(values, END, 0)?,
        warn_minutes: warn_minutes?,
    })
}
