use std::time::Duration;

use log::{debug, error};
use serde::Serialize;

use super::Delivery;
use crate::error::ChatError;
use crate::utils::config::NotifyConfig;
use crate::utils::template::escape_markdown;

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
}

#[derive(Clone, Debug)]
pub struct TelegramClient {
    http: reqwest::Client,
    api_base: String,
}

impl TelegramClient {
    pub fn new(api_base: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    /// `text` must already be MarkdownV2-safe.
    pub async fn send_message(
        &self,
        token: &str,
        chat_id: &str,
        text: &str,
    ) -> Result<(), ChatError> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, token);
        let body = SendMessage { chat_id, text, parse_mode: "MarkdownV2" };
        // Errors would otherwise carry the token inside the url.
        let resp = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChatError::Http(e.without_url()))?;
        if !resp.status().is_success() {
            return Err(ChatError::Status(resp.status()));
        }
        Ok(())
    }
}

/// Sends `text` to the admin and broadcast chats.
/// Every recipient is tried and failures are only logged.
pub async fn send(client: &TelegramClient, cfg: &NotifyConfig, text: &str) -> Delivery {
    if !cfg.notify_telegram {
        return Delivery::Skipped;
    }
    let Some(token) = cfg.telegram_bot_token.as_deref() else {
        debug!("Telegram notifications enabled without a bot token");
        return Delivery::Skipped;
    };
    let recipients = cfg.telegram_recipients();
    if recipients.is_empty() {
        debug!("Telegram notifications enabled without any chat id");
        return Delivery::Skipped;
    }

    let text = escape_markdown(text);
    let mut delivery = Delivery::Sent;
    for chat_id in recipients {
        if let Err(err) = client.send_message(token, chat_id, &text).await {
            error!("Failed to send message to Telegram chat {chat_id}: {err}");
            delivery = Delivery::Failed;
        }
    }
    delivery
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeChatApi, closed_port_url};
    use crate::utils::config::{
        NOTIFY_TELEGRAM, TELEGRAM_ADMIN_ID, TELEGRAM_BOT_TOKEN, TELEGRAM_CHAT_ID,
    };
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> NotifyConfig {
        let values: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        NotifyConfig::from_values(&values)
    }

    fn client(base: &str) -> TelegramClient {
        TelegramClient::new(base, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn posts_once_per_recipient() {
        let api = FakeChatApi::start(200).await;
        let cfg = config(&[
            (NOTIFY_TELEGRAM, "1"),
            (TELEGRAM_BOT_TOKEN, "123:abc"),
            (TELEGRAM_ADMIN_ID, "42"),
            (TELEGRAM_CHAT_ID, "-1001"),
        ]);

        assert_eq!(send(&client(&api.base), &cfg, "Solved web-1.").await, Delivery::Sent);

        let requests = api.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests.iter().all(|(path, _)| path == "/bot123:abc/sendMessage"));
        let chats: Vec<_> = requests.iter().map(|(_, body)| body["chat_id"].as_str().unwrap().to_string()).collect();
        assert!(chats.contains(&"42".to_string()));
        assert!(chats.contains(&"-1001".to_string()));
        assert_eq!(requests[0].1["text"], r"Solved web\-1\.");
        assert_eq!(requests[0].1["parse_mode"], "MarkdownV2");
    }

    #[tokio::test]
    async fn skipped_without_token_recipients_or_flag() {
        let api = FakeChatApi::start(200).await;
        let client = client(&api.base);

        let no_flag = config(&[(TELEGRAM_BOT_TOKEN, "t"), (TELEGRAM_ADMIN_ID, "1")]);
        let no_token = config(&[(NOTIFY_TELEGRAM, "1"), (TELEGRAM_ADMIN_ID, "1")]);
        let no_chat = config(&[(NOTIFY_TELEGRAM, "1"), (TELEGRAM_BOT_TOKEN, "t")]);
        for cfg in [no_flag, no_token, no_chat] {
            assert_eq!(send(&client, &cfg, "hi").await, Delivery::Skipped);
        }
        assert!(api.requests().is_empty());
    }

    #[tokio::test]
    async fn server_errors_are_reported_not_raised() {
        let api = FakeChatApi::start(500).await;
        let cfg = config(&[(NOTIFY_TELEGRAM, "1"), (TELEGRAM_BOT_TOKEN, "t"), (TELEGRAM_CHAT_ID, "1")]);
        assert_eq!(send(&client(&api.base), &cfg, "hi").await, Delivery::Failed);

        let err = client(&api.base).send_message("t", "1", "hi").await.unwrap_err();
        assert!(matches!(err, ChatError::Status(s) if s.as_u16() == 500));
    }

    #[tokio::test]
    async fn connection_errors_are_reported_not_raised() {
        let base = closed_port_url().await;
        let cfg = config(&[(NOTIFY_TELEGRAM, "1"), (TELEGRAM_BOT_TOKEN, "secret"), (TELEGRAM_ADMIN_ID, "1")]);
        assert_eq!(send(&client(&base), &cfg, "hi").await, Delivery::Failed);

        let err = client(&base).send_message("secret", "1", "hi").await.unwrap_err();
        assert!(!err.to_string().contains("secret"));
    }
}
