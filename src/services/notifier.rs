// src/services/notifier.rs

//! Notification delivery and message formatting.

use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::{Item, Target, TelegramConfig};
use crate::utils::{collapse_whitespace, resolve_url};

const TELEGRAM_API: &str = "https://api.telegram.org";

/// Upper bound on a single `sendMessage` call.
pub const DEFAULT_NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Sent once at startup when requested.
pub const READY_MESSAGE: &str = "Готов к работе!";

const NO_PAYMENT: &str = "оплата не указана";

/// Delivers a formatted message.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &str) -> Result<()>;
}

/// Build the notifier described by `config`.
///
/// Missing credentials give a [`DisabledNotifier`]. Each delivery is
/// bounded by `timeout`.
pub fn from_config(config: &TelegramConfig, timeout: Duration) -> Box<dyn Notifier> {
    match config.credentials() {
        Some((token, chat_id)) => {
            Box::new(TelegramNotifier::new(token, chat_id).with_timeout(timeout))
        }
        None => {
            log::warn!("Telegram credentials not set; notifications are disabled");
            Box::new(DisabledNotifier)
        }
    }
}

/// Notifier used when no channel is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn notify(&self, message: &str) -> Result<()> {
        log::debug!("Notification skipped (disabled): {message}");
        Ok(())
    }
}

/// Telegram Bot API `sendMessage` notifier.
#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    client: reqwest::Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramNotifier {
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: TELEGRAM_API.to_string(),
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
            timeout: DEFAULT_NOTIFY_TIMEOUT,
        }
    }

    /// Bound each request, including reading the response.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Use a preconfigured HTTP client.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Point the notifier at another Bot API host.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn request_error(&self, context: &str, e: reqwest::Error) -> AppError {
        if e.is_timeout() {
            AppError::notify(format!("{context}: timed out after {:?}", self.timeout))
        } else {
            AppError::notify(format!("{context}: {e}"))
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.api_base.trim_end_matches('/'),
            self.bot_token,
            method
        )
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, message: &str) -> Result<()> {
        let body = serde_json::json!({
            "chat_id": self.chat_id,
            "text": message,
            "parse_mode": "Markdown",
            "disable_web_page_preview": false,
        });

        let response = self
            .client
            .post(self.api_url("sendMessage"))
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.request_error("sendMessage failed", e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| self.request_error("Invalid send response", e))?;

        let parsed: Option<TelegramResponse> = serde_json::from_str(&text).ok();
        match parsed {
            Some(reply) if status.is_success() && reply.ok => {
                log::debug!("Telegram message sent");
                Ok(())
            }
            Some(reply) => Err(AppError::notify(format!(
                "Telegram API error ({status}): {}",
                reply.description.unwrap_or_default()
            ))),
            None => Err(AppError::notify(format!(
                "Telegram API error ({status}): {text}"
            ))),
        }
    }
}

/// Remove URLs and collapse whitespace in a listing title.
pub fn clean_title(title: &str) -> String {
    match Regex::new(r"https?://\S+") {
        Ok(pattern) => collapse_whitespace(&pattern.replace_all(title, "")),
        Err(_) => collapse_whitespace(title),
    }
}

/// Absolute link of an item.
fn item_link(target: &Target, item: &Item) -> String {
    let key = item.key().unwrap_or_default();
    if key.starts_with("http://") || key.starts_with("https://") {
        return key.to_string();
    }
    url::Url::parse(&target.url)
        .ok()
        .map(|base| resolve_url(&base, key))
        .unwrap_or_else(|| key.to_string())
}

/// Format the notification for a newly observed item.
pub fn format_message(target: &Target, item: &Item) -> String {
    let title = item.title.as_deref().map(clean_title).unwrap_or_default();
    let payment = item
        .price
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or(NO_PAYMENT);
    let headline = if target.emoji.is_empty() {
        format!("*{}*", target.new_label)
    } else {
        format!("{} *{}*", target.emoji, target.new_label)
    };

    format!(
        "{headline}\n\n*{}:* {title}\n\n*Оплата:* {payment}\n\n[Перейти к {}]({})",
        target.item_label,
        target.link_label,
        item_link(target, item)
    )
}
