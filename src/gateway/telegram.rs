//! Telegram bot API client.
//!
//! Uses `getUpdates` long polling: the request blocks server-side for up to
//! the poll timeout and returns whatever arrived. The offset cursor
//! acknowledges everything previously returned; it is kept in memory only,
//! so a restart re-fetches whatever the gateway still retains and the
//! seen-store filters out what was already printed.
//!
//! Photos arrive as a list of pre-scaled sizes. We pick the largest one
//! under the configured byte cap and download it through `getFile`; if even
//! the smallest rendition is over the cap, the photo is dropped with a
//! warning and the message is kept as text.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::Deserialize;

use super::{Message, MessageGateway};
use crate::error::BuzonError;

/// Official API host; tests point `base_url` at a local server instead.
const DEFAULT_BASE_URL: &str = "https://api.telegram.org";

/// Extra slack on the HTTP timeout beyond the server-side poll timeout, so
/// the server always times out first.
const HTTP_TIMEOUT_MARGIN: Duration = Duration::from_secs(10);

// ============================================================================
// API SHAPES
// ============================================================================

#[derive(Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Deserialize)]
struct Update {
    update_id: i64,
    message: Option<ChatMessage>,
}

#[derive(Deserialize)]
struct ChatMessage {
    date: i64,
    chat: Chat,
    text: Option<String>,
    caption: Option<String>,
    #[serde(default)]
    photo: Vec<PhotoSize>,
}

#[derive(Deserialize)]
struct Chat {
    id: i64,
    first_name: Option<String>,
}

#[derive(Deserialize)]
struct PhotoSize {
    file_id: String,
    #[serde(default)]
    file_size: u64,
}

#[derive(Deserialize)]
struct FileInfo {
    file_path: Option<String>,
    #[serde(default)]
    file_size: u64,
}

/// A parsed update before photo download.
struct PendingMessage {
    id: String,
    sender_id: String,
    sender_name: Option<String>,
    text: String,
    photo_file_id: Option<String>,
    received_at: DateTime<Utc>,
}

/// Extract the printable content of one update, if it carries a message.
/// Service updates (edits, channel posts we did not subscribe to) yield
/// `None` and only advance the cursor.
fn pending_from_update(update: Update, max_photo_bytes: u64) -> Option<PendingMessage> {
    let msg = update.message?;
    let text = msg.text.or(msg.caption).unwrap_or_default();

    // Largest rendition that fits the cap. When no rendition reports a
    // size, take the last one (the API lists sizes ascending) and let the
    // getFile size check enforce the cap at download time.
    let photo_file_id = if msg.photo.is_empty() {
        None
    } else {
        let best = msg
            .photo
            .iter()
            .filter(|p| p.file_size > 0 && p.file_size <= max_photo_bytes)
            .max_by_key(|p| p.file_size);
        match best {
            Some(p) => Some(p.file_id.clone()),
            None if msg.photo.iter().all(|p| p.file_size == 0) => {
                debug!(
                    "Photo in update {} reports no sizes, deferring to download check",
                    update.update_id
                );
                msg.photo.last().map(|p| p.file_id.clone())
            }
            None => {
                warn!(
                    "Photo in update {} exceeds {} bytes in all sizes, keeping text only",
                    update.update_id, max_photo_bytes
                );
                None
            }
        }
    };

    let received_at = DateTime::from_timestamp(msg.date, 0).unwrap_or_else(Utc::now);

    Some(PendingMessage {
        id: update.update_id.to_string(),
        sender_id: msg.chat.id.to_string(),
        sender_name: msg.chat.first_name,
        text,
        photo_file_id,
        received_at,
    })
}

// ============================================================================
// CLIENT
// ============================================================================

/// Long-polling Telegram gateway.
pub struct TelegramGateway {
    client: reqwest::Client,
    base_url: String,
    token: String,
    poll_timeout: Duration,
    max_photo_bytes: u64,
    download_photos: bool,
    offset: Option<i64>,
}

impl TelegramGateway {
    pub fn new(
        token: String,
        poll_timeout: Duration,
        max_photo_bytes: u64,
        download_photos: bool,
    ) -> Result<Self, BuzonError> {
        Self::with_base_url(
            DEFAULT_BASE_URL.to_string(),
            token,
            poll_timeout,
            max_photo_bytes,
            download_photos,
        )
    }

    /// Construct against an explicit API host (tests use a local server).
    pub fn with_base_url(
        base_url: String,
        token: String,
        poll_timeout: Duration,
        max_photo_bytes: u64,
        download_photos: bool,
    ) -> Result<Self, BuzonError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("buzon/", env!("CARGO_PKG_VERSION")))
            .timeout(poll_timeout + HTTP_TIMEOUT_MARGIN)
            .build()
            .map_err(|e| BuzonError::Gateway(format!("HTTP client build failed: {}", e)))?;
        Ok(Self {
            client,
            base_url,
            token,
            poll_timeout,
            max_photo_bytes,
            download_photos,
            offset: None,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        query: &[(&str, String)],
    ) -> Result<T, BuzonError> {
        let response = self
            .client
            .get(self.method_url(method))
            .query(query)
            .send()
            .await
            .map_err(|e| BuzonError::Gateway(format!("{} request failed: {}", method, e)))?;

        if !response.status().is_success() {
            return Err(BuzonError::Gateway(format!(
                "{} returned HTTP {}",
                method,
                response.status()
            )));
        }

        let body: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| BuzonError::Gateway(format!("{} response unreadable: {}", method, e)))?;

        if !body.ok {
            return Err(BuzonError::Gateway(format!(
                "{} API error: {}",
                method,
                body.description.unwrap_or_else(|| "unknown".to_string())
            )));
        }
        body.result
            .ok_or_else(|| BuzonError::Gateway(format!("{} returned no result", method)))
    }

    /// Download one photo into a blob. Failures are reported, not fatal;
    /// the caller keeps the message as text.
    async fn download_photo(&self, file_id: &str) -> Result<Vec<u8>, BuzonError> {
        let info: FileInfo = self
            .call("getFile", &[("file_id", file_id.to_string())])
            .await?;
        if info.file_size > self.max_photo_bytes {
            return Err(BuzonError::Gateway(format!(
                "File {} bytes exceeds cap {}",
                info.file_size, self.max_photo_bytes
            )));
        }
        let path = info
            .file_path
            .ok_or_else(|| BuzonError::Gateway("getFile returned no path".to_string()))?;

        let url = format!("{}/file/bot{}/{}", self.base_url, self.token, path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| BuzonError::Gateway(format!("File download failed: {}", e)))?;
        if !response.status().is_success() {
            return Err(BuzonError::Gateway(format!(
                "File download returned HTTP {}",
                response.status()
            )));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| BuzonError::Gateway(format!("File body unreadable: {}", e)))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl MessageGateway for TelegramGateway {
    async fn fetch(&mut self) -> Result<Vec<Message>, BuzonError> {
        let mut query = vec![
            ("timeout", self.poll_timeout.as_secs().to_string()),
            ("allowed_updates", r#"["message"]"#.to_string()),
        ];
        if let Some(offset) = self.offset {
            query.push(("offset", offset.to_string()));
        }

        let updates: Vec<Update> = self.call("getUpdates", &query).await?;
        debug!("getUpdates returned {} update(s)", updates.len());

        let mut messages = Vec::new();
        for update in updates {
            // Acknowledge everything we were handed, message or not.
            self.offset = Some(update.update_id + 1);

            let Some(pending) = pending_from_update(update, self.max_photo_bytes) else {
                continue;
            };

            let mut attachments = Vec::new();
            if self.download_photos {
                if let Some(file_id) = &pending.photo_file_id {
                    match self.download_photo(file_id).await {
                        Ok(blob) => attachments.push(blob),
                        Err(e) => warn!("Dropping photo for update {}: {}", pending.id, e),
                    }
                }
            }

            messages.push(Message {
                id: pending.id,
                sender_id: pending.sender_id,
                sender_name: pending.sender_name,
                text: pending.text,
                attachments,
                received_at: pending.received_at,
            });
        }
        Ok(messages)
    }
}

// ============================================================================
// TESTS
// ============================================================================
