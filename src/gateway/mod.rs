//! # Message Gateway
//!
//! The remote source of inbound messages. The intake loop only sees the
//! [`MessageGateway`] trait and the [`Message`] value; the Telegram bot API
//! client behind it lives in [`telegram`].
//!
//! Long-poll semantics: a fetch blocks server-side until messages arrive or
//! the poll timeout elapses. Returning zero messages is a normal outcome,
//! not an error.

pub mod telegram;

pub use telegram::TelegramGateway;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::BuzonError;

/// One inbound message, immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Gateway-assigned id, globally unique per gateway. The dedup key.
    pub id: String,
    /// Opaque sender identifier (chat id, phone number).
    pub sender_id: String,
    /// Name the gateway reports for the sender, if any. The contact book
    /// takes precedence; this is a fallback.
    pub sender_name: Option<String>,
    /// Message text (possibly empty when the message is only a photo).
    pub text: String,
    /// Downloaded image blobs, in the order the gateway listed them.
    pub attachments: Vec<Vec<u8>>,
    pub received_at: DateTime<Utc>,
}

/// A source of new messages.
///
/// `fetch` owns the retrieval cursor: each call returns only messages not
/// yet returned by a previous call *in this process*. Restart-safety is the
/// seen-store's job, not the cursor's.
#[async_trait]
pub trait MessageGateway: Send {
    async fn fetch(&mut self) -> Result<Vec<Message>, BuzonError>;
}
