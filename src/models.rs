use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Conversation participant role.
///
/// Closed set: JWT claims, request bodies, and database rows all parse
/// into this enum, and anything outside the two roles is rejected at
/// that boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Party {
    User,
    Admin,
}

impl Party {
    /// The opposite participant, the one whose unread flag a send sets.
    pub fn other(self) -> Party {
        match self {
            Party::User => Party::Admin,
            Party::Admin => Party::User,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Party::User => "user",
            Party::Admin => "admin",
        }
    }
}

impl std::str::FromStr for Party {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Party::User),
            "admin" => Ok(Party::Admin),
            other => Err(AppError::validation(format!("unknown party role: {other}"))),
        }
    }
}

impl std::fmt::Display for Party {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivery state of a message. Only `sent` exists today; the column is
/// kept so delivery receipts can be added without a schema change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum MessageStatus {
    Sent,
}

/// One immutable text entry within a conversation. This is also the wire
/// shape, both for HTTP responses and for `message:new` broker events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender: Party,
    pub text: String,
    pub status: MessageStatus,
    pub created_at: DateTime<Utc>,
}

/// The single thread between one course user and the operator.
///
/// `last_message` / `last_message_at` cache the newest message so the
/// inbox never loads full histories; the store refreshes them in the
/// same atomic step as the insert.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub last_message: String,
    pub last_message_at: Option<DateTime<Utc>>,
    pub unread_by_user: bool,
    pub unread_by_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    /// Inbox projection of this conversation. Also the payload shape of
    /// `conversation:updated` broker events.
    pub fn summary(&self) -> ConversationSummary {
        ConversationSummary {
            id: self.id,
            user_id: self.user_id,
            last_message: self.last_message.clone(),
            last_message_at: self.last_message_at,
            unread_by_admin: self.unread_by_admin,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub id: Uuid,
    pub user_id: Uuid,
    pub last_message: String,
    pub last_message_at: Option<DateTime<Utc>>,
    pub unread_by_admin: bool,
}

/// One ascending page of history. A missing `next_cursor` means the end
/// of the conversation was reached.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePage {
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<Uuid>,
}

/// Record that a page image from an out-of-band upload is available.
/// This is the artifact the upload waiter polls for.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UploadPage {
    pub upload_id: String,
    pub page_number: i32,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
}
