mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::{DbPool, PgStore};

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{Conversation, ConversationSummary, Message, MessagePage, Party, UploadPage};

/// Persistence seam for conversations, messages, and upload records.
///
/// Implementations own atomicity: `append_message` must expose no
/// intermediate state (a reader either sees the new message together with
/// the refreshed conversation cache, or neither of them), and concurrent
/// appends to one conversation must serialize into a single total order
/// that every subsequent reader observes.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Fetch the user's conversation, creating it on first touch with
    /// both unread flags clear and an empty last-message cache.
    /// Idempotent, including under concurrent first touches.
    async fn get_or_create_conversation(&self, user_id: Uuid) -> AppResult<Conversation>;

    /// Point lookup, used for participant checks.
    async fn conversation(&self, conversation_id: Uuid) -> AppResult<Option<Conversation>>;

    /// All conversations, most recently active first. Conversations that
    /// never saw a message sort last.
    async fn list_conversations(&self) -> AppResult<Vec<ConversationSummary>>;

    /// Ascending page of messages. `cursor` names the last message the
    /// caller already holds; the page starts strictly after it and the
    /// cursor message itself is never re-returned. A cursor that does not
    /// resolve within the conversation is a validation error. Missing
    /// conversations yield an empty page; existence is the caller's
    /// concern.
    async fn messages_page(
        &self,
        conversation_id: Uuid,
        cursor: Option<Uuid>,
        limit: u32,
    ) -> AppResult<MessagePage>;

    /// Insert a message and, in the same atomic step, refresh the
    /// conversation's last-message cache and set the unread flag of the
    /// party that did not send. The sender's own flag is never touched.
    async fn append_message(
        &self,
        conversation_id: Uuid,
        sender: Party,
        text: &str,
    ) -> AppResult<Message>;

    /// Clear the acting party's own unread flag. Idempotent.
    async fn mark_read(&self, conversation_id: Uuid, by: Party) -> AppResult<()>;

    /// Record that a page image is available. Idempotent per
    /// (upload, page); re-registering replaces the URL.
    async fn record_upload_page(
        &self,
        upload_id: &str,
        page_number: i32,
        image_url: &str,
    ) -> AppResult<UploadPage>;

    async fn find_upload_page(
        &self,
        upload_id: &str,
        page_number: i32,
    ) -> AppResult<Option<UploadPage>>;
}
