use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    Conversation, ConversationSummary, Message, MessagePage, MessageStatus, Party, UploadPage,
};

use super::ConversationStore;

/// In-memory store for development without Postgres and for tests.
///
/// One mutex guards everything, which gives appends the same atomicity
/// the Postgres transaction provides; message vectors hold the total
/// order in insertion position.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    conversations: HashMap<Uuid, Conversation>,
    messages: HashMap<Uuid, Vec<Message>>,
    upload_pages: HashMap<(String, i32), UploadPage>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn get_or_create_conversation(&self, user_id: Uuid) -> AppResult<Conversation> {
        let mut inner = self.inner.lock().await;

        if let Some(existing) = inner.conversations.values().find(|c| c.user_id == user_id) {
            return Ok(existing.clone());
        }

        let conversation = Conversation {
            id: Uuid::new_v4(),
            user_id,
            subject: None,
            last_message: String::new(),
            last_message_at: None,
            unread_by_user: false,
            unread_by_admin: false,
            created_at: Utc::now(),
        };

        inner
            .conversations
            .insert(conversation.id, conversation.clone());
        inner.messages.insert(conversation.id, Vec::new());

        crate::metrics::CONVERSATIONS_CREATED_TOTAL.inc();
        tracing::info!(conversation_id = %conversation.id, "Created conversation");

        Ok(conversation)
    }

    async fn conversation(&self, conversation_id: Uuid) -> AppResult<Option<Conversation>> {
        let inner = self.inner.lock().await;
        Ok(inner.conversations.get(&conversation_id).cloned())
    }

    async fn list_conversations(&self) -> AppResult<Vec<ConversationSummary>> {
        let inner = self.inner.lock().await;

        // Most recent activity first; never-messaged conversations last,
        // newest created first among those.
        let mut conversations: Vec<&Conversation> = inner.conversations.values().collect();
        conversations.sort_by(|a, b| {
            b.last_message_at
                .cmp(&a.last_message_at)
                .then(b.created_at.cmp(&a.created_at))
        });

        Ok(conversations.into_iter().map(Conversation::summary).collect())
    }

    async fn messages_page(
        &self,
        conversation_id: Uuid,
        cursor: Option<Uuid>,
        limit: u32,
    ) -> AppResult<MessagePage> {
        let inner = self.inner.lock().await;

        let Some(all) = inner.messages.get(&conversation_id) else {
            return Ok(MessagePage {
                messages: Vec::new(),
                next_cursor: None,
            });
        };

        let start = match cursor {
            Some(cursor_id) => {
                let position = all.iter().position(|m| m.id == cursor_id).ok_or_else(|| {
                    AppError::validation("cursor does not name a message in this conversation")
                })?;
                position + 1
            }
            None => 0,
        };

        let messages: Vec<Message> = all
            .iter()
            .skip(start)
            .take(limit as usize)
            .cloned()
            .collect();
        let next_cursor = if start + messages.len() < all.len() {
            messages.last().map(|m| m.id)
        } else {
            None
        };

        Ok(MessagePage {
            messages,
            next_cursor,
        })
    }

    async fn append_message(
        &self,
        conversation_id: Uuid,
        sender: Party,
        text: &str,
    ) -> AppResult<Message> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::validation("message text must not be empty"));
        }

        let mut inner = self.inner.lock().await;

        let Some(conversation) = inner.conversations.get_mut(&conversation_id) else {
            return Err(AppError::not_found("conversation"));
        };

        let message = Message {
            id: Uuid::new_v4(),
            conversation_id,
            sender,
            text: text.to_string(),
            status: MessageStatus::Sent,
            created_at: Utc::now(),
        };

        conversation.last_message = message.text.clone();
        conversation.last_message_at = Some(message.created_at);
        match sender {
            Party::User => conversation.unread_by_admin = true,
            Party::Admin => conversation.unread_by_user = true,
        }

        inner
            .messages
            .entry(conversation_id)
            .or_default()
            .push(message.clone());

        Ok(message)
    }

    async fn mark_read(&self, conversation_id: Uuid, by: Party) -> AppResult<()> {
        let mut inner = self.inner.lock().await;

        let Some(conversation) = inner.conversations.get_mut(&conversation_id) else {
            return Err(AppError::not_found("conversation"));
        };

        match by {
            Party::User => conversation.unread_by_user = false,
            Party::Admin => conversation.unread_by_admin = false,
        }

        Ok(())
    }

    async fn record_upload_page(
        &self,
        upload_id: &str,
        page_number: i32,
        image_url: &str,
    ) -> AppResult<UploadPage> {
        let mut inner = self.inner.lock().await;

        let key = (upload_id.to_string(), page_number);
        // Re-registering replaces the URL but keeps the original
        // registration time.
        let page = match inner.upload_pages.get(&key) {
            Some(existing) => UploadPage {
                image_url: image_url.to_string(),
                ..existing.clone()
            },
            None => UploadPage {
                upload_id: upload_id.to_string(),
                page_number,
                image_url: image_url.to_string(),
                created_at: Utc::now(),
            },
        };
        inner.upload_pages.insert(key, page.clone());

        Ok(page)
    }

    async fn find_upload_page(
        &self,
        upload_id: &str,
        page_number: i32,
    ) -> AppResult<Option<UploadPage>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .upload_pages
            .get(&(upload_id.to_string(), page_number))
            .cloned())
    }
}
