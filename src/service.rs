use std::sync::Arc;

use uuid::Uuid;

use crate::broker::{self, EventPublisher};
use crate::config::ChatConfig;
use crate::error::{AppError, AppResult};
use crate::models::{Conversation, ConversationSummary, Message, MessagePage, Party};
use crate::store::ConversationStore;

/// The authenticated principal acting on a conversation, as carried by
/// the verified token.
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: Uuid,
    pub email: String,
    pub role: Party,
}

/// Conversation operations with authorization and push fan-out on top
/// of the store.
///
/// Persistence is the source of truth: a message is acknowledged once
/// the store has it, and push delivery failures degrade to the
/// recipient's next fetch instead of failing the send.
pub struct ChatService {
    store: Arc<dyn ConversationStore>,
    broker: Arc<dyn EventPublisher>,
    limits: ChatConfig,
}

impl ChatService {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        broker: Arc<dyn EventPublisher>,
        limits: ChatConfig,
    ) -> Self {
        Self {
            store,
            broker,
            limits,
        }
    }

    /// Returns the caller's own conversation, creating it on first
    /// touch. Operators have no conversation of their own.
    pub async fn fetch_or_create(&self, actor: &Actor) -> AppResult<Conversation> {
        if actor.role != Party::User {
            return Err(AppError::forbidden(
                "only course users have a conversation",
            ));
        }
        self.store.get_or_create_conversation(actor.id).await
    }

    /// Operator inbox: every conversation, most recent activity first.
    pub async fn list_inbox(&self, actor: &Actor) -> AppResult<Vec<ConversationSummary>> {
        if actor.role != Party::Admin {
            return Err(AppError::forbidden("operator access required"));
        }
        self.store.list_conversations().await
    }

    /// Ascending chronological page of a conversation the actor
    /// participates in.
    pub async fn history(
        &self,
        actor: &Actor,
        conversation_id: Uuid,
        cursor: Option<Uuid>,
        limit: Option<u32>,
    ) -> AppResult<MessagePage> {
        self.authorize(actor, conversation_id).await?;
        let limit = self.clamp_limit(limit);
        self.store
            .messages_page(conversation_id, cursor, limit)
            .await
    }

    /// Persists a message and pushes it to the other party.
    ///
    /// Validation runs before any store access so malformed input
    /// fails fast. Once the append commits the send has succeeded;
    /// publishes after that point are best effort.
    pub async fn send(
        &self,
        actor: &Actor,
        conversation_id: Uuid,
        text: &str,
    ) -> AppResult<Message> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::validation("message text must not be empty"));
        }
        if text.chars().count() > self.limits.max_text_chars {
            return Err(AppError::validation(format!(
                "message text exceeds {} characters",
                self.limits.max_text_chars
            )));
        }

        let conversation = self.authorize(actor, conversation_id).await?;
        let message = self
            .store
            .append_message(conversation_id, actor.role, text)
            .await?;
        crate::metrics::MESSAGES_SENT_TOTAL.inc();

        self.publish_message_new(&message).await;
        if actor.role == Party::User {
            self.publish_inbox_update(&conversation, &message).await;
        }

        Ok(message)
    }

    /// Clears the actor's own unread flag. Idempotent.
    pub async fn mark_read(&self, actor: &Actor, conversation_id: Uuid) -> AppResult<()> {
        self.authorize(actor, conversation_id).await?;
        self.store.mark_read(conversation_id, actor.role).await
    }

    /// Operators see every conversation; users only their own. An
    /// existing conversation belonging to someone else is forbidden,
    /// an absent one is not found.
    async fn authorize(&self, actor: &Actor, conversation_id: Uuid) -> AppResult<Conversation> {
        let conversation = self.store.conversation(conversation_id).await?;
        match actor.role {
            Party::Admin => conversation.ok_or_else(|| AppError::not_found("conversation")),
            Party::User => match conversation {
                Some(c) if c.user_id == actor.id => Ok(c),
                Some(_) => Err(AppError::forbidden(
                    "not a participant in this conversation",
                )),
                None => Err(AppError::not_found("conversation")),
            },
        }
    }

    fn clamp_limit(&self, limit: Option<u32>) -> u32 {
        limit
            .unwrap_or(self.limits.default_page_size)
            .clamp(1, self.limits.max_page_size)
    }

    async fn publish_message_new(&self, message: &Message) {
        let payload = match serde_json::to_value(message) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::error!(error = %err, "Failed to serialize message event");
                return;
            }
        };

        let channel = broker::conversation_channel(message.conversation_id);
        if let Err(err) = self
            .broker
            .publish(&channel, broker::EVENT_MESSAGE_NEW, payload)
            .await
        {
            crate::metrics::BROKER_PUBLISH_ERRORS_TOTAL.inc();
            tracing::warn!(
                error = %err,
                conversation_id = %message.conversation_id,
                "Push publish failed, the recipient will catch up on next fetch"
            );
        }
    }

    async fn publish_inbox_update(&self, conversation: &Conversation, message: &Message) {
        let summary = ConversationSummary {
            id: conversation.id,
            user_id: conversation.user_id,
            last_message: message.text.clone(),
            last_message_at: Some(message.created_at),
            unread_by_admin: true,
        };
        let payload = match serde_json::to_value(&summary) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::error!(error = %err, "Failed to serialize inbox event");
                return;
            }
        };

        if let Err(err) = self
            .broker
            .publish(
                broker::ADMIN_INBOX_CHANNEL,
                broker::EVENT_CONVERSATION_UPDATED,
                payload,
            )
            .await
        {
            crate::metrics::BROKER_PUBLISH_ERRORS_TOTAL.inc();
            tracing::warn!(
                error = %err,
                conversation_id = %conversation.id,
                "Inbox publish failed, the operator list will refresh on next fetch"
            );
        }
    }
}
