use anyhow::Context;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde_json::json;
use uuid::Uuid;

use crate::error::AppResult;

/// Per-conversation channel both participants subscribe to.
pub fn conversation_channel(conversation_id: Uuid) -> String {
    format!("conversation:{}", conversation_id)
}

/// Shared channel the operator inbox subscribes to.
pub const ADMIN_INBOX_CHANNEL: &str = "admin-inbox";

pub const EVENT_MESSAGE_NEW: &str = "message:new";
pub const EVENT_CONVERSATION_UPDATED: &str = "conversation:updated";

/// Fan-out seam for push notifications. Delivery is best effort by
/// contract: callers treat a failed publish as a degraded push, never
/// as a failed operation.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, channel: &str, event: &str, payload: serde_json::Value)
        -> AppResult<()>;
}

/// Redis pub/sub publisher. Built once at startup and cloned per task;
/// `ConnectionManager` reconnects on its own after connection drops.
#[derive(Clone)]
pub struct NotificationBroker {
    conn: Option<ConnectionManager>,
}

impl NotificationBroker {
    /// Connects to Redis, or builds a disabled broker when no URL is
    /// configured. Every publish on a disabled broker is a no-op.
    pub async fn connect(redis_url: Option<&str>) -> anyhow::Result<Self> {
        let Some(url) = redis_url else {
            tracing::warn!("REDIS_URL is not set, push notifications are disabled");
            return Ok(Self::disabled());
        };

        let client = redis::Client::open(url).context("Failed to parse Redis URL")?;
        let conn = client
            .get_connection_manager()
            .await
            .context("Failed to connect to Redis")?;

        Ok(Self { conn: Some(conn) })
    }

    pub fn disabled() -> Self {
        Self { conn: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.conn.is_some()
    }
}

#[async_trait]
impl EventPublisher for NotificationBroker {
    async fn publish(
        &self,
        channel: &str,
        event: &str,
        payload: serde_json::Value,
    ) -> AppResult<()> {
        let Some(conn) = &self.conn else {
            tracing::debug!(channel, event, "Push notifications disabled, dropping event");
            return Ok(());
        };

        let envelope = serde_json::to_string(&json!({
            "event": event,
            "data": payload,
        }))?;

        let mut conn = conn.clone();
        let _: () = conn.publish(channel, envelope).await?;
        tracing::debug!(channel, event, "Published event");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversation_channel_embeds_the_id() {
        let id = Uuid::new_v4();
        assert_eq!(conversation_channel(id), format!("conversation:{}", id));
    }

    #[tokio::test]
    async fn disabled_broker_swallows_publishes() {
        let broker = NotificationBroker::disabled();
        assert!(!broker.is_enabled());

        broker
            .publish(ADMIN_INBOX_CHANNEL, EVENT_CONVERSATION_UPDATED, json!({"x": 1}))
            .await
            .unwrap();
    }

    #[tokio::test]
    #[ignore] // Requires Redis
    async fn publish_reaches_redis() {
        let url = std::env::var("REDIS_URL").unwrap();
        let broker = NotificationBroker::connect(Some(&url)).await.unwrap();
        assert!(broker.is_enabled());

        broker
            .publish("conversation:test", EVENT_MESSAGE_NEW, json!({"text": "ping"}))
            .await
            .unwrap();
    }
}
