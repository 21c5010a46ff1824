use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Conversation, ConversationSummary, Message, MessagePage, Party, UploadPage};

use super::ConversationStore;

pub type DbPool = Pool<Postgres>;

/// Postgres-backed store.
///
/// Append atomicity comes from a transaction that updates the
/// conversation row before inserting the message: the row lock taken by
/// the UPDATE serializes concurrent appends to the same conversation, and
/// the message reuses the timestamp the UPDATE assigned, so the cache and
/// the message can never disagree.
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl ConversationStore for PgStore {
    async fn get_or_create_conversation(&self, user_id: Uuid) -> AppResult<Conversation> {
        let created = sqlx::query_as::<_, Conversation>(
            r#"
            INSERT INTO conversations (id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO NOTHING
            RETURNING id, user_id, subject, last_message, last_message_at,
                      unread_by_user, unread_by_admin, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(conversation) = created {
            crate::metrics::CONVERSATIONS_CREATED_TOTAL.inc();
            tracing::info!(
                conversation_id = %conversation.id,
                "Created conversation"
            );
            return Ok(conversation);
        }

        // Conflict path: the row already existed, possibly created by a
        // concurrent first touch that committed just before us.
        let conversation = sqlx::query_as::<_, Conversation>(
            r#"
            SELECT id, user_id, subject, last_message, last_message_at,
                   unread_by_user, unread_by_admin, created_at
            FROM conversations
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::not_found("conversation"))?;

        Ok(conversation)
    }

    async fn conversation(&self, conversation_id: Uuid) -> AppResult<Option<Conversation>> {
        let conversation = sqlx::query_as::<_, Conversation>(
            r#"
            SELECT id, user_id, subject, last_message, last_message_at,
                   unread_by_user, unread_by_admin, created_at
            FROM conversations
            WHERE id = $1
            "#,
        )
        .bind(conversation_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(conversation)
    }

    async fn list_conversations(&self) -> AppResult<Vec<ConversationSummary>> {
        let summaries = sqlx::query_as::<_, ConversationSummary>(
            r#"
            SELECT id, user_id, last_message, last_message_at, unread_by_admin
            FROM conversations
            ORDER BY last_message_at DESC NULLS LAST, created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(summaries)
    }

    async fn messages_page(
        &self,
        conversation_id: Uuid,
        cursor: Option<Uuid>,
        limit: u32,
    ) -> AppResult<MessagePage> {
        let after: Option<(DateTime<Utc>, i64)> = match cursor {
            Some(cursor_id) => {
                let row = sqlx::query_as::<_, (DateTime<Utc>, i64)>(
                    r#"
                    SELECT created_at, seq
                    FROM messages
                    WHERE id = $1 AND conversation_id = $2
                    "#,
                )
                .bind(cursor_id)
                .bind(conversation_id)
                .fetch_optional(&self.pool)
                .await?;

                Some(row.ok_or_else(|| {
                    AppError::validation("cursor does not name a message in this conversation")
                })?)
            }
            None => None,
        };

        // Fetch one row beyond the page to learn whether more remain.
        let fetch_limit = i64::from(limit) + 1;
        let mut messages: Vec<Message> = match after {
            Some((cursor_at, cursor_seq)) => {
                sqlx::query_as::<_, Message>(
                    r#"
                    SELECT id, conversation_id, sender, text, status, created_at
                    FROM messages
                    WHERE conversation_id = $1 AND (created_at, seq) > ($2, $3)
                    ORDER BY created_at, seq
                    LIMIT $4
                    "#,
                )
                .bind(conversation_id)
                .bind(cursor_at)
                .bind(cursor_seq)
                .bind(fetch_limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Message>(
                    r#"
                    SELECT id, conversation_id, sender, text, status, created_at
                    FROM messages
                    WHERE conversation_id = $1
                    ORDER BY created_at, seq
                    LIMIT $2
                    "#,
                )
                .bind(conversation_id)
                .bind(fetch_limit)
                .fetch_all(&self.pool)
                .await?
            }
        };

        let next_cursor = if messages.len() > limit as usize {
            messages.truncate(limit as usize);
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

        let mut tx = self.pool.begin().await?;

        // Update the parent first: the row lock serializes concurrent
        // appends, and zero rows means no such conversation.
        // clock_timestamp() rather than now() so the timestamp is taken
        // after the lock is acquired; lock order, timestamp order, and
        // seq order then all agree.
        let touched: Option<(DateTime<Utc>,)> = sqlx::query_as(
            r#"
            UPDATE conversations
            SET last_message = $2,
                last_message_at = clock_timestamp(),
                unread_by_user = unread_by_user OR $3,
                unread_by_admin = unread_by_admin OR $4
            WHERE id = $1
            RETURNING last_message_at
            "#,
        )
        .bind(conversation_id)
        .bind(text)
        .bind(sender == Party::Admin)
        .bind(sender == Party::User)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((created_at,)) = touched else {
            return Err(AppError::not_found("conversation"));
        };

        let message = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (id, conversation_id, sender, text, status, created_at)
            VALUES ($1, $2, $3, $4, 'sent', $5)
            RETURNING id, conversation_id, sender, text, status, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(conversation_id)
        .bind(sender)
        .bind(text)
        .bind(created_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(message)
    }

    async fn mark_read(&self, conversation_id: Uuid, by: Party) -> AppResult<()> {
        let query = match by {
            Party::User => "UPDATE conversations SET unread_by_user = FALSE WHERE id = $1",
            Party::Admin => "UPDATE conversations SET unread_by_admin = FALSE WHERE id = $1",
        };

        let result = sqlx::query(query)
            .bind(conversation_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("conversation"));
        }

        Ok(())
    }

    async fn record_upload_page(
        &self,
        upload_id: &str,
        page_number: i32,
        image_url: &str,
    ) -> AppResult<UploadPage> {
        let page = sqlx::query_as::<_, UploadPage>(
            r#"
            INSERT INTO upload_pages (upload_id, page_number, image_url)
            VALUES ($1, $2, $3)
            ON CONFLICT (upload_id, page_number) DO UPDATE SET
                image_url = EXCLUDED.image_url
            RETURNING upload_id, page_number, image_url, created_at
            "#,
        )
        .bind(upload_id)
        .bind(page_number)
        .bind(image_url)
        .fetch_one(&self.pool)
        .await?;

        Ok(page)
    }

    async fn find_upload_page(
        &self,
        upload_id: &str,
        page_number: i32,
    ) -> AppResult<Option<UploadPage>> {
        let page = sqlx::query_as::<_, UploadPage>(
            r#"
            SELECT upload_id, page_number, image_url, created_at
            FROM upload_pages
            WHERE upload_id = $1 AND page_number = $2
            "#,
        )
        .bind(upload_id)
        .bind(page_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    async fn test_store() -> PgStore {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL for Postgres tests");
        let store = PgStore::connect(&url).await.expect("connect");
        sqlx::migrate!().run(store.pool()).await.expect("migrate");
        store
    }

    #[tokio::test]
    #[ignore] // Requires Postgres
    async fn append_refreshes_cache_and_other_flag_together() {
        let store = test_store().await;
        let conversation = store
            .get_or_create_conversation(Uuid::new_v4())
            .await
            .unwrap();

        let message = store
            .append_message(conversation.id, Party::User, "first page done")
            .await
            .unwrap();

        let after = store
            .conversation(conversation.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(after.last_message, "first page done");
        assert_eq!(after.last_message_at, Some(message.created_at));
        assert!(after.unread_by_admin);
        assert!(!after.unread_by_user);
    }

    #[tokio::test]
    #[ignore] // Requires Postgres
    async fn concurrent_appends_both_persist_in_one_order() {
        let store = Arc::new(test_store().await);
        let conversation = store
            .get_or_create_conversation(Uuid::new_v4())
            .await
            .unwrap();

        let a = {
            let store = store.clone();
            let id = conversation.id;
            tokio::spawn(async move { store.append_message(id, Party::User, "from user").await })
        };
        let b = {
            let store = store.clone();
            let id = conversation.id;
            tokio::spawn(async move { store.append_message(id, Party::Admin, "from admin").await })
        };

        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        let page = store.messages_page(conversation.id, None, 10).await.unwrap();
        assert_eq!(page.messages.len(), 2);
        assert!(page.next_cursor.is_none());

        // The cache points at whichever append the store ordered last.
        let after = store
            .conversation(conversation.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            after.last_message,
            page.messages.last().unwrap().text
        );
    }
}
