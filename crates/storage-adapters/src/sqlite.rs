//! # SQLite Message Store
//!
//! This module implements the data mapping between the SQLite relational model
//! and the `domains` models. Ids are stored as 16-byte BLOBs, timestamps as
//! RFC 3339 TEXT, and delivery channels as a JSON object.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use domains::{
    AccountId, Feedback, FeedbackRepo, Message, MessageRepo, MessageType, NewFeedback, NewMessage,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tracing::info;
use uuid::Uuid;

const MESSAGE_COLUMNS: &str = "id, sender_id, receiver_id, receiver_identifier, receiver_method, \
     message_type, title, content, is_anonymous, channels, is_read, created_at";

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (creating if needed) the database at `url` and applies migrations.
    pub async fn connect(url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let mut pool_options = SqlitePoolOptions::new().max_connections(max_connections.max(1));
        if url.contains(":memory:") {
            // Each connection to an in-memory database is its own database.
            pool_options = pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }
        let pool = pool_options.connect_with(options).await?;
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> anyhow::Result<Self> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("sqlite message store ready");
        Ok(Self { pool })
    }

    async fn fetch_messages(&self, sql: &str, account: &AccountId) -> anyhow::Result<Vec<Message>> {
        sqlx::query(sql)
            .bind(account.as_str())
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(message_from_row)
            .collect()
    }
}

fn message_from_row(row: &SqliteRow) -> anyhow::Result<Message> {
    Ok(Message {
        id: row.try_get("id")?,
        sender_id: AccountId::new(row.try_get::<String, _>("sender_id")?),
        receiver_id: row.try_get::<Option<String>, _>("receiver_id")?.map(AccountId::new),
        receiver_identifier: row.try_get("receiver_identifier")?,
        receiver_method: row.try_get::<String, _>("receiver_method")?.parse()?,
        message_type: row.try_get::<String, _>("message_type")?.parse()?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        is_anonymous: row.try_get("is_anonymous")?,
        channels: serde_json::from_str(&row.try_get::<String, _>("channels")?)?,
        read: row.try_get("is_read")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl MessageRepo for SqliteStore {
    async fn insert(&self, new: NewMessage) -> anyhow::Result<Message> {
        let message = Message::from_new(new, Uuid::now_v7(), Utc::now());

        sqlx::query(&format!(
            "INSERT INTO messages ({MESSAGE_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(message.id)
        .bind(message.sender_id.as_str())
        .bind(message.receiver_id.as_ref().map(AccountId::as_str))
        .bind(&message.receiver_identifier)
        .bind(message.receiver_method.as_str())
        .bind(message.message_type.as_str())
        .bind(&message.title)
        .bind(&message.content)
        .bind(message.is_anonymous)
        .bind(serde_json::to_string(&message.channels)?)
        .bind(message.read)
        .bind(message.created_at)
        .execute(&self.pool)
        .await?;

        Ok(message)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Message>> {
        sqlx::query(&format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(message_from_row)
            .transpose()
    }

    async fn find_by_sender_receiver_type(
        &self,
        sender: &AccountId,
        receiver: &AccountId,
        message_type: MessageType,
    ) -> anyhow::Result<Vec<Message>> {
        sqlx::query(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages \
             WHERE sender_id = ? AND receiver_id = ? AND message_type = ? \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(sender.as_str())
        .bind(receiver.as_str())
        .bind(message_type.as_str())
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(message_from_row)
        .collect()
    }

    async fn list_incoming(&self, receiver: &AccountId) -> anyhow::Result<Vec<Message>> {
        self.fetch_messages(
            &format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages WHERE receiver_id = ? \
                 ORDER BY created_at DESC, id DESC"
            ),
            receiver,
        )
        .await
    }

    async fn list_outgoing(&self, sender: &AccountId) -> anyhow::Result<Vec<Message>> {
        self.fetch_messages(
            &format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages WHERE sender_id = ? \
                 ORDER BY created_at DESC, id DESC"
            ),
            sender,
        )
        .await
    }

    async fn list_recent_outgoing(&self, sender: &AccountId, limit: usize) -> anyhow::Result<Vec<Message>> {
        sqlx::query(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE sender_id = ? \
             ORDER BY created_at DESC, id DESC LIMIT ?"
        ))
        .bind(sender.as_str())
        .bind(i64::try_from(limit)?)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(message_from_row)
        .collect()
    }

    async fn delete_owned(&self, id: Uuid, requester: &AccountId) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM messages WHERE id = ? AND (sender_id = ? OR receiver_id = ?)")
            .bind(id)
            .bind(requester.as_str())
            .bind(requester.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_read(&self, id: Uuid, receiver: &AccountId) -> anyhow::Result<bool> {
        let result = sqlx::query("UPDATE messages SET is_read = 1 WHERE id = ? AND receiver_id = ?")
            .bind(id)
            .bind(receiver.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl FeedbackRepo for SqliteStore {
    async fn insert_feedback(&self, feedback: NewFeedback) -> anyhow::Result<Feedback> {
        let stored = Feedback {
            id: Uuid::now_v7(),
            email: feedback.email,
            content: feedback.content,
            created_at: Utc::now(),
        };
        sqlx::query("INSERT INTO feedbacks (id, email, content, created_at) VALUES (?, ?, ?, ?)")
            .bind(stored.id)
            .bind(&stored.email)
            .bind(&stored.content)
            .bind(stored.created_at)
            .execute(&self.pool)
            .await?;
        Ok(stored)
    }
}
