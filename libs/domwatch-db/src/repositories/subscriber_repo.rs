use anyhow::{Context, Result};
use sqlx::SqlitePool;

use crate::models::Subscriber;

#[derive(Debug, Clone)]
pub struct SubscriberRepository {
    pool: SqlitePool,
}

impl SubscriberRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Registers a chat for broadcasts. Set-union semantics: re-adding
    /// an existing chat is a no-op.
    pub async fn add(&self, chat_id: i64) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO subscribers (chat_id) VALUES (?)")
            .bind(chat_id)
            .execute(&self.pool)
            .await
            .context("Failed to add subscriber")?;

        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<Subscriber>> {
        sqlx::query_as::<_, Subscriber>("SELECT * FROM subscribers ORDER BY chat_id ASC")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list subscribers")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;
    use sqlx::sqlite::SqlitePoolOptions;

    #[tokio::test]
    async fn add_is_idempotent() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        init_schema(&pool).await.unwrap();
        let repo = SubscriberRepository::new(pool);

        repo.add(42).await.unwrap();
        repo.add(42).await.unwrap();
        repo.add(7).await.unwrap();

        let subscribers = repo.list().await.unwrap();
        let ids: Vec<i64> = subscribers.iter().map(|s| s.chat_id).collect();
        assert_eq!(ids, vec![7, 42]);
        assert!(subscribers.iter().all(|s| s.added_at.is_some()));
    }
}
