use anyhow::{Context, Result};
use sqlx::SqlitePool;

use crate::models::Proxy;

/// Proxy pool access. Invariant held by every mutation here: at most one
/// proxy has `is_active = 1` at any time.
#[derive(Debug, Clone)]
pub struct ProxyRepository {
    pool: SqlitePool,
}

impl ProxyRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Adds a proxy and makes it the active one. Deactivation of the
    /// previous proxy and insertion happen in a single transaction, so a
    /// crash can never leave the pool with zero active proxies.
    pub async fn add(
        &self,
        host: &str,
        port: i64,
        username: Option<&str>,
        password: Option<&str>,
        country: Option<&str>,
    ) -> Result<i64> {
        let mut tx = self.pool.begin().await.context("Failed to open transaction")?;

        sqlx::query("UPDATE proxies SET is_active = 0")
            .execute(&mut *tx)
            .await
            .context("Failed to deactivate existing proxies")?;

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO proxies (host, port, username, password, country, is_active)
             VALUES (?, ?, ?, ?, ?, 1) RETURNING id",
        )
        .bind(host)
        .bind(port)
        .bind(username)
        .bind(password)
        .bind(country)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to insert proxy")?;

        tx.commit().await.context("Failed to commit proxy insert")?;

        Ok(id)
    }

    /// Removes a proxy by id. If that leaves the pool without an active
    /// proxy, the most recently created remaining one is promoted.
    /// Returns whether a proxy was actually deleted.
    pub async fn remove(&self, id: i64) -> Result<bool> {
        let mut tx = self.pool.begin().await.context("Failed to open transaction")?;

        let deleted = sqlx::query("DELETE FROM proxies WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete proxy")?
            .rows_affected()
            > 0;

        if deleted {
            let active: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM proxies WHERE is_active = 1")
                    .fetch_one(&mut *tx)
                    .await
                    .context("Failed to count active proxies")?;

            if active == 0 {
                sqlx::query(
                    "UPDATE proxies SET is_active = 1
                     WHERE id = (SELECT id FROM proxies ORDER BY created_at DESC, id DESC LIMIT 1)",
                )
                .execute(&mut *tx)
                .await
                .context("Failed to promote replacement proxy")?;
            }
        }

        tx.commit().await.context("Failed to commit proxy removal")?;

        Ok(deleted)
    }

    pub async fn list(&self) -> Result<Vec<Proxy>> {
        sqlx::query_as::<_, Proxy>("SELECT * FROM proxies ORDER BY created_at DESC, id DESC")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list proxies")
    }

    pub async fn get_active(&self) -> Result<Option<Proxy>> {
        sqlx::query_as::<_, Proxy>(
            "SELECT * FROM proxies WHERE is_active = 1 ORDER BY created_at DESC, id DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch active proxy")
    }

    /// Best proxy for a country tag: the active one if it matches, else
    /// the most recently created match.
    pub async fn get_for_country(&self, country: &str) -> Result<Option<Proxy>> {
        sqlx::query_as::<_, Proxy>(
            "SELECT * FROM proxies WHERE lower(country) = lower(?)
             ORDER BY is_active DESC, created_at DESC, id DESC LIMIT 1",
        )
        .bind(country)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch proxy for country")
    }
}
