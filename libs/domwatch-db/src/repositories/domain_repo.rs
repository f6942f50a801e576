use anyhow::{Context, Result};
use sqlx::SqlitePool;

use crate::models::{CheckLog, Domain, DomainStatus};
use crate::normalize::normalize_domain;

#[derive(Debug, Clone)]
pub struct DomainRepository {
    pool: SqlitePool,
}

impl DomainRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Registers a domain for monitoring. Idempotent: re-adding an
    /// already-known name (in any scheme/case variant) is a no-op.
    pub async fn add(&self, name: &str) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO domains (name, last_status) VALUES (?, 'unknown')")
            .bind(normalize_domain(name))
            .execute(&self.pool)
            .await
            .context("Failed to add domain")?;

        Ok(())
    }

    /// Removes a domain and, via cascade, its check log. Returns whether
    /// a record was actually deleted.
    pub async fn remove(&self, name: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM domains WHERE name = ?")
            .bind(normalize_domain(name))
            .execute(&self.pool)
            .await
            .context("Failed to remove domain")?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn list(&self) -> Result<Vec<Domain>> {
        sqlx::query_as::<_, Domain>("SELECT * FROM domains ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list domains")
    }

    pub async fn get(&self, name: &str) -> Result<Option<Domain>> {
        sqlx::query_as::<_, Domain>("SELECT * FROM domains WHERE name = ?")
            .bind(normalize_domain(name))
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch domain")
    }

    /// Persists the outcome of a probe. Runs on every check, transition
    /// or not, and always refreshes `last_checked`.
    pub async fn update_status(
        &self,
        id: i64,
        status: DomainStatus,
        error: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE domains SET last_status = ?, last_error = ?, last_checked = datetime('now') WHERE id = ?",
        )
        .bind(status)
        .bind(error)
        .bind(id)
        .execute(&self.pool)
        .await
        .context("Failed to update domain status")?;

        Ok(())
    }

    /// Appends one check-log row. One entry per probe attempt, never
    /// mutated afterwards.
    pub async fn append_check_log(
        &self,
        id: i64,
        status: DomainStatus,
        error: Option<&str>,
    ) -> Result<()> {
        sqlx::query("INSERT INTO check_logs (domain_id, status, error) VALUES (?, ?, ?)")
            .bind(id)
            .bind(status)
            .bind(error)
            .execute(&self.pool)
            .await
            .context("Failed to append check log")?;

        Ok(())
    }

    pub async fn recent_checks(&self, domain_id: i64, limit: i64) -> Result<Vec<CheckLog>> {
        sqlx::query_as::<_, CheckLog>(
            "SELECT * FROM check_logs WHERE domain_id = ? ORDER BY checked_at DESC, id DESC LIMIT ?",
        )
        .bind(domain_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch check history")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        init_schema(&pool).await.unwrap();
        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&pool)
            .await
            .unwrap();
        pool
    }

    #[tokio::test]
    async fn add_is_idempotent_across_variants() {
        let repo = DomainRepository::new(test_pool().await);

        repo.add("example.com").await.unwrap();
        repo.add("HTTPS://Example.com/").await.unwrap();
        repo.add("http://example.com").await.unwrap();

        let domains = repo.list().await.unwrap();
        assert_eq!(domains.len(), 1);
        assert_eq!(domains[0].name, "example.com");
        assert_eq!(domains[0].last_status, DomainStatus::Unknown);
        assert!(domains[0].last_checked.is_none());
    }

    #[tokio::test]
    async fn lookup_and_removal_use_normalized_names() {
        let repo = DomainRepository::new(test_pool().await);
        repo.add("example.com").await.unwrap();

        assert!(repo.get("HTTPS://Example.com/").await.unwrap().is_some());
        assert!(repo.remove("Example.com/").await.unwrap());
        assert!(!repo.remove("example.com").await.unwrap());
        assert!(repo.get("example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_status_sets_last_checked_and_error() {
        let repo = DomainRepository::new(test_pool().await);
        repo.add("example.com").await.unwrap();
        let domain = repo.get("example.com").await.unwrap().unwrap();

        repo.update_status(domain.id, DomainStatus::Down, Some("HTTP 503"))
            .await
            .unwrap();

        let domain = repo.get("example.com").await.unwrap().unwrap();
        assert_eq!(domain.last_status, DomainStatus::Down);
        assert_eq!(domain.last_error.as_deref(), Some("HTTP 503"));
        assert!(domain.last_checked.is_some());

        repo.update_status(domain.id, DomainStatus::Up, None)
            .await
            .unwrap();
        let domain = repo.get("example.com").await.unwrap().unwrap();
        assert_eq!(domain.last_status, DomainStatus::Up);
        assert!(domain.last_error.is_none());
    }

    #[tokio::test]
    async fn check_log_cascades_on_domain_removal() {
        let pool = test_pool().await;
        let repo = DomainRepository::new(pool.clone());
        repo.add("example.com").await.unwrap();
        let domain = repo.get("example.com").await.unwrap().unwrap();

        repo.append_check_log(domain.id, DomainStatus::Down, Some("TIMEOUT"))
            .await
            .unwrap();
        repo.append_check_log(domain.id, DomainStatus::Up, None)
            .await
            .unwrap();
        assert_eq!(repo.recent_checks(domain.id, 10).await.unwrap().len(), 2);

        repo.remove("example.com").await.unwrap();
        assert!(repo.recent_checks(domain.id, 10).await.unwrap().is_empty());
    }
}
