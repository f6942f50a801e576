use anyhow::Result;

use domwatch_db::models::Proxy;
use domwatch_db::repositories::ProxyRepository;

/// Chooses which proxy (if any) a probe should route through. Runs once
/// per attempt, so pool changes are picked up by the next check.
pub struct EgressSelector {
    proxies: ProxyRepository,
    preferred_country: String,
}

impl EgressSelector {
    pub fn new(proxies: ProxyRepository, preferred_country: impl Into<String>) -> Self {
        Self {
            proxies,
            preferred_country: preferred_country.into(),
        }
    }

    /// Policy: proxy tagged with the preferred country, else the active
    /// proxy, else direct connection.
    pub async fn select(&self) -> Result<Option<Proxy>> {
        if let Some(proxy) = self.proxies.get_for_country(&self.preferred_country).await? {
            return Ok(Some(proxy));
        }
        self.proxies.get_active().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domwatch_db::init_schema;
    use domwatch_db::sqlx::sqlite::SqlitePoolOptions;

    async fn test_repo() -> ProxyRepository {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        init_schema(&pool).await.unwrap();
        ProxyRepository::new(pool)
    }

    #[tokio::test]
    async fn empty_pool_means_direct_connection() {
        let selector = EgressSelector::new(test_repo().await, "turkey");
        assert!(selector.select().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn prefers_country_match_over_active_proxy() {
        let repo = test_repo().await;
        let tr = repo
            .add("1.1.1.1", 8080, None, None, Some("turkey"))
            .await
            .unwrap();
        // newer proxy becomes active, but it is not in the preferred country
        repo.add("2.2.2.2", 8080, None, None, Some("germany"))
            .await
            .unwrap();

        let selector = EgressSelector::new(repo, "turkey");
        assert_eq!(selector.select().await.unwrap().unwrap().id, tr);
    }

    #[tokio::test]
    async fn falls_back_to_active_proxy() {
        let repo = test_repo().await;
        let de = repo
            .add("2.2.2.2", 8080, None, None, Some("germany"))
            .await
            .unwrap();

        let selector = EgressSelector::new(repo, "turkey");
        assert_eq!(selector.select().await.unwrap().unwrap().id, de);
    }
}
