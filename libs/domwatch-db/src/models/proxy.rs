use serde::{Deserialize, Serialize};

/// Outbound proxy descriptor. At most one proxy is active at any time;
/// the pool is otherwise addressable by country tag.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Proxy {
    pub id: i64,
    pub host: String,
    pub port: i64,
    pub username: Option<String>,
    pub password: Option<String>,
    pub country: Option<String>,
    pub is_active: bool,
    pub created_at: Option<chrono::NaiveDateTime>,
}
