use serde::{Deserialize, Serialize};

use super::domain::DomainStatus;

/// One row per probe attempt, scheduled or on-demand. Append-only;
/// deleted only via domain cascade.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CheckLog {
    pub id: i64,
    pub domain_id: i64,
    pub checked_at: Option<chrono::NaiveDateTime>,
    pub status: DomainStatus,
    pub error: Option<String>,
}
