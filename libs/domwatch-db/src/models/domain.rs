use serde::{Deserialize, Serialize};

/// Recorded availability of a domain. `Unknown` means "never evaluated":
/// transition notifications require a previous state of `Up` or `Down`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DomainStatus {
    Unknown,
    Up,
    Down,
}

impl DomainStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DomainStatus::Unknown => "unknown",
            DomainStatus::Up => "up",
            DomainStatus::Down => "down",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Domain {
    pub id: i64,
    pub name: String,
    pub last_status: DomainStatus,
    pub last_error: Option<String>,
    pub last_checked: Option<chrono::NaiveDateTime>,
}
