use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Subscriber {
    pub chat_id: i64,
    pub added_at: Option<chrono::NaiveDateTime>,
}
