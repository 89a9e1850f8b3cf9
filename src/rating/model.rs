use chrono::{DateTime, Utc};
use serde::Serialize;

// 후기 모델
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct Rating {
    pub id: i64,
    pub booking_id: i64,
    pub from_user: i64,
    pub to_user: i64,
    pub stars: i32,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}
