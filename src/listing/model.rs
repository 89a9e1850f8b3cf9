use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

/// 게시글 상태
pub mod status {
    pub const ACTIVE: &str = "active";
    pub const PAUSED: &str = "paused";
}

// 게시글 + 후기 요약 (목록/상세 조회용)
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct PostSummary {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub content: String,
    pub img: String,
    pub price: i64,
    pub zones: Vec<String>,
    pub activities: Vec<String>,
    pub availability: Vec<NaiveDate>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub rating_avg: f64,
    pub rating_count: i64,
}
