// region:    --- Imports
use super::queries;
use crate::auth::UserProfile;
use crate::booking::model::Booking;
use crate::database::DatabaseManager;
use crate::error::AppError;
use crate::listing::model::PostSummary;
use crate::rating::model::Rating;
use tracing::info;

// endregion: --- Imports

// region:    --- 공용

/// 목록 조회 limit 보정 (1~50)
pub fn clamp_limit(raw: Option<i64>, default: i64) -> i64 {
    raw.unwrap_or(default).clamp(1, 50)
}

/// 예약 목록의 역할 필터
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleFilter {
    /// 내가 예약자인 것만
    Buyer,
    /// 내가 오너인 것만
    Seller,
    /// 양쪽 모두 (중복 없이)
    Both,
}

impl RoleFilter {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.to_lowercase()).as_deref() {
            Some("buyer") => RoleFilter::Buyer,
            Some("seller") => RoleFilter::Seller,
            _ => RoleFilter::Both,
        }
    }
}

// endregion: --- 공용

// region:    --- Query Handlers

/// 게시글 목록 조회
pub async fn get_posts(
    db: &DatabaseManager,
    limit: i64,
) -> Result<Vec<PostSummary>, AppError> {
    info!("{:<12} --> 게시글 목록 조회 limit: {}", "Query", limit);
    db.transaction(|tx| {
        Box::pin(async move {
            sqlx::query_as::<_, PostSummary>(queries::GET_POSTS)
                .bind(limit)
                .fetch_all(&mut **tx)
                .await
                .map_err(AppError::from)
        })
    })
    .await
}

/// 게시글 조회
pub async fn get_post(db: &DatabaseManager, post_id: i64) -> Result<PostSummary, AppError> {
    info!("{:<12} --> 게시글 조회 id: {}", "Query", post_id);
    db.transaction(|tx| {
        Box::pin(async move {
            sqlx::query_as::<_, PostSummary>(queries::GET_POST)
                .bind(post_id)
                .fetch_optional(&mut **tx)
                .await?
                .ok_or(AppError::NotFound("게시글"))
        })
    })
    .await
}

/// 예약 목록 조회 (최신순, 역할 필터)
pub async fn list_bookings(
    db: &DatabaseManager,
    user_id: i64,
    role: RoleFilter,
    limit: i64,
) -> Result<Vec<Booking>, AppError> {
    info!(
        "{:<12} --> 예약 목록 조회 user: {}, role: {:?}",
        "Query", user_id, role
    );
    let sql = match role {
        RoleFilter::Buyer => queries::GET_BOOKINGS_AS_RENTER,
        RoleFilter::Seller => queries::GET_BOOKINGS_AS_OWNER,
        RoleFilter::Both => queries::GET_BOOKINGS_MERGED,
    };
    db.transaction(|tx| {
        Box::pin(async move {
            sqlx::query_as::<_, Booking>(sql)
                .bind(user_id)
                .bind(limit)
                .fetch_all(&mut **tx)
                .await
                .map_err(AppError::from)
        })
    })
    .await
}

/// 예약 단건 조회
pub async fn get_booking(db: &DatabaseManager, booking_id: i64) -> Result<Booking, AppError> {
    info!("{:<12} --> 예약 조회 id: {}", "Query", booking_id);
    db.transaction(|tx| {
        Box::pin(async move {
            sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1")
                .bind(booking_id)
                .fetch_optional(&mut **tx)
                .await?
                .ok_or(AppError::NotFound("예약"))
        })
    })
    .await
}

/// 받은 후기 조회
pub async fn get_ratings_for_user(
    db: &DatabaseManager,
    to_user: i64,
    limit: i64,
) -> Result<Vec<Rating>, AppError> {
    info!("{:<12} --> 받은 후기 조회 user: {}", "Query", to_user);
    db.transaction(|tx| {
        Box::pin(async move {
            sqlx::query_as::<_, Rating>(queries::GET_RATINGS_FOR_USER)
                .bind(to_user)
                .bind(limit)
                .fetch_all(&mut **tx)
                .await
                .map_err(AppError::from)
        })
    })
    .await
}

/// 예약의 후기 조회
pub async fn get_ratings_for_booking(
    db: &DatabaseManager,
    booking_id: i64,
    limit: i64,
) -> Result<Vec<Rating>, AppError> {
    info!("{:<12} --> 예약 후기 조회 booking: {}", "Query", booking_id);
    db.transaction(|tx| {
        Box::pin(async move {
            sqlx::query_as::<_, Rating>(queries::GET_RATINGS_FOR_BOOKING)
                .bind(booking_id)
                .bind(limit)
                .fetch_all(&mut **tx)
                .await
                .map_err(AppError::from)
        })
    })
    .await
}

/// 내 프로필 조회
pub async fn get_profile(db: &DatabaseManager, user_id: i64) -> Result<UserProfile, AppError> {
    info!("{:<12} --> 프로필 조회 id: {}", "Query", user_id);
    db.transaction(|tx| {
        Box::pin(async move {
            sqlx::query_as::<_, UserProfile>(queries::GET_PROFILE)
                .bind(user_id)
                .fetch_optional(&mut **tx)
                .await?
                .ok_or(AppError::NotFound("사용자"))
        })
    })
    .await
}

/// 사용자 잔액 조회
pub async fn get_balance(db: &DatabaseManager, user_id: i64) -> Result<i64, AppError> {
    info!("{:<12} --> 잔액 조회 id: {}", "Query", user_id);
    db.transaction(|tx| {
        Box::pin(async move {
            sqlx::query_scalar::<_, i64>(queries::GET_BALANCE)
                .bind(user_id)
                .fetch_optional(&mut **tx)
                .await?
                .ok_or(AppError::NotFound("사용자"))
        })
    })
    .await
}

// endregion: --- Query Handlers

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(None, 20), 20);
        assert_eq!(clamp_limit(Some(5), 20), 5);
        assert_eq!(clamp_limit(Some(0), 20), 1);
        assert_eq!(clamp_limit(Some(-3), 20), 1);
        assert_eq!(clamp_limit(Some(999), 20), 50);
    }

    #[test]
    fn test_role_filter_parse() {
        assert_eq!(RoleFilter::parse(Some("buyer")), RoleFilter::Buyer);
        assert_eq!(RoleFilter::parse(Some("SELLER")), RoleFilter::Seller);
        assert_eq!(RoleFilter::parse(Some("whatever")), RoleFilter::Both);
        assert_eq!(RoleFilter::parse(None), RoleFilter::Both);
    }
}
