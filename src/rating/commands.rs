/// 후기 관련 커맨드 처리
/// 완료된 예약에 대해 예약자(renter)만, 예약당 한 번만 남길 수 있다.
// region:    --- Imports
use crate::booking::model::status;
use crate::database::DatabaseManager;
use crate::error::{unique_violation, AppError};
use serde::Deserialize;
use sqlx::Row;
use tracing::info;

// endregion: --- Imports

// region:    --- Commands

pub const MAX_COMMENT_LEN: usize = 1000;

/// 후기 등록 명령
#[derive(Debug, Deserialize)]
pub struct SubmitRatingRequest {
    #[serde(alias = "booking", alias = "bookingId")]
    pub booking_id: i64,
    pub stars: i64,
    #[serde(default)]
    pub comment: String,
}

// endregion: --- Commands

// region:    --- 쿼리

const GET_BOOKING_FOR_RATING: &str =
    "SELECT renter_id, owner_id, status FROM bookings WHERE id = $1";

const INSERT_RATING: &str = r#"
    INSERT INTO ratings (booking_id, from_user, to_user, stars, comment)
    VALUES ($1, $2, $3, $4, $5)
    RETURNING id
"#;

// endregion: --- 쿼리

// region:    --- 후기 등록

/// 후기 등록. 성공하면 새 후기 id 를 돌려준다.
/// - 예약이 없으면 NotFound
/// - 리뷰어가 예약자가 아니면 Forbidden
/// - 예약이 completed 가 아니면 InvalidState
/// - 같은 (예약, 리뷰어) 두 번째 시도는 DuplicateRating
pub async fn submit_rating(
    db: &DatabaseManager,
    reviewer_id: i64,
    req: SubmitRatingRequest,
) -> Result<i64, AppError> {
    info!(
        "{:<12} --> 후기 등록 요청: booking={}, reviewer={}",
        "Command", req.booking_id, reviewer_id
    );

    let booking_id = req.booking_id;
    let stars = i32::try_from(req.stars)
        .ok()
        .filter(|s| (1..=5).contains(s))
        .ok_or_else(|| AppError::Validation("별점은 1~5 사이 정수여야 합니다.".to_string()))?;
    let comment = req.comment.trim().to_string();
    if comment.chars().count() > MAX_COMMENT_LEN {
        return Err(AppError::Validation(format!(
            "후기는 {}자 이하여야 합니다.",
            MAX_COMMENT_LEN
        )));
    }

    db.transaction(|tx| {
        Box::pin(async move {
            let bk = sqlx::query(GET_BOOKING_FOR_RATING)
                .bind(booking_id)
                .fetch_optional(&mut **tx)
                .await?
                .ok_or(AppError::NotFound("예약"))?;

            let renter_id: i64 = bk.get("renter_id");
            let owner_id: i64 = bk.get("owner_id");
            let booking_status: String = bk.get("status");

            if renter_id != reviewer_id {
                return Err(AppError::Forbidden);
            }
            if booking_status != status::COMPLETED {
                return Err(AppError::InvalidState);
            }

            // 중복은 ratings_booking_reviewer 유니크 제약이 잡는다
            let inserted = sqlx::query_scalar::<_, i64>(INSERT_RATING)
                .bind(booking_id)
                .bind(reviewer_id)
                .bind(owner_id)
                .bind(stars)
                .bind(&comment)
                .fetch_one(&mut **tx)
                .await;

            match inserted {
                Ok(id) => {
                    info!("{:<12} --> 후기 등록 완료: id={}", "Command", id);
                    Ok(id)
                }
                Err(e) if unique_violation(&e) == Some("ratings_booking_reviewer") => {
                    Err(AppError::DuplicateRating)
                }
                Err(e) => Err(AppError::from(e)),
            }
        })
    })
    .await
}

// endregion: --- 후기 등록

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_accepts_aliases() {
        let req: SubmitRatingRequest =
            serde_json::from_str(r#"{"bookingId": 5, "stars": 4}"#).unwrap();
        assert_eq!(req.booking_id, 5);
        assert_eq!(req.stars, 4);
        assert_eq!(req.comment, "");
    }
}
