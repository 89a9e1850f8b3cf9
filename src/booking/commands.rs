/// 예약 관련 커맨드 처리
/// 1. 예약 생성 (날짜 충돌 방지)
/// 2. 확인 (양측 확인이 모이면 정산)
/// 3. 취소
/// 4. 완료 (오너 단독 경로, confirmed 상태 필수)
// region:    --- Imports
use crate::booking::model::{status, Booking};
use crate::database::DatabaseManager;
use crate::date::CalendarDateInput;
use crate::error::{unique_violation, AppError};
use crate::listing;
use crate::settlement::{self, FeePolicy};
use serde::Deserialize;
use sqlx::Row;
use tracing::info;

// endregion: --- Imports

// region:    --- Commands

/// 예약 생성 명령
#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    #[serde(alias = "post", alias = "postId")]
    pub post_id: i64,
    pub date: CalendarDateInput,
    pub hours: i64,
    #[serde(default)]
    pub notes: String,
}

/// 예약에 대한 액션 (PATCH /bookings/:id)
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookingAction {
    Confirm,
    Cancel,
    Complete,
}

#[derive(Debug, Deserialize)]
pub struct BookingActionRequest {
    pub action: BookingAction,
}

// endregion: --- Commands

// region:    --- 전이 쿼리

/// 가격 스냅샷용 게시글 조회
const GET_POST_FOR_BOOKING: &str = "SELECT user_id, price, status FROM posts WHERE id = $1";

/// 활성 예약 유일성은 bookings_active_slot 부분 유니크 인덱스가
/// INSERT 시점에 보장한다. 애플리케이션에서 조회 후 삽입하는
/// 방식은 두 예약자가 경합하면 깨지므로 쓰지 않는다.
const INSERT_BOOKING: &str = r#"
    INSERT INTO bookings
        (post_id, owner_id, renter_id, date, hours, price_per_hour, total_price, notes)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
    RETURNING id
"#;

const GET_BOOKING: &str = "SELECT * FROM bookings WHERE id = $1";

/// 확인 플래그 갱신은 단일 조건부 업데이트로 처리한다.
/// 종결 상태와 경합하면 아무 행도 바뀌지 않는다.
const CONFIRM_AS_OWNER: &str = r#"
    UPDATE bookings
    SET owner_confirmed = TRUE, status = 'confirmed'
    WHERE id = $1 AND status IN ('pending', 'confirmed')
    RETURNING *
"#;

const CONFIRM_AS_RENTER: &str = r#"
    UPDATE bookings
    SET renter_confirmed = TRUE, status = 'confirmed'
    WHERE id = $1 AND status IN ('pending', 'confirmed')
    RETURNING *
"#;

/// 취소. 정산 전이므로 payment_status 는 unpaid 로 남긴다
const CANCEL_BOOKING: &str = r#"
    UPDATE bookings
    SET status = 'cancelled', payment_status = 'unpaid'
    WHERE id = $1 AND status IN ('pending', 'confirmed')
"#;

// endregion: --- 전이 쿼리

// region:    --- 1. 예약 생성

/// 예약 생성. 성공하면 새 예약 id 를 돌려준다.
/// - 게시글이 없거나 active 가 아니면 NotFound
/// - 오너 == 예약자면 SelfBooking
/// - (post, date) 활성 예약이 이미 있으면 SlotTaken
/// - totalPrice 는 서버가 게시글 가격 스냅샷으로만 계산한다
pub async fn create_booking(
    db: &DatabaseManager,
    renter_id: i64,
    req: CreateBookingRequest,
) -> Result<i64, AppError> {
    info!(
        "{:<12} --> 예약 생성 요청: renter={}, post={}",
        "Command", renter_id, req.post_id
    );

    let post_id = req.post_id;
    let hours = i32::try_from(req.hours)
        .ok()
        .filter(|h| *h >= 1)
        .ok_or_else(|| AppError::Validation("시간은 1 이상의 정수여야 합니다.".to_string()))?;
    let date = req
        .date
        .normalize()
        .ok_or_else(|| AppError::Validation("날짜 형식이 올바르지 않습니다.".to_string()))?;
    let notes = req.notes.trim().to_string();

    db.transaction(|tx| {
        Box::pin(async move {
            // 가격 스냅샷. 이후 게시글 가격이 바뀌어도 예약에는 영향이 없다
            let post = sqlx::query(GET_POST_FOR_BOOKING)
                .bind(post_id)
                .fetch_optional(&mut **tx)
                .await?
                .ok_or(AppError::NotFound("게시글"))?;

            let owner_id: i64 = post.get("user_id");
            let price_per_hour: i64 = post.get("price");
            let post_status: String = post.get("status");

            if post_status != listing::model::status::ACTIVE {
                return Err(AppError::NotFound("게시글"));
            }
            if owner_id == renter_id {
                return Err(AppError::SelfBooking);
            }

            let total_price = price_per_hour
                .checked_mul(i64::from(hours))
                .ok_or_else(|| {
                    AppError::Validation("총액이 허용 범위를 벗어납니다.".to_string())
                })?;

            let inserted = sqlx::query_scalar::<_, i64>(INSERT_BOOKING)
                .bind(post_id)
                .bind(owner_id)
                .bind(renter_id)
                .bind(date)
                .bind(hours)
                .bind(price_per_hour)
                .bind(total_price)
                .bind(&notes)
                .fetch_one(&mut **tx)
                .await;

            match inserted {
                Ok(id) => {
                    info!("{:<12} --> 예약 생성 완료: id={}", "Command", id);
                    Ok(id)
                }
                // 같은 날짜로 경합한 다른 예약이 먼저 들어간 경우
                Err(e) if unique_violation(&e) == Some("bookings_active_slot") => {
                    Err(AppError::SlotTaken)
                }
                Err(e) => Err(AppError::from(e)),
            }
        })
    })
    .await
}

// endregion: --- 1. 예약 생성

// region:    --- 2. 확인

/// 당사자 한쪽의 확인. 플래그 설정은 멱등이다.
/// 양측 확인이 모이면 같은 트랜잭션 안에서 정산까지 수행한다.
/// both_confirmed_at IS NULL 가드 덕분에 동시 confirm 두 건이
/// 들어와도 정산은 최대 한 번만 일어난다.
pub async fn confirm_booking(
    db: &DatabaseManager,
    fee: FeePolicy,
    booking_id: i64,
    actor_id: i64,
) -> Result<Booking, AppError> {
    info!(
        "{:<12} --> 예약 확인 요청: id={}, actor={}",
        "Command", booking_id, actor_id
    );

    db.transaction(|tx| {
        Box::pin(async move {
            let bk = fetch_booking(tx, booking_id).await?;
            if !bk.is_party(actor_id) {
                return Err(AppError::Forbidden);
            }
            if bk.is_terminal() {
                return Err(AppError::InvalidState);
            }

            let sql = if actor_id == bk.owner_id {
                CONFIRM_AS_OWNER
            } else {
                CONFIRM_AS_RENTER
            };

            let updated = sqlx::query_as::<_, Booking>(sql)
                .bind(booking_id)
                .fetch_optional(&mut **tx)
                .await?
                // 조회와 갱신 사이에 다른 요청이 종결시킨 경우
                .ok_or(AppError::InvalidState)?;

            if updated.owner_confirmed
                && updated.renter_confirmed
                && updated.both_confirmed_at.is_none()
            {
                if let Some(settled) =
                    settlement::settle_both_confirmed(tx, &updated, &fee).await?
                {
                    return Ok(settled);
                }
            }

            Ok(updated)
        })
    })
    .await
}

// endregion: --- 2. 확인

// region:    --- 3. 취소

/// 당사자의 취소. 종결 상태면 AlreadyFinal.
/// 정산 전 취소이므로 지급은 발생하지 않는다.
pub async fn cancel_booking(
    db: &DatabaseManager,
    booking_id: i64,
    actor_id: i64,
) -> Result<(), AppError> {
    info!(
        "{:<12} --> 예약 취소 요청: id={}, actor={}",
        "Command", booking_id, actor_id
    );

    db.transaction(|tx| {
        Box::pin(async move {
            let bk = fetch_booking(tx, booking_id).await?;
            if !bk.is_party(actor_id) {
                return Err(AppError::Forbidden);
            }
            if bk.is_terminal() {
                return Err(AppError::AlreadyFinal);
            }

            let cancelled = sqlx::query(CANCEL_BOOKING)
                .bind(booking_id)
                .execute(&mut **tx)
                .await?;

            // 조회와 갱신 사이에 다른 요청이 종결시킨 경우
            if cancelled.rows_affected() == 0 {
                return Err(AppError::AlreadyFinal);
            }

            info!("{:<12} --> 예약 취소 완료: id={}", "Command", booking_id);
            Ok(())
        })
    })
    .await
}

// endregion: --- 3. 취소

// region:    --- 4. 완료 (오너 단독 경로)

/// 오너가 단독으로 예약을 완료 처리한다. confirmed 상태에서만 허용.
/// 정산 가드는 양측 확인 경로와 공유하므로 어느 경로로 와도
/// 지급은 정확히 한 번이다.
pub async fn complete_booking(
    db: &DatabaseManager,
    fee: FeePolicy,
    booking_id: i64,
    actor_id: i64,
) -> Result<Booking, AppError> {
    info!(
        "{:<12} --> 예약 완료 요청: id={}, actor={}",
        "Command", booking_id, actor_id
    );

    db.transaction(|tx| {
        Box::pin(async move {
            let bk = fetch_booking(tx, booking_id).await?;
            if bk.owner_id != actor_id {
                return Err(AppError::Forbidden);
            }
            if bk.status != status::CONFIRMED {
                return Err(AppError::InvalidState);
            }

            settlement::settle_confirmed(tx, &bk, &fee)
                .await?
                // 경합한 다른 요청이 먼저 정산/종결시킨 경우
                .ok_or(AppError::InvalidState)
        })
    })
    .await
}

// endregion: --- 4. 완료 (오너 단독 경로)

// region:    --- 공용 조회

async fn fetch_booking(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    booking_id: i64,
) -> Result<Booking, AppError> {
    sqlx::query_as::<_, Booking>(GET_BOOKING)
        .bind(booking_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(AppError::NotFound("예약"))
}

// endregion: --- 공용 조회

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_deserializes_lowercase() {
        let req: BookingActionRequest =
            serde_json::from_str(r#"{"action": "confirm"}"#).unwrap();
        assert_eq!(req.action, BookingAction::Confirm);
        let req: BookingActionRequest =
            serde_json::from_str(r#"{"action": "cancel"}"#).unwrap();
        assert_eq!(req.action, BookingAction::Cancel);
        assert!(serde_json::from_str::<BookingActionRequest>(r#"{"action": "pay"}"#).is_err());
    }

    #[test]
    fn test_create_request_accepts_post_alias() {
        // 구버전 프론트는 postId 대신 post 로 보낸다
        let req: CreateBookingRequest =
            serde_json::from_str(r#"{"post": 7, "date": "2025-09-15", "hours": 3}"#).unwrap();
        assert_eq!(req.post_id, 7);
        assert_eq!(req.hours, 3);
        assert_eq!(req.notes, "");
    }

    #[test]
    fn test_client_supplied_total_price_is_ignored() {
        // totalPrice 를 보내더라도 역직렬화 대상이 아니므로 버려진다
        let req: CreateBookingRequest = serde_json::from_str(
            r#"{"post_id": 7, "date": "2025-09-15", "hours": 3, "totalPrice": 1}"#,
        )
        .unwrap();
        assert_eq!(req.post_id, 7);
    }
}
