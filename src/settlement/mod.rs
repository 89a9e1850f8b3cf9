/// 정산. 예약을 completed 로 전환하면서 게시글 주인의 잔액을
/// 정확히 한 번만 올린다. 두 효과는 호출자가 연 트랜잭션 안에서
/// 하나의 단위로 커밋되거나 함께 롤백된다.
// region:    --- Imports
use crate::booking::model::Booking;
use crate::error::AppError;
use chrono::Utc;
use sqlx::{Postgres, Transaction};
use tracing::{error, info};

// endregion: --- Imports

// region:    --- FeePolicy

/// 수수료 정책. 퍼센트(basis points) + 정액. 기본값은 둘 다 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeePolicy {
    /// 1bp = 0.01%. 10000 이면 전액 수수료.
    pub percent_bps: i64,
    /// 정액 수수료
    pub flat: i64,
}

impl FeePolicy {
    pub fn fee(&self, total: i64) -> i64 {
        // i64 곱셈이 큰 total 에서 넘치지 않도록 i128 로 계산한다.
        // 결과는 [0, total] 로 잘리므로 i64 로 안전하게 돌아온다.
        let fee = i128::from(total) * i128::from(self.percent_bps) / 10_000
            + i128::from(self.flat);
        fee.clamp(0, i128::from(total)) as i64
    }

    /// 게시글 주인에게 들어가는 금액. 음수가 되지 않는다.
    pub fn credit(&self, total: i64) -> i64 {
        total - self.fee(total)
    }
}

// endregion: --- FeePolicy

// region:    --- 정산 쿼리

/// 양측 확인 경로: 두 플래그가 모두 서 있고 아직 정산된 적이 없을 때만
/// 성립한다. both_confirmed_at IS NULL 가드가 동시 confirm 두 건 중
/// 한 건만 통과시킨다.
const SETTLE_BOTH_CONFIRMED: &str = r#"
    UPDATE bookings
    SET status = 'completed',
        payment_status = 'released',
        both_confirmed_at = $2,
        completed_at = $2,
        payout_at = $2,
        payout_amount = $3
    WHERE id = $1
      AND owner_confirmed AND renter_confirmed
      AND both_confirmed_at IS NULL
      AND status = 'confirmed'
      AND payment_status = 'unpaid'
    RETURNING *
"#;

/// 오너 단독 완료 경로: confirmed 상태에서만 성립한다.
const SETTLE_CONFIRMED: &str = r#"
    UPDATE bookings
    SET status = 'completed',
        payment_status = 'released',
        completed_at = $2,
        payout_at = $2,
        payout_amount = $3
    WHERE id = $1
      AND status = 'confirmed'
      AND payment_status = 'unpaid'
    RETURNING *
"#;

const CREDIT_OWNER: &str = "UPDATE users SET balance = balance + $2 WHERE id = $1";

// endregion: --- 정산 쿼리

// region:    --- 정산 실행

/// 양측 확인이 끝난 예약 정산. 가드에 걸려 아무 행도 바뀌지 않으면
/// (이미 동시 호출이 정산함) None 을 돌려주고 잔액도 건드리지 않는다.
pub(crate) async fn settle_both_confirmed(
    tx: &mut Transaction<'_, Postgres>,
    booking: &Booking,
    fee: &FeePolicy,
) -> Result<Option<Booking>, AppError> {
    settle_with(tx, SETTLE_BOTH_CONFIRMED, booking, fee).await
}

/// 오너 단독 완료 정산 (confirmed 상태 필수)
pub(crate) async fn settle_confirmed(
    tx: &mut Transaction<'_, Postgres>,
    booking: &Booking,
    fee: &FeePolicy,
) -> Result<Option<Booking>, AppError> {
    settle_with(tx, SETTLE_CONFIRMED, booking, fee).await
}

async fn settle_with(
    tx: &mut Transaction<'_, Postgres>,
    sql: &str,
    booking: &Booking,
    fee: &FeePolicy,
) -> Result<Option<Booking>, AppError> {
    // total_price 는 생성 이후 불변이므로 트랜잭션 안에서 읽은 값 그대로 쓴다
    let credit = fee.credit(booking.total_price);
    let now = Utc::now();

    let settled = sqlx::query_as::<_, Booking>(sql)
        .bind(booking.id)
        .bind(now)
        .bind(credit)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| {
            error!(
                "{:<12} --> 예약 {} 상태 전환 실패: {:?}",
                "Settlement", booking.id, e
            );
            AppError::SettlementFailed
        })?;

    // 상태 전환이 성립하지 않았으면 잔액 증가도 실행하지 않는다
    let Some(settled) = settled else {
        return Ok(None);
    };

    let credited = sqlx::query(CREDIT_OWNER)
        .bind(settled.owner_id)
        .bind(credit)
        .execute(&mut **tx)
        .await
        .map_err(|e| {
            error!(
                "{:<12} --> 예약 {} 잔액 반영 실패: {:?}",
                "Settlement", booking.id, e
            );
            AppError::SettlementFailed
        })?;

    if credited.rows_affected() != 1 {
        // 잔액 대상 사용자가 없으면 전체를 롤백시킨다
        return Err(AppError::SettlementFailed);
    }

    info!(
        "{:<12} --> 예약 {} 정산 완료: credit={}",
        "Settlement", settled.id, credit
    );
    Ok(Some(settled))
}

// endregion: --- 정산 실행

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_fee_is_zero() {
        let policy = FeePolicy::default();
        assert_eq!(policy.fee(600), 0);
        assert_eq!(policy.credit(600), 600);
    }

    #[test]
    fn test_percent_fee() {
        // 10% = 1000bp
        let policy = FeePolicy {
            percent_bps: 1000,
            flat: 0,
        };
        assert_eq!(policy.fee(600), 60);
        assert_eq!(policy.credit(600), 540);
    }

    #[test]
    fn test_flat_fee() {
        let policy = FeePolicy {
            percent_bps: 0,
            flat: 50,
        };
        assert_eq!(policy.credit(600), 550);
    }

    #[test]
    fn test_fee_never_exceeds_total() {
        let policy = FeePolicy {
            percent_bps: 0,
            flat: 1_000,
        };
        assert_eq!(policy.fee(600), 600);
        assert_eq!(policy.credit(600), 0);
    }

    #[test]
    fn test_combined_fee_rounds_down() {
        let policy = FeePolicy {
            percent_bps: 250, // 2.5%
            flat: 10,
        };
        // 999 * 250 / 10000 = 24 (내림) + 10
        assert_eq!(policy.fee(999), 34);
        assert_eq!(policy.credit(999), 965);
    }

    #[test]
    fn test_fee_does_not_overflow_on_huge_total() {
        let policy = FeePolicy {
            percent_bps: 10_000,
            flat: 0,
        };
        assert_eq!(policy.fee(i64::MAX), i64::MAX);
        assert_eq!(policy.credit(i64::MAX), 0);

        let policy = FeePolicy {
            percent_bps: 0,
            flat: i64::MAX,
        };
        assert_eq!(policy.fee(i64::MAX), i64::MAX);
        assert_eq!(policy.credit(600), 0);
    }

    #[test]
    fn test_zero_total() {
        let policy = FeePolicy {
            percent_bps: 1000,
            flat: 100,
        };
        assert_eq!(policy.credit(0), 0);
    }
}
