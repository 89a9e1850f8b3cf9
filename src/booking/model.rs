use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// 예약 상태. pending -> confirmed -> completed,
/// cancelled 는 pending/confirmed 에서 진입. completed/cancelled 는 종결 상태.
pub mod status {
    pub const PENDING: &str = "pending";
    pub const CONFIRMED: &str = "confirmed";
    pub const COMPLETED: &str = "completed";
    pub const CANCELLED: &str = "cancelled";
}

/// 결제 상태. unpaid -> released 로 최대 한 번만 전이한다.
pub mod payment {
    pub const UNPAID: &str = "unpaid";
    pub const RELEASED: &str = "released";
}

// 예약 모델
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Booking {
    pub id: i64,
    pub post_id: i64,
    pub owner_id: i64,
    pub renter_id: i64,
    pub date: NaiveDate,
    pub hours: i32,
    pub price_per_hour: i64,
    pub total_price: i64,
    pub notes: String,
    pub status: String,
    pub renter_confirmed: bool,
    pub owner_confirmed: bool,
    pub both_confirmed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub payment_status: String,
    pub payout_amount: i64,
    pub payout_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    /// 예약의 당사자(오너 또는 예약자)인지
    pub fn is_party(&self, user_id: i64) -> bool {
        self.owner_id == user_id || self.renter_id == user_id
    }

    /// 종결 상태(completed/cancelled)면 더 이상 전이할 수 없다
    pub fn is_terminal(&self) -> bool {
        self.status == status::COMPLETED || self.status == status::CANCELLED
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn booking(status: &str) -> Booking {
        Booking {
            id: 1,
            post_id: 10,
            owner_id: 100,
            renter_id: 200,
            date: NaiveDate::from_ymd_opt(2025, 9, 15).unwrap(),
            hours: 3,
            price_per_hour: 200,
            total_price: 600,
            notes: String::new(),
            status: status.to_string(),
            renter_confirmed: false,
            owner_confirmed: false,
            both_confirmed_at: None,
            completed_at: None,
            payment_status: payment::UNPAID.to_string(),
            payout_amount: 0,
            payout_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_is_party() {
        let bk = booking(status::PENDING);
        assert!(bk.is_party(100));
        assert!(bk.is_party(200));
        assert!(!bk.is_party(300));
    }

    #[test]
    fn test_terminal_states() {
        assert!(!booking(status::PENDING).is_terminal());
        assert!(!booking(status::CONFIRMED).is_terminal());
        assert!(booking(status::COMPLETED).is_terminal());
        assert!(booking(status::CANCELLED).is_terminal());
    }
}
