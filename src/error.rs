/// 서비스 전체에서 사용하는 오류 타입
/// 모든 오류는 요청 단위로 복구 가능하며, 프로세스를 죽이지 않는다.
// region:    --- Imports
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;

// endregion: --- Imports

// region:    --- AppError

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    /// 세션 없음 (로그인 필요)
    #[error("로그인이 필요합니다.")]
    Unauthorized,

    /// 계정/비밀번호 불일치
    #[error("계정 또는 비밀번호가 올바르지 않습니다.")]
    InvalidCredentials,

    /// 로그인은 했지만 해당 리소스의 당사자가 아님
    #[error("이 작업을 수행할 권한이 없습니다.")]
    Forbidden,

    /// 게시글/예약 등 id 가 존재하지 않음
    #[error("{0}을(를) 찾을 수 없습니다.")]
    NotFound(&'static str),

    /// 자신의 게시글을 자신이 예약
    #[error("자신의 게시글은 예약할 수 없습니다.")]
    SelfBooking,

    /// 같은 게시글 + 같은 날짜의 활성 예약이 이미 존재
    /// 동시 요청에서 정상적으로 발생하는 결과이며 버그가 아니다.
    #[error("해당 날짜는 이미 예약되어 있습니다.")]
    SlotTaken,

    /// 현재 상태에서 허용되지 않는 전이
    #[error("현재 상태에서 처리할 수 없는 요청입니다.")]
    InvalidState,

    /// 이미 종료(completed/cancelled)된 예약에 대한 취소 시도
    #[error("이미 종료된 예약입니다.")]
    AlreadyFinal,

    /// 같은 예약에 같은 리뷰어가 두 번째 후기 시도
    #[error("이미 후기를 남긴 예약입니다.")]
    DuplicateRating,

    /// username 또는 email 중복
    #[error("username 또는 email이 이미 사용 중입니다.")]
    DuplicateUser,

    /// 정산 트랜잭션 실패. 예약은 이전 상태 그대로 남아 재시도 가능
    #[error("정산 처리에 실패했습니다. 잠시 후 다시 시도해 주세요.")]
    SettlementFailed,

    /// 입력 검증 실패
    #[error("{0}")]
    Validation(String),

    /// 분류되지 않은 저장소 오류 (내부 내용은 클라이언트에 노출하지 않음)
    #[error("서버 오류가 발생했습니다.")]
    Database(#[from] sqlx::Error),
}

impl AppError {
    /// 클라이언트가 분기 처리할 수 있는 고정 코드
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::Forbidden => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::SelfBooking => "SELF_BOOKING",
            AppError::SlotTaken => "SLOT_TAKEN",
            AppError::InvalidState => "INVALID_STATE",
            AppError::AlreadyFinal => "ALREADY_FINAL",
            AppError::DuplicateRating => "DUPLICATE_RATING",
            AppError::DuplicateUser => "DUPLICATE_USER",
            AppError::SettlementFailed => "SETTLEMENT_FAILED",
            AppError::Validation(_) => "VALIDATION",
            AppError::Database(_) => "INTERNAL",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::SlotTaken | AppError::DuplicateUser => StatusCode::CONFLICT,
            AppError::SelfBooking
            | AppError::InvalidState
            | AppError::AlreadyFinal
            | AppError::DuplicateRating
            | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::SettlementFailed | AppError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // 5xx 는 내부 로그로만 원인을 남긴다
        if status.is_server_error() {
            match &self {
                AppError::Database(e) => {
                    error!("{:<12} --> 저장소 오류: {:?}", "Error", e);
                }
                other => {
                    error!("{:<12} --> 서버 오류: {}", "Error", other);
                }
            }
        }

        let body = serde_json::json!({
            "error": self.to_string(),
            "code": self.code(),
        });
        (status, Json(body)).into_response()
    }
}

// endregion: --- AppError

// region:    --- 저장소 오류 분류

/// unique 제약 위반이면 위반된 제약(또는 인덱스) 이름을 돌려준다.
/// 예약 슬롯 충돌(SlotTaken)처럼 기대되는 동시성 결과를
/// 일반 저장소 오류와 구분해서 번역할 때 사용한다.
pub fn unique_violation(err: &sqlx::Error) -> Option<&str> {
    match err {
        sqlx::Error::Database(db) if db.kind() == sqlx::error::ErrorKind::UniqueViolation => {
            db.constraint()
        }
        _ => None,
    }
}

/// 외래 키 제약 위반 여부
pub fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db) if db.kind() == sqlx::error::ErrorKind::ForeignKeyViolation
    )
}

// endregion: --- 저장소 오류 분류

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::NotFound("예약").status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::SlotTaken.status(), StatusCode::CONFLICT);
        assert_eq!(AppError::SelfBooking.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::AlreadyFinal.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::SettlementFailed.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_code_is_stable() {
        assert_eq!(AppError::SlotTaken.code(), "SLOT_TAKEN");
        assert_eq!(AppError::DuplicateRating.code(), "DUPLICATE_RATING");
        assert_eq!(AppError::Validation("x".into()).code(), "VALIDATION");
    }

    #[test]
    fn test_not_found_message() {
        assert_eq!(
            AppError::NotFound("게시글").to_string(),
            "게시글을(를) 찾을 수 없습니다."
        );
    }
}
