/// 게시글 관련 커맨드 처리
/// 1. 게시글 생성
/// 2. 게시글 수정 (오너 전용)
/// 3. 게시글 삭제 (오너 전용)
// region:    --- Imports
use crate::database::DatabaseManager;
use crate::date::CalendarDateInput;
use crate::error::{is_foreign_key_violation, AppError};
use crate::listing::model::status;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;

// endregion: --- Imports

// region:    --- Commands

/// 게시글 생성 명령
#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    pub content: String,
    pub img: String,
    pub price: i64,
    #[serde(default)]
    pub zones: Vec<String>,
    #[serde(default)]
    pub activities: Vec<String>,
    #[serde(default)]
    pub availability: Vec<CalendarDateInput>,
}

/// 게시글 수정 명령. 들어온 필드만 바꾼다
#[derive(Debug, Deserialize)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub img: Option<String>,
    pub price: Option<i64>,
    pub zones: Option<Vec<String>>,
    pub activities: Option<Vec<String>>,
    pub availability: Option<Vec<CalendarDateInput>>,
    pub status: Option<String>,
}

// endregion: --- Commands

// region:    --- 쿼리

const INSERT_POST: &str = r#"
    INSERT INTO posts (user_id, title, content, img, price, zones, activities, availability)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
    RETURNING id
"#;

const UPDATE_POST: &str = r#"
    UPDATE posts
    SET title        = COALESCE($3, title),
        content      = COALESCE($4, content),
        img          = COALESCE($5, img),
        price        = COALESCE($6, price),
        zones        = COALESCE($7, zones),
        activities   = COALESCE($8, activities),
        availability = COALESCE($9, availability),
        status       = COALESCE($10, status)
    WHERE id = $1 AND user_id = $2
    RETURNING id
"#;

const DELETE_POST: &str = "DELETE FROM posts WHERE id = $1 AND user_id = $2";

const POST_OWNER: &str = "SELECT user_id FROM posts WHERE id = $1";

// endregion: --- 쿼리

// region:    --- 가용일 정규화

/// 입력 날짜들을 내부 표현으로 바꾸고 중복을 제거한 뒤 정렬한다.
/// 하나라도 정규화에 실패하면 전체를 거부한다.
pub fn normalize_availability(input: &[CalendarDateInput]) -> Result<Vec<NaiveDate>, AppError> {
    let mut dates = Vec::with_capacity(input.len());
    for raw in input {
        let date = raw
            .normalize()
            .ok_or_else(|| AppError::Validation("가용일 형식이 올바르지 않습니다.".to_string()))?;
        dates.push(date);
    }
    dates.sort_unstable();
    dates.dedup();
    Ok(dates)
}

// endregion: --- 가용일 정규화

// region:    --- 1. 게시글 생성

pub async fn create_post(
    db: &DatabaseManager,
    user_id: i64,
    req: CreatePostRequest,
) -> Result<i64, AppError> {
    info!("{:<12} --> 게시글 생성 요청: user={}", "Command", user_id);

    let title = req.title.trim().to_string();
    let content = req.content.trim().to_string();
    let img = req.img.trim().to_string();
    if title.is_empty() || content.is_empty() || img.is_empty() {
        return Err(AppError::Validation(
            "title, content, img 는 비울 수 없습니다.".to_string(),
        ));
    }
    if req.price < 0 {
        return Err(AppError::Validation(
            "가격은 0 이상이어야 합니다.".to_string(),
        ));
    }
    let zones = trim_tags(req.zones);
    let activities = trim_tags(req.activities);
    let availability = normalize_availability(&req.availability)?;
    let price = req.price;

    db.transaction(|tx| {
        Box::pin(async move {
            let id = sqlx::query_scalar::<_, i64>(INSERT_POST)
                .bind(user_id)
                .bind(&title)
                .bind(&content)
                .bind(&img)
                .bind(price)
                .bind(&zones)
                .bind(&activities)
                .bind(&availability)
                .fetch_one(&mut **tx)
                .await?;
            info!("{:<12} --> 게시글 생성 완료: id={}", "Command", id);
            Ok(id)
        })
    })
    .await
}

// endregion: --- 1. 게시글 생성

// region:    --- 2. 게시글 수정

pub async fn update_post(
    db: &DatabaseManager,
    user_id: i64,
    post_id: i64,
    req: UpdatePostRequest,
) -> Result<(), AppError> {
    info!(
        "{:<12} --> 게시글 수정 요청: id={}, user={}",
        "Command", post_id, user_id
    );

    if let Some(price) = req.price {
        if price < 0 {
            return Err(AppError::Validation(
                "가격은 0 이상이어야 합니다.".to_string(),
            ));
        }
    }
    if let Some(s) = req.status.as_deref() {
        if s != status::ACTIVE && s != status::PAUSED {
            return Err(AppError::Validation(
                "status 는 active 또는 paused 만 가능합니다.".to_string(),
            ));
        }
    }
    let availability = match &req.availability {
        Some(raw) => Some(normalize_availability(raw)?),
        None => None,
    };

    db.transaction(|tx| {
        Box::pin(async move {
            let updated = sqlx::query_scalar::<_, i64>(UPDATE_POST)
                .bind(post_id)
                .bind(user_id)
                .bind(req.title)
                .bind(req.content)
                .bind(req.img)
                .bind(req.price)
                .bind(req.zones)
                .bind(req.activities)
                .bind(availability)
                .bind(req.status)
                .fetch_optional(&mut **tx)
                .await?;

            if updated.is_some() {
                return Ok(());
            }
            ensure_owner_or_error(tx, post_id).await
        })
    })
    .await
}

// endregion: --- 2. 게시글 수정

// region:    --- 3. 게시글 삭제

pub async fn delete_post(
    db: &DatabaseManager,
    user_id: i64,
    post_id: i64,
) -> Result<(), AppError> {
    info!(
        "{:<12} --> 게시글 삭제 요청: id={}, user={}",
        "Command", post_id, user_id
    );

    db.transaction(|tx| {
        Box::pin(async move {
            let deleted = sqlx::query(DELETE_POST)
                .bind(post_id)
                .bind(user_id)
                .execute(&mut **tx)
                .await;

            match deleted {
                Ok(res) if res.rows_affected() > 0 => Ok(()),
                Ok(_) => ensure_owner_or_error(tx, post_id).await,
                // 예약 이력이 걸려 있는 게시글은 지울 수 없다
                Err(e) if is_foreign_key_violation(&e) => Err(AppError::Validation(
                    "예약 이력이 있는 게시글은 삭제할 수 없습니다. 대신 paused 로 바꿔 주세요."
                        .to_string(),
                )),
                Err(e) => Err(AppError::from(e)),
            }
        })
    })
    .await
}

// endregion: --- 3. 게시글 삭제

// region:    --- 공용

/// 갱신/삭제가 0건일 때 NotFound 와 Forbidden 을 구분한다
async fn ensure_owner_or_error(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    post_id: i64,
) -> Result<(), AppError> {
    let exists = sqlx::query_scalar::<_, i64>(POST_OWNER)
        .bind(post_id)
        .fetch_optional(&mut **tx)
        .await?;
    match exists {
        Some(_) => Err(AppError::Forbidden),
        None => Err(AppError::NotFound("게시글")),
    }
}

fn trim_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

// endregion: --- 공용

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_availability_dedup_and_sort() {
        let input = vec![
            CalendarDateInput::Text("2025-09-20".to_string()),
            CalendarDateInput::Text("2025-09-15".to_string()),
            CalendarDateInput::Text("2025-09-20".to_string()),
            // 불기 연도도 같은 날로 접힌다
            CalendarDateInput::Text("2568-09-15".to_string()),
        ];
        let dates = normalize_availability(&input).unwrap();
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2025, 9, 15).unwrap(),
                NaiveDate::from_ymd_opt(2025, 9, 20).unwrap(),
            ]
        );
    }

    #[test]
    fn test_availability_rejects_bad_date() {
        let input = vec![
            CalendarDateInput::Text("2025-09-15".to_string()),
            CalendarDateInput::Text("2025-02-30".to_string()),
        ];
        assert!(matches!(
            normalize_availability(&input),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_trim_tags_drops_empty() {
        let tags = trim_tags(vec![
            "  카페  ".to_string(),
            "".to_string(),
            "   ".to_string(),
            "영화".to_string(),
        ]);
        assert_eq!(tags, vec!["카페".to_string(), "영화".to_string()]);
    }
}
