// region:    --- Imports
use crate::auth::{self, AuthUser, IdentityProvider, LoginRequest, PostgresIdentity, RegisterRequest};
use crate::booking::commands::{
    cancel_booking, complete_booking, confirm_booking, create_booking, BookingAction,
    BookingActionRequest, CreateBookingRequest,
};
use crate::database::DatabaseManager;
use crate::error::AppError;
use crate::listing::commands::{create_post, delete_post, update_post, CreatePostRequest, UpdatePostRequest};
use crate::query::handlers::{clamp_limit, RoleFilter};
use crate::query;
use crate::rating::commands::{submit_rating, SubmitRatingRequest};
use crate::settlement::FeePolicy;
use axum::extract::{Path, Query, State};
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

// endregion: --- Imports

// region:    --- AppState

/// 부트스트랩에서 만들어 모든 핸들러에 주입되는 상태
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseManager>,
    pub identity: Arc<PostgresIdentity>,
    pub fee: FeePolicy,
}

/// 세션이 없으면 Unauthorized
async fn require_user(state: &AppState, headers: &HeaderMap) -> Result<AuthUser, AppError> {
    state
        .identity
        .current_user(headers)
        .await?
        .ok_or(AppError::Unauthorized)
}

// endregion: --- AppState

// region:    --- Auth Handlers

/// 회원 가입
pub async fn handle_register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let id = auth::register(&state.db, req).await?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "message": "회원 가입이 완료되었습니다.", "id": id })),
    ))
}

/// 로그인. 성공 시 auth 쿠키 발급
pub async fn handle_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Response, AppError> {
    let (user, session) = auth::login(&state.db, req).await?;

    let mut response = Json(serde_json::json!({
        "ok": true,
        "userId": user.id,
        "username": user.username,
    }))
    .into_response();
    let cookie = HeaderValue::from_str(&auth::session_cookie(&session))
        .map_err(|_| AppError::Validation("세션 쿠키를 만들 수 없습니다.".to_string()))?;
    response.headers_mut().insert(SET_COOKIE, cookie);
    Ok(response)
}

/// 로그아웃. 세션 폐기 + 쿠키 제거
pub async fn handle_logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    auth::logout(&state.db, &headers).await?;

    let mut response = Json(serde_json::json!({ "ok": true })).into_response();
    if let Ok(cookie) = HeaderValue::from_str(&auth::clear_session_cookie()) {
        response.headers_mut().insert(SET_COOKIE, cookie);
    }
    Ok(response)
}

/// 내 정보 조회
pub async fn handle_me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&state, &headers).await?;
    let profile = query::handlers::get_profile(&state.db, user.id).await?;
    Ok(Json(profile))
}

// endregion: --- Auth Handlers

// region:    --- Post Handlers

#[derive(Debug, Deserialize)]
pub struct PostListParams {
    pub limit: Option<i64>,
}

/// 게시글 목록 조회
pub async fn handle_get_posts(
    State(state): State<AppState>,
    Query(params): Query<PostListParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = clamp_limit(params.limit, 6);
    let posts = query::handlers::get_posts(&state.db, limit).await?;
    Ok(Json(posts))
}

/// 게시글 조회
pub async fn handle_get_post(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let post = query::handlers::get_post(&state.db, post_id).await?;
    Ok(Json(post))
}

/// 게시글 생성
pub async fn handle_create_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&state, &headers).await?;
    let id = create_post(&state.db, user.id, req).await?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "message": "게시글이 등록되었습니다.", "id": id })),
    ))
}

/// 게시글 수정 (오너 전용)
pub async fn handle_update_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(post_id): Path<i64>,
    Json(req): Json<UpdatePostRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&state, &headers).await?;
    update_post(&state.db, user.id, post_id, req).await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

/// 게시글 삭제 (오너 전용)
pub async fn handle_delete_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(post_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&state, &headers).await?;
    delete_post(&state.db, user.id, post_id).await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

// endregion: --- Post Handlers

// region:    --- Booking Handlers

#[derive(Debug, Deserialize)]
pub struct BookingListParams {
    pub role: Option<String>,
    pub limit: Option<i64>,
}

/// 예약 생성
pub async fn handle_create_booking(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateBookingRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&state, &headers).await?;
    info!("{:<12} --> 예약 생성 요청: user={}", "Handler", user.id);

    let id = create_booking(&state.db, user.id, req).await?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "message": "예약이 생성되었습니다.", "id": id })),
    ))
}

/// 예약 목록 조회 (role=buyer|seller, 없으면 양쪽 병합)
pub async fn handle_list_bookings(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<BookingListParams>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&state, &headers).await?;
    let role = RoleFilter::parse(params.role.as_deref());
    let limit = clamp_limit(params.limit, 20);
    let bookings = query::handlers::list_bookings(&state.db, user.id, role, limit).await?;
    Ok(Json(bookings))
}

/// 예약 단건 조회 (당사자만)
pub async fn handle_get_booking(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(booking_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&state, &headers).await?;
    let booking = query::handlers::get_booking(&state.db, booking_id).await?;
    if !booking.is_party(user.id) {
        return Err(AppError::Forbidden);
    }
    Ok(Json(booking))
}

/// 예약 액션 처리 (confirm | cancel | complete)
pub async fn handle_booking_action(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(booking_id): Path<i64>,
    Json(req): Json<BookingActionRequest>,
) -> Result<Response, AppError> {
    let user = require_user(&state, &headers).await?;
    info!(
        "{:<12} --> 예약 액션: id={}, action={:?}, user={}",
        "Handler", booking_id, req.action, user.id
    );

    match req.action {
        BookingAction::Confirm => {
            let booking = confirm_booking(&state.db, state.fee, booking_id, user.id).await?;
            Ok(Json(booking).into_response())
        }
        BookingAction::Cancel => {
            cancel_booking(&state.db, booking_id, user.id).await?;
            Ok(Json(serde_json::json!({ "ok": true })).into_response())
        }
        BookingAction::Complete => {
            let booking = complete_booking(&state.db, state.fee, booking_id, user.id).await?;
            Ok(Json(serde_json::json!({
                "ok": true,
                "amountCredited": booking.payout_amount,
            }))
            .into_response())
        }
    }
}

// endregion: --- Booking Handlers

// region:    --- Rating Handlers

#[derive(Debug, Deserialize)]
pub struct RatingListParams {
    pub user: Option<i64>,
    pub booking: Option<i64>,
    pub limit: Option<i64>,
}

/// 후기 등록
pub async fn handle_submit_rating(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SubmitRatingRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&state, &headers).await?;
    let id = submit_rating(&state.db, user.id, req).await?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "message": "후기가 등록되었습니다.", "id": id })),
    ))
}

/// 후기 조회 (?user= 받은 사람 기준, ?booking= 예약 기준)
pub async fn handle_get_ratings(
    State(state): State<AppState>,
    Query(params): Query<RatingListParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = clamp_limit(params.limit, 20);
    let ratings = match (params.user, params.booking) {
        (_, Some(booking_id)) => {
            query::handlers::get_ratings_for_booking(&state.db, booking_id, limit).await?
        }
        (Some(user_id), None) => {
            query::handlers::get_ratings_for_user(&state.db, user_id, limit).await?
        }
        (None, None) => {
            return Err(AppError::Validation(
                "user 또는 booking 파라미터가 필요합니다.".to_string(),
            ));
        }
    };
    Ok(Json(ratings))
}

// endregion: --- Rating Handlers
