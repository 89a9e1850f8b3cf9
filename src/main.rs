// region:    --- Imports
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use companion_service::auth::PostgresIdentity;
use companion_service::config::Config;
use companion_service::database::DatabaseManager;
use companion_service::handlers::{self, AppState};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
// endregion: --- Imports

// region:    --- Main
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // logging 초기화
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .without_time()
        .with_target(false)
        .init();

    // 환경 변수에서 설정 로드
    let config = Config::from_env()?;

    // DatabaseManager 생성
    let db_manager = Arc::new(DatabaseManager::new(&config.database_url).await?);

    // 데이터베이스 초기화 (DB_RECREATE=1 이면 드랍 후 재생성)
    let init = if config.recreate_db {
        db_manager.recreate_database().await
    } else {
        db_manager.initialize_database().await
    };
    if let Err(e) = init {
        error!("{:<12} --> 데이터베이스 초기화 실패: {:?}", "Main", e);
        return Err(e.into());
    }
    info!("{:<12} --> 데이터베이스 초기화 성공", "Main");

    // 세션 기반 인증 제공자
    let identity = Arc::new(PostgresIdentity::new(db_manager.get_pool()));

    let state = AppState {
        db: Arc::clone(&db_manager),
        identity,
        fee: config.fee,
    };

    // 테스트 페이지를 위한 cors 설정
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // 라우터 설정
    let routes_all = Router::new()
        .route("/auth/register", post(handlers::handle_register))
        .route("/auth/login", post(handlers::handle_login))
        .route("/auth/logout", post(handlers::handle_logout))
        .route("/auth/me", get(handlers::handle_me))
        .route(
            "/posts",
            get(handlers::handle_get_posts).post(handlers::handle_create_post),
        )
        .route(
            "/posts/:id",
            get(handlers::handle_get_post)
                .patch(handlers::handle_update_post)
                .delete(handlers::handle_delete_post),
        )
        .route(
            "/bookings",
            get(handlers::handle_list_bookings).post(handlers::handle_create_booking),
        )
        .route(
            "/bookings/:id",
            get(handlers::handle_get_booking).patch(handlers::handle_booking_action),
        )
        .route(
            "/ratings",
            get(handlers::handle_get_ratings).post(handlers::handle_submit_rating),
        )
        .layer(cors)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .with_state(state);

    // 리스너 생성
    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!(
        "{:<12} --> Web Server: Listening on {}",
        "Main",
        listener.local_addr()?
    );

    // 서버 실행
    if let Err(err) = axum::serve(listener, routes_all.into_make_service()).await {
        error!("{:<12} --> Server error: {}", "Main", err);
    }
    Ok(())
}
// endregion: --- Main
