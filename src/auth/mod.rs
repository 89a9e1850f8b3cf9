/// 인증. 불투명 세션 토큰 기반.
/// CORE 입장에서는 "세션을 검증하면 사용자 id/role 이 나오거나 null"
/// 이라는 능력(capability)일 뿐이다. IdentityProvider 트레이트가 그 경계다.
// region:    --- Imports
use crate::database::DatabaseManager;
use crate::error::{unique_violation, AppError};
use async_trait::async_trait;
use axum::http::header::COOKIE;
use axum::http::HeaderMap;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::{PgPool, Row};
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

// endregion: --- Imports

// region:    --- 모델

pub const SESSION_COOKIE: &str = "auth";
const SESSION_DAYS_DEFAULT: i64 = 1;
const SESSION_DAYS_REMEMBER: i64 = 30;
const MIN_PASSWORD_LEN: usize = 8;

/// 세션에서 복원한 사용자
#[derive(Debug, Clone, Serialize)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
    pub role: String,
}

/// 내 정보 조회용 프로필 (비밀번호 해시는 절대 포함하지 않는다)
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct UserProfile {
    pub id: i64,
    pub name: String,
    pub surname: String,
    pub username: String,
    pub email: String,
    pub role: String,
    pub balance: i64,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub surname: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub identifier: String,
    pub password: String,
    #[serde(default)]
    pub remember: bool,
}

/// 발급된 세션
#[derive(Debug, Clone)]
pub struct Session {
    pub token: Uuid,
    pub expires_at: DateTime<Utc>,
    pub remember: bool,
}

// endregion: --- 모델

// region:    --- 쿼리

const INSERT_USER: &str = r#"
    INSERT INTO users (name, surname, username, email, password_hash)
    VALUES ($1, $2, $3, $4, $5)
    RETURNING id
"#;

const GET_USER_BY_EMAIL: &str = r#"
    SELECT id, username, role, password_hash
    FROM users
    WHERE lower(email) = $1
"#;

const GET_USER_BY_USERNAME: &str = r#"
    SELECT id, username, role, password_hash
    FROM users
    WHERE username = $1
"#;

const INSERT_SESSION: &str =
    "INSERT INTO sessions (token, user_id, expires_at) VALUES ($1, $2, $3)";

const DELETE_SESSION: &str = "DELETE FROM sessions WHERE token = $1";

const GET_SESSION_USER: &str = r#"
    SELECT u.id, u.username, u.role
    FROM sessions s
    JOIN users u ON u.id = s.user_id
    WHERE s.token = $1 AND s.expires_at > now()
"#;

// endregion: --- 쿼리

// region:    --- 비밀번호

fn hex(bytes: &[u8]) -> String {
    bytes.iter().fold(
        String::with_capacity(bytes.len() * 2),
        |mut out, b| {
            let _ = write!(out, "{:02x}", b);
            out
        },
    )
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hex(&hasher.finalize())
}

/// "salt$hexdigest" 형태로 저장한다
pub fn hash_password(password: &str) -> String {
    let salt = Uuid::new_v4().simple().to_string();
    format!("{}${}", salt, digest(&salt, password))
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    match stored.split_once('$') {
        Some((salt, expected)) => digest(salt, password) == expected,
        None => false,
    }
}

// endregion: --- 비밀번호

// region:    --- 세션 쿠키

/// Cookie 헤더에서 세션 토큰을 꺼낸다
pub fn session_token_from_headers(headers: &HeaderMap) -> Option<Uuid> {
    let raw = headers.get(COOKIE)?.to_str().ok()?;
    raw.split(';')
        .filter_map(|part| part.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
}

/// Set-Cookie 값 생성. remember 가 아니면 브라우저 세션 쿠키로 남긴다.
pub fn session_cookie(session: &Session) -> String {
    if session.remember {
        format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            SESSION_COOKIE,
            session.token,
            SESSION_DAYS_REMEMBER * 24 * 60 * 60
        )
    } else {
        format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax",
            SESSION_COOKIE, session.token
        )
    }
}

pub fn clear_session_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}

// endregion: --- 세션 쿠키

// region:    --- IdentityProvider

/// 세션 검증 능력. 나머지 모듈은 이 트레이트만 본다.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// 유효한 세션이면 사용자, 아니면 None
    async fn current_user(&self, headers: &HeaderMap) -> Result<Option<AuthUser>, AppError>;
}

pub struct PostgresIdentity {
    pool: Arc<PgPool>,
}

impl PostgresIdentity {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityProvider for PostgresIdentity {
    async fn current_user(&self, headers: &HeaderMap) -> Result<Option<AuthUser>, AppError> {
        let Some(token) = session_token_from_headers(headers) else {
            return Ok(None);
        };
        let row = sqlx::query(GET_SESSION_USER)
            .bind(token)
            .fetch_optional(&*self.pool)
            .await?;
        Ok(row.map(|r| AuthUser {
            id: r.get("id"),
            username: r.get("username"),
            role: r.get("role"),
        }))
    }
}

// endregion: --- IdentityProvider

// region:    --- 커맨드

/// 회원 가입. username/email 중복이면 DuplicateUser.
pub async fn register(db: &DatabaseManager, req: RegisterRequest) -> Result<i64, AppError> {
    info!("{:<12} --> 회원 가입 요청: {}", "Auth", req.username);

    let name = req.name.trim().to_string();
    let surname = req.surname.trim().to_string();
    let username = req.username.trim().to_string();
    let email = req.email.trim().to_lowercase();
    if name.is_empty() || surname.is_empty() || username.is_empty() {
        return Err(AppError::Validation(
            "name, surname, username 은 비울 수 없습니다.".to_string(),
        ));
    }
    if !email.contains('@') {
        return Err(AppError::Validation(
            "email 형식이 올바르지 않습니다.".to_string(),
        ));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "비밀번호는 {}자 이상이어야 합니다.",
            MIN_PASSWORD_LEN
        )));
    }
    let password_hash = hash_password(&req.password);

    db.transaction(|tx| {
        Box::pin(async move {
            let inserted = sqlx::query_scalar::<_, i64>(INSERT_USER)
                .bind(&name)
                .bind(&surname)
                .bind(&username)
                .bind(&email)
                .bind(&password_hash)
                .fetch_one(&mut **tx)
                .await;

            match inserted {
                Ok(id) => {
                    info!("{:<12} --> 회원 가입 완료: id={}", "Auth", id);
                    Ok(id)
                }
                Err(e) if unique_violation(&e).is_some() => Err(AppError::DuplicateUser),
                Err(e) => Err(AppError::from(e)),
            }
        })
    })
    .await
}

/// 로그인. email 또는 username 으로 찾고, 실패 사유는 구분하지 않는다.
pub async fn login(
    db: &DatabaseManager,
    req: LoginRequest,
) -> Result<(AuthUser, Session), AppError> {
    let identifier = req.identifier.trim().to_string();
    let identifier_lower = identifier.to_lowercase();
    info!("{:<12} --> 로그인 요청: {}", "Auth", identifier);

    let remember = req.remember;
    let password = req.password;

    db.transaction(|tx| {
        Box::pin(async move {
            // email 을 먼저 찾고, 없을 때만 username 으로 찾는다.
            // 한 쿼리의 OR 매칭은 어떤 사용자의 username 이 다른 사용자의
            // email 과 같을 때 결과가 비결정적이 된다.
            let by_email = sqlx::query(GET_USER_BY_EMAIL)
                .bind(&identifier_lower)
                .fetch_optional(&mut **tx)
                .await?;
            let row = match by_email {
                Some(row) => row,
                None => sqlx::query(GET_USER_BY_USERNAME)
                    .bind(&identifier)
                    .fetch_optional(&mut **tx)
                    .await?
                    .ok_or(AppError::InvalidCredentials)?,
            };

            let stored: String = row.get("password_hash");
            if !verify_password(&password, &stored) {
                return Err(AppError::InvalidCredentials);
            }

            let user = AuthUser {
                id: row.get("id"),
                username: row.get("username"),
                role: row.get("role"),
            };

            let days = if remember {
                SESSION_DAYS_REMEMBER
            } else {
                SESSION_DAYS_DEFAULT
            };
            let session = Session {
                token: Uuid::new_v4(),
                expires_at: Utc::now() + Duration::days(days),
                remember,
            };
            sqlx::query(INSERT_SESSION)
                .bind(session.token)
                .bind(user.id)
                .bind(session.expires_at)
                .execute(&mut **tx)
                .await?;

            info!("{:<12} --> 로그인 성공: user={}", "Auth", user.id);
            Ok((user, session))
        })
    })
    .await
}

/// 로그아웃. 세션 토큰 폐기. 토큰이 없어도 성공으로 처리한다.
pub async fn logout(db: &DatabaseManager, headers: &HeaderMap) -> Result<(), AppError> {
    let Some(token) = session_token_from_headers(headers) else {
        return Ok(());
    };
    db.transaction(|tx| {
        Box::pin(async move {
            sqlx::query(DELETE_SESSION)
                .bind(token)
                .execute(&mut **tx)
                .await?;
            Ok(())
        })
    })
    .await
}

// endregion: --- 커맨드

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_password_roundtrip() {
        let stored = hash_password("correct horse battery");
        assert!(verify_password("correct horse battery", &stored));
        assert!(!verify_password("wrong password", &stored));
    }

    #[test]
    fn test_password_hashes_are_salted() {
        let a = hash_password("same password");
        let b = hash_password("same password");
        assert_ne!(a, b);
        assert!(verify_password("same password", &a));
        assert!(verify_password("same password", &b));
    }

    #[test]
    fn test_verify_rejects_malformed_stored_value() {
        assert!(!verify_password("pw", "no-dollar-sign"));
        assert!(!verify_password("pw", ""));
    }

    #[test]
    fn test_session_token_from_cookie_header() {
        let token = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("theme=dark; auth={}; lang=ko", token)).unwrap(),
        );
        assert_eq!(session_token_from_headers(&headers), Some(token));
    }

    #[test]
    fn test_session_token_missing_or_invalid() {
        let headers = HeaderMap::new();
        assert_eq!(session_token_from_headers(&headers), None);

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("auth=not-a-uuid"));
        assert_eq!(session_token_from_headers(&headers), None);
    }

    #[test]
    fn test_session_cookie_shapes() {
        let session = Session {
            token: Uuid::nil(),
            expires_at: Utc::now(),
            remember: false,
        };
        let cookie = session_cookie(&session);
        assert!(cookie.starts_with("auth="));
        assert!(!cookie.contains("Max-Age"));

        let session = Session {
            remember: true,
            ..session
        };
        assert!(session_cookie(&session).contains("Max-Age=2592000"));
        assert!(clear_session_cookie().contains("Max-Age=0"));
    }
}
