/// 프로세스 부트스트랩 설정
/// 환경 변수는 여기서 한 번만 읽고, 이후에는 값으로만 전달한다.
// region:    --- Imports
use crate::settlement::FeePolicy;
use thiserror::Error;

// endregion: --- Imports

// region:    --- Config

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub fee: FeePolicy,
    /// true 면 기동 시 스키마를 드랍 후 재생성 (개발/테스트 전용)
    pub recreate_db: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("환경 변수 {0} 가 설정되어 있지 않습니다")]
    MissingEnv(&'static str),
    #[error("환경 변수 {0} 값이 올바르지 않습니다: {1}")]
    InvalidValue(&'static str, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            std::env::var("DATABASE_URL").map_err(|_| ConfigError::MissingEnv("DATABASE_URL"))?;
        let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let percent_bps = parse_i64("FEE_PERCENT_BPS", 0)?;
        if !(0..=10_000).contains(&percent_bps) {
            return Err(ConfigError::InvalidValue(
                "FEE_PERCENT_BPS",
                percent_bps.to_string(),
            ));
        }
        let flat = parse_i64("FEE_FLAT", 0)?;
        if flat < 0 {
            return Err(ConfigError::InvalidValue("FEE_FLAT", flat.to_string()));
        }

        let recreate_db = matches!(
            std::env::var("DB_RECREATE").as_deref(),
            Ok("1") | Ok("true")
        );

        Ok(Config {
            database_url,
            bind_addr,
            fee: FeePolicy { percent_bps, flat },
            recreate_db,
        })
    }
}

fn parse_i64(key: &'static str, default: i64) -> Result<i64, ConfigError> {
    match std::env::var(key) {
        Err(_) => Ok(default),
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key, raw)),
    }
}

// endregion: --- Config
