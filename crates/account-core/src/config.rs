//! 설정 관리.
//!
//! 이 모듈은 애플리케이션 설정을 정의하고 관리합니다.
//!
//! 로드 순서 (뒤가 우선):
//! 1. 내장 기본값
//! 2. `config/default.toml` (선택)
//! 3. `ACCOUNT__` 접두사 환경 변수 (예: `ACCOUNT__AUTH__JWT_SECRET`)

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use std::net::SocketAddr;
use std::path::Path;

use crate::error::{CoreError, CoreResult};

/// 애플리케이션 설정.
#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// 서버 설정
    #[serde(default)]
    pub server: ServerConfig,
    /// 데이터베이스 설정
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Redis 설정
    #[serde(default)]
    pub redis: RedisConfig,
    /// 인증 설정
    #[serde(default)]
    pub auth: AuthConfig,
    /// 로깅 설정
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 서버 설정.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 바인딩할 호스트
    pub host: String,
    /// HTTP API 포트
    pub http_port: u16,
    /// gRPC 포트
    pub grpc_port: u16,
    /// 요청 타임아웃 (초)
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            http_port: 8080,
            grpc_port: 50051,
            request_timeout_secs: 30,
        }
    }
}

impl ServerConfig {
    /// HTTP 소켓 주소.
    ///
    /// # Errors
    /// `host:port` 형식이 유효하지 않으면 `AddrParseError`를 반환합니다.
    pub fn http_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.http_port).parse()
    }

    /// gRPC 소켓 주소.
    pub fn grpc_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.grpc_port).parse()
    }
}

/// 데이터베이스 설정.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL URL. 없으면 메모리 저장소로 동작합니다.
    pub url: Option<String>,
    /// 최대 연결 수
    pub max_connections: u32,
    /// 연결 타임아웃 (초)
    pub connect_timeout_secs: u64,
    /// 시작 시 마이그레이션 실행 여부
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
            connect_timeout_secs: 10,
            run_migrations: true,
        }
    }
}

/// Redis 설정 (토큰 폐기 목록).
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    /// Redis URL. 없으면 메모리 폐기 목록으로 동작합니다.
    pub url: Option<String>,
    /// 폐기 키 접두사
    pub key_prefix: String,
    /// 개별 명령 타임아웃 (밀리초)
    pub op_timeout_ms: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: None,
            key_prefix: "jwt:blacklist:".to_string(),
            op_timeout_ms: 2000,
        }
    }
}

/// 허용되는 최대 토큰 수명 (시간).
pub const MAX_TOKEN_LIFETIME_HOURS: i64 = 24 * 365;

/// 인증 설정.
#[derive(Debug, Deserialize)]
pub struct AuthConfig {
    /// 토큰 서명 비밀 키 (필수, 시작 후 변경 불가)
    #[serde(deserialize_with = "deserialize_secret", default = "empty_secret")]
    pub jwt_secret: SecretString,
    /// 토큰 수명 (시간)
    pub token_lifetime_hours: i64,
    /// 발급자 (`iss`)
    pub issuer: String,
    /// 대상 (`aud`)
    pub audience: String,
    /// 회원가입 시 요구되는 코드 (설정된 경우에만 검사)
    pub registration_code: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: empty_secret(),
            token_lifetime_hours: 24,
            issuer: "account-service".to_string(),
            audience: "account-clients".to_string(),
            registration_code: None,
        }
    }
}

impl AuthConfig {
    /// 주어진 비밀 키로 기본 설정을 생성합니다.
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: SecretString::new(secret.into().into_boxed_str()),
            ..Default::default()
        }
    }
}

fn empty_secret() -> SecretString {
    SecretString::new(String::new().into_boxed_str())
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(SecretString::new(raw.into_boxed_str()))
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// 로그 레벨
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// 파일과 환경 변수에서 설정을 로드하고 검증합니다.
    pub fn load<P: AsRef<Path>>(path: P) -> CoreResult<Self> {
        let builder = config::Config::builder()
            // 기본값으로 시작
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.http_port", 8080)?
            .set_default("server.grpc_port", 50051)?
            .set_default("server.request_timeout_secs", 30)?
            .set_default("database.max_connections", 10)?
            .set_default("database.connect_timeout_secs", 10)?
            .set_default("database.run_migrations", true)?
            .set_default("redis.key_prefix", "jwt:blacklist:")?
            .set_default("redis.op_timeout_ms", 2000)?
            .set_default("auth.token_lifetime_hours", 24)?
            .set_default("auth.issuer", "account-service")?
            .set_default("auth.audience", "account-clients")?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            // 파일에서 로드 (없어도 됨)
            .add_source(config::File::from(path.as_ref()).required(false))
            // 환경 변수로 오버라이드
            .add_source(
                config::Environment::with_prefix("ACCOUNT")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// `.env`를 읽은 뒤 기본 경로에서 설정을 로드합니다.
    pub fn load_default() -> CoreResult<Self> {
        let _ = dotenvy::dotenv();
        Self::load("config/default.toml")
    }

    /// 시작 전 필수 값을 검증합니다.
    ///
    /// 서명 비밀 키가 비어 있으면 프로세스는 시작하지 않아야 합니다.
    pub fn validate(&self) -> CoreResult<()> {
        if self.auth.jwt_secret.expose_secret().trim().is_empty() {
            return Err(CoreError::Config(
                "auth.jwt_secret (ACCOUNT__AUTH__JWT_SECRET) must be set".to_string(),
            ));
        }
        if self.auth.token_lifetime_hours <= 0 {
            return Err(CoreError::Config(
                "auth.token_lifetime_hours must be positive".to_string(),
            ));
        }
        if self.auth.token_lifetime_hours > MAX_TOKEN_LIFETIME_HOURS {
            return Err(CoreError::Config(format!(
                "auth.token_lifetime_hours must not exceed {}",
                MAX_TOKEN_LIFETIME_HOURS
            )));
        }
        if self.redis.op_timeout_ms == 0 {
            return Err(CoreError::Config(
                "redis.op_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(auth: AuthConfig) -> AppConfig {
        AppConfig {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            redis: RedisConfig::default(),
            auth,
            logging: LoggingConfig::default(),
        }
    }

    #[test]
    fn test_missing_secret_is_rejected() {
        let config = config_with(AuthConfig::default());
        assert!(matches!(config.validate(), Err(CoreError::Config(_))));

        let config = config_with(AuthConfig::with_secret("   "));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_valid_secret_passes() {
        let config = config_with(AuthConfig::with_secret("a-very-long-signing-secret"));
        assert!(config.validate().is_ok());
        assert_eq!(config.auth.token_lifetime_hours, 24);
    }

    #[test]
    fn test_non_positive_lifetime_is_rejected() {
        let mut auth = AuthConfig::with_secret("secret");
        auth.token_lifetime_hours = 0;
        assert!(config_with(auth).validate().is_err());
    }

    #[test]
    fn test_oversized_lifetime_is_rejected() {
        let mut auth = AuthConfig::with_secret("secret");
        auth.token_lifetime_hours = MAX_TOKEN_LIFETIME_HOURS + 1;
        assert!(matches!(
            config_with(auth).validate(),
            Err(CoreError::Config(_))
        ));

        let mut auth = AuthConfig::with_secret("secret");
        auth.token_lifetime_hours = MAX_TOKEN_LIFETIME_HOURS;
        assert!(config_with(auth).validate().is_ok());
    }

    #[test]
    fn test_secret_is_redacted_in_debug() {
        let auth = AuthConfig::with_secret("super-secret-value");
        let debug = format!("{:?}", auth);
        assert!(!debug.contains("super-secret-value"));
    }

    #[test]
    fn test_socket_addrs() {
        let server = ServerConfig::default();
        assert_eq!(server.http_addr().unwrap().port(), 8080);
        assert_eq!(server.grpc_addr().unwrap().port(), 50051);
    }
}
