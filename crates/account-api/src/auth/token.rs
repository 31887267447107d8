//! 세션 토큰 발급/검증/폐기.
//!
//! 검증은 서명과 유효 기간을 로컬에서 먼저 확인한 뒤, 토큰 식별자(`jti`)로
//! 폐기 목록을 한 번 조회합니다. 폐기 목록 조회 실패는 "유효"도 "무효"도 아닌
//! 별도의 결과(`TokenError::Store`)로 전달됩니다.

use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use secrecy::ExposeSecret;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use account_core::{AuthConfig, Identity, Role, User, MAX_TOKEN_LIFETIME_HOURS};
use account_data::{RevocationError, RevocationStore};

use crate::metrics::record_revocation;

/// `Authorization` 헤더의 Bearer 접두사 (대소문자 구분, 공백 한 칸).
pub const BEARER_PREFIX: &str = "Bearer ";

/// 서명에 사용하는 알고리즘.
const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

/// 검증 시 허용하는 HMAC 계열 알고리즘.
const ACCEPTED_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// 세션 토큰 페이로드.
///
/// 모든 필드가 필수입니다. 하나라도 없거나 형식이 맞지 않으면 토큰은 거부됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - 사용자 ID
    pub sub: Uuid,
    /// 사용자 이름
    pub username: String,
    /// 발급 시점의 사용자 역할
    pub role: Role,
    /// JWT ID - 폐기용 토큰 고유 식별자
    pub jti: String,
    /// Issuer
    pub iss: String,
    /// Audience
    pub aud: String,
    /// Issued At (Unix timestamp)
    pub iat: i64,
    /// Not Before (Unix timestamp)
    pub nbf: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// 클레임에 담긴 신원 정보.
    pub fn identity(&self) -> Identity {
        Identity::new(self.sub, self.username.clone(), self.role)
    }

    /// 만료 시각.
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// 로그아웃 시 서명 검증 없이 읽는 최소 클레임.
#[derive(Debug, Deserialize)]
struct RevocationClaims {
    #[serde(default)]
    jti: Option<String>,
    exp: i64,
}

/// 발급된 토큰.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// 직렬화된 토큰 문자열
    pub token: String,
    /// 토큰 식별자
    pub token_id: String,
    /// 만료 시각
    pub expires_at: DateTime<Utc>,
}

/// 토큰이 무효인 이유.
///
/// 메시지는 비밀 정보를 포함하지 않으므로 호출자에게 그대로 노출해도 됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RejectReason {
    /// 헤더의 알고리즘이 HMAC 계열이 아님
    #[error("Unexpected signing method")]
    UnexpectedSigningMethod,
    /// 다른 키로 서명되었거나 변조됨
    #[error("Token invalid or expired")]
    InvalidSignature,
    /// 유효 기간(`nbf`..`exp`)을 벗어남
    #[error("Token invalid or expired")]
    Expired,
    /// 구조 또는 필수 클레임이 올바르지 않음
    #[error("Invalid token")]
    Malformed,
    /// 폐기 목록에 있음
    #[error("Token has been revoked")]
    Revoked,
}

impl RejectReason {
    /// 로그/메트릭/응답용 에러 코드.
    pub fn code(&self) -> &'static str {
        match self {
            RejectReason::UnexpectedSigningMethod => "UNEXPECTED_SIGNING_METHOD",
            RejectReason::InvalidSignature => "INVALID_SIGNATURE",
            RejectReason::Expired => "TOKEN_EXPIRED",
            RejectReason::Malformed => "INVALID_TOKEN",
            RejectReason::Revoked => "TOKEN_REVOKED",
        }
    }
}

/// 검증 결과.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Valid(Identity),
    Invalid(RejectReason),
}

/// 검증을 완료할 수 없거나 토큰을 만들 수 없는 경우.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("토큰 서명 실패: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
    #[error("폐기 목록 접근 실패: {0}")]
    Store(#[from] RevocationError),
}

/// 로그아웃 실패.
#[derive(Debug, thiserror::Error)]
pub enum LogoutError {
    #[error("Invalid token format")]
    InvalidFormat,
    #[error("Invalid token")]
    Malformed,
    #[error("Token missing identifier, cannot revoke")]
    MissingTokenId,
    #[error("Token already expired")]
    Expired,
    #[error("Failed to revoke token")]
    Store(#[source] RevocationError),
}

impl LogoutError {
    pub fn code(&self) -> &'static str {
        match self {
            LogoutError::InvalidFormat => "INVALID_AUTH_HEADER",
            LogoutError::Malformed => "INVALID_TOKEN",
            LogoutError::MissingTokenId => "MISSING_TOKEN_ID",
            LogoutError::Expired => "TOKEN_EXPIRED",
            LogoutError::Store(_) => "REVOCATION_FAILED",
        }
    }
}

/// 토큰 서비스.
///
/// 서명 키는 생성 시 주입되며 이후 변경되지 않습니다.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    audience: String,
    lifetime: Duration,
    revocations: Arc<dyn RevocationStore>,
}

impl TokenService {
    pub fn new(config: &AuthConfig, revocations: Arc<dyn RevocationStore>) -> Self {
        let secret = config.jwt_secret.expose_secret().as_bytes();

        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.algorithms = ACCEPTED_ALGORITHMS.to_vec();
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_audience(&[config.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "nbf", "iat", "sub", "iss", "aud"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            // 검증되지 않은 설정으로 생성되더라도 범위 안으로 제한
            lifetime: Duration::hours(
                config
                    .token_lifetime_hours
                    .clamp(1, MAX_TOKEN_LIFETIME_HOURS),
            ),
            revocations,
        }
    }

    /// 토큰 수명.
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// 사용자 레코드로부터 새 토큰을 발급합니다.
    ///
    /// 저장소에 접근하지 않으며 매 호출마다 새 `jti`(UUID v4)를 생성합니다.
    pub fn issue(&self, user: &User) -> Result<IssuedToken, TokenError> {
        let now = Utc::now();
        let expires_at = now + self.lifetime;
        let claims = Claims {
            sub: user.id,
            username: user.username.clone(),
            role: user.role,
            jti: Uuid::new_v4().to_string(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = self.sign(&claims)?;
        debug!(user_id = %user.id, token_id = %claims.jti, "Token issued");

        let expires_at = claims.expires_at();
        Ok(IssuedToken {
            token,
            token_id: claims.jti,
            expires_at,
        })
    }

    /// 주어진 클레임을 서비스 키로 서명합니다.
    pub fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        Ok(encode(
            &Header::new(SIGNING_ALGORITHM),
            claims,
            &self.encoding_key,
        )?)
    }

    /// 서명, 유효 기간, 클레임 구조를 확인합니다. 폐기 목록은 보지 않습니다.
    pub fn decode_verified(&self, token: &str) -> Result<Claims, RejectReason> {
        check_header_algorithm(token)?;

        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature => RejectReason::InvalidSignature,
                ErrorKind::ExpiredSignature | ErrorKind::ImmatureSignature => {
                    RejectReason::Expired
                }
                ErrorKind::InvalidAlgorithm => RejectReason::UnexpectedSigningMethod,
                _ => RejectReason::Malformed,
            }
        })?;

        if data.claims.jti.is_empty() {
            return Err(RejectReason::Malformed);
        }
        Ok(data.claims)
    }

    /// 토큰을 검증합니다.
    ///
    /// 로컬 검사를 통과한 토큰만 폐기 목록을 조회합니다.
    pub async fn verify(&self, token: &str) -> Result<Verification, TokenError> {
        let claims = match self.decode_verified(token) {
            Ok(claims) => claims,
            Err(reason) => {
                debug!(reason = reason.code(), "Token rejected");
                return Ok(Verification::Invalid(reason));
            }
        };

        let revoked = self.revocations.exists(&claims.jti).await.map_err(|e| {
            error!(token_id = %claims.jti, error = %e, "Revocation lookup failed");
            TokenError::Store(e)
        })?;

        if revoked {
            debug!(token_id = %claims.jti, user_id = %claims.sub, "Revoked token presented");
            return Ok(Verification::Invalid(RejectReason::Revoked));
        }

        Ok(Verification::Valid(claims.identity()))
    }

    /// 토큰 식별자를 남은 수명 동안 폐기 목록에 기록합니다.
    ///
    /// `remaining_ttl <= 0`이면 이미 만료된 토큰이므로 아무것도 하지 않고 성공합니다.
    pub async fn revoke(&self, token_id: &str, remaining_ttl: Duration) -> Result<(), TokenError> {
        Ok(self.put_revocation(token_id, remaining_ttl).await?)
    }

    async fn put_revocation(
        &self,
        token_id: &str,
        remaining_ttl: Duration,
    ) -> Result<(), RevocationError> {
        let ttl = match remaining_ttl.to_std() {
            Ok(ttl) if !ttl.is_zero() => ttl,
            _ => {
                record_revocation("noop");
                return Ok(());
            }
        };

        match self.revocations.put(token_id, ttl).await {
            Ok(()) => {
                record_revocation("revoked");
                info!(token_id, ttl_secs = ttl.as_secs(), "Token revoked");
                Ok(())
            }
            Err(e) => {
                record_revocation("error");
                error!(token_id, error = %e, "Failed to record revocation");
                Err(e)
            }
        }
    }

    /// `Authorization` 헤더 값으로 토큰을 폐기합니다.
    ///
    /// 서명은 검증하지 않고 `jti`와 `exp`만 읽습니다.
    pub async fn logout(&self, authorization: &str) -> Result<(), LogoutError> {
        let token = authorization
            .strip_prefix(BEARER_PREFIX)
            .ok_or(LogoutError::InvalidFormat)?;

        let claims: RevocationClaims = decode_payload(token).ok_or(LogoutError::Malformed)?;
        let token_id = claims
            .jti
            .filter(|jti| !jti.is_empty())
            .ok_or(LogoutError::MissingTokenId)?;

        let remaining = match self.remaining_lifetime(claims.exp) {
            Err(LogoutError::Expired) => {
                warn!(token_id = %token_id, "Logout with expired token");
                return Err(LogoutError::Expired);
            }
            other => other?,
        };

        self.put_revocation(&token_id, remaining)
            .await
            .map_err(LogoutError::Store)
    }

    /// 서명되지 않은 `exp`로부터 폐기 항목 TTL을 계산합니다.
    ///
    /// 결과는 토큰 수명을 넘지 않습니다. 범위를 벗어난 값은 `Malformed`입니다.
    fn remaining_lifetime(&self, exp: i64) -> Result<Duration, LogoutError> {
        let remaining_secs = match exp.checked_sub(Utc::now().timestamp()) {
            Some(secs) => secs,
            None if exp < 0 => return Err(LogoutError::Expired),
            None => return Err(LogoutError::Malformed),
        };
        if remaining_secs <= 0 {
            return Err(LogoutError::Expired);
        }

        let remaining = Duration::try_seconds(remaining_secs).ok_or(LogoutError::Malformed)?;
        Ok(remaining.min(self.lifetime))
    }
}

/// 헤더의 `alg`가 HMAC 계열인지 확인합니다.
///
/// `none` 등 라이브러리가 모르는 값도 여기서 걸러집니다.
fn check_header_algorithm(token: &str) -> Result<(), RejectReason> {
    #[derive(Deserialize)]
    struct RawHeader {
        alg: String,
    }

    let header_segment = token.split('.').next().ok_or(RejectReason::Malformed)?;
    let bytes = URL_SAFE_NO_PAD
        .decode(header_segment)
        .map_err(|_| RejectReason::Malformed)?;
    let header: RawHeader = serde_json::from_slice(&bytes).map_err(|_| RejectReason::Malformed)?;

    match header.alg.as_str() {
        "HS256" | "HS384" | "HS512" => Ok(()),
        other => {
            warn!(alg = other, "Token with unexpected signing method");
            Err(RejectReason::UnexpectedSigningMethod)
        }
    }
}

/// 서명을 확인하지 않고 페이로드를 디코딩합니다.
fn decode_payload<T: DeserializeOwned>(token: &str) -> Option<T> {
    let mut segments = token.split('.');
    let (_header, payload, _signature) = (segments.next()?, segments.next()?, segments.next()?);
    if segments.next().is_some() {
        return None;
    }

    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    serde_json::from_slice(&bytes).ok()
}
