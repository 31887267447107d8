//! Axum용 인증 게이트.
//!
//! 요청마다 `Authorization: Bearer <token>` 헤더를 검증하고, 성공하면
//! [`Identity`]를 요청 extensions에 부착합니다. 검증 결과는 요청 간에 캐시하지 않습니다.

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{error, warn};

use account_core::Identity;

use super::token::{LogoutError, RejectReason, TokenService, Verification, BEARER_PREFIX};
use crate::error::ApiErrorResponse;
use crate::metrics::{record_verification, Surface};

/// 인증/인가 에러.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Authorization header required")]
    MissingToken,
    #[error("Invalid authorization header format")]
    InvalidAuthHeader,
    #[error("{0}")]
    Rejected(RejectReason),
    /// 폐기 목록 장애 등으로 검증을 끝내지 못함
    #[error("Internal server error during token validation")]
    VerificationUnavailable,
    /// 인증 게이트를 거치지 않아 신원 정보가 없음
    #[error("Authentication required")]
    MissingIdentity,
    #[error("Insufficient permission")]
    Forbidden,
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::VerificationUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "MISSING_TOKEN",
            AuthError::InvalidAuthHeader => "INVALID_AUTH_HEADER",
            AuthError::Rejected(reason) => reason.code(),
            AuthError::VerificationUnavailable => "VERIFICATION_FAILED",
            AuthError::MissingIdentity => "UNAUTHENTICATED",
            AuthError::Forbidden => "INSUFFICIENT_PERMISSION",
        }
    }
}

/// 게이트가 거부한 응답에 붙는 표식. 메트릭 미들웨어가 거부 코드별로 집계합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthRejection(pub &'static str);

fn rejection_response(code: &'static str, message: String, status: StatusCode) -> Response {
    let mut response = ApiErrorResponse::new(code, message).into_response_with(status);
    response.extensions_mut().insert(AuthRejection(code));
    response
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        rejection_response(self.code(), self.to_string(), self.status())
    }
}

impl IntoResponse for LogoutError {
    fn into_response(self) -> Response {
        let status = match &self {
            LogoutError::Store(e) => {
                error!(error = %e, "Logout failed on revocation store");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::UNAUTHORIZED,
        };
        rejection_response(self.code(), self.to_string(), status)
    }
}

/// 헤더에서 Bearer 토큰을 추출합니다.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    value
        .strip_prefix(BEARER_PREFIX)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::InvalidAuthHeader)
}

/// 헤더를 검증하여 신원 정보를 반환합니다.
pub async fn authenticate(
    tokens: &TokenService,
    headers: &HeaderMap,
) -> Result<Identity, AuthError> {
    let token = bearer_token(headers)?;

    match tokens.verify(token).await {
        Ok(Verification::Valid(identity)) => {
            record_verification(Surface::Http, "valid");
            Ok(identity)
        }
        Ok(Verification::Invalid(reason)) => {
            record_verification(Surface::Http, "invalid");
            warn!(reason = reason.code(), "Request rejected by authentication gate");
            Err(AuthError::Rejected(reason))
        }
        Err(e) => {
            record_verification(Surface::Http, "error");
            error!(error = %e, "Token verification could not be completed");
            Err(AuthError::VerificationUnavailable)
        }
    }
}

/// 인증 게이트 미들웨어.
///
/// ```rust,ignore
/// Router::new()
///     .route("/profile", get(profile))
///     .layer(middleware::from_fn_with_state(tokens, require_auth));
/// ```
pub async fn require_auth(
    State(tokens): State<Arc<TokenService>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let identity = authenticate(&tokens, request.headers()).await?;
    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// 인증된 신원 추출기.
///
/// [`require_auth`]가 먼저 실행되어야 합니다.
///
/// ```rust,ignore
/// async fn profile(Authenticated(identity): Authenticated) -> impl IntoResponse {
///     format!("Hello, {}!", identity.username)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Authenticated(pub Identity);

impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(Authenticated)
            .ok_or(AuthError::MissingIdentity)
    }
}
