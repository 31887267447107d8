//! 토큰 검증 RPC.
//!
//! HTTP 인증 게이트와 같은 [`TokenService::verify`]를 호출하며 결과만 상태 코드로 바꿉니다.

use std::sync::Arc;

use prost::Message;
use tonic::{Code, Request, Response, Status};
use tracing::{debug, error};

use super::proto::auth_service_server::AuthService;
use super::proto::{ValidateTokenRequest, ValidateTokenResponse};
use crate::auth::{TokenError, TokenService, Verification};
use crate::metrics::{record_verification, Surface};

/// 검증을 끝내지 못했을 때 호출자에게 보내는 메시지.
pub const INTERNAL_VALIDATION_MESSAGE: &str = "Internal server error during token validation";

/// 검증 결과를 (상태 코드, 응답 envelope)으로 변환합니다.
///
/// - 내부 에러: `INTERNAL` + 일반 메시지
/// - 무효: `UNAUTHENTICATED` + 사유
/// - 유효: `OK` + 신원 정보
pub fn validation_envelope(
    result: &Result<Verification, TokenError>,
) -> (Code, ValidateTokenResponse) {
    match result {
        Ok(Verification::Valid(identity)) => (
            Code::Ok,
            ValidateTokenResponse {
                is_valid: true,
                user_id: identity.user_id.to_string(),
                username: identity.username.clone(),
                role: identity.role.to_string(),
                error_message: String::new(),
            },
        ),
        Ok(Verification::Invalid(reason)) => (
            Code::Unauthenticated,
            ValidateTokenResponse {
                is_valid: false,
                error_message: reason.to_string(),
                ..Default::default()
            },
        ),
        Err(_) => (
            Code::Internal,
            ValidateTokenResponse {
                is_valid: false,
                error_message: INTERNAL_VALIDATION_MESSAGE.to_string(),
                ..Default::default()
            },
        ),
    }
}

/// `AuthService` 구현.
pub struct AuthRpc {
    tokens: Arc<TokenService>,
}

impl AuthRpc {
    pub fn new(tokens: Arc<TokenService>) -> Self {
        Self { tokens }
    }
}

#[tonic::async_trait]
impl AuthService for AuthRpc {
    async fn validate_token(
        &self,
        request: Request<ValidateTokenRequest>,
    ) -> Result<Response<ValidateTokenResponse>, Status> {
        let token = request.into_inner().token;
        let result = self.tokens.verify(&token).await;

        match &result {
            Ok(Verification::Valid(identity)) => {
                record_verification(Surface::Rpc, "valid");
                debug!(user_id = %identity.user_id, "Token validated over RPC");
            }
            Ok(Verification::Invalid(reason)) => {
                record_verification(Surface::Rpc, "invalid");
                debug!(reason = reason.code(), "Token rejected over RPC");
            }
            Err(e) => {
                record_verification(Surface::Rpc, "error");
                error!(error = %e, "RPC token validation could not be completed");
            }
        }

        let (code, response) = validation_envelope(&result);
        if code == Code::Ok {
            return Ok(Response::new(response));
        }

        // 실패 envelope은 상태의 details로 함께 전달
        let details = response.encode_to_vec();
        Err(Status::with_details(code, response.error_message, details.into()))
    }
}
