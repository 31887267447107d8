//! gRPC 서비스.
//!
//! - `account.v1.AuthService/ValidateToken`: 다른 내부 서비스용 토큰 검증
//! - `account.v1.AccountService/GetUser`: 사용자 단건 조회

mod account;
mod auth;

/// `proto/account.proto`에서 생성된 타입.
pub mod proto {
    tonic::include_proto!("account.v1");
}

pub use account::AccountRpc;
pub use auth::{validation_envelope, AuthRpc, INTERNAL_VALIDATION_MESSAGE};

use std::sync::Arc;

use proto::account_service_server::AccountServiceServer;
use proto::auth_service_server::AuthServiceServer;

use crate::state::AppState;

/// 토큰 검증 서비스 서버.
pub fn auth_server(state: &AppState) -> AuthServiceServer<AuthRpc> {
    AuthServiceServer::new(AuthRpc::new(Arc::clone(&state.tokens)))
}

/// 계정 조회 서비스 서버.
pub fn account_server(state: &AppState) -> AccountServiceServer<AccountRpc> {
    AccountServiceServer::new(AccountRpc::new(Arc::clone(&state.accounts)))
}
