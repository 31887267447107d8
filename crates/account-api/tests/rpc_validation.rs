//! gRPC 토큰 검증/사용자 조회 통합 테스트

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use prost::Message;
use tonic::{Code, Request};

use account_api::auth::TokenService;
use account_api::rpc::proto::auth_service_server::AuthService;
use account_api::rpc::proto::{ValidateTokenRequest, ValidateTokenResponse};
use account_api::rpc::{AuthRpc, INTERNAL_VALIDATION_MESSAGE};
use account_api::state::{create_test_state, create_test_state_with};
use account_core::{AuthConfig, NewUser, Role, User};
use account_data::{MemoryRevocationStore, RevocationError, RevocationStore, UserRepository};

struct TimingOutStore;

#[async_trait]
impl RevocationStore for TimingOutStore {
    async fn put(&self, _token_id: &str, _ttl: Duration) -> Result<(), RevocationError> {
        Err(RevocationError::Timeout(2000))
    }

    async fn exists(&self, _token_id: &str) -> Result<bool, RevocationError> {
        Err(RevocationError::Timeout(2000))
    }

    fn backend(&self) -> &'static str {
        "timing-out"
    }
}

fn alice() -> User {
    NewUser {
        name: "Alice".to_string(),
        username: "alice".to_string(),
        email: "alice@example.com".to_string(),
        password_hash: String::new(),
        role: Role::User,
        address: String::new(),
        phone_number: String::new(),
    }
    .into_user()
}

async fn validate(rpc: &AuthRpc, token: &str) -> Result<ValidateTokenResponse, tonic::Status> {
    rpc.validate_token(Request::new(ValidateTokenRequest {
        token: token.to_string(),
    }))
    .await
    .map(tonic::Response::into_inner)
}

#[tokio::test]
async fn test_valid_token_returns_identity() {
    let state = create_test_state();
    let rpc = AuthRpc::new(Arc::clone(&state.tokens));
    let user = alice();
    let issued = state.tokens.issue(&user).unwrap();

    let response = validate(&rpc, &issued.token).await.unwrap();
    assert!(response.is_valid);
    assert_eq!(response.user_id, user.id.to_string());
    assert_eq!(response.username, "alice");
    assert_eq!(response.role, "user");
}

#[tokio::test]
async fn test_foreign_secret_is_unauthenticated() {
    let state = create_test_state();
    let rpc = AuthRpc::new(Arc::clone(&state.tokens));

    let foreign = TokenService::new(
        &AuthConfig::with_secret("unrelated-secret"),
        Arc::new(MemoryRevocationStore::new()),
    );
    let forged = foreign.issue(&alice()).unwrap();

    let status = validate(&rpc, &forged.token).await.unwrap_err();
    assert_eq!(status.code(), Code::Unauthenticated);
    assert_eq!(status.message(), "Token invalid or expired");

    // details에 응답 envelope이 실려 있음
    let envelope = ValidateTokenResponse::decode(status.details()).unwrap();
    assert!(!envelope.is_valid);
    assert_eq!(envelope.error_message, "Token invalid or expired");
}

#[tokio::test]
async fn test_revoked_token_is_unauthenticated() {
    let state = create_test_state();
    let rpc = AuthRpc::new(Arc::clone(&state.tokens));
    let issued = state.tokens.issue(&alice()).unwrap();

    state
        .tokens
        .logout(&format!("Bearer {}", issued.token))
        .await
        .unwrap();

    let status = validate(&rpc, &issued.token).await.unwrap_err();
    assert_eq!(status.code(), Code::Unauthenticated);
    assert_eq!(status.message(), "Token has been revoked");
}

#[tokio::test]
async fn test_garbage_token_is_unauthenticated() {
    let state = create_test_state();
    let rpc = AuthRpc::new(Arc::clone(&state.tokens));

    for token in ["", "abc", "a.b.c"] {
        let status = validate(&rpc, token).await.unwrap_err();
        assert_eq!(status.code(), Code::Unauthenticated, "token: {token:?}");
    }
}

#[tokio::test]
async fn test_store_timeout_is_internal() {
    let state = create_test_state_with(Arc::new(TimingOutStore));
    let rpc = AuthRpc::new(Arc::clone(&state.tokens));
    let issued = state.tokens.issue(&alice()).unwrap();

    let status = validate(&rpc, &issued.token).await.unwrap_err();
    assert_eq!(status.code(), Code::Internal);
    assert_eq!(status.message(), INTERNAL_VALIDATION_MESSAGE);
}

#[tokio::test]
async fn test_get_user_over_rpc() {
    use account_api::rpc::proto::account_service_server::AccountService;
    use account_api::rpc::proto::GetUserRequest;
    use account_api::rpc::AccountRpc;

    let state = create_test_state();
    let rpc = AccountRpc::new(Arc::clone(&state.accounts));
    let created = state
        .users
        .create(NewUser {
            name: "Carol".to_string(),
            username: "carol".to_string(),
            email: "carol@example.com".to_string(),
            password_hash: String::new(),
            role: Role::User,
            address: "Seoul".to_string(),
            phone_number: "010-0000-0000".to_string(),
        })
        .await
        .unwrap();

    let response = rpc
        .get_user(Request::new(GetUserRequest {
            id: created.id.to_string(),
        }))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(response.id, created.id.to_string());
    assert_eq!(response.email, "carol@example.com");
    assert_eq!(response.phone_number, "010-0000-0000");

    let status = rpc
        .get_user(Request::new(GetUserRequest { id: "  ".to_string() }))
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::InvalidArgument);
    assert_eq!(status.message(), "user ID cannot be empty");
}
