//! 모든 핸들러에서 공유되는 애플리케이션 상태.
//!
//! Arc로 래핑되어 HTTP 라우터와 gRPC 서비스가 함께 사용합니다.

use std::sync::Arc;

use account_core::AuthConfig;
use account_data::{MemoryRevocationStore, MemoryUserRepository, RevocationStore, UserRepository};

use crate::auth::TokenService;
use crate::services::AccountService;

/// 애플리케이션 공유 상태.
#[derive(Clone)]
pub struct AppState {
    /// 토큰 서비스 - 인증 게이트와 gRPC 검증 엔드포인트가 공유
    pub tokens: Arc<TokenService>,

    /// 계정 작업
    pub accounts: Arc<AccountService>,

    /// 사용자 저장소
    pub users: Arc<dyn UserRepository>,

    /// 토큰 폐기 목록
    pub revocations: Arc<dyn RevocationStore>,

    /// 서버 시작 시간 (업타임 계산용)
    pub started_at: chrono::DateTime<chrono::Utc>,

    /// API 버전
    pub version: String,
}

impl AppState {
    /// 저장소와 인증 설정으로 상태를 구성합니다.
    pub fn new(
        auth: &AuthConfig,
        users: Arc<dyn UserRepository>,
        revocations: Arc<dyn RevocationStore>,
    ) -> Self {
        let tokens = Arc::new(TokenService::new(auth, Arc::clone(&revocations)));
        let accounts = Arc::new(AccountService::new(
            Arc::clone(&users),
            Arc::clone(&tokens),
            auth.registration_code.clone(),
        ));

        Self {
            tokens,
            accounts,
            users,
            revocations,
            started_at: chrono::Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// 서버 업타임(초).
    pub fn uptime_secs(&self) -> i64 {
        (chrono::Utc::now() - self.started_at).num_seconds()
    }

    /// 사용자 저장소 상태 확인.
    pub async fn is_db_healthy(&self) -> bool {
        self.users.health_check().await.is_ok()
    }

    /// 폐기 목록 상태 확인.
    pub async fn is_redis_healthy(&self) -> bool {
        self.revocations.health_check().await.is_ok()
    }
}

/// 테스트용 서명 키.
pub const TEST_SECRET: &str = "test-secret-key-for-account-service";

/// 메모리 저장소를 사용하는 테스트용 상태.
pub fn create_test_state() -> AppState {
    create_test_state_with(Arc::new(MemoryRevocationStore::new()))
}

/// 지정한 폐기 목록으로 테스트용 상태를 만듭니다.
pub fn create_test_state_with(revocations: Arc<dyn RevocationStore>) -> AppState {
    AppState::new(
        &AuthConfig::with_secret(TEST_SECRET),
        Arc::new(MemoryUserRepository::new()),
        revocations,
    )
}
