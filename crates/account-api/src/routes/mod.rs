//! API 라우트.
//!
//! # 라우트 구조
//!
//! - `/health` - 헬스 체크 (liveness)
//! - `/health/ready` - 상세 헬스 체크 (readiness)
//! - `/api/v1/accounts` - 계정 관리 및 인증

pub mod accounts;
pub mod health;

pub use accounts::accounts_router;
pub use health::{health_router, ComponentHealth, ComponentStatus, HealthResponse};

use axum::Router;
use std::sync::Arc;

use crate::state::AppState;

/// 전체 API 라우터 생성.
///
/// 상태가 주입된 라우터를 반환합니다.
pub fn create_api_router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/health", health_router())
        .nest("/api/v1/accounts", accounts_router(Arc::clone(&state.tokens)))
        .with_state(state)
}
