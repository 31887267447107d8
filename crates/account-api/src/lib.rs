//! # Account API
//!
//! 계정 서비스의 REST API와 gRPC 엔드포인트를 제공합니다.
//!
//! ## 구성
//!
//! - `auth`: 토큰 발급/검증/폐기, 인증 게이트, 역할 게이트
//! - `services`: 회원가입, 로그인, 프로필 작업
//! - `routes`: HTTP 라우터 (`/api/v1/accounts`, `/health`)
//! - `rpc`: `ValidateToken`, `GetUser` gRPC 서비스
//! - `metrics`: Prometheus 메트릭

pub mod auth;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod rpc;
pub mod services;
pub mod state;

pub use error::{ApiErrorResponse, ApiResult, ApiSuccess};
pub use state::AppState;
