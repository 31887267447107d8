//! # Account Core
//!
//! 계정 서비스의 핵심 도메인 모델 및 공통 인프라를 제공합니다.
//!
//! 이 크레이트는 서비스 전반에서 사용되는 기본 타입을 제공합니다:
//! - 사용자 레코드 및 역할 정의
//! - 요청 단위 인증 신원 (Identity Context)
//! - 설정 관리
//! - 로깅 인프라

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;

pub use config::*;
pub use domain::*;
pub use error::*;
pub use logging::*;
