//! 인증 및 권한 부여.
//!
//! # 구성 요소
//!
//! - [`TokenService`]: 세션 토큰 발급/검증/폐기 (HTTP와 gRPC가 공유)
//! - [`require_auth`]: 인증 게이트 미들웨어, [`Authenticated`] 추출기
//! - [`RoleGate`]: 역할 허용 목록 검사
//! - 비밀번호 해싱/검증

mod middleware;
mod password;
mod roles;
mod token;

pub use middleware::{
    authenticate, bearer_token, require_auth, AuthError, AuthRejection, Authenticated,
};
pub use password::{hash_password, verify_password, PasswordError};
pub use roles::{require_roles, RoleGate};
pub use token::{
    Claims, IssuedToken, LogoutError, RejectReason, TokenError, TokenService, Verification,
    BEARER_PREFIX,
};
