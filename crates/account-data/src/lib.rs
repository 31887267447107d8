//! 외부 저장소.
//!
//! 이 crate는 다음을 제공합니다:
//! - 토큰 폐기 목록 (Redis, 메모리)
//! - 사용자 레코드 저장소 (PostgreSQL, 메모리)

pub mod error;
pub mod revocation;
pub mod users;

pub use error::{DataError, Result, RevocationError};
pub use revocation::{MemoryRevocationStore, RedisRevocationStore, RevocationStore};
pub use users::{Database, MemoryUserRepository, PgUserRepository, UserRepository};
