//! 계정 도메인 모델.

mod identity;
mod role;
mod user;

pub use identity::Identity;
pub use role::{ParseRoleError, Role};
pub use user::{NewUser, User, UserUpdate};
