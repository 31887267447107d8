//! 요청 단위 인증 신원.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Role;

/// 인증 게이트가 검증 성공 후 요청 컨텍스트에 부착하는 신원 정보.
///
/// 요청이 끝나면 폐기되며 저장되지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// 사용자 ID (subject)
    pub user_id: Uuid,
    /// 사용자 이름
    pub username: String,
    /// 발급 시점의 역할
    pub role: Role,
}

impl Identity {
    pub fn new(user_id: Uuid, username: impl Into<String>, role: Role) -> Self {
        Self {
            user_id,
            username: username.into(),
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
