//! 사용자 역할.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 사용자 역할.
///
/// 토큰 발급 시점에 사용자 레코드에서 복사되어 클레임에 포함됩니다.
/// 검증 시에는 저장소를 다시 조회하지 않으므로, 역할 변경은 재로그인 또는
/// 토큰 만료 이후에 반영됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// 관리자 - 사용자 목록/단건 조회 가능
    Admin,
    /// 일반 사용자
    User,
}

impl Role {
    /// 문자열에서 역할 파싱 (대소문자 무시).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "user" => Some(Role::User),
            _ => None,
        }
    }

    /// 저장소/클레임에 기록되는 문자열 표현.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::User
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 알 수 없는 역할 문자열.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("알 수 없는 역할: {0}")]
pub struct ParseRoleError(pub String);

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::parse(s).ok_or_else(|| ParseRoleError(s.to_string()))
    }
}
