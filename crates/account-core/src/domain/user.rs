//! 사용자 레코드.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Identity, Role};

/// 사용자 저장소에 보관되는 사용자 레코드.
///
/// `password_hash`는 PHC 형식 문자열이며 직렬화에서 제외됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: Role,
    pub address: String,
    pub phone_number: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// 토큰 클레임/요청 컨텍스트에 복사될 신원 정보.
    pub fn identity(&self) -> Identity {
        Identity::new(self.id, self.username.clone(), self.role)
    }
}

/// 새 사용자 입력 (비밀번호는 이미 해싱된 상태).
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub address: String,
    pub phone_number: String,
}

impl NewUser {
    /// 현재 시각 기준으로 새 ID를 할당하여 레코드를 생성합니다.
    pub fn into_user(self) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            name: self.name,
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            role: self.role,
            address: self.address,
            phone_number: self.phone_number,
            created_at: now,
            updated_at: now,
        }
    }
}

/// 사용자 정보 수정 입력.
///
/// `password_hash`가 `None`이면 기존 비밀번호를 유지합니다.
#[derive(Debug, Clone)]
pub struct UserUpdate {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password_hash: Option<String>,
}
