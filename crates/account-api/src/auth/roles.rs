//! 역할 게이트.
//!
//! 인증 게이트 이후 부착된 역할을 작업별 허용 목록과 비교합니다.

use std::collections::HashSet;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use account_core::{Identity, Role};

use super::AuthError;

/// 허용 역할 집합.
///
/// 순서와 중복은 의미가 없습니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleGate {
    allowed: HashSet<Role>,
}

impl RoleGate {
    pub fn new(roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            allowed: roles.into_iter().collect(),
        }
    }

    /// 관리자 전용.
    pub fn admin_only() -> Self {
        Self::new([Role::Admin])
    }

    pub fn allows(&self, role: Role) -> bool {
        self.allowed.contains(&role)
    }

    /// 신원 정보가 없으면 401, 역할이 허용 목록에 없으면 403.
    pub fn check(&self, identity: Option<&Identity>) -> Result<(), AuthError> {
        let identity = identity.ok_or(AuthError::MissingIdentity)?;
        if self.allows(identity.role) {
            Ok(())
        } else {
            warn!(
                user_id = %identity.user_id,
                role = %identity.role,
                "Request denied by role gate"
            );
            Err(AuthError::Forbidden)
        }
    }
}

/// 역할 게이트 미들웨어. 인증 게이트보다 안쪽 레이어에 둡니다.
pub async fn require_roles(
    State(gate): State<RoleGate>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    gate.check(request.extensions().get::<Identity>())?;
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn identity(role: Role) -> Identity {
        Identity::new(Uuid::new_v4(), "someone", role)
    }

    #[test]
    fn test_admin_only_gate() {
        let gate = RoleGate::admin_only();

        assert!(gate.check(Some(&identity(Role::Admin))).is_ok());
        assert!(matches!(
            gate.check(Some(&identity(Role::User))),
            Err(AuthError::Forbidden)
        ));
    }

    #[test]
    fn test_missing_identity_is_unauthenticated() {
        let gate = RoleGate::new([Role::Admin, Role::User]);
        assert!(matches!(gate.check(None), Err(AuthError::MissingIdentity)));
    }

    #[test]
    fn test_allow_list_is_a_set() {
        let a = RoleGate::new([Role::User, Role::Admin, Role::User]);
        let b = RoleGate::new([Role::Admin, Role::User]);
        assert_eq!(a, b);
        assert!(a.allows(Role::User));
    }
}
