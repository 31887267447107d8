//! 계정 작업.
//!
//! 회원가입, 로그인, 프로필 조회/수정, 목록/단건 조회, 삭제를 담당합니다.
//! 각 작업은 사용자 저장소와 토큰 서비스를 얇게 조합합니다.

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;
use validator::Validate;

use account_core::{Identity, NewUser, Role, User, UserUpdate};
use account_data::{DataError, UserRepository};

use crate::auth::{hash_password, verify_password, PasswordError, TokenError, TokenService};
use crate::error::ApiErrorResponse;

// ================================================================================================
// Request / Response
// ================================================================================================

/// 회원가입 요청.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "username is required"))]
    pub username: String,
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
    /// 요청 역할 (생략 시 `user`)
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone_number: String,
    /// 가입 코드
    #[serde(default)]
    pub token: Option<String>,
}

/// 로그인 요청.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

/// 프로필 수정 요청. `password`가 비어 있으면 기존 비밀번호를 유지합니다.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateRequest {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "username is required"))]
    pub username: String,
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    #[serde(default)]
    pub password: Option<String>,
}

/// 로그인 응답.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ================================================================================================
// Errors
// ================================================================================================

/// 계정 작업 에러.
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("{0}")]
    Validation(String),
    #[error("Invalid registration code")]
    InvalidRegistrationCode,
    #[error("User already exists: {0}")]
    Conflict(String),
    #[error("User not found")]
    NotFound,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Invalid user id")]
    InvalidId,
    #[error("토큰 발급 실패: {0}")]
    Token(#[from] TokenError),
    #[error("비밀번호 처리 실패: {0}")]
    Password(#[from] PasswordError),
    #[error("저장소 에러: {0}")]
    Store(DataError),
}

impl From<DataError> for AccountError {
    fn from(err: DataError) -> Self {
        match err {
            DataError::DuplicateError(what) => AccountError::Conflict(what),
            DataError::NotFound(_) => AccountError::NotFound,
            other => AccountError::Store(other),
        }
    }
}

impl From<validator::ValidationErrors> for AccountError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{} is invalid", field))
                })
            })
            .collect();
        messages.sort();
        AccountError::Validation(messages.join(", "))
    }
}

impl AccountError {
    pub fn status(&self) -> StatusCode {
        match self {
            AccountError::Validation(_) | AccountError::InvalidId => StatusCode::BAD_REQUEST,
            AccountError::InvalidRegistrationCode => StatusCode::FORBIDDEN,
            AccountError::Conflict(_) => StatusCode::CONFLICT,
            AccountError::NotFound => StatusCode::NOT_FOUND,
            AccountError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AccountError::Token(_) | AccountError::Password(_) | AccountError::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AccountError::Validation(_) => "VALIDATION_ERROR",
            AccountError::InvalidRegistrationCode => "INVALID_REGISTRATION_CODE",
            AccountError::Conflict(_) => "USER_EXISTS",
            AccountError::NotFound => "NOT_FOUND",
            AccountError::InvalidCredentials => "INVALID_CREDENTIALS",
            AccountError::InvalidId => "INVALID_ID",
            AccountError::Token(_) | AccountError::Password(_) | AccountError::Store(_) => {
                "INTERNAL_ERROR"
            }
        }
    }
}

impl IntoResponse for AccountError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            // 내부 에러 상세는 로그에만 남김
            error!(error = %self, "Account operation failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };
        ApiErrorResponse::new(self.code(), message).into_response_with(status)
    }
}

pub type AccountResult<T> = Result<T, AccountError>;

// ================================================================================================
// Service
// ================================================================================================

/// 계정 서비스.
pub struct AccountService {
    users: Arc<dyn UserRepository>,
    tokens: Arc<TokenService>,
    registration_code: Option<String>,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        tokens: Arc<TokenService>,
        registration_code: Option<String>,
    ) -> Self {
        Self {
            users,
            tokens,
            registration_code: registration_code.filter(|code| !code.is_empty()),
        }
    }

    /// 회원가입.
    ///
    /// 가입 코드가 설정되어 있으면 요청의 `token`이 일치해야 합니다.
    /// `user` 이외의 역할은 가입 코드가 설정된 경우에만 요청할 수 있습니다.
    pub async fn register(&self, request: RegisterRequest) -> AccountResult<User> {
        request.validate()?;

        let role = match request.role.as_deref().map(str::trim) {
            None | Some("") => Role::User,
            Some(raw) => Role::parse(raw)
                .ok_or_else(|| AccountError::Validation(format!("unknown role '{}'", raw)))?,
        };

        match &self.registration_code {
            Some(code) if request.token.as_deref() != Some(code.as_str()) => {
                warn!(username = %request.username, "Registration with invalid code");
                return Err(AccountError::InvalidRegistrationCode);
            }
            None if role != Role::User => {
                warn!(username = %request.username, %role, "Privileged registration without code");
                return Err(AccountError::InvalidRegistrationCode);
            }
            _ => {}
        }

        let password_hash = hash_password(&request.password)?;
        let user = self
            .users
            .create(NewUser {
                name: request.name,
                username: request.username,
                email: request.email,
                password_hash,
                role,
                address: request.address,
                phone_number: request.phone_number,
            })
            .await?;

        info!(user_id = %user.id, username = %user.username, "User registered");
        Ok(user)
    }

    /// 로그인 (자격 증명 확인 후 토큰 발급).
    pub async fn login(&self, request: LoginRequest) -> AccountResult<LoginResponse> {
        request.validate()?;

        let user = self
            .users
            .find_by_username(&request.username)
            .await?
            .ok_or(AccountError::NotFound)?;

        verify_password(&request.password, &user.password_hash).map_err(|e| {
            warn!(user_id = %user.id, error = %e, "Password verification failed");
            AccountError::InvalidCredentials
        })?;

        let issued = self.tokens.issue(&user)?;
        info!(user_id = %user.id, token_id = %issued.token_id, "User logged in");

        Ok(LoginResponse {
            id: user.id,
            name: user.name,
            username: user.username,
            email: user.email,
            role: user.role,
            token: issued.token,
            expires_at: issued.expires_at,
            created_at: user.created_at,
            updated_at: user.updated_at,
        })
    }

    /// 호출자 자신의 레코드.
    pub async fn profile(&self, identity: &Identity) -> AccountResult<User> {
        self.users
            .find_by_id(identity.user_id)
            .await?
            .ok_or(AccountError::NotFound)
    }

    /// 호출자 자신의 레코드 수정.
    pub async fn update(&self, identity: &Identity, request: UpdateRequest) -> AccountResult<User> {
        request.validate()?;

        let password_hash = match request.password.as_deref() {
            Some(password) if !password.is_empty() => Some(hash_password(password)?),
            _ => None,
        };

        let user = self
            .users
            .update(
                identity.user_id,
                UserUpdate {
                    name: request.name,
                    username: request.username,
                    email: request.email,
                    password_hash,
                },
            )
            .await?;

        info!(user_id = %user.id, "User updated");
        Ok(user)
    }

    /// 전체 사용자 목록.
    pub async fn list(&self) -> AccountResult<Vec<User>> {
        Ok(self.users.list().await?)
    }

    /// ID로 사용자 조회.
    pub async fn get(&self, id: &str) -> AccountResult<User> {
        let id = parse_id(id)?;
        self.users
            .find_by_id(id)
            .await?
            .ok_or(AccountError::NotFound)
    }

    /// ID로 사용자 삭제.
    pub async fn delete(&self, id: &str) -> AccountResult<()> {
        let id = parse_id(id)?;
        self.users.delete(id).await?;
        info!(user_id = %id, "User deleted");
        Ok(())
    }
}

fn parse_id(raw: &str) -> AccountResult<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| AccountError::InvalidId)
}

#[cfg(test)]
mod tests {
    use super::*;
    use account_core::AuthConfig;
    use account_data::{MemoryRevocationStore, MemoryUserRepository};

    fn service(code: Option<&str>) -> AccountService {
        let tokens = Arc::new(TokenService::new(
            &AuthConfig::with_secret("account-service-test-secret"),
            Arc::new(MemoryRevocationStore::new()),
        ));
        AccountService::new(
            Arc::new(MemoryUserRepository::new()),
            tokens,
            code.map(str::to_string),
        )
    }

    fn register_request(username: &str) -> RegisterRequest {
        RegisterRequest {
            name: "Alice".to_string(),
            username: username.to_string(),
            email: format!("{}@example.com", username),
            password: "correct horse".to_string(),
            role: None,
            address: String::new(),
            phone_number: String::new(),
            token: None,
        }
    }

    #[tokio::test]
    async fn test_register_defaults_to_user_role() {
        let service = service(None);
        let user = service.register(register_request("alice")).await.unwrap();

        assert_eq!(user.role, Role::User);
        assert!(user.password_hash.starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn test_register_validates_body() {
        let service = service(None);
        let mut request = register_request("alice");
        request.email = "not-an-email".to_string();

        let err = service.register(request).await.unwrap_err();
        assert!(matches!(err, AccountError::Validation(_)));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_register_requires_code_when_configured() {
        let service = service(Some("hr-code"));

        let err = service.register(register_request("alice")).await.unwrap_err();
        assert!(matches!(err, AccountError::InvalidRegistrationCode));

        let mut request = register_request("alice");
        request.token = Some("hr-code".to_string());
        request.role = Some("admin".to_string());
        let user = service.register(request).await.unwrap();
        assert_eq!(user.role, Role::Admin);
    }

    #[tokio::test]
    async fn test_admin_registration_without_code_is_refused() {
        let service = service(None);
        let mut request = register_request("mallory");
        request.role = Some("admin".to_string());

        let err = service.register(request).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_duplicate_username_is_conflict() {
        let service = service(None);
        service.register(register_request("alice")).await.unwrap();

        let mut request = register_request("alice");
        request.email = "other@example.com".to_string();
        let err = service.register(request).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_login_flow() {
        let service = service(None);
        let user = service.register(register_request("alice")).await.unwrap();

        let login = service
            .login(LoginRequest {
                username: "alice".to_string(),
                password: "correct horse".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(login.id, user.id);
        assert!(!login.token.is_empty());
        assert!(login.expires_at > Utc::now());

        let wrong = service
            .login(LoginRequest {
                username: "alice".to_string(),
                password: "battery staple".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(wrong, AccountError::InvalidCredentials));

        let unknown = service
            .login(LoginRequest {
                username: "bob".to_string(),
                password: "whatever".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(unknown, AccountError::NotFound));
    }

    #[tokio::test]
    async fn test_update_rehashes_non_empty_password() {
        let service = service(None);
        let user = service.register(register_request("alice")).await.unwrap();
        let identity = user.identity();

        let kept = service
            .update(
                &identity,
                UpdateRequest {
                    name: "Alice B".to_string(),
                    username: "alice".to_string(),
                    email: "alice@example.com".to_string(),
                    password: Some(String::new()),
                },
            )
            .await
            .unwrap();
        assert_eq!(kept.password_hash, user.password_hash);

        let changed = service
            .update(
                &identity,
                UpdateRequest {
                    name: "Alice B".to_string(),
                    username: "alice".to_string(),
                    email: "alice@example.com".to_string(),
                    password: Some("new password".to_string()),
                },
            )
            .await
            .unwrap();
        assert!(verify_password("new password", &changed.password_hash).is_ok());
    }

    #[tokio::test]
    async fn test_get_and_delete_by_id() {
        let service = service(None);
        let user = service.register(register_request("alice")).await.unwrap();

        assert_eq!(service.get(&user.id.to_string()).await.unwrap().id, user.id);
        assert!(matches!(
            service.get("not-a-uuid").await,
            Err(AccountError::InvalidId)
        ));

        service.delete(&user.id.to_string()).await.unwrap();
        assert!(matches!(
            service.delete(&user.id.to_string()).await,
            Err(AccountError::NotFound)
        ));
    }
}
