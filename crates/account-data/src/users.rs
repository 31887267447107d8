//! 사용자 레코드 저장소.
//!
//! PostgreSQL(sqlx) 구현과 테스트/개발용 메모리 구현을 제공합니다.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use account_core::{DatabaseConfig, NewUser, Role, User, UserUpdate};

use crate::error::{DataError, Result};

// ================================================================================================
// Repository trait
// ================================================================================================

/// 사용자 레코드 저장소.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// 모든 사용자를 생성 순서대로 조회합니다.
    async fn list(&self) -> Result<Vec<User>>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    /// 새 사용자를 저장합니다. username/email 중복 시 `DuplicateError`.
    async fn create(&self, user: NewUser) -> Result<User>;

    /// 사용자 정보를 수정합니다. 없으면 `NotFound`.
    async fn update(&self, id: Uuid, update: UserUpdate) -> Result<User>;

    /// 사용자를 삭제합니다. 없으면 `NotFound`.
    async fn delete(&self, id: Uuid) -> Result<()>;

    /// 저장소 연결 상태를 확인합니다.
    async fn health_check(&self) -> Result<()> {
        Ok(())
    }

    /// 저장소 이름 (헬스 체크 응답용).
    fn backend(&self) -> &'static str;
}

// ================================================================================================
// PostgreSQL
// ================================================================================================

/// 데이터베이스 연결 풀 래퍼.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// 새로운 데이터베이스 연결 풀을 생성합니다.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| DataError::ConnectionError("database.url is not set".to_string()))?;

        info!("Connecting to database...");

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect(url)
            .await
            .map_err(|e| DataError::ConnectionError(e.to_string()))?;

        info!("Database connection established");

        Ok(Self { pool })
    }

    /// 내장 마이그레이션을 실행합니다.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    /// 기본 연결 풀 참조.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// `users` 테이블 행. 역할은 문자열로 저장됩니다.
#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    username: String,
    email: String,
    password_hash: String,
    role: String,
    address: String,
    phone_number: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = DataError;

    fn try_from(row: UserRow) -> Result<Self> {
        let role = Role::parse(&row.role)
            .ok_or_else(|| DataError::InvalidData(format!("unknown role '{}'", row.role)))?;

        Ok(User {
            id: row.id,
            name: row.name,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            role,
            address: row.address,
            phone_number: row.phone_number,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const USER_COLUMNS: &str =
    "id, name, username, email, password_hash, role, address, phone_number, created_at, updated_at";

/// PostgreSQL 사용자 저장소.
#[derive(Clone)]
pub struct PgUserRepository {
    db: Database,
}

impl PgUserRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn list(&self) -> Result<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users ORDER BY created_at",
            USER_COLUMNS
        ))
        .fetch_all(self.db.pool())
        .await?;

        rows.into_iter().map(User::try_from).collect()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.db.pool())
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE username = $1",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(self.db.pool())
        .await?;

        row.map(User::try_from).transpose()
    }

    #[instrument(skip(self, user), fields(username = %user.username))]
    async fn create(&self, user: NewUser) -> Result<User> {
        let user = user.into_user();

        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (id, name, username, email, password_hash, role, address, phone_number, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(&user.address)
        .bind(&user.phone_number)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(self.db.pool())
        .await?;

        debug!(user_id = %row.id, "User created");
        User::try_from(row)
    }

    #[instrument(skip(self, update))]
    async fn update(&self, id: Uuid, update: UserUpdate) -> Result<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users
            SET name = $2,
                username = $3,
                email = $4,
                password_hash = COALESCE($5, password_hash),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(id)
        .bind(&update.name)
        .bind(&update.username)
        .bind(&update.email)
        .bind(update.password_hash.as_deref())
        .fetch_optional(self.db.pool())
        .await?
        .ok_or_else(|| DataError::NotFound(format!("user {}", id)))?;

        User::try_from(row)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(self.db.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(DataError::NotFound(format!("user {}", id)));
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(self.db.pool())
            .await
            .map_err(|e| DataError::ConnectionError(e.to_string()))?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}

// ================================================================================================
// In-memory
// ================================================================================================

/// 프로세스 내 사용자 저장소.
#[derive(Default)]
pub struct MemoryUserRepository {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn conflict(
        users: &HashMap<Uuid, User>,
        id: Option<Uuid>,
        username: &str,
        email: &str,
    ) -> Option<DataError> {
        users
            .values()
            .filter(|u| Some(u.id) != id)
            .find_map(|u| {
                if u.username == username {
                    Some(DataError::DuplicateError(format!("username '{}'", username)))
                } else if u.email == email {
                    Some(DataError::DuplicateError(format!("email '{}'", email)))
                } else {
                    None
                }
            })
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn list(&self) -> Result<Vec<User>> {
        let mut users: Vec<User> = self.users.read().await.values().cloned().collect();
        users.sort_by_key(|u| u.created_at);
        Ok(users)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn create(&self, user: NewUser) -> Result<User> {
        let mut users = self.users.write().await;
        if let Some(err) = Self::conflict(&users, None, &user.username, &user.email) {
            return Err(err);
        }

        let user = user.into_user();
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, id: Uuid, update: UserUpdate) -> Result<User> {
        let mut users = self.users.write().await;
        if let Some(err) = Self::conflict(&users, Some(id), &update.username, &update.email) {
            return Err(err);
        }

        let user = users
            .get_mut(&id)
            .ok_or_else(|| DataError::NotFound(format!("user {}", id)))?;
        user.name = update.name;
        user.username = update.username;
        user.email = update.email;
        if let Some(hash) = update.password_hash {
            user.password_hash = hash;
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.users
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| DataError::NotFound(format!("user {}", id)))
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            name: "Test".to_string(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            role: Role::User,
            address: String::new(),
            phone_number: String::new(),
        }
    }

    #[test]
    fn test_row_with_unknown_role_is_rejected() {
        let row = UserRow {
            id: Uuid::new_v4(),
            name: "n".to_string(),
            username: "u".to_string(),
            email: "e".to_string(),
            password_hash: "h".to_string(),
            role: "superuser".to_string(),
            address: String::new(),
            phone_number: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(matches!(User::try_from(row), Err(DataError::InvalidData(_))));
    }

    #[tokio::test]
    async fn test_memory_create_and_find() {
        let repo = MemoryUserRepository::new();
        let created = repo.create(new_user("alice", "alice@example.com")).await.unwrap();

        let by_id = repo.find_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(by_id.username, "alice");

        let by_name = repo.find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(by_name.id, created.id);

        assert!(repo.find_by_username("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_rejects_duplicates() {
        let repo = MemoryUserRepository::new();
        repo.create(new_user("alice", "alice@example.com")).await.unwrap();

        let dup_name = repo.create(new_user("alice", "other@example.com")).await;
        assert!(matches!(dup_name, Err(DataError::DuplicateError(_))));

        let dup_email = repo.create(new_user("bob", "alice@example.com")).await;
        assert!(matches!(dup_email, Err(DataError::DuplicateError(_))));
    }

    #[tokio::test]
    async fn test_memory_update_keeps_password_when_absent() {
        let repo = MemoryUserRepository::new();
        let created = repo.create(new_user("alice", "alice@example.com")).await.unwrap();

        let updated = repo
            .update(
                created.id,
                UserUpdate {
                    name: "Alice Cooper".to_string(),
                    username: "alice".to_string(),
                    email: "alice@example.com".to_string(),
                    password_hash: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Alice Cooper");
        assert_eq!(updated.password_hash, "hash");
    }

    #[tokio::test]
    async fn test_memory_delete() {
        let repo = MemoryUserRepository::new();
        let created = repo.create(new_user("alice", "alice@example.com")).await.unwrap();

        repo.delete(created.id).await.unwrap();
        assert!(repo.find_by_id(created.id).await.unwrap().is_none());
        assert!(matches!(repo.delete(created.id).await, Err(DataError::NotFound(_))));
    }
}
