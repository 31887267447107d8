//! 토큰 폐기 목록.
//!
//! 폐기된 토큰 식별자(`jti`)를 남은 수명만큼의 TTL로 기록합니다.
//! 항목은 명시적으로 삭제하지 않으며 TTL 만료에 맡깁니다.

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, instrument};

use account_core::RedisConfig;

use crate::error::RevocationError;

/// 폐기 목록 저장소.
///
/// 코어가 필요로 하는 것은 "TTL과 함께 기록"과 "존재 여부" 두 가지뿐입니다.
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// 토큰 식별자를 TTL과 함께 기록합니다. 이미 있으면 덮어씁니다.
    async fn put(&self, token_id: &str, ttl: Duration) -> Result<(), RevocationError>;

    /// 토큰 식별자가 폐기 목록에 있는지 확인합니다.
    async fn exists(&self, token_id: &str) -> Result<bool, RevocationError>;

    /// 저장소 연결 상태를 확인합니다.
    async fn health_check(&self) -> Result<(), RevocationError> {
        Ok(())
    }

    /// 저장소 이름 (헬스 체크 응답용).
    fn backend(&self) -> &'static str;
}

/// Redis `SET EX`에 넘길 초 단위 TTL. 올림하며 최소 1초입니다.
fn ttl_secs(ttl: Duration) -> u64 {
    let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    secs.max(1)
}

/// Redis 기반 폐기 목록.
#[derive(Clone)]
pub struct RedisRevocationStore {
    connection: ConnectionManager,
    key_prefix: String,
    op_timeout: Duration,
}

impl RedisRevocationStore {
    /// Redis에 연결합니다.
    pub async fn connect(config: &RedisConfig) -> Result<Self, RevocationError> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| RevocationError::Unavailable("redis.url is not set".to_string()))?;

        info!("Connecting to Redis...");

        let client = Client::open(url)?;
        let op_timeout = Duration::from_millis(config.op_timeout_ms);
        let connection = tokio::time::timeout(op_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| RevocationError::Timeout(config.op_timeout_ms))??;

        info!("Redis connection established");

        Ok(Self {
            connection,
            key_prefix: config.key_prefix.clone(),
            op_timeout,
        })
    }

    fn key(&self, token_id: &str) -> String {
        format!("{}{}", self.key_prefix, token_id)
    }

    /// 개별 명령을 제한 시간 안에 실행합니다.
    async fn bounded<T, F>(&self, fut: F) -> Result<T, RevocationError>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(RevocationError::Timeout(self.op_timeout.as_millis() as u64)),
        }
    }
}

#[async_trait]
impl RevocationStore for RedisRevocationStore {
    #[instrument(skip(self), fields(ttl_secs = ttl_secs(ttl)))]
    async fn put(&self, token_id: &str, ttl: Duration) -> Result<(), RevocationError> {
        let mut conn = self.connection.clone();
        let key = self.key(token_id);
        self.bounded(conn.set_ex::<_, _, ()>(key, "revoked", ttl_secs(ttl)))
            .await?;

        debug!("Token id recorded in revocation list");
        Ok(())
    }

    async fn exists(&self, token_id: &str) -> Result<bool, RevocationError> {
        let mut conn = self.connection.clone();
        let key = self.key(token_id);
        self.bounded(conn.exists::<_, bool>(key)).await
    }

    async fn health_check(&self) -> Result<(), RevocationError> {
        let mut conn = self.connection.clone();
        let reply: String = self
            .bounded(redis::cmd("PING").query_async(&mut conn))
            .await?;

        if reply == "PONG" {
            Ok(())
        } else {
            Err(RevocationError::Unavailable(format!(
                "unexpected PING reply: {}",
                reply
            )))
        }
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}

/// 프로세스 내 폐기 목록.
///
/// Redis가 설정되지 않은 개발 환경과 테스트에서 사용합니다.
/// 만료된 항목은 조회 시 없는 것으로 취급하고 기록 시 정리합니다.
#[derive(Default)]
pub struct MemoryRevocationStore {
    entries: RwLock<HashMap<String, Instant>>,
}

impl MemoryRevocationStore {
    /// 빈 폐기 목록을 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 만료되지 않은 항목 수.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|expires_at| **expires_at > now)
            .count()
    }

    /// 만료되지 않은 항목이 없으면 `true`.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl RevocationStore for MemoryRevocationStore {
    async fn put(&self, token_id: &str, ttl: Duration) -> Result<(), RevocationError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, expires_at| *expires_at > now);
        entries.insert(token_id.to_string(), now + ttl);
        Ok(())
    }

    async fn exists(&self, token_id: &str) -> Result<bool, RevocationError> {
        let now = Instant::now();
        Ok(self
            .entries
            .read()
            .await
            .get(token_id)
            .is_some_and(|expires_at| *expires_at > now))
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_secs_rounds_up() {
        assert_eq!(ttl_secs(Duration::from_secs(10)), 10);
        assert_eq!(ttl_secs(Duration::from_millis(10_500)), 11);
        assert_eq!(ttl_secs(Duration::from_millis(1)), 1);
        assert_eq!(ttl_secs(Duration::ZERO), 1);
    }

    #[tokio::test]
    async fn test_memory_store_put_and_exists() {
        let store = MemoryRevocationStore::new();
        assert!(!store.exists("jti-1").await.unwrap());

        store.put("jti-1", Duration::from_secs(60)).await.unwrap();
        assert!(store.exists("jti-1").await.unwrap());
        assert!(!store.exists("jti-2").await.unwrap());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_memory_store_put_twice_is_idempotent() {
        let store = MemoryRevocationStore::new();
        store.put("jti-1", Duration::from_secs(60)).await.unwrap();
        store.put("jti-1", Duration::from_secs(60)).await.unwrap();
        assert!(store.exists("jti-1").await.unwrap());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_memory_store_entries_expire() {
        let store = MemoryRevocationStore::new();
        store.put("jti-1", Duration::from_secs(5)).await.unwrap();
        assert!(store.exists("jti-1").await.unwrap());

        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(!store.exists("jti-1").await.unwrap());
        assert!(store.is_empty().await);
    }

    #[test]
    fn test_backend_name() {
        assert_eq!(MemoryRevocationStore::new().backend(), "memory");
    }
}
