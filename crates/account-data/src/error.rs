//! 데이터 모듈 오류 타입.

use thiserror::Error;

/// 사용자 저장소 오류.
#[derive(Debug, Error)]
pub enum DataError {
    /// 데이터베이스 연결 오류
    #[error("Database connection error: {0}")]
    ConnectionError(String),

    /// 쿼리 실행 오류
    #[error("Query error: {0}")]
    QueryError(String),

    /// 레코드를 찾을 수 없음
    #[error("Record not found: {0}")]
    NotFound(String),

    /// 중복 레코드 (username 또는 email)
    #[error("Duplicate record: {0}")]
    DuplicateError(String),

    /// 저장된 데이터가 도메인 타입으로 변환되지 않음
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// 마이그레이션 오류
    #[error("Migration error: {0}")]
    MigrationError(String),

    /// 연결 풀 소진
    #[error("Connection pool exhausted")]
    PoolExhausted,
}

impl From<sqlx::Error> for DataError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DataError::NotFound("Row not found".to_string()),
            sqlx::Error::PoolTimedOut => DataError::PoolExhausted,
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string()).unwrap_or_default();
                if code == "23505" {
                    // PostgreSQL 고유 제약 조건 위반
                    DataError::DuplicateError(db_err.message().to_string())
                } else {
                    DataError::QueryError(db_err.message().to_string())
                }
            }
            _ => DataError::QueryError(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DataError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DataError::MigrationError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DataError>;

/// 폐기 목록 저장소 오류.
///
/// 어떤 경우에도 "유효" 또는 "무효"로 해석되어서는 안 됩니다.
#[derive(Debug, Error)]
pub enum RevocationError {
    /// 저장소에 연결할 수 없거나 명령이 실패함
    #[error("Revocation store unavailable: {0}")]
    Unavailable(String),

    /// 명령이 제한 시간 안에 끝나지 않음
    #[error("Revocation store timed out after {0}ms")]
    Timeout(u64),
}

impl From<redis::RedisError> for RevocationError {
    fn from(err: redis::RedisError) -> Self {
        RevocationError::Unavailable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: DataError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, DataError::NotFound(_)));

        let err: DataError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, DataError::PoolExhausted));
    }

    #[test]
    fn test_revocation_error_messages() {
        assert_eq!(
            RevocationError::Timeout(2000).to_string(),
            "Revocation store timed out after 2000ms"
        );
    }
}
