//! Prometheus 메트릭 설정 및 유틸리티.
//!
//! HTTP 요청 메트릭과 토큰 검증/폐기 메트릭을 수집하고 `/metrics` 엔드포인트로 노출합니다.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

/// Prometheus 메트릭 레코더를 설정하고 핸들을 반환합니다.
///
/// # 반환값
///
/// `/metrics` 엔드포인트에서 메트릭을 렌더링하기 위한 `PrometheusHandle`
///
/// # Errors
///
/// 레코더가 이미 설치되어 있으면 에러를 반환합니다.
pub fn setup_metrics_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new()
        // HTTP 요청 지속 시간 히스토그램 버킷 설정
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".to_string()),
            &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
        )?
        .install_recorder()
}

// ============================================================================
// HTTP 메트릭 헬퍼 함수
// ============================================================================

/// HTTP 요청 카운터 증가.
pub fn record_http_request(method: &str, path: &str) {
    counter!("http_requests_total", "method" => method.to_string(), "path" => path.to_string())
        .increment(1);
}

/// HTTP 응답 카운터 증가.
pub fn record_http_response(method: &str, path: &str, status: u16) {
    counter!(
        "http_responses_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// HTTP 요청 지속 시간 기록.
pub fn record_http_duration(method: &str, path: &str, duration_secs: f64) {
    histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_secs);
}

// ============================================================================
// 인증 메트릭 헬퍼 함수
// ============================================================================

/// 토큰 검증이 수행된 진입점.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    Http,
    Rpc,
}

impl Surface {
    pub fn as_str(&self) -> &'static str {
        match self {
            Surface::Http => "http",
            Surface::Rpc => "rpc",
        }
    }
}

/// 토큰 검증 결과 카운터 증가.
///
/// `outcome`은 `valid`, `invalid`, `error` 중 하나입니다.
pub fn record_verification(surface: Surface, outcome: &'static str) {
    counter!(
        "auth_verifications_total",
        "surface" => surface.as_str(),
        "outcome" => outcome
    )
    .increment(1);
}

/// 인증/인가 게이트 거부 카운터 증가.
///
/// `code`는 응답 본문의 에러 코드입니다 (예: `TOKEN_REVOKED`, `INSUFFICIENT_PERMISSION`).
pub fn record_auth_rejection(path: &str, status: u16, code: &'static str) {
    counter!(
        "auth_rejections_total",
        "path" => path.to_string(),
        "status" => status.to_string(),
        "code" => code
    )
    .increment(1);
}

/// 토큰 폐기 결과 카운터 증가.
pub fn record_revocation(outcome: &'static str) {
    counter!("auth_revocations_total", "outcome" => outcome).increment(1);
}

// ============================================================================
// 경로 정규화 유틸리티
// ============================================================================

/// 경로에서 동적 파라미터를 정규화합니다.
///
/// 예: `/api/v1/accounts/123e4567-e89b-12d3-a456-426614174000` → `/api/v1/accounts/:id`
pub fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            // UUID 패턴 또는 숫자만 있는 경우 :id로 대체
            let is_uuid = segment.len() == 36 && segment.chars().filter(|c| *c == '-').count() == 4;
            let is_numeric = !segment.is_empty() && segment.chars().all(|c| c.is_ascii_digit());

            if is_uuid || is_numeric {
                ":id"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}
