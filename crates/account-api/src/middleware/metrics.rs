//! 요청 단위 메트릭 미들웨어.
//!
//! 라우트별 요청/응답 카운터와 처리 시간을 기록하고, 게이트가 거부한 응답은
//! [`AuthRejection`] 표식을 읽어 `auth_rejections_total`로 따로 셉니다.

use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};

use crate::auth::AuthRejection;
use crate::metrics::{
    normalize_path, record_auth_rejection, record_http_duration, record_http_request,
    record_http_response,
};

/// 메트릭 레이어. 라우터 최상단에 `middleware::from_fn`으로 붙입니다.
pub async fn metrics_layer(request: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().clone();
    let route = normalize_path(request.uri().path());

    record_http_request(method.as_str(), &route);

    let response = next.run(request).await;
    let status = response.status().as_u16();

    record_http_response(method.as_str(), &route, status);
    record_http_duration(method.as_str(), &route, started.elapsed().as_secs_f64());

    if let Some(AuthRejection(code)) = response.extensions().get::<AuthRejection>().copied() {
        record_auth_rejection(&route, status, code);
    }

    response
}
