//! Account API 서버 진입점.
//!
//! HTTP(axum)와 gRPC(tonic) 서버를 함께 실행하고, Ctrl+C/SIGTERM 시 둘 다 정상 종료합니다.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{http::StatusCode, middleware, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use account_api::metrics::setup_metrics_recorder;
use account_api::middleware::metrics_layer;
use account_api::routes::create_api_router;
use account_api::rpc::{account_server, auth_server};
use account_api::state::AppState;
use account_core::{init_logging, AppConfig, DatabaseConfig, LogConfig, RedisConfig};
use account_data::{
    Database, MemoryRevocationStore, MemoryUserRepository, PgUserRepository,
    RedisRevocationStore, RevocationStore, UserRepository,
};

/// 사용자 저장소 연결. URL이 없으면 메모리 저장소를 사용합니다.
async fn connect_users(config: &DatabaseConfig) -> anyhow::Result<Arc<dyn UserRepository>> {
    if config.url.is_none() {
        warn!("database.url not set, using in-memory user store (data is lost on restart)");
        return Ok(Arc::new(MemoryUserRepository::new()));
    }

    let db = Database::connect(config)
        .await
        .context("failed to connect to PostgreSQL")?;
    if config.run_migrations {
        db.migrate().await.context("failed to run migrations")?;
    }
    Ok(Arc::new(PgUserRepository::new(db)))
}

/// 토큰 폐기 목록 연결. URL이 없으면 메모리 폐기 목록을 사용합니다.
async fn connect_revocations(config: &RedisConfig) -> anyhow::Result<Arc<dyn RevocationStore>> {
    if config.url.is_none() {
        warn!("redis.url not set, using in-memory revocation store (not shared between instances)");
        return Ok(Arc::new(MemoryRevocationStore::new()));
    }

    let store = RedisRevocationStore::connect(config)
        .await
        .context("failed to connect to Redis")?;
    Ok(Arc::new(store))
}

/// 메트릭 엔드포인트 핸들러.
async fn metrics_handler(
    axum::extract::State(handle): axum::extract::State<PrometheusHandle>,
) -> String {
    handle.render()
}

/// CORS 레이어.
///
/// `CORS_ORIGINS` 환경 변수(쉼표 구분)가 있으면 해당 origin만 허용합니다.
fn cors_layer() -> CorsLayer {
    let origins: Vec<_> = std::env::var("CORS_ORIGINS")
        .unwrap_or_default()
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    let allow_origin = if origins.is_empty() {
        warn!("CORS_ORIGINS not set, allowing any origin (development mode)");
        AllowOrigin::any()
    } else {
        info!("CORS configured with {} allowed origins", origins.len());
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
            axum::http::header::ACCEPT,
        ])
        .max_age(Duration::from_secs(3600))
}

fn create_router(
    state: Arc<AppState>,
    metrics_handle: PrometheusHandle,
    timeout: Duration,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metrics_handle);

    Router::new()
        .merge(metrics_router)
        .merge(create_api_router(state))
        .layer(middleware::from_fn(metrics_layer))
        .layer(TraceLayer::new_for_http())
        // 타임아웃 시 408
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout))
        .layer(cors_layer())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 서명 키가 없으면 여기서 종료
    let config = AppConfig::load_default().context("failed to load configuration")?;

    init_logging(LogConfig::from(&config.logging))
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {e}"))?;

    info!("Starting Account API server...");

    let metrics_handle =
        setup_metrics_recorder().context("failed to install Prometheus recorder")?;

    let http_addr = config.server.http_addr().context("invalid server.host/http_port")?;
    let grpc_addr = config.server.grpc_addr().context("invalid server.host/grpc_port")?;
    let timeout = Duration::from_secs(config.server.request_timeout_secs);

    let users = connect_users(&config.database).await?;
    let revocations = connect_revocations(&config.redis).await?;
    let state = Arc::new(AppState::new(&config.auth, users, revocations));

    info!(
        version = %state.version,
        user_store = state.users.backend(),
        revocation_store = state.revocations.backend(),
        "Application state initialized"
    );

    let shutdown_token = CancellationToken::new();

    let app = create_router(Arc::clone(&state), metrics_handle, timeout);
    let listener = tokio::net::TcpListener::bind(http_addr)
        .await
        .with_context(|| format!("failed to bind HTTP listener on {http_addr}"))?;

    info!(%http_addr, "HTTP server listening");
    info!(%grpc_addr, "gRPC server listening");

    let http_shutdown = shutdown_token.clone();
    let http = async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { http_shutdown.cancelled().await })
            .await
            .context("HTTP server error")
    };

    let grpc_shutdown = shutdown_token.clone();
    let grpc = async move {
        tonic::transport::Server::builder()
            .timeout(timeout)
            .add_service(auth_server(&state))
            .add_service(account_server(&state))
            .serve_with_shutdown(grpc_addr, async move { grpc_shutdown.cancelled().await })
            .await
            .context("gRPC server error")
    };

    tokio::spawn(shutdown_signal(shutdown_token.clone()));

    let result = tokio::try_join!(http, grpc);

    // 한쪽이 실패하면 다른 쪽도 종료
    shutdown_token.cancel();
    if let Err(e) = &result {
        error!(error = %e, "Server terminated with error");
    }
    result?;

    info!("Server stopped gracefully");
    Ok(())
}

async fn shutdown_signal(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        }
        _ = shutdown_token.cancelled() => return,
    }

    shutdown_token.cancel();
    info!("Shutdown signal propagated to HTTP and gRPC servers");
}
