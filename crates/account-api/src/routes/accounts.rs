//! 계정 endpoint.
//!
//! | 경로 | 인증 |
//! |---|---|
//! | `POST /register`, `POST /login` | 없음 |
//! | `POST /logout` | 헤더만 (서명 검증 없음) |
//! | `GET /profile`, `PUT /update`, `DELETE /delete/{id}` | 인증 게이트 |
//! | `GET /list`, `GET /{id}` | 인증 게이트 + 관리자 |

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::de::DeserializeOwned;

use account_core::User;

use crate::auth::{
    require_auth, require_roles, AuthError, Authenticated, LogoutError, RoleGate, TokenService,
};
use crate::error::{ApiErrorResponse, ApiSuccess};
use crate::services::{AccountError, LoginRequest, LoginResponse, RegisterRequest, UpdateRequest};
use crate::state::AppState;

/// JSON 본문 파싱 실패를 통합 에러 형식으로 변환합니다.
fn json_body<T: DeserializeOwned>(
    body: Result<Json<T>, JsonRejection>,
) -> Result<T, Response> {
    body.map(|Json(value)| value).map_err(|rejection| {
        ApiErrorResponse::new("INVALID_JSON", rejection.body_text())
            .into_response_with(StatusCode::BAD_REQUEST)
    })
}

/// POST /register
pub async fn register(
    State(state): State<Arc<AppState>>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, Response> {
    let request = json_body(body)?;
    let user = state
        .accounts
        .register(request)
        .await
        .map_err(IntoResponse::into_response)?;

    Ok((
        StatusCode::CREATED,
        Json(ApiSuccess::new("User created successfully", user)),
    ))
}

/// POST /login
pub async fn login(
    State(state): State<Arc<AppState>>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<ApiSuccess<LoginResponse>>, Response> {
    let request = json_body(body)?;
    let response = state
        .accounts
        .login(request)
        .await
        .map_err(IntoResponse::into_response)?;

    Ok(Json(ApiSuccess::new("Login successful", response)))
}

/// POST /logout
///
/// 본문은 필요 없습니다.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ApiSuccess<()>>, Response> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| AuthError::MissingToken.into_response())?
        .to_str()
        .map_err(|_| LogoutError::InvalidFormat.into_response())?;

    state
        .tokens
        .logout(header)
        .await
        .map_err(IntoResponse::into_response)?;

    Ok(Json(ApiSuccess::message("Logout successful")))
}

/// GET /profile
pub async fn profile(
    State(state): State<Arc<AppState>>,
    Authenticated(identity): Authenticated,
) -> Result<Json<ApiSuccess<User>>, AccountError> {
    let user = state.accounts.profile(&identity).await?;
    Ok(Json(ApiSuccess::new("User profile retrieved", user)))
}

/// PUT /update
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Authenticated(identity): Authenticated,
    body: Result<Json<UpdateRequest>, JsonRejection>,
) -> Result<Json<ApiSuccess<User>>, Response> {
    let request = json_body(body)?;
    let user = state
        .accounts
        .update(&identity, request)
        .await
        .map_err(IntoResponse::into_response)?;

    Ok(Json(ApiSuccess::new("User updated successfully", user)))
}

/// DELETE /delete/{id}
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiSuccess<()>>, AccountError> {
    state.accounts.delete(&id).await?;
    Ok(Json(ApiSuccess::message("User deleted successfully")))
}

/// GET /list (관리자)
pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiSuccess<Vec<User>>>, AccountError> {
    let users = state.accounts.list().await?;
    Ok(Json(ApiSuccess::new("Users retrieved", users)))
}

/// GET /{id} (관리자)
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiSuccess<User>>, AccountError> {
    let user = state.accounts.get(&id).await?;
    Ok(Json(ApiSuccess::new("User retrieved", user)))
}

/// 계정 라우터 생성.
pub fn accounts_router(tokens: Arc<TokenService>) -> Router<Arc<AppState>> {
    let admin = Router::new()
        .route("/list", get(list_users))
        .route("/{id}", get(get_user))
        .route_layer(middleware::from_fn_with_state(
            RoleGate::admin_only(),
            require_roles,
        ));

    let protected = Router::new()
        .route("/profile", get(profile))
        .route("/update", put(update_profile))
        .route("/delete/{id}", delete(delete_user))
        .merge(admin)
        .route_layer(middleware::from_fn_with_state(tokens, require_auth));

    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .merge(protected)
}
