use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};

use crate::{
    dto::auth::{LoginRequest, LoginResponse, RegisterRequest},
    error::AppResult,
    middleware::{auth::AuthUser, extract::ApiJson},
    models::UserSummary,
    response::{ApiResponse, Meta},
    services::auth_service::{login_user, register_user},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Register user", body = ApiResponse<UserSummary>),
        (status = 400, description = "Invalid role or missing field"),
        (status = 409, description = "Username already taken")
    ),
    tag = "Auth"
)]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<UserSummary>>)> {
    let resp = register_user(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login user", body = ApiResponse<LoginResponse>),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> AppResult<Json<ApiResponse<LoginResponse>>> {
    let resp = login_user(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Identity carried by the token", body = ApiResponse<UserSummary>),
        (status = 401, description = "Missing, invalid or expired token")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn me(user: AuthUser) -> Json<ApiResponse<UserSummary>> {
    Json(ApiResponse::success(
        "Current user",
        UserSummary::from(user),
        Some(Meta::empty()),
    ))
}
