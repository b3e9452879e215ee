use axum::{Json, Router, extract::State, routing::get};

use crate::{
    dto::dashboard::DashboardStats,
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    services::dashboard_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/stats", get(stats))
}

#[utoipa::path(
    get,
    path = "/api/dashboard/stats",
    responses(
        (status = 200, description = "Counts for orders picked up today", body = ApiResponse<DashboardStats>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Dashboard"
)]
pub async fn stats(
    State(state): State<AppState>,
    _user: AuthUser,
) -> AppResult<Json<ApiResponse<DashboardStats>>> {
    let resp = dashboard_service::daily_stats(&state).await?;
    Ok(Json(resp))
}
