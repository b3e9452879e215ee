use axum::{Json, Router, extract::State, routing::post};

use crate::{
    dto::seed::SeedSummary, error::AppResult, response::ApiResponse, services::seed_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/seed", post(seed))
}

#[utoipa::path(
    post,
    path = "/api/seed",
    responses(
        (status = 200, description = "Demo data created, or already present", body = ApiResponse<SeedSummary>),
        (status = 503, description = "Database unreachable")
    ),
    tag = "Seed"
)]
pub async fn seed(State(state): State<AppState>) -> AppResult<Json<ApiResponse<SeedSummary>>> {
    let resp = seed_service::seed(&state).await?;
    Ok(Json(resp))
}
