use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::get,
};

use crate::{
    dto::customers::{CreateCustomerRequest, CustomerList},
    error::AppResult,
    middleware::{
        auth::AuthUser,
        extract::{ApiJson, ApiQuery},
    },
    models::Customer,
    response::ApiResponse,
    routes::params::CustomerQuery,
    services::customer_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_customers).post(create_customer))
}

#[utoipa::path(
    get,
    path = "/api/customers",
    params(
        ("search" = Option<String>, Query, description = "Case-insensitive match on name or phone"),
    ),
    responses(
        (status = 200, description = "List customers", body = ApiResponse<CustomerList>)
    ),
    tag = "Customers"
)]
pub async fn list_customers(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<CustomerQuery>,
) -> AppResult<Json<ApiResponse<CustomerList>>> {
    let resp = customer_service::list_customers(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/customers",
    request_body = CreateCustomerRequest,
    responses(
        (status = 201, description = "Create customer", body = ApiResponse<Customer>)
    ),
    security(("bearer_auth" = [])),
    tag = "Customers"
)]
pub async fn create_customer(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(payload): ApiJson<CreateCustomerRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Customer>>)> {
    let resp = customer_service::create_customer(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}
