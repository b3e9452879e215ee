use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, patch},
};
use uuid::Uuid;

use crate::{
    dto::{
        dashboard::NewOrdersCount,
        orders::{CreateOrderRequest, OrderList, UpdateOrderRequest, UpdateOrderStatusRequest},
    },
    error::AppResult,
    middleware::{
        auth::AuthUser,
        extract::{ApiJson, ApiPath, ApiQuery},
    },
    models::Order,
    response::ApiResponse,
    routes::params::OrderListQuery,
    services::{dashboard_service, order_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders).post(create_order))
        .route("/unacknowledged", get(list_unacknowledged))
        .route("/new/count", get(new_orders_count))
        .route(
            "/{id}",
            get(get_order).put(update_order).delete(delete_order),
        )
        .route("/{id}/status", patch(update_order_status))
        .route("/{id}/acknowledge", patch(acknowledge_order))
}

#[utoipa::path(
    get,
    path = "/api/orders",
    params(
        ("pickup_date" = Option<String>, Query, description = "Exact pickup date, YYYY-MM-DD"),
        ("status" = Option<String>, Query, description = "Exact status"),
        ("from_date" = Option<String>, Query, description = "Inclusive lower pickup date bound"),
        ("to_date" = Option<String>, Query, description = "Inclusive upper pickup date bound")
    ),
    responses(
        (status = 200, description = "Orders by pickup date, time slot, creation", body = ApiResponse<OrderList>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiQuery(query): ApiQuery<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = order_service::list_orders(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/unacknowledged",
    responses(
        (status = 200, description = "New orders not yet acknowledged, newest first", body = ApiResponse<OrderList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_unacknowledged(
    State(state): State<AppState>,
    _user: AuthUser,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = order_service::list_unacknowledged(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/new/count",
    responses(
        (status = 200, description = "Number of orders in status new", body = ApiResponse<NewOrdersCount>)
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn new_orders_count(
    State(state): State<AppState>,
    _user: AuthUser,
) -> AppResult<Json<ApiResponse<NewOrdersCount>>> {
    let resp = dashboard_service::new_orders_count(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    responses(
        (status = 200, description = "Order", body = ApiResponse<Order>),
        (status = 404, description = "Order not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let resp = order_service::get_order(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created", body = ApiResponse<Order>),
        (status = 400, description = "No items or missing customer")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(payload): ApiJson<CreateOrderRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Order>>)> {
    let resp = order_service::create_order(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    put,
    path = "/api/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    request_body = UpdateOrderRequest,
    responses(
        (status = 200, description = "Order updated, one changelog entry appended", body = ApiResponse<Order>),
        (status = 404, description = "Order not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn update_order(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateOrderRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let resp = order_service::update_order(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/orders/{id}/status",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<Order>),
        (status = 400, description = "Unknown status"),
        (status = 404, description = "Order not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateOrderStatusRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let resp = order_service::update_order_status(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/orders/{id}/acknowledge",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    responses(
        (status = 200, description = "Order acknowledged", body = ApiResponse<Order>),
        (status = 404, description = "Order not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn acknowledge_order(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let resp = order_service::acknowledge_order(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    responses(
        (status = 200, description = "Order deleted"),
        (status = 404, description = "Order not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn delete_order(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = order_service::delete_order(&state, &user, id).await?;
    Ok(Json(resp))
}
