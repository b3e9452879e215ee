use axum::Router;

use crate::state::AppState;

pub mod auth;
pub mod categories;
pub mod customers;
pub mod dashboard;
pub mod doc;
pub mod health;
pub mod orders;
pub mod params;
pub mod products;
pub mod seed;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/products", products::router())
        .nest("/categories", categories::router())
        .nest("/customers", customers::router())
        .nest("/orders", orders::router())
        .nest("/dashboard", dashboard::router())
        .merge(seed::router())
}
