#![allow(dead_code)]

use butcher_orders_api::{
    db::{create_pool, run_migrations},
    entity::users::ActiveModel as UserActive,
    middleware::auth::AuthUser,
    models::Role,
    state::AppState,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set, Statement};
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

pub const TEST_SECRET: &str = "test-secret";

/// Database for integration tests, if one is configured.
pub fn database_url() -> Option<String> {
    match std::env::var("TEST_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL")) {
        Ok(url) => Some(url),
        Err(_) => {
            eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests.");
            None
        }
    }
}

pub async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    let pool = create_pool(database_url).await?;
    let state = AppState::new(pool, TEST_SECRET);
    run_migrations(&state.orm).await?;

    // Clean tables between runs
    let backend = state.orm.get_database_backend();
    state
        .orm
        .execute(Statement::from_string(
            backend,
            "TRUNCATE TABLE audit_logs, orders, customers, products, categories, users RESTART IDENTITY CASCADE",
        ))
        .await?;

    Ok(state)
}

/// State whose pool never connects; enough for requests rejected before any query.
pub fn offline_state() -> AppState {
    let pool = PgPoolOptions::new()
        .connect_lazy("postgres://offline@127.0.0.1:1/none")
        .expect("lazy pool");
    AppState::new(pool, TEST_SECRET)
}

pub async fn create_user(state: &AppState, username: &str, role: Role) -> anyhow::Result<AuthUser> {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        username: Set(username.to_string()),
        password_hash: Set("dummy".into()),
        role: Set(role),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.orm)
    .await?;

    Ok(AuthUser {
        user_id: user.id,
        username: user.username,
        role: user.role,
    })
}
