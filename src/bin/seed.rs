use butcher_orders_api::{
    config::AppConfig,
    db::{create_pool, run_migrations},
    services::seed_service,
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    let state = AppState::new(pool, &config.jwt_secret);
    // Ensure migrations are applied.
    run_migrations(&state.orm).await?;

    let resp = seed_service::seed(&state).await?;
    match resp.data {
        Some(summary) if summary.seeded => {
            println!(
                "Seed completed: {} categories, {} products",
                summary.categories, summary.products
            );
            for account in summary.users {
                println!("Created user {account}");
            }
        }
        _ => println!("{}", resp.message),
    }
    Ok(())
}
