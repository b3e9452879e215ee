mod common;

use butcher_orders_api::{
    dto::auth::LoginRequest,
    routes::params::ProductQuery,
    services::{auth_service, category_service, product_service, seed_service},
};

#[tokio::test]
async fn seed_populates_an_empty_store_once() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };
    let state = common::setup_state(&database_url).await?;

    let first = seed_service::seed(&state).await?.data.expect("summary");
    assert!(first.seeded);
    assert_eq!(first.categories, 4);
    assert_eq!(first.users, vec!["counter/counter123", "prep/prep123"]);

    let products = product_service::list_products(&state, ProductQuery::default())
        .await?
        .data
        .expect("products");
    assert_eq!(products.items.len(), first.products);

    let categories = category_service::list_categories(&state)
        .await?
        .data
        .expect("categories");
    let names: Vec<&str> = categories.items.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["altro", "bovino", "preparati", "suino"]);

    // the seeded accounts can log in
    auth_service::login_user(
        &state,
        LoginRequest {
            username: "prep".into(),
            password: "prep123".into(),
        },
    )
    .await?;

    let second = seed_service::seed(&state).await?.data.expect("summary");
    assert!(!second.seeded);
    let after = product_service::list_products(&state, ProductQuery::default())
        .await?
        .data
        .expect("products");
    assert_eq!(after.items.len(), first.products);

    Ok(())
}
