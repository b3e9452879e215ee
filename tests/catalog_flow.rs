mod common;

use butcher_orders_api::{
    dto::{
        categories::CategoryRequest,
        customers::CreateCustomerRequest,
        products::{CreateProductRequest, UpdateProductRequest},
    },
    error::AppError,
    models::Role,
    routes::params::{CustomerQuery, ProductQuery},
    services::{category_service, customer_service, product_service, seed_service},
};

// Categories, products and customers as the counter staff manage them.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn catalog_and_customers_flow() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };
    let state = common::setup_state(&database_url).await?;
    let counter = common::create_user(&state, "counter", Role::Counter).await?;

    let category = |name: &str, label: &str| CategoryRequest {
        name: name.into(),
        label: label.into(),
    };

    let bovino = category_service::create_category(&state, &counter, category("bovino", "Bovino"))
        .await?
        .data
        .expect("category");
    let suino = category_service::create_category(&state, &counter, category("suino", "Suino"))
        .await?
        .data
        .expect("category");

    let duplicate =
        category_service::create_category(&state, &counter, category("bovino", "Manzo")).await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));

    // renaming onto another category's name is a conflict, keeping its own name is not
    let clash =
        category_service::update_category(&state, &counter, suino.id, category("bovino", "X"))
            .await;
    assert!(matches!(clash, Err(AppError::Conflict(_))));
    let relabelled =
        category_service::update_category(&state, &counter, suino.id, category("suino", "Maiale"))
            .await?
            .data
            .expect("category");
    assert_eq!(relabelled.label, "Maiale");

    // Simultaneous creates of one name: one wins, every other attempt is a Conflict
    let attempts: Vec<_> = (0..8)
        .map(|_| {
            let state = state.clone();
            let counter = counter.clone();
            tokio::spawn(async move {
                category_service::create_category(
                    &state,
                    &counter,
                    CategoryRequest {
                        name: "preparati".into(),
                        label: "Preparati".into(),
                    },
                )
                .await
            })
        })
        .collect();
    let mut created = 0;
    for attempt in attempts {
        match attempt.await? {
            Ok(_) => created += 1,
            Err(AppError::Conflict(message)) => {
                assert_eq!(message, "Category 'preparati' already exists")
            }
            Err(other) => panic!("expected Conflict, got {other:?}"),
        }
    }
    assert_eq!(created, 1);

    let orphan = product_service::create_product(
        &state,
        &counter,
        CreateProductRequest {
            name: "Agnello".into(),
            category: "ovino".into(),
            description: None,
            unit: "kg".into(),
            price: None,
        },
    )
    .await;
    assert!(matches!(orphan, Err(AppError::BadRequest(_))));

    let steak = product_service::create_product(
        &state,
        &counter,
        CreateProductRequest {
            name: "Bistecca".into(),
            category: "bovino".into(),
            description: Some("Scottona".into()),
            unit: "kg".into(),
            price: Some(24.5),
        },
    )
    .await?
    .data
    .expect("product");
    product_service::create_product(
        &state,
        &counter,
        CreateProductRequest {
            name: "Salsiccia".into(),
            category: "suino".into(),
            description: None,
            unit: "kg".into(),
            price: None,
        },
    )
    .await?;

    let updated = product_service::update_product(
        &state,
        &counter,
        steak.id,
        UpdateProductRequest {
            price: Some(26.0),
            ..Default::default()
        },
    )
    .await?
    .data
    .expect("product");
    assert_eq!(updated.price, Some(26.0));
    assert_eq!(updated.name, "Bistecca");
    assert_eq!(updated.description, "Scottona");

    let beef_only = product_service::list_products(
        &state,
        ProductQuery {
            category: Some("bovino".into()),
        },
    )
    .await?
    .data
    .expect("products");
    assert_eq!(beef_only.items.len(), 1);
    assert_eq!(beef_only.items[0].id, steak.id);

    let blocked = category_service::delete_category(&state, &counter, bovino.id).await;
    match blocked {
        Err(AppError::Blocked(message)) => assert!(message.contains("1 products"), "{message}"),
        other => panic!("expected Blocked, got {other:?}"),
    }

    product_service::delete_product(&state, &counter, steak.id).await?;
    category_service::delete_category(&state, &counter, bovino.id).await?;
    let gone = product_service::delete_product(&state, &counter, steak.id).await;
    assert!(matches!(gone, Err(AppError::NotFound)));

    for (name, phone) in [("Maria Rossi", "333 1234567"), ("Giuseppe Verdi", "347 7654321")] {
        customer_service::create_customer(
            &state,
            &counter,
            CreateCustomerRequest {
                name: name.into(),
                phone: phone.into(),
                notes: None,
            },
        )
        .await?;
    }

    let by_name = customer_service::list_customers(
        &state,
        CustomerQuery {
            search: Some("rOSSi".into()),
        },
    )
    .await?
    .data
    .expect("customers");
    assert_eq!(by_name.items.len(), 1);
    assert_eq!(by_name.items[0].name, "Maria Rossi");

    let by_phone = customer_service::list_customers(
        &state,
        CustomerQuery {
            search: Some("7654".into()),
        },
    )
    .await?
    .data
    .expect("customers");
    assert_eq!(by_phone.items.len(), 1);
    assert_eq!(by_phone.items[0].name, "Giuseppe Verdi");

    // a literal wildcard matches nothing here
    let wildcard = customer_service::list_customers(
        &state,
        CustomerQuery {
            search: Some("%".into()),
        },
    )
    .await?
    .data
    .expect("customers");
    assert!(wildcard.items.is_empty());

    // products exist, so seeding leaves the catalog alone
    let seeded = seed_service::seed(&state).await?;
    assert_eq!(seeded.message, "Data already present");
    assert!(!seeded.data.expect("summary").seeded);

    Ok(())
}
