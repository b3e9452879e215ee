use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set,
    TransactionTrait,
};
use uuid::Uuid;

use crate::{
    dto::seed::SeedSummary,
    entity::{
        categories::{ActiveModel as CategoryActive, Entity as Categories},
        products::{ActiveModel as ProductActive, Entity as Products},
        users::{ActiveModel as UserActive, Column as UserCol, Entity as Users},
    },
    error::{AppError, AppResult},
    models::Role,
    response::{ApiResponse, Meta},
    services::auth_service::hash_password,
    state::AppState,
};

const DEFAULT_CATEGORIES: &[(&str, &str)] = &[
    ("bovino", "Bovino"),
    ("suino", "Suino"),
    ("preparati", "Preparati"),
    ("altro", "Altro"),
];

/// (name, category, description, unit)
const DEFAULT_PRODUCTS: &[(&str, &str, &str, &str)] = &[
    ("Arrosto di Vitello", "bovino", "Arrosto classico di vitello", "kg"),
    ("Bistecca di Scottona", "bovino", "Scottona di razza pregiata", "kg"),
    ("Tagliata di Scottona", "bovino", "Tagliata di scottona", "kg"),
    ("Costata di Scottona", "bovino", "Costata con osso", "kg"),
    ("Fettine di Vitello", "bovino", "Fettine per scaloppine", "kg"),
    ("Macinato di Bovino", "bovino", "Carne macinata fresca", "kg"),
    ("Spezzatino di Bovino", "bovino", "Per stufati e spezzatini", "kg"),
    ("Arrosto di Maiale", "suino", "Arrosto classico di maiale", "kg"),
    ("Costine di Maiale", "suino", "Costine per grigliata", "kg"),
    ("Braciole di Maiale", "suino", "Braciole con osso", "kg"),
    ("Salsiccia Fresca", "suino", "Salsiccia artigianale", "kg"),
    ("Salsiccia Pasqualora", "suino", "Specialità siciliana", "kg"),
    ("Porchetta Artigianale", "suino", "Porchetta fatta in casa", "kg"),
    ("Involtini di Carne", "preparati", "Involtini ripieni", "pz"),
    ("Polpette", "preparati", "Polpette pronte da cuocere", "kg"),
    ("Hamburger", "preparati", "Hamburger artigianali", "pz"),
    ("Spiedini Misti", "preparati", "Spiedini di carne mista", "pz"),
    ("Tramezzini con Mozzarella", "preparati", "Tramezzini ripieni", "pz"),
    ("Cotolette Impanate", "preparati", "Cotolette pronte da friggere", "pz"),
    ("Pollo Intero", "altro", "Pollo ruspante", "pz"),
    ("Petto di Pollo", "altro", "Petto di pollo fresco", "kg"),
    ("Coniglio", "altro", "Coniglio intero", "pz"),
];

/// (username, password, role)
const DEFAULT_USERS: &[(&str, &str, Role)] = &[
    ("counter", "counter123", Role::Counter),
    ("prep", "prep123", Role::Prep),
];

/// Load demo data once. Does nothing when any product already exists.
pub async fn seed(state: &AppState) -> AppResult<ApiResponse<SeedSummary>> {
    let existing_products = Products::find().count(&state.orm).await.map_err(|err| {
        tracing::error!(error = %err, "seed check failed");
        AppError::Unavailable("database unreachable".into())
    })?;

    if existing_products > 0 {
        return Ok(ApiResponse::success(
            "Data already present",
            SeedSummary {
                seeded: false,
                categories: 0,
                products: 0,
                users: Vec::new(),
            },
            Some(Meta::empty()),
        ));
    }

    let txn = state.orm.begin().await?;

    let mut categories = 0;
    if Categories::find().count(&txn).await? == 0 {
        for (name, label) in DEFAULT_CATEGORIES {
            CategoryActive {
                id: Set(Uuid::new_v4()),
                name: Set(name.to_string()),
                label: Set(label.to_string()),
            }
            .insert(&txn)
            .await?;
            categories += 1;
        }
    }

    for (name, category, description, unit) in DEFAULT_PRODUCTS {
        ProductActive {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            category: Set(category.to_string()),
            description: Set(description.to_string()),
            unit: Set(unit.to_string()),
            price: Set(None),
        }
        .insert(&txn)
        .await?;
    }

    let mut users = Vec::new();
    for (username, password, role) in DEFAULT_USERS {
        let exists = Users::find()
            .filter(UserCol::Username.eq(*username))
            .count(&txn)
            .await?;
        if exists > 0 {
            continue;
        }
        UserActive {
            id: Set(Uuid::new_v4()),
            username: Set(username.to_string()),
            password_hash: Set(hash_password(password)?),
            role: Set(*role),
            created_at: Set(Utc::now().into()),
        }
        .insert(&txn)
        .await?;
        users.push(format!("{username}/{password}"));
    }

    txn.commit().await?;
    tracing::info!(
        categories,
        products = DEFAULT_PRODUCTS.len(),
        users = users.len(),
        "demo data seeded"
    );

    Ok(ApiResponse::success(
        "Demo data created",
        SeedSummary {
            seeded: true,
            categories,
            products: DEFAULT_PRODUCTS.len(),
            users,
        },
        Some(Meta::empty()),
    ))
}
