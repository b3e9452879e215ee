use uuid::Uuid;

use crate::{
    audit,
    dto::products::{CreateProductRequest, ProductList, UpdateProductRequest},
    entity::{
        categories::{Column as CategoryCol, Entity as Categories},
        products::{ActiveModel, Column, Entity as Products, Model as ProductModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Product,
    response::{ApiResponse, Meta},
    routes::params::ProductQuery,
    state::AppState,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};

pub const PRODUCT_LIST_LIMIT: u64 = 500;

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let mut finder = Products::find();
    if let Some(category) = query.category.as_ref().filter(|c| !c.is_empty()) {
        finder = finder.filter(Column::Category.eq(category.as_str()));
    }

    let items: Vec<Product> = finder
        .order_by_asc(Column::Name)
        .limit(PRODUCT_LIST_LIMIT)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(product_from_entity)
        .collect();

    let meta = Meta::capped(PRODUCT_LIST_LIMIT, items.len());
    Ok(ApiResponse::success("Products", ProductList { items }, Some(meta)))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name is required".into()));
    }
    ensure_category_exists(&state.orm, &payload.category).await?;

    let active = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name),
        category: Set(payload.category),
        description: Set(payload.description.unwrap_or_default()),
        unit: Set(payload.unit),
        price: Set(payload.price),
    };
    let product = active.insert(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "product_create",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Product created",
        product_from_entity(product),
        Some(Meta::empty()),
    ))
}

/// Applies only the fields present in `payload`.
pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    let existing = Products::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    let mut active: ActiveModel = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(category) = payload.category {
        ensure_category_exists(&state.orm, &category).await?;
        active.category = Set(category);
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    if let Some(unit) = payload.unit {
        active.unit = Set(unit);
    }
    if let Some(price) = payload.price {
        active.price = Set(Some(price));
    }

    // Nothing changed: `update` would issue an empty UPDATE, so hand back the stored row.
    let product = if active.is_changed() {
        active.update(&state.orm).await?
    } else {
        Products::find_by_id(id)
            .one(&state.orm)
            .await?
            .ok_or(AppError::NotFound)?
    };

    audit::record(
        &state.pool,
        Some(user.user_id),
        "product_update",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Updated",
        product_from_entity(product),
        Some(Meta::empty()),
    ))
}

pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = Products::delete_by_id(id).exec(&state.orm).await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        &state.pool,
        Some(user.user_id),
        "product_delete",
        "products",
        serde_json::json!({ "product_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({ "id": id }),
        Some(Meta::empty()),
    ))
}

async fn ensure_category_exists<C: ConnectionTrait>(conn: &C, name: &str) -> AppResult<()> {
    let found = Categories::find()
        .filter(CategoryCol::Name.eq(name))
        .count(conn)
        .await?;
    if found == 0 {
        return Err(AppError::BadRequest(format!("unknown category '{name}'")));
    }
    Ok(())
}

pub(crate) fn product_from_entity(model: ProductModel) -> Product {
    Product {
        id: model.id,
        name: model.name,
        category: model.category,
        description: model.description,
        unit: model.unit,
        price: model.price,
    }
}
