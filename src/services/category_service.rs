use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::categories::{CategoryList, CategoryRequest},
    entity::{
        categories::{ActiveModel, Column, Entity as Categories, Model as CategoryModel},
        products::{Column as ProductCol, Entity as Products},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Category,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub const CATEGORY_LIST_LIMIT: u64 = 100;

pub async fn list_categories(state: &AppState) -> AppResult<ApiResponse<CategoryList>> {
    let items: Vec<Category> = Categories::find()
        .order_by_asc(Column::Name)
        .limit(CATEGORY_LIST_LIMIT)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(category_from_entity)
        .collect();

    let meta = Meta::capped(CATEGORY_LIST_LIMIT, items.len());
    Ok(ApiResponse::success("Categories", CategoryList { items }, Some(meta)))
}

pub async fn create_category(
    state: &AppState,
    user: &AuthUser,
    payload: CategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    validate(&payload)?;
    let taken = Categories::find()
        .filter(Column::Name.eq(payload.name.as_str()))
        .count(&state.orm)
        .await?;
    if taken > 0 {
        return Err(AppError::Conflict(name_taken(&payload.name)));
    }

    let conflict = name_taken(&payload.name);
    let category = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name),
        label: Set(payload.label),
    }
    .insert(&state.orm)
    .await
    .map_err(|err| AppError::conflict_on_unique(err, conflict))?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "category_create",
        "categories",
        serde_json::json!({ "category_id": category.id, "name": category.name }),
    )
    .await;

    Ok(ApiResponse::success(
        "Category created",
        category_from_entity(category),
        Some(Meta::empty()),
    ))
}

/// Replaces name and label. Products keep pointing at the old name after a rename.
pub async fn update_category(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: CategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    validate(&payload)?;
    let existing = Categories::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(c) => c,
        None => return Err(AppError::NotFound),
    };

    let clash = Categories::find()
        .filter(
            Condition::all()
                .add(Column::Name.eq(payload.name.as_str()))
                .add(Column::Id.ne(id)),
        )
        .count(&state.orm)
        .await?;
    if clash > 0 {
        return Err(AppError::Conflict(name_taken(&payload.name)));
    }

    let conflict = name_taken(&payload.name);
    let mut active: ActiveModel = existing.into();
    active.name = Set(payload.name);
    active.label = Set(payload.label);
    let category = active
        .update(&state.orm)
        .await
        .map_err(|err| AppError::conflict_on_unique(err, conflict))?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "category_update",
        "categories",
        serde_json::json!({ "category_id": category.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Updated",
        category_from_entity(category),
        Some(Meta::empty()),
    ))
}

/// Refuses while any product still names this category.
pub async fn delete_category(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let category = Categories::find_by_id(id).one(&state.orm).await?;
    let category = match category {
        Some(c) => c,
        None => return Err(AppError::NotFound),
    };

    let in_use = Products::find()
        .filter(ProductCol::Category.eq(category.name.as_str()))
        .count(&state.orm)
        .await?;
    if in_use > 0 {
        return Err(AppError::Blocked(format!(
            "Cannot delete category: {in_use} products use it"
        )));
    }

    Categories::delete_by_id(id).exec(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "category_delete",
        "categories",
        serde_json::json!({ "category_id": id, "name": category.name }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({ "id": id }),
        Some(Meta::empty()),
    ))
}

fn validate(payload: &CategoryRequest) -> AppResult<()> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name is required".into()));
    }
    if payload.label.trim().is_empty() {
        return Err(AppError::BadRequest("label is required".into()));
    }
    Ok(())
}

fn name_taken(name: &str) -> String {
    format!("Category '{name}' already exists")
}

fn category_from_entity(model: CategoryModel) -> Category {
    Category {
        id: model.id,
        name: model.name,
        label: model.label,
    }
}
