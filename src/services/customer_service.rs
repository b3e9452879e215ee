use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::customers::{CreateCustomerRequest, CustomerList},
    entity::customers::{ActiveModel, Column, Entity as Customers, Model as CustomerModel},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Customer,
    response::{ApiResponse, Meta},
    routes::params::CustomerQuery,
    state::AppState,
};

pub const CUSTOMER_LIST_LIMIT: u64 = 500;

/// Case-insensitive substring search over name or phone, ordered by name.
pub async fn list_customers(
    state: &AppState,
    query: CustomerQuery,
) -> AppResult<ApiResponse<CustomerList>> {
    let mut condition = Condition::all();
    if let Some(search) = query.search.as_ref().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        let pattern = like_pattern(search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Name).ilike(pattern.clone()))
                .add(Expr::col(Column::Phone).ilike(pattern)),
        );
    }

    let items: Vec<Customer> = Customers::find()
        .filter(condition)
        .order_by_asc(Column::Name)
        .limit(CUSTOMER_LIST_LIMIT)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(customer_from_entity)
        .collect();

    let meta = Meta::capped(CUSTOMER_LIST_LIMIT, items.len());
    Ok(ApiResponse::success("Customers", CustomerList { items }, Some(meta)))
}

pub async fn create_customer(
    state: &AppState,
    user: &AuthUser,
    payload: CreateCustomerRequest,
) -> AppResult<ApiResponse<Customer>> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name is required".into()));
    }
    if payload.phone.trim().is_empty() {
        return Err(AppError::BadRequest("phone is required".into()));
    }

    let customer = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name),
        phone: Set(payload.phone),
        notes: Set(payload.notes.unwrap_or_default()),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "customer_create",
        "customers",
        serde_json::json!({ "customer_id": customer.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Customer created",
        customer_from_entity(customer),
        Some(Meta::empty()),
    ))
}

/// Inserts a customer for `phone` unless one already exists; an existing record
/// is left exactly as it is. Find and insert are separate statements, so two
/// concurrent orders for a new phone may both insert.
///
/// Returns `true` when a record was created.
pub async fn ensure_customer<C: ConnectionTrait>(
    conn: &C,
    name: &str,
    phone: &str,
    now: DateTime<Utc>,
) -> AppResult<bool> {
    let existing = Customers::find()
        .filter(Column::Phone.eq(phone))
        .one(conn)
        .await?;
    if existing.is_some() {
        return Ok(false);
    }

    ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        phone: Set(phone.to_string()),
        notes: Set(String::new()),
        created_at: Set(now.into()),
    }
    .insert(conn)
    .await?;
    tracing::debug!(phone, "customer added from order");
    Ok(true)
}

/// `%term%` with LIKE wildcards in `term` escaped so they match literally.
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

fn customer_from_entity(model: CustomerModel) -> Customer {
    Customer {
        id: model.id,
        name: model.name,
        phone: model.phone,
        notes: model.notes,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

#[cfg(test)]
mod tests {
    use super::like_pattern;

    #[test]
    fn plain_term_is_wrapped() {
        assert_eq!(like_pattern("rossi"), "%rossi%");
    }

    #[test]
    fn wildcards_match_literally() {
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }
}
