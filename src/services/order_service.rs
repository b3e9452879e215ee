use std::collections::HashMap;

use chrono::{DateTime, Datelike, NaiveDate, SubsecRound, Utc};
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::orders::{
        CreateOrderRequest, OrderItemInput, OrderList, UpdateOrderRequest,
        UpdateOrderStatusRequest,
    },
    entity::orders::{
        ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel,
        ModificationList, OrderItemList,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Modification, Order, OrderItem, OrderStatus},
    response::{ApiResponse, Meta},
    routes::params::OrderListQuery,
    services::customer_service,
    state::AppState,
};

pub const ORDER_LIST_LIMIT: u64 = 1000;
pub const UNACKNOWLEDGED_LIMIT: u64 = 100;

/// Changelog text when an update touched none of the tracked fields.
const GENERIC_MODIFICATION: &str = "Order updated";

/// Which pickup dates a listing covers. Range bounds win over an exact date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickupWindow {
    Any,
    Exact(NaiveDate),
    Range {
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    },
}

impl PickupWindow {
    pub fn from_query(query: &OrderListQuery) -> Self {
        match (query.from_date, query.to_date, query.pickup_date) {
            (None, None, Some(date)) => PickupWindow::Exact(date),
            (None, None, None) => PickupWindow::Any,
            (from, to, _) => PickupWindow::Range { from, to },
        }
    }

    fn condition(self) -> Condition {
        let mut condition = Condition::all();
        match self {
            PickupWindow::Any => {}
            PickupWindow::Exact(date) => {
                condition = condition.add(OrderCol::PickupDate.eq(date));
            }
            PickupWindow::Range { from, to } => {
                if let Some(from) = from {
                    condition = condition.add(OrderCol::PickupDate.gte(from));
                }
                if let Some(to) = to {
                    condition = condition.add(OrderCol::PickupDate.lte(to));
                }
            }
        }
        condition
    }
}

/// Result of merging a submitted item list into the stored one.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedItems {
    pub items: Vec<OrderItem>,
    /// Lines whose product was not on the order before this update.
    pub added: usize,
}

/// What an update touched, as far as the changelog is concerned.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ChangeSummary {
    /// `Some(n)` when an item list was submitted, `n` being the newly added lines.
    pub items_added: Option<usize>,
    pub pickup_date: Option<NaiveDate>,
    pub pickup_time_slot: Option<String>,
    pub notes: bool,
}

/// Timestamps are kept at the microsecond precision Postgres stores, so a value
/// copied into the JSON item list compares equal to the same value in a column.
pub fn timestamp_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

pub fn format_order_number(existing_in_year: u64, year: i32) -> String {
    format!("{}/{}", existing_in_year + 1, year)
}

fn year_bounds(year: i32) -> AppResult<(DateTime<Utc>, DateTime<Utc>)> {
    let start = |y: i32| {
        NaiveDate::from_ymd_opt(y, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("year {y} out of range")))
    };
    Ok((start(year)?, start(year + 1)?))
}

/// Next `<n>/<year>` label: one more than the orders already created this year.
///
/// The count and the later insert are separate statements with no lock between
/// them. Two orders created concurrently in the same year can therefore read the
/// same count and receive the same number. That duplication is accepted; the
/// number is a human-facing label and the order id stays unique.
pub async fn next_order_number<C: ConnectionTrait>(
    conn: &C,
    now: DateTime<Utc>,
) -> AppResult<String> {
    let year = now.year();
    let (start, end) = year_bounds(year)?;
    let existing = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::CreatedAt.gte(start.fixed_offset()))
                .add(OrderCol::CreatedAt.lt(end.fixed_offset())),
        )
        .count(conn)
        .await?;
    Ok(format_order_number(existing, year))
}

fn item_from_input(input: OrderItemInput) -> OrderItem {
    OrderItem {
        product_id: input.product_id,
        product_name: input.product_name,
        quantity: input.quantity,
        unit: input.unit,
        notes: input.notes.unwrap_or_default(),
        is_new: false,
        added_at: None,
    }
}

/// Compare `incoming` against `previous` by product id.
///
/// A product missing from `previous` is marked new at `now`. A product already
/// marked new keeps its marker and its original `added_at`. Anything else is
/// unmarked, whatever the client sent.
pub fn merge_items(
    previous: &[OrderItem],
    incoming: Vec<OrderItemInput>,
    now: DateTime<Utc>,
) -> MergedItems {
    let mut known: HashMap<Uuid, &OrderItem> = HashMap::with_capacity(previous.len());
    for item in previous {
        // first occurrence wins for duplicated products
        known.entry(item.product_id).or_insert(item);
    }

    let mut added = 0;
    let items = incoming
        .into_iter()
        .map(|input| {
            let mut item = item_from_input(input);
            match known.get(&item.product_id) {
                None => {
                    item.is_new = true;
                    item.added_at = Some(now);
                    added += 1;
                }
                Some(prev) if prev.is_new => {
                    item.is_new = true;
                    item.added_at = prev.added_at;
                }
                Some(_) => {}
            }
            item
        })
        .collect();

    MergedItems { items, added }
}

/// One changelog line for one update, clauses joined and the first letter capitalized.
pub fn describe_changes(changes: &ChangeSummary) -> String {
    let mut clauses: Vec<String> = Vec::new();
    match changes.items_added {
        Some(0) => clauses.push("products updated".into()),
        Some(1) => clauses.push("1 product added".into()),
        Some(n) => clauses.push(format!("{n} products added")),
        None => {}
    }
    if let Some(date) = changes.pickup_date {
        clauses.push(format!("pickup date: {date}"));
    }
    if let Some(slot) = &changes.pickup_time_slot {
        clauses.push(format!("time slot: {slot}"));
    }
    if changes.notes {
        clauses.push("notes updated".into());
    }

    if clauses.is_empty() {
        return GENERIC_MODIFICATION.to_string();
    }
    capitalize_first(&clauses.join(", "))
}

fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub async fn list_orders(
    state: &AppState,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let mut condition = PickupWindow::from_query(&query).condition();
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status));
    }

    let items: Vec<Order> = Orders::find()
        .filter(condition)
        .order_by_asc(OrderCol::PickupDate)
        .order_by_asc(OrderCol::PickupTimeSlot)
        .order_by_asc(OrderCol::CreatedAt)
        .limit(ORDER_LIST_LIMIT)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_from_entity)
        .collect();

    let meta = Meta::capped(ORDER_LIST_LIMIT, items.len());
    Ok(ApiResponse::success("Orders", OrderList { items }, Some(meta)))
}

/// New orders nobody has acknowledged yet, newest first.
pub async fn list_unacknowledged(state: &AppState) -> AppResult<ApiResponse<OrderList>> {
    let items: Vec<Order> = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::Status.eq(OrderStatus::New))
                .add(OrderCol::Acknowledged.eq(false)),
        )
        .order_by_desc(OrderCol::CreatedAt)
        .limit(UNACKNOWLEDGED_LIMIT)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_from_entity)
        .collect();

    let meta = Meta::capped(UNACKNOWLEDGED_LIMIT, items.len());
    Ok(ApiResponse::success("Orders", OrderList { items }, Some(meta)))
}

pub async fn get_order(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Order>> {
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .map(order_from_entity);
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };
    Ok(ApiResponse::success("OK", order, Some(Meta::empty())))
}

pub async fn create_order(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<Order>> {
    if payload.items.is_empty() {
        return Err(AppError::BadRequest("an order needs at least one item".into()));
    }
    if payload.customer_name.trim().is_empty() {
        return Err(AppError::BadRequest("customer_name is required".into()));
    }
    if payload.customer_phone.trim().is_empty() {
        return Err(AppError::BadRequest("customer_phone is required".into()));
    }

    let now = timestamp_now();
    let txn = state.orm.begin().await?;

    let order_number = next_order_number(&txn, now).await?;
    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        order_number: Set(order_number),
        customer_name: Set(payload.customer_name.clone()),
        customer_phone: Set(payload.customer_phone.clone()),
        items: Set(OrderItemList(
            payload.items.into_iter().map(item_from_input).collect(),
        )),
        pickup_date: Set(payload.pickup_date),
        pickup_time_slot: Set(payload.pickup_time_slot),
        status: Set(OrderStatus::New),
        notes: Set(payload.notes.unwrap_or_default()),
        created_at: Set(now.into()),
        created_by: Set(user.username.clone()),
        updated_at: Set(None),
        modifications: Set(ModificationList::default()),
        acknowledged: Set(false),
        acknowledged_at: Set(None),
        acknowledged_by: Set(None),
    }
    .insert(&txn)
    .await?;

    customer_service::ensure_customer(
        &txn,
        &payload.customer_name,
        &payload.customer_phone,
        now,
    )
    .await?;

    txn.commit().await?;

    tracing::info!(
        order_id = %order.id,
        order_number = %order.order_number,
        created_by = %user.username,
        "order created"
    );
    audit::record(
        &state.pool,
        Some(user.user_id),
        "order_create",
        "orders",
        serde_json::json!({ "order_id": order.id, "order_number": order.order_number }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order created",
        order_from_entity(order),
        Some(Meta::empty()),
    ))
}

/// Partial update. Every call stamps `updated_at` and appends exactly one changelog entry.
pub async fn update_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderRequest,
) -> AppResult<ApiResponse<Order>> {
    if payload.items.as_ref().is_some_and(|items| items.is_empty()) {
        return Err(AppError::BadRequest("an order needs at least one item".into()));
    }

    let now = timestamp_now();
    let txn = state.orm.begin().await?;

    let existing = Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    let existing = match existing {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    let previous_items = existing.items.0.clone();
    let mut modifications = existing.modifications.0.clone();
    let mut changes = ChangeSummary::default();
    let mut active: OrderActive = existing.into();

    if let Some(name) = payload.customer_name {
        active.customer_name = Set(name);
    }
    if let Some(phone) = payload.customer_phone {
        active.customer_phone = Set(phone);
    }
    if let Some(items) = payload.items {
        let merged = merge_items(&previous_items, items, now);
        changes.items_added = Some(merged.added);
        active.items = Set(OrderItemList(merged.items));
    }
    if let Some(date) = payload.pickup_date {
        changes.pickup_date = Some(date);
        active.pickup_date = Set(date);
    }
    if let Some(slot) = payload.pickup_time_slot {
        changes.pickup_time_slot = Some(slot.clone());
        active.pickup_time_slot = Set(slot);
    }
    if let Some(notes) = payload.notes {
        changes.notes = true;
        active.notes = Set(notes);
    }

    let description = describe_changes(&changes);
    modifications.push(Modification {
        date: now,
        description: description.clone(),
        modified_by: user.username.clone(),
    });
    active.modifications = Set(ModificationList(modifications));
    active.updated_at = Set(Some(now.into()));

    let order = active.update(&txn).await?;
    txn.commit().await?;

    tracing::info!(order_id = %order.id, change = %description, "order updated");
    audit::record(
        &state.pool,
        Some(user.user_id),
        "order_update",
        "orders",
        serde_json::json!({ "order_id": order.id, "description": description }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order updated",
        order_from_entity(order),
        Some(Meta::empty()),
    ))
}

/// Sets any of the six statuses regardless of the current one. No changelog entry is written.
pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    let status = payload
        .status
        .parse::<OrderStatus>()
        .map_err(AppError::BadRequest)?;

    let existing = Orders::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };
    let previous = existing.status;

    let mut active: OrderActive = existing.into();
    active.status = Set(status);
    active.updated_at = Set(Some(timestamp_now().into()));
    let order = active.update(&state.orm).await?;

    tracing::info!(order_id = %order.id, from = %previous, to = %status, "order status changed");
    audit::record(
        &state.pool,
        Some(user.user_id),
        "order_status",
        "orders",
        serde_json::json!({ "order_id": order.id, "from": previous, "to": status }),
    )
    .await;

    Ok(ApiResponse::success(
        "Status updated",
        order_from_entity(order),
        Some(Meta::empty()),
    ))
}

/// Marks the order as seen. A second call keeps the first timestamp and actor.
pub async fn acknowledge_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    let txn = state.orm.begin().await?;
    let existing = Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    let existing = match existing {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    if existing.acknowledged {
        txn.commit().await?;
        return Ok(ApiResponse::success(
            "Order already acknowledged",
            order_from_entity(existing),
            Some(Meta::empty()),
        ));
    }

    let mut active: OrderActive = existing.into();
    active.acknowledged = Set(true);
    active.acknowledged_at = Set(Some(timestamp_now().into()));
    active.acknowledged_by = Set(Some(user.username.clone()));
    let order = active.update(&txn).await?;
    txn.commit().await?;

    tracing::debug!(order_id = %order.id, by = %user.username, "order acknowledged");

    Ok(ApiResponse::success(
        "Order acknowledged",
        order_from_entity(order),
        Some(Meta::empty()),
    ))
}

pub async fn delete_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = Orders::delete_by_id(id).exec(&state.orm).await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    tracing::info!(order_id = %id, by = %user.username, "order deleted");
    audit::record(
        &state.pool,
        Some(user.user_id),
        "order_delete",
        "orders",
        serde_json::json!({ "order_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({ "id": id }),
        Some(Meta::empty()),
    ))
}

pub(crate) fn order_from_entity(model: OrderModel) -> Order {
    Order {
        id: model.id,
        order_number: model.order_number,
        customer_name: model.customer_name,
        customer_phone: model.customer_phone,
        items: model.items.0,
        pickup_date: model.pickup_date,
        pickup_time_slot: model.pickup_time_slot,
        status: model.status,
        notes: model.notes,
        created_at: model.created_at.with_timezone(&Utc),
        created_by: model.created_by,
        updated_at: model.updated_at.map(|dt| dt.with_timezone(&Utc)),
        modifications: model.modifications.0,
        acknowledged: model.acknowledged,
        acknowledged_at: model.acknowledged_at.map(|dt| dt.with_timezone(&Utc)),
        acknowledged_by: model.acknowledged_by,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn input(product_id: Uuid, name: &str, quantity: f64) -> OrderItemInput {
        OrderItemInput {
            product_id,
            product_name: name.into(),
            quantity,
            unit: "kg".into(),
            notes: None,
        }
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, hour, 0, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn order_number_counts_from_one_per_year() {
        assert_eq!(format_order_number(0, 2026), "1/2026");
        assert_eq!(format_order_number(41, 2026), "42/2026");
    }

    #[test]
    fn year_bounds_cover_the_calendar_year() {
        let (start, end) = year_bounds(2026).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn new_product_is_marked_with_update_time() {
        let roast = Uuid::new_v4();
        let sausage = Uuid::new_v4();
        let original = merge_items(&[], vec![input(roast, "Arrosto", 1.0)], at(8));
        // creation path never goes through merge, so reset markers like a stored order
        let stored: Vec<OrderItem> = original
            .items
            .into_iter()
            .map(|mut i| {
                i.is_new = false;
                i.added_at = None;
                i
            })
            .collect();

        let merged = merge_items(
            &stored,
            vec![input(roast, "Arrosto", 1.0), input(sausage, "Salsiccia", 0.5)],
            at(10),
        );

        assert_eq!(merged.added, 1);
        assert!(!merged.items[0].is_new);
        assert_eq!(merged.items[0].added_at, None);
        assert!(merged.items[1].is_new);
        assert_eq!(merged.items[1].added_at, Some(at(10)));
    }

    #[test]
    fn marker_and_original_timestamp_survive_later_updates() {
        let roast = Uuid::new_v4();
        let sausage = Uuid::new_v4();
        let stored = vec![
            OrderItem {
                product_id: roast,
                product_name: "Arrosto".into(),
                quantity: 1.0,
                unit: "kg".into(),
                notes: String::new(),
                is_new: false,
                added_at: None,
            },
            OrderItem {
                product_id: sausage,
                product_name: "Salsiccia".into(),
                quantity: 0.5,
                unit: "kg".into(),
                notes: String::new(),
                is_new: true,
                added_at: Some(at(10)),
            },
        ];

        // quantity change on the marked line must not refresh its timestamp
        let merged = merge_items(
            &stored,
            vec![input(roast, "Arrosto", 2.0), input(sausage, "Salsiccia", 1.0)],
            at(12),
        );

        assert_eq!(merged.added, 0);
        assert!(merged.items[1].is_new);
        assert_eq!(merged.items[1].added_at, Some(at(10)));
        assert_eq!(merged.items[1].quantity, 1.0);
        assert!(!merged.items[0].is_new);
    }

    #[test]
    fn removed_then_readded_product_is_new_again() {
        let roast = Uuid::new_v4();
        let chicken = Uuid::new_v4();
        let stored = vec![OrderItem {
            product_id: roast,
            product_name: "Arrosto".into(),
            quantity: 1.0,
            unit: "kg".into(),
            notes: String::new(),
            is_new: false,
            added_at: None,
        }];

        let without_roast = merge_items(&stored, vec![input(chicken, "Pollo", 1.0)], at(9));
        let readded = merge_items(
            &without_roast.items,
            vec![input(chicken, "Pollo", 1.0), input(roast, "Arrosto", 1.0)],
            at(11),
        );

        assert_eq!(readded.added, 1);
        assert_eq!(readded.items[0].added_at, Some(at(9)));
        assert!(readded.items[1].is_new);
        assert_eq!(readded.items[1].added_at, Some(at(11)));
    }

    #[test]
    fn description_pluralizes_added_products() {
        let one = ChangeSummary {
            items_added: Some(1),
            ..Default::default()
        };
        let three = ChangeSummary {
            items_added: Some(3),
            ..Default::default()
        };
        assert_eq!(describe_changes(&one), "1 product added");
        assert_eq!(describe_changes(&three), "3 products added");
    }

    #[test]
    fn description_joins_all_clauses_into_one_line() {
        let changes = ChangeSummary {
            items_added: Some(0),
            pickup_date: Some(date(2026, 12, 24)),
            pickup_time_slot: Some("morning".into()),
            notes: true,
        };
        assert_eq!(
            describe_changes(&changes),
            "Products updated, pickup date: 2026-12-24, time slot: morning, notes updated"
        );
    }

    #[test]
    fn description_keeps_case_after_first_letter() {
        let changes = ChangeSummary {
            pickup_time_slot: Some("Afternoon 15-17".into()),
            ..Default::default()
        };
        assert_eq!(describe_changes(&changes), "Time slot: Afternoon 15-17");
    }

    #[test]
    fn customer_only_update_gets_generic_description() {
        assert_eq!(describe_changes(&ChangeSummary::default()), "Order updated");
    }

    #[test]
    fn range_bounds_take_precedence_over_exact_date() {
        let query = OrderListQuery {
            pickup_date: Some(date(2026, 5, 1)),
            status: None,
            from_date: Some(date(2026, 5, 2)),
            to_date: Some(date(2026, 5, 9)),
        };
        assert_eq!(
            PickupWindow::from_query(&query),
            PickupWindow::Range {
                from: Some(date(2026, 5, 2)),
                to: Some(date(2026, 5, 9)),
            }
        );
    }

    #[test]
    fn single_bound_falls_back_to_open_range() {
        let query = OrderListQuery {
            pickup_date: Some(date(2026, 5, 1)),
            status: None,
            from_date: None,
            to_date: Some(date(2026, 5, 9)),
        };
        assert_eq!(
            PickupWindow::from_query(&query),
            PickupWindow::Range {
                from: None,
                to: Some(date(2026, 5, 9)),
            }
        );
    }

    #[test]
    fn exact_date_used_without_bounds() {
        let query = OrderListQuery {
            pickup_date: Some(date(2026, 5, 1)),
            status: Some(OrderStatus::Ready),
            from_date: None,
            to_date: None,
        };
        assert_eq!(
            PickupWindow::from_query(&query),
            PickupWindow::Exact(date(2026, 5, 1))
        );
    }

    #[test]
    fn timestamps_are_truncated_to_microseconds() {
        let now = timestamp_now();
        assert_eq!(now.timestamp_subsec_nanos() % 1_000, 0);
        assert!(Utc::now() - now < Duration::seconds(5));
    }
}
