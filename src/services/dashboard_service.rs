use chrono::{NaiveDate, Utc};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};

use crate::{
    dto::dashboard::{DashboardStats, NewOrdersCount, StatusCounts},
    entity::orders::{Column as OrderCol, Entity as Orders},
    error::AppResult,
    models::OrderStatus,
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Fold `(status, count)` rows into the four dashboard buckets.
/// `partially_collected` and `collected` rows are dropped on purpose.
pub fn tally_status_counts(rows: &[(String, i64)]) -> StatusCounts {
    let mut counts = StatusCounts::default();
    for (status, count) in rows {
        match status.parse::<OrderStatus>() {
            Ok(OrderStatus::New) => counts.new += count,
            Ok(OrderStatus::InProgress) => counts.in_progress += count,
            Ok(OrderStatus::Ready) => counts.ready += count,
            Ok(OrderStatus::Delivered) => counts.delivered += count,
            Ok(OrderStatus::PartiallyCollected | OrderStatus::Collected) | Err(_) => {}
        }
    }
    counts
}

async fn count_new_orders(state: &AppState) -> AppResult<i64> {
    let count = Orders::find()
        .filter(OrderCol::Status.eq(OrderStatus::New))
        .count(&state.orm)
        .await?;
    Ok(count as i64)
}

/// Counts for orders due for pickup on `day`.
pub async fn stats_for_day(state: &AppState, day: NaiveDate) -> AppResult<DashboardStats> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        r#"
        SELECT status, COUNT(*)::BIGINT
        FROM orders
        WHERE pickup_date = $1
        GROUP BY status
        "#,
    )
    .bind(day)
    .fetch_all(&state.pool)
    .await?;

    let by_status = tally_status_counts(&rows);
    Ok(DashboardStats {
        today: day,
        total_today: by_status.total(),
        by_status,
        new_orders_count: count_new_orders(state).await?,
    })
}

pub async fn daily_stats(state: &AppState) -> AppResult<ApiResponse<DashboardStats>> {
    let today = Utc::now().date_naive();
    let stats = stats_for_day(state, today).await?;
    Ok(ApiResponse::success("Dashboard", stats, Some(Meta::empty())))
}

/// Global count of `new` orders, whatever their pickup date.
pub async fn new_orders_count(state: &AppState) -> AppResult<ApiResponse<NewOrdersCount>> {
    let count = count_new_orders(state).await?;
    Ok(ApiResponse::success(
        "New orders",
        NewOrdersCount { count },
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::tally_status_counts;
    use crate::dto::dashboard::StatusCounts;

    #[test]
    fn only_four_buckets_are_counted() {
        let rows = vec![
            ("new".to_string(), 2),
            ("ready".to_string(), 1),
            ("partially_collected".to_string(), 4),
            ("collected".to_string(), 3),
        ];
        let counts = tally_status_counts(&rows);
        assert_eq!(
            counts,
            StatusCounts {
                new: 2,
                in_progress: 0,
                ready: 1,
                delivered: 0,
            }
        );
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn unknown_status_rows_are_ignored() {
        let rows = vec![("archived".to_string(), 9), ("delivered".to_string(), 1)];
        assert_eq!(tally_status_counts(&rows).total(), 1);
    }
}
