use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;

/// Only these four statuses are broken out on the dashboard.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct StatusCounts {
    pub new: i64,
    pub in_progress: i64,
    pub ready: i64,
    pub delivered: i64,
}

impl StatusCounts {
    pub fn total(&self) -> i64 {
        self.new + self.in_progress + self.ready + self.delivered
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardStats {
    pub today: NaiveDate,
    pub total_today: i64,
    pub by_status: StatusCounts,
    pub new_orders_count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NewOrdersCount {
    pub count: i64,
}
