use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::models::OrderStatus;

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ProductQuery {
    pub category: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CustomerQuery {
    pub search: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct OrderListQuery {
    /// Exact pickup date, ignored when either range bound is given.
    pub pickup_date: Option<NaiveDate>,
    pub status: Option<OrderStatus>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
}
