use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Order;

/// An order line as sent by a client. Change markers are never accepted from input.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct OrderItemInput {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: f64,
    pub unit: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub customer_name: String,
    pub customer_phone: String,
    pub items: Vec<OrderItemInput>,
    pub pickup_date: NaiveDate,
    /// Coarse label such as `morning` or `afternoon`.
    pub pickup_time_slot: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateOrderRequest {
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub items: Option<Vec<OrderItemInput>>,
    pub pickup_date: Option<NaiveDate>,
    pub pickup_time_slot: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct OrderList {
    #[schema(value_type = Vec<Order>)]
    pub items: Vec<Order>,
}
