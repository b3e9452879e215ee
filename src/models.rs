use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Front-of-house roles. Both roles see and move the same orders.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Sales counter.
    #[sea_orm(string_value = "counter")]
    Counter,
    /// Preparation / back room.
    #[sea_orm(string_value = "prep")]
    Prep,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Counter, Role::Prep];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Counter => "counter",
            Role::Prep => "prep",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| {
                let valid: Vec<&str> = Role::ALL.iter().map(Role::as_str).collect();
                format!("invalid role '{s}', valid roles: {}", valid.join(", "))
            })
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order lifecycle. Any status may be set from any other; only membership is checked.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[sea_orm(string_value = "new")]
    New,
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    #[sea_orm(string_value = "ready")]
    Ready,
    #[sea_orm(string_value = "partially_collected")]
    PartiallyCollected,
    #[sea_orm(string_value = "collected")]
    Collected,
    #[sea_orm(string_value = "delivered")]
    Delivered,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::New,
        OrderStatus::InProgress,
        OrderStatus::Ready,
        OrderStatus::PartiallyCollected,
        OrderStatus::Collected,
        OrderStatus::Delivered,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::New => "new",
            OrderStatus::InProgress => "in_progress",
            OrderStatus::Ready => "ready",
            OrderStatus::PartiallyCollected => "partially_collected",
            OrderStatus::Collected => "collected",
            OrderStatus::Delivered => "delivered",
        }
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                let valid: Vec<&str> = OrderStatus::ALL.iter().map(OrderStatus::as_str).collect();
                format!("invalid status '{s}', valid statuses: {}", valid.join(", "))
            })
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Public view of an account, also what `/auth/me` echoes from the token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub description: String,
    /// `kg`, `pz` or `portion`.
    pub unit: String,
    pub price: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub label: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

/// A line of an order. `product_name` is a snapshot taken when the line was written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: f64,
    pub unit: String,
    #[serde(default)]
    pub notes: String,
    /// Set by an order update when the product was not on the order before.
    #[serde(default)]
    pub is_new: bool,
    #[serde(default)]
    pub added_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Modification {
    pub date: DateTime<Utc>,
    pub description: String,
    pub modified_by: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub items: Vec<OrderItem>,
    pub pickup_date: NaiveDate,
    pub pickup_time_slot: String,
    pub status: OrderStatus,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_at: Option<DateTime<Utc>>,
    pub modifications: Vec<Modification>,
    pub acknowledged: bool,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub acknowledged_by: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_all_six_values() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>(), Ok(status));
        }
    }

    #[test]
    fn unknown_status_error_lists_valid_set() {
        let err = "shipped".parse::<OrderStatus>().unwrap_err();
        assert!(err.contains("shipped"));
        for status in OrderStatus::ALL {
            assert!(err.contains(status.as_str()), "missing {status} in {err}");
        }
    }

    #[test]
    fn status_serializes_as_snake_case() {
        let json = serde_json::to_string(&OrderStatus::PartiallyCollected).unwrap();
        assert_eq!(json, "\"partially_collected\"");
    }

    #[test]
    fn role_round_trips_and_rejects_unknown() {
        assert_eq!("counter".parse::<Role>(), Ok(Role::Counter));
        assert_eq!("prep".parse::<Role>(), Ok(Role::Prep));
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let user = User {
            id: Uuid::new_v4(),
            username: "counter".into(),
            password_hash: "$argon2id$secret".into(),
            role: Role::Counter,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
    }

    #[test]
    fn item_markers_default_when_absent() {
        let item: OrderItem = serde_json::from_value(serde_json::json!({
            "product_id": Uuid::nil(),
            "product_name": "Salsiccia Fresca",
            "quantity": 1.5,
            "unit": "kg"
        }))
        .unwrap();
        assert!(!item.is_new);
        assert!(item.added_at.is_none());
        assert_eq!(item.notes, "");
    }
}
