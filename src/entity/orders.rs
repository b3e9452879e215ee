use sea_orm::FromJsonQueryResult;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::{Modification, OrderItem, OrderStatus};

/// Order lines, stored as a JSONB array on the order row.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(transparent)]
pub struct OrderItemList(pub Vec<OrderItem>);

/// Change log, stored as a JSONB array. Entries are only ever appended.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(transparent)]
pub struct ModificationList(pub Vec<Modification>);

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub order_number: String,
    pub customer_name: String,
    pub customer_phone: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub items: OrderItemList,
    pub pickup_date: Date,
    pub pickup_time_slot: String,
    pub status: OrderStatus,
    pub notes: String,
    pub created_at: DateTimeWithTimeZone,
    pub created_by: String,
    pub updated_at: Option<DateTimeWithTimeZone>,
    #[sea_orm(column_type = "JsonBinary")]
    pub modifications: ModificationList,
    pub acknowledged: bool,
    pub acknowledged_at: Option<DateTimeWithTimeZone>,
    pub acknowledged_by: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
