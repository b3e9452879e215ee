use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Customer;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCustomerRequest {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct CustomerList {
    #[schema(value_type = Vec<Customer>)]
    pub items: Vec<Customer>,
}
