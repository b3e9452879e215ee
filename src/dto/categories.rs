use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Category;

/// Used for both create and full-replacement update.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CategoryRequest {
    pub name: String,
    pub label: String,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct CategoryList {
    #[schema(value_type = Vec<Category>)]
    pub items: Vec<Category>,
}
