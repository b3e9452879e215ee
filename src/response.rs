use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct Meta {
    pub limit: Option<i64>,
    pub total: Option<i64>,
}

impl Meta {
    /// Meta for a capped, unpaginated listing.
    pub fn capped(limit: u64, total: usize) -> Self {
        Self {
            limit: Some(limit as i64),
            total: Some(total as i64),
        }
    }

    pub fn empty() -> Self {
        Self {
            limit: None,
            total: None,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub message: String,
    pub data: Option<T>,
    pub meta: Option<Meta>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T, meta: Option<Meta>) -> Self {
        Self {
            message: message.into(),
            data: Some(data),
            meta,
        }
    }
}
