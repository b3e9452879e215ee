use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct SeedSummary {
    pub seeded: bool,
    pub categories: usize,
    pub products: usize,
    /// `username/password` pairs of the demo accounts that were created.
    pub users: Vec<String>,
}
