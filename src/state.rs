use std::sync::Arc;

use crate::{
    db::{DbPool, OrmConn, orm_from_pool},
    services::auth_service::TokenKeys,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub keys: Arc<TokenKeys>,
}

impl AppState {
    pub fn new(pool: DbPool, jwt_secret: &str) -> Self {
        let orm = orm_from_pool(&pool);
        Self {
            pool,
            orm,
            keys: Arc::new(TokenKeys::new(jwt_secret)),
        }
    }
}
