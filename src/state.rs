use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::{config::AppConfig, notify::Notifier, token::TokenService};

#[derive(Clone)]
pub struct AppState {
    pub orm: DatabaseConnection,
    pub config: Arc<AppConfig>,
    pub tokens: Arc<TokenService>,
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    pub fn new(orm: DatabaseConnection, config: AppConfig, notifier: Arc<dyn Notifier>) -> Self {
        let tokens = Arc::new(TokenService::new(config.jwt.clone()));
        Self {
            orm,
            config: Arc::new(config),
            tokens,
            notifier,
        }
    }
}
