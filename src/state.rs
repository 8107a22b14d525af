use std::sync::Arc;

use crate::config::Config;
use crate::db::Store;
use crate::services::{AuthService, MessageService, SeaOrmAuthService, SeaOrmMessageService};

/// Long-lived dependencies shared by every request. Read-only after startup.
#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Store,

    pub auth_service: Arc<dyn AuthService>,

    pub message_service: Arc<dyn MessageService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        Ok(Self::with_store(config, store))
    }

    /// Wires services around an already connected store.
    #[must_use]
    pub fn with_store(config: Config, store: Store) -> Self {
        let auth_service = Arc::new(SeaOrmAuthService::new(
            store.clone(),
            config.security.clone(),
        )) as Arc<dyn AuthService>;

        let message_service =
            Arc::new(SeaOrmMessageService::new(store.clone())) as Arc<dyn MessageService>;

        Self {
            config: Arc::new(config),
            store,
            auth_service,
            message_service,
        }
    }
}
