use std::sync::Arc;

use tracing::{info, warn};

use crate::auth::repo::{PgUserStore, UserStore};
use crate::config::AppConfig;
use crate::db;
use crate::mapping::{MappingProvider, OrsClient};
use crate::memory::{MemoryTripStore, MemoryUserStore};
use crate::trips::repo::{PgTripStore, TripStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub trips: Arc<dyn TripStore>,
    pub mapping: Arc<dyn MappingProvider>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let config = Arc::new(config);

        let (users, trips): (Arc<dyn UserStore>, Arc<dyn TripStore>) = match &config.database_url {
            Some(url) => {
                let pool = db::connect(url, &config).await?;
                db::run_migrations(&pool).await?;
                info!("using postgres stores");
                (
                    Arc::new(PgUserStore::new(pool.clone())),
                    Arc::new(PgTripStore::new(pool)),
                )
            }
            None => {
                warn!("DATABASE_URL not set; users and trips are kept in memory");
                (
                    Arc::new(MemoryUserStore::default()),
                    Arc::new(MemoryTripStore::default()),
                )
            }
        };

        if config.mapping.api_key.is_none() {
            warn!("ORS_API_KEY not set; geocode and route requests will fail");
        }
        let mapping = Arc::new(OrsClient::new(&config.mapping)?) as Arc<dyn MappingProvider>;

        Ok(Self::from_parts(config, users, trips, mapping))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserStore>,
        trips: Arc<dyn TripStore>,
        mapping: Arc<dyn MappingProvider>,
    ) -> Self {
        Self {
            config,
            users,
            trips,
            mapping,
        }
    }

    /// Memory stores, test config, and the given mapping provider.
    #[cfg(test)]
    pub fn fake_with_mapping(mapping: Arc<dyn MappingProvider>) -> Self {
        Self::from_parts(
            Arc::new(AppConfig::for_tests()),
            Arc::new(MemoryUserStore::default()),
            Arc::new(MemoryTripStore::default()),
            mapping,
        )
    }

    /// Memory stores and a mapping client pointed at a closed port.
    #[cfg(test)]
    pub fn fake() -> Self {
        let config = AppConfig::for_tests();
        let mapping = OrsClient::with_client(reqwest::Client::new(), &config.mapping);
        Self::fake_with_mapping(Arc::new(mapping))
    }
}
