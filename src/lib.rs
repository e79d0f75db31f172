pub mod cache;
pub mod catalog;
pub mod config;
pub mod database;
pub mod error;
pub mod ledger;
pub mod models;
pub mod services;
pub mod store;

use std::sync::Arc;

pub use cache::CacheService;
pub use catalog::EventCatalog;
pub use config::Config;
pub use error::{CoreError, CoreResult};
pub use services::{BookingEngine, LogNotifier, Notifier, PaymentGateway, RandomGateway};
pub use store::{DurableStore, MemoryStore, PgStore};

// Shared state for everything built on the booking core
#[derive(Clone)]
pub struct BookingCore {
    pub store: Arc<dyn DurableStore>,
    pub cache: CacheService,
    pub engine: BookingEngine,
    pub config: Config,
}

impl BookingCore {
    pub fn new(
        store: Arc<dyn DurableStore>,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn Notifier>,
        config: Config,
    ) -> Self {
        let cache = CacheService::new(&config.cache);
        let engine = BookingEngine::new(
            store.clone(),
            cache.clone(),
            gateway,
            notifier,
            &config.cache,
        );
        Self {
            store,
            cache,
            engine,
            config,
        }
    }

    /// Fully in-process core: memory store, probabilistic gateway, log
    /// notifier. The default wiring for tests and single-node use.
    pub fn in_memory(config: Config) -> Self {
        let gateway = Arc::new(RandomGateway::from_config(&config.payment));
        Self::new(
            Arc::new(MemoryStore::new()),
            gateway,
            Arc::new(LogNotifier),
            config,
        )
    }

    /// Postgres-backed core: connects, runs migrations, wires the store.
    pub async fn connect(config: Config) -> Result<Arc<Self>, Box<dyn std::error::Error>> {
        let db = database::Database::new(&config.database.url, config.database.pool_size).await?;

        db.run_migrations().await?;

        let gateway = Arc::new(RandomGateway::from_config(&config.payment));
        let core = Arc::new(Self::new(
            Arc::new(PgStore::new(db)),
            gateway,
            Arc::new(LogNotifier),
            config,
        ));
        core.start_background_tasks();
        Ok(core)
    }

    /// Spawn the per-pool cache sweepers. Requires a tokio runtime.
    pub fn start_background_tasks(&self) {
        self.cache.spawn_sweepers();
    }
}
