use shared::config::{Config, StoreBackend};
use shared_http::api::ResponseShapes;
use std::sync::Arc;
use storage_engine::{MemoryKeyStore, RedisKeyStore};
use sweep::{CancellationToken, FlushEvent, FlushOptions, KeyStore, NamespaceFlusher};
use tokio::sync::broadcast;

pub const SERVICE_NAME: &str = "sweep";

/// Server state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub flusher: Arc<NamespaceFlusher>,
    pub responses: Arc<ResponseShapes>,
    pub event_channel: broadcast::Sender<FlushEvent>,
    /// Cancelled on shutdown; every flush runs under a child token
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(config: Arc<Config>, store: Arc<dyn KeyStore>) -> Self {
        // Create broadcast channel for SSE events (1000 event buffer capacity)
        let (event_tx, _event_rx) = broadcast::channel(1000);

        let options = FlushOptions::new(config.batch_size, config.deadline);
        let flusher = Arc::new(NamespaceFlusher::with_event_broadcaster(
            store,
            options,
            event_tx.clone(),
        ));

        Self {
            config,
            flusher,
            responses: Arc::new(ResponseShapes::new(SERVICE_NAME)),
            event_channel: event_tx,
            shutdown: CancellationToken::new(),
        }
    }

    /// Build state with the store selected by the configuration
    pub fn from_config(config: Arc<Config>) -> shared::Result<Self> {
        let store = Self::init_store(&config)?;
        Ok(Self::new(config, store))
    }

    fn init_store(config: &Config) -> shared::Result<Arc<dyn KeyStore>> {
        match config.store {
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory key store; flushes only affect this process");
                Ok(Arc::new(MemoryKeyStore::new()))
            }
            StoreBackend::Redis => {
                let store = RedisKeyStore::new(&config.redis_url)
                    .map_err(|e| shared::Error::Config(e.to_string()))?;
                tracing::info!("Using redis key store at {}", config.redis_url);
                Ok(Arc::new(store))
            }
        }
    }
}
