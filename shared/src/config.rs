use std::time::Duration;
use tracing::warn;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Redis,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub http_port: u16,
    pub store: StoreBackend,
    pub redis_url: String,
    pub namespace: String,
    pub batch_size: usize,
    pub deadline: Option<Duration>,
    pub allowed_origins: Vec<String>,
}

impl Config {
    pub const DEFAULT_HOST: &str = "0.0.0.0";
    pub const DEFAULT_HTTP_PORT: u16 = 8080;
    pub const DEFAULT_REDIS_URL: &str = "redis://localhost:6379";
    pub const DEFAULT_NAMESPACE: &str = "app:";
    pub const DEFAULT_BATCH_SIZE: usize = 500;

    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the config from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("SWEEP_HOST").unwrap_or_else(|| Self::DEFAULT_HOST.to_string());
        let http_port = lookup("SWEEP_HTTP_PORT")
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(Self::DEFAULT_HTTP_PORT);

        let store = match lookup("SWEEP_STORE").as_deref().map(str::to_lowercase) {
            None => StoreBackend::Memory,
            Some(s) if s == "memory" => StoreBackend::Memory,
            Some(s) if s == "redis" => StoreBackend::Redis,
            Some(other) => {
                warn!("Unknown SWEEP_STORE '{}', falling back to in-memory store", other);
                StoreBackend::Memory
            }
        };

        let namespace = match lookup("SWEEP_NAMESPACE") {
            Some(ns) if !ns.is_empty() => ns,
            Some(_) => {
                warn!(
                    "SWEEP_NAMESPACE is empty, using default '{}'",
                    Self::DEFAULT_NAMESPACE
                );
                Self::DEFAULT_NAMESPACE.to_string()
            }
            None => Self::DEFAULT_NAMESPACE.to_string(),
        };

        let batch_size = match lookup("SWEEP_BATCH_SIZE").map(|v| v.parse::<usize>()) {
            Some(Ok(0)) | Some(Err(_)) => {
                warn!(
                    "SWEEP_BATCH_SIZE must be a positive integer, using {}",
                    Self::DEFAULT_BATCH_SIZE
                );
                Self::DEFAULT_BATCH_SIZE
            }
            Some(Ok(size)) => size,
            None => Self::DEFAULT_BATCH_SIZE,
        };

        let deadline = lookup("SWEEP_DEADLINE_MS")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis);

        Self {
            host,
            http_port,
            store,
            redis_url: lookup("SWEEP_REDIS_URL")
                .unwrap_or_else(|| Self::DEFAULT_REDIS_URL.to_string()),
            namespace,
            batch_size,
            deadline,
            allowed_origins: lookup("SWEEP_ALLOWED_ORIGINS")
                .unwrap_or_else(|| "*".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.http_port)
    }
}
