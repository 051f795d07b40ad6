use crate::domain::{FlushControl, FlushResult};
use crate::error::FlushError;
use async_trait::async_trait;

/// Application-level flush operations
#[async_trait]
pub trait FlushOperations: Send + Sync + 'static {
    /// Delete every key under `namespace` using the default controls
    async fn flush(&self, namespace: &str) -> Result<FlushResult, FlushError>;

    async fn flush_with(
        &self,
        namespace: &str,
        control: &FlushControl,
    ) -> Result<FlushResult, FlushError>;
}
