use serde::Deserialize;
use std::time::Duration;
use sweep::FlushControl;
use sweep::CancellationToken;

/// Optional knobs accepted by the flush endpoints
#[derive(Debug, Default, Deserialize)]
pub struct FlushQuery {
    #[serde(default)]
    pub batch_size: Option<usize>,
    #[serde(default)]
    pub deadline_ms: Option<u64>,
}

impl FlushQuery {
    pub fn to_control(&self, cancel: CancellationToken) -> FlushControl {
        let mut control = FlushControl::with_cancel(cancel);
        if let Some(size) = self.batch_size {
            control = control.batch_size(size);
        }
        if let Some(ms) = self.deadline_ms.filter(|ms| *ms > 0) {
            control = control.deadline(Duration::from_millis(ms));
        }
        control
    }
}

/// Body of `POST /flush`; a missing namespace means the configured default
#[derive(Debug, Default, Deserialize)]
pub struct FlushRequest {
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(flatten)]
    pub options: FlushQuery,
}
