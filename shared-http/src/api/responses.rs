use serde::Serialize;
use serde_json::Value;
use sweep::{FlushFailure, FlushResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultKind {
    Success,
    Error,
}

/// Envelope returned by every endpoint
#[derive(Clone, Debug, Serialize)]
pub struct ApiResponse {
    pub status: ResultKind,
    pub service: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Builds success and error envelopes.
///
/// Constructed once at startup and shared read-only through server state.
#[derive(Clone, Debug)]
pub struct ResponseShapes {
    service: String,
    success_message: String,
    error_message: String,
}

impl ResponseShapes {
    const DEFAULT_SUCCESS_MESSAGE: &str = "success";
    const DEFAULT_ERROR_MESSAGE: &str = "error";

    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            success_message: Self::DEFAULT_SUCCESS_MESSAGE.to_string(),
            error_message: Self::DEFAULT_ERROR_MESSAGE.to_string(),
        }
    }

    pub fn with_messages(
        mut self,
        success_message: impl Into<String>,
        error_message: impl Into<String>,
    ) -> Self {
        self.success_message = success_message.into();
        self.error_message = error_message.into();
        self
    }

    pub fn build<T: Serialize>(&self, kind: ResultKind, payload: T) -> ApiResponse {
        let message = match kind {
            ResultKind::Success => &self.success_message,
            ResultKind::Error => &self.error_message,
        };
        let data = match serde_json::to_value(payload) {
            Ok(Value::Null) => None,
            Ok(value) => Some(value),
            Err(e) => Some(Value::String(format!("unserializable payload: {e}"))),
        };

        ApiResponse {
            status: kind,
            service: self.service.clone(),
            message: message.clone(),
            data,
        }
    }

    pub fn success<T: Serialize>(&self, payload: T) -> ApiResponse {
        self.build(ResultKind::Success, payload)
    }

    pub fn error(&self, error: impl Into<String>, partial: Option<FlushResponse>) -> ApiResponse {
        self.build(
            ResultKind::Error,
            ErrorResponse {
                error: error.into(),
                partial,
            },
        )
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial: Option<FlushResponse>,
}

#[derive(Debug, Serialize)]
pub struct FlushResponse {
    pub namespace: String,
    pub keys_deleted: u64,
    pub batches: u64,
    pub errors: Vec<FlushFailure>,
    /// False when the flush stopped early or some keys could not be deleted
    pub complete: bool,
}

impl FlushResponse {
    pub fn new(namespace: impl Into<String>, result: FlushResult, stopped_early: bool) -> Self {
        Self {
            namespace: namespace.into(),
            keys_deleted: result.keys_deleted,
            batches: result.batches,
            complete: !stopped_early && result.is_clean(),
            errors: result.errors,
        }
    }
}
