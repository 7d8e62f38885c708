//! HTTP client for the recorder server.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::debug;

use crate::wire::{RpcCall, RpcReply};
use crate::{RecordTemperature, TemperatureRecord, TransportError};

/// Timeout applied to each call unless configured otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client-side proxy for a remote recorder server.
pub struct RecorderProxy {
    http: reqwest::Client,
    url: reqwest::Url,
    timeout: Duration,
    next_id: AtomicU64,
}

impl RecorderProxy {
    /// Creates a proxy for the server at `url` with the default timeout.
    pub fn new(url: &str) -> Result<Self, TransportError> {
        Self::with_timeout(url, DEFAULT_TIMEOUT)
    }

    /// Creates a proxy for the server at `url`, bounding every call by `timeout`.
    pub fn with_timeout(url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let url = reqwest::Url::parse(url)
            .map_err(|e| TransportError::Connection(format!("invalid server URL {url:?}: {e}")))?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Connection(e.to_string()))?;

        Ok(Self {
            http,
            url,
            timeout,
            next_id: AtomicU64::new(1),
        })
    }

    /// URL calls are posted to.
    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    fn map_send_error(&self, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout(self.timeout)
        } else {
            TransportError::Connection(error_chain(&e))
        }
    }

    /// Posts `call` and returns the decoded reply.
    async fn call(&self, call: &RpcCall) -> Result<RpcReply, TransportError> {
        let response = self
            .http
            .post(self.url.clone())
            .json(call)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Protocol {
                code: status.as_u16(),
                message: status
                    .canonical_reason()
                    .unwrap_or("unknown status")
                    .to_string(),
            });
        }

        let body = response.bytes().await.map_err(|e| self.map_send_error(e))?;
        let reply: RpcReply = serde_json::from_slice(&body)
            .map_err(|e| TransportError::InvalidResponse(format!("undecodable reply: {e}")))?;

        if reply.id.is_some_and(|id| id != call.id) {
            return Err(TransportError::InvalidResponse(format!(
                "reply id {:?} does not match request id {}",
                reply.id, call.id
            )));
        }
        Ok(reply)
    }
}

impl RecordTemperature for RecorderProxy {
    async fn record_temperature(&self, record: TemperatureRecord) -> Result<i32, TransportError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let call = RpcCall::record_temperature(id, &record);
        debug!("Calling {} on {} (id {})", call.method, self.url, id);

        let reply = self.call(&call).await?;
        if let Some(fault) = reply.error {
            return Err(TransportError::Fault {
                code: fault.code,
                message: fault.message,
            });
        }

        let result = reply
            .result
            .ok_or_else(|| TransportError::InvalidResponse("reply has no result".to_string()))?;
        result
            .as_i64()
            .and_then(|status| i32::try_from(status).ok())
            .ok_or_else(|| TransportError::InvalidResponse(format!("non-integer status {result}")))
    }
}

/// Flattens an error and its sources into one line.
fn error_chain(e: &dyn std::error::Error) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}
