//! Remote counter service port and its HTTP adapter.
//!
//! The [`Gateway`] trait is what the coordinator talks to; [`HttpGateway`]
//! owns transport details (URL building, timeouts, status mapping) and
//! normalizes JSON payloads into the domain records in [`crate::model`].

mod dto;
mod http;

use async_trait::async_trait;

use crate::model::{CounterSnapshot, RegionRecord, Timeline};

pub use http::HttpGateway;

/// Failures surfaced by gateway operations. Never swallowed by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// Transport failure, timeout or an unexpected HTTP status.
    #[error("network error: {message}")]
    Network { message: String },
    /// Payload could not be decoded or lacks a required field.
    #[error("malformed response: {message}")]
    MalformedResponse { message: String },
    /// The service reports no region for the code.
    #[error("unknown region `{code}`")]
    UnknownRegion { code: String },
}

impl GatewayError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }

    pub fn unknown_region(code: impl Into<String>) -> Self {
        Self::UnknownRegion { code: code.into() }
    }
}

/// Read-only queries against the remote counter service.
///
/// Implementations perform no retries and never touch view state.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Worldwide counters.
    async fn fetch_global_snapshot(&self) -> Result<CounterSnapshot, GatewayError>;

    /// Every region, in the order the service returned them.
    async fn fetch_all_regions(&self) -> Result<Vec<RegionRecord>, GatewayError>;

    /// Counters for one region, including its coordinates.
    async fn fetch_region_snapshot(&self, iso_code: &str) -> Result<CounterSnapshot, GatewayError>;

    /// Worldwide cumulative counters for the last `last_days` days.
    async fn fetch_history(&self, last_days: u32) -> Result<Timeline, GatewayError>;
}
