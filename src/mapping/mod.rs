//! Geocode/route proxy. Keeps the provider API key on the server and
//! relays (reshaped) provider answers to the client.

use async_trait::async_trait;
use axum::Router;

use crate::routing::{Coordinate, RouteRequest, RouteResponse};
use crate::state::AppState;

pub mod dto;
pub mod handlers;
pub mod ors;

pub use ors::OrsClient;

/// Errors from the third-party mapping provider. Never retried.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("mapping provider request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("mapping provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("mapping provider returned no {0} results")]
    Empty(&'static str),

    #[error("mapping provider response could not be read: {0}")]
    Decode(String),

    #[error("mapping provider is not configured")]
    NotConfigured,
}

#[async_trait]
pub trait MappingProvider: Send + Sync {
    /// Best match for a free-text address.
    async fn geocode(&self, address: &str) -> Result<Coordinate, UpstreamError>;

    async fn route(&self, request: &RouteRequest) -> Result<RouteResponse, UpstreamError>;
}

pub fn router() -> Router<AppState> {
    handlers::mapping_routes()
}
