//! Client for the route-progress backend.

use reqwest::Client;
use serde::de::DeserializeOwned;
use shared::{Ack, MarkerCloseRequest, NodeId, OptimizeRequest, OptimizeResponse, RouteStatus};
use thiserror::Error;

use crate::config::ClientConfig;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// The four calls the session makes against the backend.
///
/// Futures are not required to be `Send`: the whole session runs on one task.
#[allow(async_fn_in_trait)]
pub trait BackendApi {
    /// `GET /reset`, announcing a fresh session.
    async fn reset(&self) -> Result<Ack, ApiError>;
    /// `POST /optimize`.
    async fn optimize(&self, request: &OptimizeRequest) -> Result<OptimizeResponse, ApiError>;
    /// `GET /status`.
    async fn status(&self) -> Result<RouteStatus, ApiError>;
    /// `POST /marker-close`, sent when the marker arrives at `node`.
    async fn marker_close(&self, node: &NodeId) -> Result<Ack, ApiError>;
}

#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    config: ClientConfig,
}

impl HttpBackend {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

impl BackendApi for HttpBackend {
    async fn reset(&self) -> Result<Ack, ApiError> {
        let response = self.client.get(self.config.endpoint("reset")).send().await?;
        let ack: Ack = decode(response).await?;
        tracing::info!("backend reset confirmed: {}", ack.status);
        Ok(ack)
    }

    async fn optimize(&self, request: &OptimizeRequest) -> Result<OptimizeResponse, ApiError> {
        tracing::debug!(
            "sending optimize request source={} destination={}",
            request.source,
            request.destination
        );
        let response = self
            .client
            .post(self.config.endpoint("optimize"))
            .json(request)
            .send()
            .await?;
        decode(response).await
    }

    async fn status(&self) -> Result<RouteStatus, ApiError> {
        let response = self.client.get(self.config.endpoint("status")).send().await?;
        decode(response).await
    }

    async fn marker_close(&self, node: &NodeId) -> Result<Ack, ApiError> {
        let payload = MarkerCloseRequest { node: node.clone() };
        let response = self
            .client
            .post(self.config.endpoint("marker-close"))
            .json(&payload)
            .send()
            .await?;
        let ack: Ack = decode(response).await?;
        tracing::info!("marker-close for {node} acknowledged: {}", ack.status);
        Ok(ack)
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response.json::<T>().await?)
}
