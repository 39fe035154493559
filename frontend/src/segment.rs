//! Segment routing: turns two waypoints into a drawable polyline.

use reqwest::Client;
use shared::{interpolate_path, Coordinate, SegmentRequest, SegmentResponse};
use thiserror::Error;

use crate::config::ClientConfig;

#[derive(Debug, Error)]
pub enum RoutingFailure {
    #[error("routing service unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("routing service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("no route between the waypoints")]
    NoRoute,
}

/// Resolves one segment. A single awaited result replaces the
/// "routes found" / "routing error" event pair.
#[allow(async_fn_in_trait)]
pub trait SegmentRouteProvider {
    async fn route(&self, from: Coordinate, to: Coordinate)
        -> Result<Vec<Coordinate>, RoutingFailure>;
}

/// Two-point line used when a provider succeeds with nothing to draw, or fails.
pub fn straight_line(from: Coordinate, to: Coordinate) -> Vec<Coordinate> {
    vec![from, to]
}

/// Resolves segments through a `POST /api/route` endpoint.
#[derive(Debug, Clone)]
pub struct HttpSegmentRouter {
    client: Client,
    url: String,
}

impl HttpSegmentRouter {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            client: Client::new(),
            url: config.endpoint("api/route"),
        }
    }
}

impl SegmentRouteProvider for HttpSegmentRouter {
    async fn route(
        &self,
        from: Coordinate,
        to: Coordinate,
    ) -> Result<Vec<Coordinate>, RoutingFailure> {
        let payload = SegmentRequest {
            start: from,
            end: to,
        };
        let response = self.client.post(&self.url).json(&payload).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RoutingFailure::Status {
                status: status.as_u16(),
                body,
            });
        }
        let segment: SegmentResponse = response.json().await?;
        tracing::debug!(
            "segment resolved: {} points, {:.3} km",
            segment.path.len(),
            segment.distance_km
        );
        Ok(segment.path)
    }
}

/// Local provider: evenly spaced points on the straight line.
#[derive(Debug, Clone, Copy)]
pub struct StraightLineRouter {
    pub steps: usize,
}

impl Default for StraightLineRouter {
    fn default() -> Self {
        Self { steps: 20 }
    }
}

impl SegmentRouteProvider for StraightLineRouter {
    async fn route(
        &self,
        from: Coordinate,
        to: Coordinate,
    ) -> Result<Vec<Coordinate>, RoutingFailure> {
        Ok(interpolate_path(from, to, self.steps))
    }
}
