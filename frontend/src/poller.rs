use std::time::Duration;

use shared::{NodeId, RouteStatus, RouteStatusKind};

use crate::{api::BackendApi, config::ClientConfig, error::ClientError};

/// What a poll tick should do with a freshly fetched status.
#[derive(Debug, Clone, PartialEq)]
pub enum PollAction {
    /// Nothing to advance this cycle.
    Wait,
    /// Animate the next unvisited segment.
    Advance { from: NodeId, to: NodeId },
    /// Backend is done: draw the final route and stop polling.
    RenderFinal,
    /// Backend reported an error: stop polling.
    Fail(String),
}

#[derive(Debug, Clone)]
pub struct StatusPoller {
    interval: Duration,
}

impl StatusPoller {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            interval: config.polling_interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub async fn fetch<B: BackendApi>(&self, backend: &B) -> Result<RouteStatus, ClientError> {
        backend.status().await.map_err(ClientError::Network)
    }

    /// Decides the tick's action. Advancement is withheld while a segment is
    /// animating; the caller still mirrors the status.
    pub fn next_action(status: &RouteStatus, current_node_index: usize, animating: bool) -> PollAction {
        match status.status {
            RouteStatusKind::Error => PollAction::Fail(
                status
                    .error
                    .clone()
                    .unwrap_or_else(|| "route optimization failed".to_string()),
            ),
            RouteStatusKind::Running if !animating => {
                let route = &status.final_route;
                match (route.get(current_node_index), route.get(current_node_index + 1)) {
                    (Some(from), Some(to)) => {
                        tracing::info!("polling detected new node: {from} -> {to}");
                        PollAction::Advance {
                            from: from.clone(),
                            to: to.clone(),
                        }
                    }
                    _ => PollAction::Wait,
                }
            }
            RouteStatusKind::Completed if !animating => PollAction::RenderFinal,
            _ => PollAction::Wait,
        }
    }
}
