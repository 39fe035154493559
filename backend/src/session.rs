//! Route-progress state shared by the HTTP handlers.
//!
//! An optimization run is a replay task: it reveals the next node of the
//! planned itinerary every `reveal_interval`, then parks until the client
//! reports (via `/marker-close`) that its marker reached that node. Only
//! then are the node's alternatives published and the next node revealed.

use std::{sync::Arc, time::Duration};

use shared::{AltRouteEntry, NodeId, OptimizeResponse, RouteStatus, RouteStatusKind};
use tokio::{
    sync::{Mutex, Notify},
    task::JoinHandle,
};

use crate::itinerary::{Itinerary, ItineraryBook};

pub const DEFAULT_REVEAL_INTERVAL: Duration = Duration::from_secs(1);

pub struct RouteSession {
    itineraries: ItineraryBook,
    reveal_interval: Duration,
    inner: Mutex<SessionInner>,
}

#[derive(Default)]
struct SessionInner {
    route: RouteStatus,
    /// Node the replay task is parked on.
    awaiting: Option<NodeId>,
    marker_close: Arc<Notify>,
    replay: Option<JoinHandle<()>>,
    generation: u64,
}

impl SessionInner {
    fn stop_replay(&mut self) {
        if let Some(handle) = self.replay.take() {
            handle.abort();
        }
        self.generation += 1;
        self.awaiting = None;
        self.marker_close = Arc::new(Notify::new());
    }

    fn replay_active(&self) -> bool {
        self.replay
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

/// Outcome of a `/marker-close` report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerClose {
    Accepted,
    Ignored,
}

impl RouteSession {
    pub fn new(itineraries: ItineraryBook, reveal_interval: Duration) -> Self {
        Self {
            itineraries,
            reveal_interval,
            inner: Mutex::new(SessionInner::default()),
        }
    }

    pub fn reveal_interval(&self) -> Duration {
        self.reveal_interval
    }

    pub async fn status(&self) -> RouteStatus {
        self.inner.lock().await.route.clone()
    }

    pub async fn optimize(self: &Arc<Self>, source: &str, destination: &str) -> OptimizeResponse {
        let mut inner = self.inner.lock().await;

        let refusal = match inner.route.status {
            RouteStatusKind::Completed => Some((
                "already completed",
                "Route optimization already completed. Reset to start a new one.",
            )),
            RouteStatusKind::Running if inner.replay_active() => Some((
                "already running",
                "Route optimization is already in progress.",
            )),
            _ => None,
        };
        if let Some((status, message)) = refusal {
            tracing::info!("optimize {source} -> {destination} refused: {status}");
            return OptimizeResponse {
                status: status.to_string(),
                source: None,
                destination: None,
                message: Some(message.to_string()),
            };
        }

        inner.stop_replay();
        let plan = self.itineraries.plan(source, destination);
        let origin = NodeId::from(source);
        inner.route = RouteStatus {
            status: RouteStatusKind::Running,
            final_route: vec![origin.clone()],
            alternative_routes: vec![AltRouteEntry {
                node: origin,
                alternatives: plan.alternatives_at(0),
            }],
            error: None,
        };

        if plan.route.len() < 2 {
            inner.route.status = RouteStatusKind::Completed;
            tracing::info!("{source} is already the destination");
        } else {
            tracing::info!(
                "starting optimization {source} -> {destination} over {} nodes",
                plan.route.len()
            );
            let generation = inner.generation;
            let marker_close = Arc::clone(&inner.marker_close);
            let task = Arc::clone(self).replay(plan, generation, marker_close);
            inner.replay = Some(tokio::spawn(task));
        }

        OptimizeResponse {
            status: "started".to_string(),
            source: Some(source.to_string()),
            destination: Some(destination.to_string()),
            message: None,
        }
    }

    pub async fn marker_close(&self, node: &NodeId) -> MarkerClose {
        let mut inner = self.inner.lock().await;
        if inner.awaiting.as_ref() != Some(node) {
            tracing::debug!("ignoring marker-close for {node}");
            return MarkerClose::Ignored;
        }
        inner.awaiting = None;
        inner.marker_close.notify_one();
        tracing::info!("marker reached {node}");
        MarkerClose::Accepted
    }

    pub async fn reset(&self) {
        let mut inner = self.inner.lock().await;
        inner.stop_replay();
        inner.route = RouteStatus::idle();
        tracing::info!("route state reset");
    }

    async fn replay(self: Arc<Self>, plan: Itinerary, generation: u64, marker_close: Arc<Notify>) {
        let last = plan.route.len() - 1;

        for (index, node) in plan.route.iter().enumerate().skip(1) {
            tokio::time::sleep(self.reveal_interval).await;
            {
                let mut inner = self.inner.lock().await;
                if inner.generation != generation {
                    return;
                }
                if let Some(limit) = plan.fail_after {
                    if inner.route.final_route.len() >= limit {
                        inner.route.status = RouteStatusKind::Error;
                        inner.route.error =
                            Some(format!("optimizer failed after {limit} nodes"));
                        tracing::warn!("optimizer failed after {limit} nodes");
                        return;
                    }
                }
                if !inner.route.final_route.contains(node) {
                    inner.route.final_route.push(node.clone());
                }
                inner.awaiting = Some(node.clone());
            }
            tracing::info!("revealed {node}, waiting for the marker");

            marker_close.notified().await;

            let mut inner = self.inner.lock().await;
            if inner.generation != generation {
                return;
            }
            inner.route.alternative_routes.push(AltRouteEntry {
                node: node.clone(),
                alternatives: plan.alternatives_at(index),
            });
            if index == last {
                inner.route.status = RouteStatusKind::Completed;
                tracing::info!("route completed at {node}");
            }
        }
    }
}
