//! Marker animation along one segment.
//!
//! [`SegmentAnimation`] is a plain state machine advanced one step per
//! scheduler tick. It ends in exactly one of two terminal phases:
//! [`AnimationPhase::Arrived`] when a step lands within the proximity
//! threshold of the target, or [`AnimationPhase::Exhausted`] when the
//! polyline runs out first. [`AnimationEngine`] applies each step to the map
//! and sends the arrival signal to the backend.

use std::time::Duration;

use shared::{haversine_km, Coordinate, NodeId};

use crate::{
    api::BackendApi,
    config::ClientConfig,
    error::ClientError,
    map::{MapResources, MapSurface},
    notify::{Notifier, CALCULATING_ROUTE, NEW_ROUTE_FOUND},
};

/// One hop of the final route, resolved to its target coordinate.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub from: NodeId,
    pub to: NodeId,
    pub target: Coordinate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationPhase {
    Stepping,
    Arrived,
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnimationStep {
    /// Marker moved, target not reached yet.
    Moved(Coordinate),
    /// Marker moved and is now within the threshold of the target.
    Arrived(Coordinate),
    /// No points left and the threshold was never crossed.
    Exhausted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SegmentAnimation {
    segment: Segment,
    polyline: Vec<Coordinate>,
    step_index: usize,
    threshold_km: f64,
    phase: AnimationPhase,
}

impl SegmentAnimation {
    pub fn new(segment: Segment, polyline: Vec<Coordinate>, threshold_km: f64) -> Self {
        Self {
            segment,
            polyline,
            step_index: 0,
            threshold_km,
            phase: AnimationPhase::Stepping,
        }
    }

    pub fn segment(&self) -> &Segment {
        &self.segment
    }

    pub fn phase(&self) -> AnimationPhase {
        self.phase
    }

    pub fn step_index(&self) -> usize {
        self.step_index
    }

    pub fn is_finished(&self) -> bool {
        self.phase != AnimationPhase::Stepping
    }

    /// Takes the next point off the polyline.
    ///
    /// Once a terminal phase is reached further calls keep reporting it
    /// without moving.
    pub fn advance(&mut self) -> AnimationStep {
        match self.phase {
            AnimationPhase::Arrived => {
                let last = self.polyline[self.step_index - 1];
                return AnimationStep::Arrived(last);
            }
            AnimationPhase::Exhausted => return AnimationStep::Exhausted,
            AnimationPhase::Stepping => {}
        }

        let Some(&position) = self.polyline.get(self.step_index) else {
            self.phase = AnimationPhase::Exhausted;
            return AnimationStep::Exhausted;
        };
        self.step_index += 1;

        let distance = haversine_km(position, self.segment.target);
        tracing::trace!("distance to {}: {distance:.4} km", self.segment.to);
        if distance < self.threshold_km {
            self.phase = AnimationPhase::Arrived;
            AnimationStep::Arrived(position)
        } else {
            AnimationStep::Moved(position)
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnimationEngine {
    tick: Duration,
    threshold_km: f64,
}

impl AnimationEngine {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            tick: config.animation_tick,
            threshold_km: config.proximity_threshold_km,
        }
    }

    pub fn tick(&self) -> Duration {
        self.tick
    }

    pub fn begin(
        &self,
        segment: Segment,
        polyline: Vec<Coordinate>,
        notifier: &mut Notifier,
    ) -> SegmentAnimation {
        notifier.notify(NEW_ROUTE_FOUND);
        tracing::info!(
            "animating {} -> {} over {} points",
            segment.from,
            segment.to,
            polyline.len()
        );
        SegmentAnimation::new(segment, polyline, self.threshold_km)
    }

    /// Advances `animation` once and mirrors the move on the map.
    pub fn step<S: MapSurface>(
        &self,
        animation: &mut SegmentAnimation,
        resources: &mut MapResources<S>,
    ) -> Result<AnimationStep, ClientError> {
        let step = animation.advance();
        match step {
            AnimationStep::Moved(at) | AnimationStep::Arrived(at) => {
                resources.move_marker(at).map_err(ClientError::Render)?;
            }
            AnimationStep::Exhausted => {
                tracing::info!(
                    "animation to {} completed without reaching threshold",
                    animation.segment().to
                );
            }
        }
        Ok(step)
    }

    /// Tells the backend the marker reached `node`. A failed delivery is
    /// returned for the caller to record; it never blocks completion.
    pub async fn signal_arrival<B: BackendApi>(
        &self,
        backend: &B,
        node: &NodeId,
        notifier: &mut Notifier,
    ) -> Result<(), ClientError> {
        tracing::info!("marker close to {node}, sending signal");
        notifier.notify(CALCULATING_ROUTE);
        match backend.marker_close(node).await {
            Ok(_) => Ok(()),
            Err(err) => {
                tracing::error!("failed to send marker-close: {err}");
                Err(ClientError::NotificationDelivery(err))
            }
        }
    }
}
