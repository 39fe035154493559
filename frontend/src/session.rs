//! Top-level state machine for one routing attempt.
//!
//! ```text
//! Idle -> Submitted -> Running <-> AnimatingSegment
//!                         |              |
//!                         v              v
//!                     Completed        Error
//! ```
//!
//! Both timers (status polling and animation steps) are driven from
//! [`SessionController::run`] on a single task. Being in
//! `AnimatingSegment` is what keeps the poller from advancing, so there is
//! no separate "animating" flag to drift out of sync.

use shared::{Coordinate, NodeId, OptimizeRequest, RouteStatus, RouteStatusKind};
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};

use crate::{
    animation::{AnimationEngine, AnimationStep, Segment, SegmentAnimation},
    api::BackendApi,
    config::ClientConfig,
    error::ClientError,
    geocoder::Geocoder,
    map::{MapError, MapProvider, MapResources},
    notify::{Notification, Notifier},
    poller::{PollAction, StatusPoller},
    renderer::RouteRenderer,
    segment::{straight_line, SegmentRouteProvider},
};

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Idle,
    Submitted,
    Running,
    AnimatingSegment(SegmentAnimation),
    Completed,
    Error(String),
}

impl SessionState {
    pub fn is_animating(&self) -> bool {
        matches!(self, Self::AnimatingSegment(_))
    }

    /// Completed and Error end the polling loop.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Completed | Self::Error(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Submitted => "submitted",
            Self::Running => "running",
            Self::AnimatingSegment(_) => "animating",
            Self::Completed => "completed",
            Self::Error(_) => "error",
        }
    }
}

/// Progress through `final_route`. Recreated on every reset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnimationSession {
    pub current_node_index: usize,
    pub current_position: Option<Coordinate>,
}

pub struct SessionController<B, R, P: MapProvider> {
    backend: B,
    router: R,
    maps: P,
    geocoder: Geocoder,
    initial_zoom: u8,
    poller: StatusPoller,
    engine: AnimationEngine,
    renderer: RouteRenderer,
    notifier: Notifier,
    state: SessionState,
    session: AnimationSession,
    route: RouteStatus,
    resources: Option<MapResources<P::Surface>>,
    last_error: Option<String>,
    final_rendered: bool,
}

impl<B, R, P> SessionController<B, R, P>
where
    B: BackendApi,
    R: SegmentRouteProvider,
    P: MapProvider,
{
    pub fn new(config: &ClientConfig, backend: B, router: R, maps: P) -> Self {
        Self {
            backend,
            router,
            maps,
            geocoder: Geocoder::default(),
            initial_zoom: config.initial_zoom,
            poller: StatusPoller::new(config),
            engine: AnimationEngine::new(config),
            renderer: RouteRenderer,
            notifier: Notifier::new(config.notification_ttl),
            state: SessionState::Idle,
            session: AnimationSession::default(),
            route: RouteStatus::idle(),
            resources: None,
            last_error: None,
            final_rendered: false,
        }
    }

    pub fn with_geocoder(mut self, geocoder: Geocoder) -> Self {
        self.geocoder = geocoder;
        self
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn session(&self) -> &AnimationSession {
        &self.session
    }

    /// Last `RouteStatus` received from the backend.
    pub fn route(&self) -> &RouteStatus {
        &self.route
    }

    pub fn backend_status(&self) -> RouteStatusKind {
        self.route.status
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn notification(&self) -> Option<&Notification> {
        self.notifier.current(Instant::now())
    }

    pub fn map(&self) -> Option<&P::Surface> {
        self.resources.as_ref().and_then(|r| r.surface())
    }

    /// Tells the backend a fresh client is starting. Failures are only logged.
    pub async fn announce(&self) {
        if let Err(err) = self.backend.reset().await {
            tracing::error!("failed to confirm backend reset: {err}");
        }
    }

    /// Starts a new attempt: clears the previous one, opens the map at the
    /// source and asks the backend to optimize.
    pub async fn submit(&mut self, request: OptimizeRequest) -> Result<(), ClientError> {
        self.reset();

        let origin = self.geocoder.resolve(&request.source);
        match MapResources::acquire(&mut self.maps, origin, self.initial_zoom) {
            Ok(resources) => self.resources = Some(resources),
            Err(err) => return Err(self.fail(ClientError::Render(err))),
        }
        self.session.current_position = Some(origin);
        self.state = SessionState::Submitted;

        match self.backend.optimize(&request).await {
            Ok(response) => {
                tracing::info!(
                    "optimization {} for {} -> {}",
                    response.status,
                    request.source,
                    request.destination
                );
                Ok(())
            }
            Err(err) => Err(self.fail(ClientError::Network(err))),
        }
    }

    /// Drives polling and animation until the attempt completes or fails.
    pub async fn run(&mut self) -> &SessionState {
        if matches!(self.state, SessionState::Idle) {
            return &self.state;
        }

        let period = self.poller.interval();
        let mut poll = interval_at(Instant::now() + period, period);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut steps = interval(self.engine.tick());
        steps.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while !self.state.is_settled() {
            let animating = self.state.is_animating();
            tokio::select! {
                _ = poll.tick() => self.poll_once().await,
                _ = steps.tick(), if animating => self.animation_tick().await,
            }
            self.notifier.expire(Instant::now());
        }

        tracing::info!("session settled: {}", self.state.name());
        &self.state
    }

    /// One polling cycle: fetch, mirror, then maybe advance or finish.
    pub async fn poll_once(&mut self) {
        if matches!(self.state, SessionState::Idle) || self.state.is_settled() {
            return;
        }

        let status = match self.poller.fetch(&self.backend).await {
            Ok(status) => status,
            Err(err) => {
                self.fail(err);
                return;
            }
        };

        if matches!(self.state, SessionState::Submitted) {
            self.state = SessionState::Running;
        }
        let action = StatusPoller::next_action(
            &status,
            self.session.current_node_index,
            self.state.is_animating(),
        );
        self.route = status;

        match action {
            PollAction::Wait => {}
            PollAction::Advance { from, to } => self.start_segment(from, to).await,
            PollAction::RenderFinal => self.finish(),
            PollAction::Fail(message) => {
                self.fail(ClientError::BackendReported(message));
            }
        }
    }

    async fn start_segment(&mut self, from: NodeId, to: NodeId) {
        let from_coord = self.geocoder.resolve_node(&from);
        let to_coord = self.geocoder.resolve_node(&to);

        let (polyline, routed) = match self.router.route(from_coord, to_coord).await {
            Ok(path) if path.is_empty() => (straight_line(from_coord, to_coord), true),
            Ok(path) => (path, true),
            Err(err) => {
                self.record(ClientError::Routing(err));
                (straight_line(from_coord, to_coord), false)
            }
        };

        let rendered = match self.resources.as_mut() {
            Some(resources) => self.renderer.render_segment(
                resources,
                &self.geocoder,
                &from,
                &to,
                &polyline,
                &self.route.alternative_routes,
            ),
            None => Err(MapError::Disposed),
        };
        if let Err(err) = rendered {
            self.fail(ClientError::Render(err));
            return;
        }

        if !routed {
            // Nothing to animate; the segment counts as done without an arrival.
            self.complete_segment();
            return;
        }

        let segment = Segment {
            from,
            to,
            target: to_coord,
        };
        let animation = self.engine.begin(segment, polyline, &mut self.notifier);
        self.state = SessionState::AnimatingSegment(animation);
    }

    /// One animation step. Terminal steps complete the segment.
    pub async fn animation_tick(&mut self) {
        let SessionState::AnimatingSegment(animation) = &mut self.state else {
            return;
        };
        let target_node = animation.segment().to.clone();

        let step = match self.resources.as_mut() {
            Some(resources) => self.engine.step(animation, resources),
            None => Err(ClientError::Render(MapError::Disposed)),
        };

        match step {
            Err(err) => {
                self.fail(err);
            }
            Ok(AnimationStep::Moved(at)) => self.session.current_position = Some(at),
            Ok(AnimationStep::Arrived(at)) => {
                self.session.current_position = Some(at);
                if let Err(err) = self
                    .engine
                    .signal_arrival(&self.backend, &target_node, &mut self.notifier)
                    .await
                {
                    self.record(err);
                }
                self.complete_segment();
            }
            Ok(AnimationStep::Exhausted) => self.complete_segment(),
        }
    }

    fn complete_segment(&mut self) {
        self.session.current_node_index += 1;
        self.state = SessionState::Running;
        tracing::debug!("segment done, node index {}", self.session.current_node_index);
    }

    fn finish(&mut self) {
        if !self.final_rendered {
            let rendered = match self.resources.as_mut() {
                Some(resources) => self.renderer.render_final(
                    resources,
                    &self.geocoder,
                    &self.route.final_route,
                    &self.route.alternative_routes,
                ),
                None => Err(MapError::Disposed),
            };
            if let Err(err) = rendered {
                self.fail(ClientError::Render(err));
                return;
            }
            self.final_rendered = true;
        }
        self.state = SessionState::Completed;
    }

    /// Records a non-fatal error; the session carries on.
    fn record(&mut self, err: ClientError) {
        tracing::warn!("{err}");
        self.last_error = Some(err.to_string());
    }

    fn fail(&mut self, err: ClientError) -> ClientError {
        tracing::error!("session failed: {err}");
        let message = err.to_string();
        self.last_error = Some(message.clone());
        self.state = SessionState::Error(message);
        err
    }

    /// Back to `Idle`: map released, progress and errors discarded.
    /// Safe to call at any time, any number of times.
    pub fn reset(&mut self) {
        if let Some(mut resources) = self.resources.take() {
            resources.release();
        }
        self.state = SessionState::Idle;
        self.session = AnimationSession::default();
        self.route = RouteStatus::idle();
        self.last_error = None;
        self.final_rendered = false;
        self.notifier.clear();
    }
}
