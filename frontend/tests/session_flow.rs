use std::{cell::RefCell, rc::Rc, time::Duration};

use frontend::{
    map::SceneMap,
    notify::CALCULATING_ROUTE,
    renderer::{ACTIVE_STYLE, FINAL_STYLE},
    ApiError, BackendApi, ClientConfig, RoutingFailure, SceneProvider, SegmentRouteProvider,
    SessionController, SessionState,
};
use shared::{
    interpolate_path, Ack, AltRouteEntry, Coordinate, NodeId, OptimizeRequest, OptimizeResponse,
    RouteStatus, RouteStatusKind,
};

/// Everything the fakes saw, in call order.
#[derive(Debug, Default)]
struct Journal {
    events: Vec<String>,
    optimize_calls: Vec<OptimizeRequest>,
    closes: Vec<NodeId>,
    status_calls: usize,
}

type Shared = Rc<RefCell<Journal>>;

/// Backend that reveals one node per marker-close, like the real optimizer.
struct ScriptedBackend {
    journal: Shared,
    route: Vec<NodeId>,
    alternatives: Vec<AltRouteEntry>,
    state: RefCell<(RouteStatusKind, usize)>,
    error_on_poll: Option<usize>,
    fail_status: bool,
    fail_close: bool,
}

impl ScriptedBackend {
    fn new(journal: Shared, route: &[&str]) -> Self {
        Self {
            journal,
            route: route.iter().map(|n| NodeId::from(*n)).collect(),
            alternatives: Vec::new(),
            state: RefCell::new((RouteStatusKind::Idle, 0)),
            error_on_poll: None,
            fail_status: false,
            fail_close: false,
        }
    }
}

impl BackendApi for ScriptedBackend {
    async fn reset(&self) -> Result<Ack, ApiError> {
        self.journal.borrow_mut().events.push("reset".into());
        Ok(Ack {
            status: "backend reset".into(),
        })
    }

    async fn optimize(&self, request: &OptimizeRequest) -> Result<OptimizeResponse, ApiError> {
        let mut journal = self.journal.borrow_mut();
        journal.events.push("optimize".into());
        journal.optimize_calls.push(request.clone());
        *self.state.borrow_mut() = (RouteStatusKind::Running, self.route.len().min(2));
        Ok(OptimizeResponse {
            status: "started".into(),
            source: Some(request.source.clone()),
            destination: Some(request.destination.clone()),
            message: None,
        })
    }

    async fn status(&self) -> Result<RouteStatus, ApiError> {
        let mut journal = self.journal.borrow_mut();
        journal.events.push("status".into());
        journal.status_calls += 1;
        if self.fail_status {
            return Err(ApiError::Status {
                status: 500,
                body: "status exploded".into(),
            });
        }
        if self.error_on_poll == Some(journal.status_calls) {
            *self.state.borrow_mut() = (RouteStatusKind::Error, 0);
            return Ok(RouteStatus {
                status: RouteStatusKind::Error,
                error: Some("optimizer crashed".into()),
                ..RouteStatus::idle()
            });
        }

        let (status, revealed) = *self.state.borrow();
        let final_route = self.route[..revealed].to_vec();
        let alternative_routes = self
            .alternatives
            .iter()
            .filter(|entry| final_route.contains(&entry.node))
            .cloned()
            .collect();
        Ok(RouteStatus {
            status,
            final_route,
            alternative_routes,
            error: None,
        })
    }

    async fn marker_close(&self, node: &NodeId) -> Result<Ack, ApiError> {
        let mut journal = self.journal.borrow_mut();
        journal.events.push(format!("close:{node}"));
        journal.closes.push(node.clone());
        if self.fail_close {
            return Err(ApiError::Status {
                status: 503,
                body: "unavailable".into(),
            });
        }

        let mut state = self.state.borrow_mut();
        if self.route.last() == Some(node) {
            state.0 = RouteStatusKind::Completed;
        } else {
            state.1 = (state.1 + 1).min(self.route.len());
        }
        Ok(Ack {
            status: "received".into(),
        })
    }
}

/// Straight-line router that journals requests and can refuse one target.
struct JournalRouter {
    journal: Shared,
    refuse: Option<Coordinate>,
}

impl SegmentRouteProvider for JournalRouter {
    async fn route(
        &self,
        from: Coordinate,
        to: Coordinate,
    ) -> Result<Vec<Coordinate>, RoutingFailure> {
        self.journal.borrow_mut().events.push(format!("route:{to}"));
        if self.refuse == Some(to) {
            return Err(RoutingFailure::NoRoute);
        }
        Ok(interpolate_path(from, to, 12))
    }
}

fn mangalagiri() -> Coordinate {
    Coordinate::new(16.4308, 80.5682)
}

fn request(source: &str, destination: &str) -> OptimizeRequest {
    OptimizeRequest {
        source: source.into(),
        destination: destination.into(),
        preferences: Default::default(),
    }
}

fn controller(
    backend: ScriptedBackend,
    router: JournalRouter,
    provider: SceneProvider,
) -> SessionController<ScriptedBackend, JournalRouter, SceneProvider> {
    SessionController::new(&ClientConfig::default(), backend, router, provider)
}

fn router(journal: &Shared) -> JournalRouter {
    JournalRouter {
        journal: Rc::clone(journal),
        refuse: None,
    }
}

fn scene<'a>(
    ctl: &'a SessionController<ScriptedBackend, JournalRouter, SceneProvider>,
) -> &'a SceneMap {
    ctl.map().expect("live map")
}

#[tokio::test(start_paused = true)]
async fn single_segment_session_signals_arrival_once() {
    let journal = Shared::default();
    let backend = ScriptedBackend::new(Rc::clone(&journal), &["Kuragallu", "Mangalagiri"]);
    let mut ctl = controller(backend, router(&journal), SceneProvider::default());

    ctl.submit(request("Kuragallu", "Mangalagiri")).await.unwrap();
    assert_eq!(ctl.state(), &SessionState::Submitted);
    {
        let journal = journal.borrow();
        assert_eq!(journal.optimize_calls.len(), 1);
        assert_eq!(journal.optimize_calls[0].source, "Kuragallu");
        assert_eq!(journal.optimize_calls[0].destination, "Mangalagiri");
    }

    assert_eq!(ctl.run().await, &SessionState::Completed);

    let journal = journal.borrow();
    assert_eq!(journal.closes, vec![NodeId::from("Mangalagiri")]);
    let routes = journal
        .events
        .iter()
        .filter(|e| e.starts_with("route:"))
        .count();
    assert_eq!(routes, 1);

    assert_eq!(ctl.session().current_node_index, 1);
    assert_eq!(ctl.session().current_position, Some(mangalagiri()));
    assert_eq!(ctl.backend_status(), RouteStatusKind::Completed);
    assert!(ctl.last_error().is_none());

    let map = scene(&ctl);
    assert_eq!(map.marker_position(), Some(mangalagiri()));
    assert_eq!(map.overlays_with_color(FINAL_STYLE.color).count(), 1);
    assert_eq!(map.overlays_with_color(ACTIVE_STYLE.color).count(), 0);
}

#[tokio::test(start_paused = true)]
async fn multi_segment_session_is_strictly_sequential() {
    let journal = Shared::default();
    let mut backend = ScriptedBackend::new(
        Rc::clone(&journal),
        &["Kuragallu", "16.445,80.54", "16.44,80.555", "Mangalagiri"],
    );
    backend.alternatives = vec![AltRouteEntry {
        node: NodeId::from("16.445,80.54"),
        alternatives: vec![
            vec!["16.445,80.54".into(), "16.44,80.555".into(), "Mangalagiri".into()],
            vec!["16.445,80.54".into(), "16.46,80.56".into(), "Mangalagiri".into()],
            vec!["16.445,80.54".into(), "16.42,80.55".into(), "Mangalagiri".into()],
        ],
    }];
    let mut ctl = controller(backend, router(&journal), SceneProvider::default());

    ctl.submit(request("Kuragallu", "Mangalagiri")).await.unwrap();
    assert_eq!(ctl.run().await, &SessionState::Completed);
    assert_eq!(ctl.session().current_node_index, 3);

    let journal = journal.borrow();
    assert_eq!(
        journal.closes,
        vec![
            NodeId::from("16.445,80.54"),
            NodeId::from("16.44,80.555"),
            NodeId::from("Mangalagiri")
        ]
    );

    // Every routed segment is closed before the next one is requested,
    // while status polling keeps going in between.
    let mut open = false;
    let mut polls_while_animating = 0;
    for event in &journal.events {
        if event.starts_with("route:") {
            assert!(!open, "segment requested while another was animating");
            open = true;
        } else if event.starts_with("close:") {
            assert!(open);
            open = false;
        } else if event == "status" && open {
            polls_while_animating += 1;
        }
    }
    assert!(polls_while_animating > 0);

    let map = scene(&ctl);
    assert_eq!(map.overlays_with_color(FINAL_STYLE.color).count(), 1);
    // final render draws all three candidates, chosen one included
    assert_eq!(map.overlay_count(), 1 + 3);
}

#[tokio::test(start_paused = true)]
async fn node_index_advances_by_one_and_never_while_animating() {
    let journal = Shared::default();
    let backend = ScriptedBackend::new(
        Rc::clone(&journal),
        &["Kuragallu", "16.445,80.54", "Mangalagiri"],
    );
    let mut ctl = controller(backend, router(&journal), SceneProvider::default());
    ctl.submit(request("Kuragallu", "Mangalagiri")).await.unwrap();

    let mut indices = vec![ctl.session().current_node_index];
    for _ in 0..200 {
        if ctl.state().is_settled() {
            break;
        }
        if ctl.state().is_animating() {
            let before = ctl.session().current_node_index;
            ctl.poll_once().await;
            assert!(ctl.state().is_animating());
            assert_eq!(ctl.session().current_node_index, before);
            ctl.animation_tick().await;
        } else {
            ctl.poll_once().await;
        }
        indices.push(ctl.session().current_node_index);
    }

    assert_eq!(ctl.state(), &SessionState::Completed);
    assert!(indices.windows(2).all(|w| w[1] == w[0] || w[1] == w[0] + 1));
    assert_eq!(*indices.last().unwrap(), 2);
    assert!(ctl.session().current_node_index < ctl.route().final_route.len());
}

#[tokio::test(start_paused = true)]
async fn backend_error_status_stops_polling() {
    let journal = Shared::default();
    let mut backend = ScriptedBackend::new(Rc::clone(&journal), &["Kuragallu", "Mangalagiri"]);
    backend.error_on_poll = Some(1);
    let mut ctl = controller(backend, router(&journal), SceneProvider::default());

    ctl.submit(request("Kuragallu", "Mangalagiri")).await.unwrap();
    let state = ctl.run().await.clone();
    assert!(matches!(state, SessionState::Error(ref msg) if msg.contains("optimizer crashed")));

    tokio::time::sleep(Duration::from_secs(5)).await;
    ctl.poll_once().await;

    let journal = journal.borrow();
    assert_eq!(journal.status_calls, 1);
    assert_eq!(journal.optimize_calls.len(), 1);
    assert!(journal.closes.is_empty());
}

#[tokio::test(start_paused = true)]
async fn status_fetch_failure_is_fatal() {
    let journal = Shared::default();
    let mut backend = ScriptedBackend::new(Rc::clone(&journal), &["Kuragallu", "Mangalagiri"]);
    backend.fail_status = true;
    let mut ctl = controller(backend, router(&journal), SceneProvider::default());

    ctl.submit(request("Kuragallu", "Mangalagiri")).await.unwrap();
    assert!(matches!(ctl.run().await, SessionState::Error(_)));
    assert!(ctl.last_error().unwrap().contains("network error"));
    assert_eq!(journal.borrow().status_calls, 1);
}

#[tokio::test(start_paused = true)]
async fn routing_failure_skips_animation_but_keeps_running() {
    let journal = Shared::default();
    let backend = ScriptedBackend::new(
        Rc::clone(&journal),
        &["Kuragallu", "Mangalagiri"],
    );
    let router = JournalRouter {
        journal: Rc::clone(&journal),
        refuse: Some(mangalagiri()),
    };
    let mut ctl = controller(backend, router, SceneProvider::default());
    ctl.submit(request("Kuragallu", "Mangalagiri")).await.unwrap();

    ctl.poll_once().await;
    assert_eq!(ctl.state(), &SessionState::Running);
    assert_eq!(ctl.session().current_node_index, 1);
    assert!(ctl.last_error().unwrap().contains("routing failed"));

    // the straight fallback is drawn as the active segment
    let active: Vec<_> = scene(&ctl)
        .overlays_with_color(ACTIVE_STYLE.color)
        .collect();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].path.len(), 2);

    ctl.poll_once().await;
    assert_eq!(ctl.state(), &SessionState::Running);
    assert!(journal.borrow().closes.is_empty());
}

#[tokio::test(start_paused = true)]
async fn failed_marker_close_still_completes_segment() {
    let journal = Shared::default();
    let mut backend = ScriptedBackend::new(Rc::clone(&journal), &["Kuragallu", "Mangalagiri"]);
    backend.fail_close = true;
    let mut ctl = controller(backend, router(&journal), SceneProvider::default());
    ctl.submit(request("Kuragallu", "Mangalagiri")).await.unwrap();

    ctl.poll_once().await;
    assert!(ctl.state().is_animating());
    while ctl.state().is_animating() {
        ctl.animation_tick().await;
    }

    assert_eq!(ctl.state(), &SessionState::Running);
    assert_eq!(ctl.session().current_node_index, 1);
    assert!(ctl.last_error().unwrap().contains("marker-close"));
    assert_eq!(journal.borrow().closes.len(), 1);
    assert_eq!(
        ctl.notification().map(|n| n.message.as_str()),
        Some(CALCULATING_ROUTE)
    );
}

#[tokio::test(start_paused = true)]
async fn resubmit_starts_from_a_clean_slate() {
    let journal = Shared::default();
    let provider = SceneProvider::default();
    let backend = ScriptedBackend::new(Rc::clone(&journal), &["Kuragallu", "Mangalagiri"]);
    let mut ctl = controller(backend, router(&journal), provider.clone());

    ctl.submit(request("Kuragallu", "Mangalagiri")).await.unwrap();
    ctl.run().await;
    assert_eq!(provider.live_surfaces(), 1);

    ctl.submit(request("Kuragallu", "Mangalagiri")).await.unwrap();
    assert_eq!(provider.live_surfaces(), 1);
    assert_eq!(ctl.state(), &SessionState::Submitted);
    assert_eq!(ctl.session().current_node_index, 0);
    assert_eq!(scene(&ctl).overlay_count(), 0);
    assert_eq!(
        ctl.session().current_position,
        Some(Coordinate::new(16.4543715, 80.5250379))
    );

    ctl.reset();
    ctl.reset();
    assert_eq!(provider.live_surfaces(), 0);
    assert_eq!(ctl.state(), &SessionState::Idle);
}

#[tokio::test(start_paused = true)]
async fn reset_mid_animation_releases_map_and_stops_signalling() {
    let journal = Shared::default();
    let backend = ScriptedBackend::new(Rc::clone(&journal), &["Kuragallu", "Mangalagiri"]);
    let provider = SceneProvider::default();
    let mut ctl = controller(backend, router(&journal), provider.clone());

    ctl.submit(request("Kuragallu", "Mangalagiri")).await.unwrap();
    for _ in 0..5 {
        if ctl.state().is_animating() {
            break;
        }
        ctl.poll_once().await;
    }
    assert!(ctl.state().is_animating());
    ctl.animation_tick().await;
    assert!(ctl.state().is_animating());
    assert_eq!(provider.live_surfaces(), 1);

    ctl.reset();
    assert_eq!(ctl.state(), &SessionState::Idle);
    assert_eq!(provider.live_surfaces(), 0);
    assert!(ctl.map().is_none());

    let status_calls = journal.borrow().status_calls;
    ctl.animation_tick().await;
    ctl.poll_once().await;
    assert_eq!(ctl.run().await, &SessionState::Idle);

    let journal = journal.borrow();
    assert!(journal.closes.is_empty());
    assert_eq!(journal.status_calls, status_calls);
}

#[tokio::test(start_paused = true)]
async fn cancelled_run_then_reset_leaves_nothing_running() {
    let journal = Shared::default();
    let backend = ScriptedBackend::new(Rc::clone(&journal), &["Kuragallu", "Mangalagiri"]);
    let provider = SceneProvider::default();
    let mut ctl = controller(backend, router(&journal), provider.clone());

    ctl.submit(request("Kuragallu", "Mangalagiri")).await.unwrap();
    // First poll lands at 500 ms; the segment needs 13 ticks of 100 ms.
    let cancelled = tokio::time::timeout(Duration::from_millis(800), ctl.run()).await;
    assert!(cancelled.is_err());
    assert!(ctl.state().is_animating());

    ctl.reset();
    assert_eq!(provider.live_surfaces(), 0);

    let status_calls = journal.borrow().status_calls;
    tokio::time::sleep(Duration::from_secs(5)).await;
    let journal = journal.borrow();
    assert!(journal.closes.is_empty());
    assert_eq!(journal.status_calls, status_calls);
}
