//! Live route visualization client.
//!
//! Submits a source/destination pair to the route-progress backend, then
//! follows the backend as it reveals the chosen path node by node: each new
//! segment is routed, drawn with its competing alternatives, and walked by
//! an animated marker whose arrival is signalled back to the backend.

pub mod animation;
pub mod api;
pub mod config;
pub mod error;
pub mod geocoder;
pub mod map;
pub mod notify;
pub mod poller;
pub mod renderer;
pub mod segment;
pub mod session;

pub use api::{ApiError, BackendApi, HttpBackend};
pub use config::ClientConfig;
pub use error::ClientError;
pub use geocoder::Geocoder;
pub use map::{MapProvider, MapResources, MapSurface, SceneMap, SceneProvider};
pub use segment::{HttpSegmentRouter, RoutingFailure, SegmentRouteProvider, StraightLineRouter};
pub use session::{AnimationSession, SessionController, SessionState};
