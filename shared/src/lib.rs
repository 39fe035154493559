use std::fmt;

use serde::{Deserialize, Serialize};

const EARTH_RADIUS_KM: f64 = 6_371.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn interpolate(self, other: Self, t: f64) -> Self {
        Self {
            lat: self.lat + (other.lat - self.lat) * t,
            lon: self.lon + (other.lon - self.lon) * t,
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lon)
    }
}

/// Great-circle distance in kilometres.
pub fn haversine_km(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let sin_dlat = (dlat / 2.0).sin();
    let sin_dlon = (dlon / 2.0).sin();

    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

pub fn path_length_km(path: &[Coordinate]) -> f64 {
    path.windows(2).map(|w| haversine_km(w[0], w[1])).sum()
}

/// Straight line from `start` to `end` split into `steps` equal legs.
///
/// The first and last points are exactly `start` and `end`, so a marker
/// walking the path always lands on the target.
pub fn interpolate_path(start: Coordinate, end: Coordinate, steps: usize) -> Vec<Coordinate> {
    let steps = steps.max(1);
    let mut path = Vec::with_capacity(steps + 1);
    path.push(start);
    for i in 1..steps {
        path.push(start.interpolate(end, i as f64 / steps as f64));
    }
    path.push(end);
    path
}

/// Opaque location identifier: a place name or a `"lat,lon"` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteStatusKind {
    #[default]
    Idle,
    Running,
    Completed,
    Error,
}

impl fmt::Display for RouteStatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Error => "error",
        };
        f.write_str(label)
    }
}

/// Progress of the backend optimizer as served by `GET /status`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RouteStatus {
    pub status: RouteStatusKind,
    #[serde(default)]
    pub final_route: Vec<NodeId>,
    #[serde(default)]
    pub alternative_routes: Vec<AltRouteEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RouteStatus {
    pub fn idle() -> Self {
        Self::default()
    }

    /// Alternatives recorded for `node`, if the backend has reached it.
    pub fn alternatives_for(&self, node: &NodeId) -> impl Iterator<Item = &AltRouteEntry> {
        self.alternative_routes
            .iter()
            .filter(move |entry| &entry.node == node)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AltRouteEntry {
    pub node: NodeId,
    #[serde(default)]
    pub alternatives: Vec<Vec<NodeId>>,
}

impl AltRouteEntry {
    /// Candidates other than the chosen path (index 0).
    pub fn overlay_alternatives(&self) -> &[Vec<NodeId>] {
        self.alternatives.get(1..).unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default = "default_preference")]
    pub traffic: u8,
    #[serde(default = "default_preference")]
    pub weather: u8,
    #[serde(default = "default_preference")]
    pub elevation: u8,
    #[serde(default = "default_preference")]
    pub air_quality: u8,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            traffic: default_preference(),
            weather: default_preference(),
            elevation: default_preference(),
            air_quality: default_preference(),
        }
    }
}

pub fn default_preference() -> u8 {
    50
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizeRequest {
    pub source: String,
    pub destination: String,
    #[serde(default)]
    pub preferences: Preferences,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizeResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerCloseRequest {
    pub node: NodeId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ack {
    pub status: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SegmentRequest {
    pub start: Coordinate,
    pub end: Coordinate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentResponse {
    pub path: Vec<Coordinate>,
    pub distance_km: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub message: String,
}
