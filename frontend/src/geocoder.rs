use std::{collections::HashMap, fs, path::Path};

use shared::{Coordinate, NodeId};

use crate::error::ClientError;

/// Returned for anything that is neither a coordinate pair nor a known place.
pub const FALLBACK_COORDINATE: Coordinate = Coordinate::new(16.4308, 80.5682);

/// Resolves node strings to coordinates. Never fails: unknown names map to
/// [`FALLBACK_COORDINATE`] so the marker always has somewhere to go.
#[derive(Debug, Clone)]
pub struct Geocoder {
    places: HashMap<String, Coordinate>,
    fallback: Coordinate,
}

impl Default for Geocoder {
    fn default() -> Self {
        let places = [
            ("Kuragallu", Coordinate::new(16.4543715, 80.5250379)),
            ("Mangalagiri", Coordinate::new(16.4308, 80.5682)),
        ]
        .into_iter()
        .map(|(name, coord)| (name.to_string(), coord))
        .collect();

        Self {
            places,
            fallback: FALLBACK_COORDINATE,
        }
    }
}

impl Geocoder {
    pub fn resolve(&self, input: &str) -> Coordinate {
        if let Some(coord) = parse_coordinate_pair(input) {
            return coord;
        }
        match self.lookup(input) {
            Some(coord) => coord,
            None => {
                tracing::debug!("no coordinate for {input:?}, using fallback {}", self.fallback);
                self.fallback
            }
        }
    }

    pub fn resolve_node(&self, node: &NodeId) -> Coordinate {
        self.resolve(node.as_str())
    }

    pub fn lookup(&self, name: &str) -> Option<Coordinate> {
        self.places.get(name.trim()).copied()
    }

    pub fn insert(&mut self, name: impl Into<String>, coord: Coordinate) {
        self.places.insert(name.into(), coord);
    }

    /// Merges a `{ "Name": [lat, lon] }` JSON file into the table.
    pub fn extend_from_file(&mut self, path: impl AsRef<Path>) -> Result<usize, ClientError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ClientError::GazetteerIo {
            path: path.to_path_buf(),
            source,
        })?;
        let entries: HashMap<String, [f64; 2]> =
            serde_json::from_str(&raw).map_err(|source| ClientError::GazetteerParse {
                path: path.to_path_buf(),
                source,
            })?;

        let count = entries.len();
        for (name, [lat, lon]) in entries {
            self.insert(name, Coordinate::new(lat, lon));
        }
        tracing::info!("loaded {count} places from {}", path.display());
        Ok(count)
    }
}

fn parse_coordinate_pair(input: &str) -> Option<Coordinate> {
    let (lat, lon) = input.split_once(',')?;
    if lon.contains(',') {
        return None;
    }
    let lat = lat.trim().parse::<f64>().ok()?;
    let lon = lon.trim().parse::<f64>().ok()?;
    (lat.is_finite() && lon.is_finite()).then_some(Coordinate { lat, lon })
}
