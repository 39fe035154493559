//! Scripted routes replayed by the backend.
//!
//! An itinerary book is a JSON list:
//!
//! ```json
//! [
//!   {
//!     "source": "Kuragallu",
//!     "destination": "Mangalagiri",
//!     "route": ["Kuragallu", "16.445,80.54", "Mangalagiri"],
//!     "alternatives": {
//!       "16.445,80.54": [["16.445,80.54", "Mangalagiri"], ["16.445,80.54", "16.42,80.55", "Mangalagiri"]]
//!     }
//!   }
//! ]
//! ```

use std::{collections::HashMap, fs::File, io::Read, path::Path};

use serde::Deserialize;
use shared::NodeId;

use crate::error::BackendError;

#[derive(Debug, Clone, Deserialize)]
pub struct ItineraryEntry {
    pub source: String,
    pub destination: String,
    pub route: Vec<NodeId>,
    #[serde(default)]
    pub alternatives: HashMap<NodeId, Vec<Vec<NodeId>>>,
    /// Simulates an optimizer crash after this many nodes have been revealed.
    #[serde(default)]
    pub fail_after: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Itinerary {
    pub route: Vec<NodeId>,
    alternatives: HashMap<NodeId, Vec<Vec<NodeId>>>,
    pub fail_after: Option<usize>,
}

impl Itinerary {
    /// Straight from source to destination, no detours.
    pub fn direct(source: &str, destination: &str) -> Self {
        let mut route = vec![NodeId::from(source)];
        if source != destination {
            route.push(NodeId::from(destination));
        }
        Self {
            route,
            alternatives: HashMap::new(),
            fail_after: None,
        }
    }

    /// Candidate paths from the node at `index`. The chosen remainder of the
    /// route always comes first.
    pub fn alternatives_at(&self, index: usize) -> Vec<Vec<NodeId>> {
        let Some(node) = self.route.get(index) else {
            return Vec::new();
        };
        let chosen = self.route[index..].to_vec();
        let mut candidates = vec![chosen.clone()];
        if let Some(scripted) = self.alternatives.get(node) {
            candidates.extend(scripted.iter().filter(|alt| **alt != chosen).cloned());
        }
        candidates
    }
}

#[derive(Debug, Clone, Default)]
pub struct ItineraryBook {
    entries: Vec<ItineraryEntry>,
}

impl ItineraryBook {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, BackendError> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader(reader: impl Read) -> Result<Self, BackendError> {
        let entries: Vec<ItineraryEntry> = serde_json::from_reader(reader)?;
        for entry in &entries {
            let starts = entry.route.first().map(NodeId::as_str) == Some(entry.source.as_str());
            let ends = entry.route.last().map(NodeId::as_str) == Some(entry.destination.as_str());
            if !starts || !ends {
                return Err(BackendError::InvalidItinerary {
                    from: entry.source.clone(),
                    to: entry.destination.clone(),
                });
            }
        }
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn plan(&self, source: &str, destination: &str) -> Itinerary {
        match self
            .entries
            .iter()
            .find(|entry| entry.source == source && entry.destination == destination)
        {
            Some(entry) => Itinerary {
                route: entry.route.clone(),
                alternatives: entry.alternatives.clone(),
                fail_after: entry.fail_after,
            },
            None => {
                tracing::debug!("no itinerary for {source} -> {destination}, going direct");
                Itinerary::direct(source, destination)
            }
        }
    }
}
