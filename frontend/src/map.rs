//! Map-rendering collaborator and the per-attempt resource owner.

use std::{cell::Cell, collections::BTreeMap, rc::Rc};

use serde_json::{json, Value};
use shared::Coordinate;
use thiserror::Error;

use crate::error::ClientError;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MapError {
    #[error("map surface already disposed")]
    Disposed,
    #[error("unknown overlay {0:?}")]
    UnknownOverlay(OverlayId),
    #[error("unknown marker {0:?}")]
    UnknownMarker(MarkerId),
    #[error("map backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OverlayId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MarkerId(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub struct PathStyle {
    pub color: &'static str,
    pub opacity: f64,
    pub weight: u32,
}

/// Creates map surfaces, one per routing attempt.
pub trait MapProvider {
    type Surface: MapSurface;

    fn create_surface(&mut self, center: Coordinate, zoom: u8) -> Result<Self::Surface, MapError>;
}

pub trait MapSurface {
    fn add_marker(&mut self, at: Coordinate) -> Result<MarkerId, MapError>;
    fn set_marker_position(&mut self, marker: MarkerId, at: Coordinate) -> Result<(), MapError>;
    fn remove_marker(&mut self, marker: MarkerId) -> Result<(), MapError>;
    fn recenter(&mut self, at: Coordinate) -> Result<(), MapError>;
    fn add_overlay(&mut self, path: &[Coordinate], style: &PathStyle) -> Result<OverlayId, MapError>;
    fn remove_overlay(&mut self, overlay: OverlayId) -> Result<(), MapError>;
    fn dispose(&mut self) -> Result<(), MapError>;
}

/// Everything one routing attempt draws with: the surface, the marker and
/// the overlays currently on screen.
///
/// Dropping the value releases it, so no exit path can leak overlays.
#[derive(Debug)]
pub struct MapResources<S: MapSurface> {
    surface: Option<S>,
    marker: Option<MarkerId>,
    overlays: Vec<OverlayId>,
}

impl<S: MapSurface> MapResources<S> {
    pub fn acquire<P>(provider: &mut P, center: Coordinate, zoom: u8) -> Result<Self, MapError>
    where
        P: MapProvider<Surface = S>,
    {
        let mut surface = provider.create_surface(center, zoom)?;
        let marker = match surface.add_marker(center) {
            Ok(marker) => marker,
            Err(err) => {
                if let Err(dispose_err) = surface.dispose() {
                    tracing::warn!("failed to dispose half-built map: {dispose_err}");
                }
                return Err(err);
            }
        };
        tracing::info!("map initialized at {center} (zoom {zoom})");
        Ok(Self {
            surface: Some(surface),
            marker: Some(marker),
            overlays: Vec::new(),
        })
    }

    pub fn surface(&self) -> Option<&S> {
        self.surface.as_ref()
    }

    fn surface_mut(&mut self) -> Result<&mut S, MapError> {
        self.surface.as_mut().ok_or(MapError::Disposed)
    }

    /// Moves the marker and pans the viewport onto it.
    pub fn move_marker(&mut self, at: Coordinate) -> Result<(), MapError> {
        let marker = self.marker.ok_or(MapError::Disposed)?;
        let surface = self.surface_mut()?;
        surface.set_marker_position(marker, at)?;
        surface.recenter(at)
    }

    pub fn add_overlay(&mut self, path: &[Coordinate], style: &PathStyle) -> Result<OverlayId, MapError> {
        let id = self.surface_mut()?.add_overlay(path, style)?;
        self.overlays.push(id);
        Ok(id)
    }

    pub fn active_overlays(&self) -> &[OverlayId] {
        &self.overlays
    }

    /// Retracts every overlay drawn so far. Removal failures are logged and
    /// the overlay is forgotten either way; the failures are returned for
    /// inspection only.
    pub fn clear_overlays(&mut self) -> Vec<ClientError> {
        let overlays = std::mem::take(&mut self.overlays);
        let Some(surface) = self.surface.as_mut() else {
            return Vec::new();
        };
        overlays
            .into_iter()
            .filter_map(|overlay| surface.remove_overlay(overlay).err())
            .map(teardown_failure)
            .collect()
    }

    pub fn is_released(&self) -> bool {
        self.surface.is_none()
    }

    /// Tears everything down. Each failing step is logged and skipped;
    /// what failed is returned, never propagated.
    pub fn release(&mut self) -> Vec<ClientError> {
        if self.surface.is_none() {
            return Vec::new();
        }
        let mut failures = self.clear_overlays();
        let marker = self.marker.take();
        if let Some(mut surface) = self.surface.take() {
            if let Some(marker) = marker {
                if let Err(err) = surface.remove_marker(marker) {
                    failures.push(teardown_failure(err));
                }
            }
            if let Err(err) = surface.dispose() {
                failures.push(teardown_failure(err));
            }
        }
        tracing::debug!("map resources released ({} teardown failures)", failures.len());
        failures
    }
}

fn teardown_failure(err: MapError) -> ClientError {
    let err = ClientError::Teardown(err);
    tracing::warn!("{err}");
    err
}

impl<S: MapSurface> Drop for MapResources<S> {
    fn drop(&mut self) {
        self.release();
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub path: Vec<Coordinate>,
    pub style: PathStyle,
}

/// In-memory surface. Keeps the scene so it can be inspected or exported.
#[derive(Debug)]
pub struct SceneMap {
    center: Coordinate,
    zoom: u8,
    marker: Option<(MarkerId, Coordinate)>,
    overlays: BTreeMap<OverlayId, Overlay>,
    next_id: u64,
    disposed: bool,
    live: Rc<Cell<usize>>,
}

impl SceneMap {
    pub fn center(&self) -> Coordinate {
        self.center
    }

    pub fn marker_position(&self) -> Option<Coordinate> {
        self.marker.map(|(_, at)| at)
    }

    pub fn overlays(&self) -> impl Iterator<Item = &Overlay> {
        self.overlays.values()
    }

    pub fn overlay_count(&self) -> usize {
        self.overlays.len()
    }

    pub fn overlays_with_color<'a>(&'a self, color: &'a str) -> impl Iterator<Item = &'a Overlay> {
        self.overlays.values().filter(move |o| o.style.color == color)
    }

    /// GeoJSON `FeatureCollection` with one `LineString` per overlay and a
    /// `Point` for the marker.
    pub fn to_geojson(&self) -> Value {
        let mut features: Vec<Value> = self
            .overlays
            .values()
            .map(|overlay| {
                let coordinates: Vec<[f64; 2]> =
                    overlay.path.iter().map(|c| [c.lon, c.lat]).collect();
                json!({
                    "type": "Feature",
                    "geometry": { "type": "LineString", "coordinates": coordinates },
                    "properties": {
                        "stroke": overlay.style.color,
                        "stroke-opacity": overlay.style.opacity,
                        "stroke-width": overlay.style.weight,
                    }
                })
            })
            .collect();

        if let Some(at) = self.marker_position() {
            features.push(json!({
                "type": "Feature",
                "geometry": { "type": "Point", "coordinates": [at.lon, at.lat] },
                "properties": { "role": "marker", "zoom": self.zoom }
            }));
        }

        json!({ "type": "FeatureCollection", "features": features })
    }

    fn check_live(&self) -> Result<(), MapError> {
        if self.disposed {
            Err(MapError::Disposed)
        } else {
            Ok(())
        }
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

impl MapSurface for SceneMap {
    fn add_marker(&mut self, at: Coordinate) -> Result<MarkerId, MapError> {
        self.check_live()?;
        let id = MarkerId(self.next_id());
        self.marker = Some((id, at));
        Ok(id)
    }

    fn set_marker_position(&mut self, marker: MarkerId, at: Coordinate) -> Result<(), MapError> {
        self.check_live()?;
        match self.marker.as_mut() {
            Some((id, pos)) if *id == marker => {
                *pos = at;
                tracing::debug!("marker moved to {at}");
                Ok(())
            }
            _ => Err(MapError::UnknownMarker(marker)),
        }
    }

    fn remove_marker(&mut self, marker: MarkerId) -> Result<(), MapError> {
        self.check_live()?;
        match self.marker {
            Some((id, _)) if id == marker => {
                self.marker = None;
                Ok(())
            }
            _ => Err(MapError::UnknownMarker(marker)),
        }
    }

    fn recenter(&mut self, at: Coordinate) -> Result<(), MapError> {
        self.check_live()?;
        self.center = at;
        Ok(())
    }

    fn add_overlay(&mut self, path: &[Coordinate], style: &PathStyle) -> Result<OverlayId, MapError> {
        self.check_live()?;
        let id = OverlayId(self.next_id());
        self.overlays.insert(
            id,
            Overlay {
                path: path.to_vec(),
                style: style.clone(),
            },
        );
        Ok(id)
    }

    fn remove_overlay(&mut self, overlay: OverlayId) -> Result<(), MapError> {
        self.check_live()?;
        self.overlays
            .remove(&overlay)
            .map(|_| ())
            .ok_or(MapError::UnknownOverlay(overlay))
    }

    fn dispose(&mut self) -> Result<(), MapError> {
        self.check_live()?;
        self.disposed = true;
        self.overlays.clear();
        self.marker = None;
        self.live.set(self.live.get().saturating_sub(1));
        Ok(())
    }
}

/// Hands out [`SceneMap`]s and counts how many are still undisposed.
#[derive(Debug, Clone, Default)]
pub struct SceneProvider {
    live: Rc<Cell<usize>>,
}

impl SceneProvider {
    pub fn live_surfaces(&self) -> usize {
        self.live.get()
    }
}

impl MapProvider for SceneProvider {
    type Surface = SceneMap;

    fn create_surface(&mut self, center: Coordinate, zoom: u8) -> Result<SceneMap, MapError> {
        self.live.set(self.live.get() + 1);
        Ok(SceneMap {
            center,
            zoom,
            marker: None,
            overlays: BTreeMap::new(),
            next_id: 0,
            disposed: false,
            live: Rc::clone(&self.live),
        })
    }
}
