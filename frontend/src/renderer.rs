use shared::{AltRouteEntry, Coordinate, NodeId};

use crate::{
    geocoder::Geocoder,
    map::{MapError, MapResources, MapSurface, OverlayId, PathStyle},
};

pub const ACTIVE_STYLE: PathStyle = PathStyle {
    color: "#00FF00",
    opacity: 1.0,
    weight: 4,
};

pub const FINAL_STYLE: PathStyle = PathStyle {
    color: "#FF0000",
    opacity: 1.0,
    weight: 4,
};

pub const ALT_ROUTE_COLORS: [&str; 8] = [
    "#FF00FF", "#00CED1", "#FFA500", "#8A2BE2", "#00FF7F", "#FF4500", "#1E90FF", "#FFD700",
];

/// Style of the `index`-th alternative, cycling through the palette.
pub fn alternative_style(index: usize) -> PathStyle {
    PathStyle {
        color: ALT_ROUTE_COLORS[index % ALT_ROUTE_COLORS.len()],
        opacity: 0.7,
        weight: 2,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderSummary {
    pub primary: OverlayId,
    pub alternatives: usize,
}

/// Draws route overlays. Every render starts by retracting whatever the
/// previous one left on the map.
#[derive(Debug, Clone, Default)]
pub struct RouteRenderer;

impl RouteRenderer {
    /// Active segment plus the non-chosen alternatives recorded at `from`.
    pub fn render_segment<S: MapSurface>(
        &self,
        resources: &mut MapResources<S>,
        geocoder: &Geocoder,
        from: &NodeId,
        to: &NodeId,
        polyline: &[Coordinate],
        alt_routes: &[AltRouteEntry],
    ) -> Result<RenderSummary, MapError> {
        resources.clear_overlays();
        let primary = resources.add_overlay(polyline, &ACTIVE_STYLE)?;

        let mut alternatives = 0;
        for entry in alt_routes
            .iter()
            .filter(|entry| &entry.node == from && entry.alternatives.len() > 1)
        {
            for (i, alt) in entry.overlay_alternatives().iter().enumerate() {
                let waypoints = resolve_all(geocoder, alt);
                resources.add_overlay(&waypoints, &alternative_style(i))?;
                alternatives += 1;
            }
        }

        tracing::debug!("rendered segment {from} -> {to} with {alternatives} alternative(s)");
        Ok(RenderSummary {
            primary,
            alternatives,
        })
    }

    /// Whole route in the final colour and every recorded alternative,
    /// chosen ones included.
    pub fn render_final<S: MapSurface>(
        &self,
        resources: &mut MapResources<S>,
        geocoder: &Geocoder,
        full_route: &[NodeId],
        alt_routes: &[AltRouteEntry],
    ) -> Result<RenderSummary, MapError> {
        resources.clear_overlays();
        let waypoints = resolve_all(geocoder, full_route);
        let primary = resources.add_overlay(&waypoints, &FINAL_STYLE)?;

        let mut alternatives = 0;
        for entry in alt_routes {
            for (i, alt) in entry.alternatives.iter().enumerate() {
                let waypoints = resolve_all(geocoder, alt);
                resources.add_overlay(&waypoints, &alternative_style(i))?;
                alternatives += 1;
            }
        }

        tracing::info!(
            "final route rendered: {} nodes, {alternatives} alternative(s)",
            full_route.len()
        );
        Ok(RenderSummary {
            primary,
            alternatives,
        })
    }
}

fn resolve_all(geocoder: &Geocoder, nodes: &[NodeId]) -> Vec<Coordinate> {
    nodes.iter().map(|node| geocoder.resolve_node(node)).collect()
}
