use std::f64::consts::PI;

use shared::{path_length_km, Coordinate, SegmentRequest};

const STEPS: usize = 32;
/// Bow height as a fraction of the straight-line span.
const BOW_RATIO: f64 = 0.05;

/// Road-like path between two waypoints: a gentle arc that starts and ends
/// exactly on the requested points.
pub fn generate_segment(req: &SegmentRequest) -> Vec<Coordinate> {
    let start = req.start;
    let end = req.end;
    if start == end {
        return vec![start, end];
    }

    let perp = perpendicular_unit(start, end);
    let span = ((end.lat - start.lat).powi(2) + (end.lon - start.lon).powi(2)).sqrt();
    let mut path = Vec::with_capacity(STEPS + 1);

    for i in 0..=STEPS {
        let t = i as f64 / STEPS as f64;
        let mut point = start.interpolate(end, t);
        let bow = (PI * t).sin() * span * BOW_RATIO;
        point.lat += perp.lat * bow;
        point.lon += perp.lon * bow;
        path.push(point);
    }

    // sin(pi) is not exactly zero
    path[0] = start;
    path[STEPS] = end;
    path
}

pub fn approximate_distance_km(path: &[Coordinate]) -> f64 {
    path_length_km(path)
}

fn perpendicular_unit(start: Coordinate, end: Coordinate) -> Coordinate {
    let dx = end.lon - start.lon;
    let dy = end.lat - start.lat;
    let len = (dx * dx + dy * dy).sqrt().max(f64::EPSILON);
    Coordinate {
        lon: -dy / len,
        lat: dx / len,
    }
}
