//! Planar geometry on WGS 84 coordinates.
//!
//! Only what zone assignment and provider envelopes need: points, polygons
//! with holes, and a point-in-polygon test that treats the boundary as
//! inside (a node sitting exactly on a zone border belongs to that zone).

use serde::{Deserialize, Serialize};

/// Tolerance used when deciding whether a point lies on a polygon edge.
const EDGE_EPSILON: f64 = 1e-12;

/// A longitude/latitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lng: f64,
    pub lat: f64,
}

impl GeoPoint {
    /// Create a point. Argument order follows GeoJSON: x (longitude) first.
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Whether both coordinates are finite and within WGS 84 bounds.
    pub fn is_valid(&self) -> bool {
        self.lng.is_finite()
            && self.lat.is_finite()
            && (-180.0..=180.0).contains(&self.lng)
            && (-90.0..=90.0).contains(&self.lat)
    }

    /// GeoJSON geometry object for this point.
    pub fn to_geojson(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "Point",
            "coordinates": [self.lng, self.lat],
        })
    }
}

/// A polygon with an exterior ring and optional holes.
///
/// Rings may be given open or closed (first point repeated at the end).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub exterior: Vec<GeoPoint>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub holes: Vec<Vec<GeoPoint>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RingPosition {
    Inside,
    Boundary,
    Outside,
}

impl Polygon {
    pub fn new(exterior: Vec<GeoPoint>) -> Self {
        Self {
            exterior,
            holes: Vec::new(),
        }
    }

    /// Axis-aligned rectangle, handy for zones drawn as bounding boxes.
    pub fn from_bbox(min_lng: f64, min_lat: f64, max_lng: f64, max_lat: f64) -> Self {
        Self::new(vec![
            GeoPoint::new(min_lng, min_lat),
            GeoPoint::new(max_lng, min_lat),
            GeoPoint::new(max_lng, max_lat),
            GeoPoint::new(min_lng, max_lat),
        ])
    }

    pub fn with_hole(mut self, hole: Vec<GeoPoint>) -> Self {
        self.holes.push(hole);
        self
    }

    /// Whether `point` lies inside the polygon or on its boundary.
    pub fn contains(&self, point: &GeoPoint) -> bool {
        match ring_position(&self.exterior, point) {
            RingPosition::Outside => false,
            RingPosition::Boundary => true,
            RingPosition::Inside => self
                .holes
                .iter()
                .all(|hole| ring_position(hole, point) != RingPosition::Inside),
        }
    }
}

fn ring_position(ring: &[GeoPoint], p: &GeoPoint) -> RingPosition {
    let n = ring.len();
    if n < 3 {
        return RingPosition::Outside;
    }

    for i in 0..n {
        if on_segment(&ring[i], &ring[(i + 1) % n], p) {
            return RingPosition::Boundary;
        }
    }

    // Even-odd ray casting towards +lng.
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (a, b) = (&ring[i], &ring[j]);
        if (a.lat > p.lat) != (b.lat > p.lat) {
            let crossing = (b.lng - a.lng) * (p.lat - a.lat) / (b.lat - a.lat) + a.lng;
            if p.lng < crossing {
                inside = !inside;
            }
        }
        j = i;
    }

    if inside {
        RingPosition::Inside
    } else {
        RingPosition::Outside
    }
}

fn on_segment(a: &GeoPoint, b: &GeoPoint, p: &GeoPoint) -> bool {
    let cross = (b.lng - a.lng) * (p.lat - a.lat) - (b.lat - a.lat) * (p.lng - a.lng);
    if cross.abs() > EDGE_EPSILON {
        return false;
    }
    p.lng >= a.lng.min(b.lng) - EDGE_EPSILON
        && p.lng <= a.lng.max(b.lng) + EDGE_EPSILON
        && p.lat >= a.lat.min(b.lat) - EDGE_EPSILON
        && p.lat <= a.lat.max(b.lat) + EDGE_EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_contains() {
        let rome = Polygon::from_bbox(12.0, 41.5, 13.0, 42.5);
        assert!(rome.contains(&GeoPoint::new(12.50, 41.90)));
        assert!(!rome.contains(&GeoPoint::new(9.19, 45.46)));
    }

    #[test]
    fn test_boundary_counts_as_inside() {
        let square = Polygon::from_bbox(0.0, 0.0, 1.0, 1.0);
        assert!(square.contains(&GeoPoint::new(0.0, 0.5)));
        assert!(square.contains(&GeoPoint::new(1.0, 1.0)));
    }

    #[test]
    fn test_concave_polygon() {
        // U shape open towards the north
        let u = Polygon::new(vec![
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(3.0, 0.0),
            GeoPoint::new(3.0, 3.0),
            GeoPoint::new(2.0, 3.0),
            GeoPoint::new(2.0, 1.0),
            GeoPoint::new(1.0, 1.0),
            GeoPoint::new(1.0, 3.0),
            GeoPoint::new(0.0, 3.0),
            GeoPoint::new(0.0, 0.0),
        ]);
        assert!(u.contains(&GeoPoint::new(0.5, 2.0)));
        assert!(!u.contains(&GeoPoint::new(1.5, 2.0)));
        assert!(u.contains(&GeoPoint::new(1.5, 0.5)));
    }

    #[test]
    fn test_hole_excludes_interior() {
        let ring = Polygon::from_bbox(0.0, 0.0, 4.0, 4.0).with_hole(vec![
            GeoPoint::new(1.0, 1.0),
            GeoPoint::new(3.0, 1.0),
            GeoPoint::new(3.0, 3.0),
            GeoPoint::new(1.0, 3.0),
        ]);
        assert!(!ring.contains(&GeoPoint::new(2.0, 2.0)));
        assert!(ring.contains(&GeoPoint::new(0.5, 0.5)));
        assert!(ring.contains(&GeoPoint::new(1.0, 2.0)));
    }

    #[test]
    fn test_degenerate_ring_contains_nothing() {
        let line = Polygon::new(vec![GeoPoint::new(0.0, 0.0), GeoPoint::new(1.0, 1.0)]);
        assert!(!line.contains(&GeoPoint::new(0.5, 0.5)));
    }

    #[test]
    fn test_point_validity_and_geojson() {
        assert!(GeoPoint::new(12.5, 41.9).is_valid());
        assert!(!GeoPoint::new(200.0, 41.9).is_valid());
        assert!(!GeoPoint::new(12.5, f64::NAN).is_valid());

        let geojson = GeoPoint::new(12.5, 41.9).to_geojson();
        assert_eq!(geojson["type"], "Point");
        assert_eq!(geojson["coordinates"][0], 12.5);
        assert_eq!(geojson["coordinates"][1], 41.9);
    }
}
