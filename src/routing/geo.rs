use std::fmt;

use serde::{Deserialize, Serialize};

const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// A WGS84 point. Serialised as `{ "lat": .., "lng": .. }`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    /// Parses the provider's `"lng,lat"` ordering.
    pub fn parse_lng_lat(raw: &str) -> Option<Self> {
        let (lng, lat) = raw.split_once(',')?;
        let c = Self::new(lat.trim().parse().ok()?, lng.trim().parse().ok()?);
        c.is_valid().then_some(c)
    }

    pub fn to_lng_lat(&self) -> String {
        format!("{},{}", self.lng, self.lat)
    }

    /// `[lng, lat]`, the GeoJSON position order.
    pub fn as_position(&self) -> [f64; 2] {
        [self.lng, self.lat]
    }

    pub fn from_position(p: [f64; 2]) -> Self {
        Self::new(p[1], p[0])
    }

    /// Great-circle distance in meters.
    pub fn haversine_meters(&self, other: &Coordinate) -> f64 {
        let (lat1, lat2) = (self.lat.to_radians(), other.lat.to_radians());
        let dlat = lat2 - lat1;
        let dlng = (other.lng - self.lng).to_radians();
        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_METERS * a.sqrt().asin()
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6},{:.6}", self.lat, self.lng)
    }
}

/// `other` as planar metres east/north of `origin`. Accurate for the
/// segment lengths of a drawn route, not across hemispheres.
fn local_offset_meters(origin: &Coordinate, other: &Coordinate) -> (f64, f64) {
    let x = (other.lng - origin.lng).to_radians()
        * EARTH_RADIUS_METERS
        * origin.lat.to_radians().cos();
    let y = (other.lat - origin.lat).to_radians() * EARTH_RADIUS_METERS;
    (x, y)
}

/// Distance from `point` to the segment `a`-`b`.
pub fn distance_to_segment_meters(point: &Coordinate, a: &Coordinate, b: &Coordinate) -> f64 {
    let (ax, ay) = local_offset_meters(point, a);
    let (bx, by) = local_offset_meters(point, b);
    let (dx, dy) = (bx - ax, by - ay);
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return point.haversine_meters(a);
    }
    let t = (-(ax * dx + ay * dy) / len_sq).clamp(0.0, 1.0);
    (ax + t * dx).hypot(ay + t * dy)
}

/// Distance from `point` to the polyline `path`, measured to the nearest
/// segment so sparse geometry on straight roads still counts as on route.
/// `None` for an empty path.
pub fn distance_to_path_meters(point: &Coordinate, path: &[Coordinate]) -> Option<f64> {
    match path {
        [] => None,
        [only] => Some(point.haversine_meters(only)),
        _ => path
            .windows(2)
            .map(|w| distance_to_segment_meters(point, &w[0], &w[1]))
            .min_by(|a, b| a.total_cmp(b)),
    }
}
