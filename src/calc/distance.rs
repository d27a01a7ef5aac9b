const EARTH_RADIUS_KM: f64 = 6371.0;

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coord {
    pub lat: f64,
    pub lng: f64,
}

impl Coord {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn distance_km(self, other: Coord) -> f64 {
        distance_km(self.lat, self.lng, other.lat, other.lng)
    }
}

/// Haversine great-circle distance in kilometers.
///
/// Inputs must already be in range; the event validator rejects anything
/// outside [-90, 90] / [-180, 180].
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Distance contributed by appending `next` to a trail whose latest point is `previous`.
/// The first point of a trail contributes nothing.
pub fn segment_km(previous: Option<Coord>, next: Coord) -> f64 {
    previous.map_or(0.0, |prev| prev.distance_km(next))
}
