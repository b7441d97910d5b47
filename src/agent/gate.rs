use std::f64::consts::PI;

use super::fix::PositionFix;

/// Earth's radius in meters (spherical approximation).
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Degrees to radians conversion factor.
const DEG_TO_RAD: f64 = PI / 180.0;

/// Decides whether a new fix has moved far enough from the last reported one
/// to be worth sending.
///
/// Suppressing sub-threshold movement bounds network volume and radio usage
/// while the device is stationary. The first fix of a session is always
/// accepted so downstream observers get an initial position.
#[derive(Debug, Clone, Copy)]
pub struct DistanceGate {
    threshold_m: f64,
}

impl DistanceGate {
    pub fn new(threshold_m: f64) -> Self {
        Self { threshold_m }
    }

    /// Pure function of its two inputs: no hidden state, same answer for the
    /// same pair every time.
    pub fn should_accept(&self, candidate: &PositionFix, last_sent: Option<&PositionFix>) -> bool {
        match last_sent {
            None => true,
            Some(last) => surface_distance_m(last, candidate) >= self.threshold_m,
        }
    }
}

/// Great-circle distance between two fixes in meters, by the haversine
/// formula on a spherical earth.
pub fn surface_distance_m(a: &PositionFix, b: &PositionFix) -> f64 {
    let lat1 = a.latitude * DEG_TO_RAD;
    let lat2 = b.latitude * DEG_TO_RAD;
    let dlat = (b.latitude - a.latitude) * DEG_TO_RAD;
    let dlon = (b.longitude - a.longitude) * DEG_TO_RAD;

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}
