//! Delivery serviceability: can this branch deliver to that address?

use crate::models::Coordinates;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two points, in kilometres.
pub fn haversine_km(from: Coordinates, to: Coordinates) -> f64 {
    let d_lat = (to.latitude - from.latitude).to_radians();
    let d_lng = (to.longitude - from.longitude).to_radians();
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}

/// Whether the branch can deliver to the user's location.
///
/// Missing coordinates or radius mean "unknown"; the user is not blocked on
/// absent geo data. Only an explicitly computed violation fails closed.
pub fn is_serviceable(
    user: Option<Coordinates>,
    branch: Option<Coordinates>,
    max_distance_km: Option<f64>,
) -> bool {
    match (user, branch, max_distance_km) {
        (Some(user), Some(branch), Some(radius)) => haversine_km(user, branch) <= radius,
        _ => true,
    }
}
