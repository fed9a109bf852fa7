pub mod route;

use crate::models::courier::GeoPoint;

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance in meters between two points (haversine).
pub fn distance_meters(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let sin_lat = (delta_lat / 2.0).sin();
    let sin_lng = (delta_lng / 2.0).sin();

    let haversine = sin_lat * sin_lat + lat1.cos() * lat2.cos() * sin_lng * sin_lng;
    let central_angle = 2.0 * haversine.sqrt().atan2((1.0 - haversine).sqrt());

    EARTH_RADIUS_M * central_angle
}

/// Initial bearing from `a` to `b` in degrees, normalized to [0, 360).
/// Undefined when `a == b`; callers guard that case.
pub fn bearing_degrees(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let y = delta_lng.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * delta_lng.cos();

    (y.atan2(x).to_degrees() + 360.0) % 360.0
}

/// Point reached after traveling `meters` along the great circle from
/// `start` at `bearing_deg`. Longitude is normalized to (-180, 180].
pub fn destination_point(start: &GeoPoint, bearing_deg: f64, meters: f64) -> GeoPoint {
    let angular = meters.max(0.0) / EARTH_RADIUS_M;
    let bearing = bearing_deg.to_radians();
    let lat1 = start.lat.to_radians();
    let lng1 = start.lng.to_radians();

    let (sin_lat1, cos_lat1) = lat1.sin_cos();
    let (sin_ang, cos_ang) = angular.sin_cos();

    let sin_lat2 = sin_lat1 * cos_ang + cos_lat1 * sin_ang * bearing.cos();
    let lat2 = sin_lat2.asin();

    let y = bearing.sin() * sin_ang * cos_lat1;
    let x = cos_ang - sin_lat1 * sin_lat2;
    let lng2 = lng1 + y.atan2(x);

    GeoPoint {
        lat: lat2.to_degrees(),
        lng: (lng2.to_degrees() + 540.0) % 360.0 - 180.0,
    }
}
