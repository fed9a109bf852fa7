use crate::models::courier::GeoPoint;

/// Midpoint nudge in degrees; keeps the route from being a perfectly
/// straight line between origin and destination.
const MID_OFFSET_DEG: f64 = 0.01;

/// Fixed three-point polyline from origin to destination with the
/// midpoint pushed off-axis by the sign of each coordinate delta.
///
/// Equal endpoints yield a degenerate all-equal polyline; the simulator
/// treats its zero-length segments as already traversed.
pub fn build_route(origin: &GeoPoint, destination: &GeoPoint) -> Vec<GeoPoint> {
    let mid = GeoPoint {
        lat: (origin.lat + destination.lat) / 2.0
            + MID_OFFSET_DEG * sign_of(destination.lat - origin.lat),
        lng: (origin.lng + destination.lng) / 2.0
            + MID_OFFSET_DEG * sign_of(destination.lng - origin.lng),
    };

    vec![origin.clone(), mid, destination.clone()]
}

// f64::signum maps 0.0 to 1.0; a zero delta must not nudge the midpoint.
fn sign_of(delta: f64) -> f64 {
    if delta == 0.0 { 0.0 } else { delta.signum() }
}

#[cfg(test)]
mod tests {
    use super::build_route;
    use crate::geo::distance_meters;
    use crate::models::courier::GeoPoint;

    #[test]
    fn route_starts_and_ends_at_the_given_points() {
        let origin = GeoPoint {
            lat: -33.9249,
            lng: 18.4241,
        };
        let destination = GeoPoint {
            lat: -33.96,
            lng: 18.47,
        };

        let route = build_route(&origin, &destination);

        assert_eq!(route.len(), 3);
        assert!(distance_meters(&route[0], &origin) < 1e-6);
        assert!(distance_meters(&route[2], &destination) < 1e-6);
    }

    #[test]
    fn midpoint_is_off_the_straight_line() {
        let origin = GeoPoint {
            lat: -33.9249,
            lng: 18.4241,
        };
        let destination = GeoPoint {
            lat: -33.96,
            lng: 18.47,
        };

        let route = build_route(&origin, &destination);
        let straight_mid = GeoPoint {
            lat: (origin.lat + destination.lat) / 2.0,
            lng: (origin.lng + destination.lng) / 2.0,
        };

        assert!(distance_meters(&route[1], &straight_mid) > 100.0);
    }

    #[test]
    fn degenerate_route_has_all_points_equal() {
        let p = GeoPoint {
            lat: -33.9249,
            lng: 18.4241,
        };
        let route = build_route(&p, &p);

        for point in &route {
            assert!(distance_meters(point, &p) < 1e-6);
        }
    }
}
