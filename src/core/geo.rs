use crate::domain::model::Coordinate;

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two coordinates, in meters.
pub fn haversine_distance(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lon = (b.lon - a.lon).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}

/// Point reached by travelling `distance_meters` from `start` along the
/// initial bearing `bearing_degrees` (clockwise from north).
pub fn destination_point(start: Coordinate, bearing_degrees: f64, distance_meters: f64) -> Coordinate {
    let angular = distance_meters / EARTH_RADIUS_M;
    let lat1 = start.lat.to_radians();
    let lon1 = start.lon.to_radians();
    let bearing = bearing_degrees.to_radians();

    let lat2 = (lat1.sin() * angular.cos() + lat1.cos() * angular.sin() * bearing.cos()).asin();
    let lon2 = lon1
        + (bearing.sin() * angular.sin() * lat1.cos())
            .atan2(angular.cos() - lat1.sin() * lat2.sin());

    Coordinate::new(lon2.to_degrees(), lat2.to_degrees())
}
