use crate::core::geo::destination_point;
use crate::domain::model::{BoundaryPoint, Coordinate};

/// Distances below this are treated as probe noise and clamped up.
pub const MIN_VALID_DISTANCE_M: f64 = 500.0;

/// Suppresses single-direction undershoot: clamps every distance to at least
/// 500 m, then raises every sample still below the cohort median (computed
/// after dropping the single smallest value) to the median, re-projecting the
/// point along its own angle. In place, angle order preserved.
pub fn correct_outliers(points: &mut [BoundaryPoint], facility: Coordinate) {
    if points.is_empty() {
        return;
    }

    for bp in points.iter_mut() {
        if bp.distance_meters < MIN_VALID_DISTANCE_M {
            tracing::debug!(
                angle = bp.angle_degrees,
                distance = bp.distance_meters,
                "clamping to minimum valid distance"
            );
            bp.distance_meters = MIN_VALID_DISTANCE_M;
            bp.point = destination_point(facility, bp.angle_degrees, MIN_VALID_DISTANCE_M);
        }
    }

    let mut distances: Vec<f64> = points.iter().map(|bp| bp.distance_meters).collect();
    distances.sort_by(f64::total_cmp);
    if distances.len() > 1 {
        distances.remove(0);
    }
    let median = median_of_sorted(&distances);
    tracing::debug!(median, "boundary distance median after dropping lowest");

    for bp in points.iter_mut() {
        if bp.distance_meters < median {
            tracing::debug!(
                angle = bp.angle_degrees,
                distance = bp.distance_meters,
                median,
                "raising under-median boundary to median"
            );
            bp.point = destination_point(facility, bp.angle_degrees, median);
            bp.distance_meters = median;
        }
    }
}

fn median_of_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}
