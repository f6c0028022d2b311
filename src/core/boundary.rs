use crate::core::geo::destination_point;
use crate::core::throttle::RequestGovernor;
use crate::domain::model::{CancelFlag, Coordinate, SearchConfig};
use crate::domain::ports::TravelTimeOracle;
use crate::utils::error::{IsoError, Result};

/// No reachable probe at all still yields an optimistic boundary this far out.
const OPTIMISTIC_DEFAULT_M: f64 = 500.0;
/// Boundaries confirmed this close to the facility get the fine 0..1000 m
/// refinement pass.
const NEAR_FIELD_LIMIT_M: f64 = 1_000.0;
/// Bisection stops once the bracket is narrower than this.
const BISECT_EPSILON_M: f64 = 10.0;
/// A last-reachable distance under this is not a usable boundary.
const MIN_USABLE_DISTANCE_M: f64 = 100.0;

/// Outcome of one probe, as classified against the target time. An oracle
/// call that itself failed is an obstacle, not an unreachable point.
#[derive(Debug, Clone, Copy)]
enum Probe {
    Reachable { seconds: u32 },
    Unreachable { seconds: u32 },
    Obstacle,
}

impl Probe {
    fn is_reachable(self) -> bool {
        matches!(self, Probe::Reachable { .. })
    }
}

/// Finds the farthest point along one compass direction still reachable from
/// the facility within the target time: stepped probing out to the mode's
/// maximum, a one-step lookahead to confirm the first unreachable probe, then
/// bisection between the bracketing distances.
pub struct BoundarySearch<'a, O: TravelTimeOracle> {
    pub oracle: &'a O,
    pub governor: &'a RequestGovernor,
    pub cancel: &'a CancelFlag,
    pub facility: Coordinate,
    pub target_seconds: u32,
    pub mode: &'a str,
    pub config: SearchConfig,
}

impl<O: TravelTimeOracle> BoundarySearch<'_, O> {
    pub async fn run(&self, angle: f64) -> Result<Coordinate> {
        let step = self.config.step_meters;
        let max = self.config.max_distance_meters;

        let mut last_reachable: Option<(f64, Coordinate)> = None;
        let mut first_unreachable: Option<f64> = None;

        let mut distance = step;
        while distance <= max {
            if self.cancel.is_cancelled() {
                return Err(IsoError::Aborted);
            }
            let point = destination_point(self.facility, angle, distance);
            match self.probe(angle, point, distance).await? {
                Probe::Reachable { .. } => {
                    last_reachable = Some((distance, point));
                }
                Probe::Unreachable { .. } => {
                    let lookahead = distance + step;
                    if lookahead > max {
                        first_unreachable = Some(distance);
                        break;
                    }
                    let lookahead_point = destination_point(self.facility, angle, lookahead);
                    if self.probe(angle, lookahead_point, lookahead).await?.is_reachable() {
                        // Transient anomaly: discard the unreachable probe and
                        // keep stepping out.
                        tracing::debug!(angle, distance, "skipping isolated unreachable probe");
                    } else {
                        tracing::debug!(angle, distance, "confirmed unreachable boundary");
                        first_unreachable = Some(distance);
                        break;
                    }
                }
                Probe::Obstacle => {
                    // No usable answer at this distance; keep stepping.
                }
            }
            distance += step;
        }

        let Some(high) = first_unreachable else {
            // Everything probed within the maximum was reachable (or failed).
            return match last_reachable {
                Some((_, point)) => {
                    tracing::debug!(angle, "reachable through the whole search range");
                    Ok(point)
                }
                None => {
                    tracing::debug!(angle, "no reachable probe at all, assuming {OPTIMISTIC_DEFAULT_M} m");
                    Ok(destination_point(self.facility, angle, OPTIMISTIC_DEFAULT_M))
                }
            };
        };

        if last_reachable.is_none() && high <= NEAR_FIELD_LIMIT_M {
            // Nothing reachable and the boundary sits inside the first
            // kilometer: refine finely near the facility before giving up.
            tracing::debug!(angle, "near-field refinement between 0 and {NEAR_FIELD_LIMIT_M} m");
            return match self.bisect(angle, 0.0, NEAR_FIELD_LIMIT_M, 5).await? {
                Some(point) => Ok(point),
                None => Err(IsoError::ThresholdTooLow {
                    mode: self.config.display_name.to_string(),
                }),
            };
        }

        let low = last_reachable.map(|(d, _)| d).unwrap_or(0.0);
        match self.bisect(angle, low, high, 2).await? {
            Some(point) => Ok(point),
            None => match last_reachable {
                Some((d, point)) if d >= MIN_USABLE_DISTANCE_M => Ok(point),
                _ => Err(IsoError::ThresholdTooLow {
                    mode: self.config.display_name.to_string(),
                }),
            },
        }
    }

    /// Bisects `[low, high]` toward the reachable/unreachable crossing.
    /// Returns the reachable midpoint whose travel time came closest to the
    /// target, if any midpoint was reachable.
    async fn bisect(
        &self,
        angle: f64,
        mut low: f64,
        mut high: f64,
        max_iterations: usize,
    ) -> Result<Option<Coordinate>> {
        let mut best: Option<Coordinate> = None;
        let mut closest_diff = i64::MAX;

        for _ in 0..max_iterations {
            if self.cancel.is_cancelled() {
                return Err(IsoError::Aborted);
            }
            if high - low < BISECT_EPSILON_M {
                break;
            }
            let mid = (low + high) / 2.0;
            let point = destination_point(self.facility, angle, mid);
            match self.probe(angle, point, mid).await? {
                Probe::Reachable { seconds } => {
                    let diff = (i64::from(seconds) - i64::from(self.target_seconds)).abs();
                    if diff < closest_diff {
                        closest_diff = diff;
                        best = Some(point);
                    }
                    low = mid;
                }
                Probe::Unreachable { .. } | Probe::Obstacle => {
                    high = mid;
                }
            }
        }

        Ok(best)
    }

    /// One throttled, retried oracle query from the probe point back to the
    /// facility. Exhausted oracle errors downgrade to `Obstacle`; `Aborted`
    /// and unsupported-mode errors propagate.
    async fn probe(&self, angle: f64, point: Coordinate, distance: f64) -> Result<Probe> {
        let outcome = self
            .governor
            .execute(self.cancel, || {
                self.oracle.travel_time(point, self.facility, self.mode)
            })
            .await;
        match outcome {
            Ok(seconds) => {
                if seconds <= self.target_seconds {
                    tracing::debug!(angle, distance, seconds, "probe reachable");
                    Ok(Probe::Reachable { seconds })
                } else {
                    tracing::debug!(angle, distance, seconds, "probe over time budget");
                    Ok(Probe::Unreachable { seconds })
                }
            }
            Err(IsoError::Aborted) => Err(IsoError::Aborted),
            Err(err @ IsoError::TransportUnsupported(_)) => Err(err),
            Err(err) => {
                tracing::warn!(angle, distance, %err, "probe failed, treating as obstacle");
                Ok(Probe::Obstacle)
            }
        }
    }
}
