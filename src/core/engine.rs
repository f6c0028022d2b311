use crate::core::boundary::BoundarySearch;
use crate::core::geo::{destination_point, haversine_distance};
use crate::core::median::correct_outliers;
use crate::core::throttle::RequestGovernor;
use crate::domain::model::{BoundaryPoint, CancelFlag, Coordinate, IsochroneResult, SearchConfig};
use crate::domain::ports::{ProgressReporter, TravelTimeOracle};
use crate::utils::error::{IsoError, Result};
use std::time::Duration;

const DEFAULT_DIRECTIONS: usize = 36;
const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(500);
/// Minimum accepted points for a polygon; below this the result is degenerate.
const MIN_POLYGON_POINTS: usize = 3;

/// Drives the per-direction boundary search over all sampled compass
/// directions for one or many facilities, strictly sequentially.
pub struct IsochroneEngine<O: TravelTimeOracle> {
    oracle: O,
    governor: RequestGovernor,
    cancel: CancelFlag,
    directions: usize,
    settle_delay: Duration,
    reporter: Option<Box<dyn ProgressReporter>>,
}

impl<O: TravelTimeOracle> IsochroneEngine<O> {
    pub fn new(oracle: O) -> Self {
        Self {
            oracle,
            governor: RequestGovernor::default(),
            cancel: CancelFlag::new(),
            directions: DEFAULT_DIRECTIONS,
            settle_delay: DEFAULT_SETTLE_DELAY,
            reporter: None,
        }
    }

    pub fn with_governor(mut self, governor: RequestGovernor) -> Self {
        self.governor = governor;
        self
    }

    pub fn with_reporter(mut self, reporter: Box<dyn ProgressReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Handle for external cancellation; observed at loop-iteration
    /// boundaries, so probes already dispatched complete first.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Computes one isochrone. Directions whose time budget is infeasible are
    /// omitted; other per-direction failures substitute a default-distance
    /// point to keep angular coverage. Cancellation fails the whole
    /// computation with no partial result.
    pub async fn compute_isochrone(
        &self,
        facility: Coordinate,
        time_minutes: u32,
        mode: &str,
    ) -> Result<IsochroneResult> {
        let target_seconds = time_minutes * 60;
        let config = SearchConfig::for_raw(mode);
        let angle_step = 360.0 / self.directions as f64;
        let search = BoundarySearch {
            oracle: &self.oracle,
            governor: &self.governor,
            cancel: &self.cancel,
            facility,
            target_seconds,
            mode,
            config,
        };

        tracing::info!(%facility, time_minutes, mode, "computing isochrone");
        let mut accepted: Vec<BoundaryPoint> = Vec::with_capacity(self.directions);
        for i in 0..self.directions {
            if self.cancel.is_cancelled() {
                return Err(IsoError::Aborted);
            }
            let angle = i as f64 * angle_step;
            match search.run(angle).await {
                Ok(point) => {
                    let distance = haversine_distance(facility, point);
                    tracing::debug!(angle, distance, "boundary accepted");
                    accepted.push(BoundaryPoint {
                        angle_degrees: angle,
                        point,
                        distance_meters: distance,
                    });
                }
                Err(IsoError::Aborted) => return Err(IsoError::Aborted),
                Err(IsoError::ThresholdTooLow { mode }) => {
                    tracing::warn!(angle, mode = %mode, "time budget too low, omitting direction");
                }
                Err(err) => {
                    // Heuristic fallback distance; saturates at 1000 m.
                    let fallback = 1_000.0_f64.min(f64::from(target_seconds) * 60.0 * 1.5);
                    tracing::warn!(angle, %err, fallback, "boundary search failed, substituting default");
                    accepted.push(BoundaryPoint {
                        angle_degrees: angle,
                        point: destination_point(facility, angle, fallback),
                        distance_meters: fallback,
                    });
                }
            }
        }

        if accepted.len() >= MIN_POLYGON_POINTS {
            correct_outliers(&mut accepted, facility);
        } else {
            tracing::warn!(
                accepted = accepted.len(),
                "too few boundary points for a polygon"
            );
        }

        Ok(IsochroneResult {
            facility,
            points: accepted,
        })
    }

    /// Computes isochrones for many facilities in input order. Per-facility
    /// failures are logged and skipped; cancellation terminates the batch.
    pub async fn compute_isochrones(
        &self,
        facilities: &[Coordinate],
        time_minutes: u32,
        mode: &str,
    ) -> Result<Vec<IsochroneResult>> {
        let total = facilities.len();
        tracing::info!(total, time_minutes, mode, "starting isochrone batch");
        let mut results = Vec::with_capacity(total);

        for (index, facility) in facilities.iter().enumerate() {
            match self.compute_isochrone(*facility, time_minutes, mode).await {
                Ok(result) => {
                    if let Some(reporter) = &self.reporter {
                        reporter.report(
                            index + 1,
                            total,
                            &format!("computed isochrone {}/{}", index + 1, total),
                        );
                    }
                    results.push(result);
                }
                Err(IsoError::Aborted) => return Err(IsoError::Aborted),
                Err(err) => {
                    tracing::error!(index, facility = %facility, %err, "facility failed, continuing batch");
                }
            }
            // Settle between facilities so bursts stay under the rate window.
            if index + 1 < total {
                tokio::time::sleep(self.settle_delay).await;
            }
        }

        tracing::info!(computed = results.len(), total, "isochrone batch finished");
        Ok(results)
    }
}
