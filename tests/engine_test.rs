use async_trait::async_trait;
use isoreach::core::geo::haversine_distance;
use isoreach::domain::ports::{ProgressReporter, Storage, TravelTimeOracle};
use isoreach::{
    feature_collection, CancelFlag, Coordinate, IsoError, IsochroneEngine, LocalStorage,
    RequestGovernor, Result,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;
use tempfile::TempDir;

const SHANGHAI: Coordinate = Coordinate {
    lon: 121.47,
    lat: 31.23,
};

/// Initial bearing from `from` to `to`, degrees clockwise from north.
fn bearing_degrees(from: Coordinate, to: Coordinate) -> f64 {
    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();
    let delta_lon = (to.lon - from.lon).to_radians();
    let y = delta_lon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * delta_lon.cos();
    (y.atan2(x).to_degrees() + 360.0) % 360.0
}

/// Travel time grows linearly with straight-line distance; directions whose
/// bearing falls in `dead_sector` are never reachable.
struct DistanceOracle {
    seconds_per_meter: f64,
    dead_sector: Option<(f64, f64)>,
}

impl DistanceOracle {
    fn new(seconds_per_meter: f64) -> Self {
        Self {
            seconds_per_meter,
            dead_sector: None,
        }
    }
}

#[async_trait]
impl TravelTimeOracle for DistanceOracle {
    async fn travel_time(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        _mode: &str,
    ) -> Result<u32> {
        if let Some((lo, hi)) = self.dead_sector {
            let bearing = bearing_degrees(destination, origin);
            if bearing >= lo && bearing <= hi {
                return Ok(u32::MAX);
            }
        }
        let distance = haversine_distance(origin, destination);
        Ok((distance * self.seconds_per_meter).round() as u32)
    }
}

/// Sets a cancellation flag after a fixed number of oracle calls.
#[derive(Clone)]
struct CancellingOracle {
    inner: Arc<CancellingInner>,
}

struct CancellingInner {
    cancel_after: usize,
    calls: AtomicUsize,
    flag: OnceLock<CancelFlag>,
}

impl CancellingOracle {
    fn new(cancel_after: usize) -> Self {
        Self {
            inner: Arc::new(CancellingInner {
                cancel_after,
                calls: AtomicUsize::new(0),
                flag: OnceLock::new(),
            }),
        }
    }

    fn arm(&self, flag: CancelFlag) {
        self.inner.flag.set(flag).ok();
    }

    fn calls(&self) -> usize {
        self.inner.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TravelTimeOracle for CancellingOracle {
    async fn travel_time(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        _mode: &str,
    ) -> Result<u32> {
        let n = self.inner.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if n >= self.inner.cancel_after {
            if let Some(flag) = self.inner.flag.get() {
                flag.cancel();
            }
        }
        let distance = haversine_distance(origin, destination);
        Ok((distance * 0.1).round() as u32)
    }
}

struct RecordingReporter {
    seen: Mutex<Vec<(usize, usize)>>,
}

impl ProgressReporter for RecordingReporter {
    fn report(&self, current: usize, total: usize, _status: &str) {
        self.seen.lock().unwrap().push((current, total));
    }
}

fn fast_governor() -> RequestGovernor {
    RequestGovernor::new(100_000, 1, Duration::from_millis(0))
}

#[tokio::test]
async fn driving_isochrone_has_36_points_within_mode_limits() {
    // 0.1 s/m and a 10 minute budget: every direction crosses at ~6 km.
    let engine = IsochroneEngine::new(DistanceOracle::new(0.1)).with_governor(fast_governor());

    let result = engine.compute_isochrone(SHANGHAI, 10, "DRIVING").await.unwrap();

    assert_eq!(result.points.len(), 36);
    assert!(result.has_polygon());
    for (i, bp) in result.points.iter().enumerate() {
        assert_eq!(bp.angle_degrees, i as f64 * 10.0);
        assert!(bp.distance_meters >= 500.0, "angle {}: {}", bp.angle_degrees, bp.distance_meters);
        assert!(bp.distance_meters <= 50_000.0);
        let measured = haversine_distance(SHANGHAI, bp.point);
        assert!((measured - bp.distance_meters).abs() < 1.0);
    }
}

#[tokio::test]
async fn infeasible_direction_is_omitted_without_aborting() {
    // Everything around due east is unreachable even inside 1000 m; walking
    // with a one-minute budget fails that direction with a low threshold and
    // the engine simply skips it.
    let oracle = DistanceOracle {
        seconds_per_meter: 0.01,
        dead_sector: Some((85.0, 95.0)),
    };
    let engine = IsochroneEngine::new(oracle).with_governor(fast_governor());

    let result = engine.compute_isochrone(SHANGHAI, 1, "WALKING").await.unwrap();

    assert_eq!(result.points.len(), 35);
    assert!(result.points.iter().all(|bp| bp.angle_degrees != 90.0));
}

#[tokio::test]
async fn unsupported_mode_substitutes_default_boundaries() {
    // The oracle rejects the mode before any probing succeeds; every
    // direction falls back to the heuristic default distance.
    struct RejectingOracle;

    #[async_trait]
    impl TravelTimeOracle for RejectingOracle {
        async fn travel_time(
            &self,
            _origin: Coordinate,
            _destination: Coordinate,
            mode: &str,
        ) -> Result<u32> {
            Err(IsoError::TransportUnsupported(mode.to_string()))
        }
    }

    let engine = IsochroneEngine::new(RejectingOracle).with_governor(fast_governor());
    let result = engine
        .compute_isochrone(SHANGHAI, 10, "HOVERBOARD")
        .await
        .unwrap();

    assert_eq!(result.points.len(), 36);
    for bp in &result.points {
        assert!((bp.distance_meters - 1_000.0).abs() < 1e-9);
    }
}

#[tokio::test]
async fn cancellation_mid_computation_returns_no_partial_result() {
    let oracle = CancellingOracle::new(10);
    let handle = oracle.clone();
    let engine = IsochroneEngine::new(oracle).with_governor(fast_governor());
    handle.arm(engine.cancel_flag());

    let err = engine
        .compute_isochrone(SHANGHAI, 10, "DRIVING")
        .await
        .unwrap_err();

    assert!(matches!(err, IsoError::Aborted));
    // The in-flight probe completed, but no further direction started a full
    // search: far fewer calls than a complete 36-direction computation.
    assert!(handle.calls() < 36);
}

#[tokio::test]
async fn pre_set_cancellation_aborts_before_any_probe() {
    let oracle = CancellingOracle::new(usize::MAX);
    let handle = oracle.clone();
    let engine = IsochroneEngine::new(oracle).with_governor(fast_governor());
    engine.cancel_flag().cancel();

    let err = engine
        .compute_isochrone(SHANGHAI, 10, "DRIVING")
        .await
        .unwrap_err();

    assert!(matches!(err, IsoError::Aborted));
    assert_eq!(handle.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn batch_preserves_input_order_and_reports_progress() {
    let reporter = Arc::new(RecordingReporter {
        seen: Mutex::new(Vec::new()),
    });
    let engine = IsochroneEngine::new(DistanceOracle::new(0.1))
        .with_governor(fast_governor())
        .with_reporter(Box::new(ReporterHandle(reporter.clone())));

    let facilities = [SHANGHAI, Coordinate::new(118.09, 24.48)];
    let results = engine
        .compute_isochrones(&facilities, 10, "DRIVING")
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].facility.lon, SHANGHAI.lon);
    assert_eq!(results[1].facility.lon, 118.09);
    assert_eq!(*reporter.seen.lock().unwrap(), vec![(1, 2), (2, 2)]);
}

struct ReporterHandle(Arc<RecordingReporter>);

impl ProgressReporter for ReporterHandle {
    fn report(&self, current: usize, total: usize, status: &str) {
        self.0.report(current, total, status);
    }
}

#[tokio::test]
async fn geojson_output_round_trips_through_storage() {
    let engine = IsochroneEngine::new(DistanceOracle::new(0.1)).with_governor(fast_governor());
    let result = engine.compute_isochrone(SHANGHAI, 10, "DRIVING").await.unwrap();

    let temp_dir = TempDir::new().unwrap();
    let storage = LocalStorage::new(temp_dir.path().to_str().unwrap().to_string());
    let geojson = feature_collection(std::slice::from_ref(&result));
    storage
        .write_file(
            "isochrones.geojson",
            serde_json::to_string_pretty(&geojson).unwrap().as_bytes(),
        )
        .await
        .unwrap();

    let written = std::fs::read_to_string(temp_dir.path().join("isochrones.geojson")).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&written).unwrap();
    assert_eq!(parsed["type"], "FeatureCollection");
    let ring = parsed["features"][0]["geometry"]["coordinates"][0]
        .as_array()
        .unwrap();
    assert_eq!(ring.len(), 37);
}
