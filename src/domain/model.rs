use crate::utils::error::{IsoError, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A (longitude, latitude) pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lon: f64,
    pub lat: f64,
}

impl Coordinate {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:.6}, {:.6}]", self.lon, self.lat)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    Driving,
    Walking,
    Bicycling,
    Transit,
}

impl TransportMode {
    /// Normalizes free-text mode input. `BUS` is an alias for transit.
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_uppercase().as_str() {
            "DRIVING" => Ok(Self::Driving),
            "WALKING" => Ok(Self::Walking),
            "BICYCLING" => Ok(Self::Bicycling),
            "BUS" | "TRANSIT" => Ok(Self::Transit),
            other => Err(IsoError::TransportUnsupported(other.to_string())),
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Driving => "driving",
            Self::Walking => "walking",
            Self::Bicycling => "bicycling",
            Self::Transit => "transit",
        }
    }

    pub fn search_config(self) -> SearchConfig {
        match self {
            Self::Driving => SearchConfig {
                max_distance_meters: 50_000.0,
                step_meters: 1_000.0,
                display_name: "driving",
            },
            Self::Walking => SearchConfig {
                max_distance_meters: 10_000.0,
                step_meters: 500.0,
                display_name: "walking",
            },
            Self::Bicycling => SearchConfig {
                max_distance_meters: 20_000.0,
                step_meters: 800.0,
                display_name: "bicycling",
            },
            Self::Transit => SearchConfig {
                max_distance_meters: 30_000.0,
                step_meters: 1_000.0,
                display_name: "transit",
            },
        }
    }
}

/// Per-mode probing parameters.
#[derive(Debug, Clone, Copy)]
pub struct SearchConfig {
    pub max_distance_meters: f64,
    pub step_meters: f64,
    pub display_name: &'static str,
}

impl SearchConfig {
    /// Unknown mode text falls back to the driving profile.
    pub fn for_raw(raw: &str) -> Self {
        TransportMode::parse(raw)
            .unwrap_or(TransportMode::Driving)
            .search_config()
    }
}

/// Accepted boundary for one compass direction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BoundaryPoint {
    pub angle_degrees: f64,
    pub point: Coordinate,
    pub distance_meters: f64,
}

/// Boundary points for one facility, in increasing angle order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsochroneResult {
    pub facility: Coordinate,
    pub points: Vec<BoundaryPoint>,
}

impl IsochroneResult {
    /// Fewer than three vertices cannot form a polygon.
    pub fn has_polygon(&self) -> bool {
        self.points.len() >= 3
    }

    pub fn vertices(&self) -> Vec<Coordinate> {
        self.points.iter().map(|bp| bp.point).collect()
    }

    pub fn to_geojson_feature(&self) -> serde_json::Value {
        let mut ring: Vec<serde_json::Value> = self
            .points
            .iter()
            .map(|bp| json!([bp.point.lon, bp.point.lat]))
            .collect();
        if let Some(first) = ring.first().cloned() {
            ring.push(first);
        }
        json!({
            "type": "Feature",
            "properties": {
                "facility": [self.facility.lon, self.facility.lat],
                "vertices": self.points.len(),
            },
            "geometry": {
                "type": "Polygon",
                "coordinates": [ring],
            },
        })
    }
}

pub fn feature_collection(results: &[IsochroneResult]) -> serde_json::Value {
    let features: Vec<serde_json::Value> = results
        .iter()
        .filter(|r| r.has_polygon())
        .map(IsochroneResult::to_geojson_feature)
        .collect();
    json!({
        "type": "FeatureCollection",
        "features": features,
    })
}

/// Cooperative cancellation token, polled at loop-iteration boundaries.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
