pub mod adapters;
#[cfg(feature = "cli")]
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{cli::LocalStorage, CliConfig};

pub use adapters::amap::AmapClient;
pub use core::engine::IsochroneEngine;
pub use core::throttle::RequestGovernor;
pub use domain::model::{
    feature_collection, BoundaryPoint, CancelFlag, Coordinate, IsochroneResult, TransportMode,
};
pub use domain::ports::{ProgressReporter, TravelTimeOracle};
pub use utils::error::{IsoError, Result};
