pub mod boundary;
pub mod engine;
pub mod geo;
pub mod median;
pub mod throttle;

pub use crate::domain::model::{BoundaryPoint, CancelFlag, Coordinate, IsochroneResult};
pub use crate::domain::ports::{ConfigProvider, ProgressReporter, Storage, TravelTimeOracle};
pub use crate::utils::error::Result;
