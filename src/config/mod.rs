pub mod cli;

use crate::domain::model::{Coordinate, TransportMode};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{IsoError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_positive_number, validate_range, validate_url, Validate,
};
use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "isoreach")]
#[command(about = "Approximate isochrones by probing a routing service along compass directions")]
pub struct CliConfig {
    #[arg(long, default_value = "https://restapi.amap.com")]
    pub api_base: String,

    #[arg(long)]
    pub api_key: String,

    #[arg(long, default_value = "0592", help = "City code used for transit routing")]
    pub city_code: String,

    #[arg(
        long = "facility",
        value_parser = parse_coordinate,
        required = true,
        help = "Facility as lon,lat; repeat for a batch"
    )]
    pub facilities: Vec<Coordinate>,

    #[arg(long, default_value = "10")]
    pub time_minutes: u32,

    #[arg(long, default_value = "DRIVING", help = "DRIVING, WALKING, BICYCLING or TRANSIT/BUS")]
    pub mode: String,

    #[arg(long, default_value = "./output")]
    pub output_path: String,

    #[arg(long, default_value = "5")]
    pub max_requests_per_second: usize,

    #[arg(long, default_value = "3")]
    pub max_retries: usize,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

pub fn parse_coordinate(raw: &str) -> std::result::Result<Coordinate, String> {
    let mut parts = raw.splitn(2, ',');
    let lon = parts
        .next()
        .and_then(|p| p.trim().parse::<f64>().ok())
        .ok_or_else(|| format!("invalid longitude in '{raw}'"))?;
    let lat = parts
        .next()
        .and_then(|p| p.trim().parse::<f64>().ok())
        .ok_or_else(|| format!("invalid latitude in '{raw}'"))?;
    Ok(Coordinate::new(lon, lat))
}

impl ConfigProvider for CliConfig {
    fn api_base(&self) -> &str {
        &self.api_base
    }

    fn api_key(&self) -> &str {
        &self.api_key
    }

    fn city_code(&self) -> &str {
        &self.city_code
    }

    fn max_requests_per_second(&self) -> usize {
        self.max_requests_per_second
    }

    fn max_retries(&self) -> usize {
        self.max_retries
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_url("api_base", &self.api_base)?;
        validate_non_empty_string("api_key", &self.api_key)?;
        validate_non_empty_string("city_code", &self.city_code)?;
        validate_positive_number("time_minutes", self.time_minutes as usize, 1)?;
        validate_positive_number("max_requests_per_second", self.max_requests_per_second, 1)?;
        validate_positive_number("max_retries", self.max_retries, 1)?;

        TransportMode::parse(&self.mode).map_err(|_| IsoError::InvalidConfigValue {
            field: "mode".to_string(),
            value: self.mode.clone(),
            reason: "expected DRIVING, WALKING, BICYCLING, TRANSIT or BUS".to_string(),
        })?;

        for facility in &self.facilities {
            validate_range("facility longitude", facility.lon, -180.0, 180.0)?;
            validate_range("facility latitude", facility.lat, -90.0, 90.0)?;
        }
        Ok(())
    }
}
