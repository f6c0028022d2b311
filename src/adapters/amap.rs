use crate::domain::model::{Coordinate, TransportMode};
use crate::domain::ports::{ConfigProvider, TravelTimeOracle};
use crate::utils::error::{IsoError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

/// AMap web-service routing client. One travel-time query per call; retry and
/// throttling are composed around it by the request governor.
pub struct AmapClient {
    http: Client,
    base_url: String,
    api_key: String,
    city_code: String,
}

impl AmapClient {
    pub fn new(base_url: String, api_key: String, city_code: String) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            city_code,
        }
    }

    pub fn from_config<C: ConfigProvider>(config: &C) -> Self {
        Self::new(
            config.api_base().to_string(),
            config.api_key().to_string(),
            config.city_code().to_string(),
        )
    }

    fn request_url(&self, origin: Coordinate, destination: Coordinate, mode: TransportMode) -> String {
        let origin = format!("{:.6},{:.6}", origin.lon, origin.lat);
        let destination = format!("{:.6},{:.6}", destination.lon, destination.lat);
        match mode {
            TransportMode::Driving => format!(
                "{}/v3/direction/driving?origin={}&destination={}&key={}",
                self.base_url, origin, destination, self.api_key
            ),
            TransportMode::Walking => format!(
                "{}/v3/direction/walking?origin={}&destination={}&key={}",
                self.base_url, origin, destination, self.api_key
            ),
            TransportMode::Bicycling => format!(
                "{}/v4/direction/bicycling?origin={}&destination={}&key={}",
                self.base_url, origin, destination, self.api_key
            ),
            TransportMode::Transit => format!(
                "{}/v3/direction/transit/integrated?origin={}&destination={}&key={}&city={}",
                self.base_url, origin, destination, self.api_key, self.city_code
            ),
        }
    }
}

#[async_trait]
impl TravelTimeOracle for AmapClient {
    async fn travel_time(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        mode: &str,
    ) -> Result<u32> {
        // Unsupported modes are rejected before any network I/O.
        let mode = TransportMode::parse(mode)?;
        let url = self.request_url(origin, destination, mode);
        tracing::debug!(
            mode = mode.display_name(),
            url = %url.replace(&self.api_key, "***"),
            "requesting travel time"
        );

        let body: Value = self.http.get(&url).send().await?.json().await?;
        parse_travel_time(mode, &body)
    }
}

/// Extracts the duration from a mode-specific response schema. Any failure
/// status or missing/invalid route data carries the service's own diagnostic
/// text verbatim.
fn parse_travel_time(mode: TransportMode, body: &Value) -> Result<u32> {
    if body["status"].as_str() != Some("1") {
        let message = match (body["infocode"].as_str(), body["info"].as_str()) {
            (Some(code), Some(info)) => format!("request failed, code {code}: {info}"),
            (None, Some(info)) => format!("request failed: {info}"),
            _ => "service returned an unknown error".to_string(),
        };
        return Err(IsoError::Oracle(message));
    }

    let duration = match mode {
        TransportMode::Driving | TransportMode::Walking => {
            body["route"]["paths"][0]["duration"].clone()
        }
        TransportMode::Transit => body["route"]["transits"][0]["duration"].clone(),
        TransportMode::Bicycling => {
            // v4 responses carry paths under `data`; tolerate the flat shape too.
            let nested = &body["data"]["paths"][0]["duration"];
            if nested.is_null() {
                body["paths"][0]["duration"].clone()
            } else {
                nested.clone()
            }
        }
    };

    if duration.is_null() {
        let detail = body["info"]
            .as_str()
            .or_else(|| body["data"]["info"].as_str())
            .unwrap_or("success status but no route data in response");
        return Err(IsoError::Oracle(format!("no usable route: {detail}")));
    }

    duration_seconds(&duration).ok_or_else(|| {
        IsoError::Oracle(format!("route duration is not a number: {duration}"))
    })
}

/// Duration fields arrive as either JSON strings or numbers.
fn duration_seconds(value: &Value) -> Option<u32> {
    match value {
        Value::String(s) => s.trim().parse::<u32>().ok(),
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        _ => None,
    }
}
