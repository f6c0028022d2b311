use crate::domain::model::Coordinate;
use crate::utils::error::Result;
use async_trait::async_trait;

/// Black-box travel-time service. Implementations normalize and validate the
/// mode before any network I/O and surface service diagnostics verbatim.
#[async_trait]
pub trait TravelTimeOracle: Send + Sync {
    async fn travel_time(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        mode: &str,
    ) -> Result<u32>;
}

/// Best-effort batch progress notification; absence must not affect results.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, current: usize, total: usize, status: &str);
}

pub trait ConfigProvider: Send + Sync {
    fn api_base(&self) -> &str;
    fn api_key(&self) -> &str;
    fn city_code(&self) -> &str;
    fn max_requests_per_second(&self) -> usize;
    fn max_retries(&self) -> usize;
}

pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}
