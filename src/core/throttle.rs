use crate::domain::model::CancelFlag;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{IsoError, Result};
use std::collections::VecDeque;
use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

const RATE_WINDOW: Duration = Duration::from_millis(1000);

pub const DEFAULT_MAX_REQUESTS_PER_SECOND: usize = 5;
pub const DEFAULT_MAX_RETRIES: usize = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1000);

/// Throttles and retries arbitrary async operations. Every oracle call is
/// wrapped by retry, and each attempt individually passes the rate window.
pub struct RequestGovernor {
    max_requests_per_second: usize,
    max_retries: usize,
    retry_delay: Duration,
    window: Mutex<VecDeque<Instant>>,
}

impl Default for RequestGovernor {
    fn default() -> Self {
        Self::new(
            DEFAULT_MAX_REQUESTS_PER_SECOND,
            DEFAULT_MAX_RETRIES,
            DEFAULT_RETRY_DELAY,
        )
    }
}

impl RequestGovernor {
    pub fn new(max_requests_per_second: usize, max_retries: usize, retry_delay: Duration) -> Self {
        Self {
            max_requests_per_second,
            max_retries,
            retry_delay,
            window: Mutex::new(VecDeque::new()),
        }
    }

    pub fn from_config<C: ConfigProvider>(config: &C) -> Self {
        Self::new(
            config.max_requests_per_second(),
            config.max_retries(),
            DEFAULT_RETRY_DELAY,
        )
    }

    /// Runs `operation` under the rate limit, retrying failures with a fixed
    /// delay. The last underlying error is re-raised unchanged after the
    /// retry budget is spent. `Aborted` and `TransportUnsupported` are never
    /// retried.
    pub async fn execute<T, F, Fut>(&self, cancel: &CancelFlag, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut last_err = None;
        for attempt in 1..=self.max_retries {
            if cancel.is_cancelled() {
                return Err(IsoError::Aborted);
            }
            self.acquire_slot().await;
            match operation().await {
                Ok(value) => return Ok(value),
                Err(IsoError::Aborted) => return Err(IsoError::Aborted),
                Err(err @ IsoError::TransportUnsupported(_)) => return Err(err),
                Err(err) => {
                    tracing::warn!(attempt, max_retries = self.max_retries, %err, "attempt failed");
                    last_err = Some(err);
                    if attempt < self.max_retries {
                        sleep(self.retry_delay).await;
                    }
                }
            }
        }
        Err(last_err.unwrap_or_else(|| IsoError::Oracle("retry budget is zero".to_string())))
    }

    /// Sliding 1-second window: prune stale timestamps, wait for the oldest
    /// to age out when the window is full, then record the dispatch.
    async fn acquire_slot(&self) {
        let mut window = self.window.lock().await;
        let now = Instant::now();
        while window
            .front()
            .is_some_and(|t| now.duration_since(*t) >= RATE_WINDOW)
        {
            window.pop_front();
        }
        if window.len() >= self.max_requests_per_second {
            if let Some(oldest) = window.front().copied() {
                let wait = RATE_WINDOW.saturating_sub(now.duration_since(oldest));
                if !wait.is_zero() {
                    // Lock is held across the wait; callers are admitted in order.
                    sleep(wait).await;
                }
            }
            let now = Instant::now();
            while window
                .front()
                .is_some_and(|t| now.duration_since(*t) >= RATE_WINDOW)
            {
                window.pop_front();
            }
        }
        window.push_back(Instant::now());
    }
}
