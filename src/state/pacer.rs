use std::time::Duration;
use tokio::time::Instant;

/// Enforces the crawl delay between the fetches of one worker
///
/// The delay is the minimum time between the starts of two successive fetches
/// made by the same worker. The very first fetch of a run is exempt; any other
/// fetch by a worker that has not fetched yet waits the full delay.
#[derive(Debug, Clone)]
pub struct DispatchPacer {
    min_spacing: Duration,
    last_fetch_start: Option<Instant>,
}

impl DispatchPacer {
    pub fn new(crawl_delay_ms: u64) -> Self {
        Self {
            min_spacing: Duration::from_millis(crawl_delay_ms),
            last_fetch_start: None,
        }
    }

    /// Calculates the time until the next fetch can start
    ///
    /// # Arguments
    ///
    /// * `now` - The current time instant
    /// * `first_of_run` - Whether this is the first dispatch of the whole run
    ///
    /// # Returns
    ///
    /// `None` if the fetch can start now, or the duration to wait otherwise.
    pub fn time_until_next_fetch(&self, now: Instant, first_of_run: bool) -> Option<Duration> {
        if self.min_spacing.is_zero() || first_of_run {
            return None;
        }

        match self.last_fetch_start {
            Some(last) => {
                let elapsed = now.saturating_duration_since(last);
                (elapsed < self.min_spacing).then(|| self.min_spacing - elapsed)
            }
            None => Some(self.min_spacing),
        }
    }

    /// Records that a fetch started
    pub fn record_fetch(&mut self, now: Instant) {
        self.last_fetch_start = Some(now);
    }

    /// Sleeps as long as needed, then records the fetch start
    pub async fn wait_turn(&mut self, first_of_run: bool) {
        if let Some(wait) = self.time_until_next_fetch(Instant::now(), first_of_run) {
            tokio::time::sleep(wait).await;
        }
        self.record_fetch(Instant::now());
    }
}
