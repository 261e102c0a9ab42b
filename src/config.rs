use std::time::Duration;

/// Configuration for [`SettingsFetcher`](crate::SettingsFetcher).
// Not implementing `Copy` as we may add non-copyable fields in the future.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Upper bound on a single settings request, including reading the body.
    ///
    /// Defaults to [`FetcherConfig::DEFAULT_TIMEOUT`].
    pub timeout: Duration,
}

impl FetcherConfig {
    /// Default value for [`FetcherConfig::timeout`].
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Create a new `FetcherConfig` using default configuration.
    ///
    /// ```
    /// # use onesettings::FetcherConfig;
    /// let config = FetcherConfig::new();
    /// assert_eq!(config.timeout, FetcherConfig::DEFAULT_TIMEOUT);
    /// ```
    pub fn new() -> FetcherConfig {
        FetcherConfig::default()
    }

    /// Update request timeout with `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> FetcherConfig {
        self.timeout = timeout;
        self
    }
}

impl Default for FetcherConfig {
    fn default() -> FetcherConfig {
        FetcherConfig {
            timeout: FetcherConfig::DEFAULT_TIMEOUT,
        }
    }
}
