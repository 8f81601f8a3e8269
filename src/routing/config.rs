use std::time::Duration;

use crate::topic::CacheStrategy;

const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Router settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterConfig {
	/// Match cache attached to every subscribed pattern
	pub cache_strategy: CacheStrategy,
	/// Deadline used by [`Router::run_until`](super::Router::run_until)
	pub shutdown_timeout: Duration,
}

impl Default for RouterConfig {
	fn default() -> Self {
		Self {
			cache_strategy: CacheStrategy::default(),
			shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
		}
	}
}

impl RouterConfig {
	pub fn with_cache_strategy(
		mut self,
		cache_strategy: CacheStrategy,
	) -> Self {
		self.cache_strategy = cache_strategy;
		self
	}

	pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
		self.shutdown_timeout = timeout;
		self
	}
}
