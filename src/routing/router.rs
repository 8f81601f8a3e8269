use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use arcstr::ArcStr;
use tokio::task::AbortHandle;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use super::config::RouterConfig;
use super::error::RouterError;
use super::handler::{Handler, PublisherHandle};
use super::listener::listen;
use crate::broker::{Broker, Connector, Publisher, Subscriber};
use crate::message::Message;
use crate::topic::TopicPatternPath;

/// Where a [`Router`] is in its one-way lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
	Unstarted,
	Running,
	ShuttingDown,
	Stopped,
}

/// How [`Router::shutdown`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
	/// Every listener finished before the deadline
	Graceful,
	/// The deadline passed; `pending` listeners were aborted
	Forced { pending: usize },
}

impl ShutdownOutcome {
	pub fn is_graceful(&self) -> bool {
		matches!(self, ShutdownOutcome::Graceful)
	}
}

struct Subscription {
	pattern: Arc<TopicPatternPath>,
	handler: Arc<dyn Handler>,
}

/// Dispatches messages from a [`Broker`] to handlers by topic pattern.
///
/// Register handlers with [`add_subscription`](Self::add_subscription),
/// then [`start`](Self::start) to spawn one listener task per pattern and
/// [`shutdown`](Self::shutdown) to stop them. Messages on one pattern are
/// handled in arrival order; different patterns are handled concurrently.
pub struct Router {
	broker: Arc<Broker>,
	config: RouterConfig,
	registry: HashMap<ArcStr, Subscription>,
	state: LifecycleState,
	shutdown: CancellationToken,
	tracker: TaskTracker,
	listeners: Vec<AbortHandle>,
}

impl Router {
	pub fn new(broker: Broker) -> Self {
		Self::with_config(broker, RouterConfig::default())
	}

	pub fn with_config(broker: Broker, config: RouterConfig) -> Self {
		Self {
			broker: Arc::new(broker),
			config,
			registry: HashMap::new(),
			state: LifecycleState::Unstarted,
			shutdown: CancellationToken::new(),
			tracker: TaskTracker::new(),
			listeners: Vec::new(),
		}
	}

	pub fn config(&self) -> &RouterConfig {
		&self.config
	}

	pub fn state(&self) -> LifecycleState {
		self.state
	}

	/// Number of listener tasks spawned by [`start`](Self::start).
	pub fn listener_count(&self) -> usize {
		self.listeners.len()
	}

	pub fn subscription_count(&self) -> usize {
		self.registry.len()
	}

	/// Raw strings of the registered patterns.
	pub fn patterns(&self) -> impl Iterator<Item = &str> {
		self.registry.keys().map(|raw| raw.as_str())
	}

	/// Registers `handler` for `pattern`.
	///
	/// Only allowed before [`start`](Self::start). Each raw pattern string
	/// may be registered once.
	pub fn add_subscription(
		&mut self,
		pattern: &str,
		handler: impl Handler,
	) -> Result<(), RouterError> {
		if self.state != LifecycleState::Unstarted {
			return Err(RouterError::cannot_add_subscription(pattern));
		}
		let pattern = TopicPatternPath::new_with_cache(
			pattern,
			self.config.cache_strategy,
		)?;
		let raw = pattern.raw_arcstr();
		if self.registry.contains_key(&raw) {
			return Err(RouterError::duplicate_subscription(raw.as_str()));
		}

		debug!(topic = %raw, "Subscription added");
		self.registry.insert(
			raw,
			Subscription {
				pattern: Arc::new(pattern),
				handler: Arc::new(handler),
			},
		);
		Ok(())
	}

	/// Connects the broker and spawns a listener for every subscription.
	///
	/// A failed connection is returned and leaves the router unstarted,
	/// with whatever did connect disconnected again. A pattern the broker
	/// refuses is logged and skipped.
	pub async fn start(&mut self) -> Result<(), RouterError> {
		if self.state != LifecycleState::Unstarted {
			return Err(RouterError::AlreadyStarted);
		}
		info!(subscriptions = self.registry.len(), "Starting router");

		if let Err(err) = self.broker.connect().await {
			error!(error = %err, "Failed to connect broker");
			// One role may already be connected
			if let Err(disconnect_err) = self.broker.disconnect().await {
				warn!(
					error = %disconnect_err,
					"Failed to disconnect broker after failed start"
				);
			}
			return Err(err.into());
		}
		info!("Broker connected");

		let publisher = PublisherHandle::new(self.broker.clone());
		for subscription in self.registry.values() {
			let stream =
				match self.broker.subscribe(subscription.pattern.clone()).await {
					| Ok(stream) => stream,
					| Err(err) => {
						error!(
							topic = %subscription.pattern,
							error = %err,
							"Failed to subscribe, skipping"
						);
						continue;
					}
				};
			let handle = self.tracker.spawn(listen(
				stream,
				subscription.handler.clone(),
				publisher.clone(),
				self.shutdown.clone(),
			));
			self.listeners.push(handle.abort_handle());
			info!(topic = %subscription.pattern, "Subscribed");
		}

		self.state = LifecycleState::Running;
		info!(listeners = self.listeners.len(), "Router started");
		Ok(())
	}

	/// Stops all listeners, waiting at most `timeout` for in-flight
	/// handlers. See [`shutdown_at`](Self::shutdown_at).
	pub async fn shutdown(
		&mut self,
		timeout: Duration,
	) -> Result<ShutdownOutcome, RouterError> {
		self.shutdown_at(Instant::now() + timeout).await
	}

	/// Signals every listener to stop, disconnects the broker and waits
	/// for the listeners until `deadline`.
	///
	/// Listeners still running at the deadline are aborted and reported
	/// as [`ShutdownOutcome::Forced`]. Either way the router ends up
	/// stopped; only calling this on a router that is not running fails.
	pub async fn shutdown_at(
		&mut self,
		deadline: Instant,
	) -> Result<ShutdownOutcome, RouterError> {
		if self.state != LifecycleState::Running {
			return Err(RouterError::NotRunning);
		}
		self.state = LifecycleState::ShuttingDown;
		info!("Shutting down router");

		self.shutdown.cancel();
		self.tracker.close();

		if let Err(err) = self.broker.disconnect().await {
			warn!(error = %err, "Failed to disconnect broker");
		}

		info!(pending = self.tracker.len(), "Waiting for in-flight messages");
		let outcome = match time::timeout_at(deadline, self.tracker.wait()).await
		{
			| Ok(()) => {
				info!("Router shut down gracefully");
				ShutdownOutcome::Graceful
			}
			| Err(_) => {
				let pending = self.tracker.len();
				let err = RouterError::ShutdownTimeoutExceeded { pending };
				warn!(error = %err, "Forcing router shutdown");
				for listener in &self.listeners {
					listener.abort();
				}
				ShutdownOutcome::Forced { pending }
			}
		};

		self.state = LifecycleState::Stopped;
		Ok(outcome)
	}

	/// Starts the router, waits for `signal` and shuts down with the
	/// configured timeout.
	pub async fn run_until<F>(
		&mut self,
		signal: F,
	) -> Result<ShutdownOutcome, RouterError>
	where
		F: Future<Output = ()>,
	{
		self.start().await?;
		signal.await;
		info!("Shutdown signal received");
		self.shutdown(self.config.shutdown_timeout).await
	}

	/// Parses `topic` and publishes `message` through the broker.
	pub async fn publish(
		&self,
		topic: &str,
		message: impl Into<Message>,
	) -> Result<(), RouterError> {
		let topic = TopicPatternPath::new_from_string(topic)?;
		self.broker.publish(&topic, message.into()).await?;
		Ok(())
	}
}

impl Drop for Router {
	fn drop(&mut self) {
		if self.state == LifecycleState::Running {
			warn!("Router dropped while running, cancelling listeners");
			self.shutdown.cancel();
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::broker::LocalBroker;
	use crate::message::RoutedMessage;
	use crate::routing::HandlerResult;

	async fn ignore(_: PublisherHandle, _: RoutedMessage) -> HandlerResult {
		Ok(())
	}

	#[tokio::test]
	async fn test_registry_rules() {
		let mut router = Router::new(Broker::local(LocalBroker::new()));
		router.add_subscription("foo/{id}", ignore).unwrap();
		router.add_subscription("foo/{other}", ignore).unwrap();
		assert!(matches!(
			router.add_subscription("foo/{id}", ignore),
			Err(RouterError::DuplicateSubscription { .. })
		));
		assert!(matches!(
			router.add_subscription("foo/{}", ignore),
			Err(RouterError::Pattern(_))
		));
		assert_eq!(router.subscription_count(), 2);

		router.start().await.unwrap();
		assert_eq!(router.state(), LifecycleState::Running);
		assert_eq!(router.listener_count(), 2);
		assert!(matches!(
			router.add_subscription("bar", ignore),
			Err(RouterError::CannotAddSubscription { .. })
		));
		assert!(matches!(
			router.start().await,
			Err(RouterError::AlreadyStarted)
		));

		let outcome = router.shutdown(Duration::from_secs(1)).await.unwrap();
		assert!(outcome.is_graceful());
		assert_eq!(router.state(), LifecycleState::Stopped);
		assert!(matches!(
			router.shutdown(Duration::from_secs(1)).await,
			Err(RouterError::NotRunning)
		));
	}

	#[tokio::test]
	async fn test_shutdown_before_start() {
		let mut router = Router::new(Broker::new());
		assert!(matches!(
			router.shutdown(Duration::ZERO).await,
			Err(RouterError::NotRunning)
		));
		assert_eq!(router.state(), LifecycleState::Unstarted);
	}

	#[tokio::test]
	async fn test_publish_without_publisher() {
		let router = Router::new(Broker::new());
		assert!(matches!(
			router.publish("a/b", "x").await,
			Err(RouterError::Broker(crate::BrokerError::NoPublisher))
		));
		assert!(matches!(
			router.publish("a/*/b", "x").await,
			Err(RouterError::Pattern(_))
		));
	}
}
