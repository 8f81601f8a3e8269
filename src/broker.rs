//! Transport capabilities consumed by the router.
//!
//! A transport plugs in by implementing [`Subscriber`], [`Publisher`] or
//! both. [`Broker`] bundles at most one of each and is what the
//! [`Router`](crate::Router) drives.

mod error;
pub mod local;
#[cfg(feature = "mqtt")]
pub mod mqtt;
mod stream;

use std::sync::Arc;

use async_trait::async_trait;
pub use error::BrokerError;
#[cfg(feature = "mqtt")]
pub use error::ConnectionEstablishmentError;
pub use local::LocalBroker;
pub use stream::{MessageSender, MessageStream};
use tracing::warn;

use crate::message::Message;
use crate::topic::TopicPatternPath;

/// Connection lifecycle shared by both capabilities.
///
/// The router calls `connect` once from `start` and `disconnect` once from
/// `shutdown`; implementations should tolerate repeated calls anyway.
#[async_trait]
pub trait Connector: Send + Sync {
	async fn connect(&self) -> Result<(), BrokerError>;
	async fn disconnect(&self) -> Result<(), BrokerError>;
}

/// Receives messages for topic patterns.
#[async_trait]
pub trait Subscriber: Connector {
	/// Starts delivery for `pattern`.
	///
	/// Every message on the returned stream carries a [`TopicMatch`] whose
	/// parameters were extracted with `pattern`. The stream ends when the
	/// subscriber disconnects.
	///
	/// [`TopicMatch`]: crate::topic::TopicMatch
	async fn subscribe(
		&self,
		pattern: Arc<TopicPatternPath>,
	) -> Result<MessageStream, BrokerError>;
}

/// Sends messages to concrete topics.
#[async_trait]
pub trait Publisher: Connector {
	/// Publishes `message` to `topic`, which must contain no wildcards.
	///
	/// Returns once the transport accepted the message.
	async fn publish(
		&self,
		topic: &TopicPatternPath,
		message: Message,
	) -> Result<(), BrokerError>;
}

/// A subscriber and a publisher, either of which may be absent.
#[derive(Clone, Default)]
pub struct Broker {
	subscriber: Option<Arc<dyn Subscriber>>,
	publisher: Option<Arc<dyn Publisher>>,
}

impl Broker {
	pub fn new() -> Self {
		Self::default()
	}

	/// Uses one in-process broker for both roles.
	pub fn local(broker: LocalBroker) -> Self {
		let shared = Arc::new(broker);
		Self {
			subscriber: Some(shared.clone()),
			publisher: Some(shared),
		}
	}

	pub fn with_subscriber(
		mut self,
		subscriber: impl Subscriber + 'static,
	) -> Self {
		self.subscriber = Some(Arc::new(subscriber));
		self
	}

	pub fn with_publisher(
		mut self,
		publisher: impl Publisher + 'static,
	) -> Self {
		self.publisher = Some(Arc::new(publisher));
		self
	}

	pub fn from_parts(
		subscriber: Option<Arc<dyn Subscriber>>,
		publisher: Option<Arc<dyn Publisher>>,
	) -> Self {
		Self {
			subscriber,
			publisher,
		}
	}

	pub fn has_subscriber(&self) -> bool {
		self.subscriber.is_some()
	}

	pub fn has_publisher(&self) -> bool {
		self.publisher.is_some()
	}
}

#[async_trait]
impl Connector for Broker {
	async fn connect(&self) -> Result<(), BrokerError> {
		if let Some(subscriber) = &self.subscriber {
			subscriber.connect().await?;
		}
		if let Some(publisher) = &self.publisher {
			publisher.connect().await?;
		}
		Ok(())
	}

	/// Disconnects both roles and reports the first failure.
	async fn disconnect(&self) -> Result<(), BrokerError> {
		let mut first_error = None;
		if let Some(subscriber) = &self.subscriber {
			if let Err(err) = subscriber.disconnect().await {
				warn!(error = %err, "Failed to disconnect subscriber");
				first_error.get_or_insert(err);
			}
		}
		if let Some(publisher) = &self.publisher {
			if let Err(err) = publisher.disconnect().await {
				warn!(error = %err, "Failed to disconnect publisher");
				first_error.get_or_insert(err);
			}
		}
		first_error.map_or(Ok(()), Err)
	}
}

#[async_trait]
impl Subscriber for Broker {
	async fn subscribe(
		&self,
		pattern: Arc<TopicPatternPath>,
	) -> Result<MessageStream, BrokerError> {
		let subscriber =
			self.subscriber.as_ref().ok_or(BrokerError::NoSubscriber)?;
		subscriber.subscribe(pattern).await
	}
}

#[async_trait]
impl Publisher for Broker {
	async fn publish(
		&self,
		topic: &TopicPatternPath,
		message: Message,
	) -> Result<(), BrokerError> {
		let publisher =
			self.publisher.as_ref().ok_or(BrokerError::NoPublisher)?;
		publisher.publish(topic, message).await
	}
}
