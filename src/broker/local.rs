//! In-process broker.
//!
//! Delivers published messages straight into the streams of matching
//! subscriptions. Useful for tests and for wiring components inside one
//! process without a network broker.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tracing::{debug, trace};

use super::stream::{MessageSender, MessageStream};
use super::{BrokerError, Connector, Publisher, Subscriber};
use crate::message::{Message, RoutedMessage};
use crate::topic::{SubscriptionTable, TopicPath, TopicPatternPath};

#[derive(Default)]
struct LocalState {
	connected: bool,
	subscriptions: SubscriptionTable<MessageSender>,
}

/// In-memory broker implementing both [`Subscriber`] and [`Publisher`].
///
/// Clones share the same subscriptions.
#[derive(Clone, Default)]
pub struct LocalBroker {
	state: Arc<Mutex<LocalState>>,
}

impl LocalBroker {
	pub fn new() -> Self {
		Self::default()
	}

	fn lock(&self) -> MutexGuard<'_, LocalState> {
		self.state.lock().unwrap_or_else(PoisonError::into_inner)
	}

	pub fn is_connected(&self) -> bool {
		self.lock().connected
	}

	/// Number of live subscriptions.
	pub fn subscription_count(&self) -> usize {
		self.lock().subscriptions.len()
	}

	/// Delivers `message` to every subscription matching `topic`.
	///
	/// Returns the number of streams that received it.
	pub fn deliver(
		&self,
		topic: &str,
		message: Message,
	) -> Result<usize, BrokerError> {
		let mut state = self.lock();
		if !state.connected {
			return Err(BrokerError::NotConnected);
		}

		let topic_path = Arc::new(TopicPath::new(topic));
		let mut delivered = 0;
		let mut closed = Vec::new();
		for (id, pattern, sender) in state.subscriptions.find(&topic_path) {
			let topic_match = match pattern.try_match(topic_path.clone()) {
				| Ok(topic_match) => topic_match,
				| Err(err) => {
					trace!(
						pattern = %pattern,
						topic = %topic,
						error = %err,
						"Shape matched but pattern did not"
					);
					continue;
				}
			};
			let routed = RoutedMessage::new(message.clone(), topic_match);
			if sender.send(routed).is_err() {
				closed.push(id);
			} else {
				delivered += 1;
			}
		}

		for id in closed {
			if let Ok((_, pattern)) = state.subscriptions.remove(&id) {
				debug!(
					pattern = %pattern,
					"Dropped subscription with closed stream"
				);
			}
		}
		if delivered == 0 {
			debug!(topic = %topic, "No subscribers for topic");
		}
		Ok(delivered)
	}
}

#[async_trait]
impl Connector for LocalBroker {
	async fn connect(&self) -> Result<(), BrokerError> {
		self.lock().connected = true;
		Ok(())
	}

	/// Ends every open stream.
	async fn disconnect(&self) -> Result<(), BrokerError> {
		let mut state = self.lock();
		state.connected = false;
		state.subscriptions.clear();
		Ok(())
	}
}

#[async_trait]
impl Subscriber for LocalBroker {
	async fn subscribe(
		&self,
		pattern: Arc<TopicPatternPath>,
	) -> Result<MessageStream, BrokerError> {
		let mut state = self.lock();
		if !state.connected {
			return Err(BrokerError::NotConnected);
		}
		let (sender, stream) = MessageStream::channel(pattern.clone());
		let (_, id) = state.subscriptions.add(pattern, sender);
		debug!(
			subscription = %id,
			pattern = %stream.pattern(),
			"Local subscription added"
		);
		Ok(stream)
	}
}

#[async_trait]
impl Publisher for LocalBroker {
	async fn publish(
		&self,
		topic: &TopicPatternPath,
		message: Message,
	) -> Result<(), BrokerError> {
		let concrete = topic
			.as_concrete_topic()
			.ok_or_else(|| BrokerError::non_concrete_topic(topic.raw()))?;
		self.deliver(concrete, message).map(|_| ())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn pattern(raw: &str) -> Arc<TopicPatternPath> {
		Arc::new(TopicPatternPath::new_from_string(raw).unwrap())
	}

	#[tokio::test]
	async fn test_subscribe_requires_connection() {
		let broker = LocalBroker::new();
		assert!(matches!(
			broker.subscribe(pattern("a")).await,
			Err(BrokerError::NotConnected)
		));
		assert!(matches!(
			broker.publish(&pattern("a"), Message::from("x")).await,
			Err(BrokerError::NotConnected)
		));
	}

	#[tokio::test]
	async fn test_publish_extracts_params() {
		let broker = LocalBroker::new();
		broker.connect().await.unwrap();
		let mut by_id = broker.subscribe(pattern("foo/{id}")).await.unwrap();
		let mut all = broker.subscribe(pattern("foo/*")).await.unwrap();
		let mut other = broker.subscribe(pattern("bar/{id}")).await.unwrap();

		broker
			.publish(&pattern("foo/42"), Message::from("X"))
			.await
			.unwrap();

		let message = by_id.recv().await.unwrap();
		assert_eq!(message.get_topic_param("id"), "42");
		assert_eq!(&message.payload()[..], b"X");
		let message = all.recv().await.unwrap();
		assert_eq!(message.full_topic(), "foo/42");
		assert!(message.topic().is_empty());
		drop(broker);
		other.close();
		assert!(other.recv().await.is_none());
	}

	#[tokio::test]
	async fn test_publish_rejects_wildcards() {
		let broker = LocalBroker::new();
		broker.connect().await.unwrap();
		let err = broker
			.publish(&pattern("foo/{id}"), Message::default())
			.await
			.unwrap_err();
		assert!(matches!(err, BrokerError::NonConcreteTopic { .. }));
	}

	#[tokio::test]
	async fn test_dropped_stream_is_pruned() {
		let broker = LocalBroker::new();
		broker.connect().await.unwrap();
		let stream = broker.subscribe(pattern("a/{b}")).await.unwrap();
		assert_eq!(broker.subscription_count(), 1);
		drop(stream);
		assert_eq!(broker.deliver("a/1", Message::default()).unwrap(), 0);
		assert_eq!(broker.subscription_count(), 0);
	}

	#[tokio::test]
	async fn test_disconnect_ends_streams() {
		let broker = LocalBroker::new();
		broker.connect().await.unwrap();
		broker.connect().await.unwrap();
		let mut stream = broker.subscribe(pattern("*")).await.unwrap();
		broker.disconnect().await.unwrap();
		broker.disconnect().await.unwrap();
		assert!(stream.recv().await.is_none());
		assert!(!broker.is_connected());
	}
}
