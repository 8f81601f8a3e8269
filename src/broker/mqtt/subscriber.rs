use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use rumqttc::{AsyncClient, QoS};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, error, trace};

use super::config::MqttConfig;
use super::connection::{Inbound, MqttConnection};
use super::topic::to_mqtt_filter;
use crate::broker::{
	BrokerError, Connector, MessageSender, MessageStream, Subscriber,
};
use crate::message::{Message, RoutedMessage};
use crate::topic::{SubscriptionTable, TopicPath, TopicPatternPath};

/// Streams fed by the event loop, keyed by pattern shape.
struct Inbox {
	qos: QoS,
	subscriptions: Mutex<SubscriptionTable<MessageSender>>,
}

impl Inbox {
	fn lock(&self) -> MutexGuard<'_, SubscriptionTable<MessageSender>> {
		self.subscriptions
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
	}

	fn filters(&self) -> BTreeSet<String> {
		self.lock()
			.patterns()
			.filter_map(|pattern| to_mqtt_filter(pattern).ok())
			.collect()
	}
}

impl Inbound for Inbox {
	fn on_publish(&self, client: &AsyncClient, topic: &str, payload: Bytes) {
		let message = Message::new(payload);
		let topic_path = Arc::new(TopicPath::new(topic));
		let mut subscriptions = self.lock();

		let mut closed = Vec::new();
		for (id, pattern, sender) in subscriptions.find(&topic_path) {
			let topic_match = match pattern.try_match(topic_path.clone()) {
				| Ok(topic_match) => topic_match,
				| Err(err) => {
					trace!(
						pattern = %pattern,
						topic = %topic,
						error = %err,
						"Filter matched but pattern did not"
					);
					continue;
				}
			};
			if sender
				.send(RoutedMessage::new(message.clone(), topic_match))
				.is_err()
			{
				closed.push(id);
			}
		}

		for id in closed {
			let Ok((shape_now_empty, pattern)) = subscriptions.remove(&id)
			else {
				continue;
			};
			debug!(
				pattern = %pattern,
				"Dropped subscription with closed stream"
			);
			if !shape_now_empty {
				continue;
			}
			if let Ok(filter) = to_mqtt_filter(&pattern) {
				// The event loop task cannot await its own request channel.
				if let Err(err) = client.try_unsubscribe(filter.as_str()) {
					error!(
						filter = %filter,
						error = %err,
						"Failed to unsubscribe"
					);
				}
			}
		}
	}

	fn on_session_lost(&self, client: &AsyncClient) {
		for filter in self.filters() {
			if let Err(err) = client.try_subscribe(filter.as_str(), self.qos) {
				error!(
					filter = %filter,
					error = %err,
					"Failed to resubscribe"
				);
			}
		}
	}
}

/// Subscriber capability over an MQTT connection.
///
/// Patterns sharing a wildcard shape (`a/{x}` and `a/{y}`) share one MQTT
/// subscription; each still gets its own stream and parameter names.
pub struct MqttSubscriber {
	config: MqttConfig,
	inbox: Arc<Inbox>,
	connection: AsyncMutex<Option<MqttConnection>>,
}

impl MqttSubscriber {
	pub fn new(config: MqttConfig) -> Self {
		let inbox = Arc::new(Inbox {
			qos: config.settings.qos,
			subscriptions: Mutex::new(SubscriptionTable::new()),
		});
		Self {
			config,
			inbox,
			connection: AsyncMutex::new(None),
		}
	}

	pub fn config(&self) -> &MqttConfig {
		&self.config
	}

	/// Number of live pattern subscriptions.
	pub fn subscription_count(&self) -> usize {
		self.inbox.lock().len()
	}
}

#[async_trait]
impl Connector for MqttSubscriber {
	async fn connect(&self) -> Result<(), BrokerError> {
		let mut connection = self.connection.lock().await;
		if connection.is_none() {
			let inbound: Arc<dyn Inbound> = self.inbox.clone();
			let established =
				MqttConnection::establish(&self.config, Some(inbound)).await?;
			*connection = Some(established);
		}
		Ok(())
	}

	async fn disconnect(&self) -> Result<(), BrokerError> {
		let Some(connection) = self.connection.lock().await.take() else {
			return Ok(());
		};
		let timeout = Duration::from_millis(
			self.config.settings.disconnection_timeout_millis,
		);
		let closed = connection.close(timeout).await;
		// Ends every stream handed out by `subscribe`.
		self.inbox.lock().clear();
		closed
	}
}

#[async_trait]
impl Subscriber for MqttSubscriber {
	async fn subscribe(
		&self,
		pattern: Arc<TopicPatternPath>,
	) -> Result<MessageStream, BrokerError> {
		let filter = to_mqtt_filter(&pattern)?;
		let client = {
			let connection = self.connection.lock().await;
			connection
				.as_ref()
				.map(|connection| connection.client().clone())
				.ok_or(BrokerError::NotConnected)?
		};

		let (sender, stream) = MessageStream::channel(pattern.clone());
		let (fresh_shape, id) = self.inbox.lock().add(pattern, sender);
		if fresh_shape {
			let subscribed =
				client.subscribe(filter.as_str(), self.inbox.qos).await;
			if let Err(err) = subscribed {
				let _ = self.inbox.lock().remove(&id);
				return Err(err.into());
			}
		}
		debug!(
			pattern = %stream.pattern(),
			filter = %filter,
			"MQTT subscription added"
		);
		Ok(stream)
	}
}
