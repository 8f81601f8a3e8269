use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex as AsyncMutex;
use tracing::trace;

use super::config::MqttConfig;
use super::connection::MqttConnection;
use super::topic::validate_publish_topic;
use crate::broker::{BrokerError, Connector, Publisher};
use crate::message::Message;
use crate::topic::TopicPatternPath;

/// Publisher capability over an MQTT connection.
///
/// Messages are sent with the configured QoS and without the retain flag.
pub struct MqttPublisher {
	config: MqttConfig,
	connection: AsyncMutex<Option<MqttConnection>>,
}

impl MqttPublisher {
	pub fn new(config: MqttConfig) -> Self {
		Self {
			config,
			connection: AsyncMutex::new(None),
		}
	}

	pub fn config(&self) -> &MqttConfig {
		&self.config
	}
}

#[async_trait]
impl Connector for MqttPublisher {
	async fn connect(&self) -> Result<(), BrokerError> {
		let mut connection = self.connection.lock().await;
		if connection.is_none() {
			let established =
				MqttConnection::establish(&self.config, None).await?;
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
		connection.close(timeout).await
	}
}

#[async_trait]
impl Publisher for MqttPublisher {
	async fn publish(
		&self,
		topic: &TopicPatternPath,
		message: Message,
	) -> Result<(), BrokerError> {
		let concrete = topic
			.as_concrete_topic()
			.ok_or_else(|| BrokerError::non_concrete_topic(topic.raw()))?;
		validate_publish_topic(concrete)?;

		let client = {
			let connection = self.connection.lock().await;
			connection
				.as_ref()
				.map(|connection| connection.client().clone())
				.ok_or(BrokerError::NotConnected)?
		};
		trace!(
			topic = %concrete,
			payload_size = message.payload().len(),
			"Publishing"
		);
		client
			.publish_bytes(
				concrete,
				self.config.settings.qos,
				false,
				message.into_payload(),
			)
			.await?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn topic(raw: &str) -> TopicPatternPath {
		TopicPatternPath::new_from_string(raw).unwrap()
	}

	#[tokio::test]
	async fn test_publish_checks_topic_before_connection() {
		let publisher = MqttPublisher::new(MqttConfig::localhost("pub"));
		assert!(matches!(
			publisher.publish(&topic("a/{b}"), Message::default()).await,
			Err(BrokerError::NonConcreteTopic { .. })
		));
		assert!(matches!(
			publisher.publish(&topic("a/+"), Message::default()).await,
			Err(BrokerError::UnsupportedTopic { .. })
		));
		assert!(matches!(
			publisher.publish(&topic("a/b"), Message::default()).await,
			Err(BrokerError::NotConnected)
		));
		// Never connected
		publisher.disconnect().await.unwrap();
	}
}
