use std::error::Error as StdError;

use thiserror::Error;

/// Errors raised by transports and the [`Broker`](super::Broker) composite.
#[derive(Debug, Error)]
pub enum BrokerError {
	#[error("No subscriber configured")]
	NoSubscriber,

	#[error("No publisher configured")]
	NoPublisher,

	#[error("Broker is not connected")]
	NotConnected,

	/// Publishing needs a destination without wildcards
	#[error("Cannot publish to '{pattern}': topic contains wildcards")]
	NonConcreteTopic { pattern: String },

	/// The transport cannot express this topic
	#[error("Topic '{topic}' is not supported by this transport: {reason}")]
	UnsupportedTopic { topic: String, reason: &'static str },

	/// Failure reported by a third-party transport
	#[error("Transport error: {0}")]
	Transport(#[source] Box<dyn StdError + Send + Sync>),

	#[cfg(feature = "mqtt")]
	#[error("MQTT client operation failed: {0}")]
	Client(#[from] rumqttc::ClientError),

	#[cfg(feature = "mqtt")]
	#[error("Failed to establish connection: {0}")]
	ConnectionEstablishment(#[from] ConnectionEstablishmentError),
}

impl BrokerError {
	pub fn non_concrete_topic(pattern: impl Into<String>) -> Self {
		Self::NonConcreteTopic {
			pattern: pattern.into(),
		}
	}

	pub fn unsupported_topic(
		topic: impl Into<String>,
		reason: &'static str,
	) -> Self {
		Self::UnsupportedTopic {
			topic: topic.into(),
			reason,
		}
	}

	pub fn transport(
		err: impl Into<Box<dyn StdError + Send + Sync>>,
	) -> Self {
		Self::Transport(err.into())
	}
}

/// Reasons an MQTT connection could not be brought up.
#[cfg(feature = "mqtt")]
#[derive(Debug, Error)]
pub enum ConnectionEstablishmentError {
	#[error("Network connection failed: {0}")]
	Network(#[from] rumqttc::ConnectionError),

	#[error("Broker rejected connection: {code:?}")]
	BrokerRejected { code: rumqttc::ConnectReturnCode },

	#[error("Connection establishment timed out after {timeout_millis}ms")]
	Timeout { timeout_millis: u64 },
}
