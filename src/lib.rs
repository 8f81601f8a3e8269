//! # Topic Router
//!
//! Topic-based publish/subscribe routing with named wildcards, decoupled
//! from the transport that carries the messages.
//!
//! - **Topic patterns**: `/`-separated levels, `{name}` captures one level
//!   and a trailing `*` captures the rest (`devices/{id}/*`)
//! - **Router**: one handler per pattern, one listener task per
//!   subscription, deadline-bounded graceful shutdown
//! - **Pluggable brokers**: an in-process [`LocalBroker`] and, with the
//!   `mqtt` feature, MQTT adapters built on `rumqttc`
//! - **Typed payloads**: optional [`MessageSerializer`] helpers (bincode by
//!   default, JSON behind the `json` feature)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use topic_router::prelude::*;
//!
//! async fn greet(
//! 	publisher: PublisherHandle,
//! 	message: RoutedMessage,
//! ) -> HandlerResult {
//! 	let name = message.get_topic_param("name");
//! 	publisher
//! 		.publish(&format!("replies/{name}"), format!("hello {name}"))
//! 		.await?;
//! 	Ok(())
//! }
//!
//! #[tokio::main]
//! async fn main() -> topic_router::Result<()> {
//! 	let mut router = Router::new(Broker::local(LocalBroker::new()));
//! 	router.add_subscription("greetings/{name}", greet)?;
//! 	router.start().await?;
//!
//! 	router.publish("greetings/world", "hi").await?;
//!
//! 	router.shutdown(Duration::from_secs(5)).await?;
//! 	Ok(())
//! }
//! ```

#![warn(missing_docs)]

pub mod broker;
pub mod message;
pub mod message_serializer;
pub mod routing;
pub mod topic;

pub use broker::{
	Broker, BrokerError, Connector, LocalBroker, MessageStream, Publisher,
	Subscriber,
};
pub use message::{Message, RoutedMessage};
#[cfg(feature = "json")]
pub use message_serializer::JsonSerializer;
pub use message_serializer::{BincodeSerializer, MessageSerializer};
pub use routing::{
	Handler, HandlerError, HandlerResult, LifecycleState, PublisherHandle,
	Router, RouterConfig, RouterError, ShutdownOutcome,
};
pub use topic::{
	CacheStrategy, TopicMatch, TopicPatternError, TopicPatternPath,
};

/// Result type alias for router operations
pub type Result<T> = std::result::Result<T, RouterError>;

/// Prelude module for convenient imports
///
/// ```rust
/// use topic_router::prelude::*;
/// ```
pub mod prelude {
	#[cfg(feature = "mqtt")]
	pub use crate::broker::mqtt::{
		MqttConfig, MqttPublisher, MqttSubscriber, QoS,
	};
	pub use crate::{
		BincodeSerializer, Broker, CacheStrategy, HandlerError, HandlerResult,
		LocalBroker, Message, MessageSerializer, PublisherHandle,
		RoutedMessage, Router, RouterConfig, RouterError, ShutdownOutcome,
	};
}

/// Error types used throughout the library
///
/// ```rust
/// use topic_router::errors::*;
/// ```
pub mod errors {
	#[cfg(feature = "mqtt")]
	pub use crate::broker::ConnectionEstablishmentError;
	pub use crate::topic::{
		TopicMatchError, TopicMatcherError, TopicPatternError,
	};
	pub use crate::{BrokerError, HandlerError, RouterError};
}
