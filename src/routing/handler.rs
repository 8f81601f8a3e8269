//! Message handlers and the publish capability they receive.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use super::RouterError;
use crate::broker::Publisher;
use crate::message::{Message, RoutedMessage};
use crate::topic::TopicPatternPath;

/// Error a handler may return; it is logged and otherwise ignored.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

pub type HandlerResult = Result<(), HandlerError>;

/// Processes messages delivered on one subscription.
///
/// Implemented for every
/// `Fn(PublisherHandle, RoutedMessage) -> impl Future<Output = HandlerResult>`
/// so plain async closures can be registered directly.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
	async fn handle(
		&self,
		publisher: PublisherHandle,
		message: RoutedMessage,
	) -> HandlerResult;
}

#[async_trait]
impl<F, Fut> Handler for F
where
	F: Fn(PublisherHandle, RoutedMessage) -> Fut + Send + Sync + 'static,
	Fut: Future<Output = HandlerResult> + Send + 'static,
{
	async fn handle(
		&self,
		publisher: PublisherHandle,
		message: RoutedMessage,
	) -> HandlerResult {
		(self)(publisher, message).await
	}
}

/// Publish-only view of the router's broker, handed to handlers.
#[derive(Clone)]
pub struct PublisherHandle {
	publisher: Arc<dyn Publisher>,
}

impl PublisherHandle {
	pub fn new(publisher: Arc<dyn Publisher>) -> Self {
		Self { publisher }
	}

	/// Parses `topic` and publishes `message` to it.
	pub async fn publish(
		&self,
		topic: &str,
		message: impl Into<Message>,
	) -> Result<(), RouterError> {
		let topic = TopicPatternPath::new_from_string(topic)?;
		self.publish_to(&topic, message).await
	}

	pub async fn publish_to(
		&self,
		topic: &TopicPatternPath,
		message: impl Into<Message>,
	) -> Result<(), RouterError> {
		self.publisher.publish(topic, message.into()).await?;
		Ok(())
	}
}

impl std::fmt::Debug for PublisherHandle {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("PublisherHandle").finish_non_exhaustive()
	}
}
