use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;

use crate::message::RoutedMessage;
use crate::topic::TopicPatternPath;

/// Sending half handed to the transport for one subscription.
pub type MessageSender = mpsc::UnboundedSender<RoutedMessage>;

/// Messages delivered for one subscribed pattern, in arrival order.
///
/// The stream ends once the transport drops its sender, which happens on
/// disconnect. Dropping the stream lets the transport release the
/// subscription the next time a message arrives for it.
#[derive(Debug)]
pub struct MessageStream {
	pattern: Arc<TopicPatternPath>,
	receiver: mpsc::UnboundedReceiver<RoutedMessage>,
}

impl MessageStream {
	/// Creates a stream for `pattern` and the sender feeding it.
	pub fn channel(pattern: Arc<TopicPatternPath>) -> (MessageSender, Self) {
		let (sender, receiver) = mpsc::unbounded_channel();
		(sender, Self { pattern, receiver })
	}

	pub fn pattern(&self) -> &Arc<TopicPatternPath> {
		&self.pattern
	}

	/// Waits for the next message; `None` once the stream has ended.
	pub async fn recv(&mut self) -> Option<RoutedMessage> {
		self.receiver.recv().await
	}

	/// Stops accepting new messages; buffered ones can still be received.
	pub fn close(&mut self) {
		self.receiver.close()
	}
}

impl Stream for MessageStream {
	type Item = RoutedMessage;

	fn poll_next(
		mut self: Pin<&mut Self>,
		cx: &mut Context<'_>,
	) -> Poll<Option<Self::Item>> {
		self.receiver.poll_recv(cx)
	}
}

#[cfg(test)]
mod tests {
	use futures::StreamExt;

	use super::*;
	use crate::message::Message;

	#[tokio::test]
	async fn test_stream_preserves_order_and_ends() {
		let pattern =
			Arc::new(TopicPatternPath::new_from_string("n/{i}").unwrap());
		let (sender, mut stream) = MessageStream::channel(pattern.clone());
		assert_eq!(stream.pattern().raw(), "n/{i}");

		for i in 0..3 {
			let topic = format!("n/{i}");
			let topic_match = pattern.try_match_str(&topic).unwrap();
			sender
				.send(RoutedMessage::new(Message::from(topic), topic_match))
				.unwrap();
		}
		drop(sender);

		let params: Vec<String> = stream
			.by_ref()
			.map(|message| message.get_topic_param("i").to_string())
			.collect()
			.await;
		assert_eq!(params, vec!["0", "1", "2"]);
		assert!(stream.recv().await.is_none());
	}
}
