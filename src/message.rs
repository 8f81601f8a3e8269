//! Message carriers.
//!
//! A [`Message`] is the raw payload handed to a publisher. A
//! [`RoutedMessage`] is what a subscriber stream yields: the payload plus
//! the [`TopicMatch`] describing which concrete topic it arrived on and
//! what the pattern's named wildcards captured.

use std::sync::Arc;

use bytes::Bytes;

use crate::message_serializer::MessageSerializer;
use crate::topic::TopicMatch;

/// Raw message payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
	payload: Bytes,
}

impl Message {
	pub fn new(payload: impl Into<Bytes>) -> Self {
		Self {
			payload: payload.into(),
		}
	}

	/// Serializes `value` into a new message.
	pub fn encode<T, S>(
		serializer: &S,
		value: &T,
	) -> Result<Self, S::SerializeError>
	where
		S: MessageSerializer<T>,
	{
		serializer.serialize(value).map(Self::new)
	}

	pub fn payload(&self) -> &Bytes {
		&self.payload
	}

	pub fn into_payload(self) -> Bytes {
		self.payload
	}
}

impl From<Bytes> for Message {
	fn from(payload: Bytes) -> Self {
		Self::new(payload)
	}
}

impl From<Vec<u8>> for Message {
	fn from(payload: Vec<u8>) -> Self {
		Self::new(payload)
	}
}

impl From<&'static str> for Message {
	fn from(payload: &'static str) -> Self {
		Self::new(payload)
	}
}

impl From<String> for Message {
	fn from(payload: String) -> Self {
		Self::new(payload)
	}
}

/// Payload delivered on a subscription, with its topic match.
#[derive(Debug, Clone)]
pub struct RoutedMessage {
	message: Message,
	topic: Arc<TopicMatch>,
}

impl RoutedMessage {
	pub fn new(message: Message, topic: Arc<TopicMatch>) -> Self {
		Self { message, topic }
	}

	pub fn message(&self) -> &Message {
		&self.message
	}

	pub fn payload(&self) -> &Bytes {
		self.message.payload()
	}

	pub fn topic(&self) -> &TopicMatch {
		&self.topic
	}

	/// Concrete topic the message was published to.
	pub fn full_topic(&self) -> &str {
		self.topic.full_name()
	}

	/// Value captured by the named wildcard `name`.
	///
	/// Returns an empty string when the pattern has no such wildcard; use
	/// [`topic_param`](Self::topic_param) to tell the two cases apart.
	pub fn get_topic_param(&self, name: &str) -> &str {
		self.topic.get_param(name).unwrap_or_default()
	}

	pub fn topic_param(&self, name: &str) -> Option<&str> {
		self.topic.get_param(name)
	}

	/// Deserializes the payload.
	pub fn decode<T, S>(
		&self,
		serializer: &S,
	) -> Result<T, S::DeserializeError>
	where
		S: MessageSerializer<T>,
	{
		serializer.deserialize(self.message.payload())
	}

	pub fn into_parts(self) -> (Message, Arc<TopicMatch>) {
		(self.message, self.topic)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::message_serializer::BincodeSerializer;

	fn routed(
		topic: &str,
		params: &[(&str, &str)],
		payload: &'static str,
	) -> RoutedMessage {
		let topic_match = TopicMatch::new(topic, params.iter().copied());
		RoutedMessage::new(Message::from(payload), Arc::new(topic_match))
	}

	#[test]
	fn test_absent_param_is_empty() {
		let message = routed("foo/42", &[("id", "42")], "x");
		assert_eq!(message.get_topic_param("id"), "42");
		assert_eq!(message.get_topic_param("missing"), "");
		assert_eq!(message.topic_param("missing"), None);
		assert_eq!(message.full_topic(), "foo/42");
		assert_eq!(&message.payload()[..], b"x");
	}

	#[test]
	fn test_typed_payload() {
		let serializer = BincodeSerializer::new();
		let message = Message::encode(&serializer, &(7u8, true)).unwrap();
		let no_params: [(&str, &str); 0] = [];
		let topic_match = Arc::new(TopicMatch::new("a", no_params));
		let routed = RoutedMessage::new(message, topic_match);
		let value: (u8, bool) = routed.decode(&serializer).unwrap();
		assert_eq!(value, (7, true));
	}
}
