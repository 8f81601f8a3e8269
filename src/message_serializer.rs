//! Typed payload codecs.
//!
//! The router moves raw bytes only. A [`MessageSerializer`] turns a typed
//! value into a [`Message`](crate::Message) payload and back, see
//! [`Message::encode`](crate::Message::encode) and
//! [`RoutedMessage::decode`](crate::RoutedMessage::decode).

use std::fmt::Debug;

use bincode::{Decode, Encode};
use bytes::Bytes;

/// Converts values of type `T` to payload bytes and back.
pub trait MessageSerializer<T>:
	Default + Clone + Send + Sync + 'static
{
	/// Failure while encoding a value
	type SerializeError: Debug + Send + Sync + 'static;
	/// Failure while decoding a payload
	type DeserializeError: Debug + Send + Sync + 'static;

	fn serialize(&self, data: &T) -> Result<Bytes, Self::SerializeError>;
	fn deserialize(&self, payload: &[u8]) -> Result<T, Self::DeserializeError>;
}

/// Compact binary codec, the default for typed payloads.
#[derive(Clone, Default)]
pub struct BincodeSerializer {
	config: bincode::config::Configuration,
}

impl BincodeSerializer {
	pub fn new() -> Self {
		Self::default()
	}

	/// Uses a non-default bincode configuration, e.g. fixed-width integers.
	pub fn with_config(config: bincode::config::Configuration) -> Self {
		Self { config }
	}
}

impl<T> MessageSerializer<T> for BincodeSerializer
where T: Encode + Decode<()> + 'static
{
	type SerializeError = bincode::error::EncodeError;
	type DeserializeError = bincode::error::DecodeError;

	fn serialize(&self, data: &T) -> Result<Bytes, Self::SerializeError> {
		bincode::encode_to_vec(data, self.config).map(Bytes::from)
	}

	fn deserialize(&self, payload: &[u8]) -> Result<T, Self::DeserializeError> {
		let (value, _read) = bincode::decode_from_slice(payload, self.config)?;
		Ok(value)
	}
}

/// Human-readable codec for serde types.
#[cfg(feature = "json")]
#[derive(Clone, Default)]
pub struct JsonSerializer;

#[cfg(feature = "json")]
impl<T> MessageSerializer<T> for JsonSerializer
where T: serde::Serialize + serde::de::DeserializeOwned + 'static
{
	type SerializeError = serde_json::Error;
	type DeserializeError = serde_json::Error;

	fn serialize(&self, data: &T) -> Result<Bytes, Self::SerializeError> {
		serde_json::to_vec(data).map(Bytes::from)
	}

	fn deserialize(&self, payload: &[u8]) -> Result<T, Self::DeserializeError> {
		serde_json::from_slice(payload)
	}
}
