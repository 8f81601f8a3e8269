//! Configuration for MQTT adapters

use rumqttc::{MqttOptions, OptionError, QoS};

/// Adapter-level behaviour on top of the `rumqttc` options.
#[derive(Debug, Clone)]
pub struct MqttSettings {
	/// QoS used for subscriptions and publishes
	pub qos: QoS,
	/// Capacity of the client request channel
	pub event_loop_capacity: usize,
	/// How long to wait for CONNACK
	pub connection_timeout_millis: u64,
	/// How long `disconnect` waits for the event loop to stop
	pub disconnection_timeout_millis: u64,
}

impl Default for MqttSettings {
	fn default() -> Self {
		Self {
			qos: QoS::AtMostOnce,
			event_loop_capacity: 10,
			connection_timeout_millis: 5000,
			disconnection_timeout_millis: 250,
		}
	}
}

/// Connection options plus adapter settings.
#[derive(Debug, Clone)]
pub struct MqttConfig {
	/// Underlying `rumqttc` options (client id, keep alive, credentials ...)
	pub connection: MqttOptions,
	pub settings: MqttSettings,
}

impl MqttConfig {
	pub fn new(client_id: &str, host: &str, port: u16) -> Self {
		Self {
			connection: MqttOptions::new(client_id, host, port),
			settings: MqttSettings::default(),
		}
	}

	/// Parses options from a broker URL.
	///
	/// Supports `tcp://`, `mqtt://`, `ssl://`, `mqtts://`, `ws://` and
	/// `wss://`; the client id comes from the `client_id` query parameter.
	pub fn from_url(url: &str) -> Result<Self, OptionError> {
		Ok(Self {
			connection: MqttOptions::parse_url(url)?,
			settings: MqttSettings::default(),
		})
	}

	/// Broker on localhost:1883
	pub fn localhost(client_id: &str) -> Self {
		Self::new(client_id, "localhost", 1883)
	}

	pub fn with_qos(mut self, qos: QoS) -> Self {
		self.settings.qos = qos;
		self
	}

	pub fn with_disconnection_timeout(mut self, millis: u64) -> Self {
		self.settings.disconnection_timeout_millis = millis;
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults() {
		let config = MqttConfig::localhost("router");
		assert_eq!(config.settings.qos, QoS::AtMostOnce);
		assert_eq!(config.settings.disconnection_timeout_millis, 250);
		assert_eq!(
			config.connection.broker_address(),
			("localhost".to_string(), 1883)
		);
	}

	#[test]
	fn test_from_url() {
		let config =
			MqttConfig::from_url("mqtt://broker.local:1884?client_id=sub")
				.unwrap()
				.with_qos(QoS::AtLeastOnce)
				.with_disconnection_timeout(1000);
		assert_eq!(config.connection.client_id(), "sub");
		assert_eq!(config.settings.qos, QoS::AtLeastOnce);
		assert_eq!(config.settings.disconnection_timeout_millis, 1000);

		assert!(MqttConfig::from_url("broker.local:1884").is_err());
	}
}
