//! MQTT transport built on `rumqttc`.
//!
//! [`MqttSubscriber`] and [`MqttPublisher`] each own a separate client
//! connection, so give them distinct client ids.

mod config;
mod connection;
mod publisher;
mod subscriber;
mod topic;

pub use config::{MqttConfig, MqttSettings};
pub use publisher::MqttPublisher;
pub use rumqttc::{MqttOptions, QoS};
pub use subscriber::MqttSubscriber;
pub use topic::{to_mqtt_filter, validate_publish_topic};
