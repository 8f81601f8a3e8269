//! Demo: routes greetings and sensor readings through a broker.
//!
//! Usage: `topic-router-demo [mqtt://host:port]`. Without an argument an
//! in-process broker is used. Set `RUST_LOG=debug` for more detail.

use std::time::Duration;

use topic_router::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

type DemoResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

async fn greet(
	publisher: PublisherHandle,
	message: RoutedMessage,
) -> HandlerResult {
	let name = message.get_topic_param("name");
	info!(name = %name, payload = ?message.payload(), "Greeting received");
	publisher
		.publish(&format!("replies/{name}"), format!("Hello, {name}!"))
		.await?;
	Ok(())
}

async fn print_reply(
	_: PublisherHandle,
	message: RoutedMessage,
) -> HandlerResult {
	let text = String::from_utf8_lossy(message.payload());
	info!(topic = %message.full_topic(), reply = %text, "Reply received");
	Ok(())
}

async fn log_reading(
	_: PublisherHandle,
	message: RoutedMessage,
) -> HandlerResult {
	let value: f32 = message
		.decode(&BincodeSerializer::new())
		.map_err(|err| format!("bad reading payload: {err}"))?;
	info!(
		sensor_id = %message.get_topic_param("sensor_id"),
		topic = %message.full_topic(),
		value,
		"Sensor reading"
	);
	Ok(())
}

/// Appends `client_id` to the broker URL, keeping any query it already has.
#[cfg_attr(not(feature = "mqtt"), allow(dead_code))]
fn client_url(url: &str, client_id: &str) -> String {
	let base = url.trim_end_matches('/');
	let separator = if base.contains('?') { '&' } else { '?' };
	format!("{base}{separator}client_id={client_id}")
}

#[cfg(feature = "mqtt")]
fn mqtt_broker(url: &str) -> DemoResult<Broker> {
	let subscriber =
		MqttConfig::from_url(&client_url(url, "topic-router-demo-sub"))?;
	let publisher =
		MqttConfig::from_url(&client_url(url, "topic-router-demo-pub"))?;
	Ok(Broker::new()
		.with_subscriber(MqttSubscriber::new(subscriber))
		.with_publisher(MqttPublisher::new(publisher)))
}

#[cfg(not(feature = "mqtt"))]
fn mqtt_broker(_url: &str) -> DemoResult<Broker> {
	Err("built without the `mqtt` feature".into())
}

#[tokio::main]
async fn main() -> DemoResult<()> {
	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| EnvFilter::new("info")),
		)
		.init();

	let broker = match std::env::args().nth(1) {
		| Some(url) => mqtt_broker(&url)?,
		| None => Broker::local(LocalBroker::new()),
	};

	let config = RouterConfig::default()
		.with_shutdown_timeout(Duration::from_secs(3));
	let mut router = Router::with_config(broker, config);
	router.add_subscription("greetings/{name}", greet)?;
	router.add_subscription("replies/{name}", print_reply)?;
	router.add_subscription("sensors/{sensor_id}/*", log_reading)?;
	router.start().await?;

	router.publish("greetings/world", "hi").await?;
	let serializer = BincodeSerializer::new();
	for (topic, value) in
		[("sensors/t1/celsius", 21.5_f32), ("sensors/t2/raw/adc", 0.42)]
	{
		router
			.publish(topic, Message::encode(&serializer, &value)?)
			.await?;
	}

	info!("Press Ctrl-C to stop");
	if let Err(err) = tokio::signal::ctrl_c().await {
		warn!(error = %err, "Failed to listen for Ctrl-C, stopping now");
	}

	let timeout = router.config().shutdown_timeout;
	match router.shutdown(timeout).await? {
		| ShutdownOutcome::Graceful => info!("Stopped"),
		| ShutdownOutcome::Forced { pending } => {
			warn!(pending, "Stopped with listeners still running")
		}
	}
	Ok(())
}
