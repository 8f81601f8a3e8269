//! End-to-end routing over the in-process broker.

use std::time::Duration;

use bincode::{Decode, Encode};
use tokio::sync::mpsc;
use tokio::time::timeout;
use topic_router::{
	BincodeSerializer, Broker, CacheStrategy, HandlerError, LocalBroker,
	Message, PublisherHandle, RoutedMessage, Router, RouterConfig,
};

const WAIT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn test_param_and_payload_reach_handler() {
	let mut router = Router::new(Broker::local(LocalBroker::new()));
	let (calls, mut received) = mpsc::unbounded_channel();
	router
		.add_subscription(
			"foo/{id}",
			move |_: PublisherHandle, message: RoutedMessage| {
				let calls = calls.clone();
				async move {
					let _ = calls.send((
						message.get_topic_param("id").to_string(),
						message.payload().clone(),
					));
					Ok::<(), HandlerError>(())
				}
			},
		)
		.unwrap();
	router.start().await.unwrap();

	router.publish("foo/42", "X").await.unwrap();
	let (id, payload) = timeout(WAIT, received.recv()).await.unwrap().unwrap();
	assert_eq!(id, "42");
	assert_eq!(&payload[..], b"X");

	assert!(router.shutdown(WAIT).await.unwrap().is_graceful());
	// Exactly one call
	assert!(received.try_recv().is_err());
}

#[derive(Debug, PartialEq, Encode, Decode)]
struct Command {
	action: String,
	level: u8,
}

#[tokio::test]
async fn test_request_reply_with_typed_payloads() {
	let config =
		RouterConfig::default().with_cache_strategy(CacheStrategy::NoCache);
	let mut router =
		Router::with_config(Broker::local(LocalBroker::new()), config);

	router
		.add_subscription(
			"devices/{device}/commands",
			|publisher: PublisherHandle, message: RoutedMessage| async move {
				let command: Command =
					message.decode(&BincodeSerializer::new())?;
				let device = message.get_topic_param("device");
				let reply = format!("{} at {}", command.action, command.level);
				publisher
					.publish(&format!("devices/{device}/status/last"), reply)
					.await?;
				Ok::<(), HandlerError>(())
			},
		)
		.unwrap();

	let (statuses, mut received) = mpsc::unbounded_channel();
	router
		.add_subscription(
			"devices/{device}/status/*",
			move |_: PublisherHandle, message: RoutedMessage| {
				let statuses = statuses.clone();
				async move {
					let text = String::from_utf8(message.payload().to_vec())?;
					let topic = message.full_topic().to_string();
					let _ = statuses.send((topic, text));
					Ok::<(), HandlerError>(())
				}
			},
		)
		.unwrap();
	router.start().await.unwrap();

	let command = Command {
		action: "dim".to_string(),
		level: 30,
	};
	let message =
		Message::encode(&BincodeSerializer::new(), &command).unwrap();
	router
		.publish("devices/lamp-1/commands", message)
		.await
		.unwrap();

	let (topic, text) = timeout(WAIT, received.recv()).await.unwrap().unwrap();
	assert_eq!(topic, "devices/lamp-1/status/last");
	assert_eq!(text, "dim at 30");
	router.shutdown(WAIT).await.unwrap();
}

#[tokio::test]
async fn test_publish_to_wildcard_topic_fails() {
	let mut router = Router::new(Broker::local(LocalBroker::new()));
	router.start().await.unwrap();
	assert!(router.publish("foo/{id}", "X").await.is_err());
	assert!(router.publish("foo/*", "X").await.is_err());
	router.publish("foo/no-subscribers", "X").await.unwrap();
	router.shutdown(WAIT).await.unwrap();
}
