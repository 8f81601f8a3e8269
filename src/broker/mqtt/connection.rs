//! Shared MQTT connection plumbing for the subscriber and publisher.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use rumqttc::Packet::{self, Disconnect, Publish};
use rumqttc::{AsyncClient, ConnAck, ConnectReturnCode, EventLoop};
use rumqttc::{Event::Incoming, Event::Outgoing};
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, error, info, warn};

use super::config::MqttConfig;
use crate::broker::{BrokerError, ConnectionEstablishmentError};

/// Receives what the event loop reads off the wire.
pub(super) trait Inbound: Send + Sync + 'static {
	/// A PUBLISH packet arrived.
	fn on_publish(&self, client: &AsyncClient, topic: &str, payload: Bytes);

	/// The broker accepted a reconnect but forgot our subscriptions.
	fn on_session_lost(&self, client: &AsyncClient);
}

/// A live client with its event loop task.
pub(super) struct MqttConnection {
	client: AsyncClient,
	event_loop_handle: Option<JoinHandle<()>>,
}

impl MqttConnection {
	/// Connects and waits for CONNACK before spawning the event loop.
	pub(super) async fn establish(
		config: &MqttConfig,
		inbound: Option<Arc<dyn Inbound>>,
	) -> Result<Self, BrokerError> {
		let (client, new_event_loop) = AsyncClient::new(
			config.connection.clone(),
			config.settings.event_loop_capacity,
		);

		let timeout_millis = config.settings.connection_timeout_millis;
		let connected_event_loop = time::timeout(
			Duration::from_millis(timeout_millis),
			establish_connection(new_event_loop),
		)
		.await
		.map_err(|_| ConnectionEstablishmentError::Timeout { timeout_millis })
		.map_err(BrokerError::from)??;

		let loop_client = client.clone();
		let event_loop_handle = tokio::spawn(async move {
			run(connected_event_loop, loop_client, inbound).await;
		});
		Ok(Self {
			client,
			event_loop_handle: Some(event_loop_handle),
		})
	}

	pub(super) fn client(&self) -> &AsyncClient {
		&self.client
	}

	/// Sends DISCONNECT and waits up to `timeout` for the event loop.
	pub(super) async fn close(
		mut self,
		timeout: Duration,
	) -> Result<(), BrokerError> {
		let disconnected = self.client.disconnect().await;
		if let Some(mut handle) = self.event_loop_handle.take() {
			match time::timeout(timeout, &mut handle).await {
				| Ok(Ok(())) => {}
				| Ok(Err(err)) => {
					warn!(error = %err, "MQTT event loop task failed")
				}
				| Err(_) => {
					warn!(
						timeout = ?timeout,
						"MQTT event loop did not stop in time, aborting"
					);
					handle.abort();
				}
			}
		}
		disconnected.map_err(BrokerError::from)
	}
}

impl Drop for MqttConnection {
	fn drop(&mut self) {
		if let Some(handle) = self.event_loop_handle.take() {
			warn!(
				"MQTT connection dropped without disconnect, aborting event \
				 loop"
			);
			handle.abort();
		}
	}
}

async fn establish_connection(
	mut event_loop: EventLoop,
) -> Result<EventLoop, ConnectionEstablishmentError> {
	loop {
		match event_loop.poll().await {
			| Ok(Incoming(Packet::ConnAck(ConnAck { code, .. }))) => {
				if code == ConnectReturnCode::Success {
					debug!("MQTT connection established");
					return Ok(event_loop);
				}
				debug!(code = ?code, "MQTT connection rejected by broker");
				return Err(ConnectionEstablishmentError::BrokerRejected {
					code,
				});
			}
			| Ok(notification) => {
				debug!(
					notification = ?notification,
					"Bootstrap phase notification"
				);
			}
			| Err(connection_err) => {
				debug!(
					error = %connection_err,
					"MQTT connection error during bootstrap"
				);
				return Err(ConnectionEstablishmentError::Network(
					connection_err,
				));
			}
		}
	}
}

/// Polls the event loop until a DISCONNECT is seen or errors pile up.
async fn run(
	mut event_loop: EventLoop,
	client: AsyncClient,
	inbound: Option<Arc<dyn Inbound>>,
) {
	let mut error_count = 0;
	const MAX_CONSECUTIVE_ERRORS: u32 = 10;
	const INITIAL_RETRY_DELAY: Duration = Duration::from_millis(100);
	const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

	loop {
		match event_loop.poll().await {
			| Ok(Incoming(Packet::ConnAck(ConnAck {
				session_present: false,
				code: ConnectReturnCode::Success,
			}))) => {
				error_count = 0;
				info!("MQTT reconnected without session, resubscribing");
				if let Some(inbound) = &inbound {
					inbound.on_session_lost(&client);
				}
			}
			| Ok(Incoming(Publish(p))) => {
				error_count = 0;
				debug!(
					topic = %p.topic,
					payload_size = p.payload.len(),
					"Received MQTT message"
				);
				match &inbound {
					| Some(inbound) => {
						inbound.on_publish(&client, &p.topic, p.payload)
					}
					| None => debug!(
						topic = %p.topic,
						"Ignoring message on publish-only connection"
					),
				}
			}
			| Ok(Incoming(Disconnect)) => {
				info!("Received MQTT Disconnect packet from server");
				break;
			}
			| Ok(Outgoing(rumqttc::Outgoing::Disconnect)) => {
				info!("Sent MQTT Disconnect packet to server");
				break;
			}
			| Ok(notification) => {
				error_count = 0;
				debug!(notification = ?notification, "MQTT notification");
			}
			| Err(err) => {
				error_count += 1;
				error!(
					error_count = error_count,
					error = %err,
					"MQTT event loop error"
				);

				if error_count >= MAX_CONSECUTIVE_ERRORS {
					error!(
						error_count = error_count,
						max_errors = MAX_CONSECUTIVE_ERRORS,
						"Too many consecutive errors, terminating event loop"
					);
					break;
				}

				let delay =
					INITIAL_RETRY_DELAY * 2_u32.pow((error_count - 1).min(10));
				let delay = delay.min(MAX_RETRY_DELAY);
				warn!(
					delay = ?delay,
					error_count = error_count,
					"Retrying MQTT connection"
				);
				time::sleep(delay).await;
			}
		}
	}
	info!("MQTT event loop terminated");
}
