use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::handler::{Handler, PublisherHandle};
use crate::broker::MessageStream;

/// Feeds one subscription's messages to its handler, one at a time.
///
/// Returns when `shutdown` fires or the stream ends. Messages still
/// buffered at that point are dropped.
pub(super) async fn listen(
	mut stream: MessageStream,
	handler: Arc<dyn Handler>,
	publisher: PublisherHandle,
	shutdown: CancellationToken,
) {
	let pattern = stream.pattern().clone();
	debug!(topic = %pattern, "Listener started");

	loop {
		tokio::select! {
			biased;
			_ = shutdown.cancelled() => {
				info!(topic = %pattern, "Listener terminated");
				break;
			}
			received = stream.recv() => {
				let Some(message) = received else {
					info!(
						topic = %pattern,
						"Message stream ended, listener terminated"
					);
					break;
				};
				let full_topic = message.topic().topic_path().path();
				if let Err(err) =
					handler.handle(publisher.clone(), message).await
				{
					error!(
						topic = %pattern,
						full_topic = %full_topic,
						error = %err,
						"Handler failed"
					);
				}
			}
		}
	}
}
