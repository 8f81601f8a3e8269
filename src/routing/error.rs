use thiserror::Error;

use crate::broker::BrokerError;
use crate::topic::TopicPatternError;

/// Errors returned by [`Router`](super::Router) operations.
#[derive(Debug, Error)]
pub enum RouterError {
	/// Subscriptions can only be added before `start`
	#[error("Cannot add subscription '{pattern}': router already started")]
	CannotAddSubscription { pattern: String },

	#[error("Subscription for '{pattern}' already exists")]
	DuplicateSubscription { pattern: String },

	#[error("Router already started")]
	AlreadyStarted,

	#[error("Router is not running")]
	NotRunning,

	/// Listeners still running when the shutdown deadline passed
	#[error("Shutdown timeout exceeded with {pending} listener(s) running")]
	ShutdownTimeoutExceeded { pending: usize },

	#[error("Invalid topic pattern: {0}")]
	Pattern(#[from] TopicPatternError),

	#[error("Broker error: {0}")]
	Broker(#[from] BrokerError),
}

impl RouterError {
	pub fn cannot_add_subscription(pattern: impl Into<String>) -> Self {
		Self::CannotAddSubscription {
			pattern: pattern.into(),
		}
	}

	pub fn duplicate_subscription(pattern: impl Into<String>) -> Self {
		Self::DuplicateSubscription {
			pattern: pattern.into(),
		}
	}
}
