//! Subscription registry, listener tasks and the router lifecycle.

mod config;
mod error;
mod handler;
mod listener;
mod router;

pub use config::RouterConfig;
pub use error::RouterError;
pub use handler::{Handler, HandlerError, HandlerResult, PublisherHandle};
pub use router::{LifecycleState, Router, ShutdownOutcome};
