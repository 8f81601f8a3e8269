//! Topic handling module
//!
//! This module provides components for working with topic patterns,
//! including parsing, matching, and the trie used by broker adapters to
//! route concrete topics to subscriptions.

pub mod subscription_table;
pub mod topic_match;
pub mod topic_matcher;
pub mod topic_pattern_item;
/// Topic pattern parsing and matching
pub mod topic_pattern_path;


// Re-export commonly used types for convenience
pub use subscription_table::{SubscriptionId, SubscriptionTable};
pub use topic_match::{TopicMatch, TopicMatchError, TopicPath};
pub use topic_matcher::{TopicMatcherError, TopicMatcherNode};
pub use topic_pattern_item::{TopicPatternError, TopicPatternItem};
pub use topic_pattern_path::{CacheStrategy, TopicPatternPath};
