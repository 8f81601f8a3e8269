//! Subscription bookkeeping for broker adapters.
//!
//! Adapters register one entry (usually a channel sender) per subscribed
//! pattern and look entries up by concrete topic when a message arrives.

use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;

use super::topic_matcher::{TopicMatcherError, TopicMatcherNode};
use super::topic_pattern_path::TopicPatternPath;
use crate::topic::topic_match::TopicPath;

/// A subscription identifier.
///
/// Unique within one [`SubscriptionTable`].
#[derive(Debug, Eq, PartialEq, Hash, Copy, Clone)]
pub struct SubscriptionId(usize);

impl Display for SubscriptionId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "SubscriptionId({})", self.0)
	}
}

type EntryTable<T> = HashMap<SubscriptionId, T>;

/// Trie-backed table of subscriptions keyed by pattern shape.
pub struct SubscriptionTable<T> {
	topic_matcher: TopicMatcherNode<EntryTable<T>>,
	subscriptions: HashMap<SubscriptionId, Arc<TopicPatternPath>>,
	next_id: usize,
}

impl<T> Default for SubscriptionTable<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T> SubscriptionTable<T> {
	pub fn new() -> Self {
		Self {
			topic_matcher: TopicMatcherNode::new(),
			subscriptions: HashMap::new(),
			next_id: 0,
		}
	}

	/// Registers `entry` for `pattern`.
	///
	/// The returned flag is true when no other subscription shares the
	/// pattern's wildcard shape, i.e. the transport has to subscribe.
	pub fn add(
		&mut self,
		pattern: Arc<TopicPatternPath>,
		entry: T,
	) -> (bool, SubscriptionId) {
		let entries = self.topic_matcher.slot_mut(&pattern);
		let fresh_shape = entries.is_empty();

		let id = SubscriptionId(self.next_id);
		self.next_id = self.next_id.wrapping_add(1);

		entries.insert(id, entry);
		self.subscriptions.insert(id, pattern);

		(fresh_shape, id)
	}

	/// Removes a subscription.
	///
	/// The returned flag is true when the pattern's shape has no remaining
	/// subscriptions, i.e. the transport may unsubscribe.
	pub fn remove(
		&mut self,
		id: &SubscriptionId,
	) -> Result<(bool, Arc<TopicPatternPath>), TopicMatcherError> {
		let Some(pattern) = self.subscriptions.remove(id) else {
			return Err(TopicMatcherError::subscription_not_found(
				id.to_string(),
			));
		};
		let mut shape_now_empty = false;
		self.topic_matcher.update_slot(pattern.slice(), |entries| {
			entries.remove(id);
			shape_now_empty = entries.is_empty();
		})?;
		Ok((shape_now_empty, pattern))
	}

	/// Returns every subscription whose pattern shape matches `topic`.
	pub fn find<'a>(
		&'a self,
		topic: &TopicPath,
	) -> Vec<(SubscriptionId, &'a Arc<TopicPatternPath>, &'a T)> {
		self.topic_matcher
			.matching(topic)
			.into_iter()
			.flat_map(|entries| entries.iter())
			.filter_map(|(id, entry)| {
				self.subscriptions
					.get(id)
					.map(|pattern| (*id, pattern, entry))
			})
			.collect()
	}

	pub fn patterns(&self) -> impl Iterator<Item = &Arc<TopicPatternPath>> {
		self.subscriptions.values()
	}

	pub fn len(&self) -> usize {
		self.subscriptions.len()
	}

	pub fn is_empty(&self) -> bool {
		self.subscriptions.is_empty()
	}

	/// Drops every entry; channel senders stored as entries are closed.
	pub fn clear(&mut self) {
		self.topic_matcher = TopicMatcherNode::new();
		self.subscriptions.clear();
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn pattern(raw: &str) -> Arc<TopicPatternPath> {
		Arc::new(TopicPatternPath::new_from_string(raw).unwrap())
	}

	#[test]
	fn test_shared_shape_reports_fresh_once() {
		let mut table = SubscriptionTable::new();
		let (fresh_a, id_a) = table.add(pattern("foo/{a}"), "a");
		let (fresh_b, id_b) = table.add(pattern("foo/{b}"), "b");
		assert!(fresh_a);
		assert!(!fresh_b);
		assert_ne!(id_a, id_b);

		let (empty, removed) = table.remove(&id_a).unwrap();
		assert!(!empty);
		assert_eq!(removed.raw(), "foo/{a}");
		let (empty, _) = table.remove(&id_b).unwrap();
		assert!(empty);
		assert!(table.is_empty());
	}

	#[test]
	fn test_find_by_concrete_topic() {
		let mut table = SubscriptionTable::new();
		table.add(pattern("foo/{id}"), 1);
		table.add(pattern("foo/*"), 2);
		table.add(pattern("bar/{id}"), 3);

		let topic = TopicPath::new("foo/42");
		let mut found: Vec<i32> =
			table.find(&topic).into_iter().map(|(_, _, v)| *v).collect();
		found.sort();
		assert_eq!(found, vec![1, 2]);

		let topic = TopicPath::new("foo");
		let found: Vec<i32> =
			table.find(&topic).into_iter().map(|(_, _, v)| *v).collect();
		assert_eq!(found, vec![2]);
	}

	#[test]
	fn test_remove_unknown_subscription() {
		let mut table = SubscriptionTable::<()>::new();
		let (_, id) = table.add(pattern("a"), ());
		table.remove(&id).unwrap();
		assert!(table.remove(&id).is_err());
	}

	#[test]
	fn test_clear_drops_entries() {
		let mut table = SubscriptionTable::new();
		table.add(pattern("a/b"), ());
		table.add(pattern("a/*"), ());
		assert_eq!(table.len(), 2);
		table.clear();
		assert!(table.is_empty());
		assert!(table.find(&TopicPath::new("a/b")).is_empty());
	}
}
