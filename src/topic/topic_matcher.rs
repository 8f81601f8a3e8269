#![allow(clippy::missing_docs_in_private_items)]
#![allow(missing_docs)]
use std::collections::HashMap;

use arcstr::Substr;
use thiserror::Error;

use super::topic_pattern_item::TopicPatternItem;
use super::topic_pattern_path::TopicPatternPath;
use crate::topic::topic_match::TopicPath;

/// Errors raised when the matcher tree disagrees with its callers
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopicMatcherError {
	/// No node exists for the given pattern segment
	#[error("No matcher node for segment '{segment}' at position {position}")]
	MissingNode { segment: String, position: usize },

	/// Subscription id is not registered
	#[error("Subscription {id} not found")]
	SubscriptionNotFound { id: String },
}

impl TopicMatcherError {
	pub fn missing_node(segment: impl Into<String>, position: usize) -> Self {
		Self::MissingNode {
			segment: segment.into(),
			position,
		}
	}

	pub fn subscription_not_found(id: impl Into<String>) -> Self {
		Self::SubscriptionNotFound { id: id.into() }
	}
}

/// One level of the pattern trie.
///
/// A slot holds whatever the caller keeps per pattern, usually a map of
/// subscriptions. Named wildcards share one child per level regardless of
/// their names, so `foo/{a}` and `foo/{b}` land on the same node.
#[derive(Debug)]
pub struct TopicMatcherNode<T> {
	/// Slot for patterns that end at this level
	terminal: Option<T>,

	literals: HashMap<Substr, TopicMatcherNode<T>>,

	/// Shared child for `{name}` segments
	param: Option<Box<TopicMatcherNode<T>>>,

	/// Slot for patterns ending in `*` here; also hit by this level itself
	trailing_wildcard: Option<T>,
}

pub trait Len {
	fn len(&self) -> usize;
	fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

impl<K, V> Len for HashMap<K, V> {
	fn len(&self) -> usize {
		self.len()
	}
	fn is_empty(&self) -> bool {
		self.is_empty()
	}
}

impl<T: Default + Len> Default for TopicMatcherNode<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T: Default + Len> TopicMatcherNode<T> {
	pub fn new() -> Self {
		Self {
			terminal: None,
			literals: HashMap::new(),
			param: None,
			trailing_wildcard: None,
		}
	}

	/// True when no slot below this node holds anything.
	pub fn is_empty(&self) -> bool {
		self.terminal.as_ref().is_none_or(T::is_empty)
			&& self.literals.is_empty()
			&& self.param.is_none()
			&& self.trailing_wildcard.as_ref().is_none_or(T::is_empty)
	}

	/// Slot for `pattern`, creating the path to it on first use.
	pub fn slot_mut(&mut self, pattern: &TopicPatternPath) -> &mut T {
		let mut node = self;

		for item in pattern.iter() {
			match item {
				| TopicPatternItem::Literal(s) => {
					node = node.literals.entry(s.clone()).or_default()
				}
				| TopicPatternItem::Param(_) => {
					node = node
						.param
						.get_or_insert_with(|| Box::new(TopicMatcherNode::new()))
				}
				| TopicPatternItem::MultiLevel => {
					return node.trailing_wildcard.get_or_insert_with(T::default);
				}
			}
		}
		node.terminal.get_or_insert_with(T::default)
	}

	/// Applies `f` to the slot of an existing pattern and prunes the
	/// branches it leaves empty. Returns true when this node became empty.
	pub fn update_slot<F>(
		&mut self,
		pattern: &[TopicPatternItem],
		f: F,
	) -> Result<bool, TopicMatcherError>
	where
		F: FnMut(&mut T),
	{
		self.update_slot_at(pattern, 0, f)
	}

	fn update_slot_at<F>(
		&mut self,
		pattern: &[TopicPatternItem],
		position: usize,
		mut f: F,
	) -> Result<bool, TopicMatcherError>
	where
		F: FnMut(&mut T),
	{
		let [item, rest @ ..] = pattern else {
			let slot = self.terminal.as_mut().ok_or_else(|| {
				TopicMatcherError::missing_node("<end>", position)
			})?;
			f(slot);
			if slot.is_empty() {
				self.terminal = None
			}
			return Ok(self.is_empty());
		};

		match item {
			| TopicPatternItem::Literal(s) => {
				let child = self.literals.get_mut(s).ok_or_else(|| {
					TopicMatcherError::missing_node(s.as_str(), position)
				})?;
				if child.update_slot_at(rest, position + 1, f)? {
					self.literals.remove(s);
					return Ok(self.is_empty());
				}
			}
			| TopicPatternItem::Param(_) => {
				let child = self.param.as_mut().ok_or_else(|| {
					TopicMatcherError::missing_node("{}", position)
				})?;
				if child.update_slot_at(rest, position + 1, f)? {
					self.param = None;
					return Ok(self.is_empty());
				}
			}
			| TopicPatternItem::MultiLevel => {
				let slot = self.trailing_wildcard.as_mut().ok_or_else(|| {
					TopicMatcherError::missing_node("*", position)
				})?;
				f(slot);
				if slot.is_empty() {
					self.trailing_wildcard = None;
					return Ok(self.is_empty());
				}
			}
		}
		Ok(false)
	}

	fn collect<'a>(&'a self, rest: &[Substr], found: &mut Vec<&'a T>) {
		// `foo/*` covers `foo` as well as everything below it
		found.extend(self.trailing_wildcard.iter());
		match rest {
			| [] => found.extend(self.terminal.iter()),
			| [segment, rest @ ..] => {
				if let Some(child) = self.literals.get(segment) {
					child.collect(rest, found);
				}
				if let Some(child) = &self.param {
					child.collect(rest, found);
				}
			}
		}
	}

	/// Slots of every pattern that matches `topic`.
	pub fn matching<'a>(&'a self, topic: &TopicPath) -> Vec<&'a T> {
		let mut found = Vec::new();
		self.collect(&topic.segments, &mut found);
		found
	}
}
