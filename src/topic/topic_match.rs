#![allow(clippy::missing_docs_in_private_items)]
#![allow(missing_docs)]

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use arcstr::{ArcStr, Substr};
use smallvec::SmallVec;
use thiserror::Error;

/// Concrete topic split into its `/`-separated segments.
///
/// Segments are views into the shared topic string, so cloning a
/// `TopicPath` never copies topic text.
#[derive(Debug, Clone)]
pub struct TopicPath {
	pub path: ArcStr,
	pub segments: Vec<Substr>,
}

impl TopicPath {
	pub fn new(path: impl Into<ArcStr>) -> Self {
		let path = path.into();
		let segments: Vec<Substr> =
			path.split('/').map(|s| path.substr_from(s)).collect();
		Self { path, segments }
	}

	pub fn path(&self) -> ArcStr {
		self.path.clone()
	}
}

impl fmt::Display for TopicPath {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.path)
	}
}

/// Reasons a concrete topic does not satisfy a pattern.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopicMatchError {
	#[error("Topic has more levels than the pattern")]
	UnexpectedEndOfPattern,
	#[error("Topic has fewer levels than the pattern")]
	UnexpectedEndOfTopic,
	#[error(
		"Topic segment '{found}' at position {position} does not match \
		 '{expected}'"
	)]
	SegmentMismatch {
		expected: String,
		found: String,
		position: usize,
	},
}

/// Result of matching a concrete topic against a pattern.
///
/// Holds the full topic that matched plus the values captured by named
/// wildcards, in declaration order. The trailing multi-level wildcard is
/// unnamed and never appears among the parameters.
#[derive(Clone)]
pub struct TopicMatch {
	topic: Arc<TopicPath>,
	params: SmallVec<[(Substr, Substr); 4]>,
}

impl TopicMatch {
	/// Builds a match from an already known topic and parameter values.
	///
	/// Intended for broker adapters that extract parameters themselves.
	pub fn new<I, K, V>(full_name: impl Into<ArcStr>, params: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<ArcStr>,
		V: Into<ArcStr>,
	{
		let params = params
			.into_iter()
			.map(|(name, value)| {
				(Substr::from(name.into()), Substr::from(value.into()))
			})
			.collect();
		Self {
			topic: Arc::new(TopicPath::new(full_name)),
			params,
		}
	}

	pub(crate) fn from_match_result(
		topic: Arc<TopicPath>,
		params: SmallVec<[(Substr, Substr); 4]>,
	) -> Self {
		Self { topic, params }
	}

	/// The concrete topic that matched.
	pub fn full_name(&self) -> &str {
		&self.topic.path
	}

	pub fn topic_path(&self) -> &TopicPath {
		&self.topic
	}

	pub fn path_segments(&self) -> &[Substr] {
		&self.topic.segments
	}

	/// Value captured for the named wildcard `name`.
	pub fn get_param(&self, name: &str) -> Option<&str> {
		self.params
			.iter()
			.find(|(n, _)| n.as_str() == name)
			.map(|(_, value)| value.as_str())
	}

	/// Captured parameters as `(name, value)` pairs in declaration order.
	pub fn params(&self) -> impl Iterator<Item = (&str, &str)> {
		self.params
			.iter()
			.map(|(name, value)| (name.as_str(), value.as_str()))
	}

	pub fn to_map(&self) -> HashMap<String, String> {
		self.params()
			.map(|(name, value)| (name.to_string(), value.to_string()))
			.collect()
	}

	pub fn len(&self) -> usize {
		self.params.len()
	}

	pub fn is_empty(&self) -> bool {
		self.params.is_empty()
	}
}

impl fmt::Debug for TopicMatch {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "TopicMatch {{ topic: {}", self.topic.path)?;
		if !self.params.is_empty() {
			write!(f, ", params: {{")?;
			for (i, (name, value)) in self.params.iter().enumerate() {
				if i > 0 {
					write!(f, ", ")?;
				}
				write!(f, "{name}: {value}")?;
			}
			write!(f, "}}")?;
		}
		write!(f, " }}")
	}
}

impl fmt::Display for TopicMatch {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Match({})", self.topic.path)?;

		if !self.params.is_empty() {
			write!(f, " with {} params", self.params.len())?;
		}

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn segments(path: &TopicPath) -> Vec<&str> {
		path.segments.iter().map(|s| s.as_str()).collect()
	}

	#[test]
	fn test_topic_path_segments() {
		let path = TopicPath::new("foo/12345/bar");
		assert_eq!(segments(&path), vec!["foo", "12345", "bar"]);
		assert_eq!(path.to_string(), "foo/12345/bar");

		let path = TopicPath::new("end/");
		assert_eq!(segments(&path), vec!["end", ""]);
	}

	#[test]
	fn test_manual_match() {
		let topic_match =
			TopicMatch::new("foo/1/bar/2", [("foo_id", "1"), ("bar_id", "2")]);
		assert_eq!(topic_match.full_name(), "foo/1/bar/2");
		assert_eq!(topic_match.get_param("foo_id"), Some("1"));
		assert_eq!(topic_match.get_param("bar_id"), Some("2"));
		assert_eq!(topic_match.get_param("baz"), None);
		assert_eq!(
			topic_match.params().collect::<Vec<_>>(),
			vec![("foo_id", "1"), ("bar_id", "2")]
		);
		assert_eq!(topic_match.to_string(), "Match(foo/1/bar/2) with 2 params");
	}

	#[test]
	fn test_match_without_params() {
		let topic_match =
			TopicMatch::new("plain/topic", std::iter::empty::<(&str, &str)>());
		assert!(topic_match.is_empty());
		assert!(topic_match.to_map().is_empty());
		assert_eq!(
			format!("{topic_match:?}"),
			"TopicMatch { topic: plain/topic }"
		);
	}
}
