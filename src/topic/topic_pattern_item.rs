//! Topic pattern segment types and pattern parsing errors

use std::borrow::Cow;

use arcstr::Substr;
use thiserror::Error;

/// Error types for topic pattern parsing
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopicPatternError {
	/// Named wildcard `{}` without a name
	#[error(
		"Invalid topic pattern '{pattern}': single level wildcard is empty"
	)]
	EmptySingleLevelWildcard {
		/// The invalid pattern
		pattern: String,
	},

	/// The same wildcard name used twice in one pattern
	#[error(
		"Invalid topic pattern '{pattern}': single level wildcard '{name}' is \
		 duplicated"
	)]
	DuplicatedSingleLevelWildcard {
		/// The invalid pattern
		pattern: String,
		/// Name that appears more than once
		name: String,
	},

	/// Multi-level wildcard (*) used not at the end of the pattern
	#[error(
		"Invalid topic pattern '{pattern}': multi-level wildcard '*' must be \
		 the last level"
	)]
	InvalidMultiLevelWildcardPosition {
		/// The invalid pattern
		pattern: String,
	},
}

impl TopicPatternError {
	/// Creates a new EmptySingleLevelWildcard error
	pub fn empty_wildcard(pattern: impl Into<String>) -> Self {
		Self::EmptySingleLevelWildcard {
			pattern: pattern.into(),
		}
	}

	/// Creates a new DuplicatedSingleLevelWildcard error
	pub fn duplicated_wildcard(
		pattern: impl Into<String>,
		name: impl Into<String>,
	) -> Self {
		Self::DuplicatedSingleLevelWildcard {
			pattern: pattern.into(),
			name: name.into(),
		}
	}

	/// Creates a new InvalidMultiLevelWildcardPosition error
	pub fn multi_level_position(pattern: impl Into<String>) -> Self {
		Self::InvalidMultiLevelWildcardPosition {
			pattern: pattern.into(),
		}
	}

	/// Returns the error type for categorization
	pub fn error_type(&self) -> &'static str {
		match self {
			| TopicPatternError::EmptySingleLevelWildcard { .. } => {
				"empty_single_level_wildcard"
			}
			| TopicPatternError::DuplicatedSingleLevelWildcard { .. } => {
				"duplicated_single_level_wildcard"
			}
			| TopicPatternError::InvalidMultiLevelWildcardPosition { .. } => {
				"invalid_multi_level_wildcard_position"
			}
		}
	}
}

/// Topic pattern segment: literal string or wildcard
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TopicPatternItem {
	/// Literal string segment, compared case-sensitively
	Literal(Substr),
	/// Named single-level wildcard `{name}`
	Param(Substr),
	/// Trailing multi-level wildcard `*`
	MultiLevel,
}

impl TopicPatternItem {
	/// Parses one `/`-separated segment of `pattern`.
	///
	/// Position rules (the multi-level wildcard must come last, names are
	/// unique) are checked by [`TopicPatternPath`](super::TopicPatternPath).
	pub(crate) fn parse_segment(
		segment: Substr,
		pattern: &str,
	) -> Result<Self, TopicPatternError> {
		if segment.trim_matches(' ') == "*" {
			return Ok(TopicPatternItem::MultiLevel);
		}
		if is_named_wildcard(&segment) {
			let inner = segment[1 .. segment.len() - 1].trim_matches(' ');
			if inner.is_empty() {
				return Err(TopicPatternError::empty_wildcard(pattern));
			}
			return Ok(TopicPatternItem::Param(segment.substr_from(inner)));
		}
		Ok(TopicPatternItem::Literal(segment))
	}

	/// Returns pattern representation with named parameters in braces.
	pub fn as_wildcard(&self) -> Cow<str> {
		match self {
			| TopicPatternItem::Literal(s) => Cow::Borrowed(s),
			| TopicPatternItem::Param(name) => {
				Cow::Owned(format!("{{{name}}}"))
			}
			| TopicPatternItem::MultiLevel => Cow::Borrowed("*"),
		}
	}

	/// Returns parameter name for named wildcards.
	pub fn param_name(&self) -> Option<&Substr> {
		match self {
			| TopicPatternItem::Param(name) => Some(name),
			| _ => None,
		}
	}

	/// Returns true if this item is a wildcard.
	pub fn is_wildcard(&self) -> bool {
		!matches!(self, TopicPatternItem::Literal(_))
	}
}

impl std::fmt::Display for TopicPatternItem {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.as_wildcard())
	}
}

fn is_named_wildcard(segment: &str) -> bool {
	segment.len() >= 2 && segment.starts_with('{') && segment.ends_with('}')
}
