use std::convert::TryFrom;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::slice::Iter;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};

use arcstr::{ArcStr, Substr};
use lru::LruCache;
use smallvec::SmallVec;

use super::topic_pattern_item::{TopicPatternError, TopicPatternItem};
use crate::topic::topic_match::{TopicMatch, TopicMatchError, TopicPath};

const DEFAULT_CACHE_SIZE: NonZeroUsize = match NonZeroUsize::new(100) {
	| Some(size) => size,
	| None => unreachable!(),
};

/// Caching of match results for repeated concrete topics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStrategy {
	/// Keep up to N most recently matched topics
	Lru(NonZeroUsize),
	/// Match every topic from scratch
	NoCache,
}

impl Default for CacheStrategy {
	fn default() -> Self {
		CacheStrategy::Lru(DEFAULT_CACHE_SIZE)
	}
}

/// Parsed topic pattern with named and multi-level wildcards.
///
/// Patterns are split on `/`. A `{name}` segment captures exactly one
/// level, a trailing `*` captures the remaining levels without a name, and
/// everything else is matched literally. Two patterns are equal when their
/// raw strings are equal.
#[derive(Debug)]
pub struct TopicPatternPath {
	raw: ArcStr,
	segments: Vec<Substr>,
	items: Vec<TopicPatternItem>,
	params: SmallVec<[Substr; 4]>,
	/// Optional LRU cache for topic match results.
	///
	/// `Mutex` keeps the pattern `Send + Sync` so it can be shared between
	/// the adapter task producing matches and the router.
	match_cache: Option<Mutex<LruCache<ArcStr, Arc<TopicMatch>>>>,
}

impl Clone for TopicPatternPath {
	fn clone(&self) -> Self {
		Self {
			raw: self.raw.clone(),
			segments: self.segments.clone(),
			items: self.items.clone(),
			params: self.params.clone(),
			match_cache: self.cache_capacity().map(|capacity| {
				Mutex::new(LruCache::new(capacity))
			}),
		}
	}
}

impl TopicPatternPath {
	/// Parses a pattern without a match cache.
	pub fn new_from_string(
		topic_pattern: impl Into<ArcStr>,
	) -> Result<Self, TopicPatternError> {
		Self::new_with_cache(topic_pattern, CacheStrategy::NoCache)
	}

	/// Parses a pattern with the given match cache strategy.
	pub fn new_with_cache(
		topic_pattern: impl Into<ArcStr>,
		cache_strategy: CacheStrategy,
	) -> Result<Self, TopicPatternError> {
		let raw = topic_pattern.into();
		let segments: Vec<Substr> =
			raw.split('/').map(|s| raw.substr_from(s)).collect();

		let mut items = Vec::with_capacity(segments.len());
		let mut params: SmallVec<[Substr; 4]> = SmallVec::new();
		let last = segments.len() - 1;
		for (i, segment) in segments.iter().enumerate() {
			let item =
				TopicPatternItem::parse_segment(segment.clone(), raw.as_str())?;
			match &item {
				| TopicPatternItem::MultiLevel if i != last => {
					return Err(TopicPatternError::multi_level_position(
						raw.as_str(),
					));
				}
				| TopicPatternItem::Param(name) => {
					if params.contains(name) {
						return Err(TopicPatternError::duplicated_wildcard(
							raw.as_str(),
							name.as_str(),
						));
					}
					params.push(name.clone());
				}
				| _ => {}
			}
			items.push(item);
		}

		let match_cache = match cache_strategy {
			| CacheStrategy::Lru(cache_size) => {
				Some(Mutex::new(LruCache::new(cache_size)))
			}
			| CacheStrategy::NoCache => None,
		};

		Ok(Self {
			raw,
			segments,
			items,
			params,
			match_cache,
		})
	}

	/// Create new pattern with different cache strategy
	pub fn with_cache_strategy(&self, cache_strategy: CacheStrategy) -> Self {
		let mut pattern = self.clone();
		pattern.match_cache = match cache_strategy {
			| CacheStrategy::Lru(cache_size) => {
				Some(Mutex::new(LruCache::new(cache_size)))
			}
			| CacheStrategy::NoCache => None,
		};
		pattern
	}

	/// Get the cache strategy of this topic pattern.
	pub fn cache_strategy(&self) -> CacheStrategy {
		match self.cache_capacity() {
			| Some(capacity) => CacheStrategy::Lru(capacity),
			| None => CacheStrategy::NoCache,
		}
	}

	fn cache_capacity(&self) -> Option<NonZeroUsize> {
		self.match_cache.as_ref().map(|cache| {
			cache.lock().unwrap_or_else(PoisonError::into_inner).cap()
		})
	}

	/// Returns the pattern exactly as it was written.
	pub fn raw(&self) -> &str {
		&self.raw
	}

	pub fn raw_arcstr(&self) -> ArcStr {
		self.raw.clone()
	}

	/// Returns the `/`-separated segments of the raw pattern.
	pub fn segments(&self) -> impl Iterator<Item = &str> {
		self.segments.iter().map(|s| s.as_str())
	}

	/// Returns named wildcard names in order of appearance.
	pub fn params(&self) -> impl Iterator<Item = &str> {
		self.params.iter().map(|s| s.as_str())
	}

	/// Returns number of named wildcards.
	pub fn param_count(&self) -> usize {
		self.params.len()
	}

	/// Returns iterator over parsed pattern items.
	pub fn iter(&self) -> Iter<TopicPatternItem> {
		self.items.iter()
	}

	/// Returns parsed pattern items as slice.
	pub fn slice(&self) -> &[TopicPatternItem] {
		&self.items
	}

	/// Returns number of segments in pattern.
	pub fn len(&self) -> usize {
		self.items.len()
	}

	/// Always false: splitting yields at least one segment.
	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}

	/// Returns true if pattern ends with the multi-level wildcard.
	pub fn has_multi_level_wildcard(&self) -> bool {
		matches!(self.items.last(), Some(TopicPatternItem::MultiLevel))
	}

	/// Returns true if pattern contains no wildcard at all.
	pub fn is_concrete(&self) -> bool {
		self.items.iter().all(|item| !item.is_wildcard())
	}

	/// Returns the raw pattern when it can be used as a publish destination.
	pub fn as_concrete_topic(&self) -> Option<&str> {
		self.is_concrete().then_some(self.raw.as_str())
	}

	/// Returns true if the concrete topic satisfies this pattern.
	pub fn matches(&self, topic: &str) -> bool {
		self.try_match_internal(Arc::new(TopicPath::new(topic)))
			.is_ok()
	}

	/// Matches a concrete topic string, extracting parameters.
	pub fn try_match_str(
		&self,
		topic: &str,
	) -> Result<Arc<TopicMatch>, TopicMatchError> {
		self.try_match(Arc::new(TopicPath::new(topic)))
	}

	/// Matches topic path against this pattern, extracting parameters.
	pub fn try_match(
		&self,
		topic: Arc<TopicPath>,
	) -> Result<Arc<TopicMatch>, TopicMatchError> {
		match &self.match_cache {
			| Some(cache_mutex) => {
				{
					let mut match_cache = cache_mutex
						.lock()
						.unwrap_or_else(PoisonError::into_inner);
					if let Some(cached_match) = match_cache.get(&topic.path) {
						return Ok(cached_match.clone());
					}
				}

				let topic_match = self.try_match_internal(topic.clone())?;
				let topic_match_arc = Arc::new(topic_match);
				{
					let mut match_cache = cache_mutex
						.lock()
						.unwrap_or_else(PoisonError::into_inner);
					match_cache
						.put(topic.path.clone(), Arc::clone(&topic_match_arc));
				}
				Ok(topic_match_arc)
			}
			| None => {
				let topic_match = self.try_match_internal(topic)?;
				Ok(Arc::new(topic_match))
			}
		}
	}

	fn try_match_internal(
		&self,
		topic: Arc<TopicPath>,
	) -> Result<TopicMatch, TopicMatchError> {
		let mut topic_index = 0;
		let mut params = SmallVec::new();
		for pattern_segment in self.iter() {
			match pattern_segment {
				| TopicPatternItem::Literal(expected) => {
					let Some(found) = topic.segments.get(topic_index) else {
						return Err(TopicMatchError::UnexpectedEndOfTopic);
					};
					if found != expected {
						return Err(TopicMatchError::SegmentMismatch {
							expected: expected.to_string(),
							found: found.to_string(),
							position: topic_index,
						});
					}
					topic_index += 1;
				}
				| TopicPatternItem::Param(name) => {
					let Some(value) = topic.segments.get(topic_index) else {
						return Err(TopicMatchError::UnexpectedEndOfTopic);
					};
					params.push((name.clone(), value.clone()));
					topic_index += 1;
				}
				| TopicPatternItem::MultiLevel => {
					// Parsing guarantees this is the last item.
					return Ok(TopicMatch::from_match_result(topic, params));
				}
			}
		}
		if topic_index < topic.segments.len() {
			return Err(TopicMatchError::UnexpectedEndOfPattern);
		}
		Ok(TopicMatch::from_match_result(topic, params))
	}
}

impl PartialEq for TopicPatternPath {
	fn eq(&self, other: &Self) -> bool {
		self.raw == other.raw
	}
}

impl Eq for TopicPatternPath {}

impl Hash for TopicPatternPath {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.raw.hash(state);
	}
}

impl std::fmt::Display for TopicPatternPath {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.raw)
	}
}

impl FromStr for TopicPatternPath {
	type Err = TopicPatternError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new_from_string(s)
	}
}

impl TryFrom<String> for TopicPatternPath {
	type Error = TopicPatternError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::new_from_string(value)
	}
}

impl TryFrom<&str> for TopicPatternPath {
	type Error = TopicPatternError;

	fn try_from(value: &str) -> Result<Self, Self::Error> {
		Self::new_from_string(value)
	}
}

impl TryFrom<ArcStr> for TopicPatternPath {
	type Error = TopicPatternError;

	fn try_from(value: ArcStr) -> Result<Self, Self::Error> {
		Self::new_from_string(value)
	}
}
