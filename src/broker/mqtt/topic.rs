//! Translation between topic patterns and MQTT topic filters.

use crate::broker::BrokerError;
use crate::topic::{TopicPatternItem, TopicPatternPath};

const MAX_TOPIC_LEN: usize = 65535;

fn check_literal(raw: &str, literal: &str) -> Result<(), BrokerError> {
	if literal.chars().any(|c| matches!(c, '+' | '#' | '*' | '\0')) {
		return Err(BrokerError::unsupported_topic(
			raw,
			"literal segment contains a wildcard character or null byte",
		));
	}
	Ok(())
}

fn check_length(raw: &str) -> Result<(), BrokerError> {
	if raw.is_empty() || raw.len() > MAX_TOPIC_LEN {
		return Err(BrokerError::unsupported_topic(
			raw,
			"topic is empty or too long",
		));
	}
	Ok(())
}

/// Converts a pattern into an MQTT subscription filter.
///
/// `{name}` becomes `+` and the trailing `*` becomes `#`, so `foo/*` also
/// receives messages published to `foo` itself.
pub fn to_mqtt_filter(
	pattern: &TopicPatternPath,
) -> Result<String, BrokerError> {
	check_length(pattern.raw())?;
	let mut levels = Vec::with_capacity(pattern.len());
	for item in pattern.iter() {
		match item {
			| TopicPatternItem::Literal(literal) => {
				check_literal(pattern.raw(), literal)?;
				levels.push(literal.as_str());
			}
			| TopicPatternItem::Param(_) => levels.push("+"),
			| TopicPatternItem::MultiLevel => levels.push("#"),
		}
	}
	Ok(levels.join("/"))
}

/// Checks that `topic` is a valid MQTT publish destination.
pub fn validate_publish_topic(topic: &str) -> Result<(), BrokerError> {
	check_length(topic)?;
	check_literal(topic, topic)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn filter(raw: &str) -> Result<String, BrokerError> {
		to_mqtt_filter(&TopicPatternPath::new_from_string(raw).unwrap())
	}

	#[test]
	fn test_wildcards_are_translated() {
		assert_eq!(filter("foo/{id}/bar").unwrap(), "foo/+/bar");
		assert_eq!(filter("foo/{id}/*").unwrap(), "foo/+/#");
		assert_eq!(filter("*").unwrap(), "#");
		assert_eq!(filter("a//b").unwrap(), "a//b");
		assert_eq!(filter("/{ x }").unwrap(), "/+");
	}

	#[test]
	fn test_mqtt_wildcards_in_literals_are_rejected() {
		for raw in ["foo/+", "foo/#", "a/b*c", ""] {
			assert!(
				matches!(
					filter(raw),
					Err(BrokerError::UnsupportedTopic { .. })
				),
				"{raw:?} should be rejected"
			);
		}
	}

	#[test]
	fn test_publish_topic() {
		assert!(validate_publish_topic("foo/42").is_ok());
		assert!(validate_publish_topic("foo/+").is_err());
		assert!(validate_publish_topic("").is_err());
	}
}
