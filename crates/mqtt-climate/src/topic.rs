//! MQTT topic validation and filter matching.
//!
//! Publish topics must be concrete; subscribe topics may be filters using the
//! single-level (`+`) and multi-level (`#`) wildcards.

use crate::error::{ClimateError, ClimateResult};

/// Maximum encoded length of an MQTT topic.
pub const MAX_TOPIC_LEN: usize = 65535;

fn validate_common(topic: &str) -> ClimateResult<()> {
    if topic.is_empty() {
        return Err(ClimateError::invalid_topic(topic, "topic must not be empty"));
    }
    if topic.len() > MAX_TOPIC_LEN {
        return Err(ClimateError::invalid_topic(
            topic,
            format!("topic longer than {} bytes", MAX_TOPIC_LEN),
        ));
    }
    if topic.contains('\0') {
        return Err(ClimateError::invalid_topic(topic, "topic contains a NUL character"));
    }
    Ok(())
}

/// Validate a topic used for publishing.
pub fn validate_publish_topic(topic: &str) -> ClimateResult<()> {
    validate_common(topic)?;
    if topic.contains('+') || topic.contains('#') {
        return Err(ClimateError::invalid_topic(
            topic,
            "wildcards are not allowed in publish topics",
        ));
    }
    Ok(())
}

/// Validate a topic filter used for subscribing.
pub fn validate_subscribe_topic(topic: &str) -> ClimateResult<()> {
    validate_common(topic)?;

    let levels: Vec<&str> = topic.split('/').collect();
    let last = levels.len() - 1;
    for (i, level) in levels.iter().enumerate() {
        if level.contains('+') && *level != "+" {
            return Err(ClimateError::invalid_topic(
                topic,
                "'+' must occupy an entire topic level",
            ));
        }
        if level.contains('#') && (*level != "#" || i != last) {
            return Err(ClimateError::invalid_topic(
                topic,
                "'#' must occupy the entire last topic level",
            ));
        }
    }
    Ok(())
}

/// Whether `topic` is matched by the subscription `filter`.
pub fn topic_matches(filter: &str, topic: &str) -> bool {
    let mut filter_levels = filter.split('/');
    let mut topic_levels = topic.split('/');

    // Wildcards at the first level do not match topics starting with '$'.
    if topic.starts_with('$') && (filter.starts_with('+') || filter.starts_with('#')) {
        return false;
    }

    loop {
        match (filter_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => {}
            (Some(f), Some(t)) if f == t => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}
