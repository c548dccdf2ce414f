//! MQTT topic filter matching.

/// Check whether a concrete topic matches a subscription filter.
///
/// Implements the MQTT wildcard rules: `+` matches exactly one level
/// and `#` matches all remaining levels, including the parent. Topics
/// starting with `$` are never matched by a filter whose first level is
/// a wildcard.
#[must_use]
pub fn topic_matches_filter(filter: &str, topic: &str) -> bool {
    if topic.starts_with('$') && (filter.starts_with('+') || filter.starts_with('#')) {
        return false;
    }
    let mut filter_levels = filter.split('/');
    let mut topic_levels = topic.split('/');
    loop {
        match (filter_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => {}
            (Some(level), Some(part)) if level == part => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}
