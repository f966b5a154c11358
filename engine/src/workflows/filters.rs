// Filter Predicates - Field-level matching of trigger filters against events
//
// The predicate language is intentionally small: regex marker strings,
// boolean/text coercion, and plain equality. Evaluation never raises; a bad
// pattern or an absent field rejects the trigger and the matching pass moves
// on.

use regex::Regex;
use serde_json::Value;
use std::borrow::Cow;
use tracing::{error, warn};

use super::triggers::FilterSpec;

/// Dotted-path lookup on the canonical JSON view of an event.
///
/// Each path segment is a mapping-key lookup on the previous result. A key
/// missing at any depth, or a value of JSON null (indistinguishable from
/// absent to filter authors), resolves to `None`.
pub fn resolve_path(event: &Value, path: &str) -> Option<Value> {
    let mut current = event;
    for part in path.split('.') {
        match current.get(part) {
            Some(value) => current = value,
            None => return None,
        }
    }
    match current {
        Value::Null => None,
        value => Some(value.clone()),
    }
}

/// One predicate: does `filter_value` accept `event_value`?
///
/// A string filter of the form `r"pattern"` is a regex tested against the
/// stringified event value. A boolean filter against a text event value
/// compares with the serialized boolean. Everything else is value equality.
pub fn matches(filter_value: &Value, event_value: &Value) -> bool {
    if let Some(pattern) = regex_marker(filter_value) {
        return regex_matches(pattern, event_value);
    }

    match (filter_value.as_bool(), event_value.as_str()) {
        (Some(flag), Some(text)) => text == flag.to_string(),
        _ => filter_value == event_value,
    }
}

/// Full trigger-level filter evaluation in declaration order.
///
/// Fail-closed: the first absent field or non-accepting predicate rejects the
/// trigger and skips its remaining filters. `exclude` inverts one filter's
/// outcome. An empty filter list always passes.
pub fn evaluate_filters(filters: &[FilterSpec], event: &Value) -> bool {
    for filter in filters {
        let Some(event_value) = resolve_path(event, &filter.key) else {
            warn!(key = %filter.key, "Filter field absent on event, rejecting trigger");
            return false;
        };

        let applied = matches(&filter.value, &event_value);
        if applied && filter.exclude {
            return false;
        }
        if !applied && !filter.exclude {
            return false;
        }
    }
    true
}

fn regex_marker(filter_value: &Value) -> Option<&str> {
    let text = filter_value.as_str()?;
    let inner = text.strip_prefix("r\"")?;
    Some(inner.strip_suffix('"').unwrap_or(inner))
}

fn regex_matches(pattern: &str, event_value: &Value) -> bool {
    let regex = match Regex::new(pattern) {
        Ok(regex) => regex,
        Err(e) => {
            error!(pattern = %pattern, error = %e, "Invalid regex in filter value, treating as non-match");
            return false;
        }
    };
    regex.is_match(&value_as_text(event_value))
}

fn value_as_text(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(text) => Cow::Borrowed(text),
        other => Cow::Owned(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_regex_marker_matches_prefix() {
        assert!(matches(&json!("r\"^prod-\""), &json!("prod-east-1")));
        assert!(!matches(&json!("r\"^prod-\""), &json!("staging-1")));
    }

    #[test]
    fn test_regex_against_non_string_uses_json_text() {
        assert!(matches(&json!("r\"^42$\""), &json!(42)));
        assert!(!matches(&json!("r\"^42$\""), &json!(421)));
    }

    #[test]
    fn test_malformed_regex_is_non_match() {
        assert!(!matches(&json!("r\"[unclosed\""), &json!("anything")));
    }

    #[test]
    fn test_boolean_filter_against_text_value() {
        assert!(matches(&json!(true), &json!("true")));
        assert!(!matches(&json!(true), &json!("false")));
        assert!(matches(&json!(false), &json!("false")));
    }

    #[test]
    fn test_plain_equality() {
        assert!(matches(&json!("critical"), &json!("critical")));
        assert!(!matches(&json!("critical"), &json!("warning")));
        assert!(matches(&json!(5), &json!(5)));
        assert!(matches(&json!(true), &json!(true)));
    }

    #[test]
    fn test_resolve_path_walks_nested_maps() {
        let event = json!({ "labels": { "region": "eu-west-1", "meta": { "team": "sre" } } });
        assert_eq!(resolve_path(&event, "labels.region"), Some(json!("eu-west-1")));
        assert_eq!(resolve_path(&event, "labels.meta.team"), Some(json!("sre")));
        assert_eq!(resolve_path(&event, "labels.zone"), None);
        assert_eq!(resolve_path(&event, "annotations.notes"), None);
    }

    #[test]
    fn test_resolve_path_treats_null_as_absent() {
        let event = json!({ "assignee": null });
        assert_eq!(resolve_path(&event, "assignee"), None);
    }

    #[test]
    fn test_include_filter_keeps_on_match() {
        let filters = vec![FilterSpec::new("severity", "critical")];
        assert!(evaluate_filters(&filters, &json!({ "severity": "critical" })));
        assert!(!evaluate_filters(&filters, &json!({ "severity": "warning" })));
    }

    #[test]
    fn test_exclude_filter_rejects_on_match() {
        let filters = vec![FilterSpec::excluding("environment", "staging")];
        assert!(!evaluate_filters(&filters, &json!({ "environment": "staging" })));
        assert!(evaluate_filters(&filters, &json!({ "environment": "production" })));
    }

    #[test]
    fn test_absent_field_rejects_regardless_of_exclude() {
        let include = vec![FilterSpec::new("service", "api")];
        let exclude = vec![FilterSpec::excluding("service", "api")];
        let event = json!({ "severity": "critical" });
        assert!(!evaluate_filters(&include, &event));
        assert!(!evaluate_filters(&exclude, &event));
    }

    #[test]
    fn test_filters_short_circuit_in_declaration_order() {
        // The absent first field rejects before the second filter could pass.
        let filters = vec![
            FilterSpec::new("missing", "x"),
            FilterSpec::new("severity", "critical"),
        ];
        assert!(!evaluate_filters(&filters, &json!({ "severity": "critical" })));
    }

    #[test]
    fn test_empty_filter_list_passes() {
        assert!(evaluate_filters(&[], &json!({ "anything": 1 })));
    }

    #[test]
    fn test_all_filters_must_hold() {
        let filters = vec![
            FilterSpec::new("severity", "critical"),
            FilterSpec::excluding("environment", "staging"),
        ];
        let good = json!({ "severity": "critical", "environment": "production" });
        let staged = json!({ "severity": "critical", "environment": "staging" });
        assert!(evaluate_filters(&filters, &good));
        assert!(!evaluate_filters(&filters, &staged));
    }
}
