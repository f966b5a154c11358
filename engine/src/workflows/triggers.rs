// Workflow Triggers - Trigger declarations and the event payloads they match

use serde::{Deserialize, Serialize};
use serde_json::Value;
use vigil_shared::{Alert, Incident};

use super::filters::resolve_path;

/// Kinds of events that can trigger workflows
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    Alert,
    Incident,
    Manual,
    Interval,
    UserAssigned,
}

impl TriggerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerKind::Alert => "alert",
            TriggerKind::Incident => "incident",
            TriggerKind::Manual => "manual",
            TriggerKind::Interval => "interval",
            TriggerKind::UserAssigned => "user_assigned",
        }
    }
}

/// One field-level predicate inside a trigger declaration.
///
/// `value` is either a literal to compare against or a regex marker string
/// (`r"pattern"`). `exclude` inverts the outcome: a matching filter rejects
/// the trigger instead of keeping it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FilterSpec {
    pub key: String,
    pub value: Value,
    #[serde(default)]
    pub exclude: bool,
}

impl FilterSpec {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            exclude: false,
        }
    }

    /// A filter that rejects the trigger when the predicate matches.
    pub fn excluding(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            exclude: true,
        }
    }
}

/// A declared condition set on a workflow: event kind, the incident
/// transitions it subscribes to, and an ordered filter list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TriggerSpec {
    pub kind: TriggerKind,
    /// Incident lifecycle transitions this trigger subscribes to. Only read
    /// for incident-kind triggers.
    #[serde(default)]
    pub events: Vec<String>,
    #[serde(default)]
    pub filters: Vec<FilterSpec>,
    /// Re-run period in seconds. Only read for interval-kind triggers.
    #[serde(default)]
    pub interval: Option<u64>,
}

impl TriggerSpec {
    pub fn new(kind: TriggerKind) -> Self {
        Self {
            kind,
            events: Vec::new(),
            filters: Vec::new(),
            interval: None,
        }
    }

    pub fn alert() -> Self {
        Self::new(TriggerKind::Alert)
    }

    pub fn incident(events: &[&str]) -> Self {
        let mut spec = Self::new(TriggerKind::Incident);
        spec.events = events.iter().map(|e| e.to_string()).collect();
        spec
    }

    pub fn manual() -> Self {
        Self::new(TriggerKind::Manual)
    }

    pub fn user_assigned() -> Self {
        Self::new(TriggerKind::UserAssigned)
    }

    pub fn interval(seconds: u64) -> Self {
        let mut spec = Self::new(TriggerKind::Interval);
        spec.interval = Some(seconds);
        spec
    }

    pub fn with_filter(mut self, filter: FilterSpec) -> Self {
        self.filters.push(filter);
        self
    }
}

/// The payload shapes the engine evaluates triggers against.
///
/// Each producer hands the matcher one of these; dotted-path field lookup
/// goes through one canonical JSON view so alert fields, incident fields,
/// enrichment overrides, and mapping keys all resolve the same way.
#[derive(Debug, Clone)]
pub enum EventPayload {
    Alert(Alert),
    Incident {
        incident: Incident,
        /// Externally stored overrides, merged over the incident's own
        /// fields in the canonical view.
        enrichment: serde_json::Map<String, Value>,
    },
    Mapping(serde_json::Map<String, Value>),
}

impl EventPayload {
    pub fn alert(alert: Alert) -> Self {
        EventPayload::Alert(alert)
    }

    pub fn incident(incident: Incident) -> Self {
        EventPayload::Incident {
            incident,
            enrichment: serde_json::Map::new(),
        }
    }

    pub fn enriched_incident(
        incident: Incident,
        enrichment: serde_json::Map<String, Value>,
    ) -> Self {
        EventPayload::Incident {
            incident,
            enrichment,
        }
    }

    pub fn mapping(map: serde_json::Map<String, Value>) -> Self {
        EventPayload::Mapping(map)
    }

    /// Canonical JSON view of this payload. Enrichment keys overwrite
    /// incident fields of the same name.
    pub fn to_value(&self) -> Value {
        match self {
            EventPayload::Alert(alert) => serde_json::to_value(alert).unwrap_or(Value::Null),
            EventPayload::Incident {
                incident,
                enrichment,
            } => {
                let mut value = serde_json::to_value(incident).unwrap_or(Value::Null);
                if let Value::Object(fields) = &mut value {
                    for (key, enriched) in enrichment {
                        fields.insert(key.clone(), enriched.clone());
                    }
                }
                value
            }
            EventPayload::Mapping(map) => Value::Object(map.clone()),
        }
    }

    /// Uniform dotted-path field lookup; absent at any depth yields `None`.
    pub fn field(&self, path: &str) -> Option<Value> {
        resolve_path(&self.to_value(), path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vigil_shared::AlertSeverity;

    #[test]
    fn test_trigger_spec_deserializes_with_defaults() {
        let spec: TriggerSpec = serde_json::from_value(json!({ "kind": "alert" })).unwrap();
        assert_eq!(spec.kind, TriggerKind::Alert);
        assert!(spec.events.is_empty());
        assert!(spec.filters.is_empty());
        assert!(spec.interval.is_none());

        let filter: FilterSpec =
            serde_json::from_value(json!({ "key": "severity", "value": "critical" })).unwrap();
        assert!(!filter.exclude);
    }

    #[test]
    fn test_trigger_kind_strings() {
        assert_eq!(TriggerKind::UserAssigned.as_str(), "user_assigned");
        assert_eq!(TriggerKind::Incident.as_str(), "incident");
    }

    #[test]
    fn test_alert_payload_field_lookup() {
        let alert = Alert::new("fp-1", "High CPU")
            .with_severity(AlertSeverity::Critical)
            .with_label("region", json!("eu-west-1"));
        let payload = EventPayload::alert(alert);

        assert_eq!(payload.field("severity"), Some(json!("critical")));
        assert_eq!(payload.field("labels.region"), Some(json!("eu-west-1")));
        assert_eq!(payload.field("labels.missing"), None);
    }

    #[test]
    fn test_enrichment_overrides_incident_fields() {
        let incident = Incident::new("Checkout latency");
        let mut enrichment = serde_json::Map::new();
        enrichment.insert("status".to_string(), json!("resolved"));
        enrichment.insert("runbook".to_string(), json!("https://wiki/runbooks/1"));

        let payload = EventPayload::enriched_incident(incident, enrichment);
        assert_eq!(payload.field("status"), Some(json!("resolved")));
        assert_eq!(payload.field("runbook"), Some(json!("https://wiki/runbooks/1")));
    }
}
