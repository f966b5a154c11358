use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Firing,
    Resolved,
    Acknowledged,
    Suppressed,
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Critical,
    High,
    Warning,
    Info,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub fingerprint: String,
    pub name: String,
    pub status: AlertStatus,
    pub severity: AlertSeverity,
    pub environment: String,
    pub service: Option<String>,
    pub source: Vec<String>,
    pub message: Option<String>,
    pub url: Option<String>,
    pub labels: HashMap<String, serde_json::Value>,
    pub received_at: DateTime<Utc>,
}

impl Alert {
    pub fn new(fingerprint: impl Into<String>, name: impl Into<String>) -> Self {
        let fingerprint = fingerprint.into();
        Self {
            id: fingerprint.clone(),
            fingerprint,
            name: name.into(),
            status: AlertStatus::Firing,
            severity: AlertSeverity::Warning,
            environment: "undefined".to_string(),
            service: None,
            source: Vec::new(),
            message: None,
            url: None,
            labels: HashMap::new(),
            received_at: Utc::now(),
        }
    }

    pub fn with_status(mut self, status: AlertStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_severity(mut self, severity: AlertSeverity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source.push(source.into());
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.labels.insert(key.into(), value);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncidentStatus {
    Firing,
    Acknowledged,
    Resolved,
    Merged,
    Deleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncidentSeverity {
    Critical,
    High,
    Warning,
    Info,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    pub id: Uuid,
    pub name: String,
    pub summary: Option<String>,
    pub status: IncidentStatus,
    pub severity: IncidentSeverity,
    pub assignee: Option<String>,
    pub services: Vec<String>,
    pub alert_count: u32,
    pub is_candidate: bool, // AI-suggested incidents awaiting confirmation
    pub created_at: DateTime<Utc>,
}

impl Incident {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            summary: None,
            status: IncidentStatus::Firing,
            severity: IncidentSeverity::Warning,
            assignee: None,
            services: Vec::new(),
            alert_count: 0,
            is_candidate: false,
            created_at: Utc::now(),
        }
    }

    pub fn with_status(mut self, status: IncidentStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_severity(mut self, severity: IncidentSeverity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_assignee(mut self, assignee: impl Into<String>) -> Self {
        self.assignee = Some(assignee.into());
        self
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.services.push(service.into());
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_alert_count(mut self, alert_count: u32) -> Self {
        self.alert_count = alert_count;
        self
    }
}

#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentMention {
    pub id: Uuid,
    pub tenant_id: String,
    pub incident_id: Uuid,
    pub comment_id: Uuid,
    pub user_id: String,
    pub mentioned_by: String,
    pub created_at: DateTime<Utc>,
}

impl CommentMention {
    pub fn new(
        tenant_id: impl Into<String>,
        incident_id: Uuid,
        comment_id: Uuid,
        user_id: impl Into<String>,
        mentioned_by: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.into(),
            incident_id,
            comment_id,
            user_id: user_id.into(),
            mentioned_by: mentioned_by.into(),
            created_at: Utc::now(),
        }
    }
}
