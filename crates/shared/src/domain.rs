use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ControlId(pub String);

impl ControlId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ControlId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ControlId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ControlId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkspaceStatus {
    Pristine,
    InProgress,
}

impl fmt::Display for WorkspaceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkspaceStatus::Pristine => f.write_str("pristine"),
            WorkspaceStatus::InProgress => f.write_str("in-progress"),
        }
    }
}

// Status only moves forward; a record returns to pristine only by being
// deleted and seeded again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceRecord {
    control_id: ControlId,
    last_modified: DateTime<Utc>,
    status: WorkspaceStatus,
    workspace_html: String,
    initial_generation_html: String,
    #[serde(default)]
    last_quality_check: Option<Value>,
    #[serde(default)]
    last_refinements: Vec<Value>,
}

impl WorkspaceRecord {
    pub fn seeded(control_id: ControlId, initial_html: impl Into<String>) -> Self {
        let initial_html = initial_html.into();
        Self {
            control_id,
            last_modified: Utc::now(),
            status: WorkspaceStatus::Pristine,
            workspace_html: initial_html.clone(),
            initial_generation_html: initial_html,
            last_quality_check: None,
            last_refinements: Vec::new(),
        }
    }

    pub fn control_id(&self) -> &ControlId {
        &self.control_id
    }

    pub fn status(&self) -> WorkspaceStatus {
        self.status
    }

    pub fn initial_generation_html(&self) -> &str {
        &self.initial_generation_html
    }

    pub fn workspace_html(&self) -> &str {
        &self.workspace_html
    }

    pub fn last_modified(&self) -> DateTime<Utc> {
        self.last_modified
    }

    pub fn last_quality_check(&self) -> Option<&Value> {
        self.last_quality_check.as_ref()
    }

    pub fn last_refinements(&self) -> &[Value] {
        &self.last_refinements
    }

    pub fn touch(&mut self, at: DateTime<Utc>) {
        self.last_modified = at;
    }

    pub fn apply_edit(&mut self, html: impl Into<String>) {
        self.status = WorkspaceStatus::InProgress;
        self.workspace_html = html.into();
    }

    pub fn record_quality_check(&mut self, quality_check: Value) {
        self.last_quality_check = Some(quality_check);
    }

    pub fn append_refinement(&mut self, refinement: Value) {
        self.last_refinements.push(refinement);
    }
}
