use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    domain::ControlId,
    error::{ApiException, ErrorCode},
};

pub const TRACK_EVENT_ROUTE: &str = "/track_event";

pub const REFINEMENT_APPLIED: &str = "refinement_applied";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackEvent {
    pub event_type: String,
    pub control_id: ControlId,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl TrackEvent {
    // Details named like the core fields are dropped.
    pub fn new(
        event_type: impl Into<String>,
        control_id: ControlId,
        mut details: Map<String, Value>,
    ) -> Self {
        details.remove("event_type");
        details.remove("control_id");
        Self {
            event_type: event_type.into(),
            control_id,
            details,
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if key != "event_type" && key != "control_id" {
            self.details.insert(key, value.into());
        }
        self
    }

    pub fn validate(&self) -> Result<(), ApiException> {
        if self.event_type.trim().is_empty() {
            return Err(ApiException::new(
                ErrorCode::Validation,
                "event_type must not be blank",
            ));
        }
        if self.control_id.as_str().trim().is_empty() {
            return Err(ApiException::new(
                ErrorCode::Validation,
                "control_id must not be blank",
            ));
        }
        Ok(())
    }
}
