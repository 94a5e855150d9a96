use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::status::StackStatus;

/// Snapshot of a stack as described by CloudFormation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackInfo {
    pub id: String,
    pub name: String,
    pub status: StackStatus,
    pub status_reason: Option<String>,
    pub outputs: BTreeMap<String, String>,
}

impl StackInfo {
    pub fn output_value(&self, key: &str) -> Option<&str> {
        self.outputs.get(key).map(String::as_str)
    }
}

/// A single stack event as recorded by CloudFormation. Immutable once
/// recorded; resource statuses use a wider vocabulary than stack statuses
/// and stay as strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackEvent {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub resource_type: String,
    pub logical_resource_id: String,
    pub resource_status: String,
    pub resource_status_reason: Option<String>,
}

/// A resolved stack resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackResource {
    pub logical_resource_id: String,
    pub physical_resource_id: String,
    pub resource_type: String,
}

/// Everything needed to create or update one stack. The template body is
/// submitted to the provider verbatim.
#[derive(Debug, Clone)]
pub struct StackRequest {
    pub name: String,
    pub template_body: String,
    pub tags: BTreeMap<String, String>,
    pub parameters: BTreeMap<String, String>,
    pub disable_rollback: bool,
}

/// Outcome of a provisioning operation. Non-fatal failures (template
/// rejected, stack not ready, terminal failure status) land here; provider
/// errors propagate as errors instead.
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionResult {
    pub succeeded: bool,
    pub error: Option<String>,
    pub stack: Option<StackInfo>,
}

impl ProvisionResult {
    pub fn success(stack: StackInfo) -> Self {
        Self {
            succeeded: true,
            error: None,
            stack: Some(stack),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            error: Some(error.into()),
            stack: None,
        }
    }
}
