//! Aggregation service DTOs

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Body of the `start` event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartAggregation {
    pub aggregation_method: String,
    pub key_selector: Option<JsonValue>,
}

/// Lifecycle events understood by the aggregation service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationEvent {
    Start,
    Update,
    Finish,
    Cancel,
}

impl AggregationEvent {
    /// Path segment of the event URL
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationEvent::Start => "start",
            AggregationEvent::Update => "update",
            AggregationEvent::Finish => "finish",
            AggregationEvent::Cancel => "cancel",
        }
    }
}

impl std::fmt::Display for AggregationEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
