//! Algorithm-retrieval DTOs

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Algorithm definition as stored by the algorithm service
///
/// Only `reducer` is read by the compute node; the rest is written as-is
/// to the workspace for the algorithm runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlgorithmDefinition {
    /// Aggregation method applied to partial results (e.g. "sum")
    pub reducer: String,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

/// Envelope returned by `GET /retrieve/{name}/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrieveAlgorithmResponse {
    pub item: AlgorithmItem,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlgorithmItem {
    pub algorithm: AlgorithmDefinition,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retrieve_envelope_parses() {
        let json = serde_json::json!({
            "item": {
                "algoName": "density",
                "algorithm": {
                    "code": "cHJpbnQoKQ==",
                    "className": "PopulationDensity",
                    "reducer": "sum"
                }
            }
        });

        let response: RetrieveAlgorithmResponse = serde_json::from_value(json).unwrap();
        let algorithm = response.item.algorithm;
        assert_eq!(algorithm.reducer, "sum");
        assert_eq!(algorithm.extra["className"], "PopulationDensity");
    }
}
