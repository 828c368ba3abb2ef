//! Breaking change classification.

use super::diff::Diff;
use crate::model::{BreakingChange, BreakingChangeType};

/// Details attached to every removed-endpoint breaking change.
pub const REMOVED_ENDPOINT_DETAILS: &str = "Endpoint removed from OpenAPI spec";

/// Breaking changes implied by a diff.
///
/// Every removed endpoint is breaking, whatever the sync mode: consumers
/// lose the operation in the published contract even if a MERGE keeps the
/// stored row. Additions and field changes never are.
#[must_use]
pub fn classify(diff: &Diff) -> Vec<BreakingChange> {
    diff.removed
        .iter()
        .map(|endpoint| BreakingChange {
            change_type: BreakingChangeType::RemovedEndpoint,
            method: endpoint.method,
            path: endpoint.path.clone(),
            details: Some(REMOVED_ENDPOINT_DETAILS.to_string()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Endpoint, HttpMethod, NormalizedOperation};
    use crate::sync::diff::diff;

    #[test]
    fn test_one_breaking_change_per_removal() {
        let current = vec![
            Endpoint {
                id: "ep_1".into(),
                method: HttpMethod::Get,
                path: "/users".into(),
                description: None,
                deprecated: false,
                created_at: 0,
            },
            Endpoint {
                id: "ep_2".into(),
                method: HttpMethod::Delete,
                path: "/users/{id}".into(),
                description: None,
                deprecated: false,
                created_at: 0,
            },
        ];
        let remote = vec![
            NormalizedOperation::new(HttpMethod::Get, "/users").deprecated(),
            NormalizedOperation::new(HttpMethod::Post, "/users"),
        ];

        let changes = classify(&diff(&current, &remote));
        assert_eq!(
            changes,
            vec![BreakingChange {
                change_type: BreakingChangeType::RemovedEndpoint,
                method: HttpMethod::Delete,
                path: "/users/{id}".into(),
                details: Some(REMOVED_ENDPOINT_DETAILS.into()),
            }]
        );
    }

    #[test]
    fn test_no_removals_no_breaks() {
        assert!(classify(&Diff::default()).is_empty());
    }
}
