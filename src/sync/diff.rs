//! Structural diff between stored endpoints and a remote operation list.
//!
//! Matching is exact on (method, path). A renamed path shows up as one
//! removal plus one addition.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::model::{Endpoint, HttpMethod, NormalizedOperation};

/// What an import would do to a contract's endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diff {
    /// Remote operations with no stored counterpart, in document order.
    pub added: Vec<NormalizedOperation>,
    /// Stored endpoints the document no longer declares, in store order.
    pub removed: Vec<Endpoint>,
    /// Matched pairs whose description or deprecation differ, in store order.
    pub changed: Vec<ChangedEndpoint>,
}

impl Diff {
    /// True when applying this diff would touch nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

/// A stored endpoint paired with the remote operation that replaces its fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangedEndpoint {
    pub current: Endpoint,
    pub proposed: NormalizedOperation,
    /// e.g. `Changed: description, deprecated`
    pub change_description: String,
}

/// Compute the diff of `current` against `remote`.
///
/// Pure: the same inputs always give the same output. When the remote list
/// repeats a (method, path) key only the first occurrence counts.
#[must_use]
pub fn diff(current: &[Endpoint], remote: &[NormalizedOperation]) -> Diff {
    let stored: HashSet<(HttpMethod, &str)> = current.iter().map(Endpoint::key).collect();

    let mut proposed: HashMap<(HttpMethod, &str), &NormalizedOperation> = HashMap::new();
    let mut added = Vec::new();
    for operation in remote {
        if proposed.contains_key(&operation.key()) {
            continue;
        }
        proposed.insert(operation.key(), operation);
        if !stored.contains(&operation.key()) {
            added.push(operation.clone());
        }
    }

    let mut removed = Vec::new();
    let mut changed = Vec::new();
    for endpoint in current {
        match proposed.get(&endpoint.key()) {
            None => removed.push(endpoint.clone()),
            Some(operation) => {
                if let Some(change_description) = describe_change(endpoint, operation) {
                    changed.push(ChangedEndpoint {
                        current: endpoint.clone(),
                        proposed: (*operation).clone(),
                        change_description,
                    });
                }
            }
        }
    }

    Diff {
        added,
        removed,
        changed,
    }
}

fn describe_change(endpoint: &Endpoint, operation: &NormalizedOperation) -> Option<String> {
    let mut fields = Vec::new();
    if endpoint.description != operation.description {
        fields.push("description");
    }
    if endpoint.deprecated != operation.deprecated {
        fields.push("deprecated");
    }

    if fields.is_empty() {
        None
    } else {
        Some(format!("Changed: {}", fields.join(", ")))
    }
}
