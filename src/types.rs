//! Plan, import and metadata values returned to the host.

use serde::{Deserialize, Serialize};

/// A change to one top-level attribute or block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeChange {
    /// Attribute or block name.
    pub path: String,
    /// Prior value; `None` when the attribute was unset.
    pub before: Option<serde_json::Value>,
    /// Planned value; `None` when the attribute becomes unset.
    pub after: Option<serde_json::Value>,
}

impl AttributeChange {
    /// Build a change from optional before and after values.
    pub fn new(
        path: impl Into<String>,
        before: Option<serde_json::Value>,
        after: Option<serde_json::Value>,
    ) -> Self {
        Self {
            path: path.into(),
            before,
            after,
        }
    }

    /// Create a change for a new attribute.
    pub fn added(path: impl Into<String>, value: serde_json::Value) -> Self {
        Self::new(path, None, Some(value))
    }

    /// Create a change for a removed attribute.
    pub fn removed(path: impl Into<String>, value: serde_json::Value) -> Self {
        Self::new(path, Some(value), None)
    }

    /// Create a change for a modified attribute.
    pub fn modified(
        path: impl Into<String>,
        before: serde_json::Value,
        after: serde_json::Value,
    ) -> Self {
        Self::new(path, Some(before), Some(after))
    }
}

/// The outcome of planning one resource.
///
/// `planned_state` is `Null` for a delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    /// State the host should pass to create or update.
    pub planned_state: serde_json::Value,
    /// Changed attributes, sorted by name.
    pub changes: Vec<AttributeChange>,
    /// A `force_new` attribute changed on an existing resource.
    pub requires_replace: bool,
}

impl PlanResult {
    /// Build a plan result.
    pub fn with_changes(
        planned_state: serde_json::Value,
        changes: Vec<AttributeChange>,
        requires_replace: bool,
    ) -> Self {
        Self {
            planned_state,
            changes,
            requires_replace,
        }
    }

    /// Whether the plan touches the given attribute path.
    pub fn changes_attribute(&self, path: &str) -> bool {
        self.changes.iter().any(|c| c.path == path)
    }
}

/// A resource adopted by import.
///
/// The state only carries the `id`; the host reads the rest afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedResource {
    /// The resource type.
    pub resource_type: String,
    /// The imported state.
    pub state: serde_json::Value,
}

impl ImportedResource {
    /// Create a new imported resource.
    pub fn new(resource_type: impl Into<String>, state: serde_json::Value) -> Self {
        Self {
            resource_type: resource_type.into(),
            state,
        }
    }
}

/// Provider metadata: the names of everything the provider serves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProviderMetadata {
    /// Resource type names.
    pub resources: Vec<String>,
    /// Data source type names.
    pub data_sources: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_attribute_change_constructors() {
        let added = AttributeChange::added("name", json!("proxy-1"));
        assert!(added.before.is_none());
        assert_eq!(added.after, Some(json!("proxy-1")));

        let removed = AttributeChange::removed("description", json!("old"));
        assert_eq!(removed.before, Some(json!("old")));
        assert!(removed.after.is_none());

        let modified = AttributeChange::modified("tls_accept", json!(1), json!(3));
        assert_eq!(modified.before, Some(json!(1)));
        assert_eq!(modified.after, Some(json!(3)));
    }

    #[test]
    fn test_plan_result() {
        let with_changes = PlanResult::with_changes(
            json!({"id": "10", "name": "new"}),
            vec![AttributeChange::modified("name", json!("old"), json!("new"))],
            false,
        );
        assert_eq!(with_changes.changes.len(), 1);
        assert!(with_changes.changes_attribute("name"));
        assert!(!with_changes.changes_attribute("status"));
    }

    #[test]
    fn test_imported_resource() {
        let imported = ImportedResource::new("zabbix_proxy", json!({"id": "10452"}));
        assert_eq!(imported.resource_type, "zabbix_proxy");
        assert_eq!(imported.state["id"], "10452");
    }
}
