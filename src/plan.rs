//! Plan computation shared by all resource types.
//!
//! A plan applies schema defaults to the proposed state, carries computed
//! values over from the prior state, and lists the attributes whose values
//! differ.

use serde_json::{Map, Value};

use crate::error::ProviderError;
use crate::resource_data::{ResourceData, ID_KEY};
use crate::schema::Schema;
use crate::types::{AttributeChange, PlanResult};

/// Compute the plan for one resource.
///
/// `prior` is `None` for a create. A null `proposed` state plans a delete.
pub fn plan_resource(
    schema: &Schema,
    prior: Option<&Value>,
    proposed: Value,
) -> Result<PlanResult, ProviderError> {
    let prior = prior.and_then(Value::as_object);

    if proposed.is_null() {
        let changes = match prior {
            Some(prior) => sorted_keys(prior)
                .into_iter()
                .filter_map(|key| {
                    let before = prior.get(key).filter(|v| !v.is_null())?;
                    Some(AttributeChange::removed(key.as_str(), before.clone()))
                })
                .collect(),
            None => Vec::new(),
        };
        return Ok(PlanResult::with_changes(Value::Null, changes, false));
    }

    let mut planned = ResourceData::new(schema, proposed)?;

    if let Some(prior) = prior {
        if let Some(id) = prior.get(ID_KEY).filter(|v| !v.is_null()) {
            planned.set(ID_KEY, id.clone());
        }
        for (name, attr) in &schema.block.attributes {
            if attr.flags.computed {
                carry_prior(&mut planned, prior, name);
            }
        }
        for (name, nested) in &schema.block.blocks {
            if nested.computed {
                carry_prior(&mut planned, prior, name);
            }
        }
    }

    let mut names: Vec<&String> = schema
        .block
        .attributes
        .keys()
        .chain(schema.block.blocks.keys())
        .collect();
    names.sort();

    let mut changes = Vec::new();
    let mut requires_replace = false;
    for name in names {
        let before = prior.and_then(|p| p.get(name.as_str())).filter(|v| !v.is_null());
        let after = planned.get(name).filter(|v| !v.is_null());
        let change = match (before, after) {
            (None, Some(after)) => AttributeChange::added(name.as_str(), after.clone()),
            (Some(before), None) => AttributeChange::removed(name.as_str(), before.clone()),
            (Some(before), Some(after)) if before != after => {
                AttributeChange::modified(name.as_str(), before.clone(), after.clone())
            },
            _ => continue,
        };
        if prior.is_some() && schema.attribute(name).map_or(false, |a| a.force_new) {
            requires_replace = true;
        }
        changes.push(change);
    }

    Ok(PlanResult::with_changes(
        planned.into_state(),
        changes,
        requires_replace,
    ))
}

fn carry_prior(planned: &mut ResourceData, prior: &Map<String, Value>, name: &str) {
    if planned.get(name).map_or(true, Value::is_null) {
        if let Some(value) = prior.get(name).filter(|v| !v.is_null()) {
            planned.set(name, value.clone());
        }
    }
}

fn sorted_keys(map: &Map<String, Value>) -> Vec<&String> {
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort();
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, AttributeFlags, AttributeType, Block, NestedBlock};
    use serde_json::json;

    fn schema() -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("name", Attribute::required_string())
            .with_attribute("status", Attribute::optional_int64().with_default(json!(0)))
            .with_attribute(
                "groups",
                Attribute::new(
                    AttributeType::set(AttributeType::String),
                    AttributeFlags::optional_computed(),
                ),
            )
            .with_block(
                "host_permission",
                NestedBlock::list(Block::new().with_attribute("id", Attribute::required_string()))
                    .computed(),
            )
    }

    #[test]
    fn test_plan_create_applies_defaults() {
        let plan = plan_resource(&schema(), None, json!({"name": "Operators"})).unwrap();

        assert_eq!(plan.planned_state["status"], 0);
        assert!(plan.changes_attribute("name"));
        assert!(plan.changes_attribute("status"));
        assert!(!plan.changes_attribute("id"));
        assert!(!plan.requires_replace);
    }

    #[test]
    fn test_plan_update_carries_computed_values() {
        let prior = json!({
            "id": "15",
            "name": "Operators",
            "status": 0,
            "groups": ["7"],
            "host_permission": [{"id": "2"}]
        });
        let plan = plan_resource(&schema(), Some(&prior), json!({"name": "Operators"})).unwrap();

        assert!(plan.changes.is_empty(), "{:?}", plan.changes);
        assert_eq!(plan.planned_state["id"], "15");
        assert_eq!(plan.planned_state["groups"], json!(["7"]));
        assert_eq!(plan.planned_state["host_permission"], json!([{"id": "2"}]));
    }

    #[test]
    fn test_plan_update_lists_changes() {
        let prior = json!({"id": "15", "name": "Operators", "status": 0});
        let plan = plan_resource(
            &schema(),
            Some(&prior),
            json!({"name": "Operators", "status": 1}),
        )
        .unwrap();

        assert_eq!(
            plan.changes,
            vec![AttributeChange::modified("status", json!(0), json!(1))]
        );
    }

    #[test]
    fn test_plan_force_new_requires_replace() {
        let schema = Schema::v0().with_attribute(
            "username",
            Attribute::required_string().with_force_new(),
        );
        let prior = json!({"id": "3", "username": "old"});
        let plan = plan_resource(&schema, Some(&prior), json!({"username": "new"})).unwrap();
        assert!(plan.requires_replace);

        let plan = plan_resource(&schema, None, json!({"username": "new"})).unwrap();
        assert!(!plan.requires_replace);
    }

    #[test]
    fn test_plan_delete() {
        let prior = json!({"id": "15", "name": "Operators", "groups": null});
        let plan = plan_resource(&schema(), Some(&prior), Value::Null).unwrap();

        assert!(plan.planned_state.is_null());
        assert_eq!(
            plan.changes,
            vec![
                AttributeChange::removed("id", json!("15")),
                AttributeChange::removed("name", json!("Operators")),
            ]
        );
    }
}
