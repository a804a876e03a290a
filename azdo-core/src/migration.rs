//! Persisted state upgrades
//!
//! Each step is a pure rewrite of the stored JSON object from one schema
//! version to the next.

use crate::error::{DefinitionError, Result};
use serde_json::{Value, json};

/// Current schema version of the build definition resource
pub const BUILD_DEFINITION_SCHEMA_VERSION: u32 = 1;

const SKIP_FIRST_RUN: &str = "skip_first_run";

/// Build definition v0 → v1
///
/// Inserts `skip_first_run = "true"` when the key is absent. Nothing else
/// in the state changes.
pub fn upgrade_build_definition_v0_to_v1(state: Value) -> Result<Value> {
    let Value::Object(mut state) = state else {
        return Err(DefinitionError::Migration(format!(
            "build definition state must be an object, got {}",
            type_name(&state)
        )));
    };

    state
        .entry(SKIP_FIRST_RUN)
        .or_insert_with(|| json!("true"));

    Ok(Value::Object(state))
}

/// Run every step from `from_version` up to the current version
pub fn upgrade_build_definition(state: Value, from_version: u32) -> Result<Value> {
    match from_version {
        0 => upgrade_build_definition_v0_to_v1(state),
        BUILD_DEFINITION_SCHEMA_VERSION => Ok(state),
        other => Err(DefinitionError::Migration(format!(
            "unknown build definition schema version {}",
            other
        ))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::build::BuildDefinitionModel;

    #[test]
    fn test_inserts_default_when_absent() {
        let upgraded = upgrade_build_definition_v0_to_v1(json!({"name": "ci"})).unwrap();
        assert_eq!(upgraded, json!({"name": "ci", "skip_first_run": "true"}));
    }

    #[test]
    fn test_existing_value_is_kept() {
        let state = json!({"name": "ci", "skip_first_run": "false", "features": [{"skip_first_run": false}]});
        let upgraded = upgrade_build_definition_v0_to_v1(state.clone()).unwrap();
        assert_eq!(upgraded, state);
    }

    #[test]
    fn test_is_deterministic() {
        let state = json!({"name": "ci", "path": "\\"});
        let once = upgrade_build_definition_v0_to_v1(state.clone()).unwrap();
        let twice = upgrade_build_definition_v0_to_v1(once.clone()).unwrap();
        assert_eq!(once, twice);
        assert_eq!(once, upgrade_build_definition_v0_to_v1(state).unwrap());
    }

    #[test]
    fn test_rejects_non_object() {
        let err = upgrade_build_definition_v0_to_v1(json!(["not", "state"])).unwrap_err();
        assert!(matches!(err, DefinitionError::Migration(_)));
    }

    #[test]
    fn test_upgraded_state_loads_as_model() {
        let state = json!({"project_id": "proj", "name": "ci"});
        let upgraded = upgrade_build_definition(state, 0).unwrap();
        assert_eq!(upgraded["skip_first_run"], "true");
        let model: BuildDefinitionModel = serde_json::from_value(upgraded).unwrap();
        assert!(model.skip_first_run());
    }

    #[test]
    fn test_unknown_version() {
        assert!(upgrade_build_definition(json!({}), 5).is_err());
        assert_eq!(upgrade_build_definition(json!({"a": 1}), 1).unwrap(), json!({"a": 1}));
    }
}
