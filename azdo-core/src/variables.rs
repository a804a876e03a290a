//! Definition variables and variable groups

use crate::error::{ValidationError, ValidationKind};
use crate::prior::PriorState;
use crate::wire::VariableValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A named variable on a build definition, release definition or stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub secret_value: String,
    #[serde(default)]
    pub is_secret: bool,
    #[serde(default = "default_allow_override")]
    pub allow_override: bool,
}

fn default_allow_override() -> bool {
    true
}

impl Variable {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            secret_value: String::new(),
            is_secret: false,
            allow_override: true,
        }
    }

    pub fn secret(name: impl Into<String>, secret_value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: String::new(),
            secret_value: secret_value.into(),
            is_secret: true,
            allow_override: true,
        }
    }
}

/// Check variable names are unique
pub fn validate_variables(field: &str, variables: &[Variable]) -> Result<(), ValidationError> {
    let mut seen = std::collections::HashSet::new();
    for variable in variables {
        if !seen.insert(variable.name.as_str()) {
            return Err(ValidationError::new(
                ValidationKind::DuplicateVariableName,
                field,
                format!(
                    "Unexpectedly found duplicate variable with name {}",
                    variable.name
                ),
            ));
        }
    }
    Ok(())
}

/// Build the wire variable map
///
/// Secrets carry their `secret_value`; the plain `value` of a secret is ignored.
pub fn expand_variables(
    field: &str,
    variables: &[Variable],
) -> Result<BTreeMap<String, VariableValue>, ValidationError> {
    validate_variables(field, variables)?;

    Ok(variables
        .iter()
        .map(|variable| {
            let value = if variable.is_secret {
                variable.secret_value.clone()
            } else {
                variable.value.clone()
            };
            (
                variable.name.clone(),
                VariableValue {
                    value: Some(value),
                    is_secret: Some(variable.is_secret),
                    allow_override: Some(variable.allow_override),
                },
            )
        })
        .collect())
}

/// Rebuild variables from the wire map, ordered by name
///
/// The service never echoes secret values. For secrets the `secret_value` is
/// taken from the prior entry with the same name under `field`, or left empty.
pub fn flatten_variables(
    field: &str,
    variables: Option<&BTreeMap<String, VariableValue>>,
    prior: &dyn PriorState,
) -> Vec<Variable> {
    let Some(variables) = variables else {
        return Vec::new();
    };

    variables
        .iter()
        .map(|(name, wire)| {
            let is_secret = wire.is_secret.unwrap_or(false);
            let allow_override = wire.allow_override.unwrap_or(false);
            if is_secret {
                let secret_value = prior
                    .find_entry(field, "name", name)
                    .and_then(|entry| {
                        entry
                            .get("secret_value")
                            .and_then(|v| v.as_str())
                            .map(str::to_string)
                    })
                    .unwrap_or_default();
                Variable {
                    name: name.clone(),
                    value: String::new(),
                    secret_value,
                    is_secret,
                    allow_override,
                }
            } else {
                Variable {
                    name: name.clone(),
                    value: wire.value.clone().unwrap_or_default(),
                    secret_value: String::new(),
                    is_secret,
                    allow_override,
                }
            }
        })
        .collect()
}

/// Variable group ids as a sorted, deduplicated set
pub fn normalize_group_ids(ids: &[i32]) -> Vec<i32> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prior::NoPriorState;
    use serde_json::json;

    #[test]
    fn test_duplicate_variable_is_rejected() {
        let variables = vec![
            Variable::new("var-name", "a"),
            Variable::new("var-name", "b"),
        ];
        let err = expand_variables("variable", &variables).unwrap_err();
        assert_eq!(err.kind, ValidationKind::DuplicateVariableName);
        assert!(err.message.contains("duplicate variable with name"));
        assert!(err.message.contains("var-name"));
    }

    #[test]
    fn test_secret_uses_secret_value() {
        let mut variable = Variable::secret("token", "hunter2");
        variable.value = "ignored".to_string();
        let expanded = expand_variables("variable", &[variable]).unwrap();
        assert_eq!(expanded["token"].value.as_deref(), Some("hunter2"));
        assert_eq!(expanded["token"].is_secret, Some(true));
    }

    #[test]
    fn test_flatten_recovers_secret_from_prior_state() {
        let wire = expand_variables(
            "variable",
            &[Variable::secret("token", "hunter2"), Variable::new("plain", "x")],
        )
        .unwrap();
        let mut redacted = wire.clone();
        redacted.get_mut("token").unwrap().value = None;

        let prior = json!({"variable": [{"name": "token", "secret_value": "hunter2"}]});
        let flattened = flatten_variables("variable", Some(&redacted), &prior);
        assert_eq!(flattened[0].name, "plain");
        assert_eq!(flattened[1].secret_value, "hunter2");
        assert_eq!(flattened[1].value, "");

        let flattened = flatten_variables("variable", Some(&redacted), &NoPriorState);
        assert_eq!(flattened[1].secret_value, "");
    }

    #[test]
    fn test_round_trip_sorted_by_name() {
        let variables = vec![Variable::new("a", "1"), Variable::new("b", "2")];
        let wire = expand_variables("variable", &variables).unwrap();
        assert_eq!(
            flatten_variables("variable", Some(&wire), &NoPriorState),
            variables
        );
    }

    #[test]
    fn test_normalize_group_ids() {
        assert_eq!(normalize_group_ids(&[3, 1, 3, 2]), vec![1, 2, 3]);
    }
}
