//! Typed property bags
//!
//! The release service stores definition and stage properties as
//! `{"$type": "System.String", "$value": "..."}` entries. Everything is
//! written as a string; on read booleans may come back typed.

use crate::convert::parse_bool;
use crate::domain::release::{
    DEFAULT_CREATION_SOURCE, EnvironmentType, ReleaseProperties, StageProperties,
};
use serde_json::{Map, Value, json};

const DEFINITION_CREATION_SOURCE: &str = "DefinitionCreationSource";
const INTEGRATE_JIRA_WORK_ITEMS: &str = "IntegrateJiraWorkItems";
const INTEGRATE_BOARDS_WORK_ITEMS: &str = "IntegrateBoardsWorkItems";
const JIRA_SERVICE_ENDPOINT_ID: &str = "JiraServiceEndpointId";

const BOARDS_ENVIRONMENT_TYPE: &str = "BoardsEnvironmentType";
const LINK_BOARDS_WORK_ITEMS: &str = "LinkBoardsWorkItems";
const JIRA_ENVIRONMENT_TYPE: &str = "JiraEnvironmentType";
const LINK_JIRA_WORK_ITEMS: &str = "LinkJiraWorkItems";

const STAGE_KEYS: [&str; 4] = [
    BOARDS_ENVIRONMENT_TYPE,
    LINK_BOARDS_WORK_ITEMS,
    JIRA_ENVIRONMENT_TYPE,
    LINK_JIRA_WORK_ITEMS,
];

/// A value read out of a property bag
#[derive(Debug, Clone, PartialEq)]
enum PropertyValue {
    String(String),
    Bool(bool),
}

impl PropertyValue {
    fn as_bool(&self) -> bool {
        match self {
            PropertyValue::Bool(b) => *b,
            PropertyValue::String(s) => parse_bool(s).unwrap_or(false),
        }
    }

    fn into_string(self) -> String {
        match self {
            PropertyValue::Bool(b) => b.to_string(),
            PropertyValue::String(s) => s,
        }
    }
}

fn string_property(value: impl Into<String>) -> Value {
    json!({"$type": "System.String", "$value": value.into()})
}

fn read_property(bag: &Map<String, Value>, key: &str) -> Option<PropertyValue> {
    let entry = bag.get(key)?;
    let Some(object) = entry.as_object() else {
        return match entry {
            Value::Bool(b) => Some(PropertyValue::Bool(*b)),
            Value::String(s) => Some(PropertyValue::String(s.clone())),
            _ => None,
        };
    };

    let raw = object.get("$value")?;
    let type_name = object.get("$type").and_then(Value::as_str).unwrap_or("System.String");
    match (type_name, raw) {
        ("System.Boolean" | "System.Bool", Value::Bool(b)) => Some(PropertyValue::Bool(*b)),
        ("System.Boolean" | "System.Bool", Value::String(s)) => {
            parse_bool(s).map(PropertyValue::Bool)
        }
        (_, Value::String(s)) => Some(PropertyValue::String(s.clone())),
        (_, Value::Bool(b)) => Some(PropertyValue::Bool(*b)),
        (_, Value::Number(n)) => Some(PropertyValue::String(n.to_string())),
        _ => None,
    }
}

pub fn encode_release_properties(properties: &ReleaseProperties) -> Value {
    let source = if properties.definition_creation_source.is_empty() {
        DEFAULT_CREATION_SOURCE
    } else {
        &properties.definition_creation_source
    };
    json!({
        DEFINITION_CREATION_SOURCE: string_property(source),
        INTEGRATE_JIRA_WORK_ITEMS: string_property(properties.integrate_jira_work_items.to_string()),
        INTEGRATE_BOARDS_WORK_ITEMS: string_property(properties.integrate_boards_work_items.to_string()),
        JIRA_SERVICE_ENDPOINT_ID: string_property(properties.jira_service_endpoint_id.clone()),
    })
}

/// Absent keys take their defaults
pub fn decode_release_properties(bag: Option<&Value>) -> ReleaseProperties {
    let empty = Map::new();
    let bag = bag.and_then(Value::as_object).unwrap_or(&empty);
    let read_bool = |key| read_property(bag, key).is_some_and(|v| v.as_bool());

    ReleaseProperties {
        definition_creation_source: read_property(bag, DEFINITION_CREATION_SOURCE)
            .map(PropertyValue::into_string)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_CREATION_SOURCE.to_string()),
        integrate_jira_work_items: read_bool(INTEGRATE_JIRA_WORK_ITEMS),
        integrate_boards_work_items: read_bool(INTEGRATE_BOARDS_WORK_ITEMS),
        jira_service_endpoint_id: read_property(bag, JIRA_SERVICE_ENDPOINT_ID)
            .map(PropertyValue::into_string)
            .unwrap_or_default(),
    }
}

pub fn encode_stage_properties(properties: &StageProperties) -> Value {
    json!({
        BOARDS_ENVIRONMENT_TYPE: string_property(properties.boards_environment_type.as_str()),
        LINK_BOARDS_WORK_ITEMS: string_property(properties.link_boards_work_items.to_string()),
        JIRA_ENVIRONMENT_TYPE: string_property(properties.jira_environment_type.as_str()),
        LINK_JIRA_WORK_ITEMS: string_property(properties.link_jira_work_items.to_string()),
    })
}

/// `None` unless at least one stage property key is present
pub fn decode_stage_properties(bag: Option<&Value>) -> Option<StageProperties> {
    let bag = bag?.as_object()?;
    if !STAGE_KEYS.iter().any(|key| bag.contains_key(*key)) {
        return None;
    }

    let read_type = |key| {
        read_property(bag, key)
            .and_then(|v| EnvironmentType::parse(&v.into_string()))
            .unwrap_or_default()
    };
    let read_bool = |key| read_property(bag, key).is_some_and(|v| v.as_bool());

    Some(StageProperties {
        boards_environment_type: read_type(BOARDS_ENVIRONMENT_TYPE),
        link_boards_work_items: read_bool(LINK_BOARDS_WORK_ITEMS),
        jira_environment_type: read_type(JIRA_ENVIRONMENT_TYPE),
        link_jira_work_items: read_bool(LINK_JIRA_WORK_ITEMS),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_properties_are_strings_on_the_wire() {
        let properties = ReleaseProperties {
            integrate_boards_work_items: true,
            ..Default::default()
        };
        let bag = encode_release_properties(&properties);
        assert_eq!(bag["DefinitionCreationSource"]["$value"], "ReleaseNew");
        assert_eq!(bag["IntegrateBoardsWorkItems"]["$type"], "System.String");
        assert_eq!(bag["IntegrateBoardsWorkItems"]["$value"], "true");
        assert_eq!(decode_release_properties(Some(&bag)), properties);
    }

    #[test]
    fn test_typed_booleans_are_accepted() {
        let bag = json!({
            "IntegrateJiraWorkItems": {"$type": "System.Boolean", "$value": true},
            "JiraServiceEndpointId": {"$type": "System.String", "$value": "ep-1"}
        });
        let properties = decode_release_properties(Some(&bag));
        assert!(properties.integrate_jira_work_items);
        assert_eq!(properties.jira_service_endpoint_id, "ep-1");
        assert_eq!(properties.definition_creation_source, "ReleaseNew");
    }

    #[test]
    fn test_missing_bag_gives_defaults() {
        assert_eq!(decode_release_properties(None), ReleaseProperties::default());
    }

    #[test]
    fn test_stage_properties_round_trip() {
        let properties = StageProperties {
            boards_environment_type: EnvironmentType::Production,
            link_boards_work_items: true,
            jira_environment_type: EnvironmentType::Unmapped,
            link_jira_work_items: false,
        };
        let bag = encode_stage_properties(&properties);
        assert_eq!(bag["BoardsEnvironmentType"]["$value"], "production");
        assert_eq!(decode_stage_properties(Some(&bag)), Some(properties));
    }

    #[test]
    fn test_stage_without_known_keys_has_no_properties() {
        let bag = json!({"SomethingElse": {"$type": "System.String", "$value": "x"}});
        assert_eq!(decode_stage_properties(Some(&bag)), None);
        assert_eq!(decode_stage_properties(None), None);
    }
}
