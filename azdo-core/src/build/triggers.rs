//! Build trigger codec
//!
//! The service keeps triggers as a heterogeneous list of JSON maps keyed by
//! `triggerType`. [`BuildTrigger`] is the typed view of one entry.

use crate::convert::{bool_or, int32_or, string_or};
use crate::days::{encode_days, parse_days_value};
use crate::domain::build::{
    BuildCompletionTrigger, BuildSchedule, CiOverride, CiTrigger, CommentRequired,
    DEFAULT_INITIAL_BRANCH, Forks, PullRequestOverride, PullRequestTrigger,
};
use crate::error::{DefinitionError, Result};
use crate::filters::{decode_filter_value, encode_filter_value};
use crate::wire::build::YAML_PROCESS_TYPE;
use serde_json::{Map, Value, json};

pub const CONTINUOUS_INTEGRATION: &str = "continuousIntegration";
pub const PULL_REQUEST: &str = "pullRequest";
pub const SCHEDULE: &str = "schedule";
pub const BUILD_COMPLETION: &str = "buildCompletion";

/// Display names of schedule time zones and their Windows ids
const TIME_ZONES: &[(&str, &str)] = &[
    ("(UTC) Coordinated Universal Time", "UTC"),
    ("(UTC-08:00) Pacific Time (US & Canada)", "Pacific Standard Time"),
    ("(UTC-07:00) Mountain Time (US & Canada)", "Mountain Standard Time"),
    ("(UTC-06:00) Central Time (US & Canada)", "Central Standard Time"),
    ("(UTC-05:00) Eastern Time (US & Canada)", "Eastern Standard Time"),
    ("(UTC-03:00) Brasilia", "E. South America Standard Time"),
    ("(UTC+00:00) Dublin, Edinburgh, Lisbon, London", "GMT Standard Time"),
    ("(UTC+01:00) Amsterdam, Berlin, Bern, Rome, Stockholm, Vienna", "W. Europe Standard Time"),
    ("(UTC+01:00) Brussels, Copenhagen, Madrid, Paris", "Romance Standard Time"),
    ("(UTC+02:00) Helsinki, Kyiv, Riga, Sofia, Tallinn, Vilnius", "FLE Standard Time"),
    ("(UTC+03:00) Moscow, St. Petersburg", "Russian Standard Time"),
    ("(UTC+05:30) Chennai, Kolkata, Mumbai, New Delhi", "India Standard Time"),
    ("(UTC+08:00) Beijing, Chongqing, Hong Kong, Urumqi", "China Standard Time"),
    ("(UTC+08:00) Kuala Lumpur, Singapore", "Singapore Standard Time"),
    ("(UTC+09:00) Osaka, Sapporo, Tokyo", "Tokyo Standard Time"),
    ("(UTC+10:00) Canberra, Melbourne, Sydney", "AUS Eastern Standard Time"),
];

/// Windows time zone id for a display name; unknown names pass through
pub fn time_zone_to_id(display: &str) -> String {
    TIME_ZONES
        .iter()
        .find(|(name, _)| *name == display)
        .map(|(_, id)| id.to_string())
        .unwrap_or_else(|| display.to_string())
}

/// Display name for a Windows time zone id; unknown ids pass through
pub fn id_to_time_zone(id: &str) -> String {
    TIME_ZONES
        .iter()
        .find(|(_, tz)| *tz == id)
        .map(|(name, _)| name.to_string())
        .unwrap_or_else(|| id.to_string())
}

/// One entry of a build definition's trigger list
#[derive(Debug, Clone, PartialEq)]
pub enum BuildTrigger {
    ContinuousIntegration(CiTrigger),
    PullRequest(PullRequestTrigger),
    /// All schedules share one trigger entry
    Schedule(Vec<BuildSchedule>),
    BuildCompletion(BuildCompletionTrigger),
}

impl BuildTrigger {
    pub fn trigger_type(&self) -> &'static str {
        match self {
            BuildTrigger::ContinuousIntegration(_) => CONTINUOUS_INTEGRATION,
            BuildTrigger::PullRequest(_) => PULL_REQUEST,
            BuildTrigger::Schedule(_) => SCHEDULE,
            BuildTrigger::BuildCompletion(_) => BUILD_COMPLETION,
        }
    }

    /// Render the wire map
    pub fn encode(&self) -> Value {
        match self {
            BuildTrigger::ContinuousIntegration(ci) => encode_ci(ci),
            BuildTrigger::PullRequest(pr) => encode_pull_request(pr),
            BuildTrigger::Schedule(schedules) => json!({
                "schedules": schedules.iter().map(encode_schedule).collect::<Vec<_>>(),
                "triggerType": SCHEDULE,
            }),
            BuildTrigger::BuildCompletion(trigger) => json!({
                "branchFilters": encode_filter_value(&trigger.branch_filter),
                "definition": {"id": trigger.build_definition_id},
                "requiresSuccessfulBuild": true,
                "triggerType": BUILD_COMPLETION,
            }),
        }
    }

    /// Parse a wire map
    ///
    /// Returns `Ok(None)` for trigger types this codec does not model.
    pub fn decode(value: &Value) -> Result<Option<Self>> {
        let trigger_type = string_or(value.get("triggerType"), "");

        let trigger = if trigger_type.eq_ignore_ascii_case(CONTINUOUS_INTEGRATION) {
            BuildTrigger::ContinuousIntegration(decode_ci(value))
        } else if trigger_type.eq_ignore_ascii_case(PULL_REQUEST) {
            BuildTrigger::PullRequest(decode_pull_request(value))
        } else if trigger_type.eq_ignore_ascii_case(SCHEDULE) {
            let schedules = value
                .get("schedules")
                .and_then(Value::as_array)
                .map(|entries| entries.iter().map(decode_schedule).collect::<Result<Vec<_>>>())
                .transpose()?
                .unwrap_or_default();
            BuildTrigger::Schedule(schedules)
        } else if trigger_type.eq_ignore_ascii_case(BUILD_COMPLETION) {
            BuildTrigger::BuildCompletion(decode_build_completion(value)?)
        } else {
            return Ok(None);
        };

        Ok(Some(trigger))
    }
}

fn is_yaml(value: &Value) -> bool {
    value
        .get("settingsSourceType")
        .and_then(Value::as_f64)
        .is_some_and(|v| v == f64::from(YAML_PROCESS_TYPE))
}

// ============================================================================
// Continuous integration
// ============================================================================

fn encode_ci(ci: &CiTrigger) -> Value {
    match &ci.override_ {
        Some(settings) if !ci.use_yaml => {
            let mut map = Map::new();
            map.insert("batchChanges".into(), json!(settings.batch));
            map.insert("branchFilters".into(), encode_filter_value(&settings.branch_filter));
            map.insert(
                "maxConcurrentBuildsPerBranch".into(),
                json!(settings.max_concurrent_builds_per_branch),
            );
            map.insert("pathFilters".into(), encode_filter_value(&settings.path_filter));
            map.insert("pollingInterval".into(), json!(settings.polling_interval));
            if !settings.polling_job_id.is_empty() {
                map.insert("pollingJobId".into(), json!(settings.polling_job_id));
            }
            map.insert("triggerType".into(), json!(CONTINUOUS_INTEGRATION));
            Value::Object(map)
        }
        _ => json!({
            "batchChanges": false,
            "branchFilters": [],
            "maxConcurrentBuildsPerBranch": 1,
            "pathFilters": [],
            "settingsSourceType": YAML_PROCESS_TYPE,
            "triggerType": CONTINUOUS_INTEGRATION,
        }),
    }
}

fn decode_ci(value: &Value) -> CiTrigger {
    if is_yaml(value) {
        return CiTrigger {
            use_yaml: true,
            override_: None,
        };
    }

    CiTrigger {
        use_yaml: false,
        override_: Some(CiOverride {
            batch: bool_or(value.get("batchChanges"), true),
            branch_filter: decode_filter_value(value.get("branchFilters")).normalized(),
            path_filter: decode_filter_value(value.get("pathFilters")).normalized(),
            max_concurrent_builds_per_branch: int32_or(value.get("maxConcurrentBuildsPerBranch"), 1),
            polling_interval: int32_or(value.get("pollingInterval"), 0),
            polling_job_id: string_or(value.get("pollingJobId"), ""),
        }),
    }
}

// ============================================================================
// Pull request
// ============================================================================

fn encode_pull_request(pr: &PullRequestTrigger) -> Value {
    let (comment_required, non_team_only) = pr.comment_required.to_flags();

    let mut map = Map::new();
    map.insert(
        "forks".into(),
        json!({"allowSecrets": pr.forks.share_secrets, "enabled": pr.forks.enabled}),
    );
    map.insert("isCommentRequiredForPullRequest".into(), json!(comment_required));
    if let Some(non_team_only) = non_team_only {
        map.insert("requireCommentsForNonTeamMembersOnly".into(), json!(non_team_only));
    }
    map.insert("triggerType".into(), json!(PULL_REQUEST));

    match &pr.override_ {
        Some(settings) if !pr.use_yaml => {
            map.insert("autoCancel".into(), json!(settings.auto_cancel));
            map.insert("branchFilters".into(), encode_filter_value(&settings.branch_filter));
            map.insert("pathFilters".into(), encode_filter_value(&settings.path_filter));
        }
        _ => {
            map.insert("branchFilters".into(), json!([format!("+{}", pr.initial_branch)]));
            map.insert("pathFilters".into(), json!([]));
            map.insert("settingsSourceType".into(), json!(YAML_PROCESS_TYPE));
        }
    }

    Value::Object(map)
}

fn decode_pull_request(value: &Value) -> PullRequestTrigger {
    let forks = value.get("forks");
    let forks = Forks {
        enabled: bool_or(forks.and_then(|f| f.get("enabled")), false),
        share_secrets: bool_or(forks.and_then(|f| f.get("allowSecrets")), false),
    };
    let comment_required = CommentRequired::from_flags(
        bool_or(value.get("isCommentRequiredForPullRequest"), false),
        bool_or(value.get("requireCommentsForNonTeamMembersOnly"), false),
    );

    if is_yaml(value) {
        let initial_branch = value
            .get("branchFilters")
            .and_then(Value::as_array)
            .and_then(|filters| filters.first())
            .and_then(Value::as_str)
            .map(|branch| branch.trim_start_matches('+').to_string())
            .unwrap_or_else(|| DEFAULT_INITIAL_BRANCH.to_string());

        return PullRequestTrigger {
            use_yaml: true,
            initial_branch,
            forks,
            comment_required,
            override_: None,
        };
    }

    PullRequestTrigger {
        use_yaml: false,
        initial_branch: DEFAULT_INITIAL_BRANCH.to_string(),
        forks,
        comment_required,
        override_: Some(PullRequestOverride {
            auto_cancel: bool_or(value.get("autoCancel"), true),
            branch_filter: decode_filter_value(value.get("branchFilters")).normalized(),
            path_filter: decode_filter_value(value.get("pathFilters")).normalized(),
        }),
    }
}

// ============================================================================
// Schedules
// ============================================================================

fn encode_schedule(schedule: &BuildSchedule) -> Value {
    let job_id = if schedule.schedule_job_id.is_empty() {
        Value::Null
    } else {
        json!(schedule.schedule_job_id)
    };

    json!({
        "branchFilters": encode_filter_value(&schedule.branch_filter),
        "daysToBuild": encode_days(&schedule.days_to_build),
        "scheduleJobId": job_id,
        "scheduleOnlyWithChanges": schedule.schedule_only_with_changes,
        "startHours": schedule.start_hours,
        "startMinutes": schedule.start_minutes,
        "timeZoneId": time_zone_to_id(&schedule.time_zone),
    })
}

fn decode_schedule(value: &Value) -> Result<BuildSchedule> {
    let days = value.get("daysToBuild").unwrap_or(&Value::Null);
    let days_to_build = parse_days_value(days).ok_or_else(|| {
        DefinitionError::unexpected("schedule", format!("invalid daysToBuild value {}", days))
    })?;

    Ok(BuildSchedule {
        branch_filter: decode_filter_value(value.get("branchFilters")).normalized(),
        days_to_build,
        schedule_only_with_changes: bool_or(value.get("scheduleOnlyWithChanges"), true),
        start_hours: int32_or(value.get("startHours"), 0),
        start_minutes: int32_or(value.get("startMinutes"), 0),
        time_zone: id_to_time_zone(&string_or(value.get("timeZoneId"), "UTC")),
        schedule_job_id: string_or(value.get("scheduleJobId"), ""),
    })
}

// ============================================================================
// Build completion
// ============================================================================

fn decode_build_completion(value: &Value) -> Result<BuildCompletionTrigger> {
    let id = value
        .get("definition")
        .and_then(|d| d.get("id"))
        .map(|id| int32_or(Some(id), 0))
        .filter(|id| *id > 0)
        .ok_or_else(|| {
            DefinitionError::unexpected("buildCompletion trigger", "missing definition id")
        })?;

    Ok(BuildCompletionTrigger {
        build_definition_id: id,
        branch_filter: decode_filter_value(value.get("branchFilters")).normalized(),
    })
}
