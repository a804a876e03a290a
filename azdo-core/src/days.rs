//! Day-of-week bitmask codec
//!
//! Schedules carry the days they fire on as a bitmask: Mon=1, Tue=2, Wed=4,
//! Thu=8, Fri=16, Sat=32, Sun=64. The service sometimes returns the stringified
//! flags enum instead (`"monday, wednesday"`, `"all"`), which
//! [`parse_days_value`] accepts as well.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Mask with every day set
pub const ALL_DAYS: i32 = 127;

/// A single day of the week
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DayOfWeek {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl DayOfWeek {
    /// All days in canonical order
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Mon,
        DayOfWeek::Tue,
        DayOfWeek::Wed,
        DayOfWeek::Thu,
        DayOfWeek::Fri,
        DayOfWeek::Sat,
        DayOfWeek::Sun,
    ];

    pub fn bit(self) -> i32 {
        1 << (self as i32)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DayOfWeek::Mon => "Mon",
            DayOfWeek::Tue => "Tue",
            DayOfWeek::Wed => "Wed",
            DayOfWeek::Thu => "Thu",
            DayOfWeek::Fri => "Fri",
            DayOfWeek::Sat => "Sat",
            DayOfWeek::Sun => "Sun",
        }
    }

    /// Parse the short form (`Mon`) or the service's long form (`monday`)
    pub fn parse(name: &str) -> Option<Self> {
        let lower = name.trim().to_ascii_lowercase();
        DayOfWeek::ALL.into_iter().find(|day| {
            let short = day.as_str().to_ascii_lowercase();
            lower == short || lower == day.long_name()
        })
    }

    fn long_name(self) -> &'static str {
        match self {
            DayOfWeek::Mon => "monday",
            DayOfWeek::Tue => "tuesday",
            DayOfWeek::Wed => "wednesday",
            DayOfWeek::Thu => "thursday",
            DayOfWeek::Fri => "friday",
            DayOfWeek::Sat => "saturday",
            DayOfWeek::Sun => "sunday",
        }
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// OR together the bits of the given day names
///
/// Unknown names are ignored and duplicates are idempotent.
pub fn days_to_mask<S: AsRef<str>>(days: &[S]) -> i32 {
    days.iter()
        .filter_map(|d| DayOfWeek::parse(d.as_ref()))
        .fold(0, |mask, day| mask | day.bit())
}

/// Encode typed days into a bitmask
pub fn encode_days(days: &[DayOfWeek]) -> i32 {
    days.iter().fold(0, |mask, day| mask | day.bit())
}

/// Decode a bitmask into days in canonical Mon..Sun order
///
/// Returns `None` for masks outside `0..=127`.
pub fn mask_to_days(mask: i32) -> Option<Vec<DayOfWeek>> {
    if !(0..=ALL_DAYS).contains(&mask) {
        return None;
    }

    Some(
        DayOfWeek::ALL
            .into_iter()
            .filter(|day| mask & day.bit() != 0)
            .collect(),
    )
}

/// Decode the `daysToBuild`/`daysToRelease` field in either representation
pub fn parse_days_value(value: &Value) -> Option<Vec<DayOfWeek>> {
    match value {
        Value::Number(n) => {
            let mask = n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?;
            mask_to_days(i32::try_from(mask).ok()?)
        }
        Value::String(s) => parse_days_enum(s),
        _ => None,
    }
}

/// Decode a stringified flags enum such as `"monday, friday"`, `"all"` or `"none"`
pub fn parse_days_enum(s: &str) -> Option<Vec<DayOfWeek>> {
    if let Ok(mask) = s.trim().parse::<i32>() {
        return mask_to_days(mask);
    }

    let mut mask = 0;
    for part in s.split(',') {
        match part.trim().to_ascii_lowercase().as_str() {
            "all" => mask |= ALL_DAYS,
            "none" | "" => {}
            other => mask |= DayOfWeek::parse(other)?.bit(),
        }
    }
    mask_to_days(mask)
}
