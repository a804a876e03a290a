//! Branch and path filter codec
//!
//! The service stores filters as one flat list where each entry carries a
//! sign: `+pattern` includes, `-pattern` excludes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Structured include/exclude filter block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterBlock {
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl FilterBlock {
    pub fn new(include: Vec<String>, exclude: Vec<String>) -> Self {
        Self { include, exclude }
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    /// Sort both lists; filters are sets as far as the service is concerned
    pub fn normalized(mut self) -> Self {
        self.include.sort();
        self.exclude.sort();
        self
    }
}

/// Split a signed list into include/exclude; unsigned entries are dropped
pub fn decode_filters<S: AsRef<str>>(filters: &[S]) -> FilterBlock {
    let mut block = FilterBlock::default();

    for filter in filters {
        let filter = filter.as_ref();
        if let Some(pattern) = filter.strip_prefix('+') {
            block.include.push(pattern.to_string());
        } else if let Some(pattern) = filter.strip_prefix('-') {
            block.exclude.push(pattern.to_string());
        }
    }

    block
}

/// Render a block as a signed list, includes first
pub fn encode_filters(block: &FilterBlock) -> Vec<String> {
    block
        .include
        .iter()
        .map(|i| format!("+{}", i))
        .chain(block.exclude.iter().map(|e| format!("-{}", e)))
        .collect()
}

/// Decode from an untyped wire value; anything that is not a string list decodes empty
pub fn decode_filter_value(value: Option<&Value>) -> FilterBlock {
    let entries: Vec<&str> = value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    decode_filters(&entries)
}

/// Encode into the untyped wire value
pub fn encode_filter_value(block: &FilterBlock) -> Value {
    Value::from(encode_filters(block))
}
