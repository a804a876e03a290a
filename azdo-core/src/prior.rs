//! Lookup into previously persisted resource state
//!
//! The service never returns secret values, so flatten needs to reach back into
//! the state the host stored on the last apply. Codecs receive that access as a
//! [`PriorState`] instead of the whole state object.

use serde_json::Value;

/// Access to the prior persisted state of a resource
pub trait PriorState {
    /// Find the entry of a list-valued `field` whose `key_field` equals `key_value`
    ///
    /// `field` is a dotted path; numeric segments index into lists, e.g.
    /// `stage.0.variable`.
    fn find_entry(&self, field: &str, key_field: &str, key_value: &str) -> Option<Value>;
}

/// Prior state for a resource that has never been persisted
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPriorState;

impl PriorState for NoPriorState {
    fn find_entry(&self, _field: &str, _key_field: &str, _key_value: &str) -> Option<Value> {
        None
    }
}

impl PriorState for Value {
    fn find_entry(&self, field: &str, key_field: &str, key_value: &str) -> Option<Value> {
        let mut current = self;
        for segment in field.split('.').filter(|s| !s.is_empty()) {
            current = match segment.parse::<usize>() {
                Ok(index) => current.get(index)?,
                Err(_) => current.get(segment)?,
            };
        }

        current
            .as_array()?
            .iter()
            .find(|entry| entry.get(key_field).and_then(Value::as_str) == Some(key_value))
            .cloned()
    }
}

impl<T: PriorState + ?Sized> PriorState for &T {
    fn find_entry(&self, field: &str, key_field: &str, key_value: &str) -> Option<Value> {
        (**self).find_entry(field, key_field, key_value)
    }
}

/// Prior state scoped under a path prefix
///
/// Used by nested codecs so a stage codec can look up `variable` and hit
/// `stage.<n>.variable` in the full state.
pub struct Scoped<'a> {
    inner: &'a dyn PriorState,
    prefix: String,
}

impl<'a> Scoped<'a> {
    pub fn new(inner: &'a dyn PriorState, prefix: impl Into<String>) -> Self {
        Self {
            inner,
            prefix: prefix.into(),
        }
    }
}

impl PriorState for Scoped<'_> {
    fn find_entry(&self, field: &str, key_field: &str, key_value: &str) -> Option<Value> {
        self.inner
            .find_entry(&format!("{}.{}", self.prefix, field), key_field, key_value)
    }
}
