//! Primitive validators shared by every resource

use crate::error::{ValidationError, ValidationKind};

/// Characters the service refuses inside folder and definition paths
pub const FORBIDDEN_PATH_CHARS: &str = "<>|:$@\"/%+*?";

/// Validate a definition or folder path
///
/// A path must be non-empty, start with a backslash and contain none of
/// [`FORBIDDEN_PATH_CHARS`]. The root path `\` is valid.
pub fn validate_path(field: &str, path: &str) -> Result<(), ValidationError> {
    if path.is_empty() {
        return Err(ValidationError::new(
            ValidationKind::PathEmpty,
            field,
            "path can not be empty",
        ));
    }

    if !path.starts_with('\\') {
        return Err(ValidationError::new(
            ValidationKind::PathMustStartWithBackslash,
            field,
            "path must start with backslash",
        ));
    }

    if path.chars().any(|c| FORBIDDEN_PATH_CHARS.contains(c)) {
        return Err(ValidationError::new(
            ValidationKind::PathForbiddenChar,
            field,
            format!("{} are not allowed in path", FORBIDDEN_PATH_CHARS),
        ));
    }

    Ok(())
}

/// Validate a base URL such as a GitHub Enterprise host
pub fn validate_url(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.ends_with('/') {
        return Err(ValidationError::new(
            ValidationKind::UrlTrailingSlash,
            field,
            "url should not end with a slash",
        ));
    }

    match url::Url::parse(value) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.has_host() => Ok(()),
        _ => Err(ValidationError::new(
            ValidationKind::UrlNotHttp,
            field,
            "url must be an http or https URL",
        )),
    }
}
