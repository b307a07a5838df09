//! Application identifier validation.
//!
//! Identifiers use reverse-domain form, e.g. `com.example.app`. They are
//! checked here so malformed input never reaches the engine.

use crate::{MyoError, Result};

/// Maximum identifier length in characters.
pub const MAX_LEN: usize = 255;

/// Minimum number of dot-separated segments.
pub const MIN_SEGMENTS: usize = 3;

fn invalid(reason: &'static str) -> MyoError {
    MyoError::InvalidApplicationId { reason }
}

/// Validate an application identifier.
///
/// Rules:
/// - at most 255 characters, at least 3 non-empty dot-separated segments
/// - the first segment contains only letters and digits
/// - later segments may also contain `-` and `_`, but not as their first or last character
pub fn validate(app_id: &str) -> Result<()> {
    if app_id.chars().count() > MAX_LEN {
        return Err(invalid("longer than 255 characters"));
    }

    let segments: Vec<&str> = app_id.split('.').collect();
    if segments.len() < MIN_SEGMENTS {
        return Err(invalid("must consist of 3 or more segments"));
    }

    for (i, segment) in segments.iter().enumerate() {
        if segment.is_empty() {
            return Err(invalid("segments must not be empty"));
        }

        if i == 0 {
            if !segment.chars().all(char::is_alphanumeric) {
                return Err(invalid(
                    "first segment must only contain alphanumeric characters",
                ));
            }
            continue;
        }

        let last = segment.chars().count() - 1;
        for (j, c) in segment.chars().enumerate() {
            if c.is_alphanumeric() {
                continue;
            }
            if c != '-' && c != '_' {
                return Err(invalid(
                    "may only contain alphanumeric characters, dashes or underscores",
                ));
            }
            if j == 0 || j == last {
                return Err(invalid(
                    "dashes and underscores cannot begin or end a segment",
                ));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_identifiers() {
        for id in [
            "com.example.app",
            "com.example.my-app",
            "org.thalmic.hello_world.v2",
            "a.b.c",
            "com.example.x-y_z",
        ] {
            assert!(validate(id).is_ok(), "{} should be valid", id);
        }
    }

    #[test]
    fn test_invalid_identifiers() {
        for id in [
            "",
            "com",
            "com.example",
            "com..app",
            "com.example.",
            ".example.app",
            "c-m.example.app",
            "com.-example.app",
            "com.example_.app",
            "com.example.app-",
            "com.exa mple.app",
            "com.example.app!",
        ] {
            let err = validate(id).unwrap_err();
            assert!(err.is_validation(), "{} should fail validation", id);
        }
    }

    #[test]
    fn test_length_limit() {
        let ok = format!("com.example.{}", "a".repeat(MAX_LEN - 12));
        assert_eq!(ok.len(), MAX_LEN);
        assert!(validate(&ok).is_ok());

        let too_long = format!("{}a", ok);
        assert!(validate(&too_long).is_err());
    }
}
