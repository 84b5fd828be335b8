//! Environment variable expansion for configuration strings.

use std::borrow::Cow;

use crate::ConfigError;

/// Expand `${VAR}` and `${VAR:-default}` references in `value`.
///
/// `field` names the config key and is only used for error messages.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    shellexpand::env(value)
        .map(Cow::into_owned)
        .map_err(|e| ConfigError::EnvVar {
            field: field.to_owned(),
            message: format!("${{{}}} not set", e.var_name),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_value_unchanged() {
        assert_eq!(expand_env("docs", "docsDir").unwrap(), "docs");
    }

    #[test]
    fn test_default_used_when_unset() {
        let value = expand_env("${MMR_TEST_SURELY_UNSET_VAR:-fallback}", "docsDir").unwrap();
        assert_eq!(value, "fallback");
    }

    #[test]
    fn test_unset_without_default_fails() {
        let err = expand_env("${MMR_TEST_SURELY_UNSET_VAR}/docs", "docsDir").unwrap_err();
        match err {
            ConfigError::EnvVar { field, message } => {
                assert_eq!(field, "docsDir");
                assert!(message.contains("MMR_TEST_SURELY_UNSET_VAR"));
            }
            other => panic!("Expected ConfigError::EnvVar, got {other:?}"),
        }
    }
}
