//! `${VAR}` / `${VAR:default}` substitution in configuration values

use regex::Regex;
use serde_json::Value as JsonValue;
use std::env;
use thiserror::Error;

const VAR_PATTERN: &str = r"\$\{([^}:]+)(?::([^}]*))?\}";

#[derive(Debug, Error)]
pub enum EnvResolverError {
    #[error("Environment variable '{0}' not found and no default provided")]
    VarNotFound(String),
    #[error("Environment variable '{0}' is not in whitelist. Allowed prefixes: {1:?}")]
    VarNotWhitelisted(String, Vec<String>),
    #[error("Invalid variable pattern: {0}")]
    InvalidPattern(String),
}

/// Resolves placeholders against the process environment, restricted to whitelisted prefixes
#[derive(Debug, Clone)]
pub struct EnvResolver {
    /// Empty means no restrictions
    allowed_prefixes: Vec<String>,
}

impl Default for EnvResolver {
    fn default() -> Self {
        Self { allowed_prefixes: vec!["BAASKIT_".to_string(), "APP_".to_string()] }
    }
}

impl EnvResolver {
    pub fn new(allowed_prefixes: Vec<String>) -> Self {
        Self { allowed_prefixes }
    }

    pub fn unrestricted() -> Self {
        Self { allowed_prefixes: vec![] }
    }

    /// Resolve every string in `value`, recursively
    ///
    /// A string that is exactly one placeholder is re-typed after substitution, so
    /// `"${BAASKIT_PORT:9000}"` becomes the number 9000.
    pub fn resolve(&self, value: &JsonValue) -> Result<JsonValue, EnvResolverError> {
        let re = Regex::new(VAR_PATTERN).map_err(|e| EnvResolverError::InvalidPattern(e.to_string()))?;
        self.resolve_with(&re, value)
    }

    fn resolve_with(&self, re: &Regex, value: &JsonValue) -> Result<JsonValue, EnvResolverError> {
        match value {
            JsonValue::String(s) => self.resolve_string(re, s),
            JsonValue::Object(obj) => {
                let mut resolved = serde_json::Map::new();
                for (key, val) in obj {
                    resolved.insert(key.clone(), self.resolve_with(re, val)?);
                }
                Ok(JsonValue::Object(resolved))
            }
            JsonValue::Array(items) => items
                .iter()
                .map(|item| self.resolve_with(re, item))
                .collect::<Result<Vec<_>, _>>()
                .map(JsonValue::Array),
            other => Ok(other.clone()),
        }
    }

    fn resolve_string(&self, re: &Regex, input: &str) -> Result<JsonValue, EnvResolverError> {
        if !input.contains("${") {
            return Ok(JsonValue::String(input.to_string()));
        }

        let whole = re.find(input).is_some_and(|m| m.start() == 0 && m.end() == input.len());

        // Single pass: substituted values are never scanned again
        let mut result = String::with_capacity(input.len());
        let mut last = 0;
        for caps in re.captures_iter(input) {
            let (Some(full), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let var_name = name.as_str();
            self.validate_var_name(var_name)?;

            let value = match env::var(var_name) {
                Ok(value) => value,
                Err(_) => match caps.get(2) {
                    Some(default) => default.as_str().to_string(),
                    None => return Err(EnvResolverError::VarNotFound(var_name.to_string())),
                },
            };
            result.push_str(&input[last..full.start()]);
            result.push_str(&value);
            last = full.end();
        }
        result.push_str(&input[last..]);

        if whole {
            Ok(retype(result))
        } else {
            Ok(JsonValue::String(result))
        }
    }

    fn validate_var_name(&self, var_name: &str) -> Result<(), EnvResolverError> {
        if self.allowed_prefixes.is_empty()
            || self.allowed_prefixes.iter().any(|prefix| var_name.starts_with(prefix))
        {
            return Ok(());
        }
        Err(EnvResolverError::VarNotWhitelisted(
            var_name.to_string(),
            self.allowed_prefixes.clone(),
        ))
    }
}

fn retype(value: String) -> JsonValue {
    if let Ok(b) = value.parse::<bool>() {
        JsonValue::Bool(b)
    } else if let Ok(i) = value.parse::<i64>() {
        JsonValue::Number(i.into())
    } else {
        JsonValue::String(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_basic_variable_resolution() {
        env::set_var("BAASKIT_TEST_DOMAIN", "api.example.com");

        let resolver = EnvResolver::default();
        let result = resolver.resolve(&json!("${BAASKIT_TEST_DOMAIN}")).unwrap();
        assert_eq!(result, json!("api.example.com"));

        env::remove_var("BAASKIT_TEST_DOMAIN");
    }

    #[test]
    fn test_default_value_and_typing() {
        env::remove_var("BAASKIT_TEST_NONEXISTENT_PORT");

        let resolver = EnvResolver::default();
        let input = json!({
            "port": "${BAASKIT_TEST_NONEXISTENT_PORT:9000}",
            "use_https": "${BAASKIT_TEST_NONEXISTENT_HTTPS:false}",
            "url": "http://${BAASKIT_TEST_NONEXISTENT_HOST:localhost}:9000/"
        });
        let result = resolver.resolve(&input).unwrap();

        assert_eq!(
            result,
            json!({"port": 9000, "use_https": false, "url": "http://localhost:9000/"})
        );
    }

    #[test]
    fn test_missing_variable_error() {
        env::remove_var("BAASKIT_TEST_MISSING");

        let result = EnvResolver::default().resolve(&json!("${BAASKIT_TEST_MISSING}"));
        assert!(matches!(result, Err(EnvResolverError::VarNotFound(_))));
    }

    #[test]
    fn test_whitelist_validation() {
        let result = EnvResolver::default().resolve(&json!("${HOME}"));
        assert!(matches!(result, Err(EnvResolverError::VarNotWhitelisted(_, _))));

        env::set_var("ANY_TEST_VAR_NAME", "value");
        let result = EnvResolver::unrestricted().resolve(&json!("${ANY_TEST_VAR_NAME}")).unwrap();
        assert_eq!(result, json!("value"));
        env::remove_var("ANY_TEST_VAR_NAME");
    }

    #[test]
    fn test_substituted_values_are_not_rescanned() {
        env::set_var("BAASKIT_TEST_SELF_REF", "${BAASKIT_TEST_SELF_REF}");

        let result = EnvResolver::default().resolve(&json!("x-${BAASKIT_TEST_SELF_REF}")).unwrap();
        assert_eq!(result, json!("x-${BAASKIT_TEST_SELF_REF}"));

        env::remove_var("BAASKIT_TEST_SELF_REF");
    }
}
