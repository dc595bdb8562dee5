//! Syntax configuration
//!
//! The five tokens that introduce functions, accessors and includes are
//! configurable per call. Callers describe only the tokens they want to change
//! with [`SyntaxOverrides`]; [`resolve_config`] lays them over the defaults and
//! returns an immutable [`SyntaxConfig`] that is threaded through the whole
//! load, nested includes included.

use serde::Deserialize;

/// Default token opening a function argument list
pub const DEFAULT_FUNCTION_OPEN: &str = "(";
/// Default token closing a function argument list
pub const DEFAULT_FUNCTION_CLOSE: &str = ")";
/// Default key marking a getter inside an accessor container
pub const DEFAULT_GET_KEY: &str = "get";
/// Default key marking a setter inside an accessor container
pub const DEFAULT_SET_KEY: &str = "set";
/// Default token introducing a file inclusion
pub const DEFAULT_INCLUDE_KEY: &str = "@include";

/// The resolved token set used by the transformer and the resolver.
///
/// Tokens are not validated: empty or overlapping tokens are accepted and
/// simply produce ambiguous matches further down the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxConfig {
    pub function_open: String,
    pub function_close: String,
    pub get_key: String,
    pub set_key: String,
    pub include_key: String,
}

impl Default for SyntaxConfig {
    fn default() -> Self {
        Self {
            function_open: DEFAULT_FUNCTION_OPEN.to_string(),
            function_close: DEFAULT_FUNCTION_CLOSE.to_string(),
            get_key: DEFAULT_GET_KEY.to_string(),
            set_key: DEFAULT_SET_KEY.to_string(),
            include_key: DEFAULT_INCLUDE_KEY.to_string(),
        }
    }
}

impl SyntaxConfig {
    /// Apply `overrides` on top of this configuration, returning a new value
    pub fn merged(&self, overrides: &SyntaxOverrides) -> Self {
        let pick = |value: &Option<String>, fallback: &String| {
            value.clone().unwrap_or_else(|| fallback.clone())
        };

        Self {
            function_open: pick(&overrides.function_open, &self.function_open),
            function_close: pick(&overrides.function_close, &self.function_close),
            get_key: pick(&overrides.get_key, &self.get_key),
            set_key: pick(&overrides.set_key, &self.set_key),
            include_key: pick(&overrides.include_key, &self.include_key),
        }
    }

    /// Whether `keys` is exactly `{get}`, `{set}` or `{get, set}`
    pub fn is_accessor_key_set<'a>(&self, keys: impl IntoIterator<Item = &'a str>) -> bool {
        let mut count = 0;
        for key in keys {
            if key != self.get_key && key != self.set_key {
                return false;
            }
            count += 1;
        }
        count == 1 || count == 2
    }
}

/// Caller-provided token overrides. Unset fields keep their defaults.
///
/// Deserializes from camelCase keys (`functionOpen`, `functionClose`,
/// `getKey`, `setKey`, `includeKey`); unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SyntaxOverrides {
    pub function_open: Option<String>,
    pub function_close: Option<String>,
    pub get_key: Option<String>,
    pub set_key: Option<String>,
    pub include_key: Option<String>,
}

impl SyntaxOverrides {
    /// Create an empty override set
    pub fn new() -> Self {
        Self::default()
    }

    /// Read overrides from a YAML (or JSON) mapping
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }

    pub fn function_open(mut self, token: impl Into<String>) -> Self {
        self.function_open = Some(token.into());
        self
    }

    pub fn function_close(mut self, token: impl Into<String>) -> Self {
        self.function_close = Some(token.into());
        self
    }

    /// Override both function brackets at once
    pub fn brackets(self, open: impl Into<String>, close: impl Into<String>) -> Self {
        self.function_open(open).function_close(close)
    }

    pub fn get_key(mut self, key: impl Into<String>) -> Self {
        self.get_key = Some(key.into());
        self
    }

    pub fn set_key(mut self, key: impl Into<String>) -> Self {
        self.set_key = Some(key.into());
        self
    }

    pub fn include_key(mut self, token: impl Into<String>) -> Self {
        self.include_key = Some(token.into());
        self
    }
}

/// Merge `overrides` onto the defaults
pub fn resolve_config(overrides: &SyntaxOverrides) -> SyntaxConfig {
    SyntaxConfig::default().merged(overrides)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_overrides_yield_defaults() {
        let config = resolve_config(&SyntaxOverrides::new());
        assert_eq!(config, SyntaxConfig::default());
        assert_eq!(config.function_open, "(");
        assert_eq!(config.function_close, ")");
        assert_eq!(config.get_key, "get");
        assert_eq!(config.set_key, "set");
        assert_eq!(config.include_key, "@include");
    }

    #[test]
    fn test_overrides_applied_key_by_key() {
        let overrides = SyntaxOverrides::new().brackets("[{", "}]").get_key("get2");
        let config = resolve_config(&overrides);

        assert_eq!(config.function_open, "[{");
        assert_eq!(config.function_close, "}]");
        assert_eq!(config.get_key, "get2");
        assert_eq!(config.set_key, DEFAULT_SET_KEY);
        assert_eq!(config.include_key, DEFAULT_INCLUDE_KEY);
    }

    #[test]
    fn test_later_resolution_sees_defaults_again() {
        let custom = resolve_config(&SyntaxOverrides::new().include_key("@my_include"));
        assert_eq!(custom.include_key, "@my_include");
        assert_eq!(DEFAULT_INCLUDE_KEY, "@include");

        let config = resolve_config(&SyntaxOverrides::new());
        assert_eq!(config.function_open, DEFAULT_FUNCTION_OPEN);
        assert_eq!(config.function_close, DEFAULT_FUNCTION_CLOSE);
        assert_eq!(config.get_key, DEFAULT_GET_KEY);
        assert_eq!(config.set_key, DEFAULT_SET_KEY);
        assert_eq!(config.include_key, "@include");
        assert_eq!(custom.include_key, "@my_include");
    }

    #[test]
    fn test_empty_token_accepted() {
        let config = resolve_config(&SyntaxOverrides::new().set_key(""));
        assert_eq!(config.set_key, "");
    }

    #[test]
    fn test_overrides_from_yaml_ignore_unknown_keys() {
        let overrides =
            SyntaxOverrides::from_yaml("functionOpen: '<'\nfunctionClose: '>'\ncolour: blue")
                .unwrap();
        assert_eq!(overrides.function_open.as_deref(), Some("<"));
        assert_eq!(overrides.function_close.as_deref(), Some(">"));
        assert_eq!(overrides.get_key, None);
    }

    #[test]
    fn test_overrides_from_empty_yaml() {
        assert_eq!(SyntaxOverrides::from_yaml("").unwrap(), SyntaxOverrides::new());
    }

    #[test]
    fn test_accessor_key_set() {
        let config = SyntaxConfig::default();
        assert!(config.is_accessor_key_set(["get"]));
        assert!(config.is_accessor_key_set(["set"]));
        assert!(config.is_accessor_key_set(["set", "get"]));
        assert!(!config.is_accessor_key_set(["get", "other"]));
        assert!(!config.is_accessor_key_set(["Get"]));
        assert!(!config.is_accessor_key_set(Vec::<&str>::new()));
    }
}
