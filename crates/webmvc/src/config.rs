use serde::Deserialize;
use std::path::{Path, PathBuf};

const DEFAULT_CONTENT_TYPE: &str = "application/json; charset=utf-8";
const DEFAULT_TEMPLATE_PREFIX: &str = "templates/";

/// Application wide settings.
///
/// Every key is optional, an absent key keeps its default. Keys use camel case:
///
/// ```json
/// {
///   "defaultContentType": "application/json; charset=utf-8",
///   "templatePrefix": "templates/",
///   "templateDir": ".",
///   "strictMethods": true
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    default_content_type: String,
    template_prefix: String,
    template_dir: Option<PathBuf>,
    strict_methods: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_content_type: DEFAULT_CONTENT_TYPE.to_string(),
            template_prefix: DEFAULT_TEMPLATE_PREFIX.to_string(),
            template_dir: None,
            strict_methods: true,
        }
    }
}

impl AppConfig {
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_json_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Content type of handlers that do not declare one.
    pub fn default_content_type(&self) -> &str {
        &self.default_content_type
    }

    /// Prepended to the name a handler returns to locate its template.
    pub fn template_prefix(&self) -> &str {
        &self.template_prefix
    }

    /// Directory templates are loaded from when no template engine is given explicitly.
    pub fn template_dir(&self) -> Option<&Path> {
        self.template_dir.as_deref()
    }

    /// Whether routes match exactly their declared methods.
    pub fn strict_methods(&self) -> bool {
        self.strict_methods
    }

    #[must_use]
    pub fn with_default_content_type<S: Into<String>>(mut self, content_type: S) -> Self {
        self.default_content_type = content_type.into();
        self
    }

    #[must_use]
    pub fn with_template_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.template_prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn with_template_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.template_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn with_strict_methods(mut self, strict_methods: bool) -> Self {
        self.strict_methods = strict_methods;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = AppConfig::default();
        assert_eq!(config.default_content_type(), "application/json; charset=utf-8");
        assert_eq!(config.template_prefix(), "templates/");
        assert_eq!(config.template_dir(), None);
        assert!(config.strict_methods());
    }

    #[test]
    fn empty_json_keeps_defaults() {
        assert_eq!(AppConfig::from_json_str("{}").unwrap(), AppConfig::default());
    }

    #[test]
    fn partial_json_overrides() {
        let json = r#"{"strictMethods": false, "templateDir": "web", "unknown": 1}"#;
        let config = AppConfig::from_json_str(json).unwrap();
        assert!(!config.strict_methods());
        assert_eq!(config.template_dir(), Some(Path::new("web")));
        assert_eq!(config.template_prefix(), "templates/");
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(AppConfig::from_json_str(r#"{"strictMethods": "yes"}"#).is_err());
    }
}
