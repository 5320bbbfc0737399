#![warn(missing_docs)]
//! `marksync-config` - data-driven settings for `marksync`.
//!
//! This crate intentionally stays lightweight and does **not** depend on the engine itself. It
//! provides a small struct that hosts can deserialize (e.g. from a TOML settings file) and hand
//! to an annotation session.

use serde::Deserialize;
use thiserror::Error;

/// Highlight flag applied to rendered elements of active annotations unless configured otherwise.
pub const DEFAULT_HIGHLIGHT_CLASS: &str = "selected";

/// Errors produced while loading or validating a [`SyncConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The settings text is not valid TOML or does not match the schema.
    #[error("invalid settings: {0}")]
    Parse(#[from] toml::de::Error),
    /// The highlight class name is empty or contains whitespace.
    #[error("invalid highlight class {0:?}")]
    InvalidHighlightClass(String),
    /// The id prefix contains whitespace.
    #[error("invalid id prefix {0:?}")]
    InvalidIdPrefix(String),
}

/// Annotation session settings.
///
/// Every field has a default, so an empty TOML document is a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    /// Class flag toggled on rendered elements of active annotation nodes.
    pub highlight_class: String,
    /// Optional prefix prepended to generated annotation ids (e.g. `comment-`).
    pub id_prefix: Option<String>,
    /// Collapse the selection to the end of the wrapped range after committing it.
    pub collapse_on_commit: bool,
    /// Clear the platform-level (native) selection after committing a range.
    pub clear_native_selection: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            highlight_class: DEFAULT_HIGHLIGHT_CLASS.to_string(),
            id_prefix: None,
            collapse_on_commit: true,
            clear_native_selection: true,
        }
    }
}

impl SyncConfig {
    /// Parse and validate settings from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Override the highlight class.
    pub fn with_highlight_class(mut self, class: impl Into<String>) -> Self {
        self.highlight_class = class.into();
        self
    }

    /// Set a prefix for generated annotation ids.
    pub fn with_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.id_prefix = Some(prefix.into());
        self
    }

    /// Check field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.highlight_class.is_empty()
            || self.highlight_class.chars().any(char::is_whitespace)
        {
            return Err(ConfigError::InvalidHighlightClass(
                self.highlight_class.clone(),
            ));
        }
        if let Some(prefix) = &self.id_prefix
            && prefix.chars().any(char::is_whitespace)
        {
            return Err(ConfigError::InvalidIdPrefix(prefix.clone()));
        }
        Ok(())
    }

    /// Returns `true` if generated ids carry a non-empty prefix.
    pub fn has_id_prefix(&self) -> bool {
        self.id_prefix.as_deref().is_some_and(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = SyncConfig::from_toml_str("").unwrap();
        assert_eq!(config, SyncConfig::default());
        assert_eq!(config.highlight_class, "selected");
        assert!(!config.has_id_prefix());
    }

    #[test]
    fn test_partial_document() {
        let config = SyncConfig::from_toml_str(
            r#"
highlight_class = "comment-active"
id_prefix = "c-"
clear_native_selection = false
"#,
        )
        .unwrap();
        assert_eq!(config.highlight_class, "comment-active");
        assert_eq!(config.id_prefix.as_deref(), Some("c-"));
        assert!(config.collapse_on_commit);
        assert!(!config.clear_native_selection);
        assert!(config.has_id_prefix());
    }

    #[test]
    fn test_rejects_bad_highlight_class() {
        let err = SyncConfig::from_toml_str(r#"highlight_class = "two words""#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidHighlightClass(_)));

        let err = SyncConfig::default()
            .with_highlight_class("")
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidHighlightClass(_)));
    }

    #[test]
    fn test_rejects_unknown_fields() {
        let err = SyncConfig::from_toml_str("highlight = true").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_rejects_whitespace_prefix() {
        let err = SyncConfig::default()
            .with_id_prefix("a b")
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidIdPrefix(_)));
    }
}
