//! Optional TOML settings file
//!
//! ```toml
//! [parse]
//! format = "netscaler"
//! detection_window = 100
//! strict_references = false
//!
//! [output]
//! provider = "nacoscs"
//! scheme = "http"
//! comments = true
//! directory = "migrated"
//! ```
//!
//! Every key is optional; command-line flags override file values.

use crate::ir::SourceFormat;
use crate::ConvertOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid setting `{field}`: {message}")]
    Invalid { field: &'static str, message: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub parse: ParseSettings,
    #[serde(default)]
    pub output: OutputSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParseSettings {
    pub format: Option<SourceFormat>,
    pub detection_window: Option<usize>,
    pub strict_references: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputSettings {
    pub provider: Option<String>,
    pub scheme: Option<String>,
    pub comments: Option<bool>,
    pub directory: Option<PathBuf>,
}

impl Settings {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), "loaded settings file");
        Ok(settings)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, SettingsError> {
        let settings: Self = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.parse.detection_window == Some(0) {
            return Err(SettingsError::Invalid {
                field: "parse.detection_window",
                message: "must be at least 1".to_string(),
            });
        }
        if let Some(provider) = &self.output.provider {
            if provider.is_empty() || provider.contains(char::is_whitespace) || provider.contains('@') {
                return Err(SettingsError::Invalid {
                    field: "output.provider",
                    message: format!("`{}` is not a valid provider name", provider),
                });
            }
        }
        if let Some(scheme) = &self.output.scheme {
            let valid = scheme
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic())
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
            if !valid {
                return Err(SettingsError::Invalid {
                    field: "output.scheme",
                    message: format!("`{}` is not a valid URL scheme", scheme),
                });
            }
        }
        Ok(())
    }

    /// Conversion options with file values laid over the defaults
    pub fn convert_options(&self) -> ConvertOptions {
        let mut options = ConvertOptions::default();
        self.apply(&mut options);
        options
    }

    /// Overwrite the fields this file sets
    pub fn apply(&self, options: &mut ConvertOptions) {
        if let Some(format) = self.parse.format {
            options.format = Some(format);
        }
        if let Some(window) = self.parse.detection_window {
            options.parse_options.detection_window = window;
        }
        if let Some(strict) = self.parse.strict_references {
            options.parse_options.strict_references = strict;
        }
        if let Some(provider) = &self.output.provider {
            options.emitter_options.provider = provider.clone();
        }
        if let Some(scheme) = &self.output.scheme {
            options.emitter_options.scheme = scheme.clone();
        }
        if let Some(comments) = self.output.comments {
            options.emitter_options.include_comments = comments;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_keeps_defaults() {
        let settings = Settings::from_toml_str("").unwrap();
        assert_eq!(settings, Settings::default());

        let options = settings.convert_options();
        assert_eq!(options.format, None);
        assert_eq!(options.parse_options.detection_window, 100);
        assert_eq!(options.emitter_options.provider, "nacoscs");
        assert_eq!(options.emitter_options.scheme, "http");
        assert!(options.emitter_options.include_comments);
    }

    #[test]
    fn test_full_file() {
        let settings = Settings::from_toml_str(
            r#"
[parse]
format = "f5"
detection_window = 50
strict_references = true

[output]
provider = "file"
scheme = "https"
comments = false
directory = "out"
"#,
        )
        .unwrap();

        assert_eq!(settings.output.directory, Some(PathBuf::from("out")));

        let options = settings.convert_options();
        assert_eq!(options.format, Some(SourceFormat::F5));
        assert_eq!(options.parse_options.detection_window, 50);
        assert!(options.parse_options.strict_references);
        assert_eq!(options.emitter_options.provider, "file");
        assert_eq!(options.emitter_options.scheme, "https");
        assert!(!options.emitter_options.include_comments);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = Settings::from_toml_str("[output]\nprovder = \"x\"\n").unwrap_err();
        assert!(matches!(err, SettingsError::Parse(_)));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = Settings::from_toml_str("[parse]\ndetection_window = 0\n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid setting `parse.detection_window`: must be at least 1"
        );

        let err = Settings::from_toml_str("[output]\nprovider = \"a@b\"\n").unwrap_err();
        assert!(matches!(err, SettingsError::Invalid { field: "output.provider", .. }));

        let err = Settings::from_toml_str("[output]\nscheme = \"1http\"\n").unwrap_err();
        assert!(matches!(err, SettingsError::Invalid { field: "output.scheme", .. }));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::from_file(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, SettingsError::Read { .. }));
    }
}
