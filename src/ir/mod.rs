//! Intermediate Representation types for load-balancer configuration
//!
//! Both source dialects fold into [`LoadBalancerConfig`], which the
//! Traefik and mapping emitters consume without knowing where it came from.

mod model;

pub use model::*;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Source configuration dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    /// Citrix NetScaler command language (`add server ...`, `bind lb vserver ...`)
    NetScaler,
    /// F5 BIG-IP tmsh brace-delimited configuration (`ltm pool ... { }`)
    F5,
}

impl std::fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NetScaler => write!(f, "netscaler"),
            Self::F5 => write!(f, "f5"),
        }
    }
}

/// Complete conversion result
#[derive(Debug, Clone)]
pub struct ConversionResult {
    /// Source format that was parsed
    pub source_format: SourceFormat,
    /// Original file path(s)
    pub source_files: Vec<PathBuf>,
    /// The parsed configuration
    pub config: LoadBalancerConfig,
    /// Generated Traefik services document
    pub services_yaml: String,
    /// Generated VIP mapping document
    pub mapping_yaml: String,
    /// Conversion diagnostics
    pub diagnostics: Diagnostics,
}

/// Conversion diagnostics and warnings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Successfully converted items
    pub converted: Vec<ConvertedItem>,
    /// Items that couldn't be fully converted
    pub warnings: Vec<ConversionWarning>,
    /// Items that were completely skipped
    pub skipped: Vec<SkippedItem>,
}

impl Diagnostics {
    /// Record a warning without a source location
    pub fn warn(&mut self, directive: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConversionWarning {
            severity: Severity::Warning,
            source_location: None,
            source_directive: directive.into(),
            message: message.into(),
            suggestion: None,
        });
    }
}

/// Successfully converted item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertedItem {
    pub item_type: String,
    pub name: String,
    pub source_location: Option<SourceLocation>,
}

/// Conversion warning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionWarning {
    pub severity: Severity,
    pub source_location: Option<SourceLocation>,
    pub source_directive: String,
    pub message: String,
    pub suggestion: Option<String>,
}

/// Warning severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
}

/// Skipped item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedItem {
    pub directive: String,
    pub reason: String,
    pub source_location: Option<SourceLocation>,
}

/// Source location reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: PathBuf,
    pub line: usize,
}

impl SourceLocation {
    pub fn new(file: PathBuf, line: usize) -> Self {
        Self { file, line }
    }
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.file.display(), self.line)
    }
}
