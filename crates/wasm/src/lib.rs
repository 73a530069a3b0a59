//! WebAssembly bindings for traefik-migrate
//!
//! Runs the converter in the browser on pasted configuration text.

use serde::Serialize;
use std::path::Path;
use wasm_bindgen::prelude::*;

use traefik_migrate::{
    convert_string, emitter::EmitterOptions, ir::ConversionWarning, parsers::ParserRegistry,
    ConvertError, ConvertOptions, ParseOptions, SourceFormat,
};

/// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn init_panic_hook() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Get the version of the WASM module
#[wasm_bindgen]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Get list of supported source formats
#[wasm_bindgen]
pub fn get_supported_formats() -> JsValue {
    serde_wasm_bindgen::to_value(&supported_formats()).unwrap_or(JsValue::NULL)
}

fn supported_formats() -> Vec<String> {
    ParserRegistry::new()
        .available_formats()
        .iter()
        .map(ToString::to_string)
        .collect()
}

/// Result of format detection
#[derive(Serialize)]
struct DetectResult {
    format: Option<String>,
    scores: Vec<(String, u32)>,
    signatures_matched: Vec<String>,
}

/// Detect the format of a configuration string
#[wasm_bindgen]
pub fn detect_format(config: &str) -> JsValue {
    serde_wasm_bindgen::to_value(&detect(config)).unwrap_or(JsValue::NULL)
}

fn detect(config: &str) -> DetectResult {
    let detection = ParserRegistry::new().detect(config, ParseOptions::default().detection_window);
    DetectResult {
        format: detection.format.map(|f| f.to_string()),
        scores: detection
            .scores
            .iter()
            .map(|(format, score)| (format.to_string(), *score))
            .collect(),
        signatures_matched: detection.matched.iter().map(|s| s.to_string()).collect(),
    }
}

/// Result of conversion
#[derive(Serialize)]
struct ConvertResult {
    success: bool,
    services: Option<String>,
    mapping: Option<String>,
    format: Option<String>,
    error: Option<String>,
    warnings: Vec<Warning>,
}

/// Warning from conversion
#[derive(Serialize)]
struct Warning {
    severity: String,
    message: String,
    source_directive: Option<String>,
    suggestion: Option<String>,
    line: Option<usize>,
}

impl From<&ConversionWarning> for Warning {
    fn from(w: &ConversionWarning) -> Self {
        Self {
            severity: format!("{:?}", w.severity).to_lowercase(),
            message: w.message.clone(),
            source_directive: Some(w.source_directive.clone()),
            suggestion: w.suggestion.clone(),
            line: w.source_location.as_ref().map(|l| l.line),
        }
    }
}

/// Convert a configuration string to Traefik services and VIP mapping
///
/// # Arguments
/// * `config` - The source configuration content
/// * `format` - Optional format hint ("netscaler" or "f5"). Auto-detects if not provided.
///
/// # Returns
/// A JavaScript object with:
/// - `success`: boolean indicating if conversion succeeded
/// - `services`: the traefik-services.yaml document (if successful)
/// - `mapping`: the mapping.yaml document (if successful)
/// - `format`: the detected/used source format
/// - `error`: error message (if failed)
/// - `warnings`: array of warnings from conversion
#[wasm_bindgen]
pub fn convert(config: &str, format: Option<String>) -> JsValue {
    serde_wasm_bindgen::to_value(&run_convert(config, format)).unwrap_or(JsValue::NULL)
}

fn run_convert(config: &str, format: Option<String>) -> ConvertResult {
    let options = ConvertOptions {
        format: format.as_deref().and_then(parse_format),
        parse_options: ParseOptions::default(),
        emitter_options: EmitterOptions::default(),
    };

    match convert_string(config, Path::new("config"), options) {
        Ok(result) => ConvertResult {
            success: true,
            format: Some(result.source_format.to_string()),
            warnings: result.diagnostics.warnings.iter().map(Warning::from).collect(),
            services: Some(result.services_yaml),
            mapping: Some(result.mapping_yaml),
            error: None,
        },
        Err(e) => ConvertResult {
            success: false,
            services: None,
            mapping: None,
            format,
            error: Some(e.to_string()),
            warnings: vec![],
        },
    }
}

/// Result of validation
#[derive(Serialize)]
struct ValidateResult {
    valid: bool,
    format: Option<String>,
    errors: Vec<ValidationError>,
    warnings: Vec<Warning>,
}

/// Validation error
#[derive(Serialize)]
struct ValidationError {
    message: String,
    line: Option<usize>,
    column: Option<usize>,
}

/// Validate a configuration string, treating reference problems as errors
///
/// # Arguments
/// * `config` - The source configuration content
/// * `format` - Optional format hint
///
/// # Returns
/// A JavaScript object with validation results
#[wasm_bindgen]
pub fn validate(config: &str, format: Option<String>) -> JsValue {
    serde_wasm_bindgen::to_value(&run_validate(config, format)).unwrap_or(JsValue::NULL)
}

fn run_validate(config: &str, format: Option<String>) -> ValidateResult {
    let options = ConvertOptions {
        format: format.as_deref().and_then(parse_format),
        parse_options: ParseOptions {
            strict_references: true,
            ..Default::default()
        },
        emitter_options: EmitterOptions::default(),
    };

    match convert_string(config, Path::new("config"), options) {
        Ok(result) => ValidateResult {
            valid: true,
            format: Some(result.source_format.to_string()),
            errors: vec![],
            warnings: result.diagnostics.warnings.iter().map(Warning::from).collect(),
        },
        Err(e) => {
            let (line, column) = match &e {
                ConvertError::Parse(parse_error) => (parse_error.line(), parse_error.column()),
                _ => (None, None),
            };
            ValidateResult {
                valid: false,
                format,
                errors: vec![ValidationError {
                    message: e.to_string(),
                    line,
                    column,
                }],
                warnings: vec![],
            }
        }
    }
}

/// Parse format string to SourceFormat
fn parse_format(format: &str) -> Option<SourceFormat> {
    match format.to_lowercase().as_str() {
        "netscaler" | "citrix" => Some(SourceFormat::NetScaler),
        "f5" | "bigip" => Some(SourceFormat::F5),
        _ => None,
    }
}
