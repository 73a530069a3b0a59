//! Load balancer to Traefik migration
//!
//! Convert Citrix NetScaler and F5 BIG-IP load-balancer configurations into
//! a Traefik file-provider services document and a VIP mapping document.

pub mod cli;
pub mod emitter;
pub mod ir;
pub mod parsers;
pub mod settings;
pub mod verify;

pub use ir::{ConversionResult, Diagnostics, LoadBalancerConfig, SourceFormat};
pub use parsers::{ParseContext, ParseOptions, Parser, ParserRegistry};

use emitter::{EmitError, EmitterOptions, MappingConfig, TraefikConfig, MAPPING_FILE, SERVICES_FILE};
use ir::{ConversionWarning, Severity};
use parsers::netscaler::NetScalerParser;
use parsers::{ParseError, ParseOutput};
use settings::SettingsError;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;
use verify::{DiffReport, VerifyError};

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Failed to read file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to write {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to detect configuration format")]
    FormatDetection,

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Emission error: {0}")]
    Emission(#[from] EmitError),

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Verification error: {0}")]
    Verify(#[from] VerifyError),
}

pub type Result<T> = std::result::Result<T, ConvertError>;

/// Options for conversion
#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    /// Source format (auto-detect if None)
    pub format: Option<SourceFormat>,
    /// Parser options
    pub parse_options: ParseOptions,
    /// Emitter options
    pub emitter_options: EmitterOptions,
}

/// Convert a configuration file
pub fn convert(path: &Path, options: ConvertOptions) -> Result<ConversionResult> {
    let content = std::fs::read_to_string(path)?;
    convert_string(&content, path, options)
}

/// Convert a configuration read from a stream such as stdin.
/// `path` only labels diagnostics.
///
/// An explicit NetScaler format is parsed line by line as the stream is
/// read; otherwise the input is buffered for dialect detection.
pub fn convert_reader<R: Read>(mut reader: R, path: &Path, options: ConvertOptions) -> Result<ConversionResult> {
    if options.format == Some(SourceFormat::NetScaler) {
        let output = NetScalerParser::parse_reader(BufReader::new(reader), path)?;
        return finish(output, SourceFormat::NetScaler, path, &options);
    }

    let mut content = String::new();
    reader.read_to_string(&mut content)?;
    convert_string(&content, path, options)
}

/// Convert a configuration string
pub fn convert_string(content: &str, path: &Path, options: ConvertOptions) -> Result<ConversionResult> {
    let registry = ParserRegistry::new();
    let format = select_format(&registry, content, &options);
    let parser = registry
        .get_parser(format)
        .ok_or(ConvertError::FormatDetection)?;

    let mut ctx = ParseContext::new(path.to_path_buf(), content.to_string());
    ctx.options = options.parse_options.clone();

    let output = parser.parse(&ctx)?;
    finish(output, format, path, &options)
}

/// Check references and generate both documents from a parsed configuration
fn finish(
    mut output: ParseOutput,
    format: SourceFormat,
    path: &Path,
    options: &ConvertOptions,
) -> Result<ConversionResult> {
    check_references(&output.config, &mut output.diagnostics, &options.parse_options)?;

    let emitter_options = &options.emitter_options;
    let services = TraefikConfig::generate(&output.config, emitter_options, &mut output.diagnostics);
    let mapping = MappingConfig::generate(&output.config, emitter_options);
    let services_yaml = services.render(emitter_options)?;
    let mapping_yaml = mapping.render(emitter_options)?;

    tracing::info!(
        format = %format,
        services = services.services.len(),
        mappings = mapping.entries.len(),
        warnings = output.diagnostics.warnings.len(),
        "conversion complete"
    );

    Ok(ConversionResult {
        source_format: format,
        source_files: vec![path.to_path_buf()],
        config: output.config,
        services_yaml,
        mapping_yaml,
        diagnostics: output.diagnostics,
    })
}

/// Explicit format, else detection, else NetScaler
fn select_format(registry: &ParserRegistry, content: &str, options: &ConvertOptions) -> SourceFormat {
    if let Some(format) = options.format {
        return format;
    }

    match registry.detect(content, options.parse_options.detection_window).format {
        Some(format) => {
            tracing::debug!(%format, "detected configuration format");
            format
        }
        None => {
            tracing::debug!("no format indicators found, assuming netscaler");
            SourceFormat::NetScaler
        }
    }
}

/// Record reference issues as warnings, or fail when references are strict
fn check_references(
    config: &LoadBalancerConfig,
    diagnostics: &mut Diagnostics,
    options: &ParseOptions,
) -> Result<()> {
    let issues = verify::check_references(config);
    if issues.is_empty() {
        return Ok(());
    }

    if options.strict_references {
        let messages: Vec<String> = issues.iter().map(ToString::to_string).collect();
        return Err(ConvertError::Validation(messages.join("; ")));
    }

    for issue in issues {
        tracing::warn!("{}", issue);
        diagnostics.warnings.push(ConversionWarning {
            severity: Severity::Warning,
            source_location: None,
            source_directive: "reference".to_string(),
            message: issue.to_string(),
            suggestion: None,
        });
    }

    Ok(())
}

/// Write both documents into `dir`, creating it if needed
pub fn write_output(result: &ConversionResult, dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir).map_err(|source| ConvertError::FileWrite {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut written = Vec::with_capacity(2);
    for (name, content) in [
        (SERVICES_FILE, &result.services_yaml),
        (MAPPING_FILE, &result.mapping_yaml),
    ] {
        let path = dir.join(name);
        std::fs::write(&path, content).map_err(|source| ConvertError::FileWrite {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "wrote output file");
        written.push(path);
    }

    Ok(written)
}

/// Compare a conversion against output previously written to `dir`
pub fn verify_against(result: &ConversionResult, dir: &Path, options: &EmitterOptions) -> Result<DiffReport> {
    let mut scratch = Diagnostics::default();
    let services = TraefikConfig::generate(&result.config, options, &mut scratch);
    let mapping = MappingConfig::generate(&result.config, options);
    Ok(verify::diff_against_dir(&services, &mapping, dir)?)
}

/// Default output directory: local time as `YYYYMMDDHHMM`
pub fn timestamped_output_dir() -> PathBuf {
    PathBuf::from(chrono::Local::now().format("%Y%m%d%H%M").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const NETSCALER: &str = "add server web01 10.1.2.121\n\
                             add lb vserver app:80 HTTP 10.0.28.130 80\n\
                             bind serviceGroup app:80 web01 80\n";

    #[test]
    fn test_convert_string_netscaler() {
        let result = convert_string(NETSCALER, Path::new("ns.conf"), ConvertOptions::default()).unwrap();
        assert_eq!(result.source_format, SourceFormat::NetScaler);
        assert_eq!(
            result.services_yaml,
            "http:\n  services:\n    app:80:\n      loadBalancer:\n        servers:\n          - url: http://10.1.2.121:80\n"
        );
        assert_eq!(result.mapping_yaml, "\"10.0.28.130:80\": \"app:80@nacoscs\"\n");
    }

    #[test]
    fn test_unknown_format_falls_back_to_netscaler() {
        let result = convert_string("", Path::new("empty.conf"), ConvertOptions::default()).unwrap();
        assert_eq!(result.source_format, SourceFormat::NetScaler);
        assert_eq!(result.services_yaml, "http:\n  services:\n");
        assert_eq!(result.mapping_yaml, "");
    }

    #[test]
    fn test_explicit_format_bypasses_detection() {
        let options = ConvertOptions {
            format: Some(SourceFormat::F5),
            ..Default::default()
        };
        let result = convert_string(NETSCALER, Path::new("ns.conf"), options).unwrap();
        assert_eq!(result.source_format, SourceFormat::F5);
        assert!(result.config.is_empty());
    }

    #[test]
    fn test_parse_error_propagates() {
        let err = convert_string("add server web01\n", Path::new("ns.conf"), ConvertOptions::default())
            .unwrap_err();
        assert!(matches!(err, ConvertError::Parse(ParseError::Line { line: 1, .. })));
    }

    #[test]
    fn test_reference_issues() {
        let content = "add server web01 10.0.0.1\nbind serviceGroup sg web09 80\n";

        let result = convert_string(content, Path::new("ns.conf"), ConvertOptions::default()).unwrap();
        let messages: Vec<&str> = result
            .diagnostics
            .warnings
            .iter()
            .map(|w| w.message.as_str())
            .collect();
        assert!(messages.contains(&"service group `sg` binds undefined server `web09`"));

        let mut options = ConvertOptions::default();
        options.parse_options.strict_references = true;
        let err = convert_string(content, Path::new("ns.conf"), options).unwrap_err();
        assert!(matches!(err, ConvertError::Validation(_)));
    }

    #[test]
    fn test_convert_reader_and_write_output() {
        let result = convert_reader(
            std::io::Cursor::new(NETSCALER),
            Path::new("<stdin>"),
            ConvertOptions::default(),
        )
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested").join("out");
        let written = write_output(&result, &out).unwrap();
        assert_eq!(written, vec![out.join(SERVICES_FILE), out.join(MAPPING_FILE)]);
        assert_eq!(
            std::fs::read_to_string(out.join(MAPPING_FILE)).unwrap(),
            result.mapping_yaml
        );

        let report = verify_against(&result, &out, &EmitterOptions::default()).unwrap();
        assert!(report.is_clean());
    }

    #[test]
    fn test_timestamped_output_dir() {
        let dir = timestamped_output_dir();
        let name = dir.to_string_lossy();
        assert_eq!(name.len(), 12);
        assert!(name.chars().all(|c| c.is_ascii_digit()));
    }
}
