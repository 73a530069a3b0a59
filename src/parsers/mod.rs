//! Parsers for the supported load-balancer dialects

pub mod f5;
pub mod netscaler;

use crate::ir::{Diagnostics, LoadBalancerConfig, SourceFormat};
use netscaler::CommandError;
use regex::Regex;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: {source}")]
    Line {
        line: usize,
        #[source]
        source: CommandError,
    },

    #[error("invalid signature pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl ParseError {
    /// Source line of the failure, if known
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Line { line, .. } => Some(*line),
            _ => None,
        }
    }

    /// Source column of the failure, if known
    pub fn column(&self) -> Option<usize> {
        match self {
            Self::Line { source, .. } => source.column(),
            _ => None,
        }
    }
}

/// Result of parsing a configuration
#[derive(Debug)]
pub struct ParseOutput {
    pub config: LoadBalancerConfig,
    pub diagnostics: Diagnostics,
}

/// Input for a parse run
pub struct ParseContext {
    /// Source path (`<stdin>` for piped input)
    pub path: PathBuf,
    /// Complete source text
    pub content: String,
    /// Parser options
    pub options: ParseOptions,
}

impl ParseContext {
    pub fn new(path: PathBuf, content: String) -> Self {
        Self {
            path,
            content,
            options: ParseOptions::default(),
        }
    }
}

/// Parser options
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Number of leading lines scored during dialect detection
    pub detection_window: usize,
    /// Fail the conversion on dangling or duplicate references
    pub strict_references: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            detection_window: 100,
            strict_references: false,
        }
    }
}

/// Trait for source dialect parsers
pub trait Parser: Send + Sync {
    /// Returns the source format this parser handles
    fn format(&self) -> SourceFormat;

    /// Parse the configuration into the load-balancer model
    fn parse(&self, ctx: &ParseContext) -> Result<ParseOutput, ParseError>;

    /// Returns per-line signature patterns for dialect detection
    fn signatures(&self) -> &[FormatSignature];
}

/// Line pattern that counts towards a dialect during detection
#[derive(Debug, Clone)]
pub struct FormatSignature {
    /// Regex matched against each trimmed line
    pub pattern: &'static str,
    /// Score added per matching line
    pub weight: u32,
    /// Description of what this matches
    pub description: &'static str,
}

/// Outcome of scoring a configuration against every registered dialect
#[derive(Debug, Clone)]
pub struct Detection {
    /// Winning format, if any dialect scored
    pub format: Option<SourceFormat>,
    /// Score per registered format, in registration order
    pub scores: Vec<(SourceFormat, u32)>,
    /// Descriptions of the signatures that matched at least once
    pub matched: Vec<&'static str>,
}

/// Parser registry for managing dialect parsers
pub struct ParserRegistry {
    parsers: Vec<Box<dyn Parser>>,
}

impl ParserRegistry {
    pub fn new() -> Self {
        let mut registry = Self { parsers: vec![] };

        // NetScaler first: it is the fallback and wins ties
        registry.register(Box::new(netscaler::NetScalerParser::new()));
        registry.register(Box::new(f5::F5Parser::new()));

        registry
    }

    /// Register a parser
    pub fn register(&mut self, parser: Box<dyn Parser>) {
        self.parsers.push(parser);
    }

    /// Get parser for a specific format
    pub fn get_parser(&self, format: SourceFormat) -> Option<&dyn Parser> {
        self.parsers
            .iter()
            .find(|p| p.format() == format)
            .map(|p| p.as_ref())
    }

    /// Score the first `window` lines of `content` against each dialect's
    /// signatures. The highest positive score wins; ties go to the earlier
    /// registered parser.
    pub fn detect(&self, content: &str, window: usize) -> Detection {
        let compiled: Vec<(usize, &FormatSignature, Regex)> = self
            .parsers
            .iter()
            .enumerate()
            .flat_map(|(idx, parser)| parser.signatures().iter().map(move |sig| (idx, sig)))
            .filter_map(|(idx, sig)| match Regex::new(sig.pattern) {
                Ok(re) => Some((idx, sig, re)),
                Err(error) => {
                    tracing::warn!(
                        format = %self.parsers[idx].format(),
                        signature = sig.description,
                        %error,
                        "ignoring invalid detection signature"
                    );
                    None
                }
            })
            .collect();

        let mut scores = vec![0u32; self.parsers.len()];
        let mut matched: Vec<&'static str> = Vec::new();

        for line in content.lines().take(window) {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            for (idx, sig, re) in &compiled {
                if re.is_match(line) {
                    scores[*idx] += sig.weight;
                    if !matched.contains(&sig.description) {
                        matched.push(sig.description);
                    }
                }
            }
        }

        let mut best: Option<(usize, u32)> = None;
        for (idx, score) in scores.iter().enumerate() {
            if *score > 0 && best.map_or(true, |(_, s)| *score > s) {
                best = Some((idx, *score));
            }
        }

        let scores: Vec<(SourceFormat, u32)> = self
            .parsers
            .iter()
            .zip(scores)
            .map(|(p, score)| (p.format(), score))
            .collect();

        tracing::debug!(?scores, "dialect detection scores");

        Detection {
            format: best.map(|(idx, _)| self.parsers[idx].format()),
            scores,
            matched,
        }
    }

    /// Auto-detect the dialect and return the matching parser
    pub fn detect_format(&self, content: &str, window: usize) -> Option<&dyn Parser> {
        self.detect(content, window)
            .format
            .and_then(|format| self.get_parser(format))
    }

    /// List all available formats
    pub fn available_formats(&self) -> Vec<SourceFormat> {
        self.parsers.iter().map(|p| p.format()).collect()
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}
