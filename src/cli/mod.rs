//! CLI argument definitions and option merging

use crate::ir::SourceFormat;
use crate::settings::{Settings, SettingsError};
use crate::ConvertOptions;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

/// Convert NetScaler and F5 load-balancer configurations to Traefik
#[derive(Parser)]
#[command(name = "traefik-migrate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output
    #[arg(long, value_enum, default_value = "auto", global = true)]
    pub color: ColorChoice,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert a configuration into traefik-services.yaml and mapping.yaml
    Convert(ConvertArgs),

    /// Detect the dialect of a configuration file
    Detect(DetectArgs),

    /// Check references and compare against previously generated output
    Verify(VerifyArgs),
}

/// Input selection shared by every subcommand
#[derive(clap::Args)]
pub struct SourceArgs {
    /// Input file, or `-` for stdin
    pub input: PathBuf,

    /// Source format (auto-detect if not specified)
    #[arg(short, long, value_enum)]
    pub format: Option<SourceFormatArg>,

    /// TOML settings file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Number of leading lines used for format detection
    #[arg(long)]
    pub detection_window: Option<usize>,
}

impl SourceArgs {
    pub fn is_stdin(&self) -> bool {
        self.input == Path::new("-")
    }

    /// Load the settings file, if one was given
    pub fn settings(&self) -> Result<Settings, SettingsError> {
        match &self.config {
            Some(path) => Settings::from_file(path),
            None => Ok(Settings::default()),
        }
    }

    fn apply(&self, options: &mut ConvertOptions) {
        if let Some(format) = self.format {
            options.format = Some(format.into());
        }
        if let Some(window) = self.detection_window {
            options.parse_options.detection_window = window.max(1);
        }
    }
}

/// Flags that shape the generated documents
#[derive(clap::Args)]
pub struct OutputArgs {
    /// Provider suffix for mapping values (`name@provider`)
    #[arg(long)]
    pub provider: Option<String>,

    /// URL scheme for backend servers
    #[arg(long)]
    pub scheme: Option<String>,

    /// Omit comment lines from the output
    #[arg(long)]
    pub no_comments: bool,

    /// Fail on duplicate or dangling references
    #[arg(long)]
    pub strict: bool,
}

impl OutputArgs {
    fn apply(&self, options: &mut ConvertOptions) {
        if let Some(provider) = &self.provider {
            options.emitter_options.provider = provider.clone();
        }
        if let Some(scheme) = &self.scheme {
            options.emitter_options.scheme = scheme.clone();
        }
        if self.no_comments {
            options.emitter_options.include_comments = false;
        }
        if self.strict {
            options.parse_options.strict_references = true;
        }
    }
}

#[derive(clap::Args)]
pub struct ConvertArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub output_args: OutputArgs,

    /// Output directory (defaults to a YYYYMMDDHHMM timestamp)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print both documents instead of writing files
    #[arg(long)]
    pub dry_run: bool,
}

impl ConvertArgs {
    /// Settings file values, then command-line overrides
    pub fn options(&self, settings: &Settings) -> ConvertOptions {
        let mut options = settings.convert_options();
        self.source.apply(&mut options);
        self.output_args.apply(&mut options);
        options
    }

    /// `-o`, else the settings file directory, else a timestamp
    pub fn output_dir(&self, settings: &Settings) -> PathBuf {
        self.output
            .clone()
            .or_else(|| settings.output.directory.clone())
            .unwrap_or_else(crate::timestamped_output_dir)
    }
}

#[derive(clap::Args)]
pub struct DetectArgs {
    /// Input file, or `-` for stdin
    pub input: PathBuf,

    /// Number of leading lines to score
    #[arg(long, default_value = "100")]
    pub detection_window: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(clap::Args)]
pub struct VerifyArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub output_args: OutputArgs,

    /// Directory holding earlier traefik-services.yaml and mapping.yaml
    #[arg(long)]
    pub against: Option<PathBuf>,
}

impl VerifyArgs {
    pub fn options(&self, settings: &Settings) -> ConvertOptions {
        let mut options = settings.convert_options();
        self.source.apply(&mut options);
        self.output_args.apply(&mut options);
        options
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceFormatArg {
    Netscaler,
    F5,
}

impl From<SourceFormatArg> for SourceFormat {
    fn from(arg: SourceFormatArg) -> Self {
        match arg {
            SourceFormatArg::Netscaler => SourceFormat::NetScaler,
            SourceFormatArg::F5 => SourceFormat::F5,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Default)]
pub enum ColorChoice {
    #[default]
    Auto,
    Always,
    Never,
}
