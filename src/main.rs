use clap::Parser;
use colored::*;
use std::io::{self, Read};
use std::path::Path;
use std::process;
use traefik_migrate::cli::{Cli, ColorChoice, Commands, ConvertArgs, DetectArgs, SourceArgs, VerifyArgs};
use traefik_migrate::ir::{Diagnostics, Severity};
use traefik_migrate::settings::Settings;
use traefik_migrate::{convert, convert_reader, verify, verify_against, write_output, ConvertOptions, ConversionResult, ParserRegistry};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() {
    let cli = Cli::parse();

    match cli.color {
        ColorChoice::Always => colored::control::set_override(true),
        ColorChoice::Never => colored::control::set_override(false),
        ColorChoice::Auto => {}
    }

    init_logger(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Convert(args) => run_convert(args, cli.verbose, cli.quiet),
        Commands::Detect(args) => run_detect(args),
        Commands::Verify(args) => run_verify(args, cli.verbose, cli.quiet),
    };

    match result {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}

/// Log to stderr; `RUST_LOG` takes precedence over the verbosity flags
fn init_logger(verbose: u8, quiet: bool) {
    let default_directive = match (quiet, verbose) {
        (true, _) => "traefik_migrate=error",
        (false, 0) => "traefik_migrate=warn",
        (false, 1) => "traefik_migrate=info",
        (false, _) => "traefik_migrate=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();
}

fn run_convert(args: ConvertArgs, verbose: u8, quiet: bool) -> Result<bool, String> {
    let settings = load_settings(&args.source)?;
    let options = args.options(&settings);
    let result = convert_source(&args.source, options)?;

    if !quiet {
        print_diagnostics(&result.diagnostics, verbose);
    }

    if args.dry_run {
        if !quiet {
            eprintln!("{}", "Dry run - would write:".yellow());
            eprintln!("--- {}", traefik_migrate::emitter::SERVICES_FILE);
        }
        print!("{}", result.services_yaml);
        if !quiet {
            eprintln!("--- {}", traefik_migrate::emitter::MAPPING_FILE);
        }
        print!("{}", result.mapping_yaml);
        return Ok(true);
    }

    let dir = args.output_dir(&settings);
    let written = write_output(&result, &dir).map_err(|e| e.to_string())?;

    if !quiet {
        for path in &written {
            println!("{} {}", "Wrote".green().bold(), path.display());
        }
        println!(
            "{} {} configuration from {}",
            "Converted".green().bold(),
            result.source_format,
            args.source.input.display()
        );
    }

    Ok(true)
}

fn run_detect(args: DetectArgs) -> Result<bool, String> {
    let content = if args.input == Path::new("-") {
        read_stdin()?
    } else {
        std::fs::read_to_string(&args.input).map_err(|e| format!("Failed to read {}: {}", args.input.display(), e))?
    };

    let registry = ParserRegistry::new();
    let detection = registry.detect(&content, args.detection_window);

    if args.json {
        let scores: serde_json::Map<String, serde_json::Value> = detection
            .scores
            .iter()
            .map(|(format, score)| (format.to_string(), serde_json::Value::from(*score)))
            .collect();
        let output = serde_json::json!({
            "file": args.input.display().to_string(),
            "format": detection.format.map(|f| f.to_string()),
            "scores": scores,
            "matched": detection.matched,
        });
        let rendered = serde_json::to_string_pretty(&output).map_err(|e| e.to_string())?;
        println!("{}", rendered);
        return Ok(detection.format.is_some());
    }

    match detection.format {
        Some(format) => {
            println!("{}", format);
            Ok(true)
        }
        None => Err("Could not detect configuration format".to_string()),
    }
}

fn run_verify(args: VerifyArgs, verbose: u8, quiet: bool) -> Result<bool, String> {
    let settings = load_settings(&args.source)?;
    let mut options = args.options(&settings);
    // Reference problems are reported below rather than aborting the run
    options.parse_options.strict_references = false;
    let emitter_options = options.emitter_options.clone();
    let result = convert_source(&args.source, options)?;

    if verbose > 0 && !quiet {
        print_diagnostics(&result.diagnostics, verbose);
    }

    let issues = verify::check_references(&result.config);
    for issue in &issues {
        println!("{}: {}", "reference".yellow(), issue);
    }
    let mut ok = issues.is_empty() || !args.output_args.strict;

    if let Some(dir) = &args.against {
        let report = verify_against(&result, dir, &emitter_options).map_err(|e| e.to_string())?;
        if report.is_clean() {
            if !quiet {
                println!("{} output matches {}", "OK".green().bold(), dir.display());
            }
        } else {
            print!("{}", report);
            println!(
                "{} {} difference(s) against {}",
                "Mismatch:".red().bold(),
                report.difference_count(),
                dir.display()
            );
            ok = false;
        }
    } else if issues.is_empty() && !quiet {
        println!("{} no reference issues", "OK".green().bold());
    }

    Ok(ok)
}

fn load_settings(source: &SourceArgs) -> Result<Settings, String> {
    source.settings().map_err(|e| e.to_string())
}

fn convert_source(source: &SourceArgs, options: ConvertOptions) -> Result<ConversionResult, String> {
    if source.is_stdin() {
        convert_reader(io::stdin().lock(), Path::new("<stdin>"), options).map_err(|e| e.to_string())
    } else {
        if !source.input.exists() {
            return Err(format!("File not found: {}", source.input.display()));
        }
        convert(&source.input, options).map_err(|e| e.to_string())
    }
}

fn read_stdin() -> Result<String, String> {
    let mut content = String::new();
    io::stdin()
        .read_to_string(&mut content)
        .map_err(|e| format!("Failed to read stdin: {}", e))?;
    Ok(content)
}

fn print_diagnostics(diagnostics: &Diagnostics, verbose: u8) {
    for warning in &diagnostics.warnings {
        let prefix = match warning.severity {
            Severity::Info => "info".blue(),
            Severity::Warning => "warning".yellow(),
        };

        eprintln!("{}: {}", prefix, warning.message);
        if let Some(loc) = &warning.source_location {
            eprintln!("  --> {}", loc);
        }
        eprintln!("  | {}", warning.source_directive);

        if let Some(suggestion) = &warning.suggestion {
            eprintln!("  = {}: {}", "suggestion".green(), suggestion);
        }
        eprintln!();
    }

    if verbose > 0 && !diagnostics.skipped.is_empty() {
        eprintln!("{}", "Skipped items:".yellow());
        for skipped in &diagnostics.skipped {
            match &skipped.source_location {
                Some(loc) => eprintln!("  - {} ({}) at {}", skipped.directive, skipped.reason, loc),
                None => eprintln!("  - {} ({})", skipped.directive, skipped.reason),
            }
        }
        eprintln!();
    }

    if verbose > 0 {
        eprintln!("{}", "Conversion summary:".bold());
        eprintln!("  Converted: {} items", diagnostics.converted.len());
        eprintln!("  Warnings: {}", diagnostics.warnings.len());
        eprintln!("  Skipped: {}", diagnostics.skipped.len());
    }
}
