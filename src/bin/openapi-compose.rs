//! OpenAPI Compose CLI
//!
//! Command-line interface for resolving schema composition in OpenAPI
//! documents and linting them.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use openapi_compose::{
    compose_document, compose_schema_at, lint, load_document_auto, ComposeOptions, ComposeReport,
    ErrorPolicy, FileStatus, Severity,
};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "openapi-compose")]
#[command(about = "Resolve allOf/oneOf/anyOf composition in OpenAPI schemas")]
#[command(version)]
struct Cli {
    /// Log composition steps to stderr (RUST_LOG overrides)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compose every schema in a document and print the result
    Compose {
        /// Document source: file path or URL (http:// or https://)
        source: String,

        /// Only compose the schema at this JSON pointer (e.g. #/components/schemas/Pet)
        #[arg(long)]
        pointer: Option<String>,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,

        /// Leave failing schemas as declared and report them instead of stopping
        #[arg(long)]
        keep_going: bool,
    },

    /// Lint documents for errors (syntax, broken refs, composition conflicts)
    Lint {
        /// File or directory to lint
        path: PathBuf,

        /// Output format: text (default) or json
        #[arg(long, default_value = "text")]
        format: String,

        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,

        /// Suppress progress output, only show errors
        #[arg(long, short)]
        quiet: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Compose {
            source,
            pointer,
            output,
            pretty,
            keep_going,
        } => run_compose(&source, pointer.as_deref(), output, pretty, keep_going),

        Commands::Lint {
            path,
            format,
            strict,
            quiet,
        } => run_lint(&path, &format, strict, quiet),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn setup_tracing(verbose: bool) {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(false)
        .init();
}

fn run_compose(
    source: &str,
    pointer: Option<&str>,
    output: Option<PathBuf>,
    pretty: bool,
    keep_going: bool,
) -> Result<(), u8> {
    let document = load_document_auto(source).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let policy = if keep_going {
        ErrorPolicy::Skip
    } else {
        ErrorPolicy::Abort
    };
    let options = ComposeOptions::new().policy(policy);

    let report = match pointer {
        Some(pointer) => compose_schema_at(&document, pointer, &options),
        None => compose_document(&document, &options),
    }
    .map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    report_diagnostics(&report);

    let json_output = if pretty {
        serde_json::to_string_pretty(&report.document)
    } else {
        serde_json::to_string(&report.document)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    match output {
        Some(path) => {
            std::fs::write(&path, &json_output).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", json_output);
        }
    }

    if report.has_errors() {
        Err(2)
    } else {
        Ok(())
    }
}

fn report_diagnostics(report: &ComposeReport) {
    for diag in &report.diagnostics {
        let label = match diag.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        eprintln!("{}[{}]: {} - {}", label, diag.code, diag.path, diag.message);
    }
}

fn run_lint(path: &Path, format: &str, strict: bool, quiet: bool) -> Result<(), u8> {
    if !path.exists() {
        eprintln!("Error: path not found: {}", path.display());
        return Err(2);
    }

    let result = lint(path, strict);

    if format == "json" {
        let json = serde_json::to_string_pretty(&result).map_err(|e| {
            eprintln!("Error serializing output: {}", e);
            2u8
        })?;
        println!("{}", json);
    } else {
        if !quiet {
            println!("Linting {} ...\n", path.display());
        }

        for file_result in &result.results {
            let status_icon = match file_result.status {
                FileStatus::Ok => "\x1b[32m✓\x1b[0m",
                FileStatus::Warning => "\x1b[33m⚠\x1b[0m",
                FileStatus::Error => "\x1b[31m✗\x1b[0m",
            };

            if !quiet || file_result.status != FileStatus::Ok {
                println!("  {} {}", status_icon, file_result.file.display());
            }

            for diag in &file_result.diagnostics {
                let (color, label) = match diag.severity {
                    Severity::Error => ("\x1b[31m", "error"),
                    Severity::Warning => ("\x1b[33m", "warning"),
                };
                if !quiet || diag.severity == Severity::Error {
                    println!(
                        "    {}{}[{}]\x1b[0m: {} - {}",
                        color, label, diag.code, diag.path, diag.message
                    );
                }
            }
        }

        println!();
        if result.is_ok() && (!strict || result.warnings == 0) {
            println!(
                "\x1b[32m✓ {} files checked, all passed\x1b[0m",
                result.files_checked
            );
        } else {
            println!(
                "\x1b[31m✗ {} files checked: {} passed, {} failed ({} errors, {} warnings)\x1b[0m",
                result.files_checked, result.passed, result.failed, result.errors, result.warnings
            );
        }
    }

    if result.is_ok() && (!strict || result.warnings == 0) {
        Ok(())
    } else {
        Err(1)
    }
}
