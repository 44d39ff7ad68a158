use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use querygate_catalog::CatalogSnapshot;
use querygate_core::{Config, Diagnostic, Report, Severity};
use querygate_engine::{QueryError, QueryService};
use querygate_sql::DeclaredShape;

/// querygate - natural-language requests to validated read-only SQL
#[derive(Parser)]
#[command(name = "querygate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: querygate.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output and debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the schema metadata document
    Describe,

    /// Translate a request into a validated statement
    Translate {
        /// The request, in plain language
        text: String,

        /// Print the raw JSON report
        #[arg(long)]
        json: bool,

        /// Also write the JSON report to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate an externally produced SQL draft
    Validate {
        /// The SQL draft
        sql: String,

        /// Table the draft is declared to read
        #[arg(short, long)]
        table: String,

        /// Columns the draft is declared to use (repeatable; none means all)
        #[arg(long = "column")]
        columns: Vec<String>,
    },

    /// Load the schema source and list its warnings
    CheckSchema {
        /// Schema source to check instead of the configured one
        #[arg(short, long)]
        schema: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Credential variables may live in a local .env file
    dotenvy::dotenv().ok();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    let config = if let Some(config_path) = &cli.config {
        Config::from_file(config_path)?
    } else if Path::new("querygate.toml").exists() {
        Config::from_file(Path::new("querygate.toml"))?
    } else {
        if cli.verbose {
            eprintln!("{}", "No config file found, using defaults".yellow());
        }
        Config::default()
    };

    tracing::debug!(
        dialect = ?config.dialect,
        backends = config.backends.len(),
        "Configuration loaded"
    );

    match cli.command {
        Commands::Describe => describe_command(&config),
        Commands::Translate { text, json, output } => {
            translate_command(&config, &text, json, output.as_deref(), cli.verbose).await
        }
        Commands::Validate {
            sql,
            table,
            columns,
        } => validate_command(&config, &sql, &table, columns),
        Commands::CheckSchema { schema } => check_schema_command(&config, schema.as_deref()),
    }
}

fn build_service(config: &Config) -> Result<QueryService> {
    QueryService::from_config(config).context("Failed to start query service")
}

/// Describe command - print the metadata document as JSON
fn describe_command(config: &Config) -> Result<()> {
    let service = build_service(config)?;
    println!("{}", service.describe_schema().to_json()?);
    Ok(())
}

/// Translate command - run the full pipeline and print the report
async fn translate_command(
    config: &Config,
    text: &str,
    json: bool,
    output: Option<&Path>,
    verbose: bool,
) -> Result<()> {
    let service = build_service(config)?;

    let report = match service.translate(text).await {
        Ok(outcome) => outcome.report,
        Err(error) => {
            if !json {
                eprintln!("{} {}", "✗".red().bold(), error);
            }
            error.to_report()
        }
    };

    if let Some(path) = output {
        report.save_to_file(path)?;
        if verbose {
            eprintln!("{} {}", "Report saved to:".green(), path.display());
        }
    }

    if json {
        println!("{}", report.to_json()?);
    } else {
        print_report(&report);
    }

    if report.has_errors() {
        std::process::exit(1);
    }

    Ok(())
}

/// Validate command - check a draft against the catalog and a declaration
fn validate_command(config: &Config, sql: &str, table: &str, columns: Vec<String>) -> Result<()> {
    let service = build_service(config)?;
    let declared = DeclaredShape::new(table).with_columns(columns);

    match service.validate(sql, &declared) {
        Ok(statement) => {
            println!("{}", "✓ Statement is valid".green().bold());
            println!();
            println!("{}", statement.sql());
            if !statement.params().is_empty() {
                println!();
                println!("{}", "Parameters:".bold());
                for (i, value) in statement.params().iter().enumerate() {
                    println!("  {}: {}", i + 1, value);
                }
            }
            for note in statement.notes() {
                print_diagnostic(note);
            }
            Ok(())
        }
        Err(error) => {
            let report = QueryError::from(error).to_report();
            for diag in &report.diagnostics {
                print_diagnostic(diag);
            }
            std::process::exit(1);
        }
    }
}

/// Check-schema command - load the source and list warnings
fn check_schema_command(config: &Config, schema: Option<&Path>) -> Result<()> {
    let path = match schema {
        Some(path) => path.to_path_buf(),
        None => config
            .resolved_schema_path()
            .ok_or_else(|| anyhow::anyhow!("No schema_path in config and no --schema given"))?,
    };

    let catalog = querygate_catalog::load_file(&path)
        .with_context(|| format!("Schema source {} is invalid", path.display()))?;
    let snapshot = CatalogSnapshot::new(catalog);
    let catalog = snapshot.catalog();

    println!("{} {}", "Schema:".bold(), path.display());
    println!("{} {}", "Fingerprint:".bold(), catalog.fingerprint());
    println!();

    for table in catalog.tables() {
        println!("  {} ({} columns)", table.name.green(), table.columns.len());
        for group in catalog.alias_groups_for(&table.name) {
            println!("    {} {} values", group.dimension.cyan(), group.values.len());
        }
    }
    println!();
    println!("{} {}", "Aliases indexed:".bold(), snapshot.index().len());

    let warnings: Vec<&Diagnostic> = catalog
        .warnings()
        .iter()
        .chain(snapshot.index().warnings())
        .collect();

    if warnings.is_empty() {
        println!("{}", "✓ No issues found!".green().bold());
    } else {
        println!();
        println!("{}", "Warnings:".bold());
        for warning in warnings {
            print_diagnostic(warning);
        }
    }

    Ok(())
}

fn print_diagnostic(diag: &Diagnostic) {
    let severity = match diag.severity {
        Severity::Error => "ERROR".red().bold(),
        Severity::Warn => "WARN".yellow().bold(),
        Severity::Info => "INFO".cyan(),
    };

    println!("  [{}] {}: {}", severity, diag.code, diag.message);

    if let Some(loc) = &diag.location {
        match (loc.start, loc.end) {
            (Some(start), Some(end)) => println!("    at {}[{}..{}]", loc.source, start, end),
            _ => println!("    at {}", loc.source),
        }
    }

    if let Some(expected) = &diag.expected {
        println!("    Expected: {}", expected);
    }
    if let Some(actual) = &diag.actual {
        println!("    Actual:   {}", actual);
    }
}

fn print_report(report: &Report) {
    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", "Translation Report".bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    if let Some(backend) = &report.backend {
        println!("{} {}", "Backend:".bold(), backend.green());
    }
    println!("{} {}", "Attempts:".bold(), report.summary.attempts);
    println!();

    if let Some(sql) = &report.sql {
        println!("{}", "Statement:".bold());
        println!("  {}", sql);
        if !report.params.is_empty() {
            println!();
            println!("{}", "Parameters:".bold());
            for (i, value) in report.params.iter().enumerate() {
                println!("  {}: {}", i + 1, value);
            }
        }
        println!();
    }

    if report.diagnostics.is_empty() {
        println!("{}", "✓ No issues found!".green().bold());
    } else {
        println!("{}", "Diagnostics:".bold());
        for diag in &report.diagnostics {
            print_diagnostic(diag);
        }
    }

    println!();
    println!("{}", "=".repeat(60).bright_blue());
}
