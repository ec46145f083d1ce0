//! Deep Populate CLI
//!
//! Command-line interface for building populate directives, previewing the
//! request filter, linting schemas, and seeding content.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use deep_populate::{
    build_with, lint, load_schema_auto, ContentRequest, FilterConfig, FilterOutcome,
    PopulateFilter, PopulateOptions, Schema, Severity,
};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "deep-populate")]
#[command(about = "Schema-driven populate directives for Strapi-style content APIs")]
#[command(version)]
struct Cli {
    /// Log debug output (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the populate directive for a content type
    Populate {
        /// Schema export file or project directory
        schema: PathBuf,

        /// Content-type UID (e.g., api::page.page)
        uid: String,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,

        /// Skip hidden creator fields (createdBy, updatedBy)
        #[arg(long)]
        no_creator_fields: bool,
    },

    /// Run the request filter over a request and print the resulting query
    Filter {
        /// Schema export file or project directory
        schema: PathBuf,

        /// Request URL (e.g., /api/projects?locale=fr)
        url: String,

        /// Request method
        #[arg(long, short, default_value = "GET")]
        method: String,

        /// Extra query parameters as a JSON object
        #[arg(long)]
        query: Option<String>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Lint a schema for dangling references and cycles
    Lint {
        /// Schema export file or project directory
        schema: PathBuf,

        /// Output format: text (default) or json
        #[arg(long, default_value = "text")]
        format: String,

        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,
    },

    /// Upsert the entries of a seed manifest through the content API
    #[cfg(feature = "remote")]
    Seed {
        /// Seed manifest (JSON)
        manifest: PathBuf,

        /// Content API base URL [default: $STRAPI_URL, $API_URL, http://localhost:1337]
        #[arg(long)]
        url: Option<String>,

        /// API token [default: $STRAPI_TOKEN]
        #[arg(long)]
        token: Option<String>,

        /// Locale for localized entries [default: $SEED_LOCALE, fr]
        #[arg(long)]
        locale: Option<String>,

        /// Print the seed report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Populate {
            schema,
            uid,
            pretty,
            no_creator_fields,
        } => run_populate(&schema, &uid, pretty, no_creator_fields),

        Commands::Filter {
            schema,
            url,
            method,
            query,
            pretty,
        } => run_filter(&schema, url, method, query, pretty),

        Commands::Lint {
            schema,
            format,
            strict,
        } => run_lint(&schema, &format, strict),

        #[cfg(feature = "remote")]
        Commands::Seed {
            manifest,
            url,
            token,
            locale,
            json,
        } => run_seed(&manifest, url, token, locale, json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // The subscriber also bridges `log` records emitted by the library.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn load(schema: &Path) -> Result<Schema, u8> {
    load_schema_auto(schema).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })
}

fn print_json(value: &Value, pretty: bool) -> Result<(), u8> {
    let output = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;
    println!("{}", output);
    Ok(())
}

fn run_populate(
    schema_path: &Path,
    uid: &str,
    pretty: bool,
    no_creator_fields: bool,
) -> Result<(), u8> {
    let schema = load(schema_path)?;

    let mut options = PopulateOptions::new();
    if no_creator_fields {
        options.always_visible.clear();
    }

    let spec = build_with(&schema, uid, &options);
    print_json(&spec.to_value(), pretty)
}

fn run_filter(
    schema_path: &Path,
    url: String,
    method: String,
    query: Option<String>,
    pretty: bool,
) -> Result<(), u8> {
    let schema = load(schema_path)?;

    let mut request = ContentRequest::new(method, url);
    if let Some(query) = query {
        let extra: serde_json::Map<String, Value> = serde_json::from_str(&query).map_err(|e| {
            eprintln!("Error: --query must be a JSON object: {}", e);
            2u8
        })?;
        request.query.extend(extra);
    }

    let filter = PopulateFilter::new(&schema, FilterConfig::default());
    match filter.apply(&mut request) {
        FilterOutcome::Populated(uid) => log::info!("populated {}", uid),
        FilterOutcome::UnknownContentType(uid) => log::info!("passed through: {} unknown", uid),
        FilterOutcome::Skipped(reason) => log::info!("passed through: {:?}", reason),
    }

    print_json(&Value::Object(request.query), pretty)
}

fn run_lint(schema_path: &Path, format: &str, strict: bool) -> Result<(), u8> {
    let schema = load(schema_path)?;
    let result = lint(&schema);

    if format == "json" {
        let value = serde_json::to_value(&result).map_err(|e| {
            eprintln!("Error serializing output: {}", e);
            2u8
        })?;
        print_json(&value, true)?;
    } else {
        println!("Linting {} ...\n", schema_path.display());

        for diag in &result.diagnostics {
            let (color, label) = match diag.severity {
                Severity::Error => ("\x1b[31m", "error"),
                Severity::Warning => ("\x1b[33m", "warning"),
            };
            println!(
                "  {}{}[{}]\x1b[0m: {}.{} - {}",
                color, label, diag.code, diag.uid, diag.attribute, diag.message
            );
        }

        println!();
        if result.is_ok() && (!strict || result.warnings == 0) {
            println!(
                "\x1b[32m✓ {} content types checked, all passed\x1b[0m",
                result.content_types_checked
            );
        } else {
            println!(
                "\x1b[31m✗ {} content types checked: {} errors, {} warnings\x1b[0m",
                result.content_types_checked, result.errors, result.warnings
            );
        }
    }

    if result.is_ok() && (!strict || result.warnings == 0) {
        Ok(())
    } else {
        Err(1)
    }
}

#[cfg(feature = "remote")]
fn run_seed(
    manifest_path: &Path,
    url: Option<String>,
    token: Option<String>,
    locale: Option<String>,
    json: bool,
) -> Result<(), u8> {
    use deep_populate::seed::{self, SeedClient, SeedConfig, SeedManifest};

    let manifest = SeedManifest::load(manifest_path).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let mut config = SeedConfig::from_env();
    if let Some(url) = url {
        config.base_url = url;
    }
    if token.is_some() {
        config = config.token(token);
    }
    if let Some(locale) = locale {
        config = config.locale(locale);
    }
    config.warn_if_anonymous();

    let client = SeedClient::new(config).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let report = seed::run(&client, &manifest);

    if json {
        let value = serde_json::to_value(&report).map_err(|e| {
            eprintln!("Error serializing output: {}", e);
            2u8
        })?;
        print_json(&value, true)?;
    } else {
        for (collection, ids) in &report.upserted {
            println!("{}: {} upserted", collection, ids.len());
        }
        for uid in &report.singles {
            println!("{}: set", uid);
        }
        for failure in &report.failures {
            eprintln!("failed: {}", failure);
        }
    }

    if report.is_ok() {
        Ok(())
    } else {
        Err(1)
    }
}
