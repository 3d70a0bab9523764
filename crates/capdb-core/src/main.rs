//! capdb - capability database lookup tool
//!
//! Entry point for the `capdb` binary:
//! - resolving records with `tc=` inheritance
//! - reading single fields
//! - listing records and testing name matches
//! - building hash stores

use capdb_config::{load_settings, resolve_sources, ConfigError, LoadedSettings, MAX_DEPTH_LIMIT};
use capdb_core::exit_codes::ExitCode;
use capdb_core::logging::{init_logging, LogConfig, LogFormat, LogLevel};
use capdb_core::{
    build_store, CapError, CapabilityRecord, FieldKind, Resolution, ResolveStatus, Resolver,
    ResolverOptions,
};
use clap::error::ErrorKind as ClapErrorKind;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use tracing::debug;

/// Look up records in termcap-style capability databases
#[derive(Parser)]
#[command(name = "capdb")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Database source, searched in the order given (repeatable)
    #[arg(long = "db", global = true, value_name = "PATH")]
    db: Vec<PathBuf>,

    /// Settings file (capdb.json)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Deepest allowed tc= nesting
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..=MAX_DEPTH_LIMIT as u64))]
    max_depth: Option<u64>,

    /// Never consult <source>.db hash stores
    #[arg(long, global = true)]
    no_hash: bool,

    /// Record consulted before any source for the requested name
    #[arg(long = "override", global = true, value_name = "RECORD")]
    override_record: Option<String>,

    /// Output format
    #[arg(long, short = 'f', global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log format on stderr
    #[arg(long, global = true, value_name = "FORMAT")]
    log_format: Option<LogFormat>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a record and print it
    Get(GetArgs),

    /// Print one field of a resolved record
    Cap(CapArgs),

    /// Test whether a record's name field lists a name
    Match(MatchArgs),

    /// List the first name of every record
    List,

    /// Build a hash store from a flat-text source
    Mkdb(MkdbArgs),
}

#[derive(Args, Debug)]
struct GetArgs {
    /// Record name or alias
    name: String,
}

#[derive(Args, Debug)]
struct CapArgs {
    /// Record name or alias
    name: String,

    /// Field name
    field: String,

    /// Field type
    #[arg(long = "type", short = 't', value_enum, default_value_t = FieldType::Str)]
    field_type: FieldType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FieldType {
    /// Boolean flag
    Flag,
    /// Numeric (#) field
    Num,
    /// String (=) field, escapes decoded
    Str,
    /// String (=) field, verbatim
    Raw,
}

#[derive(Args, Debug)]
struct MatchArgs {
    /// Record text, at least its name field
    record: String,

    /// Name to test
    name: String,
}

#[derive(Args, Debug)]
struct MkdbArgs {
    /// Flat-text source to index
    source: PathBuf,

    /// Output path (default: <source>.db)
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,
}

// ============================================================================
// Main entry point
// ============================================================================

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = match e.kind() {
                ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion => ExitCode::Ok,
                _ => ExitCode::UsageError,
            };
            let _ = e.print();
            std::process::exit(code.as_i32());
        }
    };

    let log_config = LogConfig::from_env(
        LogLevel::from_verbosity(cli.global.verbose, cli.global.quiet),
        cli.global.log_format,
    );
    init_logging(&log_config);

    let exit_code = match &cli.command {
        Commands::Get(args) => run_get(&cli.global, args),
        Commands::Cap(args) => run_cap(&cli.global, args),
        Commands::Match(args) => run_match(args),
        Commands::List => run_list(&cli.global),
        Commands::Mkdb(args) => run_mkdb(&cli.global, args),
    };

    std::process::exit(exit_code.as_i32());
}

// ============================================================================
// Setup
// ============================================================================

fn load(global: &GlobalOpts) -> Result<LoadedSettings, ExitCode> {
    load_settings(global.config.as_deref()).map_err(|e| output_config_error(global, &e))
}

fn max_depth(global: &GlobalOpts, loaded: &LoadedSettings) -> usize {
    global
        .max_depth
        .map_or(loaded.settings.max_depth, |depth| depth as usize)
}

fn build_resolver(global: &GlobalOpts) -> Result<Resolver, ExitCode> {
    let loaded = load(global)?;
    let sources = resolve_sources(&global.db, Some(&loaded.settings));

    let mut options = ResolverOptions::from_settings(&loaded.settings)
        .with_max_depth(max_depth(global, &loaded));
    if global.no_hash {
        options = options.with_hash_store(false);
    }
    if let Some(record) = &global.override_record {
        options = options.with_top_record(record.as_str());
    }

    debug!(
        sources = ?sources.paths,
        origin = %sources.origin,
        max_depth = options.max_depth,
        hash_store = options.use_hash_store,
        "Resolver configured"
    );
    Ok(Resolver::new(sources.paths).with_options(options))
}

// ============================================================================
// Commands
// ============================================================================

#[derive(Serialize)]
struct FieldOutput {
    name: String,
    kind: FieldKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<String>,
}

#[derive(Serialize)]
struct RecordOutput<'a> {
    name: &'a str,
    aliases: Vec<String>,
    #[serde(flatten)]
    status: &'a ResolveStatus,
    record: String,
    fields: Vec<FieldOutput>,
}

fn fields_of(record: &CapabilityRecord) -> Vec<FieldOutput> {
    record
        .fields()
        .map(|field| FieldOutput {
            name: String::from_utf8_lossy(field.name).into_owned(),
            kind: field.kind,
            value: matches!(field.kind, FieldKind::Number | FieldKind::String)
                .then(|| String::from_utf8_lossy(field.value).into_owned()),
        })
        .collect()
}

fn resolution_code(resolution: &Resolution) -> ExitCode {
    if resolution.is_partial() {
        ExitCode::Partial
    } else {
        ExitCode::Ok
    }
}

fn run_get(global: &GlobalOpts, args: &GetArgs) -> ExitCode {
    let resolver = match build_resolver(global) {
        Ok(resolver) => resolver,
        Err(code) => return code,
    };
    let resolution = match resolver.resolve(&args.name) {
        Ok(resolution) => resolution,
        Err(e) => return output_error(global, &e),
    };

    match global.format {
        OutputFormat::Json => {
            let output = RecordOutput {
                name: &args.name,
                aliases: resolution.record.aliases(),
                status: &resolution.status,
                record: resolution.record.to_string(),
                fields: fields_of(&resolution.record),
            };
            if let Err(code) = print_json(&output) {
                return code;
            }
        }
        OutputFormat::Text => {
            if let Err(code) = write_stdout(resolution.record.as_bytes()) {
                return code;
            }
        }
    }
    resolution_code(&resolution)
}

#[derive(Serialize)]
struct CapOutput<'a> {
    name: &'a str,
    field: &'a str,
    value: serde_json::Value,
}

fn run_cap(global: &GlobalOpts, args: &CapArgs) -> ExitCode {
    let resolver = match build_resolver(global) {
        Ok(resolver) => resolver,
        Err(code) => return code,
    };
    let resolution = match resolver.resolve(&args.name) {
        Ok(resolution) => resolution,
        Err(e) => return output_error(global, &e),
    };
    let record = &resolution.record;

    let value = match args.field_type {
        FieldType::Flag => Ok(record.has_flag(&args.field).then(Vec::new)),
        FieldType::Num => Ok(record
            .get_number(&args.field)
            .map(|n| n.to_string().into_bytes())),
        FieldType::Str => present(record.get_string(&args.field)),
        FieldType::Raw => present(record.extract_string(&args.field)),
    };
    let value = match value {
        Ok(Some(value)) => value,
        Ok(None) => {
            let missing = CapError::not_found(format!("{}:{}", args.name, args.field));
            return output_error(global, &missing);
        }
        Err(e) => return output_error(global, &e),
    };

    let written = match global.format {
        OutputFormat::Json => {
            let json = match args.field_type {
                FieldType::Flag => serde_json::Value::Bool(true),
                FieldType::Num => record
                    .get_number(&args.field)
                    .map_or(serde_json::Value::Null, serde_json::Value::from),
                FieldType::Str | FieldType::Raw => {
                    serde_json::Value::String(String::from_utf8_lossy(&value).into_owned())
                }
            };
            print_json(&CapOutput {
                name: &args.name,
                field: &args.field,
                value: json,
            })
        }
        // Flags answer through the exit code alone.
        OutputFormat::Text if args.field_type == FieldType::Flag => Ok(()),
        OutputFormat::Text => write_stdout(&value),
    };
    match written {
        Ok(()) => resolution_code(&resolution),
        Err(code) => code,
    }
}

/// Turn a missing string field into `None`, keeping real failures.
fn present(result: capdb_core::Result<Vec<u8>>) -> capdb_core::Result<Option<Vec<u8>>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

fn run_match(args: &MatchArgs) -> ExitCode {
    if capdb_core::matches(args.record.as_bytes(), &args.name) {
        ExitCode::Ok
    } else {
        ExitCode::NotFound
    }
}

fn run_list(global: &GlobalOpts) -> ExitCode {
    let resolver = match build_resolver(global) {
        Ok(resolver) => resolver,
        Err(code) => return code,
    };
    let names = match resolver.names() {
        Ok(names) => names,
        Err(e) => return output_error(global, &e),
    };

    let written = match global.format {
        OutputFormat::Json => print_json(&names),
        OutputFormat::Text => {
            let mut text = String::new();
            for name in &names {
                text.push_str(name);
                text.push('\n');
            }
            write_raw(text.as_bytes())
        }
    };
    match written {
        Ok(()) => ExitCode::Ok,
        Err(code) => code,
    }
}

fn run_mkdb(global: &GlobalOpts, args: &MkdbArgs) -> ExitCode {
    let loaded = match load(global) {
        Ok(loaded) => loaded,
        Err(code) => return code,
    };
    let report = match build_store(&args.source, args.output.as_deref(), max_depth(global, &loaded)) {
        Ok(report) => report,
        Err(e) => return output_error(global, &e),
    };

    let written = match global.format {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Text => {
            let mut text = format!(
                "{}: {} records, {} aliases\n",
                report.output.display(),
                report.records,
                report.aliases
            );
            for name in &report.unresolved {
                text.push_str(&format!("unresolved: {name}\n"));
            }
            for name in &report.duplicates {
                text.push_str(&format!("duplicate: {name}\n"));
            }
            write_raw(text.as_bytes())
        }
    };
    match written {
        Err(code) => code,
        Ok(()) if report.unresolved.is_empty() => ExitCode::Ok,
        Ok(()) => ExitCode::Partial,
    }
}

// ============================================================================
// Output helpers
// ============================================================================

fn write_raw(bytes: &[u8]) -> Result<(), ExitCode> {
    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(bytes)
        .and_then(|()| stdout.flush())
        .map_err(|e| {
            eprintln!("error: writing output: {e}");
            ExitCode::SystemError
        })
}

fn write_stdout(bytes: &[u8]) -> Result<(), ExitCode> {
    let mut line = bytes.to_vec();
    line.push(b'\n');
    write_raw(&line)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), ExitCode> {
    let text = serde_json::to_string_pretty(value).map_err(|e| {
        eprintln!("error: encoding output: {e}");
        ExitCode::SystemError
    })?;
    write_stdout(text.as_bytes())
}

/// Report a resolution error on stderr in the selected format.
fn output_error(global: &GlobalOpts, error: &CapError) -> ExitCode {
    let code = ExitCode::from(error);
    report_error(global, code, &error.to_string());
    code
}

/// Report a settings error on stderr in the selected format.
fn output_config_error(global: &GlobalOpts, error: &ConfigError) -> ExitCode {
    let code = ExitCode::ConfigError;
    report_error(global, code, &error.to_string());
    code
}

fn report_error(global: &GlobalOpts, code: ExitCode, message: &str) {
    match global.format {
        OutputFormat::Json => {
            let response = serde_json::json!({
                "status": "error",
                "error": {
                    "code": code.code_name(),
                    "exit_code": code.as_i32(),
                    "message": message,
                }
            });
            eprintln!("{response}");
        }
        OutputFormat::Text => eprintln!("capdb: {message}"),
    }
}
