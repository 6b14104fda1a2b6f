//! Prism CLI - Inspect filters and permission decisions
//!
//! Usage:
//!   prism compile <filter.json> [--dialect <dialect>] [--format <format>]
//!   prism check --grants <grants.json> --filter <filter.json>
//!   prism boundaries <filter.json> [--geo <dimension>]...
//!
//! Examples:
//!   prism compile filter.json --format sql --dialect tsql
//!   prism check --grants alice.json --filter filter.json
//!   prism boundaries filter.json --geo country --geo region

use clap::{Parser, Subcommand, ValueEnum};
use log::debug;
use prism::backend::Dialect;
use prism::config::Settings;
use prism::filter::{extract_boundaries, QueryFilter};
use prism::permission::{Authorizer, DimensionFilter, QueryNeed};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "prism")]
#[command(about = "Prism - Compile query filters and check them against grants")]
#[command(version)]
struct Cli {
    /// Config file (defaults to $PRISM_CONFIG, ./prism.toml, then the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a JSON filter to a backend predicate
    Compile {
        /// Path to the filter JSON
        file: PathBuf,

        /// SQL dialect for `--format sql` (overrides config)
        #[arg(short, long)]
        dialect: Option<DialectArg>,

        /// Output format
        #[arg(short, long, default_value = "native")]
        format: OutputFormat,
    },

    /// Decide whether a filter stays within a set of grants
    Check {
        /// JSON array of dimension filters; repeat to intersect several grant sets
        #[arg(short, long, required = true)]
        grants: Vec<PathBuf>,

        /// Path to the filter JSON
        #[arg(short, long)]
        filter: PathBuf,
    },

    /// Extract map boundary selections from a filter
    Boundaries {
        /// Path to the filter JSON
        file: PathBuf,

        /// Geographic dimensions, coarsest first (overrides config)
        #[arg(short, long)]
        geo: Vec<String>,
    },
}

#[derive(Clone, ValueEnum)]
enum DialectArg {
    Postgres,
    Mysql,
    Tsql,
    Duckdb,
}

impl From<DialectArg> for Dialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Postgres => Dialect::Postgres,
            DialectArg::Mysql => Dialect::MySql,
            DialectArg::Tsql => Dialect::TSql,
            DialectArg::Duckdb => Dialect::DuckDb,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Backend-native JSON predicate
    Native,
    /// SQL WHERE clause
    Sql,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    };
    let settings = match settings {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            return ExitCode::FAILURE;
        }
    };
    debug!("settings: {:?}", settings);

    match cli.command {
        Commands::Compile {
            file,
            dialect,
            format,
        } => cmd_compile(&settings, &file, dialect, format),
        Commands::Check { grants, filter } => cmd_check(&settings, &grants, &filter),
        Commands::Boundaries { file, geo } => cmd_boundaries(&settings, &file, geo),
    }
}

fn read_json(file: &Path) -> Result<Value, String> {
    let source = fs::read_to_string(file)
        .map_err(|e| format!("Error reading file '{}': {}", file.display(), e))?;
    serde_json::from_str(&source)
        .map_err(|e| format!("Invalid JSON in '{}': {}", file.display(), e))
}

fn read_filter(settings: &Settings, file: &Path) -> Result<Option<QueryFilter>, String> {
    let value = read_json(file)?;
    settings
        .registry()
        .deserialize(&value)
        .map_err(|e| format!("Invalid filter in '{}': {}", file.display(), e))
}

fn cmd_compile(
    settings: &Settings,
    file: &Path,
    dialect: Option<DialectArg>,
    format: OutputFormat,
) -> ExitCode {
    let filter = match read_filter(settings, file) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let predicate = filter
        .map(|f| f.compile_with(&settings.compile_options()))
        .unwrap_or_default();

    match format {
        OutputFormat::Native => match serde_json::to_string_pretty(&predicate) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Serialization error: {}", e);
                return ExitCode::FAILURE;
            }
        },
        OutputFormat::Sql => {
            let dialect = dialect.map(Dialect::from).unwrap_or(settings.backend.dialect);
            match predicate.to_sql(dialect) {
                Ok(sql) => println!("{}", sql),
                Err(e) => {
                    eprintln!("Compilation error: {}", e);
                    return ExitCode::FAILURE;
                }
            }
        }
    }
    ExitCode::SUCCESS
}

fn read_grants(file: &Path) -> Result<QueryNeed, String> {
    let grants: Vec<DimensionFilter> = serde_json::from_value(read_json(file)?)
        .map_err(|e| format!("Invalid grants in '{}': {}", file.display(), e))?;
    Ok(QueryNeed::new(grants))
}

fn cmd_check(settings: &Settings, grants: &[PathBuf], filter: &Path) -> ExitCode {
    let sets = match grants.iter().map(|file| read_grants(file)).collect::<Result<Vec<_>, _>>() {
        Ok(sets) => sets,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let filter = match read_filter(settings, filter) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let authorizer = Authorizer::from_grant_sets(sets, settings.authorization.missing_dimension);

    println!("Grant:");
    for granted in authorizer.grant().filters() {
        println!("  - {}", granted);
    }
    println!("Required:");
    for required in authorizer.required_need(filter.as_ref()).filters() {
        println!("  - {}", required);
    }
    println!();

    if authorizer.permits(filter.as_ref()) {
        println!("permitted");
        ExitCode::SUCCESS
    } else {
        println!("denied");
        ExitCode::FAILURE
    }
}

fn cmd_boundaries(settings: &Settings, file: &Path, geo: Vec<String>) -> ExitCode {
    let filter = match read_filter(settings, file) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let geo = if geo.is_empty() {
        settings.geo.dimensions.clone()
    } else {
        geo
    };
    if geo.is_empty() {
        eprintln!("No geographic dimensions given (use --geo or [geo] dimensions in config)");
        return ExitCode::FAILURE;
    }

    let boundaries = extract_boundaries(filter.as_ref(), &geo);
    match serde_json::to_string_pretty(&boundaries) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Serialization error: {}", e);
            ExitCode::FAILURE
        }
    }
}
