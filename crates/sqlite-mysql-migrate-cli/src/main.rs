//! sqlite-mysql-migrate CLI - SQLite to MySQL/MariaDB migration.

use clap::{Args, Parser, Subcommand};
use sqlite_mysql_migrate::{
    Config, MigrateError, MigrationConfig, MigrationEvent, Orchestrator, RunResult, RunStatus,
    SourceConfig, SourceReader, SqliteReader, TableErrorPolicy, TargetConfig,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

#[derive(Parser)]
#[command(name = "sqlite-mysql-migrate")]
#[command(about = "Migrate a SQLite database into MySQL or MariaDB")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file (command-line options override it)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    /// Print progress updates as JSON lines to stderr
    #[arg(long)]
    progress: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Migrate schema and data
    Run {
        #[command(flatten)]
        overrides: Overrides,

        /// Dry run: print the generated DDL without connecting to MySQL
        #[arg(long)]
        dry_run: bool,
    },

    /// List the tables in the SQLite database
    ListTables {
        /// Path to the SQLite database file
        #[arg(long)]
        source: Option<PathBuf>,
    },
}

/// Command-line settings layered over the configuration file.
#[derive(Args)]
struct Overrides {
    /// Path to the SQLite database file
    #[arg(long)]
    source: Option<PathBuf>,

    /// MySQL host
    #[arg(long)]
    host: Option<String>,

    /// MySQL port
    #[arg(long)]
    port: Option<u16>,

    /// MySQL user
    #[arg(long)]
    user: Option<String>,

    /// MySQL password
    #[arg(long, env = "MYSQL_PWD", hide_env_values = true)]
    password: Option<String>,

    /// Target database name
    #[arg(long)]
    database: Option<String>,

    /// Comma-separated list of tables to migrate (default: all)
    #[arg(long, value_delimiter = ',')]
    tables: Option<Vec<String>>,

    /// Rows per insert/commit batch
    #[arg(long)]
    batch_size: Option<usize>,

    /// Drop each target table before recreating it
    #[arg(long)]
    drop_recreate: bool,

    /// Do not issue CREATE DATABASE IF NOT EXISTS
    #[arg(long)]
    no_create_database: bool,

    /// Leave foreign key checks enabled during import
    #[arg(long)]
    keep_foreign_key_checks: bool,

    /// Skip tables whose DDL or data copy fails instead of aborting
    #[arg(long)]
    skip_failed_tables: bool,
}

impl Overrides {
    fn apply(self, config: &mut Config) {
        if let Some(path) = self.source {
            config.source.path = path;
        }
        if let Some(host) = self.host {
            config.target.host = host;
        }
        if let Some(port) = self.port {
            config.target.port = port;
        }
        if let Some(user) = self.user {
            config.target.user = user;
        }
        if let Some(password) = self.password {
            config.target.password = password;
        }
        if let Some(database) = self.database {
            config.target.database = database;
        }
        if let Some(tables) = self.tables {
            config.migration.tables = tables
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();
        }
        if let Some(size) = self.batch_size {
            config.migration.batch_size = size;
        }
        if self.drop_recreate {
            config.migration.drop_recreate = true;
        }
        if self.no_create_database {
            config.migration.create_database = false;
        }
        if self.keep_foreign_key_checks {
            config.migration.disable_foreign_key_checks = false;
        }
        if self.skip_failed_tables {
            config.migration.on_table_error = TableErrorPolicy::Skip;
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<u8, MigrateError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format)
        .map_err(|e| MigrateError::Config(e.to_string()))?;

    match cli.command {
        Commands::ListTables { source } => {
            let path = match (source, &cli.config) {
                (Some(path), _) => path,
                (None, Some(file)) => Config::load(file)?.source.path,
                (None, None) => {
                    return Err(MigrateError::Config(
                        "--source or --config is required".to_string(),
                    ))
                }
            };

            let reader = SqliteReader::open(&path).await?;
            let tables = reader.list_tables().await?;
            reader.close().await;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&tables)?);
            } else {
                for table in &tables {
                    println!("{}", table);
                }
            }
            Ok(0)
        }

        Commands::Run { overrides, dry_run } => {
            let config = build_config(cli.config.as_ref(), overrides)?;
            let cancel_token = setup_signal_handler().await?;

            let mut orchestrator = Orchestrator::from_config(config)
                .await?
                .with_cancel(cancel_token);

            if dry_run {
                print_plan(&orchestrator, cli.output_json).await?;
                return Ok(0);
            }

            let mut drain = None;
            if cli.progress {
                let (tx, rx) = mpsc::unbounded_channel();
                orchestrator = orchestrator.with_events(Arc::new(tx));
                drain = Some(spawn_progress_printer(rx));
            }

            let result = orchestrator.run().await;

            // Dropping the orchestrator closes the channel and lets the printer finish.
            drop(orchestrator);
            if let Some(handle) = drain {
                let _ = handle.await;
            }

            if cli.output_json {
                println!("{}", result.to_json()?);
            } else {
                print_summary(&result);
            }
            Ok(result.exit_code())
        }
    }
}

/// Configuration file (if any) with command-line overrides applied on top.
fn build_config(path: Option<&PathBuf>, overrides: Overrides) -> Result<Config, MigrateError> {
    let mut config = match path {
        Some(path) => {
            let config = Config::load(path)?;
            info!("Loaded configuration from {:?}", path);
            config
        }
        None => Config {
            source: SourceConfig {
                path: PathBuf::new(),
            },
            target: TargetConfig::default(),
            migration: MigrationConfig::default(),
        },
    };

    overrides.apply(&mut config);
    config.validate()?;
    Ok(config)
}

async fn print_plan(orchestrator: &Orchestrator, json: bool) -> Result<(), MigrateError> {
    let plans = orchestrator.plan().await?;

    if json {
        let entries: Vec<serde_json::Value> = plans
            .iter()
            .map(|p| match &p.ddl {
                Ok(ddl) => serde_json::json!({
                    "table": p.table,
                    "ddl": ddl,
                    "warnings": p.warnings,
                }),
                Err(e) => serde_json::json!({
                    "table": p.table,
                    "skipped": e,
                }),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    println!(
        "-- Dry run: {} table(s) into `{}`",
        plans.len(),
        orchestrator.config().target.database
    );
    for plan in &plans {
        println!();
        match &plan.ddl {
            Ok(ddl) => {
                for warning in &plan.warnings {
                    println!("-- warning: {}", warning);
                }
                println!("{};", ddl);
            }
            Err(e) => println!("-- skipping {}: {}", plan.table, e),
        }
    }
    Ok(())
}

fn print_summary(result: &RunResult) {
    let headline = match result.status {
        RunStatus::Completed => "Migration completed!",
        RunStatus::CompletedWithSkips => "Migration completed with skipped tables.",
        RunStatus::Aborted => "Migration aborted.",
        RunStatus::Cancelled => "Migration cancelled.",
    };
    println!("\n{}", headline);
    println!("  Run ID: {}", result.run_id);
    println!("  Duration: {:.2}s", result.duration_seconds);
    println!("  Tables: {}/{}", result.tables_success, result.tables_total);
    println!("  Rows: {}", result.rows_transferred);
    println!("  Throughput: {} rows/sec", result.rows_per_second);
    for skipped in &result.skipped_tables {
        println!("  Skipped {}: {}", skipped.table, skipped.reason);
    }
    if let Some(ref error) = result.error {
        println!("  Error: {}", error.message);
        if let Some(ref hint) = error.hint {
            println!("  Hint: {}", hint);
        }
    }
}

/// Print every non-log event as a JSON line on stderr. Log events already
/// reach stderr through tracing.
fn spawn_progress_printer(mut rx: mpsc::UnboundedReceiver<MigrationEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if matches!(event, MigrationEvent::Log(_)) {
                continue;
            }
            if let Ok(line) = serde_json::to_string(&event) {
                eprintln!("{}", line);
            }
        }
    })
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    Ok(())
}

/// Setup signal handlers for graceful shutdown.
/// SIGINT and SIGTERM both cancel the returned token; the run stops at the
/// next batch or table boundary.
#[cfg(unix)]
async fn setup_signal_handler() -> Result<CancellationToken, MigrateError> {
    let cancel_token = CancellationToken::new();

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    let token_int = cancel_token.clone();
    tokio::spawn(async move {
        sigint.recv().await;
        eprintln!("\nReceived SIGINT. Stopping after the current batch...");
        token_int.cancel();
    });

    let token_term = cancel_token.clone();
    tokio::spawn(async move {
        sigterm.recv().await;
        eprintln!("\nReceived SIGTERM. Stopping after the current batch...");
        token_term.cancel();
    });

    Ok(cancel_token)
}

/// Setup signal handler for Windows (only Ctrl-C)
#[cfg(not(unix))]
async fn setup_signal_handler() -> Result<CancellationToken, MigrateError> {
    let cancel_token = CancellationToken::new();
    let token = cancel_token.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nReceived Ctrl-C. Stopping after the current batch...");
            token.cancel();
        }
    });

    Ok(cancel_token)
}
