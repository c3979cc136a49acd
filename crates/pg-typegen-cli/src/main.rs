//! pg-typegen CLI - TypeScript declarations from a PostgreSQL catalog.

use clap::{Parser, Subcommand};
use pg_typegen::config::ListSpec;
use pg_typegen::{Config, Orchestrator, OutputTarget, SnapshotSource, TypegenError};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Parser)]
#[command(name = "pg-typegen")]
#[command(about = "Generate TypeScript declarations from a PostgreSQL catalog")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "typegen.yaml")]
    config: PathBuf,

    /// Output JSON result
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate declarations from the database or a snapshot
    Generate {
        /// Override output file ("-" for stdout)
        #[arg(short, long)]
        output: Option<String>,

        /// Override schemas (comma-separated, "!" to exclude)
        #[arg(long)]
        schemas: Option<String>,

        /// Override excluded tables (comma-separated)
        #[arg(long)]
        exclude: Option<String>,

        /// Read the catalog from a snapshot file instead of the database
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },

    /// Record the catalog metadata a run would read into a JSON file
    Snapshot {
        /// Snapshot file to write
        #[arg(short, long)]
        output: PathBuf,

        /// Override schemas (comma-separated, "!" to exclude)
        #[arg(long)]
        schemas: Option<String>,

        /// Override excluded tables (comma-separated)
        #[arg(long)]
        exclude: Option<String>,
    },

    /// Test the database connection
    HealthCheck,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), TypegenError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format).map_err(TypegenError::Config)?;

    let mut config = Config::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);

    match cli.command {
        Commands::Generate {
            output,
            schemas,
            exclude,
            snapshot,
        } => {
            // Apply overrides
            if let Some(output) = output {
                config.output = output;
            }
            apply_filters(&mut config, schemas, exclude);

            let declarations_on_stdout = config.output_target() == OutputTarget::Stdout;
            let orchestrator = Orchestrator::new(config)?;

            let result = match snapshot {
                Some(path) => {
                    let mut source = SnapshotSource::open(&path)?;
                    info!("Reading catalog from snapshot {:?}", path);
                    orchestrator.generate_from(&mut source).await?
                }
                None => orchestrator.run().await?,
            };

            let report = if cli.output_json {
                result.to_json()?
            } else {
                format!(
                    "Generation completed!\n  Output: {}\n  Enums: {}\n  Tables: {}\n  Fields: {} ({} branded)\n  Duration: {:.2}s",
                    result.output,
                    result.enums,
                    result.tables,
                    result.columns,
                    result.branded_fields,
                    result.duration_seconds
                )
            };
            // Keep stdout clean when it carries the declarations.
            if declarations_on_stdout {
                eprintln!("{}", report);
            } else {
                println!("{}", report);
            }
        }

        Commands::Snapshot {
            output,
            schemas,
            exclude,
        } => {
            apply_filters(&mut config, schemas, exclude);

            let orchestrator = Orchestrator::new(config)?;
            let mut source = orchestrator.connect().await?;
            let snapshot = orchestrator.capture_snapshot(&mut source).await?;
            snapshot.save(&output)?;

            if cli.output_json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "output": output.display().to_string(),
                        "enums": snapshot.enums.len(),
                        "columns": snapshot.columns.len(),
                        "constraints": snapshot.constraints.len(),
                    }))?
                );
            } else {
                println!("Snapshot written to {}", output.display());
                println!("  Enum members: {}", snapshot.enums.len());
                println!("  Columns: {}", snapshot.columns.len());
                println!("  Constraints: {}", snapshot.constraints.len());
            }
        }

        Commands::HealthCheck => {
            let orchestrator = Orchestrator::new(config)?;
            let result = orchestrator.health_check().await?;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("Health Check Results:");
                println!(
                    "  PostgreSQL ({}): {} ({}ms)",
                    result.database,
                    if result.connected { "OK" } else { "FAILED" },
                    result.latency_ms
                );
                if let Some(ref err) = result.error {
                    println!("    Error: {}", err);
                }
                println!(
                    "\n  Overall: {}",
                    if result.healthy { "HEALTHY" } else { "UNHEALTHY" }
                );
            }

            if !result.healthy {
                return Err(TypegenError::connection(
                    "health check failed",
                    result.database,
                ));
            }
        }
    }

    Ok(())
}

fn apply_filters(config: &mut Config, schemas: Option<String>, exclude: Option<String>) {
    if let Some(schemas) = schemas {
        config.schemas = ListSpec::Joined(schemas);
    }
    if let Some(exclude) = exclude {
        config.exclude = ListSpec::Joined(exclude);
    }
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        other => return Err(format!("unknown verbosity '{}'", other)),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        "json" => subscriber.json().init(),
        "text" => subscriber.init(),
        other => return Err(format!("unknown log format '{}'", other)),
    }

    Ok(())
}
