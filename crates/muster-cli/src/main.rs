#![forbid(unsafe_code)]

mod cmd;
mod dataset;
mod output;

use clap::{Parser, Subcommand};
use muster_core::config::resolve_config;
use output::{CliError, OutputMode, render_error, resolve_output_mode};
use std::env;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "mst: staff and penalty console",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Shorthand for `--format json`.
    #[arg(long, global = true, hide = true)]
    json: bool,

    /// Config file to use instead of `.muster/config.toml`.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn output_mode(&self) -> OutputMode {
        resolve_output_mode(self.format, self.json)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "List penalties matching the session filters",
        long_about = "List penalties newest first. Filters start from the configured session \
                      defaults (department, status, trailing date window); flags override them.",
        after_help = "EXAMPLES:\n    # Pending DevSecOps penalties from the last 30 days (defaults)\n    mst penalties --data console.json\n\n    # Everything, any date\n    mst penalties --data console.json --department ALL --status ALL --all-dates\n\n    # Emit machine-readable output\n    mst penalties --data console.json --json"
    )]
    Penalties(cmd::penalties::PenaltiesArgs),

    #[command(
        about = "Show penalty totals",
        long_about = "Count every penalty and sum amounts by status. Session filters do not apply.",
        after_help = "EXAMPLES:\n    mst stats --data console.json\n    mst stats --data console.json --format text"
    )]
    Stats(cmd::stats::StatsArgs),

    #[command(
        about = "List employees with resolved designation and department",
        long_about = "List employees newest first, following designation and department ids. \
                      References to deleted records are flagged rather than hidden.",
        after_help = "EXAMPLES:\n    mst employees --data console.json\n    mst employees --data console.json --dangling --json"
    )]
    Employees(cmd::employees::EmployeesArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("MUSTER_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "muster=debug,info"
        } else {
            "muster=info,warn"
        })
    });

    let format = env::var("MUSTER_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let output = cli.output_mode();
    let project_root = env::current_dir()?;
    let config = match resolve_config(&project_root, cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            render_error(
                output,
                &CliError::from_code(muster_core::ErrorCode::ConfigParseError, format!("{err:#}")),
            )?;
            return Err(err);
        }
    };

    match cli.command {
        Commands::Penalties(ref args) => {
            cmd::penalties::run_penalties(args, &config.filters, output)
        }
        Commands::Stats(ref args) => cmd::stats::run_stats(args, output),
        Commands::Employees(ref args) => cmd::employees::run_employees(args, output),
    }
}
