// gridaudit CLI - contact sheet and order document audits

mod audit;
mod exit_codes;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use gridaudit_engine::AuditError;

use exit_codes::{audit_exit_code, EXIT_CONFIG, EXIT_IO, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "gridaudit")]
#[command(about = "Normalize spreadsheet contact lists and order documents, and report anomalies")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// More log output on stderr (-v info, -vv debug). RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Audit one source document and write the normalized and anomaly reports
    #[command(after_help = "\
Examples:
  gridaudit run content.xml --blocklist disposable.txt --name agencies --out-dir out/
  gridaudit run contacts.ods --blocklist disposable.txt --name agencies --json
  gridaudit run orders.xml --name orders --kind orders -v")]
    Run(audit::RunArgs),

    /// Validate an audit config without running
    #[command(after_help = "\
Examples:
  gridaudit check-config audit.toml
  gridaudit check-config audit.toml --json")]
    CheckConfig {
        /// Path to the audit TOML file
        config: PathBuf,

        /// Print the effective config (defaults filled in) as JSON
        #[arg(long)]
        json: bool,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        "\nengine:  gridaudit-engine ", env!("CARGO_PKG_VERSION"),
        "\nexit codes: 0 ok, 2 usage, 3 io, 4 parse, 5 schema, 6 config",
    )
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Run(args) => audit::cmd_run(args),
        Commands::CheckConfig { config, json } => audit::cmd_check_config(config, json),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self { code: EXIT_CONFIG, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<AuditError> for CliError {
    fn from(err: AuditError) -> Self {
        let hint = match &err {
            AuditError::Schema(_) => {
                Some("check [sheet] table in the config, or pass --kind orders for order XML".to_string())
            }
            _ => None,
        };
        Self { code: audit_exit_code(&err), message: err.to_string(), hint }
    }
}
