//! QTI CLI - command-line client for the QTI test delivery API.

mod commands;
mod output;

use clap::{Parser, Subcommand};
use commands::{Context, Role};
use qti_config::{Config, Paths};
use std::path::PathBuf;
use tracing::debug;

/// QTI CLI - sign in and call the test delivery API.
#[derive(Parser)]
#[command(name = "qti")]
#[command(about = "Command-line client for the QTI test delivery API")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(short, long, default_value = "text", global = true)]
    format: output::OutputFormat,

    /// Log level (trace, debug, info, warn, error); defaults to the config file
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Account API to use
    #[arg(long, default_value = "teacher", global = true)]
    role: Role,

    /// Override the API base URL
    #[arg(long, env = "QTI_API_URL", global = true)]
    api_url: Option<String>,

    /// Mirror log output to stderr
    #[arg(long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Login with email and password
    Login {
        /// Account email; prompted for when omitted
        #[arg(short, long)]
        email: Option<String>,
    },

    /// Logout and clear stored credentials
    Logout,

    /// Check authentication status
    Status,

    /// GET an API path and print the response data
    Get {
        /// Path relative to the API base URL
        path: String,
    },

    /// List assessments
    Assessments,

    /// List deliveries of an assessment
    Deliveries {
        /// Assessment ID
        assessment_id: String,
    },

    /// List uploaded packages
    Packages,

    /// Upload a QTI package
    Upload {
        /// Path to the package zip
        file: PathBuf,
    },

    /// Download delivery results as CSV
    Results {
        /// Delivery code
        delivery_code: String,
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn load_context(cli: &Cli) -> anyhow::Result<Context> {
    let paths = Paths::new()?;
    paths.ensure_dirs()?;

    let mut config = Config::load(&paths)?;
    if let Some(api_url) = &cli.api_url {
        config.api_url = api_url.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }

    Ok(Context {
        config,
        paths,
        role: cli.role,
    })
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let ctx = load_context(&cli)?;

    let log_file = ctx.paths.log_file();
    qti_config::init_logging(&ctx.config.log_level, Some(&log_file), cli.verbose)?;
    debug!(
        api_url = %ctx.config.api_url,
        app_id = %ctx.config.app_id,
        level = %qti_config::parse_level(&ctx.config.log_level),
        "Configuration loaded"
    );

    let format = cli.format;
    match cli.command {
        Commands::Login { email } => commands::login(&ctx, email, format).await,
        Commands::Logout => commands::logout(&ctx, format).await,
        Commands::Status => commands::status(&ctx, format).await,
        Commands::Get { path } => commands::get(&ctx, &path, format).await,
        Commands::Assessments => commands::assessments(&ctx, format).await,
        Commands::Deliveries { assessment_id } => {
            commands::deliveries(&ctx, &assessment_id, format).await
        }
        Commands::Packages => commands::packages(&ctx, format).await,
        Commands::Upload { file } => commands::upload(&ctx, &file, format).await,
        Commands::Results {
            delivery_code,
            output,
        } => commands::results(&ctx, &delivery_code, output.as_deref(), format).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let format = cli.format;

    if let Err(e) = run(cli).await {
        output::print_error(&format!("{:#}", e), format);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn role_and_format_are_global() {
        let cli = Cli::try_parse_from(["qti", "status", "--role", "tools", "-f", "json"]).unwrap();
        assert_eq!(cli.role, Role::Tools);
        assert_eq!(cli.format, output::OutputFormat::Json);
        assert!(matches!(cli.command, Commands::Status));
    }

    #[test]
    fn results_output_is_optional() {
        let cli = Cli::try_parse_from(["qti", "results", "D1"]).unwrap();
        match cli.command {
            Commands::Results {
                delivery_code,
                output,
            } => {
                assert_eq!(delivery_code, "D1");
                assert!(output.is_none());
            }
            _ => panic!("expected results command"),
        }
    }
}
