mod bundle;
mod commands;
mod config;
mod history_file;
mod output;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Register external HTTP APIs, test them, and convert definitions to and from cURL/JSON.
#[derive(Parser, Debug)]
#[command(name = "apidesk", version, about, long_about = None)]
pub struct Cli {
    /// Config file (default: `$XDG_CONFIG_HOME/apidesk/config.json`).
    #[arg(long, global = true, env = "APIDESK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log filter used when `RUST_LOG` is not set.
    #[arg(long, global = true, default_value = "warn", env = "APIDESK_LOG_LEVEL")]
    pub log_level: String,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Translate between cURL command lines and requests.
    #[command(subcommand)]
    Curl(CurlCommand),
    /// Validate a JSON import document and write a definition bundle.
    Import {
        /// Import document (`-` for stdin).
        input: PathBuf,
        /// Write the bundle here instead of stdout.
        #[arg(long, short)]
        out: Option<PathBuf>,
    },
    /// Export bundled APIs as a registry document (credentials omitted).
    Export {
        /// Definition bundles.
        #[arg(required = true)]
        bundles: Vec<PathBuf>,
        #[arg(long, short)]
        out: Option<PathBuf>,
    },
    /// Resolve, execute and record one test.
    Test(TestArgs),
    /// Show recorded tests for an API, most recent first.
    History {
        api_id: String,
        #[arg(long)]
        limit: Option<usize>,
        /// Print entries as JSON.
        #[arg(long)]
        json: bool,
    },
    /// List the MCP tools an API exposes.
    Tools {
        bundle: PathBuf,
    },
    /// Show or change the CLI config file.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug)]
pub enum CurlCommand {
    /// Parse a cURL command into request JSON.
    Parse {
        /// File holding the command (`-` or omitted for stdin).
        input: Option<PathBuf>,
        /// Print a definition bundle (API + endpoint) instead of the request.
        #[arg(long)]
        definitions: bool,
        /// API name used with `--definitions`.
        #[arg(long, default_value = "Imported from cURL")]
        api_name: String,
    },
    /// Render request JSON as a cURL command.
    Render {
        /// File holding the request JSON (`-` or omitted for stdin).
        input: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    Show,
    Set { key: String, value: String },
}

#[derive(Args, Debug)]
pub struct TestArgs {
    /// Definition bundle to test.
    #[arg(long, short, required_unless_present = "curl", conflicts_with = "curl")]
    pub bundle: Option<PathBuf>,
    /// Endpoint id or name within the bundle.
    #[arg(long, short, requires = "bundle")]
    pub endpoint: Option<String>,
    /// Test an ad-hoc cURL command instead of a bundle.
    #[arg(long)]
    pub curl: Option<String>,

    /// Use this URL verbatim.
    #[arg(long)]
    pub url: Option<String>,
    #[arg(long = "request", short = 'X')]
    pub method: Option<String>,
    /// `Name: value`, repeatable; wins over stored headers.
    #[arg(long = "header", short = 'H')]
    pub headers: Vec<String>,
    /// Request body; wins over the endpoint body template.
    #[arg(long = "data", short = 'd')]
    pub body: Option<String>,

    #[arg(long)]
    pub timeout_ms: Option<u64>,
    #[arg(long)]
    pub max_response_bytes: Option<usize>,
    #[arg(long)]
    pub no_follow_redirects: bool,
    #[arg(long)]
    pub history_path: Option<PathBuf>,
    /// Do not record this test.
    #[arg(long)]
    pub no_history: bool,

    /// Also write the test report document here.
    #[arg(long)]
    pub report: Option<PathBuf>,
    /// Print the result as JSON.
    #[arg(long)]
    pub json: bool,
}

fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_json);

    match commands::run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
