use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use dex_rpc::DEFAULT_DEX_URL;

use crate::node::activation::DEFAULT_POLL_ATTEMPTS;
use crate::node::platform::DEFAULT_ACTIVATION_COMMANDS_URL;
use crate::node::session::DEFAULT_PAYMENT_RETRIES;
use crate::telemetry::{LogConfig, LogLevel};
use crate::updater::{DEFAULT_API_BRANCH, DEFAULT_COINS_BRANCH, DEFAULT_PLATFORM, DEFAULT_RELEASES_URL};

#[derive(Parser, Debug)]
#[command(
    name = "dex-lightning",
    about = "⚡ Lightning node shell for the DEX API daemon",
    author,
    version
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        env = "DEX_URL",
        default_value = DEFAULT_DEX_URL,
        help = "JSON-RPC endpoint of the local DEX daemon"
    )]
    pub dex_url: String,

    #[arg(
        long,
        global = true,
        env = "MM2_USERPASS",
        hide_env_values = true,
        value_name = "SECRET",
        help = "Daemon rpc password; prompted for when unset"
    )]
    pub userpass: Option<String>,

    #[command(flatten)]
    pub logging: LoggingArgs,

    #[command(flatten)]
    pub activation: ActivationArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Args, Debug, Clone)]
pub struct LoggingArgs {
    #[arg(
        long = "log-level",
        global = true,
        value_enum,
        env = "DEX_LOG_LEVEL",
        default_value_t = LogLevel::Warn,
        help = "Minimum log level (error, warn, info, debug, trace)"
    )]
    pub level: LogLevel,

    #[arg(
        long = "log-file",
        global = true,
        value_name = "PATH",
        env = "DEX_LOG_FILE",
        help = "Write logs to the specified file instead of stderr"
    )]
    pub file: Option<PathBuf>,
}

impl LoggingArgs {
    pub fn to_config(&self) -> LogConfig {
        LogConfig {
            level: self.level,
            file: self.file.clone(),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ActivationArgs {
    #[arg(
        long = "poll-attempts",
        global = true,
        env = "DEX_ACTIVATION_POLL_ATTEMPTS",
        default_value_t = DEFAULT_POLL_ATTEMPTS,
        help = "Status queries before an activation task is cancelled"
    )]
    pub poll_attempts: u32,

    #[arg(
        long = "poll-interval-ms",
        global = true,
        env = "DEX_ACTIVATION_POLL_INTERVAL_MS",
        default_value_t = 2_000,
        help = "Delay between activation status queries"
    )]
    pub poll_interval_ms: u64,

    #[arg(
        long = "payment-retries",
        global = true,
        env = "DEX_PAYMENT_RETRIES",
        default_value_t = DEFAULT_PAYMENT_RETRIES,
        help = "Payment retries configured on newly activated nodes"
    )]
    pub payment_retries: u32,

    #[arg(
        long = "activation-commands-url",
        global = true,
        env = "DEX_ACTIVATION_COMMANDS_URL",
        default_value = DEFAULT_ACTIVATION_COMMANDS_URL,
        help = "Endpoint serving UTXO coin activation commands"
    )]
    pub activation_commands_url: String,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the interactive lightning shell (default when no subcommand given)
    Tui,
    /// Create or update MM2.json, the rpc file and .env for the daemon
    Configure(ConfigureArgs),
    /// Download a daemon build and refresh the coins file
    UpdateApi(UpdateApiArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ConfigureArgs {
    #[arg(
        long,
        value_name = "DIR",
        default_value = ".",
        help = "Directory holding MM2.json, rpc and .env"
    )]
    pub dir: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct UpdateApiArgs {
    #[arg(short = 'a', long = "api", help = "Commit hash of the API module to download")]
    pub api: String,

    #[arg(
        short = 'b',
        long = "branch",
        default_value = DEFAULT_API_BRANCH,
        help = "Branch of the API module to download"
    )]
    pub branch: String,

    #[arg(
        short = 'c',
        long = "coins",
        default_value = DEFAULT_COINS_BRANCH,
        help = "Branch of the coins file to download"
    )]
    pub coins: String,

    #[arg(
        short = 'p',
        long = "platform",
        default_value = DEFAULT_PLATFORM,
        help = "Platform of the API module (linux, mac, win)"
    )]
    pub platform: String,

    #[arg(
        long = "releases-url",
        env = "DEX_RELEASES_URL",
        default_value = DEFAULT_RELEASES_URL,
        help = "Index hosting the API module builds"
    )]
    pub releases_url: String,

    #[arg(
        long = "root",
        value_name = "DIR",
        default_value = ".",
        help = "Directory the binary and coins file are installed into"
    )]
    pub root: PathBuf,
}
