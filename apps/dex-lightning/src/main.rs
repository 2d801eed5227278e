use std::io;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use dex_rpc::DexClient;
use tracing::{error, info};

use dex_lightning::cli::{Cli, Command, ConfigureArgs, UpdateApiArgs};
use dex_lightning::config::AppConfig;
use dex_lightning::node::platform::StatsActivationSource;
use dex_lightning::shell::{Shell, ShellOptions};
use dex_lightning::{bootstrap, telemetry, updater};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if let Err(err) = telemetry::init(&cli.logging.to_config()) {
        eprintln!("⚠️  {err}");
    }

    let result = match &cli.command {
        None | Some(Command::Tui) => run_shell(&cli).await,
        Some(Command::Configure(args)) => configure(args),
        Some(Command::UpdateApi(args)) => update_api(args).await,
    };

    if let Err(err) = result {
        error!(error = %format!("{err:#}"), "dex-lightning exited with an error");
        eprintln!("❌ {err:#}");
        std::process::exit(1);
    }
}

async fn run_shell(cli: &Cli) -> anyhow::Result<()> {
    let config = AppConfig::resolve(cli, || {
        rpassword::prompt_password("Enter MM2 userpass: ")
    })?;
    let client = DexClient::new(&config.dex_url, config.userpass.clone())
        .with_context(|| format!("invalid daemon url {}", config.dex_url))?;
    info!(url = %config.dex_url, "starting lightning shell");

    let source = StatsActivationSource::new(config.activation_commands_url.clone());
    let options = ShellOptions {
        retry: config.retry,
        node_defaults: config.node_defaults.clone(),
        clear_screen: true,
    };
    let stdin = io::stdin();
    let mut shell = Shell::new(Arc::new(client), source, options, stdin.lock(), io::stdout());
    shell.run().await?;
    Ok(())
}

fn configure(args: &ConfigureArgs) -> anyhow::Result<()> {
    let outcome = bootstrap::configure(&args.dir, |key| std::env::var(key).ok())?;
    for path in &outcome.written {
        println!("✅ wrote {}", path.display());
    }
    Ok(())
}

async fn update_api(args: &UpdateApiArgs) -> anyhow::Result<()> {
    let updater = updater::Updater::new(&args.releases_url, &args.root);
    let binary = updater
        .install_api(&args.branch, &args.platform, &args.api)
        .await
        .with_context(|| format!("failed to install API module {}", args.api))?;
    println!("✅ installed {}", binary.display());
    let coins = updater
        .update_coins(&args.coins)
        .await
        .context("failed to refresh coins file")?;
    println!("✅ wrote {}", coins.display());
    Ok(())
}
