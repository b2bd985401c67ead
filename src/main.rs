use std::net::SocketAddr;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use gtestsmith::analyzer;
use gtestsmith::config::AppConfig;
use gtestsmith::server;

#[derive(Parser)]
#[command(
    name = "gtestsmith",
    version,
    about = "LLM-assisted unit test generation service for C++ projects"
)]
struct Cli {
    /// Listen address for the HTTP API (overrides config)
    #[arg(long)]
    listen: Option<SocketAddr>,

    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Run the repository analyzer once and print its JSON report
    Analyze {
        /// Repository URL to clone and scan
        repo_url: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gtestsmith=info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::load();
    if let Some(listen) = cli.listen {
        config.listen = listen;
    }

    match cli.command {
        Some(CliCommand::Analyze { repo_url }) => {
            let report = analyzer::analyze_repository(&config.analyzer_script, &repo_url).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        None => server::serve(config).await,
    }
}
