mod auth;
mod bitbucket;
mod config;
mod package;
mod prompt;
mod session;

use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, info, info_span, Instrument};
use tracing_subscriber::EnvFilter;

/// bump-deps: bumps dependency versions in a Bitbucket repository's
/// package.json and opens a pull request with the change.
#[derive(Parser, Debug)]
#[command(name = "bump-deps", version, about)]
struct Cli {
    /// Packages to update, as name@version (e.g., -p lodash@4.17.21 react@18.2.0)
    #[arg(short, long, required = true, num_args = 1..)]
    packages: Vec<String>,

    /// Path of the manifest inside the repository [default: package.json]
    #[arg(short, long)]
    file: Option<String>,

    /// Config file to use instead of .bump-deps.toml
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    run(cli).instrument(info_span!("bump_deps")).await
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let packages = package::PackageSpec::parse_all(&cli.packages)?;
    for spec in &packages {
        debug!(%spec, "requested update");
    }

    info!("loading configuration");
    let config = config::Config::load(cli.config.as_deref())?;
    let path = cli.file.unwrap_or_else(|| config.update.file.clone());

    let prompter = prompt::TerminalPrompter::new();
    let credential = auth::resolve(&config.bitbucket, &prompter)?;
    let api = bitbucket::HttpBitbucket::new(&config.bitbucket.api_url, credential)?;

    let mut session = session::UpdateSession::new(&api, &prompter, config.update.clone(), packages);
    session.init().await?;
    let pull_request = session.update_and_pull(&path).await?;
    info!(id = pull_request.id, title = %pull_request.title, state = %session.state(), "done");

    Ok(())
}
