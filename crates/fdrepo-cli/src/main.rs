//! fdrepo CLI

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use fdrepo_cli::cmd;
use fdrepo_cli::context::RepoContext;
use fdrepo_cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // RUST_LOG wins unless -v asks for everything
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Completions { shell } => {
            cmd::completions::completions(shell);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Add(ref args) => {
            cmd::add::add(&cli.apps_path(), args).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Update(ref args) => {
            let ctx = RepoContext::load(&cli)?;
            cmd::update::update(&ctx, args).await
        }
        Commands::Check(ref args) => {
            let ctx = RepoContext::load(&cli)?;
            cmd::check::check(&ctx, args).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Status { ref markdown } => {
            let ctx = RepoContext::load(&cli)?;
            cmd::status::status(&ctx, markdown.as_deref()).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
