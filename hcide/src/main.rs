mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands, PackagesAction};
use hcide_core::config::{load_dotenv, ToolchainConfig};
use hcide_core::observability;
use hcide_toolchain::PackageOp;

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv();
    observability::init_tracing();
    let cli = Cli::parse();
    let config = ToolchainConfig::from_env();

    match cli.command {
        Commands::Find { kind } => {
            if !commands::find::cmd_find(kind).await? {
                std::process::exit(1);
            }
        }
        Commands::Version { kind, path } => {
            commands::find::cmd_version(kind, path).await?;
        }
        Commands::Install { kind, dir } => {
            if !commands::install::cmd_install(kind, dir, &config).await? {
                std::process::exit(1);
            }
        }
        Commands::New {
            name,
            kind,
            dir,
            no_install,
        } => {
            commands::new::cmd_new(&name, kind, dir, no_install, &config).await?;
        }
        Commands::Packages { action } => match action {
            PackagesAction::List { kind, target, json } => {
                commands::packages::cmd_list(kind, target, json, &config).await?;
            }
            PackagesAction::Install {
                kind,
                package,
                target,
            } => mutate(PackageOp::Install, kind, &package, target, &config).await?,
            PackagesAction::Uninstall {
                kind,
                package,
                target,
            } => mutate(PackageOp::Uninstall, kind, &package, target, &config).await?,
            PackagesAction::Update {
                kind,
                package,
                target,
            } => mutate(PackageOp::Update, kind, &package, target, &config).await?,
            PackagesAction::Search { kind, query } => {
                commands::packages::cmd_search(kind, &query).await?;
            }
        },
        Commands::Run {
            kind,
            entry,
            target,
            timeout,
        } => {
            let code = commands::run::cmd_run(kind, entry, target, timeout, &config).await?;
            if code != 0 {
                std::process::exit(code);
            }
        }
    }
    Ok(())
}

async fn mutate(
    op: PackageOp,
    kind: hcide_toolchain::RuntimeKind,
    package: &str,
    target: cli::TargetArgs,
    config: &ToolchainConfig,
) -> Result<()> {
    if !commands::packages::cmd_mutate(op, kind, package, target, config).await? {
        std::process::exit(1);
    }
    Ok(())
}
