//! Welcomate CLI - manage local users and sync them with the admin service
//!
//! Every mutation lands in the local store first when the service is out of
//! reach and is pushed on the next `welcomate sync`.

mod binder;
mod cli;
mod commands;
mod error;


use clap::Parser;

use crate::cli::{AdminCommands, Cli, Commands};
use crate::commands::admin::{run_admin_add, run_admin_login, run_admin_users};
use crate::commands::common::{load_config, resolve_db_path, resolve_service_db_path, CliContext};
use crate::commands::sync::{run_status, run_sync};
use crate::commands::users::{
    run_delete, run_export, run_login, run_passwd, run_register, run_users,
};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    init_tracing(config.debug_logging)?;

    let ctx = CliContext {
        db_path: resolve_db_path(cli.db_path),
        service_db: resolve_service_db_path(cli.service_db),
        config,
        offline: cli.offline,
    };

    match cli.command {
        Commands::Register {
            username,
            account,
            password,
        } => run_register(&ctx, &username, &account, &password).await?,
        Commands::Login { account, password } => run_login(&ctx, &account, &password).await?,
        Commands::Passwd {
            username,
            new_password,
        } => run_passwd(&ctx, &username, &new_password).await?,
        Commands::Delete { username } => run_delete(&ctx, &username).await?,
        Commands::Users { json } => run_users(&ctx, json)?,
        Commands::Export { output } => run_export(&ctx, output.as_deref())?,
        Commands::Sync => run_sync(&ctx).await?,
        Commands::Status { json } => run_status(&ctx, json).await?,
        Commands::Admin { command } => match command {
            AdminCommands::Add {
                username,
                account,
                password,
                role,
            } => run_admin_add(&ctx, &username, &account, &password, role)?,
            AdminCommands::Login { account, password } => {
                run_admin_login(&ctx, &account, &password)?;
            }
            AdminCommands::Users => run_admin_users(&ctx)?,
        },
    }

    Ok(())
}

fn init_tracing(debug: bool) -> Result<(), CliError> {
    let directive = if debug { "welcomate=debug" } else { "welcomate=info" };
    let directive = directive
        .parse()
        .map_err(|error| CliError::Config(format!("invalid log directive: {error}")))?;

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(directive))
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}
