use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "welcomate")]
#[command(about = "Manage local users and sync them with the admin service")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to the local user database
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Optional path to the admin service database
    #[arg(long, global = true, value_name = "PATH")]
    pub service_db: Option<PathBuf>,

    /// Optional path to a JSON sync config
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Treat the admin service as unreachable
    #[arg(long, global = true)]
    pub offline: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Register a new user
    Register {
        username: String,
        account: String,
        password: String,
    },
    /// Check credentials and print the username
    Login { account: String, password: String },
    /// Change a user's password
    #[command(alias = "password")]
    Passwd { username: String, new_password: String },
    /// Delete a user
    Delete { username: String },
    /// List local users with their sync status
    Users {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Export local credentials as a JSON sync payload
    Export {
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Reconcile with the admin service and flush pending operations
    Sync,
    /// Show local store and service status
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage the admin service store directly
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum RoleArg {
    User,
    Admin,
}

#[derive(Subcommand)]
pub enum AdminCommands {
    /// Add a user to the service store
    Add {
        username: String,
        account: String,
        password: String,
        #[arg(long, value_enum, default_value_t = RoleArg::User)]
        role: RoleArg,
    },
    /// Administrator login (requires the ADMIN role)
    Login { account: String, password: String },
    /// List users held by the service store
    Users,
}
