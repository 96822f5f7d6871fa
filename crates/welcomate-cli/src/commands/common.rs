use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use welcomate_core::{
    ConnectionBroker, LocalStore, ServiceBinder, SyncConfig, UserRecord, UserService,
};

use crate::binder::LocalServiceBinder;
use crate::error::CliError;

/// Resolved paths and settings shared by every command.
#[derive(Debug, Clone)]
pub struct CliContext {
    pub db_path: PathBuf,
    pub service_db: PathBuf,
    pub config: SyncConfig,
    pub offline: bool,
}

#[derive(Debug, Serialize)]
pub struct UserListItem {
    pub username: String,
    pub account: String,
    pub synced: bool,
    pub updated_at: i64,
    pub updated_at_iso: String,
    pub relative_time: String,
}

/// How the user service should reach the admin service.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConnectMode {
    /// Hold a primary handle for the whole command (reconciles on connect)
    Primary,
    /// Only scoped connections opened on demand
    Scoped,
}

pub async fn open_user_service(ctx: &CliContext, mode: ConnectMode) -> Result<UserService, CliError> {
    let store = LocalStore::open(&ctx.db_path)?;
    let binder = Arc::new(LocalServiceBinder::new(ctx.service_db.clone(), ctx.offline));
    let service = UserService::from_config(
        store,
        ConnectionBroker::new(binder.clone()),
        ctx.config.clone(),
    );

    if mode == ConnectMode::Primary && !ctx.offline {
        match binder.bind(&ctx.config.service).await {
            Ok(remote) => {
                service.set_primary(remote);
                service.wait_idle().await;
            }
            Err(error) => {
                tracing::warn!("Admin service unavailable, working offline: {error}");
            }
        }
    }

    Ok(service)
}

pub fn load_config(path: Option<&Path>) -> Result<SyncConfig, CliError> {
    let path = path.map_or_else(default_config_path, Path::to_path_buf);
    let config = SyncConfig::load(&path)?.with_env_overrides();
    config.validate()?;
    Ok(config)
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os("WELCOMATE_DB_PATH").map(PathBuf::from))
        .unwrap_or_else(|| default_data_path("users.db"))
}

pub fn resolve_service_db_path(cli_service_db: Option<PathBuf>) -> PathBuf {
    cli_service_db
        .or_else(|| env::var_os("WELCOMATE_SERVICE_DB").map(PathBuf::from))
        .unwrap_or_else(|| default_data_path("service.db"))
}

fn default_data_path(file_name: &str) -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("welcomate")
        .join(file_name)
}

fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("welcomate")
        .join("sync.json")
}

pub fn user_to_list_item(user: &UserRecord) -> UserListItem {
    let now_ms = Utc::now().timestamp_millis();
    UserListItem {
        username: user.username.clone(),
        account: user.account.clone(),
        synced: user.synced,
        updated_at: user.updated_at,
        updated_at_iso: format_timestamp(user.updated_at),
        relative_time: format_relative_time(user.updated_at, now_ms),
    }
}

pub fn format_user_lines(users: &[UserRecord]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    users
        .iter()
        .map(|user| {
            let status = if user.synced { "synced" } else { "pending" };
            let relative_time = format_relative_time(user.updated_at, now_ms);
            format!(
                "{:<20}  {:<20}  {status:<7}  {relative_time}",
                user.username, user.account
            )
        })
        .collect()
}

pub fn format_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else {
        format!("{}d ago", diff / day)
    }
}
