use std::path::Path;

use welcomate_core::models::encode_records;
use welcomate_core::LocalStore;

use crate::commands::common::{
    format_user_lines, open_user_service, user_to_list_item, CliContext, ConnectMode,
    UserListItem,
};
use crate::error::CliError;

pub async fn run_register(
    ctx: &CliContext,
    username: &str,
    account: &str,
    password: &str,
) -> Result<(), CliError> {
    let service = open_user_service(ctx, ConnectMode::Primary).await?;
    let registered = service.register(username, account, password).await;
    service.wait_idle().await;

    if !registered {
        return Err(CliError::RegistrationFailed(username.to_string()));
    }
    println!("Registered {username} ({})", service.state());
    Ok(())
}

pub async fn run_login(ctx: &CliContext, account: &str, password: &str) -> Result<(), CliError> {
    let service = open_user_service(ctx, ConnectMode::Primary).await?;
    let username = service.login(account, password).await;
    service.wait_idle().await;

    let username = username.ok_or(CliError::LoginFailed)?;
    println!("{username}");
    Ok(())
}

pub async fn run_passwd(
    ctx: &CliContext,
    username: &str,
    new_password: &str,
) -> Result<(), CliError> {
    let service = open_user_service(ctx, ConnectMode::Primary).await?;
    let updated = service.update_password(username, new_password).await;
    service.wait_idle().await;

    if !updated {
        return Err(CliError::PasswordUpdateFailed(username.to_string()));
    }
    println!("Password updated for {username}");
    Ok(())
}

pub async fn run_delete(ctx: &CliContext, username: &str) -> Result<(), CliError> {
    let service = open_user_service(ctx, ConnectMode::Primary).await?;
    let deleted = service.delete_user(username).await;
    service.wait_idle().await;

    if !deleted {
        return Err(CliError::DeleteFailed(username.to_string()));
    }
    println!("Deleted {username}");
    Ok(())
}

pub fn run_users(ctx: &CliContext, as_json: bool) -> Result<(), CliError> {
    let store = LocalStore::open(&ctx.db_path)?;
    let users = store.list();

    if as_json {
        let items = users
            .iter()
            .map(user_to_list_item)
            .collect::<Vec<UserListItem>>();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if users.is_empty() {
        println!("No local users.");
        return Ok(());
    }
    for line in format_user_lines(&users) {
        println!("{line}");
    }
    Ok(())
}

pub fn run_export(ctx: &CliContext, output: Option<&Path>) -> Result<(), CliError> {
    let store = LocalStore::open(&ctx.db_path)?;
    let payload = encode_records(&store.all_records_for_sync())?;

    if let Some(path) = output {
        std::fs::write(path, payload)?;
        println!("Exported local users to {}", path.display());
    } else {
        println!("{payload}");
    }
    Ok(())
}
