use welcomate_core::services::{AdminLogin, AdminStore, Role};

use crate::cli::RoleArg;
use crate::commands::common::CliContext;
use crate::error::CliError;

impl From<RoleArg> for Role {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::User => Self::User,
            RoleArg::Admin => Self::Admin,
        }
    }
}

pub fn run_admin_add(
    ctx: &CliContext,
    username: &str,
    account: &str,
    password: &str,
    role: RoleArg,
) -> Result<(), CliError> {
    let store = AdminStore::open(&ctx.service_db)?;
    let role = Role::from(role);
    if !store.add_user(username, account, password, role)? {
        return Err(CliError::DuplicateServiceUser(account.to_string()));
    }
    println!("Added {username} to service store as {role}");
    Ok(())
}

pub fn run_admin_login(ctx: &CliContext, account: &str, password: &str) -> Result<(), CliError> {
    let store = AdminStore::open(&ctx.service_db)?;
    match store.login_admin_role(account, password)? {
        AdminLogin::Success(username) => {
            println!("{username}");
            Ok(())
        }
        AdminLogin::Failed => Err(CliError::LoginFailed),
        AdminLogin::PermissionDenied => Err(CliError::PermissionDenied),
    }
}

pub fn run_admin_users(ctx: &CliContext) -> Result<(), CliError> {
    let store = AdminStore::open(&ctx.service_db)?;
    let users = store.users()?;
    if users.is_empty() {
        println!("No service users.");
        return Ok(());
    }
    for user in users {
        println!("{:<20}  {:<20}  {}", user.username, user.account, user.role);
    }
    Ok(())
}
