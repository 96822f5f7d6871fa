use std::sync::Arc;

use serde::Serialize;
use welcomate_core::{ConnectionBroker, LocalStore};

use crate::binder::LocalServiceBinder;
use crate::commands::common::{open_user_service, CliContext, ConnectMode};
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub db_path: String,
    pub service_db: String,
    pub users: usize,
    pub unsynced: usize,
    pub offline: bool,
    pub service_reachable: bool,
}

pub async fn run_sync(ctx: &CliContext) -> Result<(), CliError> {
    let service = open_user_service(ctx, ConnectMode::Scoped).await?;
    let (reconciled, batch) = service.try_connect_and_sync().await?;
    service.wait_idle().await;

    println!(
        "Sync completed: {} pushed, {} already present, {} pruned, {} operations sent ({} failed)",
        reconciled.pushed,
        reconciled.already_present,
        reconciled.pruned,
        batch.outcomes.len(),
        batch.failed()
    );
    if reconciled.push_failures > 0 || reconciled.check_failures > 0 {
        println!(
            "{} records could not be pushed, {} could not be checked",
            reconciled.push_failures, reconciled.check_failures
        );
    }
    Ok(())
}

pub async fn run_status(ctx: &CliContext, as_json: bool) -> Result<(), CliError> {
    let store = LocalStore::open(&ctx.db_path)?;
    let users = store.list();
    let unsynced = users.iter().filter(|user| !user.synced).count();

    let binder = Arc::new(LocalServiceBinder::new(ctx.service_db.clone(), ctx.offline));
    let service_reachable = ConnectionBroker::new(binder)
        .with_connection(&ctx.config.service, "status probe", |_| async {})
        .await
        .is_ok();

    let report = StatusReport {
        db_path: ctx.db_path.display().to_string(),
        service_db: ctx.service_db.display().to_string(),
        users: users.len(),
        unsynced,
        offline: ctx.offline,
        service_reachable,
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Local database: {}", report.db_path);
    println!("Service database: {}", report.service_db);
    println!("Users: {} ({} pending sync)", report.users, report.unsynced);
    let reachability = if report.service_reachable {
        "reachable"
    } else {
        "unreachable"
    };
    println!("Admin service: {reachability}");
    Ok(())
}
