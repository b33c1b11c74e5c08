//! CLI handler for the `tasklog demo` subcommand.

use anyhow::Result;
use tasklog::{LogConfig, setup_logging};
use tokio::task::JoinSet;
use tracing::{debug, info};

/// Install logging and run `tasks` interleaved tasks on the current thread.
///
/// Each task tags `func` with its own name and yields between records, so
/// the output shows records from different tasks alternating while every
/// line still carries the tag of the task that emitted it.
pub(crate) async fn run_demo(config: &LogConfig, tasks: usize) -> Result<()> {
    let registry = setup_logging(config)?;
    info!(tasks, "starting demo");

    let mut set = JoinSet::new();
    for i in 0..tasks {
        let registry = registry.clone();
        set.spawn(async move {
            let _scope = registry.scope();
            registry.set("func", format!("task-{i}"));
            debug!("tagged");

            tokio::task::yield_now().await;
            info!("working");

            tokio::task::yield_now().await;
            info!("done");
        });
    }

    while let Some(joined) = set.join_next().await {
        joined?;
    }

    info!(remaining = registry.identities(), "demo finished");
    Ok(())
}
