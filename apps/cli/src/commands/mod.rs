//! Commands shipped with the CLI.
//!
//! Every command is registered explicitly at startup.

mod admin;
mod dice;
mod echo;
mod help;
mod timer;

use std::sync::Arc;

use kvk_core::command::SimpleDispatcher;
use tracing::warn;

/// Registers the built-in commands with `dispatcher`.
pub fn register_all(dispatcher: &Arc<SimpleDispatcher>) -> anyhow::Result<()> {
    let commands = [
        (Arc::new(echo::command()?), &["echo"][..]),
        (Arc::new(dice::command()?), &["dice", "roll"][..]),
        (Arc::new(timer::command()?), &["timer"][..]),
        (Arc::new(help::command(Arc::downgrade(dispatcher))?), &["help", "?"][..]),
        (Arc::new(admin::command()?), &["admin"][..]),
    ];

    for (command, aliases) in commands {
        if dispatcher.register_unclaimed(command, aliases).is_none() {
            warn!(?aliases, "every alias already taken, command not registered");
        }
    }
    Ok(())
}
