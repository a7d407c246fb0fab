//! `admin`: permission-gated command group.

use std::sync::Arc;

use kvk_core::args::remaining_joined_strings;
use kvk_core::command::{CommandSpec, executor_fn};
use kvk_core::error::SpecError;

pub const PERMISSION: &str = "kvk.admin";

fn ping() -> Result<CommandSpec, SpecError> {
    CommandSpec::builder()
        .description("Checks that commands run")
        .executor(executor_fn(|source, _| {
            Box::pin(async move {
                source.send_message("pong");
                Ok(())
            })
        }))
        .build()
}

fn say() -> Result<CommandSpec, SpecError> {
    CommandSpec::builder()
        .description("Announces a message")
        .arguments(remaining_joined_strings("message"))
        .executor(executor_fn(|source, context| {
            Box::pin(async move {
                let message: String = context.require_one("message")?;
                source.send_message(&format!("[{}] {message}", source.name()));
                Ok(())
            })
        }))
        .build()
}

pub fn command() -> Result<CommandSpec, SpecError> {
    CommandSpec::builder()
        .description("Administrative commands")
        .permission(PERMISSION)
        .executor(executor_fn(|source, _| {
            Box::pin(async move {
                source.send_message("Admin commands: ping, say <message...>");
                Ok(())
            })
        }))
        .child(Arc::new(ping()?), &["ping"])
        .child(Arc::new(say()?), &["say", "announce"])
        .build()
}
