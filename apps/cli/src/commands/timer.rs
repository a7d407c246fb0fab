//! `timer`: replies after a delay.

use std::time::Duration;

use kvk_core::args::{duration, optional, remaining_joined_strings, seq};
use kvk_core::command::{CommandSpec, executor_fn};
use kvk_core::error::{CommandError, SpecError};
use tracing::debug;

const MAX_DURATION: Duration = Duration::from_secs(60 * 60);

pub fn command() -> Result<CommandSpec, SpecError> {
    CommandSpec::builder()
        .description("Replies after a delay")
        .extended_description("Durations look like 10s, 5m, 1h30m or PT2M.")
        .arguments(seq(vec![duration("duration"), optional(remaining_joined_strings("text"))]))
        .executor(executor_fn(|source, context| {
            Box::pin(async move {
                let delay: Duration = context.require_one("duration")?;
                if delay > MAX_DURATION {
                    return Err(CommandError::generic_with_usage("Timers are limited to one hour"));
                }
                let text = context.get_one::<String>("text");

                source.send_message(&format!("Timer set for {delay:?}"));
                debug!(requester = source.name(), ?delay, "timer started");
                tokio::time::sleep(delay).await;

                match text {
                    Some(text) => source.send_message(&format!("Time is up: {text}")),
                    None => source.send_message("Time is up!"),
                }
                Ok(())
            })
        }))
        .build()
}
