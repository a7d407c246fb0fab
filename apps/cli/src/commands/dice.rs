//! `dice`: rolls a number in a range.

use kvk_core::args::{integer, optional_with, seq};
use kvk_core::command::{CommandSpec, executor_fn};
use kvk_core::error::{CommandError, SpecError};
use rand::Rng;

pub fn command() -> Result<CommandSpec, SpecError> {
    CommandSpec::builder()
        .description("Rolls a random number")
        .extended_description("Rolls between <from> and <to> inclusive. <from> defaults to 1.")
        .arguments(seq(vec![integer("to"), optional_with(integer("from"), 1)]))
        .executor(executor_fn(|source, context| {
            Box::pin(async move {
                let to: i32 = context.require_one("to")?;
                let from: i32 = context.require_one("from")?;
                if from > to {
                    return Err(CommandError::generic_with_usage(format!(
                        "The lower bound {from} is above the upper bound {to}"
                    )));
                }

                let rolled = rand::thread_rng().gen_range(from..=to);
                source.send_message(&format!("Rolled {rolled} ({from}..{to})"));
                Ok(())
            })
        }))
        .build()
}
