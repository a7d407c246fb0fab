//! `echo`: repeats a message back.

use kvk_core::args::{flags, integer, remaining_joined_strings};
use kvk_core::command::{CommandSpec, executor_fn};
use kvk_core::error::{CommandError, SpecError};

const MAX_REPEATS: i32 = 5;

pub fn command() -> Result<CommandSpec, SpecError> {
    CommandSpec::builder()
        .description("Repeats a message back")
        .arguments(
            flags()
                .flag(&["-upper", "u"])
                .value_flag(integer("times"), &["-times", "n"])
                .build_with(remaining_joined_strings("message")),
        )
        .executor(executor_fn(|source, context| {
            Box::pin(async move {
                let mut message: String = context.require_one("message")?;
                if context.has_any("upper") {
                    message = message.to_uppercase();
                }

                let times = context.get_one::<i32>("times").unwrap_or(1);
                if !(1..=MAX_REPEATS).contains(&times) {
                    return Err(CommandError::generic_with_usage(format!(
                        "A message can be repeated 1 to {MAX_REPEATS} times"
                    )));
                }

                for _ in 0..times {
                    source.send_message(&message);
                }
                Ok(())
            })
        }))
        .build()
}
