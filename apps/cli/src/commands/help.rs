//! `help`: lists commands or describes one.

use std::sync::Weak;

use kvk_core::args::{optional, string};
use kvk_core::command::{CommandCallable, CommandSpec, SimpleDispatcher, executor_fn};
use kvk_core::error::{CommandError, SpecError};

/// Builds the help command. It holds the registry weakly since the registry
/// owns it.
pub fn command(dispatcher: Weak<SimpleDispatcher>) -> Result<CommandSpec, SpecError> {
    CommandSpec::builder()
        .description("Lists commands or shows help for one")
        .arguments(optional(string("command")))
        .executor(executor_fn(move |source, context| {
            let dispatcher = dispatcher.upgrade();
            Box::pin(async move {
                let Some(dispatcher) = dispatcher else {
                    return Err(CommandError::generic("The command registry is shutting down"));
                };

                let Some(name) = context.get_one::<String>("command") else {
                    let help = dispatcher.help(source).unwrap_or_else(|| "No commands available".to_string());
                    source.send_message(&help);
                    return Ok(());
                };

                let mapping = dispatcher
                    .resolve(&name, source)
                    .ok_or_else(|| CommandError::generic(format!("Unknown command '{name}'")))?;
                let callable = mapping.callable();

                let usage = format!("Usage: {} {}", mapping.primary_alias(), callable.usage(source));
                source.send_message(usage.trim_end());
                if let Some(description) = callable.short_description(source) {
                    source.send_message(&description);
                }
                if let Some(extended) = callable.as_spec().and_then(CommandSpec::extended_description) {
                    source.send_message(extended);
                }
                if !mapping.secondary_aliases().is_empty() {
                    let aliases: Vec<&str> = mapping.secondary_aliases().iter().map(String::as_str).collect();
                    source.send_message(&format!("Aliases: {}", aliases.join(", ")));
                }
                Ok(())
            })
        }))
        .build()
}
