//! KVK Core - text command interpretation.
//!
//! This crate turns a line of text from a requester into a parsed, typed
//! argument set and runs the matching command:
//! - Tokenizing with quoting and escapes
//! - A composable argument grammar with backtracking
//! - Alias dispatch with permission filtering and nested sub-commands
//! - Errors positioned in the raw input
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use kvk_core::args::{integer, optional_with};
//! use kvk_core::command::{CommandCallable, CommandSpec, SimpleDispatcher, executor_fn};
//! use kvk_core::source::CommandSource;
//!
//! struct Console;
//!
//! impl CommandSource for Console {
//!     fn name(&self) -> &str {
//!         "console"
//!     }
//!
//!     fn has_permission(&self, _permission: &str) -> bool {
//!         true
//!     }
//!
//!     fn send_message(&self, message: &str) {
//!         println!("{message}");
//!     }
//! }
//!
//! # async fn run() -> kvk_core::Result<()> {
//! let double = CommandSpec::builder()
//!     .arguments(optional_with(integer("n"), 1))
//!     .executor(executor_fn(|source, context| {
//!         Box::pin(async move {
//!             let n: i32 = context.require_one("n")?;
//!             source.send_message(&(n * 2).to_string());
//!             Ok(())
//!         })
//!     }))
//!     .build()
//!     .expect("executor is set");
//!
//! let dispatcher = SimpleDispatcher::new();
//! dispatcher.register(Arc::new(double), &["double", "d"]);
//! dispatcher.process(&Console, "d 21").await
//! # }
//! ```

pub mod args;
pub mod command;
pub mod error;
pub mod source;

#[cfg(test)]
mod testing;

pub use args::{ArgValue, CommandArgs, CommandContext, CommandElement};
pub use command::{CommandCallable, CommandExecutor, CommandMapping, CommandSpec, SimpleDispatcher};
pub use error::{ArgumentParseError, CommandError, ParseResult, Result, SpecError};
pub use source::CommandSource;
