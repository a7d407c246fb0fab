//! Line processing and the error boundary around dispatch.

use std::sync::Arc;

use kvk_core::command::{CommandCallable, SimpleDispatcher};
use kvk_core::error::CommandError;
use kvk_core::source::CommandSource;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, trace};

use crate::source::ConsoleSource;

/// Dispatches one command line and reports any failure to the requester.
///
/// Returns whether the command succeeded.
pub async fn execute_line(dispatcher: &SimpleDispatcher, source: &dyn CommandSource, line: &str) -> bool {
    debug!(requester = source.name(), line, "processing command");
    match dispatcher.process(source, line).await {
        Ok(()) => true,
        Err(err) if err.is_command_error() => {
            report(dispatcher, source, line, &err);
            false
        }
        Err(err) => {
            error!(error = ?err, line, "unexpected failure while processing command");
            source.send_message("Error: the command failed unexpectedly");
            false
        }
    }
}

fn report(dispatcher: &SimpleDispatcher, source: &dyn CommandSource, line: &str, err: &CommandError) {
    source.send_message(&format!("Error: {err}"));

    match err {
        CommandError::ArgumentParse(parse) => source.send_message(&parse.annotated_position()),
        CommandError::NotFound(alias) => {
            let suggestion = dispatcher.suggest(alias).filter(|suggestion| dispatcher.resolve(suggestion, source).is_some());
            if let Some(suggestion) = suggestion {
                source.send_message(&format!("Did you mean '{suggestion}'?"));
            }
        }
        _ => {}
    }

    if err.should_include_usage() {
        let alias = line.split_whitespace().next().unwrap_or_default();
        let usage = err
            .usage()
            .map(ToString::to_string)
            .or_else(|| dispatcher.resolve(alias, source).map(|mapping| mapping.callable().usage(source)));
        if let Some(usage) = usage {
            source.send_message(format!("Usage: {alias} {usage}").trim_end());
        }
    }
}

/// Returns the command part of `line`, or `None` if it is not a command.
pub fn strip_prefix<'a>(prefix: &str, line: &'a str) -> Option<&'a str> {
    let command = line.trim().strip_prefix(prefix)?;
    if command.trim().is_empty() { None } else { Some(command) }
}

/// Feeds prefixed lines from a reader to the dispatcher on a bounded pool.
pub struct Runner {
    dispatcher: Arc<SimpleDispatcher>,
    source: Arc<ConsoleSource>,
    prefix: String,
    workers: Arc<Semaphore>,
}

impl Runner {
    pub fn new(
        dispatcher: Arc<SimpleDispatcher>,
        source: Arc<ConsoleSource>,
        prefix: impl Into<String>,
        workers: usize,
    ) -> Self {
        Self { dispatcher, source, prefix: prefix.into(), workers: Arc::new(Semaphore::new(workers)) }
    }

    /// Processes lines until `reader` is exhausted, then waits for running
    /// commands. Returns the number of failed commands.
    pub async fn run<R: AsyncBufRead + Unpin>(&self, reader: R) -> anyhow::Result<usize> {
        let mut lines = reader.lines();
        let mut tasks = JoinSet::new();

        while let Some(line) = lines.next_line().await? {
            let Some(command) = strip_prefix(&self.prefix, &line) else {
                trace!(line, "ignoring line without command prefix");
                continue;
            };

            let permit = Arc::clone(&self.workers).acquire_owned().await?;
            let dispatcher = Arc::clone(&self.dispatcher);
            let source = Arc::clone(&self.source);
            let command = command.to_string();
            tasks.spawn(async move {
                let succeeded = execute_line(&dispatcher, source.as_ref(), &command).await;
                drop(permit);
                succeeded
            });
        }

        let mut failures = 0;
        while let Some(result) = tasks.join_next().await {
            match result {
                Ok(true) => {}
                Ok(false) => failures += 1,
                Err(e) => {
                    error!(error = %e, "command task did not complete");
                    failures += 1;
                }
            }
        }
        Ok(failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_prefix() {
        assert_eq!(strip_prefix("-", "-echo hi"), Some("echo hi"));
        assert_eq!(strip_prefix("-", "  -echo hi\r"), Some("echo hi"));
        assert_eq!(strip_prefix("-", "echo hi"), None);
        assert_eq!(strip_prefix("-", "-   "), None);
        assert_eq!(strip_prefix("", "echo"), Some("echo"));
        assert_eq!(strip_prefix("!!", "!!dice 6"), Some("dice 6"));
    }
}
