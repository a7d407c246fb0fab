//! A rollback-capable cursor over tokenized arguments.

use std::sync::Arc;

use super::tokenizer::SingleArg;
use crate::error::{ArgumentParseError, ParseResult};

/// Cursor over the tokens of one command invocation.
///
/// The cursor counts how many tokens have been consumed; the "current"
/// token is the last one consumed. Tokens live behind an [`Arc`] so a
/// [`Snapshot`] is a refcount bump, and only destructive edits
/// ([`CommandArgs::insert_arg`], [`CommandArgs::remove_args`]) copy the
/// token vector.
#[derive(Debug, Clone)]
pub struct CommandArgs {
    raw: Arc<str>,
    args: Arc<Vec<SingleArg>>,
    consumed: usize,
}

/// A restorable capture of a cursor's position and tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    consumed: usize,
    args: Arc<Vec<SingleArg>>,
}

impl Snapshot {
    /// Number of tokens that had been consumed when the snapshot was taken.
    pub fn consumed(&self) -> usize {
        self.consumed
    }
}

impl CommandArgs {
    pub fn new(raw: impl Into<Arc<str>>, args: Vec<SingleArg>) -> Self {
        Self { raw: raw.into(), args: Arc::new(args), consumed: 0 }
    }

    /// The raw text the tokens were produced from.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn has_next(&self) -> bool {
        self.consumed < self.args.len()
    }

    /// Returns the next token's value without consuming it.
    pub fn peek(&self) -> ParseResult<&str> {
        self.args
            .get(self.consumed)
            .map(|arg| arg.value.as_str())
            .ok_or_else(|| self.create_error("Not enough arguments"))
    }

    /// The next token, if any, without consuming it.
    pub fn peek_arg(&self) -> Option<&SingleArg> {
        self.args.get(self.consumed)
    }

    /// Consumes and returns the next token's value.
    pub fn next(&mut self) -> ParseResult<String> {
        self.next_if_present().ok_or_else(|| self.create_error("Not enough arguments!"))
    }

    pub fn next_if_present(&mut self) -> Option<String> {
        let value = self.args.get(self.consumed)?.value.clone();
        self.consumed += 1;
        Some(value)
    }

    /// Steps back one token. Does nothing at the start.
    pub fn previous(&mut self) {
        self.consumed = self.consumed.saturating_sub(1);
    }

    /// Inserts a synthetic token right after the current one.
    ///
    /// The token is zero-width, positioned at the end of the current token
    /// (or at 0 before anything was consumed).
    pub fn insert_arg(&mut self, value: impl Into<String>) {
        let offset = self.current_arg().map_or(0, |arg| arg.end);
        let at = self.consumed;
        Arc::make_mut(&mut self.args).insert(at, SingleArg::new(value, offset, offset));
    }

    /// Removes the tokens consumed between two snapshots.
    ///
    /// The range covers the token that was current at `start` through the
    /// token that was current at `end`. A cursor inside the removed range
    /// moves to just before it; a cursor after it shifts back.
    pub fn remove_args(&mut self, start: &Snapshot, end: &Snapshot) {
        let len = self.args.len();
        let hi = end.consumed.min(len);
        let lo = start.consumed.saturating_sub(1).min(hi);
        if lo == hi {
            return;
        }

        if self.consumed > lo {
            if self.consumed < hi {
                self.consumed = lo;
            } else {
                self.consumed -= hi - lo;
            }
        }
        Arc::make_mut(&mut self.args).drain(lo..hi);
    }

    /// Number of tokens consumed so far.
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Total number of tokens, consumed or not.
    pub fn size(&self) -> usize {
        self.args.len()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(|arg| arg.value.as_str())
    }

    /// Every token value, consumed or not.
    pub fn all(&self) -> Vec<&str> {
        self.args.iter().map(|arg| arg.value.as_str()).collect()
    }

    pub fn args(&self) -> &[SingleArg] {
        &self.args
    }

    /// Start offset of the current token, or 0 if none has been consumed.
    pub fn raw_position(&self) -> usize {
        self.current_arg().map_or(0, |arg| arg.start)
    }

    /// A parse error positioned at the current token.
    pub fn create_error(&self, message: impl Into<String>) -> ArgumentParseError {
        ArgumentParseError::new(message, self.raw.as_ref(), self.raw_position())
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot { consumed: self.consumed, args: Arc::clone(&self.args) }
    }

    /// Restores the position of `snapshot`, and its tokens when `reset_args`
    /// is set.
    pub fn apply_snapshot(&mut self, snapshot: &Snapshot, reset_args: bool) {
        self.consumed = snapshot.consumed;
        if reset_args {
            self.args = Arc::clone(&snapshot.args);
        }
    }

    /// The most recently consumed token.
    pub fn current_arg(&self) -> Option<&SingleArg> {
        self.consumed.checked_sub(1).and_then(|index| self.args.get(index))
    }
}
