//! Invocable commands and alias dispatch.
//!
//! Anything a requester can run implements [`CommandCallable`]: a single
//! [`CommandSpec`], or a whole [`SimpleDispatcher`] mounted as a child of
//! another command. A [`CommandMapping`] binds one callable to the aliases
//! it was registered under.

mod dispatcher;
mod spec;

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

pub use dispatcher::{Disambiguator, SimpleDispatcher, first_disambiguator};
pub use spec::{CommandExecutor, CommandSpec, CommandSpecBuilder, ExecutorFn, ExecutorFuture, executor_fn};

use crate::error::Result;
use crate::source::CommandSource;

/// Something a requester can invoke with a line of argument text.
#[async_trait]
pub trait CommandCallable: Send + Sync {
    /// Parses `arguments` and runs the command.
    async fn process(&self, source: &dyn CommandSource, arguments: &str) -> Result<()>;

    /// Whether `source` may run this command at all.
    fn test_permission(&self, source: &dyn CommandSource) -> bool;

    /// One-line description.
    fn short_description(&self, source: &dyn CommandSource) -> Option<String>;

    /// Argument grammar, without the command's own alias.
    fn usage(&self, source: &dyn CommandSource) -> String;

    /// Long help text. Defaults to the short description followed by the
    /// usage line.
    fn help(&self, source: &dyn CommandSource) -> Option<String> {
        let usage = self.usage(source);
        match self.short_description(source) {
            Some(description) => Some(format!("{description}\n{usage}")),
            None => Some(usage),
        }
    }

    /// The grammar-backed form of this callable, if it has one.
    ///
    /// Sub-command nodes use this to parse a child's arguments in place
    /// rather than handing it the raw remainder.
    fn as_spec(&self) -> Option<&CommandSpec> {
        None
    }
}

/// A callable registered under a primary alias and any number of
/// secondary ones.
#[derive(Clone)]
pub struct CommandMapping {
    primary_alias: String,
    secondary_aliases: BTreeSet<String>,
    callable: Arc<dyn CommandCallable>,
}

impl CommandMapping {
    pub fn new(
        callable: Arc<dyn CommandCallable>,
        primary_alias: impl Into<String>,
        secondary_aliases: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            primary_alias: primary_alias.into(),
            secondary_aliases: secondary_aliases.into_iter().collect(),
            callable,
        }
    }

    pub fn primary_alias(&self) -> &str {
        &self.primary_alias
    }

    pub fn secondary_aliases(&self) -> &BTreeSet<String> {
        &self.secondary_aliases
    }

    /// The primary alias followed by the secondary ones.
    pub fn all_aliases(&self) -> Vec<&str> {
        std::iter::once(self.primary_alias.as_str())
            .chain(self.secondary_aliases.iter().map(String::as_str))
            .collect()
    }

    pub fn callable(&self) -> &Arc<dyn CommandCallable> {
        &self.callable
    }
}

impl fmt::Debug for CommandMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandMapping")
            .field("primary_alias", &self.primary_alias)
            .field("secondary_aliases", &self.secondary_aliases)
            .finish_non_exhaustive()
    }
}
