//! Alias dispatch.
//!
//! [`SimpleDispatcher`] maps lower-cased aliases to the commands registered
//! under them. Several commands may share an alias; a [`Disambiguator`]
//! picks one at lookup time.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use strsim::levenshtein;
use tracing::{debug, trace};

use super::{CommandCallable, CommandMapping};
use crate::error::{CommandError, Result};
use crate::source::CommandSource;

/// Chooses one mapping among several registered under the same alias.
///
/// Receives the requester (if known), the alias as typed, and the
/// candidates in registration order.
pub type Disambiguator =
    Arc<dyn Fn(Option<&dyn CommandSource>, &str, &[Arc<CommandMapping>]) -> Option<Arc<CommandMapping>> + Send + Sync>;

/// Prefers the candidate whose primary alias is the alias used, otherwise
/// the first one registered.
pub fn first_disambiguator() -> Disambiguator {
    Arc::new(|_source, alias_used, candidates| {
        candidates
            .iter()
            .find(|mapping| mapping.primary_alias().to_lowercase() == alias_used.to_lowercase())
            .or_else(|| candidates.first())
            .cloned()
    })
}

/// Lower-cased alias to the mappings registered under it.
pub type AliasTable = BTreeMap<String, Vec<Arc<CommandMapping>>>;

/// Thread-safe alias table and the top-level entry point for command lines.
pub struct SimpleDispatcher {
    commands: RwLock<AliasTable>,
    disambiguator: Disambiguator,
}

impl SimpleDispatcher {
    /// Creates an empty dispatcher using [`first_disambiguator`].
    pub fn new() -> Self {
        Self::with_disambiguator(first_disambiguator())
    }

    pub fn with_disambiguator(disambiguator: Disambiguator) -> Self {
        Self { commands: RwLock::new(BTreeMap::new()), disambiguator }
    }

    fn read(&self) -> RwLockReadGuard<'_, AliasTable> {
        self.commands.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, AliasTable> {
        self.commands.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers `callable` under every alias. The first alias is primary.
    ///
    /// Returns `None` when `aliases` is empty.
    pub fn register<S: AsRef<str>>(
        &self,
        callable: Arc<dyn CommandCallable>,
        aliases: &[S],
    ) -> Option<Arc<CommandMapping>> {
        self.register_with(callable, aliases, |aliases, _| aliases)
    }

    /// Registers `callable` under the aliases `accept` lets through.
    ///
    /// `accept` receives the candidate aliases and the current table and
    /// runs under the registry's write lock, so it sees a consistent table.
    pub fn register_with<S, F>(
        &self,
        callable: Arc<dyn CommandCallable>,
        aliases: &[S],
        accept: F,
    ) -> Option<Arc<CommandMapping>>
    where
        S: AsRef<str>,
        F: FnOnce(Vec<String>, &AliasTable) -> Vec<String>,
    {
        let candidates = aliases.iter().map(|alias| alias.as_ref().to_string()).collect();
        let mut commands = self.write();

        let mut accepted = accept(candidates, &commands).into_iter();
        let primary = accepted.next()?;
        let secondary: Vec<String> = accepted.collect();

        let mapping = Arc::new(CommandMapping::new(callable, primary, secondary));
        let keys: BTreeSet<String> = mapping.all_aliases().into_iter().map(|alias| alias.to_lowercase()).collect();
        for key in keys {
            commands.entry(key).or_default().push(Arc::clone(&mapping));
        }

        debug!(primary = mapping.primary_alias(), aliases = ?mapping.all_aliases(), "registered command");
        Some(mapping)
    }

    /// Registers `callable` under those of `aliases` nobody else holds yet.
    pub fn register_unclaimed<S: AsRef<str>>(
        &self,
        callable: Arc<dyn CommandCallable>,
        aliases: &[S],
    ) -> Option<Arc<CommandMapping>> {
        self.register_with(callable, aliases, |candidates, commands| {
            candidates.into_iter().filter(|alias| !commands.contains_key(&alias.to_lowercase())).collect()
        })
    }

    /// Removes every mapping registered under `alias`, returning them.
    pub fn remove(&self, alias: &str) -> Vec<Arc<CommandMapping>> {
        let removed = self.write().remove(&alias.to_lowercase()).unwrap_or_default();
        if !removed.is_empty() {
            debug!(alias, count = removed.len(), "removed alias");
        }
        removed
    }

    /// Removes every alias in `aliases`. Returns whether anything was removed.
    pub fn remove_all<S: AsRef<str>>(&self, aliases: &[S]) -> bool {
        let mut commands = self.write();
        let mut found = false;
        for alias in aliases {
            found |= commands.remove(&alias.as_ref().to_lowercase()).is_some_and(|removed| !removed.is_empty());
        }
        found
    }

    /// Removes `mapping` from every alias it is registered under.
    pub fn remove_mapping(&self, mapping: &Arc<CommandMapping>) -> Option<Arc<CommandMapping>> {
        let found = self.retain_mappings(|candidate| !Arc::ptr_eq(candidate, mapping));
        if found {
            debug!(primary = mapping.primary_alias(), "removed mapping");
            Some(Arc::clone(mapping))
        } else {
            None
        }
    }

    /// Removes each of `mappings`. Returns whether anything was removed.
    pub fn remove_mappings(&self, mappings: &[Arc<CommandMapping>]) -> bool {
        self.retain_mappings(|candidate| !mappings.iter().any(|mapping| Arc::ptr_eq(candidate, mapping)))
    }

    fn retain_mappings(&self, keep: impl Fn(&Arc<CommandMapping>) -> bool) -> bool {
        let mut commands = self.write();
        let mut found = false;
        for mappings in commands.values_mut() {
            let before = mappings.len();
            mappings.retain(&keep);
            found |= mappings.len() != before;
        }
        commands.retain(|_, mappings| !mappings.is_empty());
        found
    }

    /// Every distinct registered mapping, in alias order.
    pub fn commands(&self) -> Vec<Arc<CommandMapping>> {
        let mut seen: Vec<Arc<CommandMapping>> = Vec::new();
        for mapping in self.read().values().flatten() {
            if !seen.iter().any(|known| Arc::ptr_eq(known, mapping)) {
                seen.push(Arc::clone(mapping));
            }
        }
        seen
    }

    pub fn primary_aliases(&self) -> BTreeSet<String> {
        self.read().values().flatten().map(|mapping| mapping.primary_alias().to_string()).collect()
    }

    /// Every alias of every mapping, in its registered case.
    pub fn aliases(&self) -> BTreeSet<String> {
        self.read()
            .values()
            .flatten()
            .flat_map(|mapping| mapping.all_aliases().into_iter().map(str::to_string).collect::<Vec<_>>())
            .collect()
    }

    /// Resolves `alias` without a permission check.
    pub fn get(&self, alias: &str) -> Option<Arc<CommandMapping>> {
        self.lookup(alias, None)
    }

    /// Resolves `alias` for `source`, hiding commands it may not run.
    pub fn resolve(&self, alias: &str, source: &dyn CommandSource) -> Option<Arc<CommandMapping>> {
        self.lookup(alias, Some(source))
    }

    fn lookup(&self, alias: &str, source: Option<&dyn CommandSource>) -> Option<Arc<CommandMapping>> {
        let candidates = self.get_all(alias);
        let chosen = match candidates.as_slice() {
            [] => None,
            [only] => Some(Arc::clone(only)),
            many => {
                let chosen = (self.disambiguator)(source, alias, many);
                trace!(alias, candidates = many.len(), chosen = ?chosen.as_ref().map(|m| m.primary_alias()), "disambiguated");
                chosen
            }
        };
        chosen.filter(|mapping| source.is_none_or(|source| mapping.callable().test_permission(source)))
    }

    /// All mappings under `alias`, in registration order.
    pub fn get_all(&self, alias: &str) -> Vec<Arc<CommandMapping>> {
        self.read().get(&alias.to_lowercase()).cloned().unwrap_or_default()
    }

    pub fn contains_alias(&self, alias: &str) -> bool {
        self.read().contains_key(&alias.to_lowercase())
    }

    pub fn contains_mapping(&self, mapping: &Arc<CommandMapping>) -> bool {
        self.read().values().flatten().any(|candidate| Arc::ptr_eq(candidate, mapping))
    }

    /// Number of alias-to-mapping entries.
    pub fn size(&self) -> usize {
        self.read().values().map(Vec::len).sum()
    }

    /// The registered alias closest to `alias`, for "did you mean" hints.
    pub fn suggest(&self, alias: &str) -> Option<String> {
        let alias = alias.to_lowercase();
        self.read()
            .keys()
            .map(|candidate| (levenshtein(candidate, &alias), candidate))
            .filter(|(distance, candidate)| *distance * 2 <= candidate.len().max(alias.len()))
            .min_by_key(|(distance, _)| *distance)
            .map(|(_, candidate)| candidate.clone())
    }

    /// Primary aliases of the commands `source` may run, deduplicated.
    fn permitted_primary_aliases(&self, source: &dyn CommandSource) -> BTreeSet<String> {
        self.commands()
            .iter()
            .filter(|mapping| mapping.callable().test_permission(source))
            .map(|mapping| mapping.primary_alias().to_string())
            .collect()
    }
}

impl Default for SimpleDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Splits a command line into its first word and the rest.
fn split_command_line(line: &str) -> (&str, &str) {
    match line.find(char::is_whitespace) {
        Some(index) => (&line[..index], line[index..].trim_start()),
        None => (line, ""),
    }
}

#[async_trait]
impl CommandCallable for SimpleDispatcher {
    async fn process(&self, source: &dyn CommandSource, command_line: &str) -> Result<()> {
        let (alias, arguments) = split_command_line(command_line);
        if alias.is_empty() {
            return Err(CommandError::generic("No command given"));
        }

        let Some(mapping) = self.resolve(alias, source) else {
            return Err(CommandError::NotFound(alias.to_string()));
        };
        trace!(alias, primary = mapping.primary_alias(), "dispatching");

        match mapping.callable().process(source, arguments).await {
            Err(CommandError::NotFound(child)) => {
                Err(CommandError::generic(format!("No such child command: {child}")))
            }
            result => result,
        }
    }

    fn test_permission(&self, source: &dyn CommandSource) -> bool {
        self.commands().iter().any(|mapping| mapping.callable().test_permission(source))
    }

    fn short_description(&self, _source: &dyn CommandSource) -> Option<String> {
        None
    }

    fn usage(&self, source: &dyn CommandSource) -> String {
        self.permitted_primary_aliases(source).into_iter().collect::<Vec<_>>().join("|")
    }

    fn help(&self, source: &dyn CommandSource) -> Option<String> {
        if self.read().is_empty() {
            return None;
        }
        let mut help = String::from("Available commands:");
        for alias in self.permitted_primary_aliases(source) {
            help.push('\n');
            help.push_str(&alias);
        }
        Some(help)
    }
}
