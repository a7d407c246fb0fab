//! Parsed argument storage.

use std::collections::BTreeMap;

use super::value::{ArgValue, FromArgValue};
use crate::error::{CommandError, Result};
use crate::source::CommandSource;

/// Values parsed for one command invocation.
///
/// Every key maps to an ordered list of values. Values are only ever
/// appended, so repeating and optional elements can share a key without
/// clobbering each other.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandContext {
    parsed_args: BTreeMap<String, Vec<ArgValue>>,
}

/// A full copy of a [`CommandContext`], restorable with
/// [`CommandContext::apply_snapshot`].
#[derive(Debug, Clone, PartialEq)]
pub struct ContextSnapshot {
    args: BTreeMap<String, Vec<ArgValue>>,
}

impl CommandContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value under `key`.
    pub fn put_arg(&mut self, key: impl Into<String>, value: impl Into<ArgValue>) {
        self.parsed_args.entry(key.into()).or_default().push(value.into());
    }

    /// All raw values stored under `key`, in insertion order.
    pub fn values(&self, key: &str) -> &[ArgValue] {
        self.parsed_args.get(key).map_or(&[], Vec::as_slice)
    }

    /// All values under `key` that convert to `T`.
    pub fn get_all<T: FromArgValue>(&self, key: &str) -> Vec<T> {
        self.values(key).iter().filter_map(T::from_arg_value).collect()
    }

    /// The value under `key`, if exactly one is stored and it converts to `T`.
    pub fn get_one<T: FromArgValue>(&self, key: &str) -> Option<T> {
        match self.values(key) {
            [value] => T::from_arg_value(value),
            _ => None,
        }
    }

    /// Like [`CommandContext::get_one`] but reports why nothing was returned.
    pub fn require_one<T: FromArgValue>(&self, key: &str) -> Result<T> {
        match self.values(key) {
            [value] => T::from_arg_value(value).ok_or_else(|| {
                CommandError::generic(format!("Argument '{key}' has unexpected type {}", value.kind()))
            }),
            [] => Err(CommandError::generic(format!("No value present for argument '{key}'"))),
            many => Err(CommandError::generic(format!(
                "Expected one value for argument '{key}', found {}",
                many.len()
            ))),
        }
    }

    pub fn has_any(&self, key: &str) -> bool {
        self.parsed_args.get(key).is_some_and(|values| !values.is_empty())
    }

    /// Keys with at least one value, in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.parsed_args.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.parsed_args.is_empty()
    }

    /// Fails with a permission error if `source` lacks `permission`.
    pub fn check_permission(&self, source: &dyn CommandSource, permission: &str) -> Result<()> {
        if source.has_permission(permission) {
            Ok(())
        } else {
            Err(CommandError::Permission)
        }
    }

    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot { args: self.parsed_args.clone() }
    }

    /// Replaces the whole store with the snapshot's contents.
    pub fn apply_snapshot(&mut self, snapshot: &ContextSnapshot) {
        self.parsed_args.clone_from(&snapshot.args);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_append_in_order() {
        let mut context = CommandContext::new();
        context.put_arg("n", 1);
        context.put_arg("n", 2);
        context.put_arg("n", 1);
        assert_eq!(context.get_all::<i32>("n"), vec![1, 2, 1]);
        assert!(context.has_any("n"));
        assert!(!context.has_any("m"));
    }

    #[test]
    fn test_get_one_requires_exactly_one() {
        let mut context = CommandContext::new();
        assert_eq!(context.get_one::<String>("s"), None);
        context.put_arg("s", "a");
        assert_eq!(context.get_one::<String>("s"), Some("a".to_string()));
        context.put_arg("s", "b");
        assert_eq!(context.get_one::<String>("s"), None);
    }

    #[test]
    fn test_require_one_errors() {
        let mut context = CommandContext::new();
        let missing = context.require_one::<i32>("x").unwrap_err();
        assert!(missing.to_string().contains("No value present"));

        context.put_arg("x", "text");
        let wrong = context.require_one::<i32>("x").unwrap_err();
        assert!(wrong.to_string().contains("unexpected type string"));

        context.put_arg("x", "more");
        let many = context.require_one::<String>("x").unwrap_err();
        assert!(many.to_string().contains("found 2"));
    }

    #[test]
    fn test_snapshot_restores_everything() {
        let mut context = CommandContext::new();
        context.put_arg("a", 1);
        let snapshot = context.snapshot();

        context.put_arg("a", 2);
        context.put_arg("b", true);
        context.apply_snapshot(&snapshot);

        assert_eq!(context.get_all::<i32>("a"), vec![1]);
        assert!(!context.has_any("b"));
        assert_eq!(context.keys().collect::<Vec<_>>(), vec!["a"]);
    }
}
