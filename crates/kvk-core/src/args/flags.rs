//! Flag parsing.
//!
//! Flags may appear anywhere in the input. [`CommandFlags`] scans every
//! token, parses and removes the ones that are flags, rewinds, and hands the
//! remaining tokens to the wrapped element.
//!
//! Specs starting with `-` declare long flags (`"-force"` is `--force`);
//! any other spec declares one short flag per character (`"fv"` is `-f` and
//! `-v`, combinable as `-fv`).

use std::collections::HashMap;

use super::context::CommandContext;
use super::cursor::CommandArgs;
use super::element::CommandElement;
use super::{mark_true, requiring_permission};
use crate::error::ParseResult;
use crate::source::CommandSource;

const EM_DASH: char = '\u{2014}';

/// What to do with a flag that was never declared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnknownFlagBehavior {
    /// Fail the parse.
    Error,
    /// Store `true` (or the `=value` part of a long flag) under the flag name.
    AcceptNonValue,
    /// Store the following token (or the `=value` part) under the flag name.
    AcceptValue,
    /// Leave the token for the wrapped element.
    #[default]
    Ignore,
}

/// Grammar node for flags. Build one with [`FlagsBuilder`].
#[derive(Debug, Clone)]
pub struct CommandFlags {
    child: CommandElement,
    usage_flags: Vec<(Vec<String>, CommandElement)>,
    short_flags: HashMap<char, CommandElement>,
    long_flags: HashMap<String, CommandElement>,
    unknown_short: UnknownFlagBehavior,
    unknown_long: UnknownFlagBehavior,
    anchor_flags: bool,
}

impl CommandFlags {
    pub(crate) fn parse(
        &self,
        source: &dyn CommandSource,
        args: &mut CommandArgs,
        context: &mut CommandContext,
    ) -> ParseResult<()> {
        let state = args.snapshot();
        while let Some(token) = args.next_if_present() {
            let arg = token.replace(EM_DASH, "--");
            if let Some(flag) = arg.strip_prefix('-').filter(|flag| !flag.is_empty()) {
                let start = args.snapshot();
                let remove = if let Some(long) = flag.strip_prefix('-') {
                    self.parse_long_flag(source, long, args, context)?
                } else {
                    self.parse_short_flags(source, flag, args, context)?
                };
                if remove {
                    let end = args.snapshot();
                    args.remove_args(&start, &end);
                }
            } else if self.anchor_flags {
                break;
            }
        }

        // flag tokens were removed, so only the position is restored
        args.apply_snapshot(&state, false);
        self.child.parse(source, args, context)
    }

    fn parse_long_flag(
        &self,
        source: &dyn CommandSource,
        long_flag: &str,
        args: &mut CommandArgs,
        context: &mut CommandContext,
    ) -> ParseResult<bool> {
        let (name, value) = match long_flag.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (long_flag, None),
        };
        let flag = name.to_lowercase();

        let Some(element) = self.long_flags.get(&flag) else {
            return match self.unknown_long {
                UnknownFlagBehavior::Error => Err(args.create_error(format!("Unknown long flag {name} specified"))),
                UnknownFlagBehavior::AcceptNonValue => {
                    match value {
                        Some(value) => context.put_arg(flag, value),
                        None => context.put_arg(flag, true),
                    }
                    Ok(true)
                }
                UnknownFlagBehavior::AcceptValue => {
                    let value = match value {
                        Some(value) => value.to_string(),
                        None => args.next()?,
                    };
                    context.put_arg(flag, value);
                    Ok(true)
                }
                UnknownFlagBehavior::Ignore => Ok(false),
            };
        };

        if let Some(value) = value {
            args.insert_arg(value);
        }
        element.parse(source, args, context)?;
        Ok(true)
    }

    fn parse_short_flags(
        &self,
        source: &dyn CommandSource,
        short_flags: &str,
        args: &mut CommandArgs,
        context: &mut CommandContext,
    ) -> ParseResult<bool> {
        for (i, flag) in short_flags.chars().enumerate() {
            if let Some(element) = self.short_flags.get(&flag) {
                element.parse(source, args, context)?;
                continue;
            }
            match self.unknown_short {
                // an unknown first character means this is not a flag group at all
                UnknownFlagBehavior::Ignore if i == 0 => return Ok(false),
                UnknownFlagBehavior::Ignore | UnknownFlagBehavior::Error => {
                    return Err(args.create_error(format!("Unknown short flag {flag} specified")));
                }
                UnknownFlagBehavior::AcceptNonValue => context.put_arg(flag.to_string(), true),
                UnknownFlagBehavior::AcceptValue => {
                    let value = args.next()?;
                    context.put_arg(flag.to_string(), value);
                }
            }
        }
        Ok(true)
    }

    pub(crate) fn usage(&self, source: &dyn CommandSource) -> String {
        let mut parts: Vec<String> = self
            .usage_flags
            .iter()
            .map(|(names, element)| {
                let names = names
                    .iter()
                    .map(|name| if name.chars().count() > 1 { format!("--{name}") } else { format!("-{name}") })
                    .collect::<Vec<_>>()
                    .join("|");
                let value = element.usage(source);
                if value.trim().is_empty() { format!("[{names}]") } else { format!("[{names}={value}]") }
            })
            .collect();

        let child = self.child.usage(source);
        if !child.is_empty() {
            parts.push(child);
        }
        parts.join(" ")
    }
}

/// Builder for [`CommandFlags`].
#[derive(Debug, Clone, Default)]
pub struct FlagsBuilder {
    usage_flags: Vec<(Vec<String>, CommandElement)>,
    short_flags: HashMap<char, CommandElement>,
    long_flags: HashMap<String, CommandElement>,
    unknown_short: UnknownFlagBehavior,
    unknown_long: UnknownFlagBehavior,
    anchor_flags: bool,
}

impl FlagsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Boolean flags; `true` is written under the first spec's name.
    #[must_use]
    pub fn flag(self, specs: &[&str]) -> Self {
        self.add(|key| mark_true(key), specs)
    }

    /// Boolean flags that fail the parse unless the requester holds
    /// `permission`.
    #[must_use]
    pub fn permission_flag(self, permission: &str, specs: &[&str]) -> Self {
        self.add(|key| requiring_permission(mark_true(key), permission), specs)
    }

    /// Flags taking a value parsed by `value`.
    #[must_use]
    pub fn value_flag(self, value: CommandElement, specs: &[&str]) -> Self {
        self.add(|_| value.clone(), specs)
    }

    #[must_use]
    pub fn unknown_long_flag_behavior(mut self, behavior: UnknownFlagBehavior) -> Self {
        self.unknown_long = behavior;
        self
    }

    #[must_use]
    pub fn unknown_short_flag_behavior(mut self, behavior: UnknownFlagBehavior) -> Self {
        self.unknown_short = behavior;
        self
    }

    /// Stop scanning at the first token that is not a flag.
    #[must_use]
    pub fn anchor_flags(mut self, anchor_flags: bool) -> Self {
        self.anchor_flags = anchor_flags;
        self
    }

    /// Finishes the flags, handing non-flag tokens to `child`.
    pub fn build_with(self, child: CommandElement) -> CommandElement {
        CommandElement::Flags(Box::new(CommandFlags {
            child,
            usage_flags: self.usage_flags,
            short_flags: self.short_flags,
            long_flags: self.long_flags,
            unknown_short: self.unknown_short,
            unknown_long: self.unknown_long,
            anchor_flags: self.anchor_flags,
        }))
    }

    fn add(mut self, make: impl Fn(&str) -> CommandElement, specs: &[&str]) -> Self {
        let mut names = Vec::new();
        let mut element: Option<CommandElement> = None;

        for spec in specs {
            if let Some(long) = spec.strip_prefix('-') {
                let shared = element.get_or_insert_with(|| make(long)).clone();
                names.push(long.to_string());
                self.long_flags.insert(long.to_lowercase(), shared);
            } else {
                for flag in spec.chars() {
                    let key = flag.to_string();
                    let shared = element.get_or_insert_with(|| make(&key)).clone();
                    names.push(key);
                    self.short_flags.insert(flag, shared);
                }
            }
        }

        if let Some(element) = element {
            self.usage_flags.push((names, element));
        }
        self
    }
}
