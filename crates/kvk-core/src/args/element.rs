//! The argument grammar.
//!
//! A [`CommandElement`] consumes tokens from a [`CommandArgs`] cursor and
//! appends typed values to a [`CommandContext`]. Elements compose: the
//! combinators own their children and are responsible for rolling the
//! cursor and context back when a child fails and they try something else.
//!
//! An element that fails leaves whatever it consumed consumed. Rollback is
//! always the caller's job.

use std::fmt;
use std::sync::Arc;

use regex::RegexBuilder;
use tracing::trace;
use url::Url;
use uuid::Uuid;

use super::child::ChildCommandExecutor;
use super::context::CommandContext;
use super::cursor::CommandArgs;
use super::flags::CommandFlags;
use super::leaf;
use super::value::ArgValue;
use crate::error::ParseResult;
use crate::source::CommandSource;

/// Choice lists longer than this are shown as `<key>` in usage.
pub const CHOICES_CUTOFF: usize = 5;

/// Single-token value types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    String,
    Integer,
    Long,
    Double,
    Bool,
    Duration,
    Color,
    Uuid,
    Url,
}

/// A node of the argument grammar.
#[derive(Clone)]
pub enum CommandElement {
    /// Accepts nothing and writes nothing.
    None,
    /// Writes `true` under `key` without consuming input.
    MarkTrue { key: String },
    /// One token parsed as a [`ValueKind`].
    Value { key: String, kind: ValueKind },
    /// One token looked up in a fixed table.
    Choices {
        key: String,
        choices: Vec<(String, ArgValue)>,
        case_sensitive: bool,
        show_in_usage: bool,
    },
    /// One token matched against a choice list by exact name, prefix or
    /// anchored regex. Every match is written.
    Pattern {
        key: String,
        choices: Vec<(String, ArgValue)>,
        use_regex: bool,
    },
    /// A date-time, optionally defaulting to now.
    DateTime { key: String, or_now: bool },
    /// Children in order. A failure aborts the sequence.
    Sequence(Vec<CommandElement>),
    /// The first child that parses, with rollback between attempts.
    FirstParsing(Vec<CommandElement>),
    /// A child that may be absent or invalid.
    Optional {
        element: Box<CommandElement>,
        default: Option<ArgValue>,
        /// Re-raise the child's error when it ran out of input.
        strict: bool,
    },
    /// Repeats a child until input is exhausted.
    AllOf(Box<CommandElement>),
    /// A child that must produce at most one value.
    OnlyOne(Box<CommandElement>),
    /// A child gated by a permission.
    Permission {
        element: Box<CommandElement>,
        permission: String,
        /// Skip silently instead of failing when the permission is missing.
        weak: bool,
    },
    /// Every remaining token joined into one string.
    RemainingJoined { key: String, raw: bool },
    /// Flags anywhere in the input, then a child for the rest.
    Flags(Box<CommandFlags>),
    /// Sub-command dispatch.
    Child(Arc<ChildCommandExecutor>),
}

impl CommandElement {
    /// The key this element writes under, if it writes a single key.
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::MarkTrue { key }
            | Self::Value { key, .. }
            | Self::Choices { key, .. }
            | Self::Pattern { key, .. }
            | Self::DateTime { key, .. }
            | Self::RemainingJoined { key, .. } => Some(key),
            Self::Optional { element, .. }
            | Self::AllOf(element)
            | Self::OnlyOne(element)
            | Self::Permission { element, .. } => element.key(),
            Self::Child(child) => Some(child.key()),
            Self::None | Self::Sequence(_) | Self::FirstParsing(_) | Self::Flags(_) => None,
        }
    }

    /// Consumes tokens from `args`, appending results to `context`.
    pub fn parse(
        &self,
        source: &dyn CommandSource,
        args: &mut CommandArgs,
        context: &mut CommandContext,
    ) -> ParseResult<()> {
        match self {
            Self::None => Ok(()),
            Self::MarkTrue { key } => {
                context.put_arg(key.as_str(), true);
                Ok(())
            }
            Self::Value { key, kind } => {
                let value = parse_value(*kind, args)?;
                context.put_arg(key.as_str(), value);
                Ok(())
            }
            Self::Choices { key, choices, case_sensitive, .. } => {
                let input = args.next()?;
                let found = choices.iter().find(|(name, _)| {
                    if *case_sensitive { *name == input } else { name.to_lowercase() == input.to_lowercase() }
                });
                match found {
                    Some((_, value)) => {
                        context.put_arg(key.as_str(), value.clone());
                        Ok(())
                    }
                    None => Err(args.create_error(format!(
                        "Argument was not a valid choice. Valid choices: {}",
                        choice_names(choices).join(", ")
                    ))),
                }
            }
            Self::Pattern { key, choices, use_regex } => {
                for value in match_pattern(key, choices, *use_regex, args)? {
                    context.put_arg(key.as_str(), value);
                }
                Ok(())
            }
            Self::DateTime { key, or_now } => {
                let value = parse_date_time(*or_now, args)?;
                context.put_arg(key.as_str(), ArgValue::DateTime(value));
                Ok(())
            }
            Self::Sequence(elements) => {
                for element in elements {
                    element.parse(source, args, context)?;
                }
                Ok(())
            }
            Self::FirstParsing(elements) => parse_first(elements, source, args, context),
            Self::Optional { element, default, strict } => {
                parse_optional(element, default.as_ref(), *strict, source, args, context)
            }
            Self::AllOf(element) => {
                while args.has_next() {
                    let before = args.consumed();
                    element.parse(source, args, context)?;
                    if args.consumed() == before {
                        break;
                    }
                }
                Ok(())
            }
            Self::OnlyOne(element) => {
                element.parse(source, args, context)?;
                if let Some(key) = element.key()
                    && context.values(key).len() > 1
                {
                    return Err(args.create_error(format!("Argument {key} may have only one value!")));
                }
                Ok(())
            }
            Self::Permission { element, permission, weak } => {
                if source.has_permission(permission) {
                    element.parse(source, args, context)
                } else if *weak {
                    Ok(())
                } else {
                    Err(args.create_error(format!(
                        "You do not have permission to use the {} argument",
                        element.key().unwrap_or("unknown")
                    )))
                }
            }
            Self::RemainingJoined { key, raw } => {
                let value = if *raw { remaining_raw(args)? } else { remaining_joined(args)? };
                context.put_arg(key.as_str(), value);
                Ok(())
            }
            Self::Flags(flags) => flags.parse(source, args, context),
            Self::Child(child) => child.parse(source, args, context),
        }
    }

    /// Renders this element's grammar for `source`.
    pub fn usage(&self, source: &dyn CommandSource) -> String {
        match self {
            Self::None | Self::MarkTrue { .. } => String::new(),
            Self::Value { key, .. } | Self::Pattern { key, .. } => format!("<{key}>"),
            Self::Choices { key, choices, show_in_usage, .. } => {
                if *show_in_usage {
                    format!("<{}>", choice_names(choices).join("|"))
                } else {
                    format!("<{key}>")
                }
            }
            Self::DateTime { key, or_now } => {
                if *or_now {
                    format!("[{key}]")
                } else {
                    format!("<{key}>")
                }
            }
            Self::Sequence(elements) => elements
                .iter()
                .map(|element| element.usage(source))
                .filter(|usage| !usage.is_empty())
                .collect::<Vec<_>>()
                .join(" "),
            Self::FirstParsing(elements) => {
                elements.iter().map(|element| element.usage(source)).collect::<Vec<_>>().join("|")
            }
            Self::Optional { element, .. } => {
                let inner = element.usage(source);
                if inner.is_empty() { inner } else { format!("[{inner}]") }
            }
            Self::AllOf(element) => format!("{}*", element.usage(source)),
            Self::OnlyOne(element) => element.usage(source),
            Self::Permission { element, permission, weak } => {
                if *weak && !source.has_permission(permission) {
                    String::new()
                } else {
                    element.usage(source)
                }
            }
            Self::RemainingJoined { key, .. } => format!("<{key}...>"),
            Self::Flags(flags) => flags.usage(source),
            Self::Child(child) => child.element_usage(source),
        }
    }
}

impl fmt::Debug for CommandElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::MarkTrue { key } => f.debug_struct("MarkTrue").field("key", key).finish(),
            Self::Value { key, kind } => f.debug_struct("Value").field("key", key).field("kind", kind).finish(),
            Self::Choices { key, choices, .. } => f
                .debug_struct("Choices")
                .field("key", key)
                .field("choices", &choice_names(choices))
                .finish(),
            Self::Pattern { key, use_regex, .. } => {
                f.debug_struct("Pattern").field("key", key).field("use_regex", use_regex).finish()
            }
            Self::DateTime { key, or_now } => {
                f.debug_struct("DateTime").field("key", key).field("or_now", or_now).finish()
            }
            Self::Sequence(elements) => f.debug_tuple("Sequence").field(elements).finish(),
            Self::FirstParsing(elements) => f.debug_tuple("FirstParsing").field(elements).finish(),
            Self::Optional { element, strict, .. } => {
                f.debug_struct("Optional").field("element", element).field("strict", strict).finish()
            }
            Self::AllOf(element) => f.debug_tuple("AllOf").field(element).finish(),
            Self::OnlyOne(element) => f.debug_tuple("OnlyOne").field(element).finish(),
            Self::Permission { element, permission, weak } => f
                .debug_struct("Permission")
                .field("element", element)
                .field("permission", permission)
                .field("weak", weak)
                .finish(),
            Self::RemainingJoined { key, raw } => {
                f.debug_struct("RemainingJoined").field("key", key).field("raw", raw).finish()
            }
            Self::Flags(flags) => f.debug_tuple("Flags").field(flags).finish(),
            Self::Child(child) => f.debug_tuple("Child").field(&child.key()).finish(),
        }
    }
}

fn choice_names(choices: &[(String, ArgValue)]) -> Vec<&str> {
    choices.iter().map(|(name, _)| name.as_str()).collect()
}

fn parse_value(kind: ValueKind, args: &mut CommandArgs) -> ParseResult<ArgValue> {
    let input = args.next()?;
    let parsed = match kind {
        ValueKind::String => return Ok(ArgValue::Str(input)),
        ValueKind::Integer => leaf::parse_int(&input).map(ArgValue::Int),
        ValueKind::Long => leaf::parse_long(&input).map(ArgValue::Long),
        ValueKind::Double => leaf::parse_double(&input).map(ArgValue::Float),
        ValueKind::Bool => leaf::parse_bool(&input).map(ArgValue::Bool),
        ValueKind::Duration => leaf::parse_duration(&input).map(ArgValue::Duration),
        ValueKind::Color => leaf::parse_color(&input).map(ArgValue::Color),
        ValueKind::Uuid => Uuid::parse_str(&input).ok().map(ArgValue::Uuid),
        ValueKind::Url => Url::parse(&input).ok().map(ArgValue::Url),
    };
    parsed.ok_or_else(|| args.create_error(invalid_value_message(kind, &input)))
}

fn invalid_value_message(kind: ValueKind, input: &str) -> String {
    match kind {
        ValueKind::Integer => format!("Expected an integer, but input '{input}' was not"),
        ValueKind::Long => format!("Expected a long, but input '{input}' was not"),
        ValueKind::Double => format!("Expected a number, but input '{input}' was not"),
        ValueKind::Bool => format!("Expected a boolean, but input '{input}' was not"),
        ValueKind::Duration => format!("Invalid duration '{input}'!"),
        ValueKind::Color => format!("Invalid color '{input}'!"),
        ValueKind::Uuid => format!("Invalid UUID '{input}'!"),
        ValueKind::Url => format!("Invalid URL '{input}'!"),
        ValueKind::String => format!("Invalid value '{input}'!"),
    }
}

fn parse_date_time(or_now: bool, args: &mut CommandArgs) -> ParseResult<chrono::NaiveDateTime> {
    if or_now && !args.has_next() {
        return Ok(leaf::now());
    }
    let state = args.snapshot();
    let input = args.next()?;
    if let Some(parsed) = leaf::parse_date_time(&input) {
        return Ok(parsed);
    }
    if or_now {
        args.apply_snapshot(&state, true);
        return Ok(leaf::now());
    }
    Err(args.create_error(format!("Invalid date-time '{input}'!")))
}

fn match_pattern(
    key: &str,
    choices: &[(String, ArgValue)],
    use_regex: bool,
    args: &mut CommandArgs,
) -> ParseResult<Vec<ArgValue>> {
    let input = args.next()?;
    let lowered = input.to_lowercase();

    if let Some((_, value)) = choices.iter().find(|(name, _)| name.to_lowercase() == lowered) {
        return Ok(vec![value.clone()]);
    }

    let matches: Vec<ArgValue> = if use_regex {
        let anchored = if input.starts_with('^') { input.clone() } else { format!("^{input}") };
        let pattern = RegexBuilder::new(&anchored)
            .case_insensitive(true)
            .build()
            .map_err(|_| args.create_error(format!("Invalid pattern '{input}'!")))?;
        choices
            .iter()
            .filter(|(name, _)| pattern.is_match(name))
            .map(|(_, value)| value.clone())
            .collect()
    } else {
        choices
            .iter()
            .filter(|(name, _)| name.to_lowercase().starts_with(&lowered))
            .map(|(_, value)| value.clone())
            .collect()
    };

    if matches.is_empty() {
        return Err(args.create_error(format!("No values matching pattern '{input}' present for {key}!")));
    }
    Ok(matches)
}

fn parse_first(
    elements: &[CommandElement],
    source: &dyn CommandSource,
    args: &mut CommandArgs,
    context: &mut CommandContext,
) -> ParseResult<()> {
    let mut last_error = None;
    for element in elements {
        let args_state = args.snapshot();
        let context_state = context.snapshot();
        match element.parse(source, args, context) {
            Ok(()) => return Ok(()),
            Err(err) => {
                trace!(error = %err, "alternative failed, rolling back");
                args.apply_snapshot(&args_state, true);
                context.apply_snapshot(&context_state);
                last_error = Some(err);
            }
        }
    }
    last_error.map_or(Ok(()), Err)
}

fn parse_optional(
    element: &CommandElement,
    default: Option<&ArgValue>,
    strict: bool,
    source: &dyn CommandSource,
    args: &mut CommandArgs,
    context: &mut CommandContext,
) -> ParseResult<()> {
    let put_default = |context: &mut CommandContext| {
        if let (Some(key), Some(value)) = (element.key(), default) {
            context.put_arg(key, value.clone());
        }
    };

    if !args.has_next() {
        put_default(context);
        return Ok(());
    }

    let args_state = args.snapshot();
    let context_state = context.snapshot();
    match element.parse(source, args, context) {
        Ok(()) => Ok(()),
        Err(err) if strict && !args.has_next() => Err(err),
        Err(err) => {
            trace!(error = %err, "optional element skipped");
            args.apply_snapshot(&args_state, true);
            context.apply_snapshot(&context_state);
            put_default(context);
            Ok(())
        }
    }
}

/// Joins the raw spans of every remaining token with single spaces.
fn remaining_joined(args: &mut CommandArgs) -> ParseResult<String> {
    args.next()?;
    let mut joined = String::from(current_span(args));
    while args.next_if_present().is_some() {
        joined.push(' ');
        joined.push_str(current_span(args));
    }
    Ok(joined)
}

/// The raw input from the next token to the end.
fn remaining_raw(args: &mut CommandArgs) -> ParseResult<String> {
    args.next()?;
    let start = args.raw_position();
    let raw = args.raw().get(start..).unwrap_or_default().to_string();
    while args.next_if_present().is_some() {}
    Ok(raw)
}

/// Raw text of the current token. Synthetic tokens have no span, so their
/// value stands in.
fn current_span(args: &CommandArgs) -> &str {
    args.current_arg().map_or("", |arg| {
        if arg.start == arg.end {
            arg.value.as_str()
        } else {
            args.raw().get(arg.start..arg.end).unwrap_or(arg.value.as_str())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::tokenizer::{InputTokenizer, QuotedStringTokenizer};
    use crate::args::{
        all_of, boolean, choices, choices_insensitive, date_time_or_now, first_parsing, integer, mark_true,
        none, only_one, optional, optional_strict, optional_with, pattern, remaining_joined_strings,
        remaining_raw_joined_strings, requiring_permission, requiring_permission_weak, seq, string,
    };

    struct Perms(&'static [&'static str]);

    impl CommandSource for Perms {
        fn name(&self) -> &str {
            "test"
        }

        fn has_permission(&self, permission: &str) -> bool {
            self.0.contains(&permission)
        }

        fn send_message(&self, _message: &str) {}
    }

    const ANYONE: Perms = Perms(&[]);

    fn run(element: &CommandElement, input: &str) -> (ParseResult<()>, CommandArgs, CommandContext) {
        let tokens = QuotedStringTokenizer::default().tokenize(input, false).unwrap();
        let mut args = CommandArgs::new(input, tokens);
        let mut context = CommandContext::new();
        let result = element.parse(&ANYONE, &mut args, &mut context);
        (result, args, context)
    }

    #[test]
    fn test_none_consumes_nothing() {
        let (result, args, context) = run(&none(), "a");
        assert!(result.is_ok());
        assert!(args.has_next());
        assert!(context.is_empty());
    }

    #[test]
    fn test_integer_invalid_value_positioned_at_token() {
        let (result, _, _) = run(&seq(vec![string("a"), integer("n")]), "x abc");
        let err = result.unwrap_err();
        assert_eq!(err.message(), "Expected an integer, but input 'abc' was not");
        assert_eq!(err.position(), 2);
    }

    #[test]
    fn test_sequence_failure_does_not_roll_back() {
        let (result, args, context) = run(&seq(vec![string("a"), integer("n")]), "x y");
        assert!(result.is_err());
        assert!(!args.has_next());
        assert_eq!(context.get_one::<String>("a"), Some("x".into()));
    }

    #[test]
    fn test_first_parsing_discards_partial_writes() {
        let a = seq(vec![string("a1"), string("a2"), integer("a3")]);
        let b = seq(vec![string("b1"), string("b2")]);
        let (result, args, context) = run(&first_parsing(vec![a, b]), "p q");
        assert!(result.is_ok());
        assert!(!args.has_next());
        assert!(!context.has_any("a1"));
        assert!(!context.has_any("a2"));
        assert_eq!(context.get_one::<String>("b1"), Some("p".into()));
        assert_eq!(context.get_one::<String>("b2"), Some("q".into()));
    }

    #[test]
    fn test_first_parsing_reports_last_error() {
        let element = first_parsing(vec![integer("n"), boolean("b")]);
        let (result, args, _) = run(&element, "zz");
        assert_eq!(result.unwrap_err().message(), "Expected a boolean, but input 'zz' was not");
        assert!(args.has_next());
    }

    #[test]
    fn test_first_parsing_empty_succeeds() {
        let (result, _, _) = run(&first_parsing(Vec::new()), "x");
        assert!(result.is_ok());
    }

    #[test]
    fn test_optional_writes_default_when_absent() {
        let element = optional_with(integer("n"), 1);
        let (result, _, context) = run(&element, "");
        assert!(result.is_ok());
        assert_eq!(context.get_one::<i32>("n"), Some(1));
    }

    #[test]
    fn test_optional_restores_on_failure() {
        let element = seq(vec![optional(integer("n")), string("s")]);
        let (result, _, context) = run(&element, "word");
        assert!(result.is_ok());
        assert!(!context.has_any("n"));
        assert_eq!(context.get_one::<String>("s"), Some("word".into()));
    }

    #[test]
    fn test_optional_restores_context_of_partial_child() {
        let child = seq(vec![string("a"), integer("n")]);
        let (result, args, context) = run(&optional(child), "x y");
        assert!(result.is_ok());
        assert!(!context.has_any("a"));
        assert_eq!(args.peek().unwrap(), "x");
    }

    #[test]
    fn test_optional_strict_reraises_at_end_of_input() {
        let (result, _, _) = run(&optional_strict(integer("n")), "x");
        assert!(result.is_err());

        let element = seq(vec![string("s"), optional_strict(integer("n"))]);
        let (result, _, context) = run(&element, "a x");
        assert!(result.is_err());
        assert!(!context.has_any("n"));
    }

    #[test]
    fn test_optional_strict_skips_when_input_remains() {
        let element = seq(vec![optional_strict(integer("n")), string("s"), string("t")]);
        let (result, _, context) = run(&element, "x y");
        assert!(result.is_ok());
        assert_eq!(context.get_one::<String>("t"), Some("y".into()));
    }

    #[test]
    fn test_all_of_repeats() {
        let (result, _, context) = run(&all_of(integer("n")), "1 2 3");
        assert!(result.is_ok());
        assert_eq!(context.get_all::<i32>("n"), vec![1, 2, 3]);
        assert_eq!(all_of(integer("n")).usage(&ANYONE), "<n>*");
    }

    #[test]
    fn test_only_one_rejects_repeats() {
        let (result, _, _) = run(&only_one(all_of(integer("n"))), "1 2");
        assert!(result.is_err());
        let (result, _, _) = run(&only_one(integer("n")), "1");
        assert!(result.is_ok());
    }

    #[test]
    fn test_only_one_key_comes_from_inner() {
        let (result, _, _) = run(&only_one(seq(vec![integer("n"), integer("n")])), "1 2");
        assert!(result.is_ok());
        let (result, _, _) = run(&only_one(optional(all_of(integer("n")))), "1 2");
        assert_eq!(result.unwrap_err().message(), "Argument n may have only one value!");
    }

    #[test]
    fn test_choices() {
        let element = choices("mode", [("fast", ArgValue::Int(1)), ("slow", ArgValue::Int(2))]);
        let (result, _, context) = run(&element, "slow");
        assert!(result.is_ok());
        assert_eq!(context.get_one::<i32>("mode"), Some(2));
        assert_eq!(element.usage(&ANYONE), "<fast|slow>");

        let (result, _, _) = run(&element, "SLOW");
        assert_eq!(
            result.unwrap_err().message(),
            "Argument was not a valid choice. Valid choices: fast, slow"
        );

        let insensitive = choices_insensitive("mode", [("fast", ArgValue::Int(1))]);
        let (result, _, _) = run(&insensitive, "FAST");
        assert!(result.is_ok());
    }

    #[test]
    fn test_choices_insensitive_folds_non_ascii() {
        let answer = choices_insensitive("answer", [("да", ArgValue::Bool(true)), ("нет", ArgValue::Bool(false))]);
        let (result, _, context) = run(&answer, "ДА");
        assert!(result.is_ok());
        assert_eq!(context.get_one::<bool>("answer"), Some(true));

        let greetings = [("Привет", ArgValue::Int(1)), ("Пока", ArgValue::Int(2))];
        let (_, _, context) = run(&pattern("word", greetings.clone(), false), "привет");
        assert_eq!(context.get_all::<i32>("word"), vec![1]);
        let (_, _, context) = run(&pattern("word", greetings, false), "ПО");
        assert_eq!(context.get_all::<i32>("word"), vec![2]);
    }

    #[test]
    fn test_choices_hidden_above_cutoff() {
        let many = (0..6).map(|i| (format!("c{i}"), ArgValue::Int(i)));
        assert_eq!(choices("pick", many).usage(&ANYONE), "<pick>");
    }

    #[test]
    fn test_bool_words() {
        let (_, _, context) = run(&all_of(boolean("b")), "yes 0 verymuchso");
        assert_eq!(context.get_all::<bool>("b"), vec![true, false, true]);
    }

    #[test]
    fn test_pattern_matching() {
        let names = [("apple", ArgValue::Int(1)), ("apricot", ArgValue::Int(2)), ("banana", ArgValue::Int(3))];

        let (_, _, context) = run(&pattern("fruit", names.clone(), false), "ap");
        assert_eq!(context.get_all::<i32>("fruit"), vec![1, 2]);

        let (_, _, context) = run(&pattern("fruit", names.clone(), false), "APPLE");
        assert_eq!(context.get_all::<i32>("fruit"), vec![1]);

        let (_, _, context) = run(&pattern("fruit", names.clone(), true), "a.*t");
        assert_eq!(context.get_all::<i32>("fruit"), vec![2]);

        let (result, _, _) = run(&pattern("fruit", names, false), "kiwi");
        assert_eq!(result.unwrap_err().message(), "No values matching pattern 'kiwi' present for fruit!");
    }

    #[test]
    fn test_mark_true() {
        let (_, args, context) = run(&mark_true("flag"), "x");
        assert_eq!(context.get_one::<bool>("flag"), Some(true));
        assert!(args.has_next());
        assert_eq!(mark_true("flag").usage(&ANYONE), "");
    }

    #[test]
    fn test_remaining_joined_uses_raw_spans() {
        let (result, args, context) = run(&remaining_joined_strings("msg"), r#"hello   "big world"  \!"#);
        assert!(result.is_ok());
        assert!(!args.has_next());
        assert_eq!(context.get_one::<String>("msg"), Some(r#"hello "big world" \!"#.into()));
    }

    #[test]
    fn test_remaining_joined_requires_a_token() {
        let (result, _, _) = run(&remaining_joined_strings("msg"), "");
        assert_eq!(result.unwrap_err().message(), "Not enough arguments!");
    }

    #[test]
    fn test_remaining_raw_keeps_whitespace() {
        let element = seq(vec![string("first"), remaining_raw_joined_strings("rest")]);
        let (_, _, context) = run(&element, "a  b   c ");
        assert_eq!(context.get_one::<String>("rest"), Some("b   c ".into()));
    }

    #[test]
    fn test_permission_element() {
        let element = requiring_permission(string("secret"), "kvk.secret");
        let (result, _, _) = run(&element, "x");
        assert_eq!(result.unwrap_err().message(), "You do not have permission to use the secret argument");

        let weak = requiring_permission_weak(string("secret"), "kvk.secret");
        let (result, args, context) = run(&weak, "x");
        assert!(result.is_ok());
        assert!(args.has_next());
        assert!(!context.has_any("secret"));
        assert_eq!(weak.usage(&ANYONE), "");
        assert_eq!(weak.usage(&Perms(&["kvk.secret"])), "<secret>");
    }

    #[test]
    fn test_date_time_or_now_keeps_token_on_failure() {
        let element = seq(vec![date_time_or_now("when"), string("rest")]);
        let (result, _, context) = run(&element, "soon");
        assert!(result.is_ok());
        assert!(context.has_any("when"));
        assert_eq!(context.get_one::<String>("rest"), Some("soon".into()));
        assert_eq!(date_time_or_now("when").usage(&ANYONE), "[when]");
    }

    #[test]
    fn test_sequence_usage_skips_empty_parts() {
        let element = seq(vec![mark_true("m"), string("a"), optional(integer("n")), none()]);
        assert_eq!(element.usage(&ANYONE), "<a> [<n>]");
        assert_eq!(first_parsing(vec![integer("n"), string("s")]).usage(&ANYONE), "<n>|<s>");
        assert_eq!(remaining_joined_strings("msg").usage(&ANYONE), "<msg...>");
    }
}
