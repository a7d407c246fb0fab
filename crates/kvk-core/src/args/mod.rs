//! Argument tokenizing and parsing.
//!
//! Input flows through three stages: an [`InputTokenizer`] splits the raw
//! text into positioned [`SingleArg`] tokens, a [`CommandArgs`] cursor walks
//! them, and a tree of [`CommandElement`]s consumes the cursor and fills a
//! [`CommandContext`]. The free functions below build the grammar.

mod child;
mod context;
mod cursor;
mod element;
mod flags;
mod leaf;
mod tokenizer;
mod value;

pub use child::ChildCommandExecutor;
pub use context::{CommandContext, ContextSnapshot};
pub use cursor::{CommandArgs, Snapshot};
pub use element::{CHOICES_CUTOFF, CommandElement, ValueKind};
pub use flags::{CommandFlags, FlagsBuilder, UnknownFlagBehavior};
pub use tokenizer::{
    InputTokenizer, QuotedStringTokenizer, RawInputTokenizer, SingleArg, SpaceSplitInputTokenizer, quoted_strings,
    raw_input, space_split_string,
};
pub use value::{ArgValue, Color, FromArgValue};

fn value(key: impl Into<String>, kind: ValueKind) -> CommandElement {
    CommandElement::Value { key: key.into(), kind }
}

fn choice_table<K, V>(choices: impl IntoIterator<Item = (K, V)>) -> Vec<(String, ArgValue)>
where
    K: Into<String>,
    V: Into<ArgValue>,
{
    choices.into_iter().map(|(name, value)| (name.into(), value.into())).collect()
}

/// Matches nothing. The grammar of a command without arguments.
pub fn none() -> CommandElement {
    CommandElement::None
}

/// Writes `true` under `key` without consuming anything.
pub fn mark_true(key: impl Into<String>) -> CommandElement {
    CommandElement::MarkTrue { key: key.into() }
}

pub fn string(key: impl Into<String>) -> CommandElement {
    value(key, ValueKind::String)
}

/// A 32-bit integer. Accepts `0x` and `0b` prefixes.
pub fn integer(key: impl Into<String>) -> CommandElement {
    value(key, ValueKind::Integer)
}

/// A 64-bit integer. Accepts `0x` and `0b` prefixes.
pub fn long_num(key: impl Into<String>) -> CommandElement {
    value(key, ValueKind::Long)
}

pub fn double_num(key: impl Into<String>) -> CommandElement {
    value(key, ValueKind::Double)
}

/// `true`/`t`/`yes`/`y`/`verymuchso`/`1` or their negatives.
pub fn boolean(key: impl Into<String>) -> CommandElement {
    value(key, ValueKind::Bool)
}

/// An ISO-8601 duration, with the `PT` prefix optional.
pub fn duration(key: impl Into<String>) -> CommandElement {
    value(key, ValueKind::Duration)
}

/// A hex, `rgb(r,g,b)` or named color.
pub fn color(key: impl Into<String>) -> CommandElement {
    value(key, ValueKind::Color)
}

pub fn uuid(key: impl Into<String>) -> CommandElement {
    value(key, ValueKind::Uuid)
}

pub fn url(key: impl Into<String>) -> CommandElement {
    value(key, ValueKind::Url)
}

/// A local date-time, a date, or a time of today.
pub fn date_time(key: impl Into<String>) -> CommandElement {
    CommandElement::DateTime { key: key.into(), or_now: false }
}

/// Like [`date_time`], but writes the current time and leaves the token
/// alone when it does not parse.
pub fn date_time_or_now(key: impl Into<String>) -> CommandElement {
    CommandElement::DateTime { key: key.into(), or_now: true }
}

/// One token looked up case-sensitively in `choices`. Short lists are
/// spelled out in usage.
pub fn choices<K, V>(key: impl Into<String>, choices: impl IntoIterator<Item = (K, V)>) -> CommandElement
where
    K: Into<String>,
    V: Into<ArgValue>,
{
    let choices = choice_table(choices);
    let show_in_usage = choices.len() <= CHOICES_CUTOFF;
    CommandElement::Choices { key: key.into(), choices, case_sensitive: true, show_in_usage }
}

/// [`choices`], ignoring case.
pub fn choices_insensitive<K, V>(key: impl Into<String>, choices: impl IntoIterator<Item = (K, V)>) -> CommandElement
where
    K: Into<String>,
    V: Into<ArgValue>,
{
    let choices = choice_table(choices);
    let show_in_usage = choices.len() <= CHOICES_CUTOFF;
    CommandElement::Choices { key: key.into(), choices, case_sensitive: false, show_in_usage }
}

/// [`choices`] with explicit control over usage rendering.
pub fn choices_with_usage<K, V>(
    key: impl Into<String>,
    choices: impl IntoIterator<Item = (K, V)>,
    case_sensitive: bool,
    show_in_usage: bool,
) -> CommandElement
where
    K: Into<String>,
    V: Into<ArgValue>,
{
    CommandElement::Choices { key: key.into(), choices: choice_table(choices), case_sensitive, show_in_usage }
}

/// One token matched against `choices` by exact name, then prefix, or as
/// an anchored case-insensitive regex when `use_regex` is set.
pub fn pattern<K, V>(key: impl Into<String>, choices: impl IntoIterator<Item = (K, V)>, use_regex: bool) -> CommandElement
where
    K: Into<String>,
    V: Into<ArgValue>,
{
    CommandElement::Pattern { key: key.into(), choices: choice_table(choices), use_regex }
}

pub fn seq(elements: Vec<CommandElement>) -> CommandElement {
    CommandElement::Sequence(elements)
}

pub fn first_parsing(elements: Vec<CommandElement>) -> CommandElement {
    CommandElement::FirstParsing(elements)
}

/// `element`, or nothing when it is absent or fails.
pub fn optional(element: CommandElement) -> CommandElement {
    CommandElement::Optional { element: Box::new(element), default: None, strict: false }
}

/// `element`, or `default` when it is absent or fails.
pub fn optional_with(element: CommandElement, default: impl Into<ArgValue>) -> CommandElement {
    CommandElement::Optional { element: Box::new(element), default: Some(default.into()), strict: false }
}

/// `element`, or nothing when input runs out first. A present but
/// invalid value is still an error.
pub fn optional_strict(element: CommandElement) -> CommandElement {
    CommandElement::Optional { element: Box::new(element), default: None, strict: true }
}

pub fn optional_strict_with(element: CommandElement, default: impl Into<ArgValue>) -> CommandElement {
    CommandElement::Optional { element: Box::new(element), default: Some(default.into()), strict: true }
}

/// `element` repeated until the input is used up.
pub fn all_of(element: CommandElement) -> CommandElement {
    CommandElement::AllOf(Box::new(element))
}

/// `element`, failing if it wrote more than one value.
pub fn only_one(element: CommandElement) -> CommandElement {
    CommandElement::OnlyOne(Box::new(element))
}

pub fn requiring_permission(element: CommandElement, permission: impl Into<String>) -> CommandElement {
    CommandElement::Permission { element: Box::new(element), permission: permission.into(), weak: false }
}

/// Like [`requiring_permission`], but silently skipped without it.
pub fn requiring_permission_weak(element: CommandElement, permission: impl Into<String>) -> CommandElement {
    CommandElement::Permission { element: Box::new(element), permission: permission.into(), weak: true }
}

/// Every remaining token, joined with single spaces.
pub fn remaining_joined_strings(key: impl Into<String>) -> CommandElement {
    CommandElement::RemainingJoined { key: key.into(), raw: false }
}

/// The raw input from the next token to the end, spacing and quotes intact.
pub fn remaining_raw_joined_strings(key: impl Into<String>) -> CommandElement {
    CommandElement::RemainingJoined { key: key.into(), raw: true }
}

/// Starts a flag grammar.
pub fn flags() -> FlagsBuilder {
    FlagsBuilder::new()
}
