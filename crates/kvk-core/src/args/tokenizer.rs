//! Input tokenizers.
//!
//! A tokenizer turns the raw argument text of one command into a sequence
//! of [`SingleArg`]s. Offsets always refer to the raw text, so a token's
//! `start..end` slice reproduces exactly what the requester typed for it,
//! quotes and escapes included.

use std::sync::Arc;

use crate::error::{ArgumentParseError, ParseResult};

const CHAR_BACKSLASH: char = '\\';
const CHAR_SINGLE_QUOTE: char = '\'';
const CHAR_DOUBLE_QUOTE: char = '"';

/// One token of input.
///
/// `value` is the unquoted, unescaped content. `start..end` is the byte span
/// of the token in the raw text and is used only for error display.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SingleArg {
    /// Token content after quote removal and unescaping.
    pub value: String,
    /// Byte offset of the first character of the token.
    pub start: usize,
    /// Byte offset one past the last character of the token.
    pub end: usize,
}

impl SingleArg {
    /// Creates a token.
    pub fn new(value: impl Into<String>, start: usize, end: usize) -> Self {
        Self { value: value.into(), start, end }
    }
}

/// Strategy that splits raw argument text into tokens.
pub trait InputTokenizer: Send + Sync + std::fmt::Debug {
    /// Tokenizes `arguments`.
    ///
    /// When `lenient` is set, malformed input (an unclosed quote) yields the
    /// partial token instead of an error.
    fn tokenize(&self, arguments: &str, lenient: bool) -> ParseResult<Vec<SingleArg>>;
}

/// The default tokenizer: quoted strings honored, strict, whitespace around
/// tokens attributed before each token.
pub fn quoted_strings(force_lenient: bool) -> Arc<dyn InputTokenizer> {
    Arc::new(QuotedStringTokenizer::new(true, force_lenient, false))
}

/// Splits on single space characters only.
pub fn space_split_string() -> Arc<dyn InputTokenizer> {
    Arc::new(SpaceSplitInputTokenizer)
}

/// Passes the whole input through as one token.
pub fn raw_input() -> Arc<dyn InputTokenizer> {
    Arc::new(RawInputTokenizer)
}

/// Tokenizer honoring quotes and backslash escapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotedStringTokenizer {
    handle_quoted_strings: bool,
    force_lenient: bool,
    trim_trailing_space: bool,
}

impl QuotedStringTokenizer {
    /// Creates a tokenizer.
    ///
    /// * `handle_quoted_strings` - treat `'` and `"` as grouping characters
    /// * `force_lenient` - never fail on an unterminated quote
    /// * `trim_trailing_space` - skip whitespace after each token instead of
    ///   before it
    pub fn new(handle_quoted_strings: bool, force_lenient: bool, trim_trailing_space: bool) -> Self {
        Self { handle_quoted_strings, force_lenient, trim_trailing_space }
    }

    fn skip_whitespace(state: &mut TokenizerState<'_>) {
        while state.peek().is_some_and(char::is_whitespace) {
            state.next();
        }
    }

    fn next_arg(&self, state: &mut TokenizerState<'_>) -> ParseResult<String> {
        let mut builder = String::new();
        match state.peek() {
            Some(quote @ (CHAR_DOUBLE_QUOTE | CHAR_SINGLE_QUOTE)) if self.handle_quoted_strings => {
                self.parse_quoted_string(state, quote, &mut builder)?;
            }
            Some(_) => self.parse_unquoted_string(state, &mut builder)?,
            None => {}
        }
        Ok(builder)
    }

    fn parse_quoted_string(
        &self,
        state: &mut TokenizerState<'_>,
        quote: char,
        builder: &mut String,
    ) -> ParseResult<()> {
        // opening quote
        state.next();
        loop {
            match state.peek() {
                None => {
                    if state.lenient || self.force_lenient {
                        return Ok(());
                    }
                    return Err(state.create_error("Unterminated quoted string found"));
                }
                Some(c) if c == quote => {
                    state.next();
                    return Ok(());
                }
                Some(CHAR_BACKSLASH) => self.parse_escape(state, builder)?,
                Some(c) => {
                    state.next();
                    builder.push(c);
                }
            }
        }
    }

    fn parse_unquoted_string(&self, state: &mut TokenizerState<'_>, builder: &mut String) -> ParseResult<()> {
        while let Some(c) = state.peek() {
            if c.is_whitespace() {
                return Ok(());
            }
            if c == CHAR_BACKSLASH {
                self.parse_escape(state, builder)?;
            } else {
                state.next();
                builder.push(c);
            }
        }
        Ok(())
    }

    fn parse_escape(&self, state: &mut TokenizerState<'_>, builder: &mut String) -> ParseResult<()> {
        state.next();
        match state.next() {
            Some(escaped) => {
                builder.push(escaped);
                Ok(())
            }
            None if state.lenient || self.force_lenient => Ok(()),
            None => Err(state.create_error("Unexpected end of input after escape character")),
        }
    }
}

impl Default for QuotedStringTokenizer {
    fn default() -> Self {
        Self::new(true, false, false)
    }
}

impl InputTokenizer for QuotedStringTokenizer {
    fn tokenize(&self, arguments: &str, lenient: bool) -> ParseResult<Vec<SingleArg>> {
        if arguments.is_empty() {
            return Ok(Vec::new());
        }

        let mut state = TokenizerState::new(arguments, lenient);
        let mut tokens = Vec::with_capacity(arguments.len() / 4);

        if self.trim_trailing_space {
            Self::skip_whitespace(&mut state);
        }
        while state.has_more() {
            if !self.trim_trailing_space {
                Self::skip_whitespace(&mut state);
                if !state.has_more() {
                    break;
                }
            }
            let start = state.offset();
            let value = self.next_arg(&mut state)?;
            tokens.push(SingleArg::new(value, start, state.offset()));
            if self.trim_trailing_space {
                Self::skip_whitespace(&mut state);
            }
        }
        Ok(tokens)
    }
}

/// Tokenizer splitting on `' '` only, for callers that need token spans to
/// match the input byte for byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpaceSplitInputTokenizer;

impl InputTokenizer for SpaceSplitInputTokenizer {
    fn tokenize(&self, arguments: &str, _lenient: bool) -> ParseResult<Vec<SingleArg>> {
        let mut tokens = Vec::new();
        let mut offset = 0;
        for piece in arguments.split(' ') {
            if !piece.is_empty() {
                tokens.push(SingleArg::new(piece, offset, offset + piece.len()));
            }
            offset += piece.len() + 1;
        }
        Ok(tokens)
    }
}

/// Tokenizer returning the entire input as a single token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawInputTokenizer;

impl InputTokenizer for RawInputTokenizer {
    fn tokenize(&self, arguments: &str, _lenient: bool) -> ParseResult<Vec<SingleArg>> {
        if arguments.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![SingleArg::new(arguments, 0, arguments.len())])
    }
}

/// Character cursor over the raw input, tracking byte offsets.
struct TokenizerState<'a> {
    input: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    /// Byte offset of the last consumed character.
    last: Option<usize>,
    lenient: bool,
}

impl<'a> TokenizerState<'a> {
    fn new(input: &'a str, lenient: bool) -> Self {
        Self { input, chars: input.char_indices().peekable(), last: None, lenient }
    }

    fn has_more(&mut self) -> bool {
        self.chars.peek().is_some()
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn next(&mut self) -> Option<char> {
        let (idx, c) = self.chars.next()?;
        self.last = Some(idx);
        Some(c)
    }

    /// Byte offset of the next unconsumed character.
    fn offset(&mut self) -> usize {
        self.chars.peek().map_or(self.input.len(), |&(idx, _)| idx)
    }

    fn create_error(&self, message: &str) -> ArgumentParseError {
        ArgumentParseError::new(message, self.input, self.last.unwrap_or(0))
    }
}
