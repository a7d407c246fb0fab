//! Error types for command processing.
//!
//! Two layers exist. [`ArgumentParseError`] is raised by tokenizers and
//! grammar elements and always points at an offset in the raw input.
//! [`CommandError`] is the family the dispatcher understands; the embedding
//! caller renders its message and, when [`CommandError::should_include_usage`]
//! says so, a follow-up usage line.

use thiserror::Error;

/// Inputs longer than this are windowed around the error offset.
const MAX_ANNOTATED_WIDTH: usize = 80;

/// Characters of context kept on each side of the offset when windowing.
const ANNOTATION_CONTEXT: usize = 37;

const ELLIPSIS: &str = "...";

/// A parse failure positioned in the raw text it came from.
///
/// `position` is a byte offset into `source_text`. When the error has been
/// wrapped by a sub-command node it additionally carries a usage string that
/// names the full command path which failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ArgumentParseError {
    message: String,
    source_text: String,
    position: usize,
    usage: Option<String>,
}

impl ArgumentParseError {
    /// Creates a positioned error without usage.
    pub fn new(message: impl Into<String>, source_text: impl Into<String>, position: usize) -> Self {
        Self {
            message: message.into(),
            source_text: source_text.into(),
            position,
            usage: None,
        }
    }

    /// Returns this error annotated with a usage string.
    ///
    /// Any usage already attached is replaced; callers that build a command
    /// path prepend to [`ArgumentParseError::usage`] before calling this.
    #[must_use]
    pub fn with_usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = Some(usage.into());
        self
    }

    /// The bare error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The raw input the error refers to.
    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    /// Byte offset of the failure in [`ArgumentParseError::source_text`].
    pub fn position(&self) -> usize {
        self.position
    }

    /// Usage attached by an enclosing sub-command node, if any.
    pub fn usage(&self) -> Option<&str> {
        self.usage.as_deref()
    }

    /// Renders the source text with a caret line under the failing offset.
    ///
    /// Long inputs are cut down to a window around the offset, with `...`
    /// marking the elided ends.
    pub fn annotated_position(&self) -> String {
        let chars: Vec<char> = self.source_text.chars().collect();
        let mut caret = char_offset(&self.source_text, self.position);

        let shown = if chars.len() <= MAX_ANNOTATED_WIDTH {
            self.source_text.clone()
        } else if caret >= ANNOTATION_CONTEXT {
            let start = caret - ANNOTATION_CONTEXT;
            let end = chars.len().min(caret + ANNOTATION_CONTEXT);
            let body: String = chars[start..end].iter().collect();
            caret = ANNOTATION_CONTEXT + ELLIPSIS.len();
            if end < chars.len() {
                format!("{ELLIPSIS}{body}{ELLIPSIS}")
            } else {
                format!("{ELLIPSIS}{body}")
            }
        } else {
            let head: String = chars[..MAX_ANNOTATED_WIDTH - ELLIPSIS.len()].iter().collect();
            format!("{head}{ELLIPSIS}")
        };

        format!("{shown}\n{}^", " ".repeat(caret))
    }
}

/// Converts a byte offset into a character column, clamping to the text.
fn char_offset(text: &str, byte_offset: usize) -> usize {
    let mut offset = byte_offset.min(text.len());
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    text[..offset].chars().count()
}

/// Errors raised while dispatching or executing a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The argument text did not match the command's grammar.
    #[error(transparent)]
    ArgumentParse(#[from] ArgumentParseError),

    /// The requester lacks the permission a command requires.
    #[error("You do not have permission to use this command!")]
    Permission,

    /// An alias did not resolve to any command visible to the requester.
    #[error("Command not found: {0}")]
    NotFound(String),

    /// Any other command-level failure.
    #[error("{message}")]
    Generic {
        /// Message shown to the requester.
        message: String,
        /// Whether the caller should follow up with a usage line.
        show_usage: bool,
    },

    /// A failure inside an executor that is not a command error.
    ///
    /// The dispatcher never translates these; the embedding caller is
    /// expected to log them and report a generic failure.
    #[error(transparent)]
    Execution(#[from] anyhow::Error),
}

impl CommandError {
    /// A generic error that does not ask for usage.
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic { message: message.into(), show_usage: false }
    }

    /// A generic error that asks the caller to show usage.
    pub fn generic_with_usage(message: impl Into<String>) -> Self {
        Self::Generic { message: message.into(), show_usage: true }
    }

    /// Whether the caller should render a usage line after the message.
    pub fn should_include_usage(&self) -> bool {
        match self {
            Self::ArgumentParse(_) => true,
            Self::Generic { show_usage, .. } => *show_usage,
            Self::Permission | Self::NotFound(_) | Self::Execution(_) => false,
        }
    }

    /// Usage carried by the error itself, if any.
    ///
    /// Only parse errors wrapped by a sub-command node carry one; otherwise
    /// the caller falls back to the resolved command's own usage.
    pub fn usage(&self) -> Option<&str> {
        match self {
            Self::ArgumentParse(err) => err.usage(),
            _ => None,
        }
    }

    /// Returns true for errors belonging to the command-error family, as
    /// opposed to executor failures.
    pub fn is_command_error(&self) -> bool {
        !matches!(self, Self::Execution(_))
    }
}

/// Errors raised while assembling a [`CommandSpec`](crate::command::CommandSpec).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecError {
    /// Neither an executor nor any child commands were given.
    #[error("An executor is required")]
    MissingExecutor,
}

/// Result type for dispatch and execution.
pub type Result<T> = std::result::Result<T, CommandError>;

/// Result type for tokenizing and grammar parsing.
pub type ParseResult<T> = std::result::Result<T, ArgumentParseError>;
