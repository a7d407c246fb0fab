//! Typed values stored in a [`CommandContext`](super::CommandContext).

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use url::Url;
use uuid::Uuid;

use crate::command::CommandMapping;

/// An RGB color parsed from a `color` argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Packs the color as `0xRRGGBB`.
    pub fn to_rgb(self) -> u32 {
        (u32::from(self.r) << 16) | (u32::from(self.g) << 8) | u32::from(self.b)
    }

    pub fn from_rgb(rgb: u32) -> Self {
        Self::new((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// A single parsed argument value.
#[derive(Debug, Clone)]
pub enum ArgValue {
    Str(String),
    Int(i32),
    Long(i64),
    Float(f64),
    Bool(bool),
    Duration(Duration),
    Color(Color),
    Uuid(Uuid),
    Url(Url),
    DateTime(NaiveDateTime),
    /// The child command a sub-dispatch node matched.
    Mapping(Arc<CommandMapping>),
    /// Marker written by a sub-dispatch node that chose its fallback.
    Fallback,
}

impl ArgValue {
    /// Short name of the variant, used in type mismatch messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Str(_) => "string",
            Self::Int(_) => "integer",
            Self::Long(_) => "long",
            Self::Float(_) => "double",
            Self::Bool(_) => "boolean",
            Self::Duration(_) => "duration",
            Self::Color(_) => "color",
            Self::Uuid(_) => "uuid",
            Self::Url(_) => "url",
            Self::DateTime(_) => "date-time",
            Self::Mapping(_) => "command",
            Self::Fallback => "fallback",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(value) => Some(value),
            _ => None,
        }
    }
}

impl PartialEq for ArgValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Long(a), Self::Long(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Duration(a), Self::Duration(b)) => a == b,
            (Self::Color(a), Self::Color(b)) => a == b,
            (Self::Uuid(a), Self::Uuid(b)) => a == b,
            (Self::Url(a), Self::Url(b)) => a == b,
            (Self::DateTime(a), Self::DateTime(b)) => a == b,
            (Self::Mapping(a), Self::Mapping(b)) => Arc::ptr_eq(a, b),
            (Self::Fallback, Self::Fallback) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(value) => f.write_str(value),
            Self::Int(value) => write!(f, "{value}"),
            Self::Long(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Duration(value) => write!(f, "{}s", value.as_secs_f64()),
            Self::Color(value) => write!(f, "{value}"),
            Self::Uuid(value) => write!(f, "{value}"),
            Self::Url(value) => write!(f, "{value}"),
            Self::DateTime(value) => write!(f, "{value}"),
            Self::Mapping(mapping) => f.write_str(mapping.primary_alias()),
            Self::Fallback => f.write_str("<fallback>"),
        }
    }
}

impl From<String> for ArgValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<i32> for ArgValue {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<i64> for ArgValue {
    fn from(value: i64) -> Self {
        Self::Long(value)
    }
}

impl From<f64> for ArgValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for ArgValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Duration> for ArgValue {
    fn from(value: Duration) -> Self {
        Self::Duration(value)
    }
}

impl From<Color> for ArgValue {
    fn from(value: Color) -> Self {
        Self::Color(value)
    }
}

/// Conversion out of an [`ArgValue`] for the typed context getters.
pub trait FromArgValue: Sized {
    fn from_arg_value(value: &ArgValue) -> Option<Self>;
}

impl FromArgValue for ArgValue {
    fn from_arg_value(value: &ArgValue) -> Option<Self> {
        Some(value.clone())
    }
}

impl FromArgValue for String {
    fn from_arg_value(value: &ArgValue) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl FromArgValue for i32 {
    fn from_arg_value(value: &ArgValue) -> Option<Self> {
        match value {
            ArgValue::Int(v) => Some(*v),
            ArgValue::Long(v) => Self::try_from(*v).ok(),
            _ => None,
        }
    }
}

impl FromArgValue for i64 {
    fn from_arg_value(value: &ArgValue) -> Option<Self> {
        match value {
            ArgValue::Int(v) => Some(Self::from(*v)),
            ArgValue::Long(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromArgValue for f64 {
    fn from_arg_value(value: &ArgValue) -> Option<Self> {
        match value {
            ArgValue::Float(v) => Some(*v),
            ArgValue::Int(v) => Some(Self::from(*v)),
            _ => None,
        }
    }
}

impl FromArgValue for bool {
    fn from_arg_value(value: &ArgValue) -> Option<Self> {
        match value {
            ArgValue::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromArgValue for Duration {
    fn from_arg_value(value: &ArgValue) -> Option<Self> {
        match value {
            ArgValue::Duration(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromArgValue for Color {
    fn from_arg_value(value: &ArgValue) -> Option<Self> {
        match value {
            ArgValue::Color(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromArgValue for Uuid {
    fn from_arg_value(value: &ArgValue) -> Option<Self> {
        match value {
            ArgValue::Uuid(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromArgValue for Url {
    fn from_arg_value(value: &ArgValue) -> Option<Self> {
        match value {
            ArgValue::Url(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl FromArgValue for NaiveDateTime {
    fn from_arg_value(value: &ArgValue) -> Option<Self> {
        match value {
            ArgValue::DateTime(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromArgValue for Arc<CommandMapping> {
    fn from_arg_value(value: &ArgValue) -> Option<Self> {
        match value {
            ArgValue::Mapping(v) => Some(Arc::clone(v)),
            _ => None,
        }
    }
}
