//! Transformed strings: parse on dehydrate, format on hydrate.

use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::error::{ConfigError, DataError};
use crate::ir::StringKind;
use crate::value::TransformedValue;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S%.f";

static UUID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .expect("uuid pattern")
});

static URI: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:\S*$").expect("uri pattern"));

/// The transformed string kinds the converters can handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransformKind {
    DateTime,
    Date,
    Time,
    Uuid,
    Uri,
    IntegerString,
    BoolString,
}

impl TryFrom<&StringKind> for TransformKind {
    type Error = ConfigError;

    fn try_from(kind: &StringKind) -> Result<Self, ConfigError> {
        Ok(match kind {
            StringKind::DateTime => Self::DateTime,
            StringKind::Date => Self::Date,
            StringKind::Time => Self::Time,
            StringKind::Uuid => Self::Uuid,
            StringKind::Uri => Self::Uri,
            StringKind::IntegerString => Self::IntegerString,
            StringKind::BoolString => Self::BoolString,
            StringKind::Other(name) => return Err(ConfigError::UnsupportedStringKind(name.clone())),
        })
    }
}

impl TransformKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::DateTime => "date-time",
            Self::Date => "date",
            Self::Time => "time",
            Self::Uuid => "uuid",
            Self::Uri => "uri",
            Self::IntegerString => "integer-string",
            Self::BoolString => "bool-string",
        }
    }

    pub fn parse(self, text: &str, path: &str) -> Result<TransformedValue, DataError> {
        let invalid = |reason: String| DataError::InvalidString {
            path: path.to_string(),
            kind: self.name(),
            value: text.to_string(),
            reason,
        };
        match self {
            Self::DateTime => DateTime::parse_from_rfc3339(text)
                .map(TransformedValue::DateTime)
                .map_err(|e| invalid(e.to_string())),
            Self::Date => NaiveDate::parse_from_str(text, DATE_FORMAT)
                .map(TransformedValue::Date)
                .map_err(|e| invalid(e.to_string())),
            Self::Time => NaiveTime::parse_from_str(text, TIME_FORMAT)
                .map(TransformedValue::Time)
                .map_err(|e| invalid(e.to_string())),
            Self::Uuid if UUID.is_match(text) => Ok(TransformedValue::Uuid(text.to_string())),
            Self::Uuid => Err(invalid("expected 8-4-4-4-12 hex digits".into())),
            Self::Uri if URI.is_match(text) => Ok(TransformedValue::Uri(text.to_string())),
            Self::Uri => Err(invalid("expected `scheme:rest` without whitespace".into())),
            Self::IntegerString => text
                .parse::<i64>()
                .map(TransformedValue::IntegerString)
                .map_err(|e| invalid(e.to_string())),
            Self::BoolString => match text {
                "true" => Ok(TransformedValue::BoolString(true)),
                "false" => Ok(TransformedValue::BoolString(false)),
                _ => Err(invalid("expected `true` or `false`".into())),
            },
        }
    }

    /// Canonical string form. `None` if `value` belongs to another kind.
    pub fn format(self, value: &TransformedValue) -> Option<String> {
        Some(match (self, value) {
            (Self::DateTime, TransformedValue::DateTime(t)) => t.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            (Self::Date, TransformedValue::Date(d)) => d.format(DATE_FORMAT).to_string(),
            (Self::Time, TransformedValue::Time(t)) => t.format(TIME_FORMAT).to_string(),
            (Self::Uuid, TransformedValue::Uuid(s)) | (Self::Uri, TransformedValue::Uri(s)) => s.clone(),
            (Self::IntegerString, TransformedValue::IntegerString(i)) => i.to_string(),
            (Self::BoolString, TransformedValue::BoolString(b)) => b.to_string(),
            _ => return None,
        })
    }
}
