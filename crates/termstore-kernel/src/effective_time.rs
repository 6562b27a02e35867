//! Publication dates of components and members.

use crate::error::TermstoreError;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

const FORMAT: &str = "%Y%m%d";

/// Version-publication date in `yyyyMMdd` form, or unset while the content
/// is pending (re)publication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct EffectiveTime(Option<NaiveDate>);

impl EffectiveTime {
    pub const UNSET: Self = Self(None);

    pub fn from_date(date: NaiveDate) -> Self {
        Self(Some(date))
    }

    /// Parse `yyyyMMdd`.
    pub fn parse(raw: &str) -> Result<Self, TermstoreError> {
        NaiveDate::parse_from_str(raw, FORMAT)
            .map(Self::from_date)
            .map_err(|e| TermstoreError::validation(format!("effective time '{raw}': {e}")))
    }

    pub fn is_set(&self) -> bool {
        self.0.is_some()
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.0
    }
}

impl fmt::Display for EffectiveTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(date) => write!(f, "{}", date.format(FORMAT)),
            None => f.write_str("unset"),
        }
    }
}

impl Serialize for EffectiveTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Some(date) => serializer.serialize_some(&date.format(FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for EffectiveTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            None => Ok(Self::UNSET),
            Some(value) if value.is_empty() => Ok(Self::UNSET),
            Some(value) => Self::parse(&value).map_err(serde::de::Error::custom),
        }
    }
}
