//! Validated SQL identifiers.
//!
//! Every table, schema and column name that reaches a statement builder is
//! an [`Ident`]. Identifiers are quoted by the builder as well; validation
//! keeps the accepted alphabet small enough that quoting never has to
//! escape anything.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{HeatmapError, HeatmapResult};

const MAX_IDENT_LEN: usize = 63;

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Ident(String);

impl Ident {
    pub fn new(value: impl Into<String>) -> HeatmapResult<Self> {
        let value = value.into();
        if value.is_empty() || value.len() > MAX_IDENT_LEN {
            return Err(HeatmapError::validation(format!(
                "identifier '{value}' must be 1..={MAX_IDENT_LEN} characters"
            )));
        }
        let mut chars = value.chars();
        let head_ok = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
        let tail_ok = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !head_ok || !tail_ok {
            return Err(HeatmapError::validation(format!(
                "identifier '{value}' contains unsupported characters"
            )));
        }
        Ok(Self(value))
    }

    /// For identifiers spelled out in source code.
    pub fn from_static(value: &'static str) -> Self {
        debug_assert!(Self::new(value).is_ok(), "invalid static identifier {value}");
        Self(value.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Ident {
    type Err = HeatmapError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::new(value)
    }
}

impl Serialize for Ident {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Ident {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Ident::new(value).map_err(serde::de::Error::custom)
    }
}

/// A table reference, optionally qualified by schema.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct TableName {
    pub schema: Option<Ident>,
    pub table: Ident,
}

impl TableName {
    pub fn new(table: Ident) -> Self {
        Self {
            schema: None,
            table,
        }
    }

    pub fn qualified(schema: Ident, table: Ident) -> Self {
        Self {
            schema: Some(schema),
            table,
        }
    }

    pub fn parse(value: &str) -> HeatmapResult<Self> {
        match value.split_once('.') {
            Some((schema, table)) => Ok(Self::qualified(Ident::new(schema)?, Ident::new(table)?)),
            None => Ok(Self::new(Ident::new(value)?)),
        }
    }

    /// Whether both names reach the same table when unqualified names live
    /// in `default_schema`. ASCII case is ignored, as SQLite ignores it.
    pub fn refers_to_same(&self, other: &TableName, default_schema: &Ident) -> bool {
        self.schema_or(default_schema)
            .0
            .eq_ignore_ascii_case(&other.schema_or(default_schema).0)
            && self.table.0.eq_ignore_ascii_case(&other.table.0)
    }

    fn schema_or<'a>(&'a self, default_schema: &'a Ident) -> &'a Ident {
        self.schema.as_ref().unwrap_or(default_schema)
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{schema}.{}", self.table),
            None => write!(f, "{}", self.table),
        }
    }
}

impl FromStr for TableName {
    type Err = HeatmapError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl Serialize for TableName {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TableName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        TableName::parse(&value).map_err(serde::de::Error::custom)
    }
}
