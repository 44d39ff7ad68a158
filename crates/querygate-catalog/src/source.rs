//! Declarative schema source documents
//!
//! The source is what operators edit: tables, columns, alias groups and the
//! dimension → column bindings. It is parsed as-is here and checked by
//! [`crate::loader`].

use querygate_core::ExampleHint;
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use std::fmt;
use std::path::Path;

use crate::loader::SchemaLoadError;

/// On-disk format of a schema source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Json,
    Toml,
}

impl SourceFormat {
    /// Pick the format from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }
}

/// Root of a schema source document
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchemaSource {
    /// Table used for requests that name no table but are otherwise understood
    #[serde(default)]
    pub default_table: Option<String>,

    #[serde(default)]
    pub tables: Vec<TableSource>,

    #[serde(default)]
    pub alias_groups: Vec<AliasGroupSource>,

    /// Dimension → column bindings
    #[serde(default)]
    pub dimensions: Vec<DimensionSource>,

    #[serde(default)]
    pub examples: Vec<ExampleHint>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TableSource {
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub keywords: Vec<String>,

    #[serde(default)]
    pub columns: Vec<ColumnSource>,

    #[serde(default)]
    pub time_column: Option<String>,

    #[serde(default)]
    pub measure_column: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ColumnSource {
    pub name: String,

    #[serde(rename = "type", default = "default_column_type")]
    pub declared_type: String,

    /// Absent means "not declared"
    #[serde(default)]
    pub nullable: Option<bool>,
}

fn default_column_type() -> String {
    "string".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct AliasGroupSource {
    pub dimension: String,

    /// Canonical value → aliases, in document order
    #[serde(deserialize_with = "ordered_entries")]
    pub values: Vec<(String, Vec<String>)>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DimensionSource {
    pub dimension: String,
    pub table: String,
    pub column: String,
}

impl SchemaSource {
    /// Parse a source document from text
    pub fn parse(text: &str, format: SourceFormat) -> Result<Self, SchemaLoadError> {
        match format {
            SourceFormat::Json => {
                serde_json::from_str(text).map_err(|e| SchemaLoadError::Parse(e.to_string()))
            }
            SourceFormat::Toml => {
                toml::from_str(text).map_err(|e| SchemaLoadError::Parse(e.to_string()))
            }
        }
    }

    /// Read and parse a source document, picking the format from the extension
    pub fn from_file(path: &Path) -> Result<Self, SchemaLoadError> {
        let format = SourceFormat::from_path(path)
            .ok_or_else(|| SchemaLoadError::UnknownFormat(path.display().to_string()))?;

        let text = std::fs::read_to_string(path).map_err(|e| SchemaLoadError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        Self::parse(&text, format)
    }
}

/// Deserialize a map into a vector of entries, keeping document order.
///
/// Order matters: a later canonical value claiming an alias wins.
fn ordered_entries<'de, D>(deserializer: D) -> Result<Vec<(String, Vec<String>)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct EntriesVisitor;

    impl<'de> Visitor<'de> for EntriesVisitor {
        type Value = Vec<(String, Vec<String>)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of canonical value to alias list")
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((canonical, aliases)) = map.next_entry::<String, Vec<String>>()? {
                entries.push((canonical, aliases));
            }
            Ok(entries)
        }
    }

    deserializer.deserialize_map(EntriesVisitor)
}
