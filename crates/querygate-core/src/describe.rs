//! Schema description document (stable v1)
//!
//! This is what callers and translation backends see of the catalog.
//! Breaking changes require a new version.

use serde::{Deserialize, Serialize};

use crate::schema::{CanonicalAliases, ExampleHint, LogicalType, Nullability};

/// Current description document version
pub const DESCRIPTION_VERSION: u32 = 1;

/// Serializable view of a catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDescription {
    /// Document version
    pub version: u32,

    /// Fingerprint of the catalog this was built from
    pub fingerprint: String,

    /// Table used when a request names no table but is otherwise understood
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_table: Option<String>,

    pub tables: Vec<TableDescription>,

    pub alias_groups: Vec<AliasGroupDescription>,

    /// Worked question → SQL hints
    pub examples: Vec<ExampleHint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDescription {
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    pub columns: Vec<ColumnDescription>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_column: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub measure_column: Option<String>,

    /// Dimensions carried by this table and the columns holding them
    pub dimensions: Vec<DimensionDescription>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescription {
    pub name: String,

    #[serde(rename = "type")]
    pub declared_type: String,

    pub logical_type: LogicalType,

    pub nullable: Nullability,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionDescription {
    pub dimension: String,
    pub column: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasGroupDescription {
    pub dimension: String,
    pub values: Vec<CanonicalAliases>,
}

impl SchemaDescription {
    /// Find a table by exact name
    pub fn table(&self, name: &str) -> Option<&TableDescription> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn has_column(&self, table: &str, column: &str) -> bool {
        self.table(table)
            .map(|t| t.columns.iter().any(|c| c.name == column))
            .unwrap_or(false)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
