//! Catalog types and canonical type system
//!
//! A [`SchemaCatalog`] is immutable once built. Reloading produces a new
//! catalog; nothing in this module mutates one in place.

use serde::{Deserialize, Serialize};

use crate::describe::{
    AliasGroupDescription, ColumnDescription, DimensionDescription, SchemaDescription,
    TableDescription, DESCRIPTION_VERSION,
};
use crate::diagnostic::Diagnostic;

/// Portable logical type system
///
/// Maps engine-specific declared types to a common representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalType {
    /// Boolean type
    Bool,

    /// Integer type (any precision)
    Int,

    /// Floating point (any precision)
    Float,

    /// Fixed-point decimal
    Decimal,

    /// String/text type
    String,

    /// Date (no time component)
    Date,

    /// Timestamp (with time component)
    Timestamp,

    /// Unknown type (cannot map)
    Unknown,
}

impl LogicalType {
    /// Map a declared column type such as `nvarchar(100)` or `bigint`
    pub fn from_declared(declared: &str) -> Self {
        let base = declared
            .split('(')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match base.as_str() {
            "bool" | "boolean" | "bit" => Self::Bool,
            "int" | "integer" | "bigint" | "smallint" | "tinyint" | "int64" | "long" => Self::Int,
            "float" | "real" | "double" | "double precision" | "float64" => Self::Float,
            "decimal" | "numeric" | "money" | "smallmoney" => Self::Decimal,
            "string" | "text" | "varchar" | "nvarchar" | "char" | "nchar" | "ntext" => Self::String,
            "date" => Self::Date,
            "datetime" | "datetime2" | "smalldatetime" | "timestamp" | "datetimeoffset" => {
                Self::Timestamp
            }
            _ => Self::Unknown,
        }
    }

    /// True for types whose values compare numerically
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int | Self::Float | Self::Decimal)
    }
}

impl std::fmt::Display for LogicalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool => write!(f, "BOOL"),
            Self::Int => write!(f, "INT"),
            Self::Float => write!(f, "FLOAT"),
            Self::Decimal => write!(f, "DECIMAL"),
            Self::String => write!(f, "STRING"),
            Self::Date => write!(f, "DATE"),
            Self::Timestamp => write!(f, "TIMESTAMP"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Nullability state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Nullability {
    /// Definitely nullable
    Yes,

    /// Definitely not nullable
    No,

    /// Not declared by the source
    Unknown,
}

/// A column of a catalog table
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Column name, exactly as stored
    pub name: String,

    /// Declared type as written in the schema source
    pub declared_type: String,

    /// Logical type derived from the declared type
    pub logical_type: LogicalType,

    /// Nullability
    pub nullable: Nullability,
}

impl ColumnDescriptor {
    /// Create a new column with unknown nullability
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>) -> Self {
        let declared_type = declared_type.into();
        Self {
            name: name.into(),
            logical_type: LogicalType::from_declared(&declared_type),
            declared_type,
            nullable: Nullability::Unknown,
        }
    }

    /// Set nullability
    pub fn with_nullability(mut self, nullable: Nullability) -> Self {
        self.nullable = nullable;
        self
    }
}

/// A queryable table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDescriptor {
    /// Table name, unique within the catalog
    pub name: String,

    /// Free-text description shown to translators
    pub description: String,

    /// Words that name this table in a request (normalized, lowercase)
    pub keywords: Vec<String>,

    /// Ordered list of columns
    pub columns: Vec<ColumnDescriptor>,

    /// Month-granular text column used by time rules
    pub time_column: Option<String>,

    /// Count column used by ranking rules
    pub measure_column: Option<String>,
}

impl TableDescriptor {
    /// Create a table with the given columns and no optional metadata
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDescriptor>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            keywords: Vec::new(),
            columns,
            time_column: None,
            measure_column: None,
        }
    }

    /// Find a column by exact name
    pub fn find_column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Get column names in declaration order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Aliases registered for one canonical value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalAliases {
    /// Stored form of the value (e.g. "JavaScript")
    pub canonical: String,

    /// Normalized, deduplicated alias strings
    pub aliases: Vec<String>,
}

/// Semantic alias mapping for one dimension
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasGroup {
    /// Dimension name (e.g. "product", "os")
    pub dimension: String,

    /// Canonical values in registration order
    pub values: Vec<CanonicalAliases>,
}

impl AliasGroup {
    /// Find the canonical value an alias belongs to
    pub fn canonical_for(&self, alias: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|v| v.aliases.iter().any(|a| a == alias))
            .map(|v| v.canonical.as_str())
    }
}

/// Binds a dimension to a concrete table column
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DimensionBinding {
    /// Dimension name
    pub dimension: String,

    /// Table carrying the dimension
    pub table: String,

    /// Column holding the dimension's values
    pub column: String,
}

/// A worked question → SQL example shown to translators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExampleHint {
    /// Natural-language question
    pub question: String,

    /// SQL the question should translate to
    pub sql: String,
}

/// The loaded, immutable schema catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaCatalog {
    tables: Vec<TableDescriptor>,
    alias_groups: Vec<AliasGroup>,
    bindings: Vec<DimensionBinding>,
    default_table: Option<String>,
    examples: Vec<ExampleHint>,
    fingerprint: String,
    warnings: Vec<Diagnostic>,
}

/// Parts of a catalog, in the order they were declared
#[derive(Debug, Clone, Default)]
pub struct CatalogParts {
    pub tables: Vec<TableDescriptor>,
    pub alias_groups: Vec<AliasGroup>,
    pub bindings: Vec<DimensionBinding>,
    pub default_table: Option<String>,
    pub examples: Vec<ExampleHint>,
    pub fingerprint: String,
    pub warnings: Vec<Diagnostic>,
}

impl SchemaCatalog {
    /// Assemble a catalog from parts without checking them.
    ///
    /// `querygate_catalog::load` is the checked way to build one.
    pub fn from_parts(parts: CatalogParts) -> Self {
        Self {
            tables: parts.tables,
            alias_groups: parts.alias_groups,
            bindings: parts.bindings,
            default_table: parts.default_table,
            examples: parts.examples,
            fingerprint: parts.fingerprint,
            warnings: parts.warnings,
        }
    }

    /// Tables in declaration order
    pub fn tables(&self) -> &[TableDescriptor] {
        &self.tables
    }

    /// Alias groups in registration order
    pub fn alias_groups(&self) -> &[AliasGroup] {
        &self.alias_groups
    }

    /// Dimension bindings in declaration order
    pub fn bindings(&self) -> &[DimensionBinding] {
        &self.bindings
    }

    pub fn default_table(&self) -> Option<&str> {
        self.default_table.as_deref()
    }

    pub fn examples(&self) -> &[ExampleHint] {
        &self.examples
    }

    /// Content fingerprint of this catalog
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Non-fatal problems found while loading
    pub fn warnings(&self) -> &[Diagnostic] {
        &self.warnings
    }

    /// Look up a table by exact (case-sensitive) name
    pub fn table(&self, name: &str) -> Option<&TableDescriptor> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.table(name).is_some()
    }

    pub fn has_column(&self, table: &str, name: &str) -> bool {
        self.table(table)
            .map(|t| t.find_column(name).is_some())
            .unwrap_or(false)
    }

    /// Column that carries `dimension` on `table`, if bound
    pub fn column_for_dimension(&self, table: &str, dimension: &str) -> Option<&str> {
        self.bindings
            .iter()
            .find(|b| b.table == table && b.dimension == dimension)
            .map(|b| b.column.as_str())
    }

    /// Tables carrying `dimension`, in catalog order
    pub fn tables_for_dimension(&self, dimension: &str) -> Vec<&TableDescriptor> {
        self.tables
            .iter()
            .filter(|t| self.column_for_dimension(&t.name, dimension).is_some())
            .collect()
    }

    /// Alias groups whose dimension is bound to a column of `table`
    pub fn alias_groups_for(&self, table: &str) -> Vec<&AliasGroup> {
        self.alias_groups
            .iter()
            .filter(|g| self.column_for_dimension(table, &g.dimension).is_some())
            .collect()
    }

    /// Build the serializable metadata document handed to callers and translators
    pub fn describe(&self) -> SchemaDescription {
        let tables = self
            .tables
            .iter()
            .map(|t| TableDescription {
                name: t.name.clone(),
                description: t.description.clone(),
                columns: t
                    .columns
                    .iter()
                    .map(|c| ColumnDescription {
                        name: c.name.clone(),
                        declared_type: c.declared_type.clone(),
                        logical_type: c.logical_type,
                        nullable: c.nullable,
                    })
                    .collect(),
                time_column: t.time_column.clone(),
                measure_column: t.measure_column.clone(),
                dimensions: self
                    .bindings
                    .iter()
                    .filter(|b| b.table == t.name)
                    .map(|b| DimensionDescription {
                        dimension: b.dimension.clone(),
                        column: b.column.clone(),
                    })
                    .collect(),
            })
            .collect();

        let alias_groups = self
            .alias_groups
            .iter()
            .map(|g| AliasGroupDescription {
                dimension: g.dimension.clone(),
                values: g.values.clone(),
            })
            .collect();

        SchemaDescription {
            version: DESCRIPTION_VERSION,
            fingerprint: self.fingerprint.clone(),
            default_table: self.default_table.clone(),
            tables,
            alias_groups,
            examples: self.examples.clone(),
        }
    }
}
