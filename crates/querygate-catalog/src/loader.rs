//! Schema source → checked [`SchemaCatalog`]
//!
//! Every structural problem is fatal and names the offending entry. Alias
//! conflicts inside one group are the only recoverable case: the later
//! canonical value keeps the alias and the catalog carries an
//! `ALIAS_CONFLICT` warning.

use querygate_core::{
    AliasGroup, CanonicalAliases, CatalogParts, ColumnDescriptor, Diagnostic, DiagnosticCode,
    DimensionBinding, Location, Nullability, SchemaCatalog, TableDescriptor,
};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::Path;

use crate::alias::normalize;
use crate::source::{AliasGroupSource, SchemaSource, SourceFormat, TableSource};

/// Fatal problems found while loading a schema source
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaLoadError {
    #[error("Failed to read schema source {path}: {message}")]
    Io { path: String, message: String },

    #[error("Failed to parse schema source: {0}")]
    Parse(String),

    #[error("Unknown schema source format: {0} (expected .json or .toml)")]
    UnknownFormat(String),

    #[error("Schema source declares no tables")]
    NoTables,

    #[error("Malformed identifier in {entry}: '{name}'")]
    MalformedIdentifier { entry: String, name: String },

    #[error("Duplicate table: {0}")]
    DuplicateTable(String),

    #[error("Table '{0}' has no columns")]
    EmptyTable(String),

    #[error("Duplicate column '{column}' in table '{table}'")]
    DuplicateColumn { table: String, column: String },

    #[error("Table '{table}': {field} names unknown column '{column}'")]
    UnknownColumnReference {
        table: String,
        field: String,
        column: String,
    },

    #[error("Table '{0}' has an empty keyword")]
    EmptyKeyword(String),

    #[error("Alias group #{0} has an empty dimension name")]
    EmptyDimension(usize),

    #[error("Duplicate dimension: {0}")]
    DuplicateDimension(String),

    #[error("Alias group '{dimension}' has an empty canonical value")]
    EmptyCanonical { dimension: String },

    #[error("Canonical value '{canonical}' in alias group '{dimension}' contains a LIKE wildcard")]
    WildcardInCanonical { dimension: String, canonical: String },

    #[error("Malformed alias '{alias}' for '{canonical}' in alias group '{dimension}'")]
    MalformedAlias {
        dimension: String,
        canonical: String,
        alias: String,
    },

    #[error("Dimension binding names unknown dimension '{0}'")]
    UnknownDimension(String),

    #[error("Dimension '{dimension}' is bound to unknown table '{table}'")]
    UnknownBindingTable { dimension: String, table: String },

    #[error("Dimension '{dimension}' is bound to unknown column '{table}.{column}'")]
    UnknownBindingColumn {
        dimension: String,
        table: String,
        column: String,
    },

    #[error("Dimension '{dimension}' is bound twice on table '{table}'")]
    DuplicateBinding { dimension: String, table: String },

    #[error("default_table names unknown table '{0}'")]
    UnknownDefaultTable(String),
}

/// Load a schema source file (`.json` or `.toml`)
pub fn load_file(path: &Path) -> Result<SchemaCatalog, SchemaLoadError> {
    let source = SchemaSource::from_file(path)?;
    load(&source)
}

/// Load a schema source held in memory
pub fn load_str(text: &str, format: SourceFormat) -> Result<SchemaCatalog, SchemaLoadError> {
    let source = SchemaSource::parse(text, format)?;
    load(&source)
}

/// Check a parsed source and build an immutable catalog from it
pub fn load(source: &SchemaSource) -> Result<SchemaCatalog, SchemaLoadError> {
    if source.tables.is_empty() {
        return Err(SchemaLoadError::NoTables);
    }

    let mut warnings = Vec::new();

    let mut tables = Vec::with_capacity(source.tables.len());
    let mut seen_tables = HashSet::new();
    for table in &source.tables {
        let descriptor = load_table(table)?;
        if !seen_tables.insert(descriptor.name.clone()) {
            return Err(SchemaLoadError::DuplicateTable(descriptor.name));
        }
        tables.push(descriptor);
    }

    let mut alias_groups = Vec::with_capacity(source.alias_groups.len());
    let mut seen_dimensions = HashSet::new();
    for (position, group) in source.alias_groups.iter().enumerate() {
        let loaded = load_alias_group(position, group, &mut warnings)?;
        if !seen_dimensions.insert(loaded.dimension.clone()) {
            return Err(SchemaLoadError::DuplicateDimension(loaded.dimension));
        }
        alias_groups.push(loaded);
    }

    let mut bindings: Vec<DimensionBinding> = Vec::with_capacity(source.dimensions.len());
    for binding in &source.dimensions {
        if !seen_dimensions.contains(&binding.dimension) {
            return Err(SchemaLoadError::UnknownDimension(binding.dimension.clone()));
        }

        let table = tables
            .iter()
            .find(|t| t.name == binding.table)
            .ok_or_else(|| SchemaLoadError::UnknownBindingTable {
                dimension: binding.dimension.clone(),
                table: binding.table.clone(),
            })?;

        if table.find_column(&binding.column).is_none() {
            return Err(SchemaLoadError::UnknownBindingColumn {
                dimension: binding.dimension.clone(),
                table: binding.table.clone(),
                column: binding.column.clone(),
            });
        }

        if bindings
            .iter()
            .any(|b| b.dimension == binding.dimension && b.table == binding.table)
        {
            return Err(SchemaLoadError::DuplicateBinding {
                dimension: binding.dimension.clone(),
                table: binding.table.clone(),
            });
        }

        bindings.push(DimensionBinding {
            dimension: binding.dimension.clone(),
            table: binding.table.clone(),
            column: binding.column.clone(),
        });
    }

    if let Some(default_table) = &source.default_table {
        if !seen_tables.contains(default_table) {
            return Err(SchemaLoadError::UnknownDefaultTable(default_table.clone()));
        }
    }

    let fingerprint = fingerprint(
        &tables,
        &alias_groups,
        &bindings,
        source.default_table.as_deref(),
    );

    for warning in &warnings {
        tracing::warn!(code = %warning.code, "{}", warning.message);
    }
    tracing::info!(
        tables = tables.len(),
        alias_groups = alias_groups.len(),
        warnings = warnings.len(),
        fingerprint = %fingerprint,
        "Loaded schema catalog"
    );

    Ok(SchemaCatalog::from_parts(CatalogParts {
        tables,
        alias_groups,
        bindings,
        default_table: source.default_table.clone(),
        examples: source.examples.clone(),
        fingerprint,
        warnings,
    }))
}

fn load_table(table: &TableSource) -> Result<TableDescriptor, SchemaLoadError> {
    check_identifier("table", &table.name)?;

    if table.columns.is_empty() {
        return Err(SchemaLoadError::EmptyTable(table.name.clone()));
    }

    let mut columns = Vec::with_capacity(table.columns.len());
    let mut seen = HashSet::new();
    for column in &table.columns {
        check_identifier(&format!("table '{}'", table.name), &column.name)?;
        if !seen.insert(column.name.as_str()) {
            return Err(SchemaLoadError::DuplicateColumn {
                table: table.name.clone(),
                column: column.name.clone(),
            });
        }

        let nullable = match column.nullable {
            Some(true) => Nullability::Yes,
            Some(false) => Nullability::No,
            None => Nullability::Unknown,
        };
        columns.push(ColumnDescriptor::new(&column.name, &column.declared_type).with_nullability(nullable));
    }

    for (field, value) in [
        ("time_column", &table.time_column),
        ("measure_column", &table.measure_column),
    ] {
        if let Some(column) = value {
            if !seen.contains(column.as_str()) {
                return Err(SchemaLoadError::UnknownColumnReference {
                    table: table.name.clone(),
                    field: field.to_string(),
                    column: column.clone(),
                });
            }
        }
    }

    let mut keywords: Vec<String> = Vec::with_capacity(table.keywords.len());
    for keyword in &table.keywords {
        let normalized = normalize(keyword);
        if normalized.is_empty() {
            return Err(SchemaLoadError::EmptyKeyword(table.name.clone()));
        }
        if !keywords.contains(&normalized) {
            keywords.push(normalized);
        }
    }

    Ok(TableDescriptor {
        name: table.name.clone(),
        description: table.description.trim().to_string(),
        keywords,
        columns,
        time_column: table.time_column.clone(),
        measure_column: table.measure_column.clone(),
    })
}

fn load_alias_group(
    position: usize,
    group: &AliasGroupSource,
    warnings: &mut Vec<Diagnostic>,
) -> Result<AliasGroup, SchemaLoadError> {
    let dimension = group.dimension.trim();
    if dimension.is_empty() {
        return Err(SchemaLoadError::EmptyDimension(position));
    }

    let mut values: Vec<CanonicalAliases> = Vec::with_capacity(group.values.len());
    for (canonical, aliases) in &group.values {
        let canonical = canonical.trim();
        if canonical.is_empty() {
            return Err(SchemaLoadError::EmptyCanonical {
                dimension: dimension.to_string(),
            });
        }
        // Canonical values end up inside LIKE patterns
        if canonical.contains(['%', '_']) {
            return Err(SchemaLoadError::WildcardInCanonical {
                dimension: dimension.to_string(),
                canonical: canonical.to_string(),
            });
        }

        for raw in aliases {
            let alias = normalize(raw);
            if alias.is_empty() {
                return Err(SchemaLoadError::MalformedAlias {
                    dimension: dimension.to_string(),
                    canonical: canonical.to_string(),
                    alias: raw.clone(),
                });
            }

            // Later definition wins
            for earlier in values.iter_mut().filter(|v| v.canonical != canonical) {
                if let Some(index) = earlier.aliases.iter().position(|a| *a == alias) {
                    earlier.aliases.remove(index);
                    warnings.push(
                        Diagnostic::warn(
                            DiagnosticCode::AliasConflict,
                            format!(
                                "Alias '{}' in group '{}' moved from '{}' to '{}'",
                                alias, dimension, earlier.canonical, canonical
                            ),
                        )
                        .with_location(Location::new(format!("alias_groups.{}", dimension)))
                        .with_comparison(earlier.canonical.clone(), canonical),
                    );
                }
            }

            let entry = match values.iter().position(|v| v.canonical == canonical) {
                Some(index) => &mut values[index],
                None => {
                    values.push(CanonicalAliases {
                        canonical: canonical.to_string(),
                        aliases: Vec::new(),
                    });
                    let last = values.len() - 1;
                    &mut values[last]
                }
            };
            if !entry.aliases.contains(&alias) {
                entry.aliases.push(alias);
            }
        }

        // A canonical value with no aliases is still a known value
        if !values.iter().any(|v| v.canonical == canonical) {
            values.push(CanonicalAliases {
                canonical: canonical.to_string(),
                aliases: Vec::new(),
            });
        }
    }

    Ok(AliasGroup {
        dimension: dimension.to_string(),
        values,
    })
}

fn check_identifier(entry: &str, name: &str) -> Result<(), SchemaLoadError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(SchemaLoadError::MalformedIdentifier {
            entry: entry.to_string(),
            name: name.to_string(),
        })
    }
}

fn fingerprint(
    tables: &[TableDescriptor],
    alias_groups: &[AliasGroup],
    bindings: &[DimensionBinding],
    default_table: Option<&str>,
) -> String {
    let canonical = serde_json::json!({
        "tables": tables,
        "alias_groups": alias_groups,
        "bindings": bindings,
        "default_table": default_table,
    });

    let mut hasher = Sha256::new();
    hasher.update(canonical.to_string().as_bytes());
    hex::encode(hasher.finalize())
}
