//! querygate core
//!
//! Core domain model with stable, versioned types.
//! Never rename diagnostic codes - they are part of the public API.

pub mod config;
pub mod describe;
pub mod diagnostic;
pub mod intent;
pub mod report;
pub mod schema;

pub use config::{BackendConfig, BackendKind, Config, ConfigError, DialectConfig, LimitConfig};
pub use describe::SchemaDescription;
pub use diagnostic::{Diagnostic, DiagnosticCode, Location, Severity};
pub use intent::{Filter, FilterOp, Ordering, ParamValue, QueryIntent, SortDirection};
pub use report::{Report, ReportVersion};
pub use schema::{
    AliasGroup, CanonicalAliases, CatalogParts, ColumnDescriptor, DimensionBinding, ExampleHint,
    LogicalType, Nullability, SchemaCatalog, TableDescriptor,
};
