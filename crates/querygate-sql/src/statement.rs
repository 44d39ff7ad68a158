//! The only thing handed to an executor

use querygate_core::{DialectConfig, Diagnostic, ParamValue};
use serde::Serialize;

/// A single read-only SELECT with bound parameters.
///
/// Only [`crate::SqlBuilder`] constructs these; every table and column in
/// `sql` was checked against the catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatedStatement {
    sql: String,
    params: Vec<ParamValue>,
    dialect: DialectConfig,
    table: String,
    columns: Vec<String>,
    row_limit: u32,
    notes: Vec<Diagnostic>,
}

impl ValidatedStatement {
    pub(crate) fn new(
        sql: String,
        params: Vec<ParamValue>,
        dialect: DialectConfig,
        table: String,
        columns: Vec<String>,
        row_limit: u32,
        notes: Vec<Diagnostic>,
    ) -> Self {
        Self {
            sql,
            params,
            dialect,
            table,
            columns,
            row_limit,
            notes,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Parameter values in placeholder order
    pub fn params(&self) -> &[ParamValue] {
        &self.params
    }

    pub fn dialect(&self) -> DialectConfig {
        self.dialect
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Selected columns, expanded
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Effective row limit written into the statement
    pub fn row_limit(&self) -> u32 {
        self.row_limit
    }

    /// Non-fatal adjustments, such as a clamped limit
    pub fn notes(&self) -> &[Diagnostic] {
        &self.notes
    }
}

impl std::fmt::Display for ValidatedStatement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.sql)
    }
}
