//! Validation failures
//!
//! Every variant maps to one stable diagnostic code. Validation failures are
//! returned as-is and never auto-corrected.

use querygate_core::{Diagnostic, DiagnosticCode, Location, Severity};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Unknown table: {0}")]
    UnknownTable(String),

    #[error("Unknown column '{column}' on table '{table}'")]
    UnknownColumn { table: String, column: String },

    #[error("Malformed filter on '{column}': {reason}")]
    MalformedFilter { column: String, reason: String },

    #[error("Rejected multiple statements or comments: {0}")]
    MultiStatementRejected(String),

    #[error("Row limit {requested} exceeds the maximum of {max}")]
    RowLimitExceeded { requested: u64, max: u32 },

    #[error("Invalid row limit: {0}")]
    InvalidRowLimit(String),

    #[error("Unparseable SQL: {0}")]
    Unparseable(String),

    #[error("Not a read-only query: {0}")]
    NotReadOnly(String),

    #[error("Unsupported SQL: {0}")]
    UnsupportedSyntax(String),

    #[error("Draft does not match declaration: {0}")]
    DeclarationMismatch(String),
}

impl ValidationError {
    /// Stable code of the violated rule
    pub fn code(&self) -> DiagnosticCode {
        match self {
            Self::UnknownTable(_) => DiagnosticCode::UnknownTable,
            Self::UnknownColumn { .. } => DiagnosticCode::UnknownColumn,
            Self::MalformedFilter { .. } => DiagnosticCode::MalformedFilter,
            Self::MultiStatementRejected(_) => DiagnosticCode::MultiStatementRejected,
            Self::RowLimitExceeded { .. } => DiagnosticCode::RowLimitExceeded,
            Self::InvalidRowLimit(_) => DiagnosticCode::InvalidRowLimit,
            Self::Unparseable(_) => DiagnosticCode::Unparseable,
            Self::NotReadOnly(_) => DiagnosticCode::NotReadOnly,
            Self::UnsupportedSyntax(_) => DiagnosticCode::UnsupportedSyntax,
            Self::DeclarationMismatch(_) => DiagnosticCode::DeclarationMismatch,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let diagnostic = Diagnostic::new(self.code(), Severity::Error, self.to_string());

        match self {
            Self::RowLimitExceeded { requested, max } => {
                diagnostic.with_comparison(format!("<= {}", max), requested.to_string())
            }
            Self::UnknownColumn { table, .. } => diagnostic.with_location(Location::new(table.clone())),
            _ => diagnostic,
        }
    }
}
