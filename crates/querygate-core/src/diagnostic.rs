//! Diagnostic codes and warning reporting
//!
//! IMPORTANT: Diagnostic codes are versioned and stable.
//! Calling agents key on these strings to adjust their requests.
//! NEVER rename or remove codes - add new ones instead.

use serde::{Deserialize, Serialize};

/// Diagnostic code registry (v1)
///
/// These codes are STABLE and VERSIONED.
/// Do NOT rename or remove codes - only add new ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticCode {
    // Catalog (1xxx)
    /// Two canonical values in one alias group claimed the same alias
    AliasConflict,

    /// An alias token is registered under more than one dimension
    AliasAmbiguous,

    // Intent extraction (2xxx)
    /// Two alias matches named different canonical values for one dimension
    FilterConflict,

    /// An alias matched a dimension that the chosen table does not carry
    DimensionNotOnTable,

    /// A second time expression was found and ignored
    TimeExpressionIgnored,

    // Translation (3xxx)
    /// A translation backend failed and the chain moved on
    BackendFailed,

    /// No backend produced a usable result
    TranslationExhausted,

    // Validation (4xxx)
    /// Table is not in the catalog
    UnknownTable,

    /// Column is not on the target table
    UnknownColumn,

    /// Filter operator, arity or value type is invalid
    MalformedFilter,

    /// Input contained statement separators or comments
    MultiStatementRejected,

    /// Requested row limit is above the configured ceiling
    RowLimitExceeded,

    /// Requested row limit is zero
    InvalidRowLimit,

    /// Requested row limit was lowered to the configured ceiling
    RowLimitClamped,

    /// SQL draft could not be parsed
    Unparseable,

    /// SQL draft is not a plain row selection
    NotReadOnly,

    /// SQL draft uses a construct outside the accepted subset
    UnsupportedSyntax,

    /// SQL draft does not match the caller's declared table and columns
    DeclarationMismatch,

    // General (9xxx)
    /// General informational message
    Info,

    /// General warning message
    Warning,
}

impl DiagnosticCode {
    /// Get the diagnostic code as a stable string identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AliasConflict => "ALIAS_CONFLICT",
            Self::AliasAmbiguous => "ALIAS_AMBIGUOUS",
            Self::FilterConflict => "FILTER_CONFLICT",
            Self::DimensionNotOnTable => "DIMENSION_NOT_ON_TABLE",
            Self::TimeExpressionIgnored => "TIME_EXPRESSION_IGNORED",
            Self::BackendFailed => "BACKEND_FAILED",
            Self::TranslationExhausted => "TRANSLATION_EXHAUSTED",
            Self::UnknownTable => "UNKNOWN_TABLE",
            Self::UnknownColumn => "UNKNOWN_COLUMN",
            Self::MalformedFilter => "MALFORMED_FILTER",
            Self::MultiStatementRejected => "MULTI_STATEMENT_REJECTED",
            Self::RowLimitExceeded => "ROW_LIMIT_EXCEEDED",
            Self::InvalidRowLimit => "INVALID_ROW_LIMIT",
            Self::RowLimitClamped => "ROW_LIMIT_CLAMPED",
            Self::Unparseable => "UNPARSEABLE",
            Self::NotReadOnly => "NOT_READ_ONLY",
            Self::UnsupportedSyntax => "UNSUPPORTED_SYNTAX",
            Self::DeclarationMismatch => "DECLARATION_MISMATCH",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
        }
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational message
    Info,

    /// Warning - the request was served but something was dropped or adjusted
    Warn,

    /// Error - the request was refused
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Where a diagnostic points to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// What the offsets refer to ("request", "draft", or a schema entry)
    pub source: String,

    /// Optional start byte offset
    pub start: Option<usize>,

    /// Optional end byte offset (exclusive)
    pub end: Option<usize>,
}

impl Location {
    /// Create a location that only names its source
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            start: None,
            end: None,
        }
    }

    /// Create a location covering a byte range of the source
    pub fn with_span(source: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            source: source.into(),
            start: Some(start),
            end: Some(end),
        }
    }
}

/// A diagnostic message with structured metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Stable diagnostic code
    pub code: DiagnosticCode,

    /// Severity level
    pub severity: Severity,

    /// Human-readable message
    pub message: String,

    /// Source location (best-effort)
    pub location: Option<Location>,

    /// Expected value (for comparison diagnostics)
    pub expected: Option<String>,

    /// Actual value (for comparison diagnostics)
    pub actual: Option<String>,
}

impl Diagnostic {
    /// Create a new diagnostic with minimal fields
    pub fn new(code: DiagnosticCode, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            code,
            severity,
            message: message.into(),
            location: None,
            expected: None,
            actual: None,
        }
    }

    /// Shorthand for a warning
    pub fn warn(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(code, Severity::Warn, message)
    }

    /// Set the location
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Set expected/actual values
    pub fn with_comparison(mut self, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self.actual = Some(actual.into());
        self
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.code, self.message)
    }
}
