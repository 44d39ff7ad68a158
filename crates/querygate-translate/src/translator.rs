//! Translator capability shared by every backend
//!
//! A translator turns request text into either a structured [`QueryIntent`]
//! or a SQL draft. It never executes anything; the draft still has to go
//! through the SQL validator.

use querygate_catalog::{AliasIndex, CatalogSnapshot};
use querygate_core::{Diagnostic, DiagnosticCode, QueryIntent, SchemaCatalog};
use std::sync::Arc;
use std::time::Duration;

/// Returned by the rule-based extractor when nothing in the text pins down
/// a table
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Could not understand request: {reason}")]
pub struct UnresolvedIntentError {
    pub reason: String,
}

impl UnresolvedIntentError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// One backend's failure
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TranslationError {
    #[error("Timed out after {} ms", .0.as_millis())]
    Timeout(Duration),

    #[error("Endpoint unreachable: {0}")]
    Unreachable(String),

    #[error("Backend rejected the request with HTTP {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Reply does not fit the schema: {0}")]
    SchemaMismatch(String),

    /// Output that fits the schema but breaks a statement rule
    #[error("Reply failed validation ({code}): {message}")]
    InvalidOutput {
        code: DiagnosticCode,
        message: String,
    },

    #[error("Confidence {confidence:.2} is below the minimum {minimum:.2}")]
    LowConfidence { confidence: f64, minimum: f64 },

    #[error("Backend misconfigured: {0}")]
    Configuration(String),

    #[error(transparent)]
    Unresolved(#[from] UnresolvedIntentError),
}

/// Input handed to every translator in the chain
#[derive(Debug, Clone)]
pub struct TranslationRequest {
    text: String,
    snapshot: Arc<CatalogSnapshot>,
}

impl TranslationRequest {
    pub fn new(text: impl Into<String>, snapshot: Arc<CatalogSnapshot>) -> Self {
        Self {
            text: text.into(),
            snapshot,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// The snapshot this request started on
    pub fn snapshot(&self) -> &Arc<CatalogSnapshot> {
        &self.snapshot
    }

    pub fn catalog(&self) -> &SchemaCatalog {
        self.snapshot.catalog()
    }

    pub fn index(&self) -> &AliasIndex {
        self.snapshot.index()
    }

    /// The catalog's metadata document as JSON, for prompts
    pub fn schema_description(&self) -> Result<String, TranslationError> {
        self.catalog()
            .describe()
            .to_json()
            .map_err(|e| TranslationError::Configuration(format!("cannot describe schema: {}", e)))
    }
}

/// What a translator produced
#[derive(Debug, Clone, PartialEq)]
pub enum TranslationOutput {
    Intent(QueryIntent),

    /// Raw SQL proposed by a model; must be re-derived before use
    SqlDraft(String),
}

/// A successful translation plus non-fatal findings
#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    pub output: TranslationOutput,
    pub warnings: Vec<Diagnostic>,
}

impl Translation {
    pub fn intent(intent: QueryIntent) -> Self {
        Self {
            output: TranslationOutput::Intent(intent),
            warnings: Vec::new(),
        }
    }

    pub fn draft(sql: impl Into<String>) -> Self {
        Self {
            output: TranslationOutput::SqlDraft(sql.into()),
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<Diagnostic>) -> Self {
        self.warnings = warnings;
        self
    }
}

/// Natural-language → intent capability
///
/// Implementations must be cheap to share; the chain holds them as
/// `Arc<dyn Translator>` and calls them from any task.
#[async_trait::async_trait]
pub trait Translator: Send + Sync {
    /// Backend name used in logs, attempt records and reports
    fn name(&self) -> &str;

    async fn translate(&self, request: &TranslationRequest) -> Result<Translation, TranslationError>;
}
