//! Errors surfaced by the service facade

use querygate_catalog::SchemaLoadError;
use querygate_core::{ConfigError, Diagnostic, DiagnosticCode, Report, Severity};
use querygate_sql::ValidationError;
use querygate_translate::{TranslationError, TranslationFailure};

use crate::executor::ExecutionError;

/// Why a request produced no statement or no rows
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error(transparent)]
    Translation(#[from] TranslationFailure),

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

impl QueryError {
    /// Stable code of the violated rule
    pub fn code(&self) -> Option<DiagnosticCode> {
        match self {
            Self::Translation(_) => Some(DiagnosticCode::TranslationExhausted),
            Self::Validation(error) => Some(error.code()),
            Self::Execution(_) => None,
        }
    }

    /// Report describing the failure
    pub fn to_report(&self) -> Report {
        match self {
            Self::Translation(failure) => {
                let mut diagnostics = failed_attempts(failure);
                diagnostics.push(Diagnostic::new(
                    DiagnosticCode::TranslationExhausted,
                    Severity::Error,
                    failure.to_string(),
                ));
                Report::from_diagnostics(diagnostics).with_attempts(failure.attempts.len())
            }
            Self::Validation(error) => Report::from_diagnostics(vec![error.to_diagnostic()]),
            Self::Execution(error) => Report::from_diagnostics(vec![Diagnostic::new(
                DiagnosticCode::Warning,
                Severity::Error,
                error.to_string(),
            )]),
        }
    }
}

/// One `BACKEND_FAILED` warning per failed attempt
pub(crate) fn failed_attempts(failure: &TranslationFailure) -> Vec<Diagnostic> {
    failure
        .reasons()
        .into_iter()
        .map(|(backend, reason)| backend_failed(&backend, &reason))
        .collect()
}

pub(crate) fn backend_failed(backend: &str, reason: &str) -> Diagnostic {
    Diagnostic::warn(
        DiagnosticCode::BackendFailed,
        format!("Backend '{}' failed: {}", backend, reason),
    )
}

/// Why a service could not be assembled
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("No schema_path configured")]
    NoSchema,

    #[error(transparent)]
    Schema(#[from] SchemaLoadError),

    #[error("Backend '{name}' could not be created: {source}")]
    Backend {
        name: String,
        #[source]
        source: TranslationError,
    },
}
