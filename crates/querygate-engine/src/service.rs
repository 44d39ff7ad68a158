//! Service facade
//!
//! Owns the process-wide catalog snapshot and the translation chain and
//! exposes the external operations: describe, translate, validate, reload.
//! Every request works on the snapshot it started with.

use querygate_catalog::{CatalogHandle, CatalogSnapshot, SchemaSource};
use querygate_core::{
    Config, DialectConfig, LimitConfig, Report, SchemaCatalog, SchemaDescription,
};
use querygate_sql::{DeclaredShape, DraftValidator, SqlBuilder, ValidatedStatement, ValidationError};
use querygate_translate::{
    translator_from_config, RuleBasedTranslator, TranslationChain, TranslationError,
    TranslationOutput, TranslationRequest,
};
use std::path::Path;
use std::sync::Arc;

use crate::error::{backend_failed, QueryError, ServiceError};
use crate::executor::{QueryExecutor, ResultSet};

/// A translated request: the statement plus its report
#[derive(Debug, Clone)]
pub struct TranslationOutcome {
    pub statement: ValidatedStatement,
    pub report: Report,
}

/// Statement and rows from [`QueryService::translate_and_execute`]
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub statement: ValidatedStatement,
    pub rows: ResultSet,
    pub report: Report,
}

pub struct QueryService {
    catalog: CatalogHandle,
    chain: TranslationChain,
    dialect: DialectConfig,
    limits: LimitConfig,
}

impl QueryService {
    pub fn new(
        catalog: SchemaCatalog,
        chain: TranslationChain,
        dialect: DialectConfig,
        limits: LimitConfig,
    ) -> Self {
        Self {
            catalog: CatalogHandle::new(catalog),
            chain,
            dialect,
            limits,
        }
    }

    /// Assemble a service from configuration: load the schema source and
    /// put every enabled backend ahead of the rule-based extractor
    pub fn from_config(config: &Config) -> Result<Self, ServiceError> {
        config.validate()?;

        let schema_path = config.resolved_schema_path().ok_or(ServiceError::NoSchema)?;
        let catalog = querygate_catalog::load_file(&schema_path)?;

        let mut chain = TranslationChain::new(Arc::new(RuleBasedTranslator::new()))
            .with_redaction(config.redact_sensitive_data);
        for backend in config.enabled_backends() {
            let translator =
                translator_from_config(backend).map_err(|source| ServiceError::Backend {
                    name: backend.name.clone(),
                    source,
                })?;
            chain = chain.with_backend(translator, backend.timeout());
        }

        tracing::info!(
            schema = %schema_path.display(),
            backends = ?chain.backend_names(),
            dialect = ?config.dialect,
            "Query service ready"
        );

        Ok(Self::new(catalog, chain, config.dialect, config.limits.clone()))
    }

    /// Current snapshot; hold it for the whole request
    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        self.catalog.snapshot()
    }

    pub fn chain(&self) -> &TranslationChain {
        &self.chain
    }

    pub fn dialect(&self) -> DialectConfig {
        self.dialect
    }

    /// Metadata document: tables, columns, alias groups and examples
    pub fn describe_schema(&self) -> SchemaDescription {
        self.snapshot().catalog().describe()
    }

    /// Run the full pipeline: translation chain, then the builder or the
    /// draft validator. A model backend whose output fails validation counts
    /// as a failed attempt; only the terminal translator's output surfaces
    /// as a [`ValidationError`].
    pub async fn translate(&self, text: &str) -> Result<TranslationOutcome, QueryError> {
        let snapshot = self.snapshot();
        let request = TranslationRequest::new(text, Arc::clone(&snapshot));
        let validator = DraftValidator::new(SqlBuilder::new(
            snapshot.catalog(),
            self.dialect,
            self.limits.clone(),
        ));

        let success = self
            .chain
            .run_checked(&request, |translation| {
                statement_for(&validator, &translation.output).map_err(rejected_output)
            })
            .await?;

        let statement = match success.accepted {
            Some(statement) => statement,
            None => statement_for(&validator, &success.translation.output)?,
        };

        let mut report = Report::new()
            .with_backend(&success.backend)
            .with_statement(statement.sql(), statement.params().to_vec())
            .with_attempts(success.attempts.len());
        for attempt in &success.attempts {
            if let Some(reason) = attempt.reason() {
                report.add_diagnostic(backend_failed(&attempt.backend, &reason));
            }
        }
        for warning in success.translation.warnings.iter().chain(statement.notes()) {
            report.add_diagnostic(warning.clone());
        }

        tracing::debug!(
            backend = %success.backend,
            table = %statement.table(),
            generation = snapshot.generation(),
            "Translated request"
        );

        Ok(TranslationOutcome { statement, report })
    }

    /// Check an externally produced draft against the catalog and the
    /// caller's declared table and columns
    pub fn validate(
        &self,
        sql: &str,
        declared: &DeclaredShape,
    ) -> Result<ValidatedStatement, ValidationError> {
        let snapshot = self.snapshot();
        let builder = SqlBuilder::new(snapshot.catalog(), self.dialect, self.limits.clone());
        DraftValidator::new(builder).validate(sql, declared)
    }

    /// Load a new catalog and swap it in; on error the current one stays.
    /// Returns the new generation.
    pub fn reload(&self, source: &SchemaSource) -> Result<u64, querygate_catalog::SchemaLoadError> {
        let snapshot = self.catalog.reload(source)?;
        Ok(snapshot.generation())
    }

    pub fn reload_from_file(&self, path: &Path) -> Result<u64, querygate_catalog::SchemaLoadError> {
        self.reload(&SchemaSource::from_file(path)?)
    }

    /// Translate, then hand the statement to `executor`. Executor errors
    /// come back unchanged inside [`QueryError::Execution`].
    pub async fn translate_and_execute(
        &self,
        text: &str,
        executor: &dyn QueryExecutor,
    ) -> Result<ExecutionOutcome, QueryError> {
        let TranslationOutcome { statement, report } = self.translate(text).await?;
        let rows = executor.execute(&statement).await?;

        tracing::debug!(rows = rows.len(), "Executed statement");

        Ok(ExecutionOutcome {
            statement,
            rows,
            report,
        })
    }
}

fn statement_for(
    validator: &DraftValidator<'_>,
    output: &TranslationOutput,
) -> Result<ValidatedStatement, ValidationError> {
    match output {
        TranslationOutput::Intent(intent) => validator.builder().build(intent),
        TranslationOutput::SqlDraft(sql) => validator.validate_draft(sql),
    }
}

/// A model output the validator refused, as that backend's failure
fn rejected_output(error: ValidationError) -> TranslationError {
    match error {
        ValidationError::UnknownTable(_)
        | ValidationError::UnknownColumn { .. }
        | ValidationError::MalformedFilter { .. } => {
            TranslationError::SchemaMismatch(error.to_string())
        }
        other => TranslationError::InvalidOutput {
            code: other.code(),
            message: other.to_string(),
        },
    }
}
