//! End-to-end tests for the service facade

mod fixtures;

use fixtures::{
    rules, rules_only_service, usage_catalog, DeniedExecutor, RecordingExecutor, USAGE_SCHEMA,
};
use pretty_assertions::assert_eq;
use querygate_catalog::{SchemaSource, SourceFormat};
use querygate_core::{
    Config, DialectConfig, Filter, FilterOp, LimitConfig, ParamValue, QueryIntent,
};
use querygate_engine::{ExecutionError, QueryError, QueryService, ResultSet, ServiceError};
use querygate_sql::{DeclaredShape, ValidationError};
use querygate_translate::{MockTranslator, TranslationChain, TranslationError};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn service_with(chain: TranslationChain) -> QueryService {
    QueryService::new(
        usage_catalog(),
        chain,
        DialectConfig::MsSql,
        LimitConfig::default(),
    )
}

#[test]
fn describe_schema_lists_tables_and_aliases() {
    let service = rules_only_service();
    let description = service.describe_schema();

    assert_eq!(description.tables.len(), 2);
    assert!(description.has_column("ProductUsage", "OperatingSystem"));
    assert_eq!(description.alias_groups.len(), 3);
    assert_eq!(description.examples.len(), 1);

    // Idempotent
    assert_eq!(service.describe_schema(), description);
}

#[tokio::test]
async fn js_usage_this_month() {
    let service = rules_only_service();
    let outcome = service
        .translate("show js product usage this month")
        .await
        .unwrap();

    assert_eq!(
        outcome.statement.sql(),
        "SELECT TOP (100) [Month], [Product], [OperatingSystem], [RequestCount] \
         FROM [ProductUsage] WHERE [Product] LIKE @p1 AND [Month] LIKE @p2"
    );
    assert_eq!(
        outcome.statement.params(),
        &[ParamValue::text("%JavaScript%"), ParamValue::text("2025-08%")]
    );
    assert_eq!(outcome.report.backend.as_deref(), Some("rules"));
    assert_eq!(outcome.report.summary.attempts, 1);
    assert!(!outcome.report.has_errors());
}

#[tokio::test]
async fn top_five_products() {
    let service = rules_only_service();
    let outcome = service.translate("top 5 most used products").await.unwrap();

    assert_eq!(
        outcome.statement.sql(),
        "SELECT TOP (5) [Month], [Product], [OperatingSystem], [RequestCount] \
         FROM [ProductUsage] ORDER BY [RequestCount] DESC"
    );
    assert_eq!(outcome.statement.row_limit(), 5);
}

#[tokio::test]
async fn rule_based_intents_always_build() {
    let service = rules_only_service();

    for text in [
        "show js product usage this month",
        "top 5 most used products",
        "bottom 3 services last month",
        "python on linux in 2025-03",
        "blob and keyvault usage",
        "node windows product usage previous month",
        "dotnet in service usage",
        "least used key vault",
    ] {
        match service.translate(text).await {
            Ok(outcome) => assert!(outcome.statement.sql().starts_with("SELECT TOP (")),
            Err(QueryError::Validation(error)) => panic!("{}: {}", text, error),
            Err(other) => panic!("{}: unexpected {}", text, other),
        }
    }
}

#[tokio::test]
async fn warnings_reach_the_report() {
    let service = rules_only_service();
    let outcome = service
        .translate("js or python product usage this month")
        .await
        .unwrap();

    let codes: Vec<_> = outcome
        .report
        .diagnostics
        .iter()
        .map(|d| d.code.as_str())
        .collect();
    assert_eq!(codes, vec!["FILTER_CONFLICT"]);
    assert_eq!(outcome.statement.params().len(), 2);
}

#[tokio::test]
async fn model_failure_falls_back_and_is_reported() {
    let remote = Arc::new(
        MockTranslator::new("remote")
            .failing_with(TranslationError::Unreachable("connection refused".into())),
    );
    let service =
        service_with(TranslationChain::new(rules()).with_backend(remote, Duration::from_secs(1)));

    let outcome = service.translate("top 5 most used products").await.unwrap();

    assert_eq!(outcome.report.backend.as_deref(), Some("rules"));
    assert_eq!(outcome.report.summary.attempts, 2);
    assert_eq!(outcome.report.diagnostics[0].code.as_str(), "BACKEND_FAILED");
    assert!(outcome.report.diagnostics[0]
        .message
        .contains("connection refused"));
}

#[tokio::test]
async fn model_intent_is_validated() {
    let model = Arc::new(
        MockTranslator::new("local").replying_with_intent(
            QueryIntent::new("ServiceUsage")
                .with_columns(["Service", "RequestCount"])
                .with_limit(5_000),
        ),
    );
    let service =
        service_with(TranslationChain::new(rules()).with_backend(model, Duration::from_secs(1)));

    let outcome = service.translate("anything").await.unwrap();
    assert_eq!(
        outcome.statement.sql(),
        "SELECT TOP (1000) [Service], [RequestCount] FROM [ServiceUsage]"
    );
    assert_eq!(outcome.report.diagnostics[0].code.as_str(), "ROW_LIMIT_CLAMPED");
}

#[tokio::test]
async fn model_draft_is_rederived() {
    let model = Arc::new(MockTranslator::new("remote").replying_with_sql(
        "SELECT Service, RequestCount FROM ServiceUsage WHERE Service = 'Storage' \
         ORDER BY RequestCount DESC",
    ));
    let service =
        service_with(TranslationChain::new(rules()).with_backend(model, Duration::from_secs(1)));

    let outcome = service.translate("storage usage").await.unwrap();
    assert_eq!(
        outcome.statement.sql(),
        "SELECT TOP (100) [Service], [RequestCount] FROM [ServiceUsage] \
         WHERE [Service] = @p1 ORDER BY [RequestCount] DESC"
    );
    assert_eq!(outcome.statement.params(), &[ParamValue::text("Storage")]);
}

#[tokio::test]
async fn hostile_draft_counts_as_backend_failure() {
    let model = Arc::new(
        MockTranslator::new("remote").replying_with_sql("DELETE FROM ProductUsage"),
    );
    let terminal = Arc::new(
        MockTranslator::new("rules").replying_with_intent(QueryIntent::new("ProductUsage")),
    );
    let service = service_with(
        TranslationChain::new(terminal.clone()).with_backend(model, Duration::from_secs(1)),
    );

    let outcome = service.translate("remove everything").await.unwrap();
    assert_eq!(outcome.report.backend.as_deref(), Some("rules"));
    assert_eq!(terminal.calls(), 1);
    assert_eq!(outcome.report.diagnostics[0].code.as_str(), "BACKEND_FAILED");
    assert!(outcome.report.diagnostics[0].message.contains("NOT_READ_ONLY"));

    let model = Arc::new(MockTranslator::new("remote").replying_with_sql(
        "SELECT Month FROM ProductUsage; DROP TABLE ProductUsage",
    ));
    let service =
        service_with(TranslationChain::new(rules()).with_backend(model, Duration::from_secs(1)));
    let outcome = service.translate("top 5 most used products").await.unwrap();
    assert_eq!(outcome.report.backend.as_deref(), Some("rules"));
    assert!(outcome.report.diagnostics[0]
        .message
        .contains("MULTI_STATEMENT_REJECTED"));
}

#[tokio::test]
async fn draft_outside_schema_falls_back_to_rules() {
    let model = Arc::new(
        MockTranslator::new("remote").replying_with_sql("SELECT Name FROM Users"),
    );
    let service =
        service_with(TranslationChain::new(rules()).with_backend(model, Duration::from_secs(1)));

    let outcome = service
        .translate("show js product usage this month")
        .await
        .unwrap();

    assert_eq!(outcome.report.backend.as_deref(), Some("rules"));
    assert_eq!(outcome.statement.table(), "ProductUsage");
    assert_eq!(outcome.report.summary.attempts, 2);
    assert!(outcome.report.diagnostics[0].message.contains("Users"));
}

#[tokio::test]
async fn malformed_model_filter_falls_back_to_rules() {
    let intent = QueryIntent::new("ProductUsage").with_filter(Filter::new(
        "RequestCount",
        FilterOp::Between,
        vec![ParamValue::Integer(10)],
    ));
    let model = Arc::new(MockTranslator::new("local").replying_with_intent(intent));
    let service =
        service_with(TranslationChain::new(rules()).with_backend(model, Duration::from_secs(1)));

    let outcome = service.translate("top 5 most used products").await.unwrap();
    assert_eq!(outcome.report.backend.as_deref(), Some("rules"));
    assert!(outcome.report.diagnostics[0]
        .message
        .contains("does not fit the schema"));
}

#[tokio::test]
async fn terminal_output_errors_are_not_retried() {
    let terminal = Arc::new(
        MockTranslator::new("rules").replying_with_intent(QueryIntent::new("Users")),
    );
    let service = service_with(TranslationChain::new(terminal.clone()));

    let error = service.translate("users").await.unwrap_err();
    assert!(matches!(
        error,
        QueryError::Validation(ValidationError::UnknownTable(ref t)) if t == "Users"
    ));
    assert_eq!(error.code().map(|c| c.as_str()), Some("UNKNOWN_TABLE"));
    assert_eq!(terminal.calls(), 1);
}

#[tokio::test]
async fn exhausted_chain_reports_every_backend() {
    let slow = Arc::new(
        MockTranslator::new("local")
            .with_latency(1_000)
            .replying_with_intent(QueryIntent::new("ProductUsage")),
    );
    let broken = Arc::new(
        MockTranslator::new("remote").failing_with(TranslationError::MalformedResponse(
            "not JSON".into(),
        )),
    );
    let service = service_with(
        TranslationChain::new(rules())
            .with_backend(slow, Duration::from_millis(30))
            .with_backend(broken, Duration::from_secs(1)),
    );

    let error = service.translate("how is the weather").await.unwrap_err();
    let QueryError::Translation(failure) = &error else {
        panic!("expected translation failure, got {}", error);
    };
    assert_eq!(failure.reasons().len(), 3);

    let report = error.to_report();
    assert!(report.has_errors());
    assert_eq!(report.summary.attempts, 3);
    let codes: Vec<_> = report.diagnostics.iter().map(|d| d.code.as_str()).collect();
    assert_eq!(
        codes,
        vec![
            "BACKEND_FAILED",
            "BACKEND_FAILED",
            "BACKEND_FAILED",
            "TRANSLATION_EXHAUSTED"
        ]
    );
}

#[test]
fn validate_rejects_unknown_table() {
    let service = rules_only_service();
    let error = service
        .validate("SELECT Name FROM Users", &DeclaredShape::new("Users"))
        .unwrap_err();

    assert_eq!(error, ValidationError::UnknownTable("Users".to_string()));
}

#[test]
fn validate_accepts_declared_draft() {
    let service = rules_only_service();
    let statement = service
        .validate(
            "SELECT TOP 10 Product, RequestCount FROM ProductUsage WHERE Month LIKE '2025-07%'",
            &DeclaredShape::new("ProductUsage").with_columns(["Product", "RequestCount", "Month"]),
        )
        .unwrap();

    assert_eq!(
        statement.sql(),
        "SELECT TOP (10) [Product], [RequestCount] FROM [ProductUsage] WHERE [Month] LIKE @p1"
    );

    let undeclared = service.validate(
        "SELECT Product, OperatingSystem FROM ProductUsage",
        &DeclaredShape::new("ProductUsage").with_columns(["Product"]),
    );
    assert!(matches!(
        undeclared,
        Err(ValidationError::DeclarationMismatch(_))
    ));
}

#[tokio::test]
async fn reload_swaps_catalog_for_new_requests_only() {
    let service = rules_only_service();
    let in_flight = service.snapshot();

    let replacement = SchemaSource::parse(
        r#"{"tables": [{"name": "Errors", "keywords": ["errors"], "columns": [{"name": "Code", "type": "int"}]}]}"#,
        SourceFormat::Json,
    )
    .unwrap();
    let generation = service.reload(&replacement).unwrap();

    assert_eq!(generation, in_flight.generation() + 1);
    assert!(in_flight.catalog().has_table("ProductUsage"));
    assert!(!service.snapshot().catalog().has_table("ProductUsage"));

    let outcome = service.translate("errors").await.unwrap();
    assert_eq!(outcome.statement.table(), "Errors");
}

#[test]
fn failed_reload_keeps_current_catalog() {
    let service = rules_only_service();
    let broken = SchemaSource::parse(r#"{"tables": []}"#, SourceFormat::Json).unwrap();

    assert!(service.reload(&broken).is_err());
    assert!(service.snapshot().catalog().has_table("ProductUsage"));
    assert_eq!(service.snapshot().generation(), 0);
}

#[tokio::test]
async fn execute_hands_over_validated_statement() {
    let service = rules_only_service();
    let executor = RecordingExecutor::new(
        ResultSet::new(vec!["Product".into(), "RequestCount".into()])
            .with_row(vec![json!("JavaScript"), json!(1200)]),
    );

    let outcome = service
        .translate_and_execute("top 5 most used products", &executor)
        .await
        .unwrap();

    assert_eq!(outcome.rows.len(), 1);
    assert_eq!(
        executor.seen.lock().unwrap().as_slice(),
        &[outcome.statement.sql().to_string()]
    );
}

#[tokio::test]
async fn executor_errors_pass_through() {
    let service = rules_only_service();
    let error = service
        .translate_and_execute("top 5 most used products", &DeniedExecutor)
        .await
        .unwrap_err();

    match error {
        QueryError::Execution(ExecutionError::PermissionDenied(what)) => {
            assert_eq!(what, "SELECT on ProductUsage")
        }
        other => panic!("unexpected {}", other),
    }
}

#[tokio::test]
async fn service_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("schema.json"), USAGE_SCHEMA).unwrap();
    std::fs::write(
        dir.path().join("querygate.toml"),
        "dialect = \"postgres\"\nschema_path = \"schema.json\"\n\n[limits]\nmax_rows = 50\n",
    )
    .unwrap();

    let config = Config::from_file(&dir.path().join("querygate.toml")).unwrap();
    let service = QueryService::from_config(&config).unwrap();

    assert_eq!(service.dialect(), DialectConfig::Postgres);
    assert_eq!(service.chain().backend_names(), vec!["rules"]);

    let outcome = service.translate("top 500 js product usage").await.unwrap();
    assert_eq!(
        outcome.statement.sql(),
        "SELECT \"Month\", \"Product\", \"OperatingSystem\", \"RequestCount\" \
         FROM \"ProductUsage\" WHERE \"Product\" LIKE $1 \
         ORDER BY \"RequestCount\" DESC LIMIT 50"
    );
}

#[test]
fn service_needs_a_schema() {
    let config = Config::default();
    assert!(matches!(
        QueryService::from_config(&config),
        Err(ServiceError::NoSchema)
    ));
}
