//! Shared fixtures for service tests

#![allow(dead_code)]

use chrono::NaiveDate;
use querygate_catalog::{load_str, SourceFormat};
use querygate_core::{DialectConfig, LimitConfig, SchemaCatalog};
use querygate_engine::{ExecutionError, QueryExecutor, QueryService, ResultSet};
use querygate_sql::ValidatedStatement;
use querygate_translate::{RuleBasedTranslator, TranslationChain};
use std::sync::{Arc, Mutex};

pub const USAGE_SCHEMA: &str = r#"{
  "default_table": "ProductUsage",
  "tables": [
    {
      "name": "ProductUsage",
      "description": "Monthly request counts per SDK product and operating system",
      "keywords": ["product usage", "sdk"],
      "time_column": "Month",
      "measure_column": "RequestCount",
      "columns": [
        { "name": "Month", "type": "varchar(7)", "nullable": false },
        { "name": "Product", "type": "nvarchar(100)", "nullable": false },
        { "name": "OperatingSystem", "type": "nvarchar(50)" },
        { "name": "RequestCount", "type": "bigint", "nullable": false }
      ]
    },
    {
      "name": "ServiceUsage",
      "keywords": ["service usage", "services"],
      "time_column": "Month",
      "measure_column": "RequestCount",
      "columns": [
        { "name": "Month", "type": "varchar(7)", "nullable": false },
        { "name": "Service", "type": "nvarchar(100)", "nullable": false },
        { "name": "RequestCount", "type": "bigint", "nullable": false }
      ]
    }
  ],
  "alias_groups": [
    {
      "dimension": "product",
      "values": {
        "JavaScript": ["js", "javascript", "node"],
        "Python-SDK": ["python", "py"],
        ".NET": [".net", "dotnet", "c#"]
      }
    },
    {
      "dimension": "os",
      "values": {
        "Windows": ["win", "windows"],
        "Linux": ["linux", "ubuntu"]
      }
    },
    {
      "dimension": "azure-service",
      "values": {
        "Storage": ["blob", "storage"],
        "Key Vault": ["keyvault", "key vault"]
      }
    }
  ],
  "dimensions": [
    { "dimension": "product", "table": "ProductUsage", "column": "Product" },
    { "dimension": "os", "table": "ProductUsage", "column": "OperatingSystem" },
    { "dimension": "azure-service", "table": "ServiceUsage", "column": "Service" }
  ],
  "examples": [
    { "question": "top 5 products last month", "sql": "SELECT TOP (5) [Product], [RequestCount] FROM [ProductUsage] WHERE [Month] LIKE @p1 ORDER BY [RequestCount] DESC" }
  ]
}"#;

pub fn usage_catalog() -> SchemaCatalog {
    load_str(USAGE_SCHEMA, SourceFormat::Json).expect("fixture schema loads")
}

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 8, 14).unwrap()
}

pub fn rules() -> Arc<RuleBasedTranslator> {
    Arc::new(RuleBasedTranslator::with_today(today()))
}

/// Service with only the rule-based extractor
pub fn rules_only_service() -> QueryService {
    QueryService::new(
        usage_catalog(),
        TranslationChain::new(rules()),
        DialectConfig::MsSql,
        LimitConfig::default(),
    )
}

/// Records every statement and answers with a fixed result set
pub struct RecordingExecutor {
    pub seen: Mutex<Vec<String>>,
    pub rows: ResultSet,
}

impl RecordingExecutor {
    pub fn new(rows: ResultSet) -> Self {
        Self {
            seen: Mutex::new(Vec::new()),
            rows,
        }
    }
}

#[async_trait::async_trait]
impl QueryExecutor for RecordingExecutor {
    async fn execute(&self, statement: &ValidatedStatement) -> Result<ResultSet, ExecutionError> {
        self.seen.lock().unwrap().push(statement.sql().to_string());
        Ok(self.rows.clone())
    }
}

/// Always refuses
pub struct DeniedExecutor;

#[async_trait::async_trait]
impl QueryExecutor for DeniedExecutor {
    async fn execute(&self, _statement: &ValidatedStatement) -> Result<ResultSet, ExecutionError> {
        Err(ExecutionError::PermissionDenied("SELECT on ProductUsage".to_string()))
    }
}
