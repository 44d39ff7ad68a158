//! Test fixtures for catalog integration tests
//!
//! A small usage-reporting schema: monthly request counts per SDK product and
//! operating system, plus a second table of per-service counts.

#![allow(dead_code)]

use querygate_catalog::{load_str, SourceFormat};
use querygate_core::SchemaCatalog;

pub const USAGE_SCHEMA_JSON: &str = r#"{
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
      "description": "Monthly request counts per cloud service",
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
        ".NET": [".net", "dotnet", "c#"],
        "Java": ["java"]
      }
    },
    {
      "dimension": "os",
      "values": {
        "Windows": ["win", "windows"],
        "Linux": ["linux", "ubuntu"],
        "macOS": ["mac", "osx"]
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
    {
      "question": "top 5 products last month",
      "sql": "SELECT TOP (5) [Month], [Product], [OperatingSystem], [RequestCount] FROM [ProductUsage] WHERE [Month] LIKE @p1 ORDER BY [RequestCount] DESC"
    }
  ]
}"#;

pub const USAGE_SCHEMA_TOML: &str = r#"
default_table = "ProductUsage"

[[tables]]
name = "ProductUsage"
keywords = ["product usage"]
time_column = "Month"
measure_column = "RequestCount"
columns = [
    { name = "Month", type = "varchar(7)", nullable = false },
    { name = "Product", type = "nvarchar(100)" },
    { name = "RequestCount", type = "bigint" },
]

[[alias_groups]]
dimension = "product"
values = { JavaScript = ["js", "javascript", "node"] }

[[dimensions]]
dimension = "product"
table = "ProductUsage"
column = "Product"
"#;

/// The usage schema, loaded
pub fn usage_catalog() -> SchemaCatalog {
    load_str(USAGE_SCHEMA_JSON, SourceFormat::Json).expect("fixture schema loads")
}
