//! Engine-specific rendering: identifier quoting, placeholders, row limits

use querygate_core::DialectConfig;

/// Where and how the row limit is written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitStyle {
    /// `SELECT TOP (n) ...`
    Top,

    /// `... LIMIT n`
    Limit,

    /// `... FETCH FIRST n ROWS ONLY`
    FetchFirst,
}

/// Rendering rules for one target engine
pub trait SqlDialect: Send + Sync {
    fn name(&self) -> &'static str;

    fn quote_identifier(&self, ident: &str) -> String;

    /// Placeholder for the `index`-th bound parameter (1-based)
    fn placeholder(&self, index: usize) -> String;

    fn limit_style(&self) -> LimitStyle;
}

/// SQL Server / Azure SQL
#[derive(Debug, Clone, Copy)]
pub struct MsSql;

impl SqlDialect for MsSql {
    fn name(&self) -> &'static str {
        "mssql"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        format!("[{}]", ident.replace(']', "]]"))
    }

    fn placeholder(&self, index: usize) -> String {
        format!("@p{}", index)
    }

    fn limit_style(&self) -> LimitStyle {
        LimitStyle::Top
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Postgres;

impl SqlDialect for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        quote_double(ident)
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${}", index)
    }

    fn limit_style(&self) -> LimitStyle {
        LimitStyle::Limit
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BigQuery;

impl SqlDialect for BigQuery {
    fn name(&self) -> &'static str {
        "bigquery"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        format!("`{}`", ident.replace('`', "\\`"))
    }

    fn placeholder(&self, index: usize) -> String {
        format!("@p{}", index)
    }

    fn limit_style(&self) -> LimitStyle {
        LimitStyle::Limit
    }
}

/// Generic ANSI SQL with positional placeholders
#[derive(Debug, Clone, Copy)]
pub struct Ansi;

impl SqlDialect for Ansi {
    fn name(&self) -> &'static str {
        "ansi"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        quote_double(ident)
    }

    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn limit_style(&self) -> LimitStyle {
        LimitStyle::FetchFirst
    }
}

fn quote_double(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Rendering rules for a configured dialect
pub fn for_config(dialect: DialectConfig) -> &'static dyn SqlDialect {
    match dialect {
        DialectConfig::MsSql => &MsSql,
        DialectConfig::Postgres => &Postgres,
        DialectConfig::BigQuery => &BigQuery,
        DialectConfig::Ansi => &Ansi,
    }
}
