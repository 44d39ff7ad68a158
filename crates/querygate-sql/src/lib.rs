//! SQL construction and draft validation
//!
//! This crate handles:
//! - Rendering a checked `QueryIntent` as one parameterized SELECT per dialect
//! - Parsing model-proposed drafts with datafusion-sqlparser-rs
//! - Re-deriving drafts into intents so nothing runs verbatim
//! - Mapping every rejection to a stable diagnostic code

pub mod builder;
pub mod dialect;
pub mod draft;
pub mod error;
pub mod parser;
pub mod statement;

pub use builder::SqlBuilder;
pub use dialect::{LimitStyle, SqlDialect};
pub use draft::{DeclaredShape, DraftValidator};
pub use error::ValidationError;
pub use parser::{ParseError, ParsedSql, SqlParser};
pub use statement::ValidatedStatement;
