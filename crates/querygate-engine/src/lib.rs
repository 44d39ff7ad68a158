//! querygate engine - service facade
//!
//! This crate wires the pieces together:
//! - Process-wide catalog snapshot with atomic reload
//! - Translation chain ending in the rule-based extractor
//! - Statement building and draft validation per request
//! - The executor contract statements are handed to

pub mod error;
pub mod executor;
pub mod service;

pub use error::{QueryError, ServiceError};
pub use executor::{ExecutionError, QueryExecutor, ResultSet};
pub use service::{ExecutionOutcome, QueryService, TranslationOutcome};
