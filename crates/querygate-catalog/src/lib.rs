//! Schema catalog loading and alias lookup
//!
//! Turns a declarative schema source (JSON or TOML) into an immutable
//! [`querygate_core::SchemaCatalog`], builds the [`AliasIndex`] used to spot
//! dimension values in request text, and keeps the process-wide snapshot that
//! reloads swap.
//!
//! ## Example
//!
//! ```rust,ignore
//! use querygate_catalog::{load_file, CatalogHandle};
//!
//! let handle = CatalogHandle::new(load_file("schema.json".as_ref())?);
//! let snapshot = handle.snapshot();
//! let matches = snapshot.index().resolve_all("js usage last month");
//! ```

pub mod alias;
pub mod loader;
pub mod snapshot;
pub mod source;

pub use alias::{join_tokens, normalize, tokenize, AliasIndex, AliasMatch, AliasTarget, Token};
pub use loader::{load, load_file, load_str, SchemaLoadError};
pub use snapshot::{CatalogHandle, CatalogSnapshot};
pub use source::{SchemaSource, SourceFormat};
