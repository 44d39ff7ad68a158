//! Natural-language translation
//!
//! This crate handles:
//! - The `Translator` capability and its error taxonomy
//! - Deterministic rule-based extraction over the alias index
//! - Local and remote model backends plus a scripted mock
//! - The sequential fallback chain with per-backend timeouts

pub mod local;
pub mod mock;
pub mod model;
pub mod orchestrator;
pub mod remote;
pub mod rules;
pub mod translator;

pub use local::LocalTranslator;
pub use mock::MockTranslator;
pub use orchestrator::{
    Attempt, AttemptOutcome, ChainState, ChainSuccess, TranslationChain, TranslationFailure,
};
pub use remote::RemoteTranslator;
pub use rules::{extract, Extraction, RuleBasedTranslator};
pub use translator::{
    Translation, TranslationError, TranslationOutput, TranslationRequest, Translator,
    UnresolvedIntentError,
};

use querygate_core::{BackendConfig, BackendKind};
use std::sync::Arc;

/// Build the translator a backend entry describes
pub fn translator_from_config(
    config: &BackendConfig,
) -> Result<Arc<dyn Translator>, TranslationError> {
    let translator: Arc<dyn Translator> = match config.kind {
        BackendKind::Local => Arc::new(LocalTranslator::from_config(config)?),
        BackendKind::Remote => Arc::new(RemoteTranslator::from_config(config)?),
    };
    Ok(translator)
}
