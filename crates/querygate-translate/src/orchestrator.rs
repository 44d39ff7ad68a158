//! Fallback chain across translators
//!
//! Backends are tried strictly in order, one at a time. The first success
//! ends the run; nothing is merged across backends. The terminal translator
//! (normally the rule-based extractor) is always tried last and runs without
//! a timeout. Callers may pass a check that every non-terminal backend's
//! output must pass; a rejected output counts as that backend's failure.

use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::translator::{Translation, TranslationError, TranslationRequest, Translator};

/// States visited during one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "backend", rename_all = "snake_case")]
pub enum ChainState {
    NotStarted,
    TryingBackend(usize),
    Succeeded,
    ExhaustedAllBackends,
}

/// What happened when one backend was tried
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    Succeeded,
    Failed(TranslationError),
}

/// One backend's attempt within a run
#[derive(Debug, Clone, PartialEq)]
pub struct Attempt {
    pub backend: String,
    pub outcome: AttemptOutcome,
    pub elapsed: Duration,
}

impl Attempt {
    /// Failure reason, if the attempt failed
    pub fn reason(&self) -> Option<String> {
        match &self.outcome {
            AttemptOutcome::Succeeded => None,
            AttemptOutcome::Failed(error) => Some(error.to_string()),
        }
    }

    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, AttemptOutcome::Succeeded)
    }
}

/// A run that produced a translation
#[derive(Debug, Clone)]
pub struct ChainSuccess<T = ()> {
    /// Name of the backend whose result was used
    pub backend: String,
    pub translation: Translation,
    /// Value produced by the output check; `None` when the terminal
    /// translator answered, whose output is not checked
    pub accepted: Option<T>,
    pub attempts: Vec<Attempt>,
    pub trace: Vec<ChainState>,
}

/// Every backend failed
#[derive(Debug, Clone, thiserror::Error)]
#[error("All translation backends failed: {}", summarize(.attempts))]
pub struct TranslationFailure {
    pub attempts: Vec<Attempt>,
    pub trace: Vec<ChainState>,
}

impl TranslationFailure {
    /// `(backend, reason)` for every attempt, in chain order
    pub fn reasons(&self) -> Vec<(String, String)> {
        self.attempts
            .iter()
            .filter_map(|a| a.reason().map(|r| (a.backend.clone(), r)))
            .collect()
    }
}

fn summarize(attempts: &[Attempt]) -> String {
    attempts
        .iter()
        .filter_map(|a| a.reason().map(|r| format!("{}: {}", a.backend, r)))
        .collect::<Vec<_>>()
        .join("; ")
}

struct Stage {
    translator: Arc<dyn Translator>,
    timeout: Option<Duration>,
}

/// Ordered translators ending in a terminal one
pub struct TranslationChain {
    backends: Vec<Stage>,
    terminal: Stage,
    redact_text: bool,
}

impl TranslationChain {
    /// Chain with only the terminal translator
    pub fn new(terminal: Arc<dyn Translator>) -> Self {
        Self {
            backends: Vec::new(),
            terminal: Stage {
                translator: terminal,
                timeout: None,
            },
            redact_text: false,
        }
    }

    /// Append a backend ahead of the terminal translator
    pub fn with_backend(mut self, translator: Arc<dyn Translator>, timeout: Duration) -> Self {
        self.backends.push(Stage {
            translator,
            timeout: Some(timeout),
        });
        self
    }

    /// Log request text as its length only
    pub fn with_redaction(mut self, redact: bool) -> Self {
        self.redact_text = redact;
        self
    }

    /// Backend names in the order they are tried
    pub fn backend_names(&self) -> Vec<&str> {
        self.stages().map(|s| s.translator.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.backends.len() + 1
    }

    /// Always false; the terminal translator is always present
    pub fn is_empty(&self) -> bool {
        false
    }

    fn stages(&self) -> impl Iterator<Item = &Stage> {
        self.backends.iter().chain(std::iter::once(&self.terminal))
    }

    pub async fn run(&self, request: &TranslationRequest) -> Result<ChainSuccess, TranslationFailure> {
        self.run_checked(request, |_| Ok(())).await
    }

    /// Like [`run`](Self::run), but a non-terminal backend only succeeds when
    /// `check` accepts its output. The terminal translator's output is
    /// returned unchecked.
    pub async fn run_checked<T, F>(
        &self,
        request: &TranslationRequest,
        check: F,
    ) -> Result<ChainSuccess<T>, TranslationFailure>
    where
        F: Fn(&Translation) -> Result<T, TranslationError>,
    {
        if self.redact_text {
            tracing::debug!(text_len = request.text().len(), "Translating request");
        } else {
            tracing::debug!(text = %request.text(), "Translating request");
        }

        let mut trace = vec![ChainState::NotStarted];
        let mut attempts = Vec::with_capacity(self.len());
        let terminal_position = self.backends.len();

        for (position, stage) in self.stages().enumerate() {
            trace.push(ChainState::TryingBackend(position));
            let backend = stage.translator.name().to_string();
            let started = Instant::now();

            let result = match stage.timeout {
                Some(limit) => {
                    match tokio::time::timeout(limit, stage.translator.translate(request)).await {
                        Ok(result) => result,
                        Err(_) => Err(TranslationError::Timeout(limit)),
                    }
                }
                None => stage.translator.translate(request).await,
            };
            let result = result.and_then(|translation| {
                if position == terminal_position {
                    return Ok((translation, None));
                }
                let accepted = check(&translation)?;
                Ok((translation, Some(accepted)))
            });
            let elapsed = started.elapsed();

            match result {
                Ok((translation, accepted)) => {
                    tracing::debug!(
                        backend = %backend,
                        position,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "Backend succeeded"
                    );
                    attempts.push(Attempt {
                        backend: backend.clone(),
                        outcome: AttemptOutcome::Succeeded,
                        elapsed,
                    });
                    trace.push(ChainState::Succeeded);
                    return Ok(ChainSuccess {
                        backend,
                        translation,
                        accepted,
                        attempts,
                        trace,
                    });
                }
                Err(error) => {
                    tracing::warn!(
                        backend = %backend,
                        position,
                        elapsed_ms = elapsed.as_millis() as u64,
                        error = %error,
                        "Backend failed, falling back"
                    );
                    attempts.push(Attempt {
                        backend,
                        outcome: AttemptOutcome::Failed(error),
                        elapsed,
                    });
                }
            }
        }

        trace.push(ChainState::ExhaustedAllBackends);
        Err(TranslationFailure { attempts, trace })
    }
}
