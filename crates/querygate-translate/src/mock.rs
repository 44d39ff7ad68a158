//! Scripted translator for tests and offline demos
//!
//! Replies are consumed in order; once the script runs out, the last entry
//! repeats. Raw model text can be scripted too, in which case it goes through
//! the same reply parsing as a real backend.
//!
//! ```rust,ignore
//! let slow = MockTranslator::new("local")
//!     .with_latency(500)
//!     .replying_with_intent(QueryIntent::new("ProductUsage"));
//!
//! let broken = MockTranslator::new("remote")
//!     .failing_with(TranslationError::Unreachable("connection refused".into()));
//! ```

use querygate_core::QueryIntent;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::model::interpret_reply;
use crate::translator::{Translation, TranslationError, TranslationRequest, Translator};

#[derive(Debug, Clone)]
enum Scripted {
    Reply(Translation),
    ModelText(String),
    Failure(TranslationError),
}

/// In-memory translator with scripted replies
#[derive(Debug)]
pub struct MockTranslator {
    name: String,
    script: Mutex<Vec<Scripted>>,
    cursor: AtomicUsize,
    calls: AtomicUsize,
    latency_ms: u64,
    min_confidence: f64,
}

impl MockTranslator {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: Mutex::new(Vec::new()),
            cursor: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
            latency_ms: 0,
            min_confidence: 0.7,
        }
    }

    fn push(self, entry: Scripted) -> Self {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
        self
    }

    pub fn replying(self, translation: Translation) -> Self {
        self.push(Scripted::Reply(translation))
    }

    pub fn replying_with_intent(self, intent: QueryIntent) -> Self {
        self.replying(Translation::intent(intent))
    }

    pub fn replying_with_sql(self, sql: impl Into<String>) -> Self {
        self.replying(Translation::draft(sql))
    }

    /// Script raw model output, parsed against the request's catalog
    pub fn replying_with_text(self, text: impl Into<String>) -> Self {
        self.push(Scripted::ModelText(text.into()))
    }

    pub fn failing_with(self, error: TranslationError) -> Self {
        self.push(Scripted::Failure(error))
    }

    /// Delay every call; combine with a short chain timeout to simulate a
    /// hung backend
    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    pub fn with_min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    /// Number of `translate` calls so far, including ones that timed out
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_entry(&self) -> Option<Scripted> {
        let script = self.script.lock().unwrap_or_else(PoisonError::into_inner);
        let last = script.len().checked_sub(1)?;
        let position = self.cursor.fetch_add(1, Ordering::SeqCst).min(last);
        script.get(position).cloned()
    }
}

#[async_trait::async_trait]
impl Translator for MockTranslator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn translate(&self, request: &TranslationRequest) -> Result<Translation, TranslationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.latency_ms)).await;
        }

        match self.next_entry() {
            Some(Scripted::Reply(translation)) => Ok(translation),
            Some(Scripted::ModelText(text)) => {
                interpret_reply(&text, request.catalog(), self.min_confidence)
            }
            Some(Scripted::Failure(error)) => Err(error),
            None => Err(TranslationError::MalformedResponse(format!(
                "mock '{}' has no scripted reply",
                self.name
            ))),
        }
    }
}
