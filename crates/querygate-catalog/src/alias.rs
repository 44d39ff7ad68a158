//! Alias index: normalized alias token → (dimension, canonical value)
//!
//! Matching is exact after normalization. There is no fuzzy matching and no
//! stemming: "dotnet", ".net" and "c#" are different tokens unless an alias
//! group lists them together.

use querygate_core::{Diagnostic, DiagnosticCode, Location, SchemaCatalog};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::ops::Range;

/// A token of request text with its byte span
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub text: &'a str,
    pub start: usize,
    pub end: usize,
}

fn is_token_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '.' | '#' | '+' | '-' | '_')
}

/// Split text into tokens. Anything that is not a letter, digit or one of
/// `. # + - _` delimits.
pub fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut start = None;

    for (index, c) in text.char_indices() {
        match (is_token_char(c), start) {
            (true, None) => start = Some(index),
            (false, Some(begin)) => {
                tokens.push(Token {
                    text: &text[begin..index],
                    start: begin,
                    end: index,
                });
                start = None;
            }
            _ => {}
        }
    }

    if let Some(begin) = start {
        tokens.push(Token {
            text: &text[begin..],
            start: begin,
            end: text.len(),
        });
    }

    tokens
}

/// Normalize an alias or phrase: lowercase tokens, whitespace runs
/// collapsed to one space, other separators (`/`, `&`, ...) kept as written
pub fn normalize(text: &str) -> String {
    join_tokens(text, &tokenize(text))
}

/// Lowercased `tokens` joined by what separates them in `text`. A gap of
/// only whitespace becomes one space; otherwise its whitespace is dropped.
pub fn join_tokens(text: &str, tokens: &[Token<'_>]) -> String {
    let mut joined = String::new();
    for (position, token) in tokens.iter().enumerate() {
        if position > 0 {
            let gap = &text[tokens[position - 1].end..token.start];
            let before = joined.len();
            joined.extend(gap.chars().filter(|c| !c.is_whitespace()));
            if joined.len() == before {
                joined.push(' ');
            }
        }
        joined.push_str(&token.text.to_lowercase());
    }
    joined
}

/// What an alias resolves to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AliasTarget {
    pub dimension: String,
    pub canonical: String,
}

/// One alias found in request text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AliasMatch {
    pub dimension: String,
    pub canonical: String,

    /// Normalized alias that matched
    pub alias: String,

    /// Byte range in the scanned text
    pub span: Range<usize>,
}

/// Read-only lookup built from a catalog's alias groups
#[derive(Debug, Clone, Default)]
pub struct AliasIndex {
    entries: HashMap<String, AliasTarget>,

    /// Longest alias, in tokens
    max_words: usize,

    warnings: Vec<Diagnostic>,
}

impl AliasIndex {
    /// Build the index. Explicit aliases are registered first, then every
    /// canonical value as an alias of itself.
    pub fn build(catalog: &SchemaCatalog) -> Self {
        let mut index = Self::default();
        let mut ambiguous = HashSet::new();

        for group in catalog.alias_groups() {
            for value in &group.values {
                for alias in &value.aliases {
                    index.register(alias, &group.dimension, &value.canonical, &mut ambiguous);
                }
            }
        }

        for group in catalog.alias_groups() {
            for value in &group.values {
                let implicit = normalize(&value.canonical);
                if !implicit.is_empty() {
                    index.register(&implicit, &group.dimension, &value.canonical, &mut ambiguous);
                }
            }
        }

        tracing::debug!(
            aliases = index.entries.len(),
            max_words = index.max_words,
            ambiguous = ambiguous.len(),
            "Built alias index"
        );

        index
    }

    fn register(
        &mut self,
        alias: &str,
        dimension: &str,
        canonical: &str,
        ambiguous: &mut HashSet<String>,
    ) {
        if let Some(existing) = self.entries.get(alias) {
            // First registered dimension keeps the token
            if existing.dimension != dimension && ambiguous.insert(alias.to_string()) {
                self.warnings.push(
                    Diagnostic::warn(
                        DiagnosticCode::AliasAmbiguous,
                        format!(
                            "Alias '{}' is registered under '{}' and '{}'; using '{}'",
                            alias, existing.dimension, dimension, existing.dimension
                        ),
                    )
                    .with_location(Location::new(format!("alias_groups.{}", dimension))),
                );
            }
            return;
        }

        self.max_words = self.max_words.max(tokenize(alias).len());
        self.entries.insert(
            alias.to_string(),
            AliasTarget {
                dimension: dimension.to_string(),
                canonical: canonical.to_string(),
            },
        );
    }

    /// Exact lookup of one token or phrase
    pub fn resolve(&self, token: &str) -> Option<&AliasTarget> {
        self.entries.get(&normalize(token))
    }

    /// Scan text for every known alias, longest match first, left to right
    pub fn resolve_all(&self, text: &str) -> Vec<AliasMatch> {
        let tokens = tokenize(text);
        let mut matches = Vec::new();

        let mut i = 0;
        'scan: while i < tokens.len() {
            let widest = self.max_words.min(tokens.len() - i);

            for width in (1..=widest).rev() {
                let window = &tokens[i..i + width];
                let phrase = join_tokens(text, window);
                if let Some(found) = self.lookup(&phrase, window) {
                    matches.push(found);
                    i += width;
                    continue 'scan;
                }
            }

            i += 1;
        }

        matches
    }

    fn lookup(&self, phrase: &str, window: &[Token<'_>]) -> Option<AliasMatch> {
        let start = window.first()?.start;
        let end = window.last()?.end;

        if let Some(target) = self.entries.get(phrase) {
            return Some(Self::matched(phrase, target, start..end));
        }

        // Sentence punctuation stuck to the last token
        let trimmed = phrase.trim_end_matches(['.', '-']);
        if trimmed.len() == phrase.len() || trimmed.ends_with(|c: char| !is_token_char(c)) {
            return None;
        }
        let target = self.entries.get(trimmed)?;
        let cut = phrase.len() - trimmed.len();
        Some(Self::matched(trimmed, target, start..end - cut))
    }

    fn matched(alias: &str, target: &AliasTarget, span: Range<usize>) -> AliasMatch {
        AliasMatch {
            dimension: target.dimension.clone(),
            canonical: target.canonical.clone(),
            alias: alias.to_string(),
            span,
        }
    }

    /// Number of registered aliases (implicit canonicals included)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Problems found while building
    pub fn warnings(&self) -> &[Diagnostic] {
        &self.warnings
    }
}
