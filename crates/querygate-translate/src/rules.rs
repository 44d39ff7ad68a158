//! Rule-based intent extraction
//!
//! Deterministic keyword and pattern matching. The same text, catalog and
//! processing date always yield the same intent. Only text matched by a rule
//! contributes; everything else is discarded.
//!
//! This is the terminal link of every translation chain, so it has no
//! network dependency and no timeout.

use chrono::{Local, Months, NaiveDate};
use querygate_catalog::{join_tokens, normalize, tokenize, AliasIndex, AliasMatch, Token};
use querygate_core::{
    Diagnostic, DiagnosticCode, Filter, Location, Ordering, QueryIntent, SchemaCatalog,
    SortDirection, TableDescriptor,
};
use regex::Regex;
use std::sync::OnceLock;

use crate::translator::{
    Translation, TranslationError, TranslationRequest, Translator, UnresolvedIntentError,
};

/// Location source used for spans into the request text
const REQUEST: &str = "request";

/// Which month a time expression selects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MonthRule {
    /// Months back from the processing date
    Relative(u32),
    Explicit { year: i32, month: u32 },
}

#[derive(Debug, Clone, Copy)]
struct TimeMatch {
    rule: MonthRule,
    start: usize,
    end: usize,
}

#[derive(Debug, Clone, Copy)]
struct QuantityMatch {
    direction: SortDirection,
    limit: Option<u32>,
}

fn time_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?:(?P<this>this|current)|(?P<last>last|previous))\s+month\b|\b(?P<year>\d{4})-(?P<month>\d{2})\b",
        )
        .expect("time pattern is valid")
    })
}

fn quantity_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?:top\s+(?P<top>\d+)|bottom\s+(?P<bottom>\d+)|(?P<desc>most|highest|total|largest)|(?P<asc>least|fewest|lowest|smallest))\b",
        )
        .expect("quantity pattern is valid")
    })
}

fn find_time_expressions(text: &str) -> Vec<TimeMatch> {
    time_pattern()
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let rule = if caps.name("this").is_some() {
                MonthRule::Relative(0)
            } else if caps.name("last").is_some() {
                MonthRule::Relative(1)
            } else {
                let year = caps.name("year")?.as_str().parse().ok()?;
                let month = caps.name("month")?.as_str().parse().ok()?;
                if !(1..=12).contains(&month) {
                    return None;
                }
                MonthRule::Explicit { year, month }
            };
            Some(TimeMatch {
                rule,
                start: whole.start(),
                end: whole.end(),
            })
        })
        .collect()
}

fn find_quantity_expressions(text: &str) -> Vec<QuantityMatch> {
    quantity_pattern()
        .captures_iter(text)
        .map(|caps| {
            if let Some(n) = caps.name("top") {
                QuantityMatch {
                    direction: SortDirection::Desc,
                    limit: n.as_str().parse().ok(),
                }
            } else if let Some(n) = caps.name("bottom") {
                QuantityMatch {
                    direction: SortDirection::Asc,
                    limit: n.as_str().parse().ok(),
                }
            } else if caps.name("asc").is_some() {
                QuantityMatch {
                    direction: SortDirection::Asc,
                    limit: None,
                }
            } else {
                QuantityMatch {
                    direction: SortDirection::Desc,
                    limit: None,
                }
            }
        })
        .collect()
}

fn month_prefix(rule: MonthRule, today: NaiveDate) -> String {
    match rule {
        MonthRule::Relative(back) => today
            .checked_sub_months(Months::new(back))
            .unwrap_or(today)
            .format("%Y-%m")
            .to_string(),
        MonthRule::Explicit { year, month } => format!("{:04}-{:02}", year, month),
    }
}

/// Whether some run of request tokens, joined as `normalize` joins them,
/// spells `phrase`. A trailing sentence dot on the run is ignored.
fn contains_phrase(text: &str, tokens: &[Token<'_>], phrase: &str) -> bool {
    let width = tokenize(phrase).len();
    if width == 0 || width > tokens.len() {
        return false;
    }
    tokens.windows(width).any(|window| {
        let joined = join_tokens(text, window);
        joined == phrase || joined.trim_end_matches('.') == phrase
    })
}

fn names_table(text: &str, tokens: &[Token<'_>], table: &TableDescriptor) -> bool {
    contains_phrase(text, tokens, &normalize(&table.name))
        || table
            .keywords
            .iter()
            .any(|k| contains_phrase(text, tokens, &normalize(k)))
}

/// Table selection: named table, then the first alias match's table, then
/// the default table when some time or quantity rule fired
fn select_table<'c>(
    text: &str,
    catalog: &'c SchemaCatalog,
    matches: &[AliasMatch],
    rule_matched: bool,
) -> Option<&'c TableDescriptor> {
    let tokens = tokenize(text);
    if let Some(table) = catalog.tables().iter().find(|t| names_table(text, &tokens, t)) {
        return Some(table);
    }

    if let Some(first) = matches.first() {
        if let Some(table) = catalog.tables_for_dimension(&first.dimension).into_iter().next() {
            return Some(table);
        }
    }

    if rule_matched {
        return catalog.default_table().and_then(|name| catalog.table(name));
    }

    None
}

/// An extracted intent and what was dropped along the way
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub intent: QueryIntent,
    pub warnings: Vec<Diagnostic>,
}

/// Extract a structured intent from request text
///
/// `today` anchors relative month expressions.
pub fn extract(
    text: &str,
    catalog: &SchemaCatalog,
    index: &AliasIndex,
    today: NaiveDate,
) -> Result<Extraction, UnresolvedIntentError> {
    let matches = index.resolve_all(text);
    let times = find_time_expressions(text);
    let quantities = find_quantity_expressions(text);

    let table = select_table(
        text,
        catalog,
        &matches,
        !times.is_empty() || !quantities.is_empty(),
    )
    .ok_or_else(|| UnresolvedIntentError::new("no table, alias or known phrase in the request"))?;

    let mut intent = QueryIntent::new(&table.name);
    let mut warnings = Vec::new();

    // Alias filters, first value per dimension wins
    let mut chosen: Vec<(&str, &str)> = Vec::new();
    for found in &matches {
        let location = Location::with_span(REQUEST, found.span.start, found.span.end);

        let Some(column) = catalog.column_for_dimension(&table.name, &found.dimension) else {
            warnings.push(
                Diagnostic::warn(
                    DiagnosticCode::DimensionNotOnTable,
                    format!(
                        "'{}' ({}) does not apply to table {}",
                        found.alias, found.dimension, table.name
                    ),
                )
                .with_location(location),
            );
            continue;
        };

        if let Some((_, kept)) = chosen.iter().find(|(d, _)| *d == found.dimension) {
            if *kept != found.canonical {
                warnings.push(
                    Diagnostic::warn(
                        DiagnosticCode::FilterConflict,
                        format!(
                            "Request names more than one {}; keeping '{}'",
                            found.dimension, kept
                        ),
                    )
                    .with_location(location)
                    .with_comparison(*kept, found.canonical.as_str()),
                );
            }
            continue;
        }

        chosen.push((found.dimension.as_str(), found.canonical.as_str()));
        intent = intent.with_filter(Filter::like(column, format!("%{}%", found.canonical)));
    }

    // Time window
    if let Some((first, rest)) = times.split_first() {
        match &table.time_column {
            Some(column) => {
                let prefix = month_prefix(first.rule, today);
                intent = intent.with_filter(Filter::like(column, format!("{}%", prefix)));
            }
            None => warnings.push(
                Diagnostic::warn(
                    DiagnosticCode::TimeExpressionIgnored,
                    format!("Table {} has no time column", table.name),
                )
                .with_location(Location::with_span(REQUEST, first.start, first.end)),
            ),
        }

        for later in rest {
            warnings.push(
                Diagnostic::warn(
                    DiagnosticCode::TimeExpressionIgnored,
                    format!(
                        "Only the first time expression is used; ignoring '{}'",
                        &text[later.start..later.end]
                    ),
                )
                .with_location(Location::with_span(REQUEST, later.start, later.end)),
            );
        }
    }

    // Ranking and row count
    if let Some(first) = quantities.first() {
        match &table.measure_column {
            Some(column) => {
                intent = intent.with_order(match first.direction {
                    SortDirection::Asc => Ordering::asc(column),
                    SortDirection::Desc => Ordering::desc(column),
                });
            }
            None => warnings.push(Diagnostic::warn(
                DiagnosticCode::Warning,
                format!("Table {} has no measure column; ranking ignored", table.name),
            )),
        }
    }
    if let Some(limit) = quantities.iter().find_map(|q| q.limit) {
        intent = intent.with_limit(limit);
    }

    tracing::debug!(
        table = %intent.table,
        filters = intent.filters.len(),
        ordered = intent.order_by.is_some(),
        limit = ?intent.limit,
        warnings = warnings.len(),
        "Rule-based extraction"
    );

    Ok(Extraction { intent, warnings })
}

/// Terminal translator backed by [`extract`]
#[derive(Debug, Clone, Default)]
pub struct RuleBasedTranslator {
    today: Option<NaiveDate>,
}

impl RuleBasedTranslator {
    pub const NAME: &'static str = "rules";

    /// Uses the local date at the time of each request
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the processing date
    pub fn with_today(today: NaiveDate) -> Self {
        Self { today: Some(today) }
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }
}

#[async_trait::async_trait]
impl Translator for RuleBasedTranslator {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn translate(&self, request: &TranslationRequest) -> Result<Translation, TranslationError> {
        let extraction = extract(
            request.text(),
            request.catalog(),
            request.index(),
            self.today(),
        )?;
        Ok(Translation::intent(extraction.intent).with_warnings(extraction.warnings))
    }
}
