//! Prompt construction and reply interpretation shared by model backends
//!
//! Models are asked for a small JSON document. Replies are untrusted: the
//! first balanced JSON object is extracted from whatever text came back and
//! every table, column and operator it names is checked against the catalog
//! before it becomes an intent.

use querygate_core::{
    Filter, FilterOp, Ordering, ParamValue, QueryIntent, SchemaCatalog, SortDirection,
};
use serde::Deserialize;
use std::time::Duration;

use crate::translator::{Translation, TranslationError};

const INSTRUCTIONS: &str = "\
You translate questions about a reporting database into a structured query.
Use only the tables and columns listed in the schema below.
Answer with a single JSON object and nothing else:
{
  \"table_name\": \"<table>\",
  \"columns\": [\"<column>\", ...],
  \"filters\": [{\"column\": \"<column>\", \"operator\": \"equals|like|greater|less|between\", \"value\": <value>}],
  \"order_by\": {\"column\": \"<column>\", \"direction\": \"asc|desc\"},
  \"limit\": <number>,
  \"confidence\": <0.0 to 1.0>
}
Rules:
- Leave \"columns\" empty to select every column.
- Use \"like\" with % wildcards for partial matches, such as month prefixes \"2025-08%\".
- For \"between\" give \"values\": [low, high] instead of \"value\".
- Use the canonical values listed under alias_groups, not the user's spelling.
- Use \"order_by\" and \"limit\" for top N requests.
- Omit fields you do not need.";

/// Full prompt for one request
pub fn build_prompt(schema_description: &str, question: &str) -> String {
    format!("{}\n\n{}", INSTRUCTIONS, request_block(schema_description, question))
}

/// Schema and question without the instructions
pub fn request_block(schema_description: &str, question: &str) -> String {
    format!("Schema:\n{}\n\nQuestion: {:?}\n", schema_description, question)
}

/// Instruction text alone, for chat-style backends that take a system message
pub fn instructions() -> &'static str {
    INSTRUCTIONS
}

#[derive(Debug, Deserialize)]
struct ModelReply {
    #[serde(default)]
    table_name: Option<String>,

    #[serde(default)]
    columns: Vec<String>,

    #[serde(default)]
    filters: Vec<ReplyFilter>,

    #[serde(default)]
    order_by: Option<ReplyOrder>,

    #[serde(default)]
    limit: Option<u32>,

    #[serde(default)]
    sql: Option<String>,

    #[serde(default)]
    confidence: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ReplyFilter {
    column: String,
    operator: String,

    #[serde(default)]
    value: Option<ParamValue>,

    #[serde(default)]
    values: Option<Vec<ParamValue>>,
}

#[derive(Debug, Deserialize)]
struct ReplyOrder {
    column: String,

    #[serde(default)]
    direction: Option<String>,
}

/// The first balanced `{...}` in `text` that parses as a JSON object
pub fn first_json_object(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();

    for (start, _) in text.match_indices('{') {
        let mut depth = 0usize;
        let mut in_string = false;
        let mut escaped = false;

        for (offset, &byte) in bytes[start..].iter().enumerate() {
            if in_string {
                match byte {
                    _ if escaped => escaped = false,
                    b'\\' => escaped = true,
                    b'"' => in_string = false,
                    _ => {}
                }
                continue;
            }

            match byte {
                b'"' => in_string = true,
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        let candidate = &text[start..=start + offset];
                        if serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(
                            candidate,
                        )
                        .is_ok()
                        {
                            return Some(candidate);
                        }
                        break;
                    }
                }
                _ => {}
            }
        }
    }

    None
}

/// Turn raw model text into a translation, checked against `catalog`
pub fn interpret_reply(
    text: &str,
    catalog: &SchemaCatalog,
    min_confidence: f64,
) -> Result<Translation, TranslationError> {
    let object = first_json_object(text)
        .ok_or_else(|| TranslationError::MalformedResponse("no JSON object in reply".into()))?;
    let reply: ModelReply = serde_json::from_str(object)
        .map_err(|e| TranslationError::MalformedResponse(e.to_string()))?;

    if let Some(confidence) = reply.confidence {
        if confidence < min_confidence {
            return Err(TranslationError::LowConfidence {
                confidence,
                minimum: min_confidence,
            });
        }
    }

    let table = reply
        .table_name
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty());

    let Some(table) = table else {
        return match reply.sql.as_deref().map(str::trim) {
            Some(sql) if !sql.is_empty() => Ok(Translation::draft(sql)),
            _ => Err(TranslationError::MalformedResponse(
                "reply names no table and carries no sql".into(),
            )),
        };
    };

    let descriptor = catalog
        .table(table)
        .ok_or_else(|| TranslationError::SchemaMismatch(format!("unknown table '{}'", table)))?;
    let known = |column: &str| -> Result<(), TranslationError> {
        if descriptor.find_column(column).is_some() {
            Ok(())
        } else {
            Err(TranslationError::SchemaMismatch(format!(
                "unknown column '{}' on {}",
                column, table
            )))
        }
    };

    let mut intent = QueryIntent::new(table);

    let columns: Vec<String> = reply.columns.into_iter().filter(|c| c != "*").collect();
    for column in &columns {
        known(column)?;
    }
    intent.columns = columns;

    for filter in reply.filters {
        known(&filter.column)?;
        let op: FilterOp = filter
            .operator
            .parse()
            .map_err(|e| TranslationError::SchemaMismatch(format!("{}", e)))?;
        let values = match (filter.values, filter.value) {
            (Some(values), _) => values,
            (None, Some(value)) => vec![value],
            (None, None) => Vec::new(),
        };
        intent = intent.with_filter(Filter::new(filter.column, op, values));
    }

    if let Some(order) = reply.order_by {
        known(&order.column)?;
        let direction = match order.direction.as_deref().map(str::to_ascii_lowercase) {
            None => SortDirection::Asc,
            Some(d) if d == "asc" || d == "ascending" => SortDirection::Asc,
            Some(d) if d == "desc" || d == "descending" => SortDirection::Desc,
            Some(other) => {
                return Err(TranslationError::SchemaMismatch(format!(
                    "unknown sort direction '{}'",
                    other
                )))
            }
        };
        intent = intent.with_order(Ordering {
            column: order.column,
            direction,
        });
    }

    intent.limit = reply.limit;

    Ok(Translation::intent(intent))
}

/// Map a transport failure to the translation taxonomy
pub(crate) fn transport_error(error: reqwest::Error, timeout: Duration) -> TranslationError {
    if error.is_timeout() {
        TranslationError::Timeout(timeout)
    } else if error.is_connect() {
        TranslationError::Unreachable(error.to_string())
    } else if error.is_decode() {
        TranslationError::MalformedResponse(error.to_string())
    } else {
        TranslationError::Unreachable(format!("request failed: {}", error))
    }
}

/// Map a non-success HTTP status, keeping a short excerpt of the body
pub(crate) fn rejected(status: reqwest::StatusCode, body: &str) -> TranslationError {
    let message: String = body.chars().take(200).collect();
    TranslationError::Rejected {
        status: status.as_u16(),
        message,
    }
}
