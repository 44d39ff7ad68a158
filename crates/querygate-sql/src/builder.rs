//! QueryIntent → ValidatedStatement
//!
//! Each step is a hard gate. The output is always one `SELECT` over known
//! columns of one known table, with every value bound as a parameter and a
//! row limit no larger than the configured ceiling.

use querygate_core::{
    ColumnDescriptor, DialectConfig, Diagnostic, DiagnosticCode, Filter, FilterOp, LimitConfig,
    LogicalType, ParamValue, QueryIntent, SchemaCatalog, TableDescriptor,
};

use crate::dialect::{self, LimitStyle, SqlDialect};
use crate::error::ValidationError;
use crate::statement::ValidatedStatement;

/// Statement separators and comment openers, rejected in any input value
const FORBIDDEN_SEQUENCES: [&str; 3] = [";", "--", "/*"];

/// First forbidden sequence found in `text`
pub(crate) fn forbidden_sequence(text: &str) -> Option<&'static str> {
    FORBIDDEN_SEQUENCES.iter().copied().find(|s| text.contains(s))
}

/// Builds statements against one catalog snapshot
pub struct SqlBuilder<'a> {
    catalog: &'a SchemaCatalog,
    dialect: DialectConfig,
    limits: LimitConfig,
}

impl<'a> SqlBuilder<'a> {
    pub fn new(catalog: &'a SchemaCatalog, dialect: DialectConfig, limits: LimitConfig) -> Self {
        Self {
            catalog,
            dialect,
            limits,
        }
    }

    pub fn catalog(&self) -> &'a SchemaCatalog {
        self.catalog
    }

    pub fn dialect(&self) -> DialectConfig {
        self.dialect
    }

    /// Validate an intent and render it
    pub fn build(&self, intent: &QueryIntent) -> Result<ValidatedStatement, ValidationError> {
        let table = self
            .catalog
            .table(&intent.table)
            .ok_or_else(|| ValidationError::UnknownTable(intent.table.clone()))?;

        let columns = self.select_list(table, &intent.columns)?;

        let mut filters = Vec::with_capacity(intent.filters.len());
        for filter in &intent.filters {
            filters.push(self.check_filter(table, filter)?);
        }

        if let Some(ordering) = &intent.order_by {
            find_column(table, &ordering.column)?;
        }

        let mut notes = Vec::new();
        let row_limit = self.row_limit(intent.limit, &mut notes)?;

        let rules = dialect::for_config(self.dialect);
        let mut params = Vec::new();
        let sql = render(rules, table, &columns, &filters, intent, row_limit, &mut params);

        tracing::debug!(
            table = %table.name,
            dialect = rules.name(),
            params = params.len(),
            row_limit,
            "Built statement"
        );

        Ok(ValidatedStatement::new(
            sql,
            params,
            self.dialect,
            table.name.clone(),
            columns,
            row_limit,
            notes,
        ))
    }

    fn select_list(
        &self,
        table: &TableDescriptor,
        requested: &[String],
    ) -> Result<Vec<String>, ValidationError> {
        if requested.is_empty() {
            return Ok(table.columns.iter().map(|c| c.name.clone()).collect());
        }

        let mut columns: Vec<String> = Vec::with_capacity(requested.len());
        for name in requested {
            let column = find_column(table, name)?;
            if !columns.contains(&column.name) {
                columns.push(column.name.clone());
            }
        }
        Ok(columns)
    }

    fn check_filter(
        &self,
        table: &TableDescriptor,
        filter: &Filter,
    ) -> Result<Filter, ValidationError> {
        let column = find_column(table, &filter.column)?;
        let malformed = |reason: String| ValidationError::MalformedFilter {
            column: filter.column.clone(),
            reason,
        };

        if filter.values.len() != filter.op.arity() {
            return Err(malformed(format!(
                "'{}' takes {} value(s), got {}",
                filter.op,
                filter.op.arity(),
                filter.values.len()
            )));
        }

        for value in &filter.values {
            if let Some(sequence) = value.as_text().and_then(forbidden_sequence) {
                return Err(ValidationError::MultiStatementRejected(format!(
                    "filter value on '{}' contains '{}'",
                    filter.column, sequence
                )));
            }
        }

        let mut values = Vec::with_capacity(filter.values.len());
        for value in &filter.values {
            values.push(coerce(column, filter.op, value).map_err(&malformed)?);
        }

        Ok(Filter::new(column.name.clone(), filter.op, values))
    }

    fn row_limit(
        &self,
        requested: Option<u32>,
        notes: &mut Vec<Diagnostic>,
    ) -> Result<u32, ValidationError> {
        let max = self.limits.max_rows;

        match requested {
            None => Ok(self.limits.effective_default()),
            Some(0) => Err(ValidationError::InvalidRowLimit(
                "row limit must be at least 1".to_string(),
            )),
            Some(n) if n > max => {
                if self.limits.reject_excess_limit {
                    return Err(ValidationError::RowLimitExceeded {
                        requested: u64::from(n),
                        max,
                    });
                }
                notes.push(
                    Diagnostic::warn(
                        DiagnosticCode::RowLimitClamped,
                        format!("Row limit {} lowered to {}", n, max),
                    )
                    .with_comparison(format!("<= {}", max), n.to_string()),
                );
                Ok(max)
            }
            Some(n) => Ok(n),
        }
    }
}

fn find_column<'t>(
    table: &'t TableDescriptor,
    name: &str,
) -> Result<&'t ColumnDescriptor, ValidationError> {
    table
        .find_column(name)
        .ok_or_else(|| ValidationError::UnknownColumn {
            table: table.name.clone(),
            column: name.to_string(),
        })
}

/// Check a value against the operator and the column's logical type
fn coerce(
    column: &ColumnDescriptor,
    op: FilterOp,
    value: &ParamValue,
) -> Result<ParamValue, String> {
    if op == FilterOp::Like {
        return match value {
            ParamValue::Text(_) => Ok(value.clone()),
            other => Err(format!("'like' needs a text pattern, got {}", other)),
        };
    }

    if !column.logical_type.is_numeric() {
        return Ok(value.clone());
    }

    match value {
        ParamValue::Integer(_) | ParamValue::Float(_) => Ok(value.clone()),
        ParamValue::Text(text) => {
            let text = text.trim();
            if let Ok(i) = text.parse::<i64>() {
                Ok(ParamValue::Integer(i))
            } else if let Some(x) = text.parse::<f64>().ok().filter(|x| x.is_finite()) {
                if column.logical_type == LogicalType::Int {
                    Err(format!("'{}' is not an integer", text))
                } else {
                    Ok(ParamValue::Float(x))
                }
            } else {
                Err(format!(
                    "'{}' is not a number ({} column)",
                    text, column.logical_type
                ))
            }
        }
        ParamValue::Bool(_) => Err(format!("boolean value on {} column", column.logical_type)),
    }
}

fn render(
    rules: &dyn SqlDialect,
    table: &TableDescriptor,
    columns: &[String],
    filters: &[Filter],
    intent: &QueryIntent,
    row_limit: u32,
    params: &mut Vec<ParamValue>,
) -> String {
    let mut sql = String::from("SELECT ");

    if rules.limit_style() == LimitStyle::Top {
        sql.push_str(&format!("TOP ({}) ", row_limit));
    }

    let select_list: Vec<String> = columns.iter().map(|c| rules.quote_identifier(c)).collect();
    sql.push_str(&select_list.join(", "));
    sql.push_str(" FROM ");
    sql.push_str(&rules.quote_identifier(&table.name));

    if !filters.is_empty() {
        let predicates: Vec<String> = filters
            .iter()
            .map(|filter| predicate(rules, filter, params))
            .collect();
        sql.push_str(" WHERE ");
        sql.push_str(&predicates.join(" AND "));
    }

    if let Some(ordering) = &intent.order_by {
        sql.push_str(&format!(
            " ORDER BY {} {}",
            rules.quote_identifier(&ordering.column),
            ordering.direction.as_sql()
        ));
    }

    match rules.limit_style() {
        LimitStyle::Top => {}
        LimitStyle::Limit => sql.push_str(&format!(" LIMIT {}", row_limit)),
        LimitStyle::FetchFirst => sql.push_str(&format!(" FETCH FIRST {} ROWS ONLY", row_limit)),
    }

    sql
}

fn predicate(rules: &dyn SqlDialect, filter: &Filter, params: &mut Vec<ParamValue>) -> String {
    let column = rules.quote_identifier(&filter.column);
    let mut bind = |value: &ParamValue| {
        params.push(value.clone());
        rules.placeholder(params.len())
    };

    match filter.op {
        FilterOp::Equals => format!("{} = {}", column, bind(&filter.values[0])),
        FilterOp::Like => format!("{} LIKE {}", column, bind(&filter.values[0])),
        FilterOp::Greater => format!("{} > {}", column, bind(&filter.values[0])),
        FilterOp::Less => format!("{} < {}", column, bind(&filter.values[0])),
        FilterOp::Between => {
            let low = bind(&filter.values[0]);
            let high = bind(&filter.values[1]);
            format!("{} BETWEEN {} AND {}", column, low, high)
        }
    }
}
