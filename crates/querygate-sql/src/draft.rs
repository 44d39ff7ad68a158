//! Model-proposed SQL → QueryIntent → ValidatedStatement
//!
//! A draft is never executed as written. It is parsed, walked against a small
//! accepted subset (one table, plain columns, `col op literal` predicates
//! joined by AND, one ORDER BY key, a literal row limit) and turned back into
//! a [`QueryIntent`] that goes through [`SqlBuilder::build`] like any other.

use querygate_core::{Filter, FilterOp, Ordering, ParamValue, QueryIntent};
use sqlparser::ast::{
    BinaryOperator, Expr, GroupByExpr, Ident, ObjectName, Query, Select, SelectItem, SetExpr,
    Statement, TableFactor, TopQuantity, UnaryOperator, Value, WildcardAdditionalOptions,
};

use crate::builder::{forbidden_sequence, SqlBuilder};
use crate::error::ValidationError;
use crate::parser::SqlParser;
use crate::statement::ValidatedStatement;

/// What a caller says its draft reads
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeclaredShape {
    pub table: String,

    /// Empty means every column of `table`
    pub columns: Vec<String>,
}

impl DeclaredShape {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
        }
    }

    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }
}

/// Validates SQL drafts against the builder's catalog
pub struct DraftValidator<'a> {
    builder: SqlBuilder<'a>,
    parser: SqlParser,
}

impl<'a> DraftValidator<'a> {
    pub fn new(builder: SqlBuilder<'a>) -> Self {
        let parser = SqlParser::from_dialect(builder.dialect());
        Self { builder, parser }
    }

    pub fn builder(&self) -> &SqlBuilder<'a> {
        &self.builder
    }

    /// Re-derive a draft and build it
    pub fn validate_draft(&self, sql: &str) -> Result<ValidatedStatement, ValidationError> {
        let intent = self.to_intent(sql)?;
        self.builder.build(&intent)
    }

    /// Validate a draft against what the caller declared it reads
    pub fn validate(
        &self,
        sql: &str,
        declared: &DeclaredShape,
    ) -> Result<ValidatedStatement, ValidationError> {
        let catalog = self.builder.catalog();
        let table = catalog
            .table(&declared.table)
            .ok_or_else(|| ValidationError::UnknownTable(declared.table.clone()))?;
        for column in &declared.columns {
            if table.find_column(column).is_none() {
                return Err(ValidationError::UnknownColumn {
                    table: declared.table.clone(),
                    column: column.clone(),
                });
            }
        }

        let intent = self.to_intent(sql)?;

        if intent.table != declared.table {
            return Err(ValidationError::DeclarationMismatch(format!(
                "draft reads '{}', declared '{}'",
                intent.table, declared.table
            )));
        }

        if !declared.columns.is_empty() {
            if intent.columns.is_empty() {
                return Err(ValidationError::DeclarationMismatch(
                    "draft selects every column, declared a subset".to_string(),
                ));
            }

            let referenced = intent
                .columns
                .iter()
                .chain(intent.filters.iter().map(|f| &f.column))
                .chain(intent.order_by.iter().map(|o| &o.column));
            for column in referenced {
                if !declared.columns.contains(column) {
                    return Err(ValidationError::DeclarationMismatch(format!(
                        "draft references undeclared column '{}'",
                        column
                    )));
                }
            }
        }

        self.builder.build(&intent)
    }

    /// Turn a draft back into an intent, rejecting anything outside the
    /// accepted subset
    pub fn to_intent(&self, sql: &str) -> Result<QueryIntent, ValidationError> {
        if let Some(sequence) = forbidden_sequence(sql) {
            return Err(ValidationError::MultiStatementRejected(format!(
                "draft contains '{}'",
                sequence
            )));
        }

        let parsed = self
            .parser
            .parse(sql)
            .map_err(|e| ValidationError::Unparseable(e.error.to_string()))?;

        let statement = match parsed.statements.as_slice() {
            [] => return Err(ValidationError::Unparseable("empty draft".to_string())),
            [statement] => statement,
            _ => {
                return Err(ValidationError::MultiStatementRejected(format!(
                    "{} statements",
                    parsed.statement_count()
                )))
            }
        };

        let query = match statement {
            Statement::Query(query) => query,
            other => return Err(ValidationError::NotReadOnly(statement_kind(other))),
        };

        let intent = query_to_intent(query)?;
        tracing::debug!(table = %intent.table, filters = intent.filters.len(), "Re-derived draft");
        Ok(intent)
    }
}

fn statement_kind(statement: &Statement) -> String {
    let text = statement.to_string();
    text.split_whitespace()
        .next()
        .unwrap_or("statement")
        .to_ascii_uppercase()
}

fn unsupported(what: impl Into<String>) -> ValidationError {
    ValidationError::UnsupportedSyntax(what.into())
}

fn query_to_intent(query: &Query) -> Result<QueryIntent, ValidationError> {
    if query.with.is_some() {
        return Err(unsupported("WITH"));
    }
    if query.offset.is_some() {
        return Err(unsupported("OFFSET"));
    }
    if !query.limit_by.is_empty() {
        return Err(unsupported("LIMIT BY"));
    }
    if !query.locks.is_empty() {
        return Err(unsupported("locking clause"));
    }
    if query.for_clause.is_some() {
        return Err(unsupported("FOR clause"));
    }
    if query.settings.is_some() || query.format_clause.is_some() {
        return Err(unsupported("SETTINGS/FORMAT"));
    }

    let select = match query.body.as_ref() {
        SetExpr::Select(select) => select.as_ref(),
        SetExpr::SetOperation { op, .. } => return Err(unsupported(format!("set operation {}", op))),
        SetExpr::Query(_) => return Err(unsupported("nested query")),
        _ => return Err(unsupported("query body")),
    };

    let (table, qualifiers) = source_table(select)?;
    let mut intent = QueryIntent::new(table);

    intent.columns = projection(select, &qualifiers)?;

    if let Some(selection) = &select.selection {
        let mut predicates = Vec::new();
        conjuncts(selection, &mut predicates);
        for predicate in predicates {
            intent.filters.push(filter(predicate, &qualifiers)?);
        }
    }

    if let Some(order_by) = &query.order_by {
        if order_by.interpolate.is_some() {
            return Err(unsupported("INTERPOLATE"));
        }
        match order_by.exprs.as_slice() {
            [] => {}
            [key] => {
                if key.nulls_first.is_some() {
                    return Err(unsupported("NULLS FIRST/LAST"));
                }
                if key.with_fill.is_some() {
                    return Err(unsupported("WITH FILL"));
                }
                let column = column_name(&key.expr, &qualifiers)?;
                intent.order_by = Some(match key.asc {
                    Some(false) => Ordering::desc(column),
                    _ => Ordering::asc(column),
                });
            }
            _ => return Err(unsupported("more than one ORDER BY key")),
        }
    }

    intent.limit = row_limit(select, query)?;
    Ok(intent)
}

/// The single table read, plus the names columns may be qualified with
fn source_table(select: &Select) -> Result<(String, Vec<String>), ValidationError> {
    if select.distinct.is_some() {
        return Err(unsupported("DISTINCT"));
    }
    if select.into.is_some() {
        return Err(unsupported("INTO"));
    }
    if select.having.is_some() {
        return Err(unsupported("HAVING"));
    }
    if select.qualify.is_some() || select.prewhere.is_some() {
        return Err(unsupported("QUALIFY/PREWHERE"));
    }
    match &select.group_by {
        GroupByExpr::Expressions(exprs, modifiers)
            if exprs.is_empty() && modifiers.is_empty() => {}
        _ => return Err(unsupported("GROUP BY")),
    }
    if !select.cluster_by.is_empty()
        || !select.distribute_by.is_empty()
        || !select.sort_by.is_empty()
    {
        return Err(unsupported("CLUSTER/DISTRIBUTE/SORT BY"));
    }
    if !select.lateral_views.is_empty() {
        return Err(unsupported("LATERAL VIEW"));
    }
    if !select.named_window.is_empty() {
        return Err(unsupported("WINDOW"));
    }
    if select.connect_by.is_some() {
        return Err(unsupported("CONNECT BY"));
    }
    if select.value_table_mode.is_some() {
        return Err(unsupported("SELECT AS STRUCT/VALUE"));
    }

    let from = match select.from.as_slice() {
        [from] => from,
        [] => return Err(unsupported("missing FROM")),
        _ => return Err(unsupported("more than one table")),
    };
    if !from.joins.is_empty() {
        return Err(unsupported("JOIN"));
    }

    match &from.relation {
        TableFactor::Table {
            name,
            alias,
            args,
            with_hints,
            version,
            with_ordinality,
            partitions,
            json_path,
        } => {
            if args.is_some() || *with_ordinality {
                return Err(unsupported("table function"));
            }
            if !with_hints.is_empty() {
                return Err(unsupported("table hints"));
            }
            if version.is_some() {
                return Err(unsupported("time travel"));
            }
            if !partitions.is_empty() {
                return Err(unsupported("PARTITION"));
            }
            if json_path.is_some() {
                return Err(unsupported("JSON path"));
            }
            if alias.as_ref().is_some_and(|a| !a.columns.is_empty()) {
                return Err(unsupported("column aliases on table"));
            }
            let table = last_part(name)?;
            let mut qualifiers = vec![table.clone()];
            if let Some(alias) = alias {
                qualifiers.push(alias.name.value.clone());
            }
            Ok((table, qualifiers))
        }
        TableFactor::Derived { .. } => Err(unsupported("subquery")),
        _ => Err(unsupported("table expression")),
    }
}

/// Schema qualifiers are dropped; only the table name is checked
fn last_part(name: &ObjectName) -> Result<String, ValidationError> {
    name.0
        .last()
        .map(|ident| ident.value.clone())
        .ok_or_else(|| unsupported("empty table name"))
}

fn projection(select: &Select, qualifiers: &[String]) -> Result<Vec<String>, ValidationError> {
    match select.projection.as_slice() {
        [SelectItem::Wildcard(options)] => {
            plain_wildcard(options)?;
            return Ok(Vec::new());
        }
        [SelectItem::QualifiedWildcard(prefix, options)] => {
            match prefix.0.as_slice() {
                [qualifier] if is_qualifier(qualifier, qualifiers) => {}
                _ => return Err(unsupported(format!("wildcard qualifier {}", prefix))),
            }
            plain_wildcard(options)?;
            return Ok(Vec::new());
        }
        _ => {}
    }

    select
        .projection
        .iter()
        .map(|item| match item {
            SelectItem::UnnamedExpr(expr) => column_name(expr, qualifiers)
                .map_err(|_| unsupported(format!("expression in projection: {}", expr))),
            SelectItem::ExprWithAlias { alias, .. } => {
                Err(unsupported(format!("column alias '{}'", alias.value)))
            }
            _ => Err(unsupported("wildcard mixed with columns")),
        })
        .collect()
}

/// `*` without EXCLUDE/EXCEPT/REPLACE/RENAME/ILIKE
fn plain_wildcard(options: &WildcardAdditionalOptions) -> Result<(), ValidationError> {
    if options.opt_ilike.is_some()
        || options.opt_exclude.is_some()
        || options.opt_except.is_some()
        || options.opt_replace.is_some()
        || options.opt_rename.is_some()
    {
        return Err(unsupported(format!("wildcard options {}", options)));
    }
    Ok(())
}

fn column_name(expr: &Expr, qualifiers: &[String]) -> Result<String, ValidationError> {
    match expr {
        Expr::Identifier(ident) => Ok(ident.value.clone()),
        Expr::CompoundIdentifier(parts) => match parts.as_slice() {
            [qualifier, column] if is_qualifier(qualifier, qualifiers) => Ok(column.value.clone()),
            _ => Err(unsupported(format!("column reference {}", expr))),
        },
        Expr::Nested(inner) => column_name(inner, qualifiers),
        other => Err(unsupported(format!("expected a column, found {}", other))),
    }
}

fn is_qualifier(ident: &Ident, qualifiers: &[String]) -> bool {
    qualifiers.iter().any(|q| *q == ident.value)
}

/// Flatten `a AND (b AND c)` into [a, b, c]
fn conjuncts<'e>(expr: &'e Expr, out: &mut Vec<&'e Expr>) {
    match expr {
        Expr::BinaryOp {
            left,
            op: BinaryOperator::And,
            right,
        } => {
            conjuncts(left, out);
            conjuncts(right, out);
        }
        Expr::Nested(inner) => conjuncts(inner, out),
        other => out.push(other),
    }
}

fn filter(expr: &Expr, qualifiers: &[String]) -> Result<Filter, ValidationError> {
    match expr {
        Expr::BinaryOp { left, op, right } => {
            let op = match op {
                BinaryOperator::Eq => FilterOp::Equals,
                BinaryOperator::Gt => FilterOp::Greater,
                BinaryOperator::Lt => FilterOp::Less,
                other => return Err(unsupported(format!("operator {}", other))),
            };
            let column = column_name(left, qualifiers)?;
            Ok(Filter::new(column, op, vec![literal(right)?]))
        }
        Expr::Like {
            negated: false,
            expr,
            pattern,
            escape_char: None,
            ..
        } => {
            let column = column_name(expr, qualifiers)?;
            Ok(Filter::new(column, FilterOp::Like, vec![literal(pattern)?]))
        }
        Expr::Between {
            expr,
            negated: false,
            low,
            high,
        } => {
            let column = column_name(expr, qualifiers)?;
            Ok(Filter::new(
                column,
                FilterOp::Between,
                vec![literal(low)?, literal(high)?],
            ))
        }
        other => Err(unsupported(format!("predicate {}", other))),
    }
}

fn literal(expr: &Expr) -> Result<ParamValue, ValidationError> {
    match expr {
        Expr::Value(Value::Number(text, _)) => number(text),
        Expr::Value(Value::SingleQuotedString(s)) | Expr::Value(Value::NationalStringLiteral(s)) => {
            Ok(ParamValue::Text(s.clone()))
        }
        Expr::Value(Value::Boolean(b)) => Ok(ParamValue::Bool(*b)),
        Expr::UnaryOp {
            op: UnaryOperator::Minus,
            expr,
        } => match expr.as_ref() {
            Expr::Value(Value::Number(text, _)) => number(&format!("-{}", text)),
            other => Err(unsupported(format!("expected a literal, found -{}", other))),
        },
        Expr::Nested(inner) => literal(inner),
        other => Err(unsupported(format!("expected a literal, found {}", other))),
    }
}

fn number(text: &str) -> Result<ParamValue, ValidationError> {
    if let Ok(i) = text.parse::<i64>() {
        return Ok(ParamValue::Integer(i));
    }
    text.parse::<f64>()
        .map(ParamValue::Float)
        .map_err(|_| unsupported(format!("numeric literal {}", text)))
}

fn row_limit(select: &Select, query: &Query) -> Result<Option<u32>, ValidationError> {
    let mut limits = Vec::new();

    if let Some(top) = &select.top {
        if top.percent || top.with_ties {
            return Err(unsupported("TOP PERCENT/WITH TIES"));
        }
        match &top.quantity {
            Some(TopQuantity::Constant(n)) => limits.push(*n),
            Some(TopQuantity::Expr(expr)) => limits.push(limit_value(expr)?),
            None => {}
        }
    }
    if let Some(expr) = &query.limit {
        limits.push(limit_value(expr)?);
    }
    if let Some(fetch) = &query.fetch {
        if fetch.percent || fetch.with_ties {
            return Err(unsupported("FETCH PERCENT/WITH TIES"));
        }
        if let Some(expr) = &fetch.quantity {
            limits.push(limit_value(expr)?);
        }
    }

    match limits.as_slice() {
        [] => Ok(None),
        // Anything above u32 is above any ceiling
        [n] => Ok(Some(u32::try_from(*n).unwrap_or(u32::MAX))),
        _ => Err(unsupported("more than one row limit")),
    }
}

fn limit_value(expr: &Expr) -> Result<u64, ValidationError> {
    match expr {
        Expr::Value(Value::Number(text, _)) => text
            .parse::<u64>()
            .map_err(|_| ValidationError::InvalidRowLimit(text.clone())),
        Expr::Nested(inner) => limit_value(inner),
        Expr::UnaryOp {
            op: UnaryOperator::Minus,
            ..
        } => Err(ValidationError::InvalidRowLimit(expr.to_string())),
        other => Err(unsupported(format!("row limit {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use querygate_core::{
        CatalogParts, ColumnDescriptor, DialectConfig, LimitConfig, SchemaCatalog, TableDescriptor,
    };

    fn catalog() -> SchemaCatalog {
        SchemaCatalog::from_parts(CatalogParts {
            tables: vec![TableDescriptor::new(
                "ProductUsage",
                vec![
                    ColumnDescriptor::new("Month", "varchar(7)"),
                    ColumnDescriptor::new("Product", "nvarchar(100)"),
                    ColumnDescriptor::new("RequestCount", "bigint"),
                ],
            )],
            ..CatalogParts::default()
        })
    }

    fn intent_of(sql: &str) -> Result<QueryIntent, ValidationError> {
        let catalog = catalog();
        let validator = DraftValidator::new(SqlBuilder::new(
            &catalog,
            DialectConfig::MsSql,
            LimitConfig::default(),
        ));
        validator.to_intent(sql)
    }

    #[test]
    fn rederives_simple_draft() {
        let intent = intent_of(
            "SELECT TOP (5) Product, RequestCount FROM dbo.ProductUsage \
             WHERE Product LIKE '%JavaScript%' AND Month = '2025-08' \
             ORDER BY RequestCount DESC",
        )
        .unwrap();

        assert_eq!(
            intent,
            QueryIntent::new("ProductUsage")
                .with_columns(["Product", "RequestCount"])
                .with_filter(Filter::like("Product", "%JavaScript%"))
                .with_filter(Filter::equals("Month", "2025-08"))
                .with_order(Ordering::desc("RequestCount"))
                .with_limit(5)
        );
    }

    #[test]
    fn wildcard_and_aliases() {
        let intent = intent_of("SELECT * FROM ProductUsage AS p WHERE p.RequestCount > 10").unwrap();
        assert!(intent.columns.is_empty());
        assert_eq!(intent.filters, vec![Filter::greater("RequestCount", 10i64)]);
    }

    #[test]
    fn between_and_negative_numbers() {
        let intent =
            intent_of("SELECT Month FROM ProductUsage WHERE RequestCount BETWEEN -1 AND 2.5").unwrap();
        assert_eq!(
            intent.filters[0].values,
            vec![ParamValue::Integer(-1), ParamValue::Float(2.5)]
        );
    }

    #[test]
    fn rejects_separators_and_comments() {
        for sql in [
            "SELECT Month FROM ProductUsage; DROP TABLE ProductUsage",
            "SELECT Month FROM ProductUsage -- hi",
            "SELECT Month /* x */ FROM ProductUsage",
        ] {
            assert!(
                matches!(intent_of(sql), Err(ValidationError::MultiStatementRejected(_))),
                "{}",
                sql
            );
        }
    }

    #[test]
    fn rejects_writes() {
        for sql in [
            "DELETE FROM ProductUsage",
            "UPDATE ProductUsage SET RequestCount = 0",
            "DROP TABLE ProductUsage",
            "INSERT INTO ProductUsage (Month) VALUES ('2025-01')",
        ] {
            assert!(
                matches!(intent_of(sql), Err(ValidationError::NotReadOnly(_))),
                "{}",
                sql
            );
        }
    }

    #[test]
    fn rejects_unsupported_shapes() {
        for sql in [
            "WITH x AS (SELECT Month FROM ProductUsage) SELECT Month FROM x",
            "SELECT Month FROM ProductUsage UNION SELECT Month FROM ProductUsage",
            "SELECT a.Month FROM ProductUsage a JOIN ProductUsage b ON a.Month = b.Month",
            "SELECT Month FROM (SELECT Month FROM ProductUsage) t",
            "SELECT Product, SUM(RequestCount) FROM ProductUsage GROUP BY Product",
            "SELECT DISTINCT Product FROM ProductUsage",
            "SELECT Month AS m FROM ProductUsage",
            "SELECT Month FROM ProductUsage WHERE Product = 'a' OR Product = 'b'",
            "SELECT Month FROM ProductUsage WHERE RequestCount >= 10",
            "SELECT Month FROM ProductUsage WHERE Product IN (SELECT Product FROM ProductUsage)",
            "SELECT Month FROM ProductUsage ORDER BY Month OFFSET 10 ROWS",
        ] {
            assert!(
                matches!(intent_of(sql), Err(ValidationError::UnsupportedSyntax(_))),
                "{}",
                sql
            );
        }
    }

    #[test]
    fn rejects_clauses_instead_of_dropping_them() {
        for sql in [
            "SELECT Month FROM ProductUsage WITH (NOLOCK)",
            "SELECT Month FROM ProductUsage FOR JSON PATH",
            "SELECT Month FROM ProductUsage ORDER BY Month NULLS FIRST",
            "SELECT Nope.* FROM ProductUsage",
            "SELECT Nope.* FROM ProductUsage AS p",
        ] {
            assert!(
                matches!(intent_of(sql), Err(ValidationError::UnsupportedSyntax(_))),
                "{}",
                sql
            );
        }
    }

    #[test]
    fn qualified_wildcard_on_source_table() {
        for sql in ["SELECT ProductUsage.* FROM ProductUsage", "SELECT p.* FROM ProductUsage AS p"] {
            assert_eq!(intent_of(sql).unwrap(), QueryIntent::new("ProductUsage"), "{}", sql);
        }
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            intent_of("SELEC Month FORM ProductUsage"),
            Err(ValidationError::Unparseable(_))
        ));
        assert!(matches!(intent_of(""), Err(ValidationError::Unparseable(_))));
    }

    #[test]
    fn draft_goes_through_builder() {
        let catalog = catalog();
        let validator = DraftValidator::new(SqlBuilder::new(
            &catalog,
            DialectConfig::MsSql,
            LimitConfig::default(),
        ));

        let statement = validator
            .validate_draft("SELECT Product FROM ProductUsage WHERE Product LIKE '%js%'")
            .unwrap();
        assert_eq!(
            statement.sql(),
            "SELECT TOP (100) [Product] FROM [ProductUsage] WHERE [Product] LIKE @p1"
        );

        assert_eq!(
            validator.validate_draft("SELECT Name FROM Users"),
            Err(ValidationError::UnknownTable("Users".to_string()))
        );
    }

    #[test]
    fn declaration_checks() {
        let catalog = catalog();
        let validator = DraftValidator::new(SqlBuilder::new(
            &catalog,
            DialectConfig::MsSql,
            LimitConfig::default(),
        ));
        let sql = "SELECT Product FROM ProductUsage WHERE Month = '2025-08'";

        assert!(validator
            .validate(sql, &DeclaredShape::new("ProductUsage"))
            .is_ok());
        assert!(validator
            .validate(sql, &DeclaredShape::new("ProductUsage").with_columns(["Product", "Month"]))
            .is_ok());

        assert_eq!(
            validator.validate(sql, &DeclaredShape::new("Users")),
            Err(ValidationError::UnknownTable("Users".to_string()))
        );
        assert!(matches!(
            validator.validate(sql, &DeclaredShape::new("ProductUsage").with_columns(["Region"])),
            Err(ValidationError::UnknownColumn { .. })
        ));
        assert!(matches!(
            validator.validate(sql, &DeclaredShape::new("ProductUsage").with_columns(["Product"])),
            Err(ValidationError::DeclarationMismatch(_))
        ));
        assert!(matches!(
            validator.validate(
                "SELECT * FROM ProductUsage",
                &DeclaredShape::new("ProductUsage").with_columns(["Product"])
            ),
            Err(ValidationError::DeclarationMismatch(_))
        ));
    }
}
