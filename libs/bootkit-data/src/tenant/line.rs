//! Splices tenant predicates into parsed statements.
//!
//! Placement rules:
//! - the base table of a query, UPDATE or DELETE is filtered in `WHERE`;
//! - tables joined with `INNER` or `LEFT` join are filtered in their `ON`
//!   clause, so outer rows of a left join survive;
//! - tables joined with `RIGHT`, `FULL` and other join kinds are filtered in
//!   `WHERE`;
//! - every nested query (derived tables, CTEs, set operations and subqueries
//!   in any expression position) is scoped on its own by an AST visitor;
//! - `ON CONFLICT ... DO UPDATE` is restricted to the current tenant's rows.
//!
//! FROM items whose tables cannot be filtered (table functions, `PIVOT` and
//! the like) and MySQL `ON DUPLICATE KEY UPDATE` are rejected when they touch
//! a tenant table.
//!
//! Any existing condition that is not a plain comparison is parenthesised
//! before the predicate is `AND`-ed onto it. Columns are qualified with the
//! table alias, or with the table name when the scope references more than
//! one table.

use std::ops::ControlFlow;
use std::sync::Arc;

use sqlparser::ast::{
    Assignment, AssignmentTarget, BinaryOperator, Delete, Expr, FromTable, Ident, Insert,
    JoinConstraint, JoinOperator, ObjectName, OnConflictAction, OnInsert, Query, Select,
    SelectItem, SetExpr, Statement, TableFactor, TableWithJoins, Value, Visit, VisitMut,
    VisitorMut, visit_relations,
};

use super::context::TenantSupplier;
use super::handler::{TenantLineHandler, TenantPredicate};
use crate::error::InterceptError;
use crate::interceptor::{InnerInterceptor, InterceptContext, StatementKind};

/// Interceptor adding `tenant = <current tenant>` to every statement that
/// touches a tenant-scoped table.
#[derive(Clone)]
pub struct TenantLineInterceptor {
    handler: Arc<dyn TenantLineHandler>,
}

impl TenantLineInterceptor {
    #[must_use]
    pub fn new(handler: Arc<dyn TenantLineHandler>) -> Self {
        Self { handler }
    }

    #[must_use]
    pub fn handler(&self) -> &Arc<dyn TenantLineHandler> {
        &self.handler
    }
}

impl InnerInterceptor for TenantLineInterceptor {
    fn name(&self) -> &'static str {
        "tenant-line"
    }

    fn intercept(
        &self,
        kind: StatementKind,
        statement: &mut Statement,
        ctx: &InterceptContext<'_>,
    ) -> Result<(), InterceptError> {
        let mut splicer = Splicer {
            handler: self.handler.as_ref(),
            supplier: ctx.tenant(),
        };
        if let ControlFlow::Break(err) = statement.visit(&mut splicer) {
            return Err(err);
        }

        match statement {
            Statement::Query(_) => Ok(()),
            Statement::Insert(insert) => splicer.insert(insert),
            Statement::Update {
                table,
                from,
                selection,
                ..
            } => {
                if from.is_some() {
                    return Err(InterceptError::Unsupported(
                        "UPDATE ... FROM cannot be tenant-scoped".to_owned(),
                    ));
                }
                splicer.update(table, selection)
            }
            Statement::Delete(delete) => splicer.delete(delete),
            _ => {
                tracing::trace!(%kind, "nothing to splice");
                Ok(())
            }
        }
    }
}

struct Splicer<'a> {
    handler: &'a dyn TenantLineHandler,
    supplier: &'a dyn TenantSupplier,
}

type SpliceResult = Result<(), InterceptError>;

/// Visits queries bottom-up, so each one is scoped after everything
/// nested inside it.
impl VisitorMut for Splicer<'_> {
    type Break = InterceptError;

    fn post_visit_query(&mut self, query: &mut Query) -> ControlFlow<Self::Break> {
        match self.set_expr(&mut query.body) {
            Ok(()) => ControlFlow::Continue(()),
            Err(err) => ControlFlow::Break(err),
        }
    }
}

impl Splicer<'_> {
    /// Scopes the SELECTs that belong to this query level. Parenthesised
    /// queries are visited as queries of their own.
    fn set_expr(&self, body: &mut SetExpr) -> SpliceResult {
        match body {
            SetExpr::Select(select) => self.select(select),
            SetExpr::SetOperation { left, right, .. } => {
                self.set_expr(left)?;
                self.set_expr(right)
            }
            SetExpr::Insert(statement) | SetExpr::Update(statement) => {
                self.reject_tenant_tables(&*statement, "a statement nested in a query")
            }
            SetExpr::Table(table) => match &table.table_name {
                Some(name) if !self.handler.ignore_table(name) => {
                    Err(InterceptError::Unsupported(format!(
                        "TABLE {name} cannot be tenant-scoped"
                    )))
                }
                _ => Ok(()),
            },
            _ => Ok(()),
        }
    }

    fn select(&self, select: &mut Select) -> SpliceResult {
        let qualify = count_tables(&select.from) > 1;
        let mut filters = Vec::new();
        for from in &mut select.from {
            self.table_with_joins(from, StatementKind::Select, qualify, &mut filters)?;
        }
        select.selection = conjoin(select.selection.take(), filters);
        Ok(())
    }

    fn update(&self, table: &mut TableWithJoins, selection: &mut Option<Expr>) -> SpliceResult {
        let qualify = count_tables(std::slice::from_ref(table)) > 1;
        let mut filters = Vec::new();
        self.table_with_joins(table, StatementKind::Update, qualify, &mut filters)?;
        *selection = conjoin(selection.take(), filters);
        Ok(())
    }

    fn delete(&self, delete: &mut Delete) -> SpliceResult {
        let (FromTable::WithFromKeyword(tables) | FromTable::WithoutKeyword(tables)) =
            &mut delete.from;
        let using_count = delete.using.as_deref().map_or(0, count_tables);
        let qualify = count_tables(tables) + using_count > 1;

        let mut filters = Vec::new();
        for table in tables.iter_mut() {
            self.table_with_joins(table, StatementKind::Delete, qualify, &mut filters)?;
        }
        if let Some(using) = &mut delete.using {
            for table in using {
                self.table_with_joins(table, StatementKind::Select, qualify, &mut filters)?;
            }
        }
        delete.selection = conjoin(delete.selection.take(), filters);
        Ok(())
    }

    fn insert(&self, insert: &mut Insert) -> SpliceResult {
        let Some(table) = insert.table_name.0.last().cloned() else {
            return Ok(());
        };
        let Some(predicate) =
            self.handler
                .decide(&table.value, StatementKind::Insert, self.supplier)?
        else {
            return Ok(());
        };

        if insert.columns.is_empty() {
            return Err(InterceptError::Unsupported(format!(
                "INSERT into tenant table '{}' requires an explicit column list",
                table.value
            )));
        }
        let position = insert
            .columns
            .iter()
            .position(|c| c.value.eq_ignore_ascii_case(predicate.column()));
        let value = predicate.value().to_expr();

        let Some(source) = insert.source.as_mut() else {
            return Err(InterceptError::Unsupported(format!(
                "INSERT into tenant table '{}' without VALUES or SELECT",
                table.value
            )));
        };
        match source.body.as_mut() {
            SetExpr::Values(values) => {
                for row in &mut values.rows {
                    match position {
                        Some(idx) if idx < row.len() => row[idx] = value.clone(),
                        Some(_) => {}
                        None => row.push(value.clone()),
                    }
                }
            }
            SetExpr::Select(select) => splice_projection(select, position, value)?,
            _ => {
                return Err(InterceptError::Unsupported(format!(
                    "INSERT into tenant table '{}' from a compound query",
                    table.value
                )));
            }
        }

        if let Some(on) = &mut insert.on {
            let qualifier = insert.table_alias.as_ref().unwrap_or(&table);
            scope_upsert(on, &predicate, qualifier)?;
        }
        if position.is_none() {
            insert.columns.push(Ident::new(predicate.column()));
        }
        Ok(())
    }

    /// Handles one FROM item and its joins. Filters destined for `WHERE`
    /// are pushed to `filters`; join filters go straight into `ON`.
    fn table_with_joins(
        &self,
        from: &mut TableWithJoins,
        kind: StatementKind,
        qualify: bool,
        filters: &mut Vec<Expr>,
    ) -> SpliceResult {
        if let Some(filter) = self.factor(&mut from.relation, kind, qualify, filters)? {
            filters.push(filter);
        }

        for join in &mut from.joins {
            let Some(filter) =
                self.factor(&mut join.relation, StatementKind::Select, qualify, filters)?
            else {
                continue;
            };
            match &mut join.join_operator {
                JoinOperator::Inner(constraint) | JoinOperator::LeftOuter(constraint) => {
                    attach_to_join(constraint, filter, filters);
                }
                _ => filters.push(filter),
            }
        }
        Ok(())
    }

    /// Predicate for a plain table reference. Derived tables were already
    /// scoped by the visitor.
    fn factor(
        &self,
        factor: &mut TableFactor,
        kind: StatementKind,
        qualify: bool,
        filters: &mut Vec<Expr>,
    ) -> Result<Option<Expr>, InterceptError> {
        match factor {
            TableFactor::Table { name, alias, .. } => {
                let Some(table) = name.0.last() else {
                    return Ok(None);
                };
                let Some(predicate) = self.handler.decide(&table.value, kind, self.supplier)?
                else {
                    return Ok(None);
                };
                let qualifier = match alias {
                    Some(alias) => Some(&alias.name),
                    None if qualify => Some(table),
                    None => None,
                };
                Ok(Some(predicate.to_expr(qualifier)))
            }
            TableFactor::Derived { .. } => Ok(None),
            TableFactor::NestedJoin {
                table_with_joins, ..
            } => {
                self.table_with_joins(table_with_joins, kind, qualify, filters)?;
                Ok(None)
            }
            other => {
                self.reject_tenant_tables(&*other, "this FROM item")?;
                Ok(None)
            }
        }
    }

    /// Fails when `node` names a tenant table directly, outside any query
    /// the visitor could scope.
    fn reject_tenant_tables<V: Visit>(&self, node: &V, place: &str) -> SpliceResult {
        let found = visit_relations(node, |name: &ObjectName| match name.0.last() {
            Some(table) if !self.handler.ignore_table(&table.value) => {
                ControlFlow::Break(table.value.clone())
            }
            _ => ControlFlow::Continue(()),
        });
        match found {
            ControlFlow::Break(table) => Err(InterceptError::Unsupported(format!(
                "tenant table '{table}' in {place} cannot be tenant-scoped"
            ))),
            ControlFlow::Continue(()) => Ok(()),
        }
    }
}

/// `ON CONFLICT DO UPDATE` only touches the current tenant's row and may not
/// move it to another tenant. MySQL upserts have no filter to extend.
fn scope_upsert(
    on: &mut OnInsert,
    predicate: &TenantPredicate,
    qualifier: &Ident,
) -> SpliceResult {
    match on {
        OnInsert::OnConflict(conflict) => {
            if let OnConflictAction::DoUpdate(update) = &mut conflict.action {
                if assigns_column(&update.assignments, predicate.column()) {
                    return Err(InterceptError::Unsupported(
                        "ON CONFLICT DO UPDATE may not change the tenant column".to_owned(),
                    ));
                }
                let filter = predicate.to_expr(Some(qualifier));
                update.selection = conjoin(update.selection.take(), vec![filter]);
            }
            Ok(())
        }
        _ => Err(InterceptError::Unsupported(format!(
            "ON DUPLICATE KEY UPDATE on tenant table '{}' cannot be tenant-scoped",
            qualifier.value
        ))),
    }
}

fn assigns_column(assignments: &[Assignment], column: &str) -> bool {
    let named = |name: &ObjectName| {
        name.0
            .last()
            .is_some_and(|c| c.value.eq_ignore_ascii_case(column))
    };
    assignments.iter().any(|a| match &a.target {
        AssignmentTarget::ColumnName(name) => named(name),
        AssignmentTarget::Tuple(names) => names.iter().any(named),
    })
}

fn splice_projection(
    select: &mut Select,
    position: Option<usize>,
    value: Expr,
) -> SpliceResult {
    match position {
        None => {
            select.projection.push(SelectItem::UnnamedExpr(value));
            Ok(())
        }
        Some(idx) => {
            let positional = select
                .projection
                .iter()
                .all(|item| matches!(item, SelectItem::UnnamedExpr(_) | SelectItem::ExprWithAlias { .. }));
            match select.projection.get_mut(idx) {
                Some(item) if positional => {
                    *item = SelectItem::UnnamedExpr(value);
                    Ok(())
                }
                _ => Err(InterceptError::Unsupported(
                    "cannot overwrite the tenant column of a wildcard INSERT ... SELECT".to_owned(),
                )),
            }
        }
    }
}

fn attach_to_join(constraint: &mut JoinConstraint, filter: Expr, filters: &mut Vec<Expr>) {
    if let JoinConstraint::On(on) = constraint {
        let existing = std::mem::replace(on, Expr::Value(Value::Null));
        *on = and(guard(existing), filter);
    } else if matches!(constraint, JoinConstraint::None) {
        *constraint = JoinConstraint::On(filter);
    } else {
        filters.push(filter);
    }
}

fn count_tables(from: &[TableWithJoins]) -> usize {
    from.iter()
        .map(|t| {
            let nested = |f: &TableFactor| match f {
                TableFactor::NestedJoin {
                    table_with_joins, ..
                } => count_tables(std::slice::from_ref(&**table_with_joins)),
                _ => 1,
            };
            nested(&t.relation) + t.joins.iter().map(|j| nested(&j.relation)).sum::<usize>()
        })
        .sum()
}

fn and(left: Expr, right: Expr) -> Expr {
    Expr::BinaryOp {
        left: Box::new(left),
        op: BinaryOperator::And,
        right: Box::new(right),
    }
}

/// Parenthesises `expr` unless an appended `AND` cannot bind into it.
fn guard(expr: Expr) -> Expr {
    if is_self_contained(&expr) {
        expr
    } else {
        Expr::Nested(Box::new(expr))
    }
}

fn is_operand(expr: &Expr) -> bool {
    matches!(
        expr,
        Expr::Identifier(_) | Expr::CompoundIdentifier(_) | Expr::Value(_)
    )
}

fn is_self_contained(expr: &Expr) -> bool {
    match expr {
        Expr::Nested(_) | Expr::Exists { .. } | Expr::Subquery(_) => true,
        Expr::BinaryOp { left, op, right } => {
            matches!(
                op,
                BinaryOperator::Eq
                    | BinaryOperator::NotEq
                    | BinaryOperator::Lt
                    | BinaryOperator::LtEq
                    | BinaryOperator::Gt
                    | BinaryOperator::GtEq
            ) && is_operand(left)
                && is_operand(right)
        }
        Expr::IsNull(inner) | Expr::IsNotNull(inner) | Expr::InSubquery { expr: inner, .. } => {
            is_operand(inner)
        }
        Expr::InList { expr: inner, list, .. } => {
            is_operand(inner) && list.iter().all(is_operand)
        }
        other => is_operand(other),
    }
}

/// `existing AND f1 AND f2 ...`
fn conjoin(existing: Option<Expr>, filters: Vec<Expr>) -> Option<Expr> {
    if filters.is_empty() {
        return existing;
    }
    filters.into_iter().fold(existing.map(guard), |acc, filter| {
        Some(match acc {
            Some(left) => and(left, filter),
            None => filter,
        })
    })
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::interceptor::{SqlDialect, SqlInterceptor};
    use crate::tenant::{DefaultTenantLineHandler, TenantContext, TenantTableRegistry};
    use sqlparser::dialect::{GenericDialect, MySqlDialect, PostgreSqlDialect};
    use sqlparser::parser::Parser;

    fn pipeline() -> SqlInterceptor {
        pipeline_for(SqlDialect::Generic)
    }

    fn pipeline_for(dialect: SqlDialect) -> SqlInterceptor {
        let registry = TenantTableRegistry::new()
            .with_table("orders", true)
            .with_table("order_items", true)
            .with_table("customers", true)
            .with_table("lookup_codes", false);
        let handler = DefaultTenantLineHandler::new("tenant", Arc::new(registry));
        SqlInterceptor::new(dialect)
            .with(Arc::new(TenantLineInterceptor::new(Arc::new(handler))))
    }

    fn rewrite(sql: &str) -> String {
        try_rewrite(SqlDialect::Generic, sql).unwrap()
    }

    fn try_rewrite(dialect: SqlDialect, sql: &str) -> Result<String, InterceptError> {
        let ctx = TenantContext::new("t1");
        pipeline_for(dialect).rewrite(sql, &InterceptContext::with_tenant(&ctx))
    }

    fn normalized(sql: &str) -> String {
        Parser::parse_sql(&GenericDialect {}, sql).unwrap()[0].to_string()
    }

    #[track_caller]
    fn assert_rewrites(input: &str, expected: &str) {
        assert_eq!(rewrite(input), normalized(expected));
    }

    #[test]
    fn select_on_tenant_table_gets_bare_predicate() {
        assert_rewrites(
            "SELECT * FROM orders",
            "SELECT * FROM orders WHERE tenant = 't1'",
        );
    }

    #[test]
    fn select_on_non_tenant_table_is_untouched() {
        assert_rewrites("SELECT * FROM lookup_codes", "SELECT * FROM lookup_codes");
        assert_rewrites(
            "SELECT * FROM audit WHERE id = 1",
            "SELECT * FROM audit WHERE id = 1",
        );
    }

    #[test]
    fn existing_where_is_parenthesised_unless_a_plain_comparison() {
        assert_rewrites(
            "SELECT id FROM orders WHERE status = 'open' AND total > 10",
            "SELECT id FROM orders WHERE (status = 'open' AND total > 10) AND tenant = 't1'",
        );
        assert_rewrites(
            "SELECT id FROM orders WHERE total BETWEEN 1 AND 10",
            "SELECT id FROM orders WHERE (total BETWEEN 1 AND 10) AND tenant = 't1'",
        );
        assert_rewrites(
            "SELECT id FROM orders WHERE NOT archived",
            "SELECT id FROM orders WHERE (NOT archived) AND tenant = 't1'",
        );
        assert_rewrites(
            "SELECT id FROM orders WHERE status = 'open' OR status = 'new'",
            "SELECT id FROM orders WHERE (status = 'open' OR status = 'new') AND tenant = 't1'",
        );
    }

    #[test]
    fn alias_qualifies_column() {
        assert_rewrites(
            "SELECT o.id FROM orders o WHERE o.id = 1",
            "SELECT o.id FROM orders AS o WHERE o.id = 1 AND o.tenant = 't1'",
        );
    }

    #[test]
    fn inner_join_filters_joined_table_in_on_clause() {
        assert_rewrites(
            "SELECT o.id FROM orders o JOIN order_items i ON i.order_id = o.id",
            "SELECT o.id FROM orders AS o JOIN order_items AS i \
             ON i.order_id = o.id AND i.tenant = 't1' WHERE o.tenant = 't1'",
        );
    }

    #[test]
    fn left_join_keeps_outer_rows() {
        assert_rewrites(
            "SELECT * FROM orders LEFT JOIN lookup_codes ON lookup_codes.code = orders.code \
             LEFT JOIN customers ON customers.id = orders.customer_id",
            "SELECT * FROM orders LEFT JOIN lookup_codes ON lookup_codes.code = orders.code \
             LEFT JOIN customers ON customers.id = orders.customer_id AND customers.tenant = 't1' \
             WHERE orders.tenant = 't1'",
        );
    }

    #[test]
    fn right_join_filters_in_where() {
        assert_rewrites(
            "SELECT * FROM orders o RIGHT JOIN customers c ON c.id = o.customer_id",
            "SELECT * FROM orders AS o RIGHT JOIN customers AS c ON c.id = o.customer_id \
             WHERE o.tenant = 't1' AND c.tenant = 't1'",
        );
    }

    #[test]
    fn comma_join_qualifies_with_table_names() {
        assert_rewrites(
            "SELECT * FROM orders, customers WHERE orders.customer_id = customers.id",
            "SELECT * FROM orders, customers WHERE orders.customer_id = customers.id \
             AND orders.tenant = 't1' AND customers.tenant = 't1'",
        );
    }

    #[test]
    fn subqueries_are_scoped_independently() {
        assert_rewrites(
            "SELECT * FROM lookup_codes WHERE code IN (SELECT code FROM orders)",
            "SELECT * FROM lookup_codes WHERE code IN (SELECT code FROM orders WHERE tenant = 't1')",
        );
        assert_rewrites(
            "SELECT * FROM customers c WHERE EXISTS (SELECT 1 FROM orders o WHERE o.customer_id = c.id)",
            "SELECT * FROM customers AS c WHERE EXISTS \
             (SELECT 1 FROM orders AS o WHERE o.customer_id = c.id AND o.tenant = 't1') \
             AND c.tenant = 't1'",
        );
    }

    #[test]
    fn derived_tables_ctes_and_unions_are_rewritten() {
        assert_rewrites(
            "SELECT * FROM (SELECT id FROM orders) AS x",
            "SELECT * FROM (SELECT id FROM orders WHERE tenant = 't1') AS x",
        );
        assert_rewrites(
            "WITH recent AS (SELECT * FROM orders) SELECT * FROM recent",
            "WITH recent AS (SELECT * FROM orders WHERE tenant = 't1') SELECT * FROM recent",
        );
        assert_rewrites(
            "SELECT id FROM orders UNION SELECT id FROM customers",
            "SELECT id FROM orders WHERE tenant = 't1' UNION SELECT id FROM customers WHERE tenant = 't1'",
        );
    }

    #[test]
    fn update_and_delete_get_where_predicate() {
        assert_rewrites(
            "UPDATE orders SET status = 'closed' WHERE id = 7",
            "UPDATE orders SET status = 'closed' WHERE id = 7 AND tenant = 't1'",
        );
        assert_rewrites(
            "DELETE FROM orders WHERE id = 7 OR id = 8",
            "DELETE FROM orders WHERE (id = 7 OR id = 8) AND tenant = 't1'",
        );
        assert_rewrites(
            "UPDATE lookup_codes SET label = 'x' WHERE code = 'a'",
            "UPDATE lookup_codes SET label = 'x' WHERE code = 'a'",
        );
    }

    #[test]
    fn update_subqueries_are_scoped() {
        assert_rewrites(
            "UPDATE lookup_codes SET label = 'x' WHERE code IN (SELECT code FROM orders)",
            "UPDATE lookup_codes SET label = 'x' WHERE code IN (SELECT code FROM orders WHERE tenant = 't1')",
        );
    }

    #[test]
    fn update_from_is_rejected() {
        let ctx = TenantContext::new("t1");
        let err = pipeline()
            .rewrite(
                "UPDATE orders SET total = c.total FROM customers c WHERE c.id = orders.customer_id",
                &InterceptContext::with_tenant(&ctx),
            )
            .unwrap_err();
        assert!(matches!(err, InterceptError::Unsupported(_)));
    }

    #[test]
    fn insert_appends_tenant_column_and_value() {
        assert_rewrites(
            "INSERT INTO orders (id, total) VALUES (1, 10), (2, 20)",
            "INSERT INTO orders (id, total, tenant) VALUES (1, 10, 't1'), (2, 20, 't1')",
        );
        assert_rewrites(
            "INSERT INTO lookup_codes (code) VALUES ('a')",
            "INSERT INTO lookup_codes (code) VALUES ('a')",
        );
    }

    #[test]
    fn insert_overwrites_explicit_tenant() {
        assert_rewrites(
            "INSERT INTO orders (id, tenant) VALUES (1, 'other')",
            "INSERT INTO orders (id, tenant) VALUES (1, 't1')",
        );
    }

    #[test]
    fn insert_select_appends_to_projection_and_scopes_source() {
        assert_rewrites(
            "INSERT INTO orders (id, total) SELECT id, total FROM customers",
            "INSERT INTO orders (id, total, tenant) SELECT id, total, 't1' FROM customers WHERE tenant = 't1'",
        );
    }

    #[test]
    fn insert_without_column_list_is_rejected() {
        let ctx = TenantContext::new("t1");
        let err = pipeline()
            .rewrite(
                "INSERT INTO orders VALUES (1, 10)",
                &InterceptContext::with_tenant(&ctx),
            )
            .unwrap_err();
        assert!(matches!(err, InterceptError::Unsupported(_)));
    }

    #[test]
    fn missing_tenant_is_an_error_only_for_tenant_tables() {
        let p = pipeline();
        let err = p
            .rewrite("SELECT * FROM orders", &InterceptContext::new())
            .unwrap_err();
        assert!(matches!(err, InterceptError::Tenant(_)));

        assert_eq!(
            p.rewrite("SELECT * FROM lookup_codes", &InterceptContext::new())
                .unwrap(),
            "SELECT * FROM lookup_codes"
        );
    }

    #[test]
    fn numeric_tenant_renders_unquoted() {
        let ctx = TenantContext::new(42);
        let out = pipeline()
            .rewrite("DELETE FROM orders WHERE id = 1", &InterceptContext::with_tenant(&ctx))
            .unwrap();
        assert_eq!(out, normalized("DELETE FROM orders WHERE id = 1 AND tenant = 42"));
    }

    #[test]
    fn mysql_xor_is_parenthesised() {
        let out = try_rewrite(SqlDialect::Mysql, "SELECT * FROM orders WHERE 1 = 1 XOR 0 = 1").unwrap();
        let expected = Parser::parse_sql(
            &MySqlDialect {},
            "SELECT * FROM orders WHERE (1 = 1 XOR 0 = 1) AND tenant = 't1'",
        )
        .unwrap()[0]
            .to_string();
        assert_eq!(out, expected);
    }

    #[test]
    fn conditions_on_non_tenant_tables_keep_their_shape() {
        assert_rewrites(
            "SELECT * FROM lookup_codes WHERE a = 1 AND b = 2 OR c = 3",
            "SELECT * FROM lookup_codes WHERE a = 1 AND b = 2 OR c = 3",
        );
    }

    #[test]
    fn subqueries_in_expression_positions_are_scoped() {
        assert_rewrites(
            "SELECT COALESCE((SELECT sum(total) FROM orders), 0) FROM lookup_codes",
            "SELECT COALESCE((SELECT sum(total) FROM orders WHERE tenant = 't1'), 0) FROM lookup_codes",
        );
        assert_rewrites(
            "SELECT code FROM lookup_codes GROUP BY code HAVING count(*) < (SELECT count(*) FROM orders)",
            "SELECT code FROM lookup_codes GROUP BY code \
             HAVING count(*) < (SELECT count(*) FROM orders WHERE tenant = 't1')",
        );
        assert_rewrites(
            "SELECT * FROM lookup_codes ORDER BY (SELECT max(total) FROM orders)",
            "SELECT * FROM lookup_codes ORDER BY (SELECT max(total) FROM orders WHERE tenant = 't1')",
        );
        assert_rewrites(
            "SELECT CASE WHEN (SELECT count(*) FROM orders) > 0 THEN 1 ELSE 0 END FROM lookup_codes",
            "SELECT CASE WHEN (SELECT count(*) FROM orders WHERE tenant = 't1') > 0 THEN 1 ELSE 0 END \
             FROM lookup_codes",
        );
    }

    #[test]
    fn every_subquery_position_is_scoped_or_rejected() {
        let statements = [
            "SELECT COALESCE((SELECT sum(total) FROM orders), 0) FROM lookup_codes",
            "SELECT code FROM lookup_codes GROUP BY code HAVING count(*) < (SELECT count(*) FROM orders)",
            "SELECT CASE WHEN (SELECT count(*) FROM orders) > 0 THEN 1 ELSE 0 END FROM lookup_codes",
            "SELECT CASE code WHEN 'a' THEN (SELECT max(total) FROM orders) END FROM lookup_codes",
            "SELECT * FROM lookup_codes WHERE code = ANY(SELECT code FROM orders)",
            "SELECT * FROM lookup_codes ORDER BY (SELECT max(total) FROM orders)",
            "SELECT CAST((SELECT max(total) FROM orders) AS INT) FROM lookup_codes",
            "SELECT code FROM lookup_codes GROUP BY (SELECT min(code) FROM orders)",
            "SELECT upper((SELECT min(code) FROM orders)) FROM lookup_codes",
            "SELECT * FROM lookup_codes WHERE code BETWEEN 'a' AND (SELECT max(code) FROM orders)",
            "SELECT * FROM lookup_codes l JOIN lookup_codes m ON m.code = (SELECT min(code) FROM orders)",
            "SELECT * FROM lookup_codes WHERE code IN (SELECT code FROM (SELECT code FROM orders) AS x)",
            "SELECT (SELECT (SELECT max(total) FROM orders)) FROM lookup_codes",
            "SELECT * FROM lookup_codes WHERE NOT EXISTS (SELECT 1 FROM orders WHERE orders.code = lookup_codes.code)",
            "UPDATE lookup_codes SET label = (SELECT max(name) FROM orders) WHERE code = 'a'",
            "DELETE FROM lookup_codes WHERE code IN (SELECT code FROM orders)",
            "INSERT INTO lookup_codes (code) VALUES ((SELECT max(code) FROM orders))",
            "INSERT INTO lookup_codes (code) SELECT code FROM orders",
            "WITH a AS (WITH b AS (SELECT * FROM orders) SELECT * FROM b) SELECT * FROM a",
        ];
        for sql in statements {
            let Ok(out) = try_rewrite(SqlDialect::Generic, sql) else {
                continue;
            };
            assert_eq!(
                out.matches("FROM orders").count(),
                out.matches("tenant = 't1'").count(),
                "unscoped tenant table in: {out}"
            );
            assert!(out.contains("tenant = 't1'"), "unscoped: {out}");
        }
    }

    #[test]
    fn duplicate_key_update_on_tenant_table_is_rejected() {
        let err = try_rewrite(
            SqlDialect::Mysql,
            "INSERT INTO orders (id, total) VALUES (1, 2) ON DUPLICATE KEY UPDATE total = 5",
        )
        .unwrap_err();
        assert!(matches!(err, InterceptError::Unsupported(_)));

        let out = try_rewrite(
            SqlDialect::Mysql,
            "INSERT INTO lookup_codes (code) VALUES ('a') ON DUPLICATE KEY UPDATE label = 'b'",
        )
        .unwrap();
        assert!(!out.contains("tenant"));
    }

    #[test]
    fn on_conflict_update_is_limited_to_the_current_tenant() {
        let out = try_rewrite(
            SqlDialect::Postgres,
            "INSERT INTO orders (id, total) VALUES (1, 2) ON CONFLICT (id) DO UPDATE SET total = 5",
        )
        .unwrap();
        let expected = Parser::parse_sql(
            &PostgreSqlDialect {},
            "INSERT INTO orders (id, total, tenant) VALUES (1, 2, 't1') \
             ON CONFLICT (id) DO UPDATE SET total = 5 WHERE orders.tenant = 't1'",
        )
        .unwrap()[0]
            .to_string();
        assert_eq!(out, expected);

        let out = try_rewrite(
            SqlDialect::Sqlite,
            "INSERT INTO orders (id, total) VALUES (1, 2) \
             ON CONFLICT (id) DO UPDATE SET total = excluded.total WHERE total < 9 OR total > 99",
        )
        .unwrap();
        assert!(out.ends_with("WHERE (total < 9 OR total > 99) AND orders.tenant = 't1'"), "{out}");

        let out = try_rewrite(
            SqlDialect::Postgres,
            "INSERT INTO orders (id) VALUES (1) ON CONFLICT DO NOTHING",
        )
        .unwrap();
        assert!(out.ends_with("ON CONFLICT DO NOTHING"), "{out}");
    }

    #[test]
    fn on_conflict_update_may_not_reassign_the_tenant() {
        let err = try_rewrite(
            SqlDialect::Postgres,
            "INSERT INTO orders (id) VALUES (1) ON CONFLICT (id) DO UPDATE SET tenant = 'other'",
        )
        .unwrap_err();
        assert!(matches!(err, InterceptError::Unsupported(_)));
    }

    #[test]
    fn unfilterable_from_items_on_tenant_tables_are_rejected() {
        let err = try_rewrite(
            SqlDialect::Postgres,
            "SELECT code FROM lookup_codes UNION TABLE orders",
        )
        .unwrap_err();
        assert!(matches!(err, InterceptError::Unsupported(_)));

        assert_eq!(
            try_rewrite(
                SqlDialect::Postgres,
                "SELECT code FROM lookup_codes UNION TABLE lookup_codes"
            )
            .unwrap(),
            "SELECT code FROM lookup_codes UNION TABLE lookup_codes"
        );
    }

    #[test]
    fn conjoin_without_existing_condition() {
        let f = Expr::Identifier(Ident::new("x"));
        assert_eq!(conjoin(None, vec![f.clone()]), Some(f.clone()));
        assert_eq!(conjoin(None, Vec::new()), None);

        let existing = and(f.clone(), f.clone());
        assert_eq!(conjoin(Some(existing.clone()), Vec::new()), Some(existing));
    }
}
