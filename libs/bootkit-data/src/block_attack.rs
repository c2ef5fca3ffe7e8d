use sqlparser::ast::{FromTable, Statement, TableFactor, TableWithJoins};

use crate::error::InterceptError;
use crate::interceptor::{InnerInterceptor, InterceptContext, StatementKind};

/// Rejects UPDATE and DELETE statements that have no WHERE clause.
///
/// Must run before the tenant-line interceptor: once a tenant predicate has
/// been spliced in, a full-table write is no longer recognisable.
#[derive(Debug, Default, Clone, Copy)]
pub struct BlockAttackInterceptor;

fn first_table(tables: &[TableWithJoins]) -> String {
    match tables.first().map(|t| &t.relation) {
        Some(TableFactor::Table { name, .. }) => name.to_string(),
        _ => "<unknown>".to_owned(),
    }
}

impl InnerInterceptor for BlockAttackInterceptor {
    fn name(&self) -> &'static str {
        "block-attack"
    }

    fn intercept(
        &self,
        kind: StatementKind,
        statement: &mut Statement,
        _ctx: &InterceptContext<'_>,
    ) -> Result<(), InterceptError> {
        let table = match &*statement {
            Statement::Update {
                table,
                selection: None,
                ..
            } => first_table(std::slice::from_ref(table)),
            Statement::Delete(delete) if delete.selection.is_none() => {
                let (FromTable::WithFromKeyword(tables) | FromTable::WithoutKeyword(tables)) =
                    &delete.from;
                first_table(tables)
            }
            _ => return Ok(()),
        };
        tracing::warn!(%kind, table = %table, "blocked full-table write");
        Err(InterceptError::BlockedStatement { table, kind })
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::interceptor::{SqlDialect, SqlInterceptor};
    use std::sync::Arc;
    use tracing_test::traced_test;

    fn pipeline() -> SqlInterceptor {
        SqlInterceptor::new(SqlDialect::Generic).with(Arc::new(BlockAttackInterceptor))
    }

    #[test]
    fn full_table_update_is_blocked() {
        let err = pipeline()
            .rewrite("UPDATE orders SET status = 'x'", &InterceptContext::new())
            .unwrap_err();
        match err {
            InterceptError::BlockedStatement { table, kind } => {
                assert_eq!(table, "orders");
                assert_eq!(kind, StatementKind::Update);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    #[traced_test]
    fn full_table_delete_is_blocked() {
        let err = pipeline()
            .rewrite("DELETE FROM orders", &InterceptContext::new())
            .unwrap_err();
        assert!(matches!(
            err,
            InterceptError::BlockedStatement {
                kind: StatementKind::Delete,
                ..
            }
        ));
        assert!(logs_contain("blocked full-table write"));
    }

    #[test]
    fn filtered_writes_and_reads_pass() {
        let p = pipeline();
        let ctx = InterceptContext::new();
        p.rewrite("UPDATE orders SET status = 'x' WHERE id = 1", &ctx)
            .unwrap();
        p.rewrite("DELETE FROM orders WHERE id = 1", &ctx).unwrap();
        p.rewrite("SELECT * FROM orders", &ctx).unwrap();
        p.rewrite("INSERT INTO orders (id) VALUES (1)", &ctx).unwrap();
    }
}
