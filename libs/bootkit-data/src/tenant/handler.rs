use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sqlparser::ast::{BinaryOperator, Expr, Ident};

use super::context::{TenantSupplier, TenantValue};
use super::registry::{TenantTableRegistry, TenantTableService};
use crate::error::TenantError;
use crate::interceptor::StatementKind;

/// Bound from the `data.tenant` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TenantProperties {
    pub enable: bool,
    pub column: String,
    /// Static registry entries; merged over any schema-derived registry.
    pub tables: BTreeMap<String, bool>,
}

impl Default for TenantProperties {
    fn default() -> Self {
        Self {
            enable: false,
            column: "tenant".to_owned(),
            tables: BTreeMap::new(),
        }
    }
}

impl TenantProperties {
    #[must_use]
    pub fn registry(&self) -> TenantTableRegistry {
        self.tables.iter().map(|(t, e)| (t.as_str(), *e)).collect()
    }
}

/// `column = value` for one tenant-scoped table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantPredicate {
    column: String,
    value: TenantValue,
}

impl TenantPredicate {
    #[must_use]
    pub fn new(column: impl Into<String>, value: TenantValue) -> Self {
        Self {
            column: column.into(),
            value,
        }
    }

    #[must_use]
    pub fn column(&self) -> &str {
        &self.column
    }

    #[must_use]
    pub fn value(&self) -> &TenantValue {
        &self.value
    }

    /// Column reference, qualified when a table name or alias is given.
    #[must_use]
    pub fn column_expr(&self, qualifier: Option<&Ident>) -> Expr {
        let column = Ident::new(&self.column);
        match qualifier {
            Some(q) => Expr::CompoundIdentifier(vec![q.clone(), column]),
            None => Expr::Identifier(column),
        }
    }

    /// `[qualifier.]column = value`
    #[must_use]
    pub fn to_expr(&self, qualifier: Option<&Ident>) -> Expr {
        Expr::BinaryOp {
            left: Box::new(self.column_expr(qualifier)),
            op: BinaryOperator::Eq,
            right: Box::new(self.value.to_expr()),
        }
    }
}

/// Decides, per table and statement, whether a tenant predicate applies.
pub trait TenantLineHandler: Send + Sync {
    fn tenant_column(&self) -> &str;

    /// `true` for tables that are not tenant-scoped.
    fn ignore_table(&self, table: &str) -> bool;

    /// Resolve the predicate for `table`.
    ///
    /// The supplier is consulted only for tenant-scoped tables.
    ///
    /// # Errors
    /// Returns [`TenantError::MissingTenant`] when the table is tenant-scoped
    /// and the supplier yields no tenant.
    fn decide(
        &self,
        table: &str,
        kind: StatementKind,
        supplier: &dyn TenantSupplier,
    ) -> Result<Option<TenantPredicate>, TenantError> {
        if self.ignore_table(table) {
            tracing::trace!(table, %kind, "table is not tenant-scoped");
            return Ok(None);
        }
        let Some(tenant) = supplier.current_tenant() else {
            tracing::warn!(table, %kind, "rejecting statement: no tenant in context");
            return Err(TenantError::MissingTenant {
                table: table.to_owned(),
                kind,
            });
        };
        tracing::debug!(table, %kind, %tenant, column = self.tenant_column(), "applying tenant predicate");
        Ok(Some(TenantPredicate::new(self.tenant_column(), tenant)))
    }
}

/// Handler backed by a [`TenantTableService`] and a fixed column name.
#[derive(Clone)]
pub struct DefaultTenantLineHandler {
    column: String,
    tables: Arc<dyn TenantTableService>,
}

impl DefaultTenantLineHandler {
    #[must_use]
    pub fn new(column: impl Into<String>, tables: Arc<dyn TenantTableService>) -> Self {
        Self {
            column: column.into(),
            tables,
        }
    }
}

impl std::fmt::Debug for DefaultTenantLineHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultTenantLineHandler")
            .field("column", &self.column)
            .finish_non_exhaustive()
    }
}

impl TenantLineHandler for DefaultTenantLineHandler {
    fn tenant_column(&self) -> &str {
        &self.column
    }

    fn ignore_table(&self, table: &str) -> bool {
        !self.tables.is_tenant_table(table)
    }
}
