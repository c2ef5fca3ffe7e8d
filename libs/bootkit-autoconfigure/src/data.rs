use std::sync::Arc;

use bootkit_data::tenant::{
    DefaultTenantLineHandler, TenantLineHandler, TenantLineInterceptor, TenantProperties,
    TenantTableRegistry, TenantTableService,
};
use bootkit_data::{BlockAttackInterceptor, InnerInterceptor, SqlDialect, SqlInterceptor};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::BootstrapError;

/// Bound from the `data.sql` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqlProperties {
    pub dialect: SqlDialect,
    /// Reject UPDATE and DELETE without WHERE.
    pub block_attack: bool,
}

impl Default for SqlProperties {
    fn default() -> Self {
        Self {
            dialect: SqlDialect::Generic,
            block_attack: true,
        }
    }
}

/// Bound from the `data` prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataProperties {
    pub tenant: TenantProperties,
    pub sql: SqlProperties,
}

/// Static `data.tenant.tables` entries consulted before a supplied service.
struct OverlayTableService {
    overrides: TenantTableRegistry,
    base: Arc<dyn TenantTableService>,
}

impl TenantTableService for OverlayTableService {
    fn is_tenant_table(&self, table: &str) -> bool {
        self.overrides
            .lookup(table)
            .unwrap_or_else(|| self.base.is_tenant_table(table))
    }
}

/// Tenant handler, present only when tenant injection is enabled.
///
/// # Errors
/// [`BootstrapError::MissingTenantTables`] when injection is enabled but
/// neither `data.tenant.tables` nor a table service says which tables to
/// scope.
pub fn configure_tenant_handler(
    props: &TenantProperties,
    tables: Option<Arc<dyn TenantTableService>>,
) -> Result<Option<Arc<dyn TenantLineHandler>>, BootstrapError> {
    if !props.enable {
        return Ok(None);
    }
    let service: Arc<dyn TenantTableService> = match tables {
        Some(base) if props.tables.is_empty() => base,
        Some(base) => Arc::new(OverlayTableService {
            overrides: props.registry(),
            base,
        }),
        None if !props.tables.is_empty() => Arc::new(props.registry()),
        None => return Err(BootstrapError::MissingTenantTables),
    };
    info!(column = %props.column, "tenant line injection enabled");
    Ok(Some(Arc::new(DefaultTenantLineHandler::new(
        props.column.clone(),
        service,
    ))))
}

/// Statement pipeline: block-attack, then tenant-line, then `extra` in
/// order. `None` when no interceptor is configured.
#[must_use]
pub fn configure_sql_interceptor(
    props: &SqlProperties,
    tenant: Option<&Arc<dyn TenantLineHandler>>,
    extra: &[Arc<dyn InnerInterceptor>],
) -> Option<SqlInterceptor> {
    let mut sql = SqlInterceptor::new(props.dialect);
    if props.block_attack {
        sql.add(Arc::new(BlockAttackInterceptor));
    }
    if let Some(handler) = tenant {
        sql.add(Arc::new(TenantLineInterceptor::new(Arc::clone(handler))));
    }
    for interceptor in extra {
        sql.add(Arc::clone(interceptor));
    }
    if sql.is_empty() {
        return None;
    }
    info!(interceptors = ?sql.names(), dialect = ?sql.dialect(), "SQL interceptor pipeline configured");
    Some(sql)
}
