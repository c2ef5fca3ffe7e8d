use crate::interceptor::StatementKind;

/// Failures of the tenant decision for a single table.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TenantError {
    /// The table is tenant-scoped but no tenant is active for the operation.
    #[error("no tenant in context for {kind} on tenant table '{table}'")]
    MissingTenant { table: String, kind: StatementKind },
}

/// Errors raised while rewriting SQL.
#[derive(thiserror::Error, Debug)]
pub enum InterceptError {
    #[error("failed to parse SQL: {0}")]
    Parse(#[from] sqlparser::parser::ParserError),

    #[error(transparent)]
    Tenant(#[from] TenantError),

    /// Full-table UPDATE or DELETE.
    #[error("{kind} on '{table}' without WHERE clause is not allowed")]
    BlockedStatement { table: String, kind: StatementKind },

    /// Statement shape the interceptor cannot rewrite safely.
    #[error("unsupported statement: {0}")]
    Unsupported(String),
}
