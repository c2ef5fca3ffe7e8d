//! Parse, rewrite, render.
//!
//! [`SqlInterceptor`] owns an ordered list of [`InnerInterceptor`]s. Each
//! statement is parsed once, handed to every interceptor in order, and
//! rendered back to SQL. Statements other than SELECT, INSERT, UPDATE and
//! DELETE pass through untouched.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sqlparser::ast::Statement;
use sqlparser::dialect::{Dialect, GenericDialect, MySqlDialect, PostgreSqlDialect, SQLiteDialect};
use sqlparser::parser::Parser;

use crate::error::InterceptError;
use crate::tenant::TenantSupplier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
}

impl StatementKind {
    #[must_use]
    pub fn of(statement: &Statement) -> Option<Self> {
        match statement {
            Statement::Query(_) => Some(Self::Select),
            Statement::Insert(_) => Some(Self::Insert),
            Statement::Update { .. } => Some(Self::Update),
            Statement::Delete(_) => Some(Self::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Select => "SELECT",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        })
    }
}

/// SQL dialect used for parsing.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlDialect {
    #[default]
    Generic,
    Postgres,
    Mysql,
    Sqlite,
}

impl SqlDialect {
    fn parser_dialect(self) -> Box<dyn Dialect> {
        match self {
            Self::Generic => Box::new(GenericDialect {}),
            Self::Postgres => Box::new(PostgreSqlDialect {}),
            Self::Mysql => Box::new(MySqlDialect {}),
            Self::Sqlite => Box::new(SQLiteDialect {}),
        }
    }
}

/// Per-operation inputs for the interceptors.
#[derive(Clone, Copy, Default)]
pub struct InterceptContext<'a> {
    tenant: Option<&'a dyn TenantSupplier>,
}

impl<'a> InterceptContext<'a> {
    /// No tenant: any statement touching a tenant table fails.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_tenant(tenant: &'a dyn TenantSupplier) -> Self {
        Self {
            tenant: Some(tenant),
        }
    }

    #[must_use]
    pub fn tenant(&self) -> &'a dyn TenantSupplier {
        self.tenant.unwrap_or(&NO_TENANT)
    }
}

struct NoTenant;

impl TenantSupplier for NoTenant {
    fn current_tenant(&self) -> Option<crate::tenant::TenantValue> {
        None
    }
}

static NO_TENANT: NoTenant = NoTenant;

impl fmt::Debug for InterceptContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptContext")
            .field("tenant", &self.tenant.map(|_| ".."))
            .finish()
    }
}

/// One rewrite step over a parsed statement.
pub trait InnerInterceptor: Send + Sync {
    fn name(&self) -> &'static str;

    /// Inspect or rewrite `statement` in place.
    ///
    /// # Errors
    /// Returns an error to reject the statement.
    fn intercept(
        &self,
        kind: StatementKind,
        statement: &mut Statement,
        ctx: &InterceptContext<'_>,
    ) -> Result<(), InterceptError>;
}

/// The ordered interceptor pipeline.
#[derive(Clone, Default)]
pub struct SqlInterceptor {
    dialect: SqlDialect,
    interceptors: Vec<Arc<dyn InnerInterceptor>>,
}

impl fmt::Debug for SqlInterceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlInterceptor")
            .field("dialect", &self.dialect)
            .field("interceptors", &self.names())
            .finish()
    }
}

impl SqlInterceptor {
    #[must_use]
    pub fn new(dialect: SqlDialect) -> Self {
        Self {
            dialect,
            interceptors: Vec::new(),
        }
    }

    #[must_use]
    pub fn with(mut self, interceptor: Arc<dyn InnerInterceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    pub fn add(&mut self, interceptor: Arc<dyn InnerInterceptor>) {
        self.interceptors.push(interceptor);
    }

    #[must_use]
    pub fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.interceptors.iter().map(|i| i.name()).collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// Rewrite every statement in `sql` and render the result.
    ///
    /// Multiple statements are joined with `"; "`.
    ///
    /// # Errors
    /// Parse failures and interceptor rejections.
    pub fn rewrite(&self, sql: &str, ctx: &InterceptContext<'_>) -> Result<String, InterceptError> {
        let statements = self.rewrite_statements(sql, ctx)?;
        let rendered: Vec<String> = statements.iter().map(ToString::to_string).collect();
        Ok(rendered.join("; "))
    }

    /// Like [`Self::rewrite`] but returns the rewritten AST.
    ///
    /// # Errors
    /// Parse failures and interceptor rejections.
    pub fn rewrite_statements(
        &self,
        sql: &str,
        ctx: &InterceptContext<'_>,
    ) -> Result<Vec<Statement>, InterceptError> {
        let dialect = self.dialect.parser_dialect();
        let mut statements = Parser::parse_sql(dialect.as_ref(), sql)?;
        for statement in &mut statements {
            let Some(kind) = StatementKind::of(statement) else {
                tracing::trace!("statement passes through unchanged");
                continue;
            };
            for interceptor in &self.interceptors {
                interceptor.intercept(kind, statement, ctx)?;
            }
        }
        tracing::debug!(%sql, statements = statements.len(), "rewrote SQL");
        Ok(statements)
    }
}
