use std::fmt;

use serde::{Deserialize, Serialize};
use sqlparser::ast::{Expr, Value};
use uuid::Uuid;

/// Tenant identifier as it is stored in the tenant column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TenantValue {
    Number(i64),
    Uuid(Uuid),
    Text(String),
}

impl TenantValue {
    /// SQL literal for this value: `'t1'`, `42`, `'6f1c...'`.
    #[must_use]
    pub fn to_expr(&self) -> Expr {
        match self {
            Self::Text(s) => Expr::Value(Value::SingleQuotedString(s.clone())),
            Self::Number(n) => Expr::Value(Value::Number(n.to_string(), false)),
            Self::Uuid(u) => Expr::Value(Value::SingleQuotedString(u.to_string())),
        }
    }
}

impl fmt::Display for TenantValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
            Self::Uuid(u) => write!(f, "{u}"),
        }
    }
}

impl From<&str> for TenantValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for TenantValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for TenantValue {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<Uuid> for TenantValue {
    fn from(value: Uuid) -> Self {
        Self::Uuid(value)
    }
}

/// The active tenant for one request or operation.
///
/// Created at request entry, read-only afterwards, and passed by reference
/// into SQL rewriting. It is never stored in globals or task-locals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantContext {
    tenant: TenantValue,
}

impl TenantContext {
    #[must_use]
    pub fn new(tenant: impl Into<TenantValue>) -> Self {
        Self {
            tenant: tenant.into(),
        }
    }

    #[must_use]
    pub fn tenant(&self) -> &TenantValue {
        &self.tenant
    }
}

/// Lazily yields the current tenant.
///
/// Only consulted when a statement touches a tenant-scoped table.
pub trait TenantSupplier: Send + Sync {
    fn current_tenant(&self) -> Option<TenantValue>;
}

impl TenantSupplier for TenantContext {
    fn current_tenant(&self) -> Option<TenantValue> {
        Some(self.tenant.clone())
    }
}

impl<T: TenantSupplier> TenantSupplier for Option<T> {
    fn current_tenant(&self) -> Option<TenantValue> {
        self.as_ref().and_then(TenantSupplier::current_tenant)
    }
}

/// Adapts a closure into a [`TenantSupplier`].
pub struct FnTenantSupplier<F>(pub F);

impl<F> TenantSupplier for FnTenantSupplier<F>
where
    F: Fn() -> Option<TenantValue> + Send + Sync,
{
    fn current_tenant(&self) -> Option<TenantValue> {
        (self.0)()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn literals_render_per_kind() {
        assert_eq!(TenantValue::from("t1").to_expr().to_string(), "'t1'");
        assert_eq!(TenantValue::from(42).to_expr().to_string(), "42");
        let id = Uuid::nil();
        assert_eq!(
            TenantValue::from(id).to_expr().to_string(),
            "'00000000-0000-0000-0000-000000000000'"
        );
    }

    #[test]
    fn quotes_are_escaped_in_text_literals() {
        assert_eq!(TenantValue::from("o'hara").to_expr().to_string(), "'o''hara'");
    }

    #[test]
    fn untagged_serde_prefers_numbers_then_uuids() {
        let n: TenantValue = serde_json::from_str("7").unwrap();
        assert_eq!(n, TenantValue::Number(7));
        let u: TenantValue =
            serde_json::from_str("\"00000000-0000-0000-0000-000000000000\"").unwrap();
        assert_eq!(u, TenantValue::Uuid(Uuid::nil()));
        let t: TenantValue = serde_json::from_str("\"acme\"").unwrap();
        assert_eq!(t, TenantValue::Text("acme".to_owned()));
    }

    #[test]
    fn suppliers() {
        let ctx = TenantContext::new("t1");
        assert_eq!(ctx.current_tenant(), Some(TenantValue::from("t1")));

        let none: Option<TenantContext> = None;
        assert_eq!(none.current_tenant(), None);

        let f = FnTenantSupplier(|| Some(TenantValue::from(9)));
        assert_eq!(f.current_tenant(), Some(TenantValue::Number(9)));
    }
}
