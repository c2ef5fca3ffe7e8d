use std::collections::HashMap;

/// Answers whether a table carries the tenant column.
pub trait TenantTableService: Send + Sync {
    fn is_tenant_table(&self, table: &str) -> bool;
}

/// Static `table -> enabled` lookup built once at startup.
///
/// Names are matched case-insensitively on the unqualified, unquoted table
/// name; `"Sales"."Orders"` and `orders` hit the same entry. Unknown tables
/// are not tenant tables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TenantTableRegistry {
    tables: HashMap<String, bool>,
}

fn normalize_table(name: &str) -> String {
    let last = name.rsplit('.').next().unwrap_or(name);
    last.trim_matches(|c| matches!(c, '"' | '`' | '[' | ']'))
        .to_lowercase()
}

impl TenantTableRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_table(mut self, table: &str, enabled: bool) -> Self {
        self.insert(table, enabled);
        self
    }

    pub fn insert(&mut self, table: &str, enabled: bool) {
        self.tables.insert(normalize_table(table), enabled);
    }

    /// Build from schema metadata rows of `(table, column)`.
    ///
    /// Every table that has a column named `tenant_column` is enabled; every
    /// other table seen in the rows is registered as disabled.
    #[must_use]
    pub fn from_schema_rows<I, T, C>(rows: I, tenant_column: &str) -> Self
    where
        I: IntoIterator<Item = (T, C)>,
        T: AsRef<str>,
        C: AsRef<str>,
    {
        let mut tables: HashMap<String, bool> = HashMap::new();
        for (table, column) in rows {
            let has_tenant = column.as_ref().eq_ignore_ascii_case(tenant_column);
            let entry = tables.entry(normalize_table(table.as_ref())).or_default();
            *entry |= has_tenant;
        }
        Self { tables }
    }

    /// `Some(enabled)` for registered tables, `None` for unknown ones.
    #[must_use]
    pub fn lookup(&self, table: &str) -> Option<bool> {
        self.tables.get(&normalize_table(table)).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Enabled table names, sorted.
    #[must_use]
    pub fn enabled_tables(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .tables
            .iter()
            .filter(|(_, enabled)| **enabled)
            .map(|(name, _)| name.as_str())
            .collect();
        names.sort_unstable();
        names
    }
}

impl<S: AsRef<str>> FromIterator<(S, bool)> for TenantTableRegistry {
    fn from_iter<I: IntoIterator<Item = (S, bool)>>(iter: I) -> Self {
        let mut registry = Self::new();
        for (table, enabled) in iter {
            registry.insert(table.as_ref(), enabled);
        }
        registry
    }
}

impl TenantTableService for TenantTableRegistry {
    fn is_tenant_table(&self, table: &str) -> bool {
        self.lookup(table).unwrap_or(false)
    }
}
