#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Rewritten statements executed against an in-memory SQLite database.

use std::sync::Arc;

use bootkit_data::tenant::{
    DefaultTenantLineHandler, TenantContext, TenantLineInterceptor, TenantTableRegistry,
};
use bootkit_data::{
    BlockAttackInterceptor, InterceptContext, InterceptError, SqlDialect, SqlInterceptor,
};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

async fn database() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    for ddl in [
        "CREATE TABLE orders (id INTEGER PRIMARY KEY, total INTEGER NOT NULL, tenant TEXT NOT NULL)",
        "CREATE TABLE order_items (id INTEGER PRIMARY KEY, order_id INTEGER NOT NULL, sku TEXT NOT NULL, tenant TEXT NOT NULL)",
        "CREATE TABLE lookup_codes (code TEXT PRIMARY KEY, label TEXT NOT NULL)",
    ] {
        sqlx::query(ddl).execute(&pool).await.unwrap();
    }
    pool
}

/// Registry derived from the live schema: tables with a `tenant` column.
async fn registry(pool: &SqlitePool) -> TenantTableRegistry {
    let rows: Vec<(String, String)> = sqlx::query_as(
        "SELECT m.name, p.name FROM sqlite_master m JOIN pragma_table_info(m.name) p \
         WHERE m.type = 'table'",
    )
    .fetch_all(pool)
    .await
    .unwrap();
    TenantTableRegistry::from_schema_rows(rows, "tenant")
}

fn pipeline(registry: TenantTableRegistry) -> SqlInterceptor {
    let handler = DefaultTenantLineHandler::new("tenant", Arc::new(registry));
    SqlInterceptor::new(SqlDialect::Sqlite)
        .with(Arc::new(BlockAttackInterceptor))
        .with(Arc::new(TenantLineInterceptor::new(Arc::new(handler))))
}

async fn exec(pool: &SqlitePool, sql: &SqlInterceptor, tenant: &str, stmt: &str) -> u64 {
    let ctx = TenantContext::new(tenant);
    let rewritten = sql
        .rewrite(stmt, &InterceptContext::with_tenant(&ctx))
        .unwrap();
    sqlx::query(&rewritten)
        .execute(pool)
        .await
        .unwrap()
        .rows_affected()
}

async fn count(pool: &SqlitePool, sql: &SqlInterceptor, tenant: &str, stmt: &str) -> i64 {
    let ctx = TenantContext::new(tenant);
    let rewritten = sql
        .rewrite(stmt, &InterceptContext::with_tenant(&ctx))
        .unwrap();
    let (n,): (i64,) = sqlx::query_as(&rewritten).fetch_one(pool).await.unwrap();
    n
}

#[tokio::test]
async fn schema_registry_marks_tenant_tables() {
    let pool = database().await;
    let registry = registry(&pool).await;
    assert_eq!(registry.enabled_tables(), vec!["order_items", "orders"]);
    assert_eq!(registry.lookup("lookup_codes"), Some(false));
}

#[tokio::test]
async fn tenants_only_see_their_own_rows() {
    let pool = database().await;
    let sql = pipeline(registry(&pool).await);

    exec(&pool, &sql, "t1", "INSERT INTO orders (id, total) VALUES (1, 10), (2, 20)").await;
    exec(&pool, &sql, "t2", "INSERT INTO orders (id, total) VALUES (3, 30)").await;
    exec(&pool, &sql, "t1", "INSERT INTO lookup_codes (code, label) VALUES ('a', 'A')").await;

    assert_eq!(count(&pool, &sql, "t1", "SELECT COUNT(*) FROM orders").await, 2);
    assert_eq!(count(&pool, &sql, "t2", "SELECT COUNT(*) FROM orders").await, 1);
    assert_eq!(count(&pool, &sql, "t3", "SELECT COUNT(*) FROM orders").await, 0);
    // non-tenant tables are shared
    assert_eq!(count(&pool, &sql, "t2", "SELECT COUNT(*) FROM lookup_codes").await, 1);

    let stored: Vec<(i64, String)> = sqlx::query_as("SELECT id, tenant FROM orders ORDER BY id")
        .fetch_all(&pool)
        .await
        .unwrap();
    assert_eq!(
        stored,
        vec![
            (1, "t1".to_owned()),
            (2, "t1".to_owned()),
            (3, "t2".to_owned())
        ]
    );
}

#[tokio::test]
async fn writes_cannot_cross_tenants() {
    let pool = database().await;
    let sql = pipeline(registry(&pool).await);

    exec(&pool, &sql, "t1", "INSERT INTO orders (id, total) VALUES (1, 10)").await;
    exec(&pool, &sql, "t2", "INSERT INTO orders (id, total) VALUES (2, 20)").await;

    let updated = exec(&pool, &sql, "t2", "UPDATE orders SET total = 0 WHERE id = 1 OR id = 2").await;
    assert_eq!(updated, 1);
    let deleted = exec(&pool, &sql, "t2", "DELETE FROM orders WHERE id > 0").await;
    assert_eq!(deleted, 1);

    let (total,): (i64,) = sqlx::query_as("SELECT total FROM orders WHERE id = 1")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(total, 10);
}

#[tokio::test]
async fn joins_only_match_rows_of_the_same_tenant() {
    let pool = database().await;
    let sql = pipeline(registry(&pool).await);

    exec(&pool, &sql, "t1", "INSERT INTO orders (id, total) VALUES (1, 10)").await;
    exec(&pool, &sql, "t1", "INSERT INTO order_items (id, order_id, sku) VALUES (1, 1, 'A')").await;
    // an item from another tenant pointing at the same order id
    exec(&pool, &sql, "t2", "INSERT INTO order_items (id, order_id, sku) VALUES (2, 1, 'B')").await;

    let n = count(
        &pool,
        &sql,
        "t1",
        "SELECT COUNT(*) FROM orders o LEFT JOIN order_items i ON i.order_id = o.id",
    )
    .await;
    assert_eq!(n, 1);
}

#[tokio::test]
async fn missing_tenant_and_full_table_writes_are_rejected() {
    let pool = database().await;
    let sql = pipeline(registry(&pool).await);

    let err = sql
        .rewrite("SELECT * FROM orders", &InterceptContext::new())
        .unwrap_err();
    assert!(matches!(err, InterceptError::Tenant(_)));

    let ctx = TenantContext::new("t1");
    let err = sql
        .rewrite("DELETE FROM orders", &InterceptContext::with_tenant(&ctx))
        .unwrap_err();
    assert!(matches!(err, InterceptError::BlockedStatement { .. }));

    // no tenant is needed for shared tables
    sql.rewrite("SELECT * FROM lookup_codes", &InterceptContext::new())
        .unwrap();
}

#[tokio::test]
async fn upserts_and_scalar_subqueries_stay_within_the_tenant() {
    let pool = database().await;
    let sql = pipeline(registry(&pool).await);

    exec(&pool, &sql, "t1", "INSERT INTO orders (id, total) VALUES (1, 10)").await;
    exec(&pool, &sql, "t2", "INSERT INTO orders (id, total) VALUES (2, 20)").await;

    // id 1 belongs to t1, so t2's conflicting upsert changes nothing
    exec(
        &pool,
        &sql,
        "t2",
        "INSERT INTO orders (id, total) VALUES (1, 99) \
         ON CONFLICT (id) DO UPDATE SET total = excluded.total",
    )
    .await;
    exec(
        &pool,
        &sql,
        "t2",
        "INSERT INTO orders (id, total) VALUES (2, 21) \
         ON CONFLICT (id) DO UPDATE SET total = excluded.total",
    )
    .await;

    let stored: Vec<(i64, i64, String)> =
        sqlx::query_as("SELECT id, total, tenant FROM orders ORDER BY id")
            .fetch_all(&pool)
            .await
            .unwrap();
    assert_eq!(stored, vec![(1, 10, "t1".to_owned()), (2, 21, "t2".to_owned())]);

    let n = count(
        &pool,
        &sql,
        "t2",
        "SELECT COALESCE((SELECT COUNT(*) FROM orders), 0)",
    )
    .await;
    assert_eq!(n, 1);
}
