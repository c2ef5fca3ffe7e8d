//! Tenant-scoped order API backed by SQLite.
//!
//! Handlers write plain SQL; every statement goes through the configured
//! [`SqlInterceptor`] with the caller's tenant before it reaches the pool.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get};
use axum::{Json, Router};
use bootkit_autoconfigure::{GroupValidate, MethodValidationError, MethodValidator, RequestTenant};
use bootkit_data::tenant::TenantTableRegistry;
use bootkit_data::{InterceptContext, InterceptError, SqlInterceptor};
use bootkit_errors::catalog;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use validator::Validate;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS orders (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    quantity INTEGER NOT NULL,
    tenant TEXT NOT NULL
)";

const TABLE_COLUMNS: &str = "SELECT m.name, p.name FROM sqlite_master m \
    JOIN pragma_table_info(m.name) p \
    WHERE m.type = 'table' AND m.name NOT LIKE 'sqlite_%'";

/// Open the pool and create the schema.
///
/// # Errors
/// Connection or DDL failures.
pub async fn connect(url: &str) -> Result<SqlitePool, sqlx::Error> {
    // in-memory databases live per connection
    let max = if url.contains(":memory:") { 1 } else { 5 };
    let pool = SqlitePoolOptions::new()
        .max_connections(max)
        .connect(url)
        .await?;
    sqlx::query(SCHEMA).execute(&pool).await?;
    Ok(pool)
}

/// Tables that carry `tenant_column`, read from the live schema.
///
/// # Errors
/// Schema query failures.
pub async fn tenant_tables(
    pool: &SqlitePool,
    tenant_column: &str,
) -> Result<TenantTableRegistry, sqlx::Error> {
    let rows: Vec<(String, String)> = sqlx::query_as(TABLE_COLUMNS).fetch_all(pool).await?;
    let registry = TenantTableRegistry::from_schema_rows(rows, tenant_column);
    tracing::info!(tables = ?registry.enabled_tables(), "tenant tables discovered");
    Ok(registry)
}

#[derive(Clone)]
pub struct OrdersState {
    pool: SqlitePool,
    sql: Option<Arc<SqlInterceptor>>,
    validator: Option<Arc<MethodValidator>>,
}

impl OrdersState {
    #[must_use]
    pub fn new(
        pool: SqlitePool,
        sql: Option<SqlInterceptor>,
        validator: Option<MethodValidator>,
    ) -> Self {
        Self {
            pool,
            sql: sql.map(Arc::new),
            validator: validator.map(Arc::new),
        }
    }

    fn prepare(&self, sql: &str, tenant: &RequestTenant) -> Result<String, InterceptError> {
        match &self.sql {
            Some(interceptor) => interceptor.rewrite(sql, &InterceptContext::with_tenant(tenant)),
            None => Ok(sql.to_owned()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub name: String,
    pub quantity: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewOrder {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(range(min = 1, max = 10_000))]
    pub quantity: i64,
}

impl GroupValidate for NewOrder {}

#[derive(Debug, thiserror::Error)]
pub enum OrdersError {
    #[error(transparent)]
    Validation(#[from] MethodValidationError),
    #[error("order {0} not found")]
    NotFound(i64),
    #[error("statement rejected: {0}")]
    Rewrite(#[from] InterceptError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl IntoResponse for OrdersError {
    fn into_response(self) -> Response {
        match self {
            Self::Validation(err) => err.into_response(),
            Self::NotFound(id) => catalog::NOT_FOUND
                .as_problem(format!("order {id} not found"))
                .into_response(),
            Self::Rewrite(err) => {
                tracing::error!(error = %err, "SQL rewrite failed");
                catalog::INTERNAL.as_problem("statement rejected").into_response()
            }
            Self::Database(err) => {
                tracing::error!(error = %err, "database failure");
                catalog::INTERNAL.as_problem("database failure").into_response()
            }
        }
    }
}

async fn list_orders(
    State(state): State<OrdersState>,
    tenant: RequestTenant,
) -> Result<Json<Vec<Order>>, OrdersError> {
    let sql = state.prepare("SELECT id, name, quantity FROM orders ORDER BY id", &tenant)?;
    let rows: Vec<(i64, String, i64)> = sqlx::query_as(&sql).fetch_all(&state.pool).await?;
    Ok(Json(
        rows.into_iter()
            .map(|(id, name, quantity)| Order { id, name, quantity })
            .collect(),
    ))
}

async fn create_order(
    State(state): State<OrdersState>,
    tenant: RequestTenant,
    Json(input): Json<NewOrder>,
) -> Result<(StatusCode, Json<Order>), OrdersError> {
    if let Some(validator) = &state.validator {
        validator.validate("orders::create", &input)?;
    }
    let sql = state.prepare("INSERT INTO orders (name, quantity) VALUES (?, ?)", &tenant)?;
    let done = sqlx::query(&sql)
        .bind(&input.name)
        .bind(input.quantity)
        .execute(&state.pool)
        .await?;
    let order = Order {
        id: done.last_insert_rowid(),
        name: input.name,
        quantity: input.quantity,
    };
    tracing::debug!(id = order.id, "order created");
    Ok((StatusCode::CREATED, Json(order)))
}

async fn delete_order(
    State(state): State<OrdersState>,
    tenant: RequestTenant,
    Path(id): Path<i64>,
) -> Result<StatusCode, OrdersError> {
    let sql = state.prepare("DELETE FROM orders WHERE id = ?", &tenant)?;
    let done = sqlx::query(&sql).bind(id).execute(&state.pool).await?;
    if done.rows_affected() == 0 {
        return Err(OrdersError::NotFound(id));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub fn router(state: OrdersState) -> Router {
    Router::new()
        .route("/api/orders", get(list_orders).post(create_order))
        .route("/api/orders/{id}", delete(delete_order))
        .with_state(state)
}
