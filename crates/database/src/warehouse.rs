//! Warehouse operations.

use salon_core::WarehouseKind;
use sqlx::PgPool;

use crate::error::{DatabaseError, Result};
use crate::models::Warehouse;
use crate::validation::validate_name;

const ONE_CONSUMABLES: &str = "warehouses_one_active_consumables";

/// Map a write failure, telling a second active consumables warehouse apart
/// from a duplicate name.
fn conflict(e: sqlx::Error, name: &str) -> DatabaseError {
    let second_consumables = matches!(
        &e,
        sqlx::Error::Database(db_err) if db_err.constraint() == Some(ONE_CONSUMABLES)
    );
    if second_consumables {
        DatabaseError::unique(e, "Active consumables warehouse", name)
    } else {
        DatabaseError::unique(e, "Warehouse", name)
    }
}

/// Create a new warehouse.
///
/// At most one active consumables warehouse may exist.
pub async fn create_warehouse(pool: &PgPool, name: &str, kind: WarehouseKind) -> Result<Warehouse> {
    let name = validate_name("warehouse name", name)?;
    sqlx::query_as::<_, Warehouse>(
        r#"
        INSERT INTO warehouses (name, kind)
        VALUES ($1, $2)
        RETURNING id, name, kind, active
        "#,
    )
    .bind(&name)
    .bind(kind)
    .fetch_one(pool)
    .await
    .map_err(|e| conflict(e, &name))
}

/// Get a warehouse by ID.
pub async fn get_warehouse(pool: &PgPool, id: i64) -> Result<Warehouse> {
    sqlx::query_as::<_, Warehouse>(
        r#"
        SELECT id, name, kind, active
        FROM warehouses
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::not_found("Warehouse", id))
}

/// List warehouses, optionally only the active ones.
pub async fn list_warehouses(pool: &PgPool, only_active: bool) -> Result<Vec<Warehouse>> {
    let rows = sqlx::query_as::<_, Warehouse>(
        r#"
        SELECT id, name, kind, active
        FROM warehouses
        WHERE active OR NOT $1
        ORDER BY name
        "#,
    )
    .bind(only_active)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Rename a warehouse.
pub async fn rename_warehouse(pool: &PgPool, id: i64, name: &str) -> Result<Warehouse> {
    let name = validate_name("warehouse name", name)?;
    sqlx::query_as::<_, Warehouse>(
        r#"
        UPDATE warehouses SET name = $2
        WHERE id = $1
        RETURNING id, name, kind, active
        "#,
    )
    .bind(id)
    .bind(&name)
    .fetch_optional(pool)
    .await
    .map_err(|e| conflict(e, &name))?
    .ok_or_else(|| DatabaseError::not_found("Warehouse", id))
}

/// Flip the active flag.
pub async fn toggle_warehouse(pool: &PgPool, id: i64) -> Result<Warehouse> {
    sqlx::query_as::<_, Warehouse>(
        r#"
        UPDATE warehouses SET active = NOT active
        WHERE id = $1
        RETURNING id, name, kind, active
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(|e| conflict(e, &id.to_string()))?
    .ok_or_else(|| DatabaseError::not_found("Warehouse", id))
}

/// Change what a warehouse holds.
pub async fn set_warehouse_kind(pool: &PgPool, id: i64, kind: WarehouseKind) -> Result<Warehouse> {
    sqlx::query_as::<_, Warehouse>(
        r#"
        UPDATE warehouses SET kind = $2
        WHERE id = $1
        RETURNING id, name, kind, active
        "#,
    )
    .bind(id)
    .bind(kind)
    .fetch_optional(pool)
    .await
    .map_err(|e| conflict(e, &id.to_string()))?
    .ok_or_else(|| DatabaseError::not_found("Warehouse", id))
}

/// The active consumables warehouse the masters' flows address.
pub async fn consumables_warehouse(pool: &PgPool) -> Result<Warehouse> {
    sqlx::query_as::<_, Warehouse>(
        r#"
        SELECT id, name, kind, active
        FROM warehouses
        WHERE active AND kind = 'consumables'
        "#,
    )
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::not_found("Warehouse", "consumables"))
}
