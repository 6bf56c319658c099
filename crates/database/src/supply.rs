//! Supply history queries. Rows are written by [`crate::inventory::receive_supply`].

use sqlx::PgPool;

use crate::error::Result;
use crate::models::{Supply, SupplyLine};

/// Supplies received into a warehouse, newest first.
pub async fn list_supplies(pool: &PgPool, warehouse_id: i64) -> Result<Vec<SupplyLine>> {
    let rows = sqlx::query_as::<_, SupplyLine>(
        r#"
        SELECT s.id, s.created_at, s.material_id, m.name AS material_name, m.unit,
               s.qty, s.unit_cost, s.total_cost, u.name AS actor_name
        FROM supplies s
        JOIN materials m ON m.id = s.material_id
        JOIN users u ON u.id = s.actor_id
        WHERE s.warehouse_id = $1
        ORDER BY s.created_at DESC, s.id DESC
        "#,
    )
    .bind(warehouse_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Raw supply rows for one material in one warehouse.
pub async fn supplies_for_material(
    pool: &PgPool,
    warehouse_id: i64,
    material_id: i64,
) -> Result<Vec<Supply>> {
    let rows = sqlx::query_as::<_, Supply>(
        r#"
        SELECT id, actor_id, warehouse_id, material_id, movement_id,
               qty, unit_cost, total_cost, created_at
        FROM supplies
        WHERE warehouse_id = $1 AND material_id = $2
        ORDER BY id
        "#,
    )
    .bind(warehouse_id)
    .bind(material_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
