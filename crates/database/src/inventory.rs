//! Stock balances and movements.
//!
//! Every public mutation runs in its own transaction: the balance upsert, the
//! movement row and (for costed receipts) the supply row commit together.
//! The `*_in` variants take an open connection so that callers composing a
//! larger transaction, such as the consumption confirm, can reuse them.

use salon_core::MovementKind;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};

use crate::error::Result;
use crate::models::{StockLine, Supply};
use crate::validation::{validate_non_negative, validate_positive};

/// Outcome of one balance write.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StockChange {
    pub warehouse_id: i64,
    pub material_id: i64,
    /// Signed delta applied.
    pub delta: f64,
    /// Balance after the write.
    pub qty: f64,
}

/// Apply a signed delta and append the matching movement.
///
/// Returns the change and the movement id.
pub(crate) async fn apply_delta_in(
    conn: &mut PgConnection,
    actor_id: i64,
    warehouse_id: i64,
    material_id: i64,
    delta: f64,
    note: &str,
) -> Result<(StockChange, i64)> {
    let qty = sqlx::query_scalar::<_, f64>(
        r#"
        INSERT INTO balances (warehouse_id, material_id, qty)
        VALUES ($1, $2, $3)
        ON CONFLICT (warehouse_id, material_id)
        DO UPDATE SET qty = balances.qty + EXCLUDED.qty, updated_at = now()
        RETURNING qty
        "#,
    )
    .bind(warehouse_id)
    .bind(material_id)
    .bind(delta)
    .fetch_one(&mut *conn)
    .await?;

    let kind = if delta > 0.0 {
        MovementKind::In
    } else {
        MovementKind::Out
    };

    let movement_id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO movements (actor_id, warehouse_id, material_id, qty, kind, note)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(actor_id)
    .bind(warehouse_id)
    .bind(material_id)
    .bind(delta)
    .bind(kind)
    .bind(note)
    .fetch_one(&mut *conn)
    .await?;

    tracing::debug!(
        warehouse_id,
        material_id,
        delta,
        balance = qty,
        "Stock movement recorded"
    );

    Ok((
        StockChange {
            warehouse_id,
            material_id,
            delta,
            qty,
        },
        movement_id,
    ))
}

/// Deduct `qty` inside an open transaction.
pub(crate) async fn consume_in(
    conn: &mut PgConnection,
    actor_id: i64,
    warehouse_id: i64,
    material_id: i64,
    qty: f64,
    note: &str,
) -> Result<StockChange> {
    validate_positive("qty", qty)?;
    let (change, _) = apply_delta_in(conn, actor_id, warehouse_id, material_id, -qty, note).await?;
    Ok(change)
}

async fn apply_delta(
    pool: &PgPool,
    actor_id: i64,
    warehouse_id: i64,
    material_id: i64,
    delta: f64,
    note: &str,
) -> Result<StockChange> {
    let mut tx = pool.begin().await?;
    let (change, _) =
        apply_delta_in(&mut tx, actor_id, warehouse_id, material_id, delta, note).await?;
    tx.commit().await?;
    Ok(change)
}

/// Add `qty` to a balance.
pub async fn receive(
    pool: &PgPool,
    actor_id: i64,
    warehouse_id: i64,
    material_id: i64,
    qty: f64,
    note: &str,
) -> Result<StockChange> {
    validate_positive("qty", qty)?;
    apply_delta(pool, actor_id, warehouse_id, material_id, qty, note).await
}

/// One costed line of a supply.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NewSupply {
    pub material_id: i64,
    pub qty: f64,
    pub unit_cost: f64,
}

async fn receive_with_cost_in(
    conn: &mut PgConnection,
    actor_id: i64,
    warehouse_id: i64,
    line: &NewSupply,
) -> Result<(StockChange, Supply)> {
    validate_positive("qty", line.qty)?;
    validate_non_negative("unit cost", line.unit_cost)?;

    let (change, movement_id) =
        apply_delta_in(conn, actor_id, warehouse_id, line.material_id, line.qty, "supply").await?;

    let supply = sqlx::query_as::<_, Supply>(
        r#"
        INSERT INTO supplies
            (actor_id, warehouse_id, material_id, movement_id, qty, unit_cost, total_cost)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, actor_id, warehouse_id, material_id, movement_id,
                  qty, unit_cost, total_cost, created_at
        "#,
    )
    .bind(actor_id)
    .bind(warehouse_id)
    .bind(line.material_id)
    .bind(movement_id)
    .bind(line.qty)
    .bind(line.unit_cost)
    .bind(line.qty * line.unit_cost)
    .fetch_one(&mut *conn)
    .await?;

    Ok((change, supply))
}

/// Add `qty` to a balance and record a supply with its cost.
pub async fn receive_with_cost(
    pool: &PgPool,
    actor_id: i64,
    warehouse_id: i64,
    material_id: i64,
    qty: f64,
    unit_cost: f64,
) -> Result<(StockChange, Supply)> {
    let line = NewSupply {
        material_id,
        qty,
        unit_cost,
    };
    let mut tx = pool.begin().await?;
    let received = receive_with_cost_in(&mut tx, actor_id, warehouse_id, &line).await?;
    tx.commit().await?;
    Ok(received)
}

/// Receive every line of a supply in one transaction. Nothing is written
/// unless all lines are.
pub async fn receive_supply(
    pool: &PgPool,
    actor_id: i64,
    warehouse_id: i64,
    lines: &[NewSupply],
) -> Result<Vec<(StockChange, Supply)>> {
    let mut tx = pool.begin().await?;
    let mut received = Vec::with_capacity(lines.len());
    for line in lines {
        received.push(receive_with_cost_in(&mut tx, actor_id, warehouse_id, line).await?);
    }
    tx.commit().await?;
    Ok(received)
}

/// Remove `qty` from a balance. The balance may go negative.
pub async fn write_off(
    pool: &PgPool,
    actor_id: i64,
    warehouse_id: i64,
    material_id: i64,
    qty: f64,
    note: &str,
) -> Result<StockChange> {
    validate_positive("qty", qty)?;
    apply_delta(pool, actor_id, warehouse_id, material_id, -qty, note).await
}

/// Deduct consumed material. The balance may go negative.
pub async fn consume(
    pool: &PgPool,
    actor_id: i64,
    warehouse_id: i64,
    material_id: i64,
    qty: f64,
    note: &str,
) -> Result<StockChange> {
    let mut tx = pool.begin().await?;
    let change = consume_in(&mut tx, actor_id, warehouse_id, material_id, qty, note).await?;
    tx.commit().await?;
    Ok(change)
}

/// Current balance, zero when no row exists.
pub async fn get_balance(pool: &PgPool, warehouse_id: i64, material_id: i64) -> Result<f64> {
    let qty = sqlx::query_scalar::<_, f64>(
        "SELECT qty FROM balances WHERE warehouse_id = $1 AND material_id = $2",
    )
    .bind(warehouse_id)
    .bind(material_id)
    .fetch_optional(pool)
    .await?;

    Ok(qty.unwrap_or(0.0))
}

/// Sum of all movement deltas for one pair.
pub async fn movement_total(pool: &PgPool, warehouse_id: i64, material_id: i64) -> Result<f64> {
    let total = sqlx::query_scalar::<_, f64>(
        r#"
        SELECT COALESCE(SUM(qty), 0)::double precision
        FROM movements
        WHERE warehouse_id = $1 AND material_id = $2
        "#,
    )
    .bind(warehouse_id)
    .bind(material_id)
    .fetch_one(pool)
    .await?;

    Ok(total)
}

const STOCK_SELECT: &str = r#"
    SELECT $1::bigint AS warehouse_id,
           m.id AS material_id,
           m.name AS material_name,
           c.name AS category_name,
           m.unit,
           m.price,
           COALESCE(b.qty, 0) AS qty
    FROM materials m
    JOIN categories c ON c.id = m.category_id
    LEFT JOIN balances b ON b.material_id = m.id AND b.warehouse_id = $1
"#;

/// Every active material with its balance in a warehouse.
pub async fn stock_lines(pool: &PgPool, warehouse_id: i64) -> Result<Vec<StockLine>> {
    let rows = sqlx::query_as::<_, StockLine>(&format!(
        "{STOCK_SELECT} WHERE m.active ORDER BY c.name, m.name"
    ))
    .bind(warehouse_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// One material with its balance in a warehouse.
pub async fn stock_line(pool: &PgPool, warehouse_id: i64, material_id: i64) -> Result<StockLine> {
    sqlx::query_as::<_, StockLine>(&format!("{STOCK_SELECT} WHERE m.id = $2"))
        .bind(warehouse_id)
        .bind(material_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| crate::DatabaseError::not_found("Material", material_id))
}

/// Stock lines for the given materials only.
pub async fn stock_lines_for(
    pool: &PgPool,
    warehouse_id: i64,
    material_ids: &[i64],
) -> Result<Vec<StockLine>> {
    let rows = sqlx::query_as::<_, StockLine>(&format!(
        "{STOCK_SELECT} WHERE m.id = ANY($2) ORDER BY m.name"
    ))
    .bind(warehouse_id)
    .bind(material_ids)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
