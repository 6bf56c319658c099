//! Monthly subscription buckets.

use salon_core::{Place, RentUnit};
use sqlx::{PgConnection, PgPool};

use crate::error::{DatabaseError, Result};
use crate::models::Subscription;
use crate::validation::{validate_month, validate_positive};

const COLUMNS: &str =
    "id, user_id, place, unit, month, plan_limit, total_qty, used_qty, created_at";

/// Add `qty` to the bucket `(user, place, unit, month, plan_limit)`, creating it if absent.
pub async fn add_or_create_total(
    pool: &PgPool,
    user_id: i64,
    place: Place,
    unit: RentUnit,
    month: &str,
    plan_limit: i32,
    qty: i32,
) -> Result<Subscription> {
    validate_month(month)?;
    validate_positive("plan limit", f64::from(plan_limit))?;
    validate_positive("qty", f64::from(qty))?;

    let sub = sqlx::query_as::<_, Subscription>(&format!(
        r#"
        INSERT INTO subscriptions (user_id, place, unit, month, plan_limit, total_qty)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (user_id, place, unit, month, plan_limit)
        DO UPDATE SET total_qty = subscriptions.total_qty + EXCLUDED.total_qty
        RETURNING {COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(place)
    .bind(unit)
    .bind(month)
    .bind(plan_limit)
    .bind(qty)
    .fetch_one(pool)
    .await?;

    tracing::info!(
        user_id,
        %place,
        month,
        total = sub.total_qty,
        "Subscription topped up"
    );

    Ok(sub)
}

/// Buckets with quantity left, oldest first.
pub async fn list_active(
    pool: &PgPool,
    user_id: i64,
    place: Place,
    unit: RentUnit,
    month: &str,
) -> Result<Vec<Subscription>> {
    let rows = sqlx::query_as::<_, Subscription>(&format!(
        r#"
        SELECT {COLUMNS}
        FROM subscriptions
        WHERE user_id = $1 AND place = $2 AND unit = $3 AND month = $4
          AND used_qty < total_qty
        ORDER BY created_at, id
        "#
    ))
    .bind(user_id)
    .bind(place)
    .bind(unit)
    .bind(month)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// All of a user's buckets for a month, exhausted ones included.
pub async fn list_for_month(pool: &PgPool, user_id: i64, month: &str) -> Result<Vec<Subscription>> {
    let rows = sqlx::query_as::<_, Subscription>(&format!(
        r#"
        SELECT {COLUMNS}
        FROM subscriptions
        WHERE user_id = $1 AND month = $2
        ORDER BY place, created_at, id
        "#
    ))
    .bind(user_id)
    .bind(month)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn get_subscription(pool: &PgPool, id: i64) -> Result<Subscription> {
    let mut conn = pool.acquire().await?;
    get_subscription_in(&mut conn, id).await
}

async fn get_subscription_in(conn: &mut PgConnection, id: i64) -> Result<Subscription> {
    sqlx::query_as::<_, Subscription>(&format!("SELECT {COLUMNS} FROM subscriptions WHERE id = $1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Subscription", id))
}

/// Conditionally add usage inside an open transaction.
///
/// Returns `false` without writing when `used + qty` would exceed the total,
/// so the surrounding transaction stays usable.
pub(crate) async fn add_usage_in(conn: &mut PgConnection, id: i64, qty: i32) -> Result<bool> {
    validate_positive("qty", f64::from(qty))?;
    let result = sqlx::query(
        r#"
        UPDATE subscriptions SET used_qty = used_qty + $2
        WHERE id = $1 AND used_qty + $2 <= total_qty
        "#,
    )
    .bind(id)
    .bind(qty)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Add usage to a bucket; fails with `InsufficientLimit` when it does not fit.
pub async fn add_usage(pool: &PgPool, id: i64, qty: i32) -> Result<Subscription> {
    let mut conn = pool.acquire().await?;
    if add_usage_in(&mut conn, id, qty).await? {
        return get_subscription_in(&mut conn, id).await;
    }

    let sub = get_subscription_in(&mut conn, id).await?;
    Err(DatabaseError::InsufficientLimit {
        subscription_id: id,
        requested: qty,
        left: sub.left(),
    })
}
