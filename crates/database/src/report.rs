//! Aggregates over confirmed consumption sessions.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::error::Result;
use crate::models::RentReportRow;

/// Per-user totals of sessions confirmed in `[from, to)`, by user name.
pub async fn rent_report(
    pool: &PgPool,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<RentReportRow>> {
    let rows = sqlx::query_as::<_, RentReportRow>(
        r#"
        SELECT u.id AS user_id,
               u.name AS user_name,
               COUNT(*) AS sessions,
               COALESCE(SUM(s.qty), 0)::bigint AS qty,
               COALESCE(SUM(s.rent), 0)::double precision AS rent,
               COALESCE(SUM(s.materials_sum), 0)::double precision AS materials,
               COALESCE(SUM(s.total), 0)::double precision AS total
        FROM consumption_sessions s
        JOIN users u ON u.id = s.user_id
        WHERE s.status = 'confirmed'
          AND s.created_at >= $1 AND s.created_at < $2
        GROUP BY u.id, u.name
        ORDER BY u.name, u.id
        "#,
    )
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
