//! Consumption sessions, their items and invoices.

use salon_core::{Place, RentUnit};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::error::{DatabaseError, Result};
use crate::inventory::{consume_in, StockChange};
use crate::models::{ConsumptionItem, ConsumptionSession, Invoice};
use crate::subscription::add_usage_in;
use crate::validation::{validate_non_negative, validate_positive};

const SESSION_COLUMNS: &str = "id, user_id, place, unit, qty, with_sub, materials_sum, \
     rounded_materials_sum, rent, total, status, created_at, confirmed_at";

const INVOICE_COLUMNS: &str = "id, user_id, session_id, amount, status, created_at, paid_at";

/// A material line to consume.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NewItem {
    pub material_id: i64,
    pub qty: f64,
}

/// Subscription usage to record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub subscription_id: i64,
    pub qty: i32,
}

/// Everything the confirm step writes, with totals already priced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSession {
    pub user_id: i64,
    pub warehouse_id: i64,
    pub place: Place,
    pub unit: RentUnit,
    pub qty: i32,
    pub with_sub: bool,
    pub materials_sum: f64,
    pub rounded_materials_sum: f64,
    pub rent: f64,
    pub usages: Vec<Usage>,
    pub items: Vec<NewItem>,
}

impl NewSession {
    pub fn total(&self) -> f64 {
        self.rent + self.materials_sum
    }
}

/// Result of a committed confirm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Confirmed {
    pub session: ConsumptionSession,
    pub invoice: Invoice,
    pub items: Vec<ConsumptionItem>,
    /// Usages that did not fit their bucket and were skipped.
    pub shortfalls: Vec<Usage>,
    /// Balance writes, for low-stock checks after commit.
    pub stock: Vec<StockChange>,
}

/// Record a consumption session in one transaction.
///
/// The session is inserted as draft, subscription usage is added, stock is
/// deducted and items are priced at the current material price, the invoice
/// is created, and finally the session is marked confirmed. A usage that
/// would exceed its bucket is skipped and reported in `shortfalls`.
pub async fn confirm_session(pool: &PgPool, new: &NewSession) -> Result<Confirmed> {
    validate_positive("qty", f64::from(new.qty))?;
    validate_non_negative("materials sum", new.materials_sum)?;
    validate_non_negative("rent", new.rent)?;
    for item in &new.items {
        validate_positive("item qty", item.qty)?;
    }

    let mut tx = pool.begin().await?;

    let session_id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO consumption_sessions
            (user_id, place, unit, qty, with_sub, materials_sum,
             rounded_materials_sum, rent, total, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'draft')
        RETURNING id
        "#,
    )
    .bind(new.user_id)
    .bind(new.place)
    .bind(new.unit)
    .bind(new.qty)
    .bind(new.with_sub)
    .bind(new.materials_sum)
    .bind(new.rounded_materials_sum)
    .bind(new.rent)
    .bind(new.total())
    .fetch_one(&mut *tx)
    .await?;

    let mut shortfalls = Vec::new();
    for usage in &new.usages {
        if !add_usage_in(&mut tx, usage.subscription_id, usage.qty).await? {
            tracing::warn!(
                session_id,
                subscription_id = usage.subscription_id,
                qty = usage.qty,
                "Subscription usage exceeds limit, skipped"
            );
            shortfalls.push(*usage);
        }
    }

    let note = format!("consumption session #{session_id}");
    let mut stock = Vec::with_capacity(new.items.len());
    let mut items = Vec::with_capacity(new.items.len());
    for item in &new.items {
        let unit_price =
            sqlx::query_scalar::<_, f64>("SELECT price FROM materials WHERE id = $1")
                .bind(item.material_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| DatabaseError::not_found("Material", item.material_id))?;

        stock.push(
            consume_in(
                &mut tx,
                new.user_id,
                new.warehouse_id,
                item.material_id,
                item.qty,
                &note,
            )
            .await?,
        );

        let row = sqlx::query_as::<_, ConsumptionItem>(
            r#"
            INSERT INTO consumption_items (session_id, material_id, qty, unit_price, cost)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, session_id, material_id, qty, unit_price, cost
            "#,
        )
        .bind(session_id)
        .bind(item.material_id)
        .bind(item.qty)
        .bind(unit_price)
        .bind(item.qty * unit_price)
        .fetch_one(&mut *tx)
        .await?;
        items.push(row);
    }

    let invoice = sqlx::query_as::<_, Invoice>(&format!(
        r#"
        INSERT INTO invoices (user_id, session_id, amount)
        VALUES ($1, $2, $3)
        RETURNING {INVOICE_COLUMNS}
        "#
    ))
    .bind(new.user_id)
    .bind(session_id)
    .bind(new.total())
    .fetch_one(&mut *tx)
    .await?;

    let session = sqlx::query_as::<_, ConsumptionSession>(&format!(
        r#"
        UPDATE consumption_sessions
        SET status = 'confirmed', confirmed_at = now()
        WHERE id = $1
        RETURNING {SESSION_COLUMNS}
        "#
    ))
    .bind(session_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(
        session_id,
        invoice_id = invoice.id,
        user_id = new.user_id,
        total = session.total,
        "Consumption session confirmed"
    );

    Ok(Confirmed {
        session,
        invoice,
        items,
        shortfalls,
        stock,
    })
}

pub async fn get_session(pool: &PgPool, id: i64) -> Result<ConsumptionSession> {
    sqlx::query_as::<_, ConsumptionSession>(&format!(
        "SELECT {SESSION_COLUMNS} FROM consumption_sessions WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::not_found("Session", id))
}

pub async fn list_items(pool: &PgPool, session_id: i64) -> Result<Vec<ConsumptionItem>> {
    let rows = sqlx::query_as::<_, ConsumptionItem>(
        r#"
        SELECT id, session_id, material_id, qty, unit_price, cost
        FROM consumption_items
        WHERE session_id = $1
        ORDER BY id
        "#,
    )
    .bind(session_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn get_invoice(pool: &PgPool, id: i64) -> Result<Invoice> {
    sqlx::query_as::<_, Invoice>(&format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Invoice", id))
}

/// Mark an invoice paid. Paying twice keeps the first payment time.
pub async fn mark_invoice_paid(pool: &PgPool, id: i64) -> Result<Invoice> {
    sqlx::query_as::<_, Invoice>(&format!(
        r#"
        UPDATE invoices
        SET status = 'paid', paid_at = COALESCE(paid_at, now())
        WHERE id = $1
        RETURNING {INVOICE_COLUMNS}
        "#
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::not_found("Invoice", id))
}
