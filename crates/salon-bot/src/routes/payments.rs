//! Payment stub: following the invoice link marks the invoice paid.

use axum::extract::{Query, State};
use axum::response::Html;
use database::consumption;
use serde::Deserialize;
use tracing::info;

use crate::error::{AppError, Result};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PayQuery {
    pub invoice: Option<String>,
}

/// Invoice id from the query string. Must be a positive integer.
pub fn invoice_id(query: &PayQuery) -> Result<i64> {
    let raw = query
        .invoice
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest("missing invoice id".into()))?;
    match raw.parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(AppError::BadRequest(format!("invalid invoice id: {raw}"))),
    }
}

pub async fn pay(
    State(state): State<AppState>,
    Query(query): Query<PayQuery>,
) -> Result<Html<String>> {
    let id = invoice_id(&query)?;
    let invoice = consumption::mark_invoice_paid(state.db.pool(), id).await?;
    info!(invoice_id = invoice.id, amount = invoice.amount, "Invoice paid");

    Ok(Html(format!(
        "<!doctype html>\n<html><head><meta charset=\"utf-8\"><title>Invoice #{id}</title></head>\
         <body><h1>Invoice #{id} is paid</h1><p>Amount: {amount:.2}</p></body></html>\n",
        id = invoice.id,
        amount = invoice.amount
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(invoice: Option<&str>) -> PayQuery {
        PayQuery {
            invoice: invoice.map(str::to_string),
        }
    }

    #[test]
    fn test_invoice_id() {
        assert_eq!(invoice_id(&query(Some("15"))).unwrap(), 15);
        assert_eq!(invoice_id(&query(Some(" 7 "))).unwrap(), 7);
        assert!(matches!(invoice_id(&query(None)), Err(AppError::BadRequest(_))));
        assert!(matches!(invoice_id(&query(Some("0"))), Err(AppError::BadRequest(_))));
        assert!(matches!(invoice_id(&query(Some("1e3"))), Err(AppError::BadRequest(_))));
    }
}
