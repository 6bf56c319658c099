//! Text rendering for chat messages.

use std::fmt::Write;

use chrono::NaiveDate;
use database::{RentReportRow, StockLine, Subscription, User};
use salon_core::{Quote, RateTier};

use crate::state::{CartLine, ConsDraft};

pub fn money(value: f64) -> String {
    format!("{value:.2}")
}

/// Quantity without trailing zeros: `5`, `12.5`, `0.125`.
pub fn qty(value: f64) -> String {
    let text = format!("{value:.3}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

pub fn stock_line(line: &StockLine) -> String {
    format!(
        "{} ({}): {} {}",
        line.material_name,
        line.category_name,
        qty(line.qty),
        line.unit
    )
}

pub fn user_card(user: &User) -> String {
    format!(
        "👤 {}\nRole: {}\nStatus: {}\nChat: {}",
        user.name,
        user.role.label(),
        user.status,
        user.chat_id
    )
}

pub fn cart(lines: &[CartLine]) -> String {
    if lines.is_empty() {
        return "The cart is empty.".to_string();
    }

    let mut out = String::from("🚚 Supply cart:\n");
    for (i, line) in lines.iter().enumerate() {
        let _ = writeln!(
            out,
            "{}. {}: {} {} × {} = {}",
            i + 1,
            line.name,
            qty(line.qty),
            line.unit,
            money(line.unit_cost),
            money(line.total())
        );
    }
    let total: f64 = lines.iter().map(CartLine::total).sum();
    let _ = write!(out, "Total: {}", money(total));
    out
}

pub fn draft(draft: &ConsDraft) -> String {
    let mut out = format!(
        "🧾 {} · {} {}\n",
        draft.place.label(),
        draft.qty,
        draft.unit().label()
    );
    if draft.items.is_empty() {
        out.push_str("No materials yet.");
        return out;
    }
    for item in &draft.items {
        let _ = writeln!(
            out,
            "• {}: {} {} × {} = {}",
            item.name,
            qty(item.qty),
            item.unit,
            money(item.price),
            money(item.cost())
        );
    }
    let _ = write!(out, "Materials: {}", money(draft.materials_sum()));
    out
}

/// The pre-confirmation summary of a priced session.
pub fn summary(d: &ConsDraft, quote: &Quote) -> String {
    let unit = d.unit().label();
    let mut out = draft(d);
    out.push_str("\n\nRent:\n");

    for part in &quote.parts {
        let kind = if part.with_sub {
            "subscription"
        } else {
            "no subscription"
        };
        let mark = if part.threshold_met { "✓" } else { "✗" };
        let _ = writeln!(
            out,
            "• {} {} ({kind}) × {} = {}  [materials {}/{} {mark}]",
            part.qty,
            unit,
            money(part.rate),
            money(part.rent),
            money(part.materials_used),
            money(part.need)
        );
    }

    let _ = write!(
        out,
        "\nMaterials: {} (counted {}, needed {})\nRent: {}\nTotal: {}",
        money(quote.materials_sum),
        money(quote.rounded_materials),
        money(quote.needed_total),
        money(quote.rent_total),
        money(quote.total())
    );
    out
}

pub fn subscriptions(month: &str, subs: &[Subscription]) -> String {
    if subs.is_empty() {
        return format!("No subscriptions for {month}.");
    }

    let mut out = format!("📅 Subscriptions for {month}:\n");
    for sub in subs {
        let _ = writeln!(
            out,
            "• {} {} (plan {}): total {}, used {}, left {}",
            sub.place.label(),
            sub.unit.label(),
            sub.plan_limit,
            sub.total_qty,
            sub.used_qty,
            sub.left()
        );
    }
    out.trim_end().to_string()
}

pub fn tier(tier: &RateTier) -> String {
    let state = if tier.active { "" } else { " (inactive)" };
    format!(
        "{} {}: threshold {}/{}, with materials {}, own {}{state}",
        tier.range_label(),
        tier.unit.label(),
        money(tier.threshold),
        tier.unit.label(),
        money(tier.price_with),
        money(tier.price_own)
    )
}

pub fn report(from: NaiveDate, to: NaiveDate, rows: &[RentReportRow]) -> String {
    let period = format!("{} – {}", from.format("%d.%m.%Y"), to.format("%d.%m.%Y"));
    if rows.is_empty() {
        return format!("📊 {period}\nNo confirmed sessions.");
    }

    let mut out = format!("📊 Rent report {period}\n");
    let (mut sessions, mut units, mut rent, mut materials, mut total) = (0, 0, 0.0, 0.0, 0.0);
    for row in rows {
        let _ = writeln!(
            out,
            "• {}: {} sessions, qty {}, rent {}, materials {}, total {}",
            row.user_name,
            row.sessions,
            row.qty,
            money(row.rent),
            money(row.materials),
            money(row.total)
        );
        sessions += row.sessions;
        units += row.qty;
        rent += row.rent;
        materials += row.materials;
        total += row.total;
    }
    let _ = write!(
        out,
        "\nAll: {sessions} sessions, qty {units}, rent {}, materials {}, total {}",
        money(rent),
        money(materials),
        money(total)
    );
    out
}
