//! Rent report and material search.

use std::fmt::Write;

use database::{inventory, material, report, warehouse};
use tracing::info;

use super::{Controller, Screen, Turn};
use crate::error::Result;
use crate::format;
use crate::input::{parse_period, period_bounds};
use crate::keyboard::Keyboard;
use crate::sender::ChatSender;
use crate::state::Step;

pub(super) fn screen(step: &Step) -> Screen {
    match step {
        Step::MasterStockSearchByName => Screen::with(
            "🔎 Type part of a material name:",
            Keyboard::new().nav(),
        ),
        _ => Screen::with(
            "📊 Enter the period as DD.MM.YYYY-DD.MM.YYYY:",
            Keyboard::new().nav(),
        ),
    }
}

impl<S: ChatSender> Controller<S> {
    pub(super) async fn report_text(&self, turn: &Turn<'_>, text: &str) -> Result<()> {
        let (from, to) = parse_period(text)?;
        let (start, end) = period_bounds(from, to, self.settings.offset)?;
        let rows = report::rent_report(&self.pool, start, end).await?;
        info!(chat_id = turn.chat_id, %from, %to, users = rows.len(), "Rent report");

        self.finish(turn, &format::report(from, to, &rows), Keyboard::new())
            .await
    }

    /// Reply with consumables balances of matching materials. The step stays
    /// open for another search.
    pub(super) async fn search_text(&self, turn: &Turn<'_>, text: &str) -> Result<()> {
        let found = material::search_materials(&self.pool, text).await?;
        if found.is_empty() {
            self.sender
                .send_text(turn.chat_id, "Nothing found.")
                .await?;
            return Ok(());
        }

        let w = warehouse::consumables_warehouse(&self.pool).await?;
        let ids: Vec<i64> = found.iter().map(|m| m.id).collect();
        let lines = inventory::stock_lines_for(&self.pool, w.id, &ids).await?;

        let mut out = format!("📦 {}:\n", w.name);
        for line in &lines {
            let _ = writeln!(
                out,
                "• {}, {} per {}",
                format::stock_line(line),
                format::money(line.price),
                line.unit
            );
        }
        self.sender
            .send_text(turn.chat_id, out.trim_end())
            .await?;
        Ok(())
    }
}
