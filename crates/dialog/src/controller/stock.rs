//! Stock viewing, manual adjustments and stock files.

use database::{inventory, warehouse};
use sheets::StockRow;
use tracing::info;

use super::{stale, use_buttons, Controller, Screen, Turn};
use crate::callback::Callback;
use crate::error::{DialogError, Result};
use crate::format;
use crate::import::{self, Adjustment};
use crate::input::parse_qty;
use crate::keyboard::{Button, Keyboard};
use crate::sender::ChatSender;
use crate::state::Step;

impl<S: ChatSender> Controller<S> {
    pub(super) async fn stock_screen(&self, step: &Step) -> Result<Screen> {
        let screen = match step {
            Step::StockMenu => Screen::with(
                "📦 Stock",
                Keyboard::new()
                    .button("👁 View", Callback::StockView)
                    .row(vec![
                        Button::callback("📤 Export", Callback::StockExport),
                        Button::callback("📥 Import", Callback::StockImport),
                    ])
                    .nav(),
            ),
            Step::StockPickWh => {
                let buttons = self.warehouse_buttons(Callback::StockWarehouse).await?;
                Screen::with("Pick a warehouse:", Keyboard::new().grid(buttons, 1).nav())
            }
            Step::StockExportPickWh => {
                let buttons = self.warehouse_buttons(Callback::StockExportWarehouse).await?;
                Screen::with(
                    "Export stock of which warehouse?",
                    Keyboard::new().grid(buttons, 1).nav(),
                )
            }
            Step::StockList { warehouse_id } => {
                let w = warehouse::get_warehouse(&self.pool, *warehouse_id).await?;
                let lines = inventory::stock_lines(&self.pool, w.id).await?;
                let mut text = format!("📦 {}\n", w.name);
                if lines.is_empty() {
                    text.push_str("No materials.");
                }
                for line in &lines {
                    text.push('\n');
                    text.push_str(&format::stock_line(line));
                }
                let buttons = lines
                    .iter()
                    .map(|l| Button::callback(&l.material_name, Callback::StockItem(l.material_id)))
                    .collect();
                Screen::with(text, Keyboard::new().grid(buttons, 2).nav())
            }
            Step::StockItem {
                warehouse_id,
                material_id,
            } => {
                let line = inventory::stock_line(&self.pool, *warehouse_id, *material_id).await?;
                Screen::with(
                    format!(
                        "{}\nPrice: {} per {}",
                        format::stock_line(&line),
                        format::money(line.price),
                        line.unit
                    ),
                    Keyboard::new()
                        .row(vec![
                            Button::callback("➕ Receive", Callback::StockIn),
                            Button::callback("➖ Write off", Callback::StockOut),
                        ])
                        .nav(),
                )
            }
            Step::StockInQty {
                warehouse_id,
                material_id,
            }
            | Step::StockOutQty {
                warehouse_id,
                material_id,
            } => {
                let line = inventory::stock_line(&self.pool, *warehouse_id, *material_id).await?;
                let verb = if matches!(step, Step::StockInQty { .. }) {
                    "receive"
                } else {
                    "write off"
                };
                Screen::with(
                    format!("How much {} to {verb} ({})?", line.material_name, line.unit),
                    Keyboard::new().nav(),
                )
            }
            Step::StockImportFile => Screen::with(
                "Send the stock .xlsx file. Export a warehouse first to get the layout; \
                 an empty qty cell means zero.",
                Keyboard::new().nav(),
            ),
            other => return Err(DialogError::protocol(other.name())),
        };
        Ok(screen)
    }

    pub(super) async fn stock_button(&self, turn: &Turn<'_>, cb: Callback) -> Result<()> {
        match (turn.step(), cb) {
            (Step::StockMenu, Callback::StockView) => self.enter(turn, Step::StockPickWh).await,
            (Step::StockMenu, Callback::StockExport) => {
                self.enter(turn, Step::StockExportPickWh).await
            }
            (Step::StockMenu, Callback::StockImport) => {
                self.enter(turn, Step::StockImportFile).await
            }
            (Step::StockPickWh, Callback::StockWarehouse(warehouse_id)) => {
                self.enter(turn, Step::StockList { warehouse_id }).await
            }
            (Step::StockExportPickWh, Callback::StockExportWarehouse(warehouse_id)) => {
                self.export_stock(turn, warehouse_id).await?;
                self.enter(turn, Step::StockMenu).await
            }
            (Step::StockList { warehouse_id }, Callback::StockItem(material_id)) => {
                let step = Step::StockItem {
                    warehouse_id: *warehouse_id,
                    material_id,
                };
                self.enter(turn, step).await
            }
            (
                Step::StockItem {
                    warehouse_id,
                    material_id,
                },
                Callback::StockIn | Callback::StockOut,
            ) => {
                let (warehouse_id, material_id) = (*warehouse_id, *material_id);
                let step = if cb == Callback::StockIn {
                    Step::StockInQty {
                        warehouse_id,
                        material_id,
                    }
                } else {
                    Step::StockOutQty {
                        warehouse_id,
                        material_id,
                    }
                };
                self.enter(turn, step).await
            }
            _ => Err(stale(turn, cb)),
        }
    }

    pub(super) async fn stock_text(&self, turn: &Turn<'_>, text: &str) -> Result<()> {
        let (change, warehouse_id, material_id) = match turn.step() {
            Step::StockInQty {
                warehouse_id,
                material_id,
            } => {
                let qty = parse_qty(text)?;
                let change = inventory::receive(
                    &self.pool,
                    turn.user.id,
                    *warehouse_id,
                    *material_id,
                    qty,
                    "manual receipt",
                )
                .await?;
                (change, *warehouse_id, *material_id)
            }
            Step::StockOutQty {
                warehouse_id,
                material_id,
            } => {
                let qty = parse_qty(text)?;
                let change = inventory::write_off(
                    &self.pool,
                    turn.user.id,
                    *warehouse_id,
                    *material_id,
                    qty,
                    "manual write-off",
                )
                .await?;
                (change, *warehouse_id, *material_id)
            }
            _ => return Err(use_buttons()),
        };

        info!(
            chat_id = turn.chat_id,
            warehouse_id,
            material_id,
            delta = change.delta,
            qty = change.qty,
            "Stock adjusted"
        );
        self.check_low_stock(&[change]).await;
        self.enter(
            turn,
            Step::StockItem {
                warehouse_id,
                material_id,
            },
        )
        .await
    }

    async fn export_stock(&self, turn: &Turn<'_>, warehouse_id: i64) -> Result<()> {
        let w = warehouse::get_warehouse(&self.pool, warehouse_id).await?;
        let rows: Vec<StockRow> = inventory::stock_lines(&self.pool, w.id)
            .await?
            .into_iter()
            .map(|l| StockRow {
                warehouse_id: l.warehouse_id,
                material_id: l.material_id,
                material: l.material_name,
                category: l.category_name,
                unit: l.unit.to_string(),
                qty: Some(l.qty),
            })
            .collect();
        let bytes = sheets::write_stock(w.id, &w.name, &rows)?;
        self.send_file(
            turn.chat_id,
            &format!("stock_{}.xlsx", w.id),
            bytes,
            &format!("Stock of {}", w.name),
        )
        .await
    }

    /// Bring every balance in the file to its stated quantity.
    pub(super) async fn import_stock(&self, turn: &Turn<'_>, bytes: &[u8]) -> Result<()> {
        let sheet = sheets::read_stock(bytes)?;
        let targets = import::stock_targets(&sheet)?;
        let w = warehouse::get_warehouse(&self.pool, sheet.warehouse_id).await?;

        let mut changes = Vec::new();
        for target in &targets {
            let current = inventory::get_balance(&self.pool, w.id, target.material_id).await?;
            let change = match import::reconcile(current, target.qty) {
                Some(Adjustment::Receive(qty)) => {
                    inventory::receive(
                        &self.pool,
                        turn.user.id,
                        w.id,
                        target.material_id,
                        qty,
                        "stock import",
                    )
                    .await?
                }
                Some(Adjustment::WriteOff(qty)) => {
                    inventory::write_off(
                        &self.pool,
                        turn.user.id,
                        w.id,
                        target.material_id,
                        qty,
                        "stock import",
                    )
                    .await?
                }
                None => continue,
            };
            changes.push(change);
        }

        info!(
            chat_id = turn.chat_id,
            warehouse_id = w.id,
            rows = targets.len(),
            adjusted = changes.len(),
            "Stock imported"
        );
        self.sender
            .send_text(
                turn.chat_id,
                &format!(
                    "✅ {}: {} rows read, {} balances adjusted.",
                    w.name,
                    targets.len(),
                    changes.len()
                ),
            )
            .await?;
        self.check_low_stock(&changes).await;
        self.enter(turn, Step::StockMenu).await
    }
}
