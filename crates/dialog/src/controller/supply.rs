//! Supply receipts: the cart flow, history export and file import.

use database::{inventory, material, supply, warehouse, NewSupply, StockChange};
use sheets::SupplyRow;
use tracing::info;

use super::{stale, use_buttons, Controller, Screen, Turn};
use crate::callback::Callback;
use crate::error::{DialogError, Result};
use crate::format;
use crate::import;
use crate::input::{parse_money, parse_qty};
use crate::keyboard::{Button, Keyboard};
use crate::sender::ChatSender;
use crate::state::{CartLine, Step};

impl<S: ChatSender> Controller<S> {
    pub(super) async fn supply_screen(&self, step: &Step) -> Result<Screen> {
        let screen = match step {
            Step::SupMenu => Screen::with(
                "🚚 Supplies",
                Keyboard::new()
                    .button("➕ New supply", Callback::SupNew)
                    .row(vec![
                        Button::callback("📤 History", Callback::SupExport),
                        Button::callback("📥 Import", Callback::SupImport),
                    ])
                    .nav(),
            ),
            Step::SupPickWh => {
                let buttons = self.warehouse_buttons(Callback::SupWarehouse).await?;
                Screen::with(
                    "Receive into which warehouse?",
                    Keyboard::new().grid(buttons, 1).nav(),
                )
            }
            Step::SupExportPickWh => {
                let buttons = self.warehouse_buttons(Callback::SupExportWarehouse).await?;
                Screen::with(
                    "Supply history of which warehouse?",
                    Keyboard::new().grid(buttons, 1).nav(),
                )
            }
            Step::SupPickMat { cart, .. } => {
                let buttons = material::list_materials(&self.pool, None, true)
                    .await?
                    .into_iter()
                    .map(|m| {
                        Button::callback(
                            format!("{} ({})", m.name, m.unit),
                            Callback::SupMaterial(m.id),
                        )
                    })
                    .collect();
                let mut text = String::new();
                if !cart.is_empty() {
                    text.push_str(&format::cart(cart));
                    text.push_str("\n\n");
                }
                text.push_str("Pick a material:");
                Screen::with(text, Keyboard::new().grid(buttons, 2).nav())
            }
            Step::SupQty { material_id, .. } => {
                let m = material::get_material(&self.pool, *material_id).await?;
                Screen::with(
                    format!("Quantity of {} received ({}):", m.name, m.unit),
                    Keyboard::new().nav(),
                )
            }
            Step::SupUnitPrice { material_id, .. } => {
                let m = material::get_material(&self.pool, *material_id).await?;
                Screen::with(
                    format!("Cost per {} of {}:", m.unit, m.name),
                    Keyboard::new()
                        .button(
                            format!("Use current price {}", format::money(m.price)),
                            Callback::SupCurrentPrice,
                        )
                        .nav(),
                )
            }
            Step::SupCart { warehouse_id, cart } => {
                let w = warehouse::get_warehouse(&self.pool, *warehouse_id).await?;
                Screen::with(
                    format!("Warehouse: {}\n{}", w.name, format::cart(cart)),
                    Keyboard::new()
                        .row(vec![
                            Button::callback("➕ Add material", Callback::SupAdd),
                            Button::callback("💾 Save", Callback::SupSave),
                        ])
                        .nav(),
                )
            }
            Step::SupImportFile => Screen::with(
                "Send a supply .xlsx in the prices layout: qty is the amount received and \
                 price the cost per unit. An empty price uses the current price; rows \
                 without qty are skipped.",
                Keyboard::new().nav(),
            ),
            other => return Err(DialogError::protocol(other.name())),
        };
        Ok(screen)
    }

    pub(super) async fn supply_button(&self, turn: &Turn<'_>, cb: Callback) -> Result<()> {
        match (turn.step(), cb) {
            (Step::SupMenu, Callback::SupNew) => self.enter(turn, Step::SupPickWh).await,
            (Step::SupMenu, Callback::SupExport) => self.enter(turn, Step::SupExportPickWh).await,
            (Step::SupMenu, Callback::SupImport) => self.enter(turn, Step::SupImportFile).await,
            (Step::SupPickWh, Callback::SupWarehouse(warehouse_id)) => {
                let step = Step::SupPickMat {
                    warehouse_id,
                    cart: Vec::new(),
                };
                self.enter(turn, step).await
            }
            (Step::SupExportPickWh, Callback::SupExportWarehouse(warehouse_id)) => {
                self.export_supplies(turn, warehouse_id).await?;
                self.enter(turn, Step::SupMenu).await
            }
            (Step::SupPickMat { warehouse_id, cart }, Callback::SupMaterial(material_id)) => {
                let step = Step::SupQty {
                    warehouse_id: *warehouse_id,
                    material_id,
                    cart: cart.clone(),
                };
                self.enter(turn, step).await
            }
            (
                Step::SupUnitPrice {
                    warehouse_id,
                    material_id,
                    qty,
                    cart,
                },
                Callback::SupCurrentPrice,
            ) => {
                let price = material::get_material(&self.pool, *material_id).await?.price;
                self.add_to_cart(turn, *warehouse_id, *material_id, *qty, price, cart.clone())
                    .await
            }
            (Step::SupCart { warehouse_id, cart }, Callback::SupAdd) => {
                let step = Step::SupPickMat {
                    warehouse_id: *warehouse_id,
                    cart: cart.clone(),
                };
                self.enter(turn, step).await
            }
            (Step::SupCart { warehouse_id, cart }, Callback::SupSave) => {
                self.save_supply(turn, *warehouse_id, cart).await
            }
            _ => Err(stale(turn, cb)),
        }
    }

    pub(super) async fn supply_text(&self, turn: &Turn<'_>, text: &str) -> Result<()> {
        match turn.step() {
            Step::SupQty {
                warehouse_id,
                material_id,
                cart,
            } => {
                let step = Step::SupUnitPrice {
                    warehouse_id: *warehouse_id,
                    material_id: *material_id,
                    qty: parse_qty(text)?,
                    cart: cart.clone(),
                };
                self.enter(turn, step).await
            }
            Step::SupUnitPrice {
                warehouse_id,
                material_id,
                qty,
                cart,
            } => {
                let price = parse_money(text)?;
                self.add_to_cart(turn, *warehouse_id, *material_id, *qty, price, cart.clone())
                    .await
            }
            _ => Err(use_buttons()),
        }
    }

    async fn add_to_cart(
        &self,
        turn: &Turn<'_>,
        warehouse_id: i64,
        material_id: i64,
        qty: f64,
        unit_cost: f64,
        mut cart: Vec<CartLine>,
    ) -> Result<()> {
        let m = material::get_material(&self.pool, material_id).await?;
        cart.push(CartLine {
            material_id,
            name: m.name,
            unit: m.unit,
            qty,
            unit_cost,
        });
        self.enter(turn, Step::SupCart { warehouse_id, cart }).await
    }

    async fn save_supply(
        &self,
        turn: &Turn<'_>,
        warehouse_id: i64,
        cart: &[CartLine],
    ) -> Result<()> {
        if cart.is_empty() {
            return Err(DialogError::validation("The cart is empty."));
        }

        let lines: Vec<NewSupply> = cart
            .iter()
            .map(|line| NewSupply {
                material_id: line.material_id,
                qty: line.qty,
                unit_cost: line.unit_cost,
            })
            .collect();
        let changes: Vec<StockChange> =
            inventory::receive_supply(&self.pool, turn.user.id, warehouse_id, &lines)
                .await?
                .into_iter()
                .map(|(change, _)| change)
                .collect();

        let total: f64 = cart.iter().map(CartLine::total).sum();
        info!(
            chat_id = turn.chat_id,
            warehouse_id,
            lines = cart.len(),
            total,
            "Supply saved"
        );
        self.finish(
            turn,
            &format!(
                "✅ Supply saved: {} lines, total {}.",
                cart.len(),
                format::money(total)
            ),
            Keyboard::new(),
        )
        .await?;
        self.check_low_stock(&changes).await;
        Ok(())
    }

    async fn export_supplies(&self, turn: &Turn<'_>, warehouse_id: i64) -> Result<()> {
        let w = warehouse::get_warehouse(&self.pool, warehouse_id).await?;
        let rows: Vec<SupplyRow> = supply::list_supplies(&self.pool, w.id)
            .await?
            .into_iter()
            .map(|s| SupplyRow {
                created_at: s.created_at,
                material_id: s.material_id,
                material: s.material_name,
                unit: s.unit.to_string(),
                qty: s.qty,
                unit_cost: s.unit_cost,
                total_cost: s.total_cost,
                actor: s.actor_name,
            })
            .collect();
        let bytes = sheets::write_supplies(w.id, &w.name, &rows, self.settings.offset)?;
        self.send_file(
            turn.chat_id,
            &format!("supplies_{}.xlsx", w.id),
            bytes,
            &format!("Supplies of {} ({} rows)", w.name, rows.len()),
        )
        .await
    }

    /// Record one supply per file row with a quantity. The file is applied
    /// whole or not at all.
    pub(super) async fn import_supplies(&self, turn: &Turn<'_>, bytes: &[u8]) -> Result<()> {
        let sheet = sheets::read_prices(bytes)?;
        let receipts = import::supply_receipts(&sheet)?;
        let w = warehouse::get_warehouse(&self.pool, sheet.warehouse_id).await?;

        let mut lines = Vec::with_capacity(receipts.len());
        for receipt in &receipts {
            let unit_cost = match receipt.unit_cost {
                Some(cost) => cost,
                None => material::get_material(&self.pool, receipt.material_id).await?.price,
            };
            lines.push(NewSupply {
                material_id: receipt.material_id,
                qty: receipt.qty,
                unit_cost,
            });
        }

        let received = inventory::receive_supply(&self.pool, turn.user.id, w.id, &lines).await?;
        let total: f64 = received.iter().map(|(_, supply)| supply.total_cost).sum();
        let changes: Vec<StockChange> = received.into_iter().map(|(change, _)| change).collect();

        info!(
            chat_id = turn.chat_id,
            warehouse_id = w.id,
            lines = receipts.len(),
            total,
            "Supplies imported"
        );
        self.sender
            .send_text(
                turn.chat_id,
                &format!(
                    "✅ {}: {} supply lines recorded, total {}.",
                    w.name,
                    receipts.len(),
                    format::money(total)
                ),
            )
            .await?;
        self.check_low_stock(&changes).await;
        self.enter(turn, Step::SupMenu).await
    }
}
