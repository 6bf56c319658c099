//! Material prices, the rent-rate ladder and their files.

use database::{inventory, material, rent_rate, warehouse};
use salon_core::Place;
use sheets::PriceRow;
use tracing::info;

use super::{stale, use_buttons, Controller, Screen, Turn};
use crate::callback::Callback;
use crate::error::{DialogError, Result};
use crate::format;
use crate::import;
use crate::input::{parse_count, parse_money};
use crate::keyboard::{Button, Keyboard};
use crate::sender::ChatSender;
use crate::state::{Step, TierDraft};

fn sub_label(with_sub: bool) -> &'static str {
    if with_sub {
        "with subscription"
    } else {
        "without subscription"
    }
}

fn draft_text(draft: &TierDraft) -> String {
    let unit = draft.place.unit().label();
    let max = draft
        .max_qty
        .map_or_else(|| "no limit".to_string(), |m| m.to_string());
    let opt = |v: Option<f64>| v.map_or_else(|| "-".to_string(), format::money);
    format!(
        "New tier: {} {}\nRange: {}..{} {unit}\nThreshold: {} per {unit}\nPrice with materials: {}\nPrice with own materials: {}",
        draft.place.label(),
        sub_label(draft.with_sub),
        draft.min_qty,
        max,
        opt(draft.threshold),
        opt(draft.price_with),
        opt(draft.price_own),
    )
}

impl<S: ChatSender> Controller<S> {
    pub(super) async fn pricing_screen(&self, step: &Step) -> Result<Screen> {
        let screen = match step {
            Step::PriceMenu => Screen::with(
                "💰 Prices",
                Keyboard::new()
                    .row(vec![
                        Button::callback("🧴 Materials", Callback::PriceMaterials),
                        Button::callback("🏠 Rent", Callback::PriceRent),
                    ])
                    .nav(),
            ),
            Step::PriceMatMenu => Screen::with(
                "🧴 Material prices",
                Keyboard::new()
                    .row(vec![
                        Button::callback("📤 Export", Callback::PriceMatExport),
                        Button::callback("📥 Import", Callback::PriceMatImport),
                    ])
                    .nav(),
            ),
            Step::PriceMatExportPickWh => {
                let buttons = self
                    .warehouse_buttons(Callback::PriceMatExportWarehouse)
                    .await?;
                Screen::with(
                    "Export prices of which warehouse?",
                    Keyboard::new().grid(buttons, 1).nav(),
                )
            }
            Step::PriceMatImportFile => Screen::with(
                "Send the prices .xlsx file. An empty price keeps the current price.",
                Keyboard::new().nav(),
            ),
            Step::PriceRentMenu => Screen::with(
                "🏠 Rent tariffs",
                Keyboard::new()
                    .row(vec![
                        Button::callback("📤 Export", Callback::PriceRentExport),
                        Button::callback("📥 Import", Callback::PriceRentImport),
                    ])
                    .button("✏️ Edit ladder", Callback::PriceRentEdit)
                    .nav(),
            ),
            Step::PriceRentImportFile => Screen::with(
                "Send the rates .xlsx file. Rows are matched by id; empty cells keep the \
                 stored values.",
                Keyboard::new().nav(),
            ),
            Step::RatesPickPu => {
                let buttons = Place::ALL
                    .iter()
                    .copied()
                    .map(|p| {
                        Button::callback(
                            format!("{} ({})", p.label(), p.unit().label()),
                            Callback::RatesPlace(p),
                        )
                    })
                    .collect();
                Screen::with("Which place?", Keyboard::new().grid(buttons, 2).nav())
            }
            Step::RatesPickSub { place } => Screen::with(
                format!("{}: which ladder?", place.label()),
                Keyboard::new()
                    .row(vec![
                        Button::callback("With subscription", Callback::RatesSub(true)),
                        Button::callback("Without", Callback::RatesSub(false)),
                    ])
                    .nav(),
            ),
            Step::RatesList { place, with_sub } => {
                let tiers =
                    rent_rate::list_tiers(&self.pool, *place, place.unit(), *with_sub).await?;
                let mut text = format!("{} {}:\n", place.label(), sub_label(*with_sub));
                if tiers.is_empty() {
                    text.push_str("No tiers yet.");
                }
                for tier in &tiers {
                    text.push('\n');
                    text.push_str(&format::tier(tier));
                }
                let buttons = tiers
                    .iter()
                    .map(|t| {
                        Button::callback(
                            format!("🗑 {}", t.range_label()),
                            Callback::RatesDelete(t.id),
                        )
                    })
                    .collect();
                Screen::with(
                    text,
                    Keyboard::new()
                        .grid(buttons, 3)
                        .button("➕ Add tier", Callback::RatesAdd)
                        .nav(),
                )
            }
            Step::RatesCreateMin { place, .. } => Screen::with(
                format!("Lower bound of the tier ({}):", place.unit().label()),
                Keyboard::new().nav(),
            ),
            Step::RatesCreateMax { draft } => Screen::with(
                format!("{}\n\nUpper bound of the tier:", draft_text(draft)),
                Keyboard::new()
                    .button("No upper bound", Callback::RatesMaxNone)
                    .nav(),
            ),
            Step::RatesCreateThreshold { draft } => Screen::with(
                format!(
                    "{}\n\nMaterials needed per {} for the lower price:",
                    draft_text(draft),
                    draft.place.unit().label()
                ),
                Keyboard::new().nav(),
            ),
            Step::RatesCreatePriceWith { draft } => Screen::with(
                format!(
                    "{}\n\nPrice per {} when the threshold is met:",
                    draft_text(draft),
                    draft.place.unit().label()
                ),
                Keyboard::new().nav(),
            ),
            Step::RatesCreatePriceOwn { draft } => Screen::with(
                format!(
                    "{}\n\nPrice per {} with own materials:",
                    draft_text(draft),
                    draft.place.unit().label()
                ),
                Keyboard::new().nav(),
            ),
            Step::RatesConfirm { draft } => Screen::with(
                format!("{}\n\nSave this tier?", draft_text(draft)),
                Keyboard::new().button("💾 Save", Callback::RatesSave).nav(),
            ),
            other => return Err(DialogError::protocol(other.name())),
        };
        Ok(screen)
    }

    pub(super) async fn pricing_button(&self, turn: &Turn<'_>, cb: Callback) -> Result<()> {
        match (turn.step(), cb) {
            (Step::PriceMenu, Callback::PriceMaterials) => {
                self.enter(turn, Step::PriceMatMenu).await
            }
            (Step::PriceMenu, Callback::PriceRent) => self.enter(turn, Step::PriceRentMenu).await,
            (Step::PriceMatMenu, Callback::PriceMatExport) => {
                self.enter(turn, Step::PriceMatExportPickWh).await
            }
            (Step::PriceMatMenu, Callback::PriceMatImport) => {
                self.enter(turn, Step::PriceMatImportFile).await
            }
            (Step::PriceMatExportPickWh, Callback::PriceMatExportWarehouse(warehouse_id)) => {
                self.export_prices(turn, warehouse_id).await?;
                self.enter(turn, Step::PriceMatMenu).await
            }
            (Step::PriceRentMenu, Callback::PriceRentExport) => {
                let tiers = rent_rate::list_all_tiers(&self.pool).await?;
                let bytes = sheets::write_rates(&tiers)?;
                self.send_file(
                    turn.chat_id,
                    "rates.xlsx",
                    bytes,
                    &format!("Rent tariffs ({} tiers)", tiers.len()),
                )
                .await?;
                self.enter(turn, Step::PriceRentMenu).await
            }
            (Step::PriceRentMenu, Callback::PriceRentImport) => {
                self.enter(turn, Step::PriceRentImportFile).await
            }
            (Step::PriceRentMenu, Callback::PriceRentEdit) => {
                self.enter(turn, Step::RatesPickPu).await
            }
            (Step::RatesPickPu, Callback::RatesPlace(place)) => {
                self.enter(turn, Step::RatesPickSub { place }).await
            }
            (Step::RatesPickSub { place }, Callback::RatesSub(with_sub)) => {
                let step = Step::RatesList {
                    place: *place,
                    with_sub,
                };
                self.enter(turn, step).await
            }
            (Step::RatesList { place, with_sub }, Callback::RatesAdd) => {
                let step = Step::RatesCreateMin {
                    place: *place,
                    with_sub: *with_sub,
                };
                self.enter(turn, step).await
            }
            (Step::RatesList { place, with_sub }, Callback::RatesDelete(id)) => {
                let tier = rent_rate::get_tier(&self.pool, id).await?;
                if !tier.matches(*place, place.unit(), *with_sub) {
                    return Err(stale(turn, cb));
                }
                rent_rate::delete_tier(&self.pool, id).await?;
                info!(tier_id = id, %place, with_sub, "Tier deleted");
                let step = Step::RatesList {
                    place: *place,
                    with_sub: *with_sub,
                };
                self.enter(turn, step).await
            }
            (Step::RatesCreateMax { draft }, Callback::RatesMaxNone) => {
                let draft = TierDraft {
                    max_qty: None,
                    ..draft.clone()
                };
                self.enter(turn, Step::RatesCreateThreshold { draft }).await
            }
            (Step::RatesConfirm { draft }, Callback::RatesSave) => {
                let new = draft
                    .to_new_tier()
                    .ok_or_else(|| DialogError::protocol("incomplete tier draft"))?;
                let tier = rent_rate::upsert_tier(&self.pool, &new).await?;
                info!(
                    tier_id = tier.id,
                    place = %tier.place,
                    with_sub = tier.with_sub,
                    range = %tier.range_label(),
                    "Tier saved"
                );
                let step = Step::RatesList {
                    place: draft.place,
                    with_sub: draft.with_sub,
                };
                self.enter(turn, step).await
            }
            _ => Err(stale(turn, cb)),
        }
    }

    pub(super) async fn pricing_text(&self, turn: &Turn<'_>, text: &str) -> Result<()> {
        match turn.step() {
            Step::RatesCreateMin { place, with_sub } => {
                let draft = TierDraft::new(*place, *with_sub, parse_count(text)?);
                self.enter(turn, Step::RatesCreateMax { draft }).await
            }
            Step::RatesCreateMax { draft } => {
                let max = parse_count(text)?;
                if max < draft.min_qty {
                    return Err(DialogError::validation(format!(
                        "The upper bound must be at least {}.",
                        draft.min_qty
                    )));
                }
                let draft = TierDraft {
                    max_qty: Some(max),
                    ..draft.clone()
                };
                self.enter(turn, Step::RatesCreateThreshold { draft }).await
            }
            Step::RatesCreateThreshold { draft } => {
                let draft = TierDraft {
                    threshold: Some(parse_money(text)?),
                    ..draft.clone()
                };
                self.enter(turn, Step::RatesCreatePriceWith { draft }).await
            }
            Step::RatesCreatePriceWith { draft } => {
                let draft = TierDraft {
                    price_with: Some(parse_money(text)?),
                    ..draft.clone()
                };
                self.enter(turn, Step::RatesCreatePriceOwn { draft }).await
            }
            Step::RatesCreatePriceOwn { draft } => {
                let draft = TierDraft {
                    price_own: Some(parse_money(text)?),
                    ..draft.clone()
                };
                self.enter(turn, Step::RatesConfirm { draft }).await
            }
            _ => Err(use_buttons()),
        }
    }

    async fn export_prices(&self, turn: &Turn<'_>, warehouse_id: i64) -> Result<()> {
        let w = warehouse::get_warehouse(&self.pool, warehouse_id).await?;
        let rows: Vec<PriceRow> = inventory::stock_lines(&self.pool, w.id)
            .await?
            .into_iter()
            .map(|l| PriceRow {
                warehouse_id: l.warehouse_id,
                material_id: l.material_id,
                material: l.material_name,
                unit: l.unit.to_string(),
                qty: Some(l.qty),
                price: Some(l.price),
            })
            .collect();
        let bytes = sheets::write_prices(w.id, &w.name, &rows)?;
        self.send_file(
            turn.chat_id,
            &format!("prices_{}.xlsx", w.id),
            bytes,
            &format!("Prices, {}", w.name),
        )
        .await
    }

    pub(super) async fn import_prices(&self, turn: &Turn<'_>, bytes: &[u8]) -> Result<()> {
        let sheet = sheets::read_prices(bytes)?;
        let updates = import::price_updates(&sheet)?;
        let w = warehouse::get_warehouse(&self.pool, sheet.warehouse_id).await?;

        for (material_id, price) in &updates {
            material::set_material_price(&self.pool, *material_id, *price).await?;
        }

        info!(
            chat_id = turn.chat_id,
            warehouse_id = w.id,
            rows = sheet.rows.len(),
            updated = updates.len(),
            "Prices imported"
        );
        self.sender
            .send_text(
                turn.chat_id,
                &format!(
                    "✅ {} rows read, {} prices updated.",
                    sheet.rows.len(),
                    updates.len()
                ),
            )
            .await?;
        self.enter(turn, Step::PriceMatMenu).await
    }

    pub(super) async fn import_rates(&self, turn: &Turn<'_>, bytes: &[u8]) -> Result<()> {
        let rows = sheets::read_rates(bytes)?;
        let patches = import::tier_patches(&rows);

        for (id, patch) in &patches {
            rent_rate::update_tier(&self.pool, *id, patch).await?;
        }

        info!(
            chat_id = turn.chat_id,
            rows = rows.len(),
            updated = patches.len(),
            "Rates imported"
        );
        self.sender
            .send_text(
                turn.chat_id,
                &format!("✅ {} rows read, {} tiers updated.", rows.len(), patches.len()),
            )
            .await?;
        self.enter(turn, Step::PriceRentMenu).await
    }
}
