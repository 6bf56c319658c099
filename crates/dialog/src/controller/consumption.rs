//! Recording a rent session with the materials used.
//!
//! The draft lives in the dialog until confirmation. Pricing splits the
//! session over the user's subscription buckets for the current month and
//! prices every part against the place's ladder; confirmation writes the
//! session, usage, stock and invoice in one transaction.

use database::{
    consumption, inventory, material, rent_rate, subscription, warehouse, NewItem, NewSession,
    Subscription, Usage,
};
use salon_core::{split_quantity, Bucket, Ladder, Place, Quote, SessionPart};
use tracing::{info, warn};

use super::{stale, use_buttons, Controller, Screen, Turn};
use crate::callback::{Callback, MenuEntry};
use crate::error::{DialogError, Result};
use crate::format;
use crate::input::{parse_count, parse_qty};
use crate::keyboard::{Button, Keyboard};
use crate::sender::ChatSender;
use crate::state::{ConsDraft, ConsItem, Step};

impl<S: ChatSender> Controller<S> {
    pub(super) async fn consumption_screen(&self, step: &Step) -> Result<Screen> {
        let screen = match step {
            Step::ConsPlace => {
                let buttons = Place::ALL
                    .iter()
                    .copied()
                    .map(|p| {
                        Button::callback(
                            format!("{} ({})", p.label(), p.unit().label()),
                            Callback::ConsPlace(p),
                        )
                    })
                    .collect();
                Screen::with("🧾 Where did you work?", Keyboard::new().grid(buttons, 2).nav())
            }
            Step::ConsQty { place } => Screen::with(
                format!("{}: how many {}?", place.label(), place.unit().label()),
                Keyboard::new().nav(),
            ),
            Step::ConsCart { draft } => Screen::with(
                format::draft(draft),
                Keyboard::new()
                    .row(vec![
                        Button::callback("➕ Material", Callback::ConsAdd),
                        Button::callback("🧮 Calculate", Callback::ConsCalc),
                    ])
                    .nav(),
            ),
            Step::ConsMatPick { .. } => {
                let w = warehouse::consumables_warehouse(&self.pool).await?;
                let buttons = inventory::stock_lines(&self.pool, w.id)
                    .await?
                    .into_iter()
                    .map(|l| {
                        Button::callback(
                            format!("{} ({} {})", l.material_name, format::qty(l.qty), l.unit),
                            Callback::ConsMaterial(l.material_id),
                        )
                    })
                    .collect();
                Screen::with("Which material?", Keyboard::new().grid(buttons, 2).nav())
            }
            Step::ConsMatQty { material_id, .. } => {
                let m = material::get_material(&self.pool, *material_id).await?;
                Screen::with(
                    format!("How much {} did you use ({})?", m.name, m.unit),
                    Keyboard::new().nav(),
                )
            }
            Step::ConsSummary { draft, quote, .. } => Screen::with(
                format::summary(draft, quote),
                Keyboard::new()
                    .button("✅ Confirm", Callback::ConsConfirm)
                    .nav(),
            ),
            other => return Err(DialogError::protocol(other.name())),
        };
        Ok(screen)
    }

    pub(super) async fn consumption_button(&self, turn: &Turn<'_>, cb: Callback) -> Result<()> {
        match (turn.step(), cb) {
            (Step::ConsPlace, Callback::ConsPlace(place)) => {
                self.enter(turn, Step::ConsQty { place }).await
            }
            (Step::ConsCart { draft }, Callback::ConsAdd) => {
                let step = Step::ConsMatPick {
                    draft: draft.clone(),
                };
                self.enter(turn, step).await
            }
            (Step::ConsCart { draft }, Callback::ConsCalc) => {
                let step = self.price_draft(turn, draft.clone()).await?;
                self.enter(turn, step).await
            }
            (Step::ConsMatPick { draft }, Callback::ConsMaterial(material_id)) => {
                let step = Step::ConsMatQty {
                    draft: draft.clone(),
                    material_id,
                };
                self.enter(turn, step).await
            }
            (Step::ConsSummary { draft, parts, quote }, Callback::ConsConfirm) => {
                self.confirm(turn, draft, parts, quote).await
            }
            _ => Err(stale(turn, cb)),
        }
    }

    pub(super) async fn consumption_text(&self, turn: &Turn<'_>, text: &str) -> Result<()> {
        match turn.step() {
            Step::ConsQty { place } => {
                let draft = ConsDraft::new(*place, parse_count(text)?);
                self.enter(turn, Step::ConsCart { draft }).await
            }
            Step::ConsMatQty { draft, material_id } => {
                let qty = parse_qty(text)?;
                let m = material::get_material(&self.pool, *material_id).await?;
                let mut draft = draft.clone();
                draft.add(ConsItem {
                    material_id: m.id,
                    name: m.name,
                    unit: m.unit,
                    qty,
                    price: m.price,
                });
                self.enter(turn, Step::ConsCart { draft }).await
            }
            _ => Err(use_buttons()),
        }
    }

    /// Price a draft against current prices, buckets and tariffs.
    async fn price_draft(&self, turn: &Turn<'_>, mut draft: ConsDraft) -> Result<Step> {
        for item in &mut draft.items {
            item.price = material::get_material(&self.pool, item.material_id)
                .await?
                .price;
        }

        let month = self.current_month();
        let unit = draft.unit();
        let buckets: Vec<Bucket> =
            subscription::list_active(&self.pool, turn.user.id, draft.place, unit, &month)
                .await?
                .iter()
                .map(Subscription::bucket)
                .collect();
        let parts = split_quantity(draft.qty, &buckets);

        let tiers = rent_rate::list_ladder(&self.pool, draft.place, unit).await?;
        let ladder = Ladder::new(draft.place, unit, tiers);
        let quote = salon_core::quote(&ladder, draft.materials_sum(), &parts)?;

        info!(
            chat_id = turn.chat_id,
            place = %draft.place,
            qty = draft.qty,
            parts = parts.len(),
            total = quote.total(),
            "Session priced"
        );
        Ok(Step::ConsSummary {
            draft,
            parts,
            quote,
        })
    }

    async fn confirm(
        &self,
        turn: &Turn<'_>,
        draft: &ConsDraft,
        parts: &[SessionPart],
        quote: &Quote,
    ) -> Result<()> {
        let w = warehouse::consumables_warehouse(&self.pool).await?;
        let new = NewSession {
            user_id: turn.user.id,
            warehouse_id: w.id,
            place: draft.place,
            unit: draft.unit(),
            qty: draft.qty,
            with_sub: quote.with_sub(),
            materials_sum: quote.materials_sum,
            rounded_materials_sum: quote.rounded_materials,
            rent: quote.rent_total,
            usages: parts
                .iter()
                .filter_map(|p| {
                    p.subscription_id.map(|subscription_id| Usage {
                        subscription_id,
                        qty: p.qty,
                    })
                })
                .collect(),
            items: draft
                .items
                .iter()
                .map(|i| NewItem {
                    material_id: i.material_id,
                    qty: i.qty,
                })
                .collect(),
        };

        // Leave the summary first so a repeated press cannot confirm twice.
        self.strip_keyboard(turn.chat_id, turn.dialog.last_mid).await;
        turn.ensure_live()?;
        self.store.reset(turn.chat_id).await?;

        let confirmed = match consumption::confirm_session(&self.pool, &new).await {
            Ok(confirmed) => confirmed,
            Err(e) => {
                let e = DialogError::from(e);
                if !e.is_recoverable() {
                    return Err(e);
                }
                self.sender
                    .send_text(turn.chat_id, &e.user_message())
                    .await?;
                let step = Step::ConsCart {
                    draft: draft.clone(),
                };
                return self.enter(turn, step).await;
            }
        };
        self.stats
            .sessions_confirmed
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);

        let session = &confirmed.session;
        info!(
            chat_id = turn.chat_id,
            session_id = session.id,
            invoice_id = confirmed.invoice.id,
            total = session.total,
            shortfalls = confirmed.shortfalls.len(),
            "Session confirmed"
        );

        let link = self.payment_link(confirmed.invoice.id);
        self.sender
            .send_keyboard(
                turn.chat_id,
                &format!(
                    "✅ Session #{} recorded.\nRent: {}\nMaterials: {}\nTo pay: {}",
                    session.id,
                    format::money(session.rent),
                    format::money(session.materials_sum),
                    format::money(confirmed.invoice.amount)
                ),
                &Keyboard::new().row(vec![Button::url("💳 Pay", link)]).home(),
            )
            .await?;

        self.notify_super_admin(&format!(
            "🧾 {} confirmed session #{}\n\n{}",
            turn.user.name,
            session.id,
            format::summary(draft, quote)
        ))
        .await;
        for shortfall in &confirmed.shortfalls {
            warn!(
                session_id = session.id,
                subscription_id = shortfall.subscription_id,
                qty = shortfall.qty,
                "Subscription usage skipped"
            );
            self.notify_super_admin(&format!(
                "⚠️ Session #{}: subscription #{} could not cover {} {}.",
                session.id,
                shortfall.subscription_id,
                shortfall.qty,
                draft.unit().label()
            ))
            .await;
        }

        self.check_low_stock(&confirmed.stock).await;

        let month = self.current_month();
        let left =
            subscription::list_active(&self.pool, turn.user.id, draft.place, draft.unit(), &month)
                .await?;
        if left.is_empty() {
            self.sender
                .send_keyboard(
                    turn.chat_id,
                    &format!(
                        "You have no {} subscription left for {month}. Buy one?",
                        draft.place.label()
                    ),
                    &Keyboard::new().button(
                        MenuEntry::BuySubscription.label(),
                        Callback::Menu(MenuEntry::BuySubscription),
                    ),
                )
                .await?;
        }
        Ok(())
    }
}
