//! Monthly subscriptions: added by the super-admin or bought by a master.

use database::{subscription, user};
use salon_core::Place;
use tracing::{info, warn};

use super::{stale, use_buttons, Controller, Screen, Turn};
use crate::callback::Callback;
use crate::error::{DialogError, Result};
use crate::format;
use crate::input::parse_count;
use crate::keyboard::{Button, Keyboard};
use crate::sender::ChatSender;
use crate::state::Step;

fn place_buttons(to: fn(Place) -> Callback) -> Vec<Button> {
    Place::ALL
        .iter()
        .copied()
        .map(|p| Button::callback(format!("{} ({})", p.label(), p.unit().label()), to(p)))
        .collect()
}

impl<S: ChatSender> Controller<S> {
    pub(super) async fn subscription_screen(&self, step: &Step) -> Result<Screen> {
        let month = self.current_month();
        let screen = match step {
            Step::SubsAdminMenu => Screen::with(
                "👥 Subscriptions",
                Keyboard::new()
                    .button("➕ Add subscription", Callback::SubsAdd)
                    .nav(),
            ),
            Step::SubsPickUser => {
                let buttons = user::list_approved(&self.pool, None)
                    .await?
                    .into_iter()
                    .map(|u| Button::callback(u.name, Callback::SubsUser(u.id)))
                    .collect();
                Screen::with("For whom?", Keyboard::new().grid(buttons, 2).nav())
            }
            Step::SubsPickPlaceUnit { user_id } => {
                let u = user::get_user(&self.pool, *user_id).await?;
                Screen::with(
                    format!("{}: which place?", u.name),
                    Keyboard::new()
                        .grid(place_buttons(Callback::SubsPlace), 2)
                        .nav(),
                )
            }
            Step::SubsEnterQty { user_id, place } => {
                let u = user::get_user(&self.pool, *user_id).await?;
                Screen::with(
                    format!(
                        "{} · {}: plan size in {} for {month}?",
                        u.name,
                        place.label(),
                        place.unit().label()
                    ),
                    Keyboard::new().nav(),
                )
            }
            Step::SubsConfirm {
                user_id,
                place,
                qty,
            } => {
                let u = user::get_user(&self.pool, *user_id).await?;
                Screen::with(
                    format!(
                        "Add {qty} {} of {} to {} for {month}?",
                        place.unit().label(),
                        place.label(),
                        u.name
                    ),
                    Keyboard::new().button("✅ Add", Callback::SubsConfirm).nav(),
                )
            }
            Step::SubBuyPlace => Screen::with(
                "🎟 Subscription for which place?",
                Keyboard::new()
                    .grid(place_buttons(Callback::BuyPlace), 2)
                    .nav(),
            ),
            Step::SubBuyQty { place } => Screen::with(
                format!(
                    "{}: how many {} for {month}?",
                    place.label(),
                    place.unit().label()
                ),
                Keyboard::new().nav(),
            ),
            Step::SubBuyConfirm { place, qty } => Screen::with(
                format!(
                    "Buy {qty} {} of {} for {month}?",
                    place.unit().label(),
                    place.label()
                ),
                Keyboard::new().button("✅ Buy", Callback::BuyConfirm).nav(),
            ),
            other => return Err(DialogError::protocol(other.name())),
        };
        Ok(screen)
    }

    pub(super) async fn subscription_button(&self, turn: &Turn<'_>, cb: Callback) -> Result<()> {
        match (turn.step(), cb) {
            (Step::SubsAdminMenu, Callback::SubsAdd) => self.enter(turn, Step::SubsPickUser).await,
            (Step::SubsPickUser, Callback::SubsUser(user_id)) => {
                self.enter(turn, Step::SubsPickPlaceUnit { user_id }).await
            }
            (Step::SubsPickPlaceUnit { user_id }, Callback::SubsPlace(place)) => {
                let step = Step::SubsEnterQty {
                    user_id: *user_id,
                    place,
                };
                self.enter(turn, step).await
            }
            (
                Step::SubsConfirm {
                    user_id,
                    place,
                    qty,
                },
                Callback::SubsConfirm,
            ) => {
                let month = self.current_month();
                let sub = subscription::add_or_create_total(
                    &self.pool,
                    *user_id,
                    *place,
                    place.unit(),
                    &month,
                    *qty,
                    *qty,
                )
                .await?;
                info!(
                    subscription_id = sub.id,
                    user_id,
                    %place,
                    month,
                    total = sub.total_qty,
                    "Subscription added"
                );

                let holder = user::get_user(&self.pool, *user_id).await?;
                if let Err(e) = self
                    .sender
                    .send_text(
                        holder.chat_id,
                        &format!(
                            "🎟 You received {qty} {} of {} for {month}.",
                            place.unit().label(),
                            place.label()
                        ),
                    )
                    .await
                {
                    warn!(user_id, "Failed to notify subscription holder: {}", e);
                }

                self.sender
                    .send_text(
                        turn.chat_id,
                        &format!(
                            "✅ {}: {} total {}, left {}.",
                            holder.name,
                            place.label(),
                            sub.total_qty,
                            sub.left()
                        ),
                    )
                    .await?;
                self.enter(turn, Step::SubsAdminMenu).await
            }
            (Step::SubBuyPlace, Callback::BuyPlace(place)) => {
                self.enter(turn, Step::SubBuyQty { place }).await
            }
            (Step::SubBuyConfirm { place, qty }, Callback::BuyConfirm) => {
                let month = self.current_month();
                let sub = subscription::add_or_create_total(
                    &self.pool,
                    turn.user.id,
                    *place,
                    place.unit(),
                    &month,
                    *qty,
                    *qty,
                )
                .await?;
                info!(
                    subscription_id = sub.id,
                    user_id = turn.user.id,
                    %place,
                    month,
                    "Subscription bought"
                );

                self.finish(
                    turn,
                    &format!(
                        "✅ Subscription for {month}: {} {} total, {} left.",
                        sub.total_qty,
                        place.unit().label(),
                        sub.left()
                    ),
                    Keyboard::new(),
                )
                .await?;
                self.notify_super_admin(&format!(
                    "🎟 {} bought {qty} {} of {} for {month}.",
                    turn.user.name,
                    place.unit().label(),
                    place.label()
                ))
                .await;
                Ok(())
            }
            _ => Err(stale(turn, cb)),
        }
    }

    pub(super) async fn subscription_text(&self, turn: &Turn<'_>, text: &str) -> Result<()> {
        match turn.step() {
            Step::SubsEnterQty { user_id, place } => {
                let step = Step::SubsConfirm {
                    user_id: *user_id,
                    place: *place,
                    qty: parse_count(text)?,
                };
                self.enter(turn, step).await
            }
            Step::SubBuyQty { place } => {
                let step = Step::SubBuyConfirm {
                    place: *place,
                    qty: parse_count(text)?,
                };
                self.enter(turn, step).await
            }
            _ => Err(use_buttons()),
        }
    }

    /// Show the caller's buckets for the current month.
    pub(super) async fn my_subscriptions(&self, turn: &Turn<'_>) -> Result<()> {
        let month = self.current_month();
        let subs = subscription::list_for_month(&self.pool, turn.user.id, &month).await?;
        self.sender
            .send_text(turn.chat_id, &format::subscriptions(&month, &subs))
            .await?;
        Ok(())
    }
}
