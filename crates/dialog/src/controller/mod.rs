//! The dialog controller.
//!
//! ```text
//! ChatEvent
//!    ↓
//! load dialog (store) ──► nav:cancel / /cancel ──► reset, done
//!    ↓
//! resolve caller (users)
//!    ↓
//! route by (step, event) ──► flow handler ──► services
//!    ↓                                        ↓
//! enter(next step): strip last keyboard, render screen, save dialog
//! ```
//!
//! Validation, not-found, stale-button and missing-tariff errors are
//! recovered inside the dialog. Store and transport errors end the event and
//! are returned to the caller.

mod catalog;
mod consumption;
mod pricing;
mod registration;
mod report;
mod stock;
mod subscription;
mod supply;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{FixedOffset, Utc};
use database::{user, warehouse, PgPool, StockChange, User};
use salon_core::Role;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::callback::{Access, Callback, MenuEntry};
use crate::error::{DialogError, Result};
use crate::event::{ChatEvent, EventKind};
use crate::input::month_key;
use crate::keyboard::{Button, Keyboard};
use crate::notify;
use crate::sender::ChatSender;
use crate::state::{Dialog, Step};
use crate::store::DialogStore;

const HELP_TEXT: &str = "Salon back-office bot.\n\n\
/start - register or open the main menu\n\
/menu - main menu\n\
/cancel - abandon the current step\n\
/help - this message\n\n\
Use the buttons under messages to move through forms. ⬅️ Back returns one step.";

/// Values the controller needs from configuration.
#[derive(Debug, Clone)]
pub struct DialogSettings {
    /// Chat of the super-admin, who receives approvals and notices.
    pub admin_chat_id: i64,
    /// Offset used for display and for subscription months.
    pub offset: FixedOffset,
    /// Base of the payment link sent with invoices.
    pub payment_base_url: String,
}

/// Counters exposed for metrics.
#[derive(Debug, Default)]
pub struct Stats {
    sessions_confirmed: AtomicU64,
}

impl Stats {
    pub fn sessions_confirmed(&self) -> u64 {
        self.sessions_confirmed.load(Ordering::Relaxed)
    }
}

/// What the chat shows for a step.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Screen {
    pub text: String,
    pub keyboard: Option<Keyboard>,
}

impl Screen {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
        }
    }

    pub fn with(text: impl Into<String>, keyboard: Keyboard) -> Self {
        Self {
            text: text.into(),
            keyboard: Some(keyboard),
        }
    }
}

/// One event in flight.
pub(crate) struct Turn<'a> {
    pub chat_id: i64,
    pub user: User,
    pub dialog: Dialog,
    /// Message the pressed button belongs to.
    pub origin_mid: Option<i64>,
    cancel: &'a CancellationToken,
}

impl Turn<'_> {
    pub fn step(&self) -> &Step {
        &self.dialog.step
    }

    fn ensure_live(&self) -> Result<()> {
        ensure_live(self.cancel)
    }
}

fn ensure_live(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(DialogError::Cancelled);
    }
    Ok(())
}

/// Access level of a user, `None` until approved.
pub(crate) fn access_of(user: &User) -> Option<Access> {
    if !user.is_approved() {
        return None;
    }
    Some(match user.role {
        Role::SuperAdmin => Access::SuperAdmin,
        Role::SalonAdmin => Access::Admin,
        Role::Master => Access::Staff,
    })
}

/// Groups of steps handled by one flow module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Area {
    Main,
    Registration,
    Catalog,
    Stock,
    Supply,
    Pricing,
    Consumption,
    SubscriptionAdmin,
    Purchase,
    Report,
    Search,
}

impl Area {
    fn of(step: &Step) -> Self {
        use Step::*;
        match step {
            Idle => Area::Main,
            AwaitFio | AwaitRole { .. } | AwaitConfirmRegistration { .. } => Area::Registration,
            WhMenu { .. }
            | WhName
            | WhType { .. }
            | WhRename { .. }
            | CatMenu { .. }
            | CatName
            | CatRename { .. }
            | MatMenu { .. }
            | MatPickCat { .. }
            | MatName { .. }
            | MatRename { .. }
            | MatUnit { .. } => Area::Catalog,
            StockMenu
            | StockPickWh
            | StockList { .. }
            | StockItem { .. }
            | StockInQty { .. }
            | StockOutQty { .. }
            | StockExportPickWh
            | StockImportFile => Area::Stock,
            SupMenu
            | SupPickWh
            | SupPickMat { .. }
            | SupQty { .. }
            | SupUnitPrice { .. }
            | SupCart { .. }
            | SupExportPickWh
            | SupImportFile => Area::Supply,
            PriceMenu
            | PriceMatMenu
            | PriceMatExportPickWh
            | PriceMatImportFile
            | PriceRentMenu
            | PriceRentImportFile
            | RatesPickPu
            | RatesPickSub { .. }
            | RatesList { .. }
            | RatesCreateMin { .. }
            | RatesCreateMax { .. }
            | RatesCreateThreshold { .. }
            | RatesCreatePriceWith { .. }
            | RatesCreatePriceOwn { .. }
            | RatesConfirm { .. } => Area::Pricing,
            ConsPlace
            | ConsQty { .. }
            | ConsCart { .. }
            | ConsMatPick { .. }
            | ConsMatQty { .. }
            | ConsSummary { .. } => Area::Consumption,
            SubsAdminMenu
            | SubsPickUser
            | SubsPickPlaceUnit { .. }
            | SubsEnterQty { .. }
            | SubsConfirm { .. } => Area::SubscriptionAdmin,
            SubBuyPlace | SubBuyQty { .. } | SubBuyConfirm { .. } => Area::Purchase,
            ReportRentPeriod => Area::Report,
            MasterStockSearchByName => Area::Search,
        }
    }

    /// Access needed to act inside the area.
    fn access(&self) -> Option<Access> {
        match self {
            Area::Main | Area::Registration => None,
            Area::Consumption | Area::Purchase | Area::Search => Some(Access::Staff),
            Area::Catalog | Area::Stock | Area::Supply => Some(Access::Admin),
            Area::Pricing | Area::SubscriptionAdmin | Area::Report => Some(Access::SuperAdmin),
        }
    }
}

/// Dialog controller.
///
/// Holds no per-chat state in memory; every event reads and writes the
/// chat's dialog through the [`DialogStore`]. Callers must not run two
/// events of the same chat concurrently.
pub struct Controller<S: ChatSender> {
    pool: PgPool,
    store: Arc<dyn DialogStore>,
    sender: S,
    settings: DialogSettings,
    stats: Arc<Stats>,
}

impl<S: ChatSender> Controller<S> {
    pub fn new(
        pool: PgPool,
        store: Arc<dyn DialogStore>,
        sender: S,
        settings: DialogSettings,
    ) -> Self {
        Self {
            pool,
            store,
            sender,
            settings,
            stats: Arc::new(Stats::default()),
        }
    }

    pub fn sender(&self) -> &S {
        &self.sender
    }

    /// Counters shared with the metrics endpoint.
    pub fn stats(&self) -> Arc<Stats> {
        Arc::clone(&self.stats)
    }

    pub fn settings(&self) -> &DialogSettings {
        &self.settings
    }

    /// Handle one chat event end-to-end.
    ///
    /// Errors the dialog can recover from are answered in chat and reported
    /// as success. Store and transport errors are logged, answered with a
    /// generic message and returned. A cancelled event writes nothing more to
    /// the dialog store and reports success.
    pub async fn handle(&self, event: ChatEvent, cancel: &CancellationToken) -> Result<()> {
        let chat_id = event.chat_id;
        debug!(chat_id, kind = event.kind_name(), "Handling event");

        match self.process(&event, cancel).await {
            Ok(()) => Ok(()),
            Err(DialogError::Cancelled) => {
                info!(chat_id, "Event cancelled");
                Ok(())
            }
            Err(e) => {
                error!(chat_id, kind = event.kind_name(), error = %e, "Event failed");
                if let Err(send_err) = self.sender.send_text(chat_id, &e.user_message()).await {
                    warn!(chat_id, "Failed to report error: {}", send_err);
                }
                Err(e)
            }
        }
    }

    async fn process(&self, event: &ChatEvent, cancel: &CancellationToken) -> Result<()> {
        ensure_live(cancel)?;
        let chat_id = event.chat_id;

        let origin_mid = match &event.kind {
            EventKind::Button {
                callback_id,
                message_id,
                ..
            } => {
                if let Err(e) = self.sender.answer_callback(callback_id, None).await {
                    warn!(chat_id, "Failed to answer callback: {}", e);
                }
                *message_id
            }
            _ => None,
        };

        let dialog = self.load_dialog(chat_id).await?;

        if is_cancel(event) {
            return self.cancel_dialog(chat_id, &dialog, cancel).await;
        }

        let user = self.caller(event).await?;
        let turn = Turn {
            chat_id,
            user,
            dialog,
            origin_mid,
            cancel,
        };

        match self.dispatch(&turn, event).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_recoverable() => self.recover(&turn, e).await,
            Err(e) => {
                error!(
                    chat_id,
                    state = turn.step().name(),
                    error = %e,
                    "Handler failed"
                );
                Err(e)
            }
        }
    }

    async fn load_dialog(&self, chat_id: i64) -> Result<Dialog> {
        match self.store.load(chat_id).await {
            Ok(dialog) => Ok(dialog.unwrap_or_default()),
            Err(DialogError::Protocol(reason)) => {
                warn!(chat_id, %reason, "Discarding undecodable dialog");
                self.store.reset(chat_id).await?;
                Ok(Dialog::idle())
            }
            Err(e) => Err(e),
        }
    }

    async fn caller(&self, event: &ChatEvent) -> Result<User> {
        let name = match event.display_name.trim() {
            "" => format!("chat {}", event.chat_id),
            name => name.to_string(),
        };
        let user = if event.chat_id == self.settings.admin_chat_id {
            user::ensure_super_admin(&self.pool, event.chat_id, &name).await?
        } else {
            user::touch_user(&self.pool, event.chat_id, &name).await?
        };
        Ok(user)
    }

    async fn cancel_dialog(
        &self,
        chat_id: i64,
        dialog: &Dialog,
        cancel: &CancellationToken,
    ) -> Result<()> {
        self.strip_keyboard(chat_id, dialog.last_mid).await;
        ensure_live(cancel)?;
        self.store.reset(chat_id).await?;
        info!(chat_id, state = dialog.step.name(), "Dialog cancelled");

        self.sender
            .send_keyboard(chat_id, "Cancelled.", &Keyboard::new().home())
            .await?;
        Ok(())
    }

    async fn dispatch(&self, turn: &Turn<'_>, event: &ChatEvent) -> Result<()> {
        match &event.kind {
            EventKind::Text(text) if text.starts_with('/') => self.command(turn, text).await,
            EventKind::Text(text) => self.on_text(turn, text.trim()).await,
            EventKind::Button { data, .. } => {
                let callback: Callback = data.parse()?;
                debug!(chat_id = turn.chat_id, state = turn.step().name(), %callback, "Button");
                self.on_button(turn, callback).await
            }
            EventKind::Document { file_id, file_name } => {
                self.on_document(turn, file_id, file_name).await
            }
        }
    }

    async fn command(&self, turn: &Turn<'_>, text: &str) -> Result<()> {
        let command = text
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .split('@')
            .next()
            .unwrap_or_default();

        match command {
            "/start" => self.start(turn).await,
            "/menu" => self.enter(turn, Step::Idle).await,
            "/help" => {
                self.sender.send_text(turn.chat_id, HELP_TEXT).await?;
                Ok(())
            }
            _ => Err(DialogError::validation("Unknown command. Send /help.")),
        }
    }

    async fn on_button(&self, turn: &Turn<'_>, callback: Callback) -> Result<()> {
        match callback {
            Callback::Cancel | Callback::MainMenu => return self.enter(turn, Step::Idle).await,
            Callback::Menu(entry) => return self.open_menu(turn, entry).await,
            Callback::UserApprove(id) => return self.decide_registration(turn, id, true).await,
            Callback::UserReject(id) => return self.decide_registration(turn, id, false).await,
            _ => {}
        }

        if let (Some(origin), Some(last)) = (turn.origin_mid, turn.dialog.last_mid) {
            if origin != last {
                return Err(DialogError::protocol(format!(
                    "button from message {origin}, expected {last}"
                )));
            }
        }

        if callback == Callback::Back {
            return self.enter(turn, turn.step().parent()).await;
        }

        let area = Area::of(turn.step());
        self.require(turn, area)?;
        match area {
            Area::Main => Err(DialogError::protocol(format!("{callback} in idle"))),
            Area::Registration => self.registration_button(turn, callback).await,
            Area::Catalog => self.catalog_button(turn, callback).await,
            Area::Stock => self.stock_button(turn, callback).await,
            Area::Supply => self.supply_button(turn, callback).await,
            Area::Pricing => self.pricing_button(turn, callback).await,
            Area::Consumption => self.consumption_button(turn, callback).await,
            Area::SubscriptionAdmin | Area::Purchase => {
                self.subscription_button(turn, callback).await
            }
            Area::Report | Area::Search => Err(stale(turn, callback)),
        }
    }

    async fn on_text(&self, turn: &Turn<'_>, text: &str) -> Result<()> {
        let area = Area::of(turn.step());
        self.require(turn, area)?;
        match area {
            Area::Main => Err(DialogError::validation(
                "Use the menu buttons, or send /menu.",
            )),
            Area::Registration => self.registration_text(turn, text).await,
            Area::Catalog => self.catalog_text(turn, text).await,
            Area::Stock => self.stock_text(turn, text).await,
            Area::Supply => self.supply_text(turn, text).await,
            Area::Pricing => self.pricing_text(turn, text).await,
            Area::Consumption => self.consumption_text(turn, text).await,
            Area::SubscriptionAdmin | Area::Purchase => self.subscription_text(turn, text).await,
            Area::Report => self.report_text(turn, text).await,
            Area::Search => self.search_text(turn, text).await,
        }
    }

    async fn on_document(&self, turn: &Turn<'_>, file_id: &str, file_name: &str) -> Result<()> {
        if !turn.step().expects_file() {
            return Err(DialogError::validation(
                "I was not expecting a file here. Open an import from the menu first.",
            ));
        }
        if !file_name.to_ascii_lowercase().ends_with(".xlsx") {
            return Err(DialogError::validation("Please send an .xlsx file."));
        }
        self.require(turn, Area::of(turn.step()))?;

        let bytes = self.sender.fetch_document(file_id).await?;
        info!(
            chat_id = turn.chat_id,
            state = turn.step().name(),
            file_name,
            size = bytes.len(),
            "Importing file"
        );

        match turn.step() {
            Step::StockImportFile => self.import_stock(turn, &bytes).await,
            Step::SupImportFile => self.import_supplies(turn, &bytes).await,
            Step::PriceMatImportFile => self.import_prices(turn, &bytes).await,
            Step::PriceRentImportFile => self.import_rates(turn, &bytes).await,
            other => Err(DialogError::protocol(format!("file in {}", other.name()))),
        }
    }

    fn require(&self, turn: &Turn<'_>, area: Area) -> Result<()> {
        match area.access() {
            Some(needed) if access_of(&turn.user).map_or(true, |has| has < needed) => {
                Err(DialogError::AccessDenied)
            }
            _ => Ok(()),
        }
    }

    async fn open_menu(&self, turn: &Turn<'_>, entry: MenuEntry) -> Result<()> {
        let Some(access) = access_of(&turn.user) else {
            debug!(
                chat_id = turn.chat_id,
                menu = entry.as_str(),
                "Ignoring menu from unapproved user"
            );
            return Ok(());
        };
        if access < entry.access() {
            return Err(DialogError::AccessDenied);
        }

        let step = match entry {
            MenuEntry::Consumption => Step::ConsPlace,
            MenuEntry::BuySubscription => Step::SubBuyPlace,
            MenuEntry::MySubscriptions => return self.my_subscriptions(turn).await,
            MenuEntry::Search => Step::MasterStockSearchByName,
            MenuEntry::Stock => Step::StockMenu,
            MenuEntry::Supplies => Step::SupMenu,
            MenuEntry::Warehouses => Step::WhMenu { warehouse_id: None },
            MenuEntry::Categories => Step::CatMenu { category_id: None },
            MenuEntry::Materials => Step::MatMenu { material_id: None },
            MenuEntry::Prices => Step::PriceMenu,
            MenuEntry::Subscriptions => Step::SubsAdminMenu,
            MenuEntry::Report => Step::ReportRentPeriod,
        };
        self.enter(turn, step).await
    }

    fn main_menu(&self, user: &User) -> Screen {
        let Some(access) = access_of(user) else {
            return Screen::text(match user.status {
                salon_core::UserStatus::Rejected => {
                    "Your registration was rejected. Send /start to apply again."
                }
                _ => "Your access is not approved yet. Send /start to register.",
            });
        };

        let buttons = MenuEntry::ALL
            .into_iter()
            .filter(|entry| entry.access() <= access)
            .map(|entry| Button::callback(entry.label(), Callback::Menu(entry)))
            .collect();
        Screen::with(
            format!("Main menu · {} ({})", user.name, user.role.label()),
            Keyboard::new().grid(buttons, 2),
        )
    }

    async fn screen(&self, turn: &Turn<'_>, step: &Step) -> Result<Screen> {
        match Area::of(step) {
            Area::Main => Ok(self.main_menu(&turn.user)),
            Area::Registration => Ok(registration::screen(step)),
            Area::Catalog => self.catalog_screen(step).await,
            Area::Stock => self.stock_screen(step).await,
            Area::Supply => self.supply_screen(step).await,
            Area::Pricing => self.pricing_screen(step).await,
            Area::Consumption => self.consumption_screen(step).await,
            Area::SubscriptionAdmin | Area::Purchase => self.subscription_screen(step).await,
            Area::Report | Area::Search => Ok(report::screen(step)),
        }
    }

    /// Move the chat to `step`: strip the previous keyboard, show the step's
    /// screen and persist the dialog.
    pub(crate) async fn enter(&self, turn: &Turn<'_>, step: Step) -> Result<()> {
        let screen = self.screen(turn, &step).await?;
        self.strip_keyboard(turn.chat_id, turn.dialog.last_mid).await;

        let last_mid = match &screen.keyboard {
            Some(keyboard) => Some(
                self.sender
                    .send_keyboard(turn.chat_id, &screen.text, keyboard)
                    .await?,
            ),
            None => {
                self.sender.send_text(turn.chat_id, &screen.text).await?;
                None
            }
        };

        turn.ensure_live()?;
        if step == Step::Idle && last_mid.is_none() {
            self.store.reset(turn.chat_id).await?;
        } else {
            self.store
                .save(turn.chat_id, &Dialog::new(step.clone(), last_mid))
                .await?;
        }
        debug!(chat_id = turn.chat_id, state = step.name(), "Entered step");
        Ok(())
    }

    /// End the dialog with a closing message.
    pub(crate) async fn finish(
        &self,
        turn: &Turn<'_>,
        text: &str,
        keyboard: Keyboard,
    ) -> Result<()> {
        self.strip_keyboard(turn.chat_id, turn.dialog.last_mid).await;
        turn.ensure_live()?;
        self.store.reset(turn.chat_id).await?;
        self.sender
            .send_keyboard(turn.chat_id, text, &keyboard.home())
            .await?;
        Ok(())
    }

    async fn recover(&self, turn: &Turn<'_>, err: DialogError) -> Result<()> {
        info!(
            chat_id = turn.chat_id,
            state = turn.step().name(),
            error = %err,
            "Recovering in dialog"
        );
        self.sender
            .send_text(turn.chat_id, &err.user_message())
            .await?;

        match err {
            DialogError::NotFound(_) | DialogError::Protocol(_) => {
                match self.enter(turn, turn.step().parent()).await {
                    Err(e) if e.is_recoverable() => self.enter(turn, Step::Idle).await,
                    other => other,
                }
            }
            DialogError::TariffMissing(detail) => {
                self.notify_super_admin(&format!(
                    "⚠️ {} could not be priced: {detail}. Please configure the rent tariffs.",
                    turn.user.name
                ))
                .await;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    async fn strip_keyboard(&self, chat_id: i64, message_id: Option<i64>) {
        if let Some(message_id) = message_id {
            if let Err(e) = self.sender.clear_keyboard(chat_id, message_id).await {
                debug!(chat_id, message_id, "Could not clear keyboard: {}", e);
            }
        }
    }

    pub(crate) fn current_month(&self) -> String {
        month_key(Utc::now(), self.settings.offset)
    }

    pub(crate) fn payment_link(&self, invoice_id: i64) -> String {
        format!(
            "{}/payments/pay?invoice={invoice_id}",
            self.settings.payment_base_url.trim_end_matches('/')
        )
    }

    pub(crate) async fn notify_super_admin(&self, text: &str) {
        if let Err(e) = self.sender.send_text(self.settings.admin_chat_id, text).await {
            warn!("Failed to notify super-admin: {}", e);
        }
    }

    /// Send to the super-admin and every approved admin, once per chat.
    pub(crate) async fn notify_admins(&self, text: &str) {
        let admins = match user::admin_chat_ids(&self.pool).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!("Failed to list admins: {}", e);
                Vec::new()
            }
        };
        for chat_id in notify::recipients(self.settings.admin_chat_id, admins) {
            if let Err(e) = self.sender.send_text(chat_id, text).await {
                warn!(chat_id, "Failed to notify admin: {}", e);
            }
        }
    }

    /// Tell admins about balances that fell low after `changes`.
    pub(crate) async fn check_low_stock(&self, changes: &[StockChange]) {
        if changes.is_empty() {
            return;
        }
        match notify::low_stock_lines(&self.pool, changes).await {
            Ok(lines) if !lines.is_empty() => {
                info!(count = lines.len(), "Low stock detected");
                self.notify_admins(&notify::low_stock_text(&lines)).await;
            }
            Ok(_) => {}
            Err(e) => warn!("Low-stock check failed: {}", e),
        }
    }

    /// Buttons for active warehouses.
    pub(crate) async fn warehouse_buttons(&self, to: fn(i64) -> Callback) -> Result<Vec<Button>> {
        let warehouses = warehouse::list_warehouses(&self.pool, true).await?;
        Ok(warehouses
            .into_iter()
            .map(|w| Button::callback(format!("{} · {}", w.name, w.kind.label()), to(w.id)))
            .collect())
    }

    pub(crate) async fn send_file(
        &self,
        chat_id: i64,
        file_name: &str,
        bytes: Vec<u8>,
        caption: &str,
    ) -> Result<()> {
        info!(chat_id, file_name, size = bytes.len(), "Sending export");
        self.sender
            .send_document(chat_id, file_name, bytes, Some(caption))
            .await
    }
}

fn is_cancel(event: &ChatEvent) -> bool {
    match &event.kind {
        EventKind::Button { data, .. } => data == "nav:cancel",
        EventKind::Text(text) => text.trim() == "/cancel" || text.trim().starts_with("/cancel@"),
        EventKind::Document { .. } => false,
    }
}

/// Error for a button the current step does not accept.
pub(crate) fn stale(turn: &Turn<'_>, callback: Callback) -> DialogError {
    DialogError::protocol(format!("{callback} in {}", turn.step().name()))
}

/// Error for text typed where a button is expected.
pub(crate) fn use_buttons() -> DialogError {
    DialogError::validation("Please use the buttons below.")
}

#[cfg(test)]
mod tests;
