//! Dialog states and their payloads.
//!
//! Each [`Step`] variant carries exactly the context its screen needs. The
//! whole [`Dialog`] is stored as JSON in `dialog_states.payload`, tagged by
//! the step name, which also goes into the `state` column.

use salon_core::{MaterialUnit, Place, Quote, RentUnit, Role, SessionPart};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DialogError, Result};

/// One line of a supply cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub material_id: i64,
    pub name: String,
    pub unit: MaterialUnit,
    pub qty: f64,
    pub unit_cost: f64,
}

impl CartLine {
    pub fn total(&self) -> f64 {
        self.qty * self.unit_cost
    }
}

/// One material line of a consumption draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsItem {
    pub material_id: i64,
    pub name: String,
    pub unit: MaterialUnit,
    pub qty: f64,
    /// Price per unit when the line was priced.
    pub price: f64,
}

impl ConsItem {
    pub fn cost(&self) -> f64 {
        self.qty * self.price
    }
}

/// A consumption session being assembled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsDraft {
    pub place: Place,
    pub qty: i32,
    #[serde(default)]
    pub items: Vec<ConsItem>,
}

impl ConsDraft {
    pub fn new(place: Place, qty: i32) -> Self {
        Self {
            place,
            qty,
            items: Vec::new(),
        }
    }

    pub fn unit(&self) -> RentUnit {
        self.place.unit()
    }

    pub fn materials_sum(&self) -> f64 {
        self.items.iter().map(ConsItem::cost).sum()
    }

    /// Add `qty` of a material, merging with an existing line.
    pub fn add(&mut self, item: ConsItem) {
        match self
            .items
            .iter_mut()
            .find(|i| i.material_id == item.material_id)
        {
            Some(existing) => {
                existing.qty += item.qty;
                existing.price = item.price;
            }
            None => self.items.push(item),
        }
    }
}

/// A tier being created, filled in step by step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierDraft {
    pub place: Place,
    pub with_sub: bool,
    pub min_qty: i32,
    #[serde(default)]
    pub max_qty: Option<i32>,
    #[serde(default)]
    pub threshold: Option<f64>,
    #[serde(default)]
    pub price_with: Option<f64>,
    #[serde(default)]
    pub price_own: Option<f64>,
}

impl TierDraft {
    pub fn new(place: Place, with_sub: bool, min_qty: i32) -> Self {
        Self {
            place,
            with_sub,
            min_qty,
            max_qty: None,
            threshold: None,
            price_with: None,
            price_own: None,
        }
    }

    /// The complete tier, or `None` while fields are missing.
    pub fn to_new_tier(&self) -> Option<database::NewTier> {
        Some(database::NewTier {
            place: self.place,
            unit: self.place.unit(),
            with_sub: self.with_sub,
            min_qty: self.min_qty,
            max_qty: self.max_qty,
            threshold: self.threshold?,
            price_with: self.price_with?,
            price_own: self.price_own?,
        })
    }
}

/// Where the dialog of one chat currently is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "kebab-case")]
pub enum Step {
    Idle,

    // Registration
    AwaitFio,
    AwaitRole { name: String },
    AwaitConfirmRegistration { name: String, role: Role },

    // Warehouses. `warehouse_id` set means the card of one warehouse is open.
    WhMenu { warehouse_id: Option<i64> },
    WhName,
    WhType { name: String },
    WhRename { warehouse_id: i64 },

    // Categories
    CatMenu { category_id: Option<i64> },
    CatName,
    CatRename { category_id: i64 },

    // Materials. `MatPickCat` with a material moves it, without creates one.
    MatMenu { material_id: Option<i64> },
    MatPickCat { material_id: Option<i64> },
    MatName { category_id: i64 },
    MatRename { material_id: i64 },
    MatUnit { material_id: i64 },

    // Stock
    StockMenu,
    StockPickWh,
    StockList { warehouse_id: i64 },
    StockItem { warehouse_id: i64, material_id: i64 },
    StockInQty { warehouse_id: i64, material_id: i64 },
    StockOutQty { warehouse_id: i64, material_id: i64 },
    StockExportPickWh,
    StockImportFile,

    // Supplies
    SupMenu,
    SupPickWh,
    SupPickMat { warehouse_id: i64, cart: Vec<CartLine> },
    SupQty { warehouse_id: i64, material_id: i64, cart: Vec<CartLine> },
    SupUnitPrice { warehouse_id: i64, material_id: i64, qty: f64, cart: Vec<CartLine> },
    SupCart { warehouse_id: i64, cart: Vec<CartLine> },
    SupExportPickWh,
    SupImportFile,

    // Prices
    PriceMenu,
    PriceMatMenu,
    PriceMatExportPickWh,
    PriceMatImportFile,
    PriceRentMenu,
    PriceRentImportFile,

    // Consumption
    ConsPlace,
    ConsQty { place: Place },
    ConsCart { draft: ConsDraft },
    ConsMatPick { draft: ConsDraft },
    ConsMatQty { draft: ConsDraft, material_id: i64 },
    ConsSummary { draft: ConsDraft, parts: Vec<SessionPart>, quote: Quote },

    // Subscriptions, administered
    SubsAdminMenu,
    SubsPickUser,
    SubsPickPlaceUnit { user_id: i64 },
    SubsEnterQty { user_id: i64, place: Place },
    SubsConfirm { user_id: i64, place: Place, qty: i32 },

    // Subscriptions, bought by a master
    SubBuyPlace,
    SubBuyQty { place: Place },
    SubBuyConfirm { place: Place, qty: i32 },

    // Rent tiers
    RatesPickPu,
    RatesPickSub { place: Place },
    RatesList { place: Place, with_sub: bool },
    RatesCreateMin { place: Place, with_sub: bool },
    RatesCreateMax { draft: TierDraft },
    RatesCreateThreshold { draft: TierDraft },
    RatesCreatePriceWith { draft: TierDraft },
    RatesCreatePriceOwn { draft: TierDraft },
    RatesConfirm { draft: TierDraft },

    ReportRentPeriod,
    MasterStockSearchByName,
}

impl Step {
    /// The name stored in the `state` column.
    pub fn name(&self) -> &'static str {
        use Step::*;
        match self {
            Idle => "idle",
            AwaitFio => "await-fio",
            AwaitRole { .. } => "await-role",
            AwaitConfirmRegistration { .. } => "await-confirm-registration",
            WhMenu { .. } => "wh-menu",
            WhName => "wh-name",
            WhType { .. } => "wh-type",
            WhRename { .. } => "wh-rename",
            CatMenu { .. } => "cat-menu",
            CatName => "cat-name",
            CatRename { .. } => "cat-rename",
            MatMenu { .. } => "mat-menu",
            MatPickCat { .. } => "mat-pick-cat",
            MatName { .. } => "mat-name",
            MatRename { .. } => "mat-rename",
            MatUnit { .. } => "mat-unit",
            StockMenu => "stock-menu",
            StockPickWh => "stock-pick-wh",
            StockList { .. } => "stock-list",
            StockItem { .. } => "stock-item",
            StockInQty { .. } => "stock-in-qty",
            StockOutQty { .. } => "stock-out-qty",
            StockExportPickWh => "stock-export-pick-wh",
            StockImportFile => "stock-import-file",
            SupMenu => "sup-menu",
            SupPickWh => "sup-pick-wh",
            SupPickMat { .. } => "sup-pick-mat",
            SupQty { .. } => "sup-qty",
            SupUnitPrice { .. } => "sup-unit-price",
            SupCart { .. } => "sup-cart",
            SupExportPickWh => "sup-export-pick-wh",
            SupImportFile => "sup-import-file",
            PriceMenu => "price-menu",
            PriceMatMenu => "price-mat-menu",
            PriceMatExportPickWh => "price-mat-export-pick-wh",
            PriceMatImportFile => "price-mat-import-file",
            PriceRentMenu => "price-rent-menu",
            PriceRentImportFile => "price-rent-import-file",
            ConsPlace => "cons-place",
            ConsQty { .. } => "cons-qty",
            ConsCart { .. } => "cons-cart",
            ConsMatPick { .. } => "cons-mat-pick",
            ConsMatQty { .. } => "cons-mat-qty",
            ConsSummary { .. } => "cons-summary",
            SubsAdminMenu => "subs-admin-menu",
            SubsPickUser => "subs-pick-user",
            SubsPickPlaceUnit { .. } => "subs-pick-place-unit",
            SubsEnterQty { .. } => "subs-enter-qty",
            SubsConfirm { .. } => "subs-confirm",
            SubBuyPlace => "sub-buy-place",
            SubBuyQty { .. } => "sub-buy-qty",
            SubBuyConfirm { .. } => "sub-buy-confirm",
            RatesPickPu => "rates-pick-pu",
            RatesPickSub { .. } => "rates-pick-sub",
            RatesList { .. } => "rates-list",
            RatesCreateMin { .. } => "rates-create-min",
            RatesCreateMax { .. } => "rates-create-max",
            RatesCreateThreshold { .. } => "rates-create-threshold",
            RatesCreatePriceWith { .. } => "rates-create-price-with",
            RatesCreatePriceOwn { .. } => "rates-create-price-own",
            RatesConfirm { .. } => "rates-confirm",
            ReportRentPeriod => "report-rent-period",
            MasterStockSearchByName => "master-stock-search-by-name",
        }
    }

    /// The step "back" leads to.
    pub fn parent(&self) -> Step {
        use Step::*;
        match self.clone() {
            Idle | AwaitFio => Idle,
            AwaitRole { .. } => AwaitFio,
            AwaitConfirmRegistration { name, .. } => AwaitRole { name },

            WhMenu { warehouse_id: Some(_) } | WhName => WhMenu { warehouse_id: None },
            WhMenu { warehouse_id: None } => Idle,
            WhType { .. } => WhName,
            WhRename { warehouse_id } => WhMenu {
                warehouse_id: Some(warehouse_id),
            },

            CatMenu { category_id: Some(_) } | CatName => CatMenu { category_id: None },
            CatMenu { category_id: None } => Idle,
            CatRename { category_id } => CatMenu {
                category_id: Some(category_id),
            },

            MatMenu { material_id: Some(_) } => MatMenu { material_id: None },
            MatMenu { material_id: None } => Idle,
            MatPickCat { material_id } => MatMenu { material_id },
            MatName { .. } => MatPickCat { material_id: None },
            MatRename { material_id } | MatUnit { material_id } => MatMenu {
                material_id: Some(material_id),
            },

            StockMenu => Idle,
            StockPickWh | StockExportPickWh | StockImportFile => StockMenu,
            StockList { .. } => StockPickWh,
            StockItem { warehouse_id, .. } => StockList { warehouse_id },
            StockInQty {
                warehouse_id,
                material_id,
            }
            | StockOutQty {
                warehouse_id,
                material_id,
            } => StockItem {
                warehouse_id,
                material_id,
            },

            SupMenu => Idle,
            SupPickWh | SupExportPickWh | SupImportFile => SupMenu,
            SupPickMat { .. } => SupPickWh,
            SupQty {
                warehouse_id, cart, ..
            } => SupPickMat { warehouse_id, cart },
            SupUnitPrice {
                warehouse_id,
                material_id,
                cart,
                ..
            } => SupQty {
                warehouse_id,
                material_id,
                cart,
            },
            SupCart { warehouse_id, cart } => SupPickMat { warehouse_id, cart },

            PriceMenu => Idle,
            PriceMatMenu | PriceRentMenu => PriceMenu,
            PriceMatExportPickWh | PriceMatImportFile => PriceMatMenu,
            PriceRentImportFile | RatesPickPu => PriceRentMenu,

            ConsPlace => Idle,
            ConsQty { .. } => ConsPlace,
            ConsCart { draft } => ConsQty { place: draft.place },
            ConsMatPick { draft } => ConsCart { draft },
            ConsMatQty { draft, .. } => ConsMatPick { draft },
            ConsSummary { draft, .. } => ConsCart { draft },

            SubsAdminMenu => Idle,
            SubsPickUser => SubsAdminMenu,
            SubsPickPlaceUnit { .. } => SubsPickUser,
            SubsEnterQty { user_id, .. } => SubsPickPlaceUnit { user_id },
            SubsConfirm { user_id, place, .. } => SubsEnterQty { user_id, place },

            SubBuyPlace => Idle,
            SubBuyQty { .. } => SubBuyPlace,
            SubBuyConfirm { place, .. } => SubBuyQty { place },

            RatesPickSub { .. } => RatesPickPu,
            RatesList { place, .. } => RatesPickSub { place },
            RatesCreateMin { place, with_sub } => RatesList { place, with_sub },
            RatesCreateMax { draft } => RatesCreateMin {
                place: draft.place,
                with_sub: draft.with_sub,
            },
            RatesCreateThreshold { draft } => RatesCreateMax { draft },
            RatesCreatePriceWith { draft } => RatesCreateThreshold { draft },
            RatesCreatePriceOwn { draft } => RatesCreatePriceWith { draft },
            RatesConfirm { draft } => RatesCreatePriceOwn { draft },

            ReportRentPeriod | MasterStockSearchByName => Idle,
        }
    }

    /// Whether this step waits for an uploaded file.
    pub fn expects_file(&self) -> bool {
        matches!(
            self,
            Step::StockImportFile
                | Step::SupImportFile
                | Step::PriceMatImportFile
                | Step::PriceRentImportFile
        )
    }
}

/// The persisted dialog of one chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dialog {
    #[serde(flatten)]
    pub step: Step,
    /// Id of the last message that carried an inline keyboard.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_mid: Option<i64>,
}

impl Default for Dialog {
    fn default() -> Self {
        Self::idle()
    }
}

impl Dialog {
    pub fn idle() -> Self {
        Self {
            step: Step::Idle,
            last_mid: None,
        }
    }

    pub fn new(step: Step, last_mid: Option<i64>) -> Self {
        Self { step, last_mid }
    }

    /// Encode for the `(state, payload)` columns.
    pub fn encode(&self) -> Result<(&'static str, Value)> {
        let payload = serde_json::to_value(self)
            .map_err(|e| DialogError::protocol(format!("cannot encode dialog: {e}")))?;
        Ok((self.step.name(), payload))
    }

    /// Decode a stored row. The state column must agree with the payload.
    pub fn decode(state: &str, payload: Value) -> Result<Self> {
        let dialog: Dialog = serde_json::from_value(payload)
            .map_err(|e| DialogError::protocol(format!("cannot decode state '{state}': {e}")))?;
        if dialog.step.name() != state {
            return Err(DialogError::protocol(format!(
                "state '{state}' does not match payload step '{}'",
                dialog.step.name()
            )));
        }
        Ok(dialog)
    }
}
