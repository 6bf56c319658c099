//! Inline button payloads.
//!
//! Every button carries a short colon-separated tag such as `cons:place:hall`
//! or `adm:mat:unit:set:42:g`. [`Callback`] is the parsed form; its `Display`
//! output is the tag, and `FromStr` accepts exactly what `Display` produces.

use std::fmt;
use std::str::FromStr;

use salon_core::{MaterialUnit, Place, Role, WarehouseKind};

use crate::error::DialogError;

/// Telegram rejects callback data longer than this many bytes.
pub const MAX_TAG_LEN: usize = 64;

/// Entries of the main menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuEntry {
    Consumption,
    BuySubscription,
    MySubscriptions,
    Search,
    Stock,
    Supplies,
    Warehouses,
    Categories,
    Materials,
    Prices,
    Subscriptions,
    Report,
}

impl MenuEntry {
    pub const ALL: [MenuEntry; 12] = [
        MenuEntry::Consumption,
        MenuEntry::BuySubscription,
        MenuEntry::MySubscriptions,
        MenuEntry::Search,
        MenuEntry::Stock,
        MenuEntry::Supplies,
        MenuEntry::Warehouses,
        MenuEntry::Categories,
        MenuEntry::Materials,
        MenuEntry::Prices,
        MenuEntry::Subscriptions,
        MenuEntry::Report,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MenuEntry::Consumption => "cons",
            MenuEntry::BuySubscription => "buy",
            MenuEntry::MySubscriptions => "mysubs",
            MenuEntry::Search => "search",
            MenuEntry::Stock => "stock",
            MenuEntry::Supplies => "sup",
            MenuEntry::Warehouses => "wh",
            MenuEntry::Categories => "cat",
            MenuEntry::Materials => "mat",
            MenuEntry::Prices => "price",
            MenuEntry::Subscriptions => "subs",
            MenuEntry::Report => "report",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MenuEntry::Consumption => "🧾 Consumption",
            MenuEntry::BuySubscription => "🎟 Buy subscription",
            MenuEntry::MySubscriptions => "📅 My subscriptions",
            MenuEntry::Search => "🔎 Find material",
            MenuEntry::Stock => "📦 Stock",
            MenuEntry::Supplies => "🚚 Supplies",
            MenuEntry::Warehouses => "🏠 Warehouses",
            MenuEntry::Categories => "🗂 Categories",
            MenuEntry::Materials => "🧴 Materials",
            MenuEntry::Prices => "💰 Prices",
            MenuEntry::Subscriptions => "👥 Subscriptions",
            MenuEntry::Report => "📊 Rent report",
        }
    }

    /// Lowest access level that sees this entry.
    pub fn access(&self) -> Access {
        match self {
            MenuEntry::Consumption
            | MenuEntry::BuySubscription
            | MenuEntry::MySubscriptions
            | MenuEntry::Search => Access::Staff,
            MenuEntry::Stock
            | MenuEntry::Supplies
            | MenuEntry::Warehouses
            | MenuEntry::Categories
            | MenuEntry::Materials => Access::Admin,
            MenuEntry::Prices | MenuEntry::Subscriptions | MenuEntry::Report => Access::SuperAdmin,
        }
    }

    fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.as_str() == s)
    }
}

/// Access levels, ordered from least to most privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Access {
    /// Any approved user.
    Staff,
    /// Approved salon admin or super-admin.
    Admin,
    SuperAdmin,
}

/// A parsed button payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Callback {
    Back,
    Cancel,
    MainMenu,
    Menu(MenuEntry),

    RegRole(Role),
    RegConfirm,
    UserApprove(i64),
    UserReject(i64),

    WhNew,
    WhOpen(i64),
    WhRename(i64),
    WhToggle(i64),
    WhKind(i64, WarehouseKind),
    WhType(WarehouseKind),

    CatNew,
    CatOpen(i64),
    CatRename(i64),
    CatToggle(i64),

    MatNew,
    MatOpen(i64),
    MatRename(i64),
    MatToggle(i64),
    MatMove(i64),
    MatCategory(i64),
    MatUnit(i64),
    MatUnitSet(i64, MaterialUnit),

    StockView,
    StockExport,
    StockImport,
    StockWarehouse(i64),
    StockExportWarehouse(i64),
    StockItem(i64),
    StockIn,
    StockOut,

    SupNew,
    SupExport,
    SupImport,
    SupWarehouse(i64),
    SupExportWarehouse(i64),
    SupMaterial(i64),
    SupCurrentPrice,
    SupAdd,
    SupSave,

    PriceMaterials,
    PriceRent,
    PriceMatExport,
    PriceMatImport,
    PriceMatExportWarehouse(i64),
    PriceRentExport,
    PriceRentImport,
    PriceRentEdit,

    ConsPlace(Place),
    ConsAdd,
    ConsMaterial(i64),
    ConsCalc,
    ConsConfirm,

    SubsAdd,
    SubsUser(i64),
    SubsPlace(Place),
    SubsConfirm,

    BuyPlace(Place),
    BuyConfirm,

    RatesPlace(Place),
    RatesSub(bool),
    RatesAdd,
    RatesDelete(i64),
    RatesMaxNone,
    RatesSave,
}

impl fmt::Display for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Callback::*;
        match self {
            Back => f.write_str("nav:back"),
            Cancel => f.write_str("nav:cancel"),
            MainMenu => f.write_str("nav:menu"),
            Menu(entry) => write!(f, "menu:{}", entry.as_str()),

            RegRole(role) => write!(f, "reg:role:{role}"),
            RegConfirm => f.write_str("reg:confirm"),
            UserApprove(id) => write!(f, "adm:user:approve:{id}"),
            UserReject(id) => write!(f, "adm:user:reject:{id}"),

            WhNew => f.write_str("adm:wh:new"),
            WhOpen(id) => write!(f, "adm:wh:menu:{id}"),
            WhRename(id) => write!(f, "adm:wh:rename:{id}"),
            WhToggle(id) => write!(f, "adm:wh:toggle:{id}"),
            WhKind(id, kind) => write!(f, "adm:wh:kind:{id}:{kind}"),
            WhType(kind) => write!(f, "adm:wh:type:{kind}"),

            CatNew => f.write_str("adm:cat:new"),
            CatOpen(id) => write!(f, "adm:cat:menu:{id}"),
            CatRename(id) => write!(f, "adm:cat:rename:{id}"),
            CatToggle(id) => write!(f, "adm:cat:toggle:{id}"),

            MatNew => f.write_str("adm:mat:new"),
            MatOpen(id) => write!(f, "adm:mat:menu:{id}"),
            MatRename(id) => write!(f, "adm:mat:rename:{id}"),
            MatToggle(id) => write!(f, "adm:mat:toggle:{id}"),
            MatMove(id) => write!(f, "adm:mat:move:{id}"),
            MatCategory(id) => write!(f, "adm:mat:cat:{id}"),
            MatUnit(id) => write!(f, "adm:mat:unit:{id}"),
            MatUnitSet(id, unit) => write!(f, "adm:mat:unit:set:{id}:{unit}"),

            StockView => f.write_str("st:view"),
            StockExport => f.write_str("st:export"),
            StockImport => f.write_str("st:import"),
            StockWarehouse(id) => write!(f, "st:wh:{id}"),
            StockExportWarehouse(id) => write!(f, "st:exp:{id}"),
            StockItem(id) => write!(f, "st:item:{id}"),
            StockIn => f.write_str("st:in"),
            StockOut => f.write_str("st:out"),

            SupNew => f.write_str("sup:new"),
            SupExport => f.write_str("sup:export"),
            SupImport => f.write_str("sup:import"),
            SupWarehouse(id) => write!(f, "sup:wh:{id}"),
            SupExportWarehouse(id) => write!(f, "sup:exp:{id}"),
            SupMaterial(id) => write!(f, "sup:mat:{id}"),
            SupCurrentPrice => f.write_str("sup:price:current"),
            SupAdd => f.write_str("sup:add"),
            SupSave => f.write_str("sup:save"),

            PriceMaterials => f.write_str("price:mat"),
            PriceRent => f.write_str("price:rent"),
            PriceMatExport => f.write_str("price:mat:export"),
            PriceMatImport => f.write_str("price:mat:import"),
            PriceMatExportWarehouse(id) => write!(f, "price:exp:{id}"),
            PriceRentExport => f.write_str("price:rent:export"),
            PriceRentImport => f.write_str("price:rent:import"),
            PriceRentEdit => f.write_str("price:rent:edit"),

            ConsPlace(place) => write!(f, "cons:place:{place}"),
            ConsAdd => f.write_str("cons:add"),
            ConsMaterial(id) => write!(f, "cons:mat:{id}"),
            ConsCalc => f.write_str("cons:calc"),
            ConsConfirm => f.write_str("cons:confirm"),

            SubsAdd => f.write_str("subs:add"),
            SubsUser(id) => write!(f, "subs:user:{id}"),
            SubsPlace(place) => write!(f, "subs:pu:{place}"),
            SubsConfirm => f.write_str("subs:confirm"),

            BuyPlace(place) => write!(f, "buy:pu:{place}"),
            BuyConfirm => f.write_str("buy:confirm"),

            RatesPlace(place) => write!(f, "rates:pu:{place}"),
            RatesSub(with_sub) => write!(f, "rates:sub:{}", u8::from(*with_sub)),
            RatesAdd => f.write_str("rates:add"),
            RatesDelete(id) => write!(f, "rates:del:{id}"),
            RatesMaxNone => f.write_str("rates:max:none"),
            RatesSave => f.write_str("rates:save"),
        }
    }
}

fn id(s: &str) -> Option<i64> {
    s.parse().ok().filter(|id| *id > 0)
}

impl FromStr for Callback {
    type Err = DialogError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        use Callback::*;

        let parts: Vec<&str> = tag.split(':').collect();
        let parsed = match parts.as_slice() {
            ["nav", "back"] => Some(Back),
            ["nav", "cancel"] => Some(Cancel),
            ["nav", "menu"] => Some(MainMenu),
            ["menu", entry] => MenuEntry::parse(entry).map(Menu),

            ["reg", "role", role] => role.parse().ok().map(RegRole),
            ["reg", "confirm"] => Some(RegConfirm),
            ["adm", "user", "approve", uid] => id(uid).map(UserApprove),
            ["adm", "user", "reject", uid] => id(uid).map(UserReject),

            ["adm", "wh", "new"] => Some(WhNew),
            ["adm", "wh", "menu", wid] => id(wid).map(WhOpen),
            ["adm", "wh", "rename", wid] => id(wid).map(WhRename),
            ["adm", "wh", "toggle", wid] => id(wid).map(WhToggle),
            ["adm", "wh", "kind", wid, kind] => {
                id(wid).zip(kind.parse().ok()).map(|(w, k)| WhKind(w, k))
            }
            ["adm", "wh", "type", kind] => kind.parse().ok().map(WhType),

            ["adm", "cat", "new"] => Some(CatNew),
            ["adm", "cat", "menu", cid] => id(cid).map(CatOpen),
            ["adm", "cat", "rename", cid] => id(cid).map(CatRename),
            ["adm", "cat", "toggle", cid] => id(cid).map(CatToggle),

            ["adm", "mat", "new"] => Some(MatNew),
            ["adm", "mat", "menu", mid] => id(mid).map(MatOpen),
            ["adm", "mat", "rename", mid] => id(mid).map(MatRename),
            ["adm", "mat", "toggle", mid] => id(mid).map(MatToggle),
            ["adm", "mat", "move", mid] => id(mid).map(MatMove),
            ["adm", "mat", "cat", cid] => id(cid).map(MatCategory),
            ["adm", "mat", "unit", "set", mid, unit] => {
                id(mid).zip(unit.parse().ok()).map(|(m, u)| MatUnitSet(m, u))
            }
            ["adm", "mat", "unit", mid] => id(mid).map(MatUnit),

            ["st", "view"] => Some(StockView),
            ["st", "export"] => Some(StockExport),
            ["st", "import"] => Some(StockImport),
            ["st", "wh", wid] => id(wid).map(StockWarehouse),
            ["st", "exp", wid] => id(wid).map(StockExportWarehouse),
            ["st", "item", mid] => id(mid).map(StockItem),
            ["st", "in"] => Some(StockIn),
            ["st", "out"] => Some(StockOut),

            ["sup", "new"] => Some(SupNew),
            ["sup", "export"] => Some(SupExport),
            ["sup", "import"] => Some(SupImport),
            ["sup", "wh", wid] => id(wid).map(SupWarehouse),
            ["sup", "exp", wid] => id(wid).map(SupExportWarehouse),
            ["sup", "mat", mid] => id(mid).map(SupMaterial),
            ["sup", "price", "current"] => Some(SupCurrentPrice),
            ["sup", "add"] => Some(SupAdd),
            ["sup", "save"] => Some(SupSave),

            ["price", "mat"] => Some(PriceMaterials),
            ["price", "rent"] => Some(PriceRent),
            ["price", "mat", "export"] => Some(PriceMatExport),
            ["price", "mat", "import"] => Some(PriceMatImport),
            ["price", "exp", wid] => id(wid).map(PriceMatExportWarehouse),
            ["price", "rent", "export"] => Some(PriceRentExport),
            ["price", "rent", "import"] => Some(PriceRentImport),
            ["price", "rent", "edit"] => Some(PriceRentEdit),

            ["cons", "place", place] => place.parse().ok().map(ConsPlace),
            ["cons", "add"] => Some(ConsAdd),
            ["cons", "mat", mid] => id(mid).map(ConsMaterial),
            ["cons", "calc"] => Some(ConsCalc),
            ["cons", "confirm"] => Some(ConsConfirm),

            ["subs", "add"] => Some(SubsAdd),
            ["subs", "user", uid] => id(uid).map(SubsUser),
            ["subs", "pu", place] => place.parse().ok().map(SubsPlace),
            ["subs", "confirm"] => Some(SubsConfirm),

            ["buy", "pu", place] => place.parse().ok().map(BuyPlace),
            ["buy", "confirm"] => Some(BuyConfirm),

            ["rates", "pu", place] => place.parse().ok().map(RatesPlace),
            ["rates", "sub", "1"] => Some(RatesSub(true)),
            ["rates", "sub", "0"] => Some(RatesSub(false)),
            ["rates", "add"] => Some(RatesAdd),
            ["rates", "del", tid] => id(tid).map(RatesDelete),
            ["rates", "max", "none"] => Some(RatesMaxNone),
            ["rates", "save"] => Some(RatesSave),

            _ => None,
        };

        parsed.ok_or_else(|| DialogError::protocol(format!("unknown callback '{tag}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_tags() {
        assert_eq!("nav:cancel".parse::<Callback>().unwrap(), Callback::Cancel);
        assert_eq!(
            "cons:place:hall".parse::<Callback>().unwrap(),
            Callback::ConsPlace(Place::Hall)
        );
        assert_eq!(
            "adm:mat:unit:set:42:g".parse::<Callback>().unwrap(),
            Callback::MatUnitSet(42, MaterialUnit::Gram)
        );
        assert_eq!(
            "adm:mat:unit:42".parse::<Callback>().unwrap(),
            Callback::MatUnit(42)
        );
        assert_eq!(
            "reg:role:salon_admin".parse::<Callback>().unwrap(),
            Callback::RegRole(Role::SalonAdmin)
        );
        assert_eq!(
            "rates:sub:0".parse::<Callback>().unwrap(),
            Callback::RatesSub(false)
        );
    }

    #[test]
    fn test_rejects_malformed_tags() {
        for tag in [
            "",
            "nav",
            "nav:back:extra",
            "cons:place:garden",
            "adm:wh:menu:abc",
            "adm:wh:menu:-3",
            "adm:wh:menu:0",
            "rates:sub:2",
            "menu:unknown",
            "CONS:ADD",
        ] {
            let err = tag.parse::<Callback>().unwrap_err();
            assert!(matches!(err, DialogError::Protocol(_)), "{tag}");
        }
    }

    #[test]
    fn test_display_is_parseable_and_short() {
        let samples = [
            Callback::Back,
            Callback::Menu(MenuEntry::Report),
            Callback::UserApprove(9_000_000_001),
            Callback::WhKind(12, WarehouseKind::ClientService),
            Callback::MatUnitSet(i64::MAX, MaterialUnit::Milliliter),
            Callback::SupCurrentPrice,
            Callback::PriceMatExportWarehouse(3),
            Callback::SubsPlace(Place::Cabinet),
            Callback::RatesSub(true),
            Callback::RatesDelete(77),
        ];

        for cb in samples {
            let tag = cb.to_string();
            assert!(tag.len() <= MAX_TAG_LEN, "{tag}");
            assert!(!tag.contains(char::is_whitespace), "{tag}");
            assert_eq!(tag.parse::<Callback>().unwrap(), cb);
        }
    }

    #[test]
    fn test_menu_access_levels() {
        assert_eq!(MenuEntry::Consumption.access(), Access::Staff);
        assert_eq!(MenuEntry::Stock.access(), Access::Admin);
        assert_eq!(MenuEntry::Report.access(), Access::SuperAdmin);
        assert!(Access::SuperAdmin > Access::Admin);
    }
}
