//! Warehouses, categories and materials.

use database::{category, material, warehouse};
use salon_core::{MaterialUnit, WarehouseKind};
use tracing::info;

use super::{stale, use_buttons, Controller, Screen, Turn};
use crate::callback::Callback;
use crate::error::Result;
use crate::format;
use crate::input::parse_name;
use crate::keyboard::{Button, Keyboard};
use crate::sender::ChatSender;
use crate::state::Step;

fn active_label(active: bool) -> &'static str {
    if active {
        "active"
    } else {
        "inactive"
    }
}

fn toggle_label(active: bool) -> &'static str {
    if active {
        "🚫 Deactivate"
    } else {
        "✅ Activate"
    }
}

impl<S: ChatSender> Controller<S> {
    pub(super) async fn catalog_screen(&self, step: &Step) -> Result<Screen> {
        let screen = match step {
            Step::WhMenu { warehouse_id: None } => {
                let buttons = warehouse::list_warehouses(&self.pool, false)
                    .await?
                    .into_iter()
                    .map(|w| {
                        let mark = if w.active { "" } else { " (off)" };
                        Button::callback(
                            format!("{} · {}{mark}", w.name, w.kind.label()),
                            Callback::WhOpen(w.id),
                        )
                    })
                    .collect();
                Screen::with(
                    "🏠 Warehouses",
                    Keyboard::new()
                        .grid(buttons, 1)
                        .button("➕ New warehouse", Callback::WhNew)
                        .nav(),
                )
            }
            Step::WhMenu {
                warehouse_id: Some(id),
            } => {
                let w = warehouse::get_warehouse(&self.pool, *id).await?;
                let other = match w.kind {
                    WarehouseKind::Consumables => WarehouseKind::ClientService,
                    WarehouseKind::ClientService => WarehouseKind::Consumables,
                };
                Screen::with(
                    format!(
                        "🏠 {}\nType: {}\nStatus: {}",
                        w.name,
                        w.kind.label(),
                        active_label(w.active)
                    ),
                    Keyboard::new()
                        .row(vec![
                            Button::callback("✏️ Rename", Callback::WhRename(w.id)),
                            Button::callback(toggle_label(w.active), Callback::WhToggle(w.id)),
                        ])
                        .button(
                            format!("Make {}", other.label().to_lowercase()),
                            Callback::WhKind(w.id, other),
                        )
                        .nav(),
                )
            }
            Step::WhName => Screen::with("Enter the warehouse name:", Keyboard::new().nav()),
            Step::WhType { name } => {
                let buttons = WarehouseKind::ALL
                    .iter()
                    .copied()
                    .map(|kind| Button::callback(kind.label(), Callback::WhType(kind)))
                    .collect();
                Screen::with(
                    format!("Type of warehouse \"{name}\":"),
                    Keyboard::new().grid(buttons, 2).nav(),
                )
            }
            Step::WhRename { warehouse_id } => {
                let w = warehouse::get_warehouse(&self.pool, *warehouse_id).await?;
                Screen::with(
                    format!("New name for \"{}\":", w.name),
                    Keyboard::new().nav(),
                )
            }

            Step::CatMenu { category_id: None } => {
                let buttons = category::list_categories(&self.pool, false)
                    .await?
                    .into_iter()
                    .map(|c| {
                        let mark = if c.active { "" } else { " (off)" };
                        Button::callback(format!("{}{mark}", c.name), Callback::CatOpen(c.id))
                    })
                    .collect();
                Screen::with(
                    "🗂 Categories",
                    Keyboard::new()
                        .grid(buttons, 2)
                        .button("➕ New category", Callback::CatNew)
                        .nav(),
                )
            }
            Step::CatMenu {
                category_id: Some(id),
            } => {
                let c = category::get_category(&self.pool, *id).await?;
                Screen::with(
                    format!("🗂 {}\nStatus: {}", c.name, active_label(c.active)),
                    Keyboard::new()
                        .row(vec![
                            Button::callback("✏️ Rename", Callback::CatRename(c.id)),
                            Button::callback(toggle_label(c.active), Callback::CatToggle(c.id)),
                        ])
                        .nav(),
                )
            }
            Step::CatName => Screen::with("Enter the category name:", Keyboard::new().nav()),
            Step::CatRename { category_id } => {
                let c = category::get_category(&self.pool, *category_id).await?;
                Screen::with(format!("New name for \"{}\":", c.name), Keyboard::new().nav())
            }

            Step::MatMenu { material_id: None } => {
                let buttons = material::list_materials(&self.pool, None, false)
                    .await?
                    .into_iter()
                    .map(|m| {
                        let mark = if m.active { "" } else { " (off)" };
                        Button::callback(format!("{}{mark}", m.name), Callback::MatOpen(m.id))
                    })
                    .collect();
                Screen::with(
                    "🧴 Materials",
                    Keyboard::new()
                        .grid(buttons, 2)
                        .button("➕ New material", Callback::MatNew)
                        .nav(),
                )
            }
            Step::MatMenu {
                material_id: Some(id),
            } => {
                let m = material::get_material(&self.pool, *id).await?;
                let c = category::get_category(&self.pool, m.category_id).await?;
                Screen::with(
                    format!(
                        "🧴 {}\nCategory: {}\nUnit: {}\nPrice: {} per {}\nStatus: {}",
                        m.name,
                        c.name,
                        m.unit,
                        format::money(m.price),
                        m.unit,
                        active_label(m.active)
                    ),
                    Keyboard::new()
                        .row(vec![
                            Button::callback("✏️ Rename", Callback::MatRename(m.id)),
                            Button::callback(toggle_label(m.active), Callback::MatToggle(m.id)),
                        ])
                        .row(vec![
                            Button::callback("🗂 Category", Callback::MatMove(m.id)),
                            Button::callback("📏 Unit", Callback::MatUnit(m.id)),
                        ])
                        .nav(),
                )
            }
            Step::MatPickCat { material_id } => {
                let categories = category::list_categories(&self.pool, true).await?;
                if categories.is_empty() {
                    return Ok(Screen::with(
                        "There are no active categories. Create one first.",
                        Keyboard::new().nav(),
                    ));
                }
                let buttons = categories
                    .into_iter()
                    .map(|c| Button::callback(c.name, Callback::MatCategory(c.id)))
                    .collect();
                let text = match material_id {
                    Some(_) => "Move to category:",
                    None => "Category of the new material:",
                };
                Screen::with(text, Keyboard::new().grid(buttons, 2).nav())
            }
            Step::MatName { category_id } => {
                let c = category::get_category(&self.pool, *category_id).await?;
                Screen::with(
                    format!("Name of the new material in \"{}\":", c.name),
                    Keyboard::new().nav(),
                )
            }
            Step::MatRename { material_id } => {
                let m = material::get_material(&self.pool, *material_id).await?;
                Screen::with(format!("New name for \"{}\":", m.name), Keyboard::new().nav())
            }
            Step::MatUnit { material_id } => {
                let m = material::get_material(&self.pool, *material_id).await?;
                let buttons = MaterialUnit::ALL
                    .iter()
                    .copied()
                    .map(|unit| Button::callback(unit.as_str(), Callback::MatUnitSet(m.id, unit)))
                    .collect();
                Screen::with(
                    format!("Unit of \"{}\" (now {}):", m.name, m.unit),
                    Keyboard::new().grid(buttons, 5).nav(),
                )
            }
            other => return Err(crate::error::DialogError::protocol(other.name())),
        };
        Ok(screen)
    }

    pub(super) async fn catalog_button(&self, turn: &Turn<'_>, cb: Callback) -> Result<()> {
        let pool = &self.pool;
        match (turn.step(), cb) {
            (Step::WhMenu { .. }, Callback::WhNew) => self.enter(turn, Step::WhName).await,
            (Step::WhMenu { .. }, Callback::WhOpen(id)) => {
                self.enter(turn, Step::WhMenu { warehouse_id: Some(id) }).await
            }
            (Step::WhMenu { warehouse_id: Some(open) }, Callback::WhRename(id)) if *open == id => {
                self.enter(turn, Step::WhRename { warehouse_id: id }).await
            }
            (Step::WhMenu { warehouse_id: Some(open) }, Callback::WhToggle(id)) if *open == id => {
                let w = warehouse::toggle_warehouse(pool, id).await?;
                info!(warehouse_id = id, active = w.active, "Warehouse toggled");
                self.enter(turn, Step::WhMenu { warehouse_id: Some(id) }).await
            }
            (Step::WhMenu { warehouse_id: Some(open) }, Callback::WhKind(id, kind))
                if *open == id =>
            {
                warehouse::set_warehouse_kind(pool, id, kind).await?;
                info!(warehouse_id = id, %kind, "Warehouse type changed");
                self.enter(turn, Step::WhMenu { warehouse_id: Some(id) }).await
            }
            (Step::WhType { name }, Callback::WhType(kind)) => {
                let w = warehouse::create_warehouse(pool, name, kind).await?;
                info!(warehouse_id = w.id, %kind, "Warehouse created");
                self.enter(turn, Step::WhMenu { warehouse_id: Some(w.id) }).await
            }

            (Step::CatMenu { .. }, Callback::CatNew) => self.enter(turn, Step::CatName).await,
            (Step::CatMenu { .. }, Callback::CatOpen(id)) => {
                self.enter(turn, Step::CatMenu { category_id: Some(id) }).await
            }
            (Step::CatMenu { category_id: Some(open) }, Callback::CatRename(id)) if *open == id => {
                self.enter(turn, Step::CatRename { category_id: id }).await
            }
            (Step::CatMenu { category_id: Some(open) }, Callback::CatToggle(id)) if *open == id => {
                category::toggle_category(pool, id).await?;
                self.enter(turn, Step::CatMenu { category_id: Some(id) }).await
            }

            (Step::MatMenu { .. }, Callback::MatNew) => {
                self.enter(turn, Step::MatPickCat { material_id: None }).await
            }
            (Step::MatMenu { .. }, Callback::MatOpen(id)) => {
                self.enter(turn, Step::MatMenu { material_id: Some(id) }).await
            }
            (Step::MatMenu { material_id: Some(open) }, Callback::MatRename(id)) if *open == id => {
                self.enter(turn, Step::MatRename { material_id: id }).await
            }
            (Step::MatMenu { material_id: Some(open) }, Callback::MatToggle(id)) if *open == id => {
                material::toggle_material(pool, id).await?;
                self.enter(turn, Step::MatMenu { material_id: Some(id) }).await
            }
            (Step::MatMenu { material_id: Some(open) }, Callback::MatMove(id)) if *open == id => {
                self.enter(turn, Step::MatPickCat { material_id: Some(id) }).await
            }
            (Step::MatMenu { material_id: Some(open) }, Callback::MatUnit(id)) if *open == id => {
                self.enter(turn, Step::MatUnit { material_id: id }).await
            }
            (Step::MatPickCat { material_id: None }, Callback::MatCategory(category_id)) => {
                self.enter(turn, Step::MatName { category_id }).await
            }
            (Step::MatPickCat { material_id: Some(id) }, Callback::MatCategory(category_id)) => {
                material::set_material_category(pool, *id, category_id).await?;
                info!(material_id = id, category_id, "Material moved");
                self.enter(turn, Step::MatMenu { material_id: Some(*id) }).await
            }
            (Step::MatUnit { material_id }, Callback::MatUnitSet(id, unit))
                if *material_id == id =>
            {
                material::set_material_unit(pool, id, unit).await?;
                self.enter(turn, Step::MatMenu { material_id: Some(id) }).await
            }
            _ => Err(stale(turn, cb)),
        }
    }

    pub(super) async fn catalog_text(&self, turn: &Turn<'_>, text: &str) -> Result<()> {
        let pool = &self.pool;
        match turn.step() {
            Step::WhName => {
                let name = parse_name(text)?;
                self.enter(turn, Step::WhType { name }).await
            }
            Step::WhRename { warehouse_id } => {
                warehouse::rename_warehouse(pool, *warehouse_id, &parse_name(text)?).await?;
                self.enter(turn, Step::WhMenu { warehouse_id: Some(*warehouse_id) }).await
            }
            Step::CatName => {
                let c = category::create_category(pool, &parse_name(text)?).await?;
                info!(category_id = c.id, "Category created");
                self.enter(turn, Step::CatMenu { category_id: Some(c.id) }).await
            }
            Step::CatRename { category_id } => {
                category::rename_category(pool, *category_id, &parse_name(text)?).await?;
                self.enter(turn, Step::CatMenu { category_id: Some(*category_id) }).await
            }
            Step::MatName { category_id } => {
                let name = parse_name(text)?;
                let m = material::create_material(pool, *category_id, &name, MaterialUnit::Pcs)
                    .await?;
                info!(material_id = m.id, category_id, "Material created");
                self.enter(turn, Step::MatUnit { material_id: m.id }).await
            }
            Step::MatRename { material_id } => {
                material::rename_material(pool, *material_id, &parse_name(text)?).await?;
                self.enter(turn, Step::MatMenu { material_id: Some(*material_id) }).await
            }
            _ => Err(use_buttons()),
        }
    }
}
