//! Database models.

use chrono::{DateTime, Utc};
use salon_core::{
    InvoiceStatus, MaterialUnit, MovementKind, Place, RentUnit, Role, SessionStatus, UserStatus,
    WarehouseKind,
};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub use salon_core::RateTier;

/// A staff member, identified by their chat id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    /// Chat-platform identifier (unique).
    pub chat_id: i64,
    /// Full name entered at registration, or the platform display name.
    pub name: String,
    pub role: Role,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_approved(&self) -> bool {
        self.status == UserStatus::Approved
    }

    /// Approved salon-admin or super-admin.
    pub fn is_admin(&self) -> bool {
        self.is_approved() && self.role.is_admin()
    }

    pub fn is_super_admin(&self) -> bool {
        self.is_approved() && self.role == Role::SuperAdmin
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Warehouse {
    pub id: i64,
    pub name: String,
    pub kind: WarehouseKind,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Material {
    pub id: i64,
    pub name: String,
    pub category_id: i64,
    pub unit: MaterialUnit,
    pub active: bool,
    /// Current price per unit, never negative.
    pub price: f64,
}

/// A material together with its balance in one warehouse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct StockLine {
    pub warehouse_id: i64,
    pub material_id: i64,
    pub material_name: String,
    pub category_name: String,
    pub unit: MaterialUnit,
    pub price: f64,
    /// Zero when no balance row exists.
    pub qty: f64,
}

/// Append-only stock movement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Movement {
    pub id: i64,
    pub actor_id: i64,
    pub warehouse_id: i64,
    pub material_id: i64,
    /// Signed delta.
    pub qty: f64,
    pub kind: MovementKind,
    pub note: String,
    pub created_at: DateTime<Utc>,
}

/// Supply receipt with cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Supply {
    pub id: i64,
    pub actor_id: i64,
    pub warehouse_id: i64,
    pub material_id: i64,
    pub movement_id: i64,
    pub qty: f64,
    pub unit_cost: f64,
    pub total_cost: f64,
    pub created_at: DateTime<Utc>,
}

/// Supply row joined with names, for exports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct SupplyLine {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub material_id: i64,
    pub material_name: String,
    pub unit: MaterialUnit,
    pub qty: f64,
    pub unit_cost: f64,
    pub total_cost: f64,
    pub actor_name: String,
}

/// Monthly subscription bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Subscription {
    pub id: i64,
    pub user_id: i64,
    pub place: Place,
    pub unit: RentUnit,
    /// `YYYY-MM`.
    pub month: String,
    pub plan_limit: i32,
    pub total_qty: i32,
    pub used_qty: i32,
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    pub fn left(&self) -> i32 {
        (self.total_qty - self.used_qty).max(0)
    }

    /// View as a split bucket.
    pub fn bucket(&self) -> salon_core::Bucket {
        salon_core::Bucket {
            subscription_id: self.id,
            plan_limit: self.plan_limit,
            total_qty: self.total_qty,
            used_qty: self.used_qty,
        }
    }
}

/// Persisted dialog state of one chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct DialogStateRow {
    pub chat_id: i64,
    pub state: String,
    pub payload: sqlx::types::Json<serde_json::Value>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ConsumptionSession {
    pub id: i64,
    pub user_id: i64,
    pub place: Place,
    pub unit: RentUnit,
    pub qty: i32,
    pub with_sub: bool,
    pub materials_sum: f64,
    pub rounded_materials_sum: f64,
    pub rent: f64,
    /// `rent + materials_sum`.
    pub total: f64,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ConsumptionItem {
    pub id: i64,
    pub session_id: i64,
    pub material_id: i64,
    pub qty: f64,
    pub unit_price: f64,
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Invoice {
    pub id: i64,
    pub user_id: i64,
    pub session_id: i64,
    pub amount: f64,
    pub status: InvoiceStatus,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

/// Per-user aggregate of confirmed sessions in a period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct RentReportRow {
    pub user_id: i64,
    pub user_name: String,
    pub sessions: i64,
    pub qty: i64,
    pub rent: f64,
    pub materials: f64,
    pub total: f64,
}
