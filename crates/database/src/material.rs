//! Material catalog operations.

use salon_core::MaterialUnit;
use sqlx::PgPool;

use crate::error::{DatabaseError, Result};
use crate::models::Material;
use crate::validation::{validate_name, validate_non_negative};

const COLUMNS: &str = "id, name, category_id, unit, active, price";

/// Create a material in a category. The price starts at zero.
pub async fn create_material(
    pool: &PgPool,
    category_id: i64,
    name: &str,
    unit: MaterialUnit,
) -> Result<Material> {
    let name = validate_name("material name", name)?;
    sqlx::query_as::<_, Material>(&format!(
        r#"
        INSERT INTO materials (name, category_id, unit)
        VALUES ($1, $2, $3)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(&name)
    .bind(category_id)
    .bind(unit)
    .fetch_one(pool)
    .await
    .map_err(|e| DatabaseError::unique(e, "Material", &name))
}

pub async fn get_material(pool: &PgPool, id: i64) -> Result<Material> {
    sqlx::query_as::<_, Material>(&format!("SELECT {COLUMNS} FROM materials WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Material", id))
}

/// List materials, optionally restricted to one category and to active rows.
pub async fn list_materials(
    pool: &PgPool,
    category_id: Option<i64>,
    only_active: bool,
) -> Result<Vec<Material>> {
    let rows = sqlx::query_as::<_, Material>(&format!(
        r#"
        SELECT {COLUMNS}
        FROM materials
        WHERE ($1::bigint IS NULL OR category_id = $1)
          AND (active OR NOT $2)
        ORDER BY name
        "#
    ))
    .bind(category_id)
    .bind(only_active)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Case-insensitive substring search over active material names.
pub async fn search_materials(pool: &PgPool, needle: &str) -> Result<Vec<Material>> {
    let needle = needle.trim();
    if needle.is_empty() {
        return Ok(Vec::new());
    }

    let rows = sqlx::query_as::<_, Material>(&format!(
        r#"
        SELECT {COLUMNS}
        FROM materials
        WHERE active AND strpos(lower(name), lower($1)) > 0
        ORDER BY name
        LIMIT 50
        "#
    ))
    .bind(needle)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn rename_material(pool: &PgPool, id: i64, name: &str) -> Result<Material> {
    let name = validate_name("material name", name)?;
    sqlx::query_as::<_, Material>(&format!(
        "UPDATE materials SET name = $2 WHERE id = $1 RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(&name)
    .fetch_optional(pool)
    .await
    .map_err(|e| DatabaseError::unique(e, "Material", &name))?
    .ok_or_else(|| DatabaseError::not_found("Material", id))
}

pub async fn toggle_material(pool: &PgPool, id: i64) -> Result<Material> {
    sqlx::query_as::<_, Material>(&format!(
        "UPDATE materials SET active = NOT active WHERE id = $1 RETURNING {COLUMNS}"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::not_found("Material", id))
}

/// Move a material to another category.
pub async fn set_material_category(pool: &PgPool, id: i64, category_id: i64) -> Result<Material> {
    sqlx::query_as::<_, Material>(&format!(
        "UPDATE materials SET category_id = $2 WHERE id = $1 RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(category_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::not_found("Material", id))
}

/// Change the counting unit. Only reachable from an explicit admin action.
pub async fn set_material_unit(pool: &PgPool, id: i64, unit: MaterialUnit) -> Result<Material> {
    sqlx::query_as::<_, Material>(&format!(
        "UPDATE materials SET unit = $2 WHERE id = $1 RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(unit)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::not_found("Material", id))
}

/// Set the current price. Negative prices are rejected.
pub async fn set_material_price(pool: &PgPool, id: i64, price: f64) -> Result<Material> {
    validate_non_negative("price", price)?;
    sqlx::query_as::<_, Material>(&format!(
        "UPDATE materials SET price = $2 WHERE id = $1 RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(price)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::not_found("Material", id))
}
