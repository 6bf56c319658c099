//! Material category operations.

use sqlx::PgPool;

use crate::error::{DatabaseError, Result};
use crate::models::Category;
use crate::validation::validate_name;

pub async fn create_category(pool: &PgPool, name: &str) -> Result<Category> {
    let name = validate_name("category name", name)?;
    sqlx::query_as::<_, Category>(
        r#"
        INSERT INTO categories (name)
        VALUES ($1)
        RETURNING id, name, active
        "#,
    )
    .bind(&name)
    .fetch_one(pool)
    .await
    .map_err(|e| DatabaseError::unique(e, "Category", &name))
}

pub async fn get_category(pool: &PgPool, id: i64) -> Result<Category> {
    sqlx::query_as::<_, Category>("SELECT id, name, active FROM categories WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Category", id))
}

pub async fn list_categories(pool: &PgPool, only_active: bool) -> Result<Vec<Category>> {
    let rows = sqlx::query_as::<_, Category>(
        r#"
        SELECT id, name, active
        FROM categories
        WHERE active OR NOT $1
        ORDER BY name
        "#,
    )
    .bind(only_active)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn rename_category(pool: &PgPool, id: i64, name: &str) -> Result<Category> {
    let name = validate_name("category name", name)?;
    sqlx::query_as::<_, Category>(
        r#"
        UPDATE categories SET name = $2
        WHERE id = $1
        RETURNING id, name, active
        "#,
    )
    .bind(id)
    .bind(&name)
    .fetch_optional(pool)
    .await
    .map_err(|e| DatabaseError::unique(e, "Category", &name))?
    .ok_or_else(|| DatabaseError::not_found("Category", id))
}

pub async fn toggle_category(pool: &PgPool, id: i64) -> Result<Category> {
    sqlx::query_as::<_, Category>(
        r#"
        UPDATE categories SET active = NOT active
        WHERE id = $1
        RETURNING id, name, active
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::not_found("Category", id))
}
