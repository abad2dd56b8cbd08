//! # Catalog Repository
//!
//! Database operations for catalog products.
//!
//! The pipeline only reads the catalog: products are owned by master-data
//! screens outside this core. `insert` exists for seeding and tests.

use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use optica_core::{CoreError, Product};

/// Repository for catalog lookups.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

#[derive(Debug, FromRow)]
struct ProductRow {
    id: String,
    kind: String,
    name: String,
    price_cents: i64,
    stock: Option<i64>,
    details: Option<String>,
}

impl ProductRow {
    fn into_product(self) -> DbResult<Product> {
        Ok(Product {
            id: self.id,
            kind: self.kind.parse().map_err(CoreError::from)?,
            name: self.name,
            price_cents: self.price_cents,
            stock: self.stock,
            details: self.details,
        })
    }
}

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    /// Inserts a product (seeding/tests; master-data screens own the
    /// catalog in production).
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, kind, name, price_cents, stock, details)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&product.id)
        .bind(product.kind.as_str())
        .bind(&product.name)
        .bind(product.price_cents)
        .bind(product.stock)
        .bind(&product.details)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Searches products by name or details.
    ///
    /// Returns an ordered candidate list `{ id, type, name, price,
    /// stock|null, meta }`. Minimum-query-length gating and debouncing are
    /// session-layer concerns; this just answers the query it is given.
    pub async fn search(&self, query: &str, limit: i64) -> DbResult<Vec<Product>> {
        debug!(query = %query, limit, "Catalog search");

        let pattern = format!("%{}%", query.trim());

        let rows: Vec<ProductRow> = sqlx::query_as(
            r#"
            SELECT id, kind, name, price_cents, stock, details
            FROM products
            WHERE name LIKE ?1 OR details LIKE ?1
            ORDER BY name
            LIMIT ?2
            "#,
        )
        .bind(&pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ProductRow::into_product).collect()
    }

    /// Gets a product by (kind-independent) id.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let row: Option<ProductRow> = sqlx::query_as(
            r#"
            SELECT id, kind, name, price_cents, stock, details
            FROM products
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ProductRow::into_product).transpose()
    }
}
