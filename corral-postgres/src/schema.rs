//! The product catalogue schema.
//!
//! ```text
//! brand ◀── product ◀── sku ──▶ product_size
//!                        └────▶ product_color
//! ```
//!
//! Sizes and colors are fixed reference rows; brands, products and SKUs are
//! loaded by [`crate::seed`].

use tracing::info;

use crate::connection::PgConnection;
use crate::error::PgResult;

/// Fixed product sizes, by id.
pub const SIZES: [(i32, &str); 3] = [(1, "Small"), (2, "Medium"), (3, "Large")];

/// Fixed product colors, by id.
pub const COLORS: [(i32, &str); 2] = [(1, "Blue"), (2, "Black")];

const CREATE_TABLES: &[(&str, &str)] = &[
    (
        "brand",
        "CREATE TABLE IF NOT EXISTS brand(
            brand_id SERIAL PRIMARY KEY,
            brand_name TEXT NOT NULL
        )",
    ),
    (
        "product",
        "CREATE TABLE IF NOT EXISTS product(
            product_id SERIAL PRIMARY KEY,
            product_name TEXT NOT NULL,
            brand_id INT NOT NULL REFERENCES brand(brand_id)
        )",
    ),
    (
        "product_color",
        "CREATE TABLE IF NOT EXISTS product_color(
            product_color_id SERIAL PRIMARY KEY,
            product_color_name TEXT NOT NULL
        )",
    ),
    (
        "product_size",
        "CREATE TABLE IF NOT EXISTS product_size(
            product_size_id SERIAL PRIMARY KEY,
            product_size_name TEXT NOT NULL
        )",
    ),
    (
        "sku",
        "CREATE TABLE IF NOT EXISTS sku(
            sku_id SERIAL PRIMARY KEY,
            product_id INT NOT NULL REFERENCES product(product_id),
            product_size_id INT NOT NULL REFERENCES product_size(product_size_id),
            product_color_id INT NOT NULL REFERENCES product_color(product_color_id)
        )",
    ),
];

const DROP_TABLES: &str = "DROP TABLE IF EXISTS sku, product, product_size, product_color, brand";

const INSERT_SIZE: &str = "INSERT INTO product_size VALUES($1, $2) ON CONFLICT DO NOTHING";
const INSERT_COLOR: &str = "INSERT INTO product_color VALUES($1, $2) ON CONFLICT DO NOTHING";

/// Row counts of every catalogue table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct TableCounts {
    /// Rows in `brand`.
    pub brands: i64,
    /// Rows in `product`.
    pub products: i64,
    /// Rows in `sku`.
    pub skus: i64,
    /// Rows in `product_size`.
    pub sizes: i64,
    /// Rows in `product_color`.
    pub colors: i64,
}

/// Create every table and insert the reference sizes and colors.
///
/// Safe to run repeatedly.
pub async fn init_schema(conn: &mut PgConnection) -> PgResult<()> {
    for (table, ddl) in CREATE_TABLES {
        conn.batch_execute(ddl).await?;
        info!(table = %table, "Table ready");
    }

    for (id, name) in SIZES {
        conn.execute(INSERT_SIZE, &[&id, &name]).await?;
    }
    for (id, name) in COLORS {
        conn.execute(INSERT_COLOR, &[&id, &name]).await?;
    }

    info!(sizes = SIZES.len(), colors = COLORS.len(), "Product schema initialized");
    Ok(())
}

/// Drop every catalogue table.
pub async fn drop_schema(conn: &PgConnection) -> PgResult<()> {
    conn.batch_execute(DROP_TABLES).await?;
    info!("Product schema dropped");
    Ok(())
}

/// Count the rows of every catalogue table.
pub async fn table_counts(conn: &mut PgConnection) -> PgResult<TableCounts> {
    let row = conn
        .query_one(
            "SELECT
                (SELECT COUNT(*) FROM brand),
                (SELECT COUNT(*) FROM product),
                (SELECT COUNT(*) FROM sku),
                (SELECT COUNT(*) FROM product_size),
                (SELECT COUNT(*) FROM product_color)",
            &[],
        )
        .await?;

    Ok(TableCounts {
        brands: row.try_get(0)?,
        products: row.try_get(1)?,
        skus: row.try_get(2)?,
        sizes: row.try_get(3)?,
        colors: row.try_get(4)?,
    })
}
