//! The product lookup workload.

use async_trait::async_trait;
use corral_core::{Batch, Task};
use serde::Serialize;
use tokio_postgres::Row;

use crate::connection::PgConnection;
use crate::error::{PgError, PgResult};

/// Every SKU of one product, with its size and color names.
pub const PRODUCT_QUERY: &str = "
    SELECT
        p.product_id,
        p.product_name,
        p.brand_id,
        s.sku_id,
        pc.product_color_name,
        ps.product_size_name
    FROM product AS p
    JOIN sku AS s ON s.product_id = p.product_id
    JOIN product_color AS pc ON pc.product_color_id = s.product_color_id
    JOIN product_size AS ps ON ps.product_size_id = s.product_size_id
    WHERE p.product_id = $1";

/// Product used by the benchmark unless told otherwise.
pub const DEFAULT_PRODUCT_ID: i32 = 100;

/// One row of [`PRODUCT_QUERY`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductSku {
    /// Product id.
    pub product_id: i32,
    /// Product name.
    pub product_name: String,
    /// Brand id.
    pub brand_id: i32,
    /// SKU id.
    pub sku_id: i32,
    /// Color name.
    pub color: String,
    /// Size name.
    pub size: String,
}

impl TryFrom<&Row> for ProductSku {
    type Error = PgError;

    fn try_from(row: &Row) -> PgResult<Self> {
        Ok(Self {
            product_id: row.try_get("product_id")?,
            product_name: row.try_get("product_name")?,
            brand_id: row.try_get("brand_id")?,
            sku_id: row.try_get("sku_id")?,
            color: row.try_get("product_color_name")?,
            size: row.try_get("product_size_name")?,
        })
    }
}

/// Look up the SKUs of one product on a pooled connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductQuery {
    /// Product to look up.
    pub product_id: i32,
}

impl ProductQuery {
    /// Create a query for `product_id`.
    pub fn new(product_id: i32) -> Self {
        Self { product_id }
    }

    /// `n` identical queries for `product_id`.
    pub fn batch(product_id: i32, n: usize) -> Batch<Self> {
        Batch::from_fn(n, |_| Self::new(product_id))
    }
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self::new(DEFAULT_PRODUCT_ID)
    }
}

#[async_trait]
impl Task<PgConnection> for ProductQuery {
    type Output = Vec<ProductSku>;
    type Error = PgError;

    async fn run(self, conn: &mut PgConnection) -> PgResult<Vec<ProductSku>> {
        let rows = conn.query(PRODUCT_QUERY, &[&self.product_id]).await?;
        rows.iter().map(ProductSku::try_from).collect()
    }

    fn label(&self) -> String {
        format!("product({})", self.product_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_is_homogeneous() {
        let batch = ProductQuery::batch(DEFAULT_PRODUCT_ID, 5);
        assert_eq!(batch.len(), 5);
        assert!(batch.iter().all(|q| *q == ProductQuery::default()));
        assert_eq!(ProductQuery::new(3).label(), "product(3)");
    }

    #[test]
    fn test_query_filters_on_one_parameter() {
        assert!(PRODUCT_QUERY.contains("WHERE p.product_id = $1"));
        assert!(!PRODUCT_QUERY.contains("$2"));
    }
}
