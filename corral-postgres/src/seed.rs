//! Random catalogue data.
//!
//! Rows are generated up front as a [`SeedData`] value and then inserted
//! in one transaction. Generated rows refer to each other by 1-based
//! position; [`load`] maps positions to the ids the database assigns, so
//! seeding works on tables that already hold rows.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::connection::PgConnection;
use crate::error::{PgError, PgResult};
use crate::schema::{COLORS, SIZES};

/// Words brand and product names are built from.
pub const COMMON_WORDS: &[&str] = &[
    "time", "year", "people", "way", "day", "man", "thing", "woman", "life", "child",
    "world", "school", "state", "family", "student", "group", "country", "problem", "hand", "part",
    "place", "case", "week", "company", "system", "program", "question", "work", "government", "number",
    "night", "point", "home", "water", "room", "mother", "area", "money", "story", "fact",
    "month", "lot", "right", "study", "book", "eye", "job", "word", "business", "issue",
    "side", "kind", "head", "house", "service", "friend", "father", "power", "hour", "game",
    "line", "end", "member", "law", "car", "city", "community", "name", "president", "team",
    "minute", "idea", "kid", "body", "information", "back", "parent", "face", "others", "level",
    "office", "door", "health", "person", "art", "war", "history", "party", "result", "change",
    "morning", "reason", "research", "girl", "guy", "moment", "air", "doctor", "force", "education",
];

/// How many rows of each kind to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedConfig {
    /// Number of brands.
    pub brands: usize,
    /// Number of products.
    pub products: usize,
    /// Number of SKUs.
    pub skus: usize,
    /// Words per product name.
    pub words_per_product: usize,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            brands: 100,
            products: 1_000,
            skus: 100_000,
            words_per_product: 10,
        }
    }
}

impl SeedConfig {
    /// Check the configuration can produce consistent rows.
    pub fn validate(&self) -> PgResult<()> {
        if self.products > 0 && self.brands == 0 {
            return Err(PgError::config("products need at least one brand"));
        }
        if self.skus > 0 && self.products == 0 {
            return Err(PgError::config("SKUs need at least one product"));
        }
        Ok(())
    }
}

/// A generated product row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRow {
    /// Product name.
    pub name: String,
    /// 1-based position of the product's brand.
    pub brand: usize,
}

/// A generated SKU row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkuRow {
    /// 1-based position of the SKU's product.
    pub product: usize,
    /// Size id.
    pub size_id: i32,
    /// Color id.
    pub color_id: i32,
}

/// Everything one seeding run inserts.
#[derive(Debug, Clone, Default)]
pub struct SeedData {
    /// Brand names.
    pub brands: Vec<String>,
    /// Products.
    pub products: Vec<ProductRow>,
    /// SKUs.
    pub skus: Vec<SkuRow>,
}

impl SeedData {
    /// Generate rows with the thread-local RNG.
    pub fn generate(config: &SeedConfig) -> PgResult<Self> {
        Self::generate_with(config, &mut rand::thread_rng())
    }

    /// Generate rows with a caller-provided RNG.
    pub fn generate_with<R: Rng + ?Sized>(config: &SeedConfig, rng: &mut R) -> PgResult<Self> {
        config.validate()?;

        let brands = brand_names(config.brands, rng);
        let products = (0..config.products)
            .map(|_| ProductRow {
                name: COMMON_WORDS
                    .choose_multiple(rng, config.words_per_product.max(1))
                    .copied()
                    .collect::<Vec<_>>()
                    .join(" "),
                brand: rng.gen_range(1..=config.brands),
            })
            .collect();
        let skus = (0..config.skus)
            .map(|_| SkuRow {
                product: rng.gen_range(1..=config.products),
                size_id: rng.gen_range(1..=SIZES.len() as i32),
                color_id: rng.gen_range(1..=COLORS.len() as i32),
            })
            .collect();

        Ok(Self {
            brands,
            products,
            skus,
        })
    }
}

/// Distinct words while they last, then words with a numeric suffix.
fn brand_names<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Vec<String> {
    let mut names: Vec<String> = COMMON_WORDS
        .choose_multiple(rng, count.min(COMMON_WORDS.len()))
        .map(|w| w.to_string())
        .collect();

    let mut round = 2;
    while names.len() < count {
        let needed = (count - names.len()).min(COMMON_WORDS.len());
        names.extend(
            COMMON_WORDS
                .choose_multiple(rng, needed)
                .map(|w| format!("{w}-{round}")),
        );
        round += 1;
    }
    names
}

/// Rows inserted by one [`load`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    /// Brands inserted.
    pub brands: usize,
    /// Products inserted.
    pub products: usize,
    /// SKUs inserted.
    pub skus: usize,
}

/// Insert `data` in a single transaction.
///
/// Requires the schema from [`crate::schema::init_schema`].
pub async fn load(conn: &mut PgConnection, data: &SeedData) -> PgResult<SeedReport> {
    let tx = conn.transaction().await?;

    let insert_brand = tx
        .prepare("INSERT INTO brand VALUES(DEFAULT, $1) RETURNING brand_id")
        .await?;
    let mut brand_ids = Vec::with_capacity(data.brands.len());
    for name in &data.brands {
        let row = tx.query_one(&insert_brand, &[name]).await?;
        brand_ids.push(row.try_get::<_, i32>(0)?);
    }
    debug!(count = brand_ids.len(), "Inserted brands");

    let insert_product = tx
        .prepare("INSERT INTO product VALUES(DEFAULT, $1, $2) RETURNING product_id")
        .await?;
    let mut product_ids = Vec::with_capacity(data.products.len());
    for product in &data.products {
        let brand_id = lookup(&brand_ids, product.brand, "brand")?;
        let row = tx.query_one(&insert_product, &[&product.name, &brand_id]).await?;
        product_ids.push(row.try_get::<_, i32>(0)?);
    }
    debug!(count = product_ids.len(), "Inserted products");

    let insert_skus = tx.prepare(INSERT_SKUS).await?;
    for chunk in data.skus.chunks(SKU_CHUNK) {
        let (products, sizes, colors) = sku_columns(chunk, &product_ids)?;
        tx.execute(&insert_skus, &[&products, &sizes, &colors]).await?;
    }
    debug!(count = data.skus.len(), "Inserted SKUs");

    tx.commit().await?;

    let report = SeedReport {
        brands: brand_ids.len(),
        products: product_ids.len(),
        skus: data.skus.len(),
    };
    info!(
        brands = report.brands,
        products = report.products,
        skus = report.skus,
        "Catalogue seeded"
    );
    Ok(report)
}

/// SKU rows sent per `INSERT`.
const SKU_CHUNK: usize = 10_000;

const INSERT_SKUS: &str = "INSERT INTO sku (product_id, product_size_id, product_color_id) \
     SELECT * FROM UNNEST($1::int[], $2::int[], $3::int[])";

/// Split SKU rows into the column arrays bound by [`INSERT_SKUS`].
fn sku_columns(skus: &[SkuRow], product_ids: &[i32]) -> PgResult<(Vec<i32>, Vec<i32>, Vec<i32>)> {
    let mut products = Vec::with_capacity(skus.len());
    let mut sizes = Vec::with_capacity(skus.len());
    let mut colors = Vec::with_capacity(skus.len());
    for sku in skus {
        products.push(lookup(product_ids, sku.product, "product")?);
        sizes.push(sku.size_id);
        colors.push(sku.color_id);
    }
    Ok((products, sizes, colors))
}

fn lookup(ids: &[i32], position: usize, kind: &str) -> PgResult<i32> {
    position
        .checked_sub(1)
        .and_then(|index| ids.get(index))
        .copied()
        .ok_or_else(|| PgError::query(format!("{kind} position {position} out of range")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    #[test]
    fn test_generated_rows_stay_in_range() {
        let config = SeedConfig {
            brands: 7,
            products: 40,
            skus: 500,
            words_per_product: 3,
        };
        let data = SeedData::generate_with(&config, &mut StdRng::seed_from_u64(5)).unwrap();

        assert_eq!(data.brands.len(), 7);
        assert_eq!(data.products.len(), 40);
        assert_eq!(data.skus.len(), 500);
        assert!(data.products.iter().all(|p| (1..=7).contains(&p.brand)));
        assert!(data.products.iter().all(|p| p.name.split(' ').count() == 3));
        assert!(data.skus.iter().all(|s| (1..=40).contains(&s.product)));
        assert!(data.skus.iter().all(|s| (1..=3).contains(&s.size_id)));
        assert!(data.skus.iter().all(|s| (1..=2).contains(&s.color_id)));
    }

    #[test]
    fn test_brand_names_are_distinct() {
        let mut rng = StdRng::seed_from_u64(1);
        let names = brand_names(COMMON_WORDS.len() + 30, &mut rng);
        let unique: HashSet<_> = names.iter().collect();
        assert_eq!(unique.len(), names.len());
        assert_eq!(names.len(), COMMON_WORDS.len() + 30);
    }

    #[test]
    fn test_invalid_config() {
        let config = SeedConfig {
            brands: 0,
            ..SeedConfig::default()
        };
        assert!(SeedData::generate(&config).is_err());

        let config = SeedConfig {
            products: 0,
            ..SeedConfig::default()
        };
        assert!(config.validate().is_err());

        let empty = SeedConfig {
            brands: 0,
            products: 0,
            skus: 0,
            words_per_product: 1,
        };
        let data = SeedData::generate(&empty).unwrap();
        assert!(data.brands.is_empty() && data.products.is_empty() && data.skus.is_empty());
    }

    #[test]
    fn test_lookup() {
        assert_eq!(lookup(&[10, 11], 2, "brand").unwrap(), 11);
        assert!(lookup(&[10, 11], 0, "brand").is_err());
        assert!(lookup(&[10, 11], 3, "brand").is_err());
    }

    #[test]
    fn test_sku_columns_map_positions_to_ids() {
        let skus = [
            SkuRow { product: 2, size_id: 1, color_id: 2 },
            SkuRow { product: 1, size_id: 3, color_id: 1 },
        ];
        let (products, sizes, colors) = sku_columns(&skus, &[40, 41]).unwrap();
        assert_eq!(products, vec![41, 40]);
        assert_eq!(sizes, vec![1, 3]);
        assert_eq!(colors, vec![2, 1]);

        let orphan = [SkuRow { product: 3, size_id: 1, color_id: 1 }];
        assert!(sku_columns(&orphan, &[40, 41]).is_err());
        assert!(INSERT_SKUS.contains("UNNEST($1::int[], $2::int[], $3::int[])"));
    }
}
