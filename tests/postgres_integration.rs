//! Integration tests against a live PostgreSQL server.
//!
//! Set `CORRAL_TEST_DATABASE_URL` to a database the tests may drop and
//! recreate the product tables in. Without it every test returns early.
//!
//! ```bash
//! CORRAL_TEST_DATABASE_URL=postgresql://postgres@localhost/corral_test cargo test --test postgres_integration
//! ```

use corral::postgres::{PgConfig, PgConnection, PgPool, ProductQuery, SeedConfig, SeedData, schema, seed};
use corral::{Batch, BatchSummary, Discipline};
use pretty_assertions::assert_eq;

fn test_url() -> Option<String> {
    std::env::var("CORRAL_TEST_DATABASE_URL").ok()
}

async fn reset_and_seed(url: &str) -> PgConfig {
    let config = PgConfig::from_url(url).expect("valid test URL");
    let mut conn = PgConnection::connect(&config, 0).await.expect("connect");

    schema::drop_schema(&conn).await.expect("drop schema");
    schema::init_schema(&mut conn).await.expect("init schema");

    let data = SeedData::generate(&SeedConfig {
        brands: 5,
        products: 120,
        skus: 1_200,
        ..SeedConfig::default()
    })
    .expect("generate seed data");
    let report = seed::load(&mut conn, &data).await.expect("load seed data");
    assert_eq!((report.brands, report.products, report.skus), (5, 120, 1_200));

    let counts = schema::table_counts(&mut conn).await.expect("count rows");
    assert_eq!(counts.sizes, 3);
    assert_eq!(counts.colors, 2);
    assert_eq!(counts.skus, 1_200);

    conn.close().await;
    config
}

// One test so schema resets never race each other.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_product_queries_end_to_end() {
    let Some(url) = test_url() else {
        eprintln!("CORRAL_TEST_DATABASE_URL not set; skipping");
        return;
    };
    let config = reset_and_seed(&url).await;

    let pool = PgPool::builder()
        .config(config)
        .max_connections(3)
        .build()
        .await
        .expect("build pool");
    assert!(pool.is_healthy().await);

    let dispatcher = pool.dispatcher();

    let sequential = dispatcher
        .gather(ProductQuery::batch(100, 6), Discipline::Sequential)
        .await
        .expect("sequential queries");
    pool.resources().reset_peak();
    let concurrent = dispatcher
        .gather(ProductQuery::batch(100, 24), Discipline::Concurrent)
        .await
        .expect("concurrent queries");

    assert!(pool.status().peak_in_use <= 3);
    let rows = &sequential[0];
    assert!(rows.iter().all(|sku| sku.product_id == 100));
    assert!(concurrent.iter().all(|r| r.len() == rows.len()));

    let missing = dispatcher
        .run_concurrent(Batch::from_fn(2, |_| ProductQuery::new(-1)))
        .await;
    let summary = BatchSummary::from_completed(&missing);
    assert_eq!(summary.succeeded, 2);
    assert!(missing.iter().all(|c| c.value().is_some_and(Vec::is_empty)));

    pool.close().await;
    assert!(pool.status().closed);
}
