//! `corral db` commands - Product database setup.

use corral_postgres::{PgConfig, PgConnection, SeedData, TableCounts, schema, seed};

use crate::cli::{DbArgs, DbInitArgs, DbSeedArgs, DbSubcommand, ConnectionArgs};
use crate::config::Config;
use crate::error::CliResult;
use crate::output::{self, kv, success};

/// Run the db command
pub async fn run(args: DbArgs, config: &Config) -> CliResult<()> {
    match args.command {
        DbSubcommand::Init(init_args) => run_init(init_args, config).await,
        DbSubcommand::Seed(seed_args) => run_seed(seed_args, config).await,
        DbSubcommand::Status(connection) => run_status(connection, config).await,
    }
}

/// Run `corral db init` - Create the product schema
async fn run_init(args: DbInitArgs, config: &Config) -> CliResult<()> {
    output::header("Database Init");

    let pg = config.pg_config(args.connection.url.as_deref())?;
    let mut conn = connect(&pg).await?;
    let total = if args.reset { 3 } else { 2 };
    let mut current = 1;

    if args.reset {
        output::warn("Existing product rows will be deleted");
        output::step(current, total, "Dropping existing tables...");
        schema::drop_schema(&conn).await?;
        current += 1;
    }

    output::step(current, total, "Creating tables and reference rows...");
    schema::init_schema(&mut conn).await?;

    output::step(total, total, "Counting rows...");
    let counts = schema::table_counts(&mut conn).await?;
    conn.close().await;

    output::newline();
    print_counts(&counts);
    output::newline();
    success("Product database is ready!");
    if counts.products == 0 {
        output::info("Run `corral db seed` to load brands, products and SKUs");
    }
    Ok(())
}

/// Run `corral db seed` - Load random catalogue rows
async fn run_seed(args: DbSeedArgs, config: &Config) -> CliResult<()> {
    output::header("Database Seed");

    let seed_config = config.seed_config(args.brands, args.products, args.skus);
    kv("Brands", &seed_config.brands.to_string());
    kv("Products", &seed_config.products.to_string());
    kv("SKUs", &seed_config.skus.to_string());
    output::newline();

    output::step(1, 3, "Generating rows...");
    let data = SeedData::generate(&seed_config)?;

    let pg = config.pg_config(args.connection.url.as_deref())?;
    let mut conn = connect(&pg).await?;

    output::step(2, 3, "Inserting rows...");
    let report = seed::load(&mut conn, &data).await?;

    output::step(3, 3, "Counting rows...");
    let counts = schema::table_counts(&mut conn).await?;
    conn.close().await;

    output::newline();
    print_counts(&counts);
    output::newline();
    success(&format!(
        "Inserted {} brands, {} products and {} SKUs",
        report.brands, report.products, report.skus
    ));
    Ok(())
}

/// Run `corral db status` - Show table row counts
async fn run_status(args: ConnectionArgs, config: &Config) -> CliResult<()> {
    output::header("Database Status");

    let pg = config.pg_config(args.url.as_deref())?;
    let mut conn = connect(&pg).await?;
    let counts = schema::table_counts(&mut conn).await?;
    conn.close().await;

    print_counts(&counts);
    Ok(())
}

async fn connect(pg: &PgConfig) -> CliResult<PgConnection> {
    kv("Database", &pg.redacted_url());
    let conn = PgConnection::connect(pg, 0).await?;
    kv("Server", &conn.server_version().await?);
    output::newline();
    Ok(conn)
}

fn print_counts(counts: &TableCounts) {
    output::section("Rows");
    kv("brand", &counts.brands.to_string());
    kv("product", &counts.products.to_string());
    kv("sku", &counts.skus.to_string());
    kv("product_size", &counts.sizes.to_string());
    kv("product_color", &counts.colors.to_string());
}
