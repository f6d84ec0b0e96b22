//! Operator command line for the musubi shop database.
use std::sync::Arc;
use std::sync::Mutex;

use anyhow::Context;
use clap::Parser;
use comfy_table::CellAlignment;
use garde::Validate;
use musubi_orders::config::Backend;
use musubi_orders::config::Cli;
use musubi_orders::config::Command;
use musubi_orders::prelude::*;
use rust_decimal::Decimal;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    cli.validate().context("Invalid command line")?;
    setup_tracing(&cli)?;

    match cli.backend() {
        #[cfg(feature = "sqlite")]
        Backend::Sqlite => {
            let driver = Sqlite::open(&cli.sqlite_path())
                .await
                .with_context(|| format!("Can't open {}", cli.sqlite_path().display()))?;
            run(&cli, Arc::new(driver)).await
        }
        #[cfg(feature = "pg")]
        Backend::Pg => {
            let driver = Pg::builder()
                .host(cli.pg_host())
                .port(cli.pg_port())
                .user(cli.pg_user())
                .password(cli.pg_password())
                .database(cli.pg_database())
                .build()?;
            driver.connect().await?;
            run(&cli, driver).await
        }
        #[allow(unreachable_patterns)]
        backend => anyhow::bail!("Support for {backend:?} is not compiled in"),
    }
}

fn setup_tracing(cli: &Cli) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if let Some(log_file) = cli.log_file() {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .with_context(|| format!("Can't open log file {}", log_file.display()))?;
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
            .try_init()?;
    }
    else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()?;
    }

    Ok(())
}

async fn run<D: DatabaseDriver>(cli: &Cli, driver: Arc<D>) -> anyhow::Result<()> {
    let shop = Shop::new(driver, cli.shop_config());

    match cli.command() {
        Command::Migrate => {
            shop.migrate().await?;
            info!("Database schema is up to date");
        }
        Command::Seed { admin } => {
            shop.migrate().await?;
            seed(&shop, &admin).await?;
        }
        Command::Products => print_products(&shop).await?,
        Command::InventoryLog { admin, product, action } => {
            let admin = admin_actor(&shop, &admin).await?;
            let filter = InventoryLogFilter {
                product_id: product,
                action,
            };
            print_inventory_log(&shop, &admin, filter).await?;
        }
        Command::Config => println!("{}", serde_json::to_string_pretty(shop.config())?),
    }

    shop.driver().checkpoint().await?;
    Ok(())
}

async fn admin_actor<D: DatabaseDriver>(shop: &Shop<D>, username: &str) -> anyhow::Result<Actor> {
    let account = shop
        .customer_by_username(username)
        .await?
        .with_context(|| format!("No account named '{username}'"))?;
    Ok(shop.actor(account.id).await?)
}

fn sample_product(
    name: &str,
    description: &str,
    price: i64,
    bundle: i64,
    stock: i32,
    category: ProductCategory,
) -> NewProduct {
    NewProduct {
        name: name.to_string(),
        description: description.to_string(),
        price: Decimal::new(price * 100, 2),
        bundle_price: Some(Decimal::new(bundle * 100, 2)),
        stock,
        category,
    }
}

async fn seed<D: DatabaseDriver>(shop: &Shop<D>, admin: &str) -> anyhow::Result<()> {
    let admin = match shop.customer_by_username(admin).await? {
        Some(account) => {
            info!("Administrator '{}' already exists", account.username);
            account
        }
        None => {
            shop.create_admin(NewCustomer::new(admin, &format!("{admin}@musubi.local")))
                .await?
        }
    };
    let admin = shop.actor(admin.id).await?;

    if !shop.all_products().await?.is_empty() {
        info!("Catalog is not empty, leaving it alone");
        return Ok(());
    }

    let catalog = [
        sample_product(
            "Classic Spam Musubi",
            "Traditional Hawaiian spam musubi with our special sauce",
            65,
            300,
            50,
            ProductCategory::Spam,
        ),
        sample_product(
            "Teriyaki Chicken Musubi",
            "Grilled chicken with teriyaki glaze wrapped in rice and nori",
            75,
            350,
            30,
            ProductCategory::Chicken,
        ),
        sample_product(
            "Vegetarian Tofu Musubi",
            "Marinated tofu with fresh vegetables",
            70,
            320,
            25,
            ProductCategory::Vegetarian,
        ),
        sample_product(
            "Special Hawaiian Musubi",
            "Our signature musubi with special ingredients and sauce",
            85,
            400,
            20,
            ProductCategory::Special,
        ),
    ];

    for product in catalog {
        shop.create_product(&admin, product).await?;
    }
    info!("Sample catalog created");

    Ok(())
}

async fn print_products<D: DatabaseDriver>(shop: &Shop<D>) -> anyhow::Result<()> {
    let threshold = shop.config().low_stock_threshold;
    let mut table = comfy_table::Table::new();
    table
        .load_preset(comfy_table::presets::ASCII_FULL_CONDENSED)
        .set_header(["ID", "Name", "Category", "Price", "Bundle", "Stock", "Status"]);

    for product in shop.all_products().await? {
        let status = if !product.is_active {
            "retired"
        }
        else if !product.in_stock() {
            "out of stock"
        }
        else if product.low_stock(threshold) {
            "low"
        }
        else {
            ""
        };
        table.add_row([
            product.id.to_string(),
            product.name,
            product.category.to_string(),
            format!("{:.2}", product.price),
            product.bundle_price.map(|p| format!("{p:.2}")).unwrap_or_default(),
            product.stock.to_string(),
            status.to_string(),
        ]);
    }

    for col in [0, 3, 4, 5] {
        if let Some(column) = table.column_mut(col) {
            column.set_cell_alignment(CellAlignment::Right);
        }
    }

    println!("{table}");
    Ok(())
}

async fn print_inventory_log<D: DatabaseDriver>(
    shop: &Shop<D>,
    admin: &Actor,
    filter: InventoryLogFilter,
) -> anyhow::Result<()> {
    let mut table = comfy_table::Table::new();
    table
        .load_preset(comfy_table::presets::ASCII_FULL_CONDENSED)
        .set_header(["ID", "When", "Product", "Action", "Change", "Before", "After", "By", "Notes"]);

    for log in shop.inventory_logs(admin, filter).await? {
        table.add_row([
            log.id.to_string(),
            log.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            log.product_id.to_string(),
            log.action.to_string(),
            format!("{:+}", log.quantity),
            log.previous_stock.to_string(),
            log.new_stock.to_string(),
            log.created_by.to_string(),
            log.notes.unwrap_or_default(),
        ]);
    }

    for col in [0, 2, 4, 5, 6, 7] {
        if let Some(column) = table.column_mut(col) {
            column.set_cell_alignment(CellAlignment::Right);
        }
    }

    println!("{table}");
    Ok(())
}
