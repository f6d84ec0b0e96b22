//! Business knobs and the operator command line.
use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use fieldx::fxstruct;
use garde::Validate;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde::Serialize;

use crate::pricing::non_negative;
use crate::types::InventoryAction;

/// Tunables consumed by the library. The defaults are the shop's published terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShopConfig {
    /// Flat fee added to every order.
    pub delivery_fee:              Decimal,
    /// Fraction of the subtotal taken off a customer's orders until one of them is completed.
    pub first_order_discount_rate: Decimal,
    /// Upper bound of the first-order discount.
    pub first_order_discount_cap:  Decimal,
    /// How many days ahead a table can be booked.
    pub reservation_window_days:   u32,
    /// Attempts made by a checkout that keeps hitting backend lock conflicts.
    pub checkout_retries:          u32,
    /// Products at or below this stock level are reported as running low.
    pub low_stock_threshold:       i32,
}

impl Default for ShopConfig {
    fn default() -> Self {
        Self {
            delivery_fee:              Decimal::new(5000, 2),
            first_order_discount_rate: Decimal::new(10, 2),
            first_order_discount_cap:  Decimal::new(20000, 2),
            reservation_window_days:   30,
            checkout_retries:          8,
            low_stock_threshold:       10,
        }
    }
}

impl ShopConfig {
    pub fn discount_reason(&self) -> String {
        let percent = (self.first_order_discount_rate * Decimal::ONE_HUNDRED).normalize();
        format!(
            "First-time order {percent}% discount (max {})",
            self.first_order_discount_cap
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
pub enum Backend {
    Sqlite,
    Pg,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Create or upgrade the database schema.
    Migrate,
    /// Insert the sample catalog and an administrator account if they are missing.
    Seed {
        /// Username of the administrator account.
        #[clap(long, default_value = "admin")]
        admin: String,
    },
    /// Print the product catalog with stock levels.
    Products,
    /// Print the inventory audit trail, newest first.
    InventoryLog {
        /// Administrator account the listing is read as.
        #[clap(long, default_value = "admin")]
        admin:   String,
        #[clap(long)]
        product: Option<i32>,
        #[clap(long)]
        action:  Option<InventoryAction>,
    },
    /// Print the effective shop configuration as JSON.
    Config,
}

#[derive(Debug, Clone, Parser, Validate)]
#[fxstruct(no_new, get(copy))]
#[clap(about, version, name = "musubi")]
pub struct Cli {
    #[clap(subcommand)]
    #[fieldx(get(clone))]
    #[garde(skip)]
    command: Command,

    /// Database backend.
    #[clap(long, value_enum, env = "MUSUBI_BACKEND", default_value_t = Backend::Sqlite)]
    #[garde(custom(Self::backend_compiled_in))]
    backend: Backend,

    /// Path to the SQLite database file.
    #[clap(long, env = "MUSUBI_SQLITE_PATH", default_value = "musubi.sqlite3")]
    #[fieldx(get(clone))]
    #[garde(skip)]
    sqlite_path: PathBuf,

    #[clap(long, env = "MUSUBI_PG_HOST", default_value = "localhost")]
    #[fieldx(get(clone))]
    #[garde(skip)]
    pg_host: String,

    #[clap(long, env = "MUSUBI_PG_PORT", default_value_t = 5432)]
    #[garde(skip)]
    pg_port: u16,

    #[clap(long, env = "MUSUBI_PG_USER", default_value = "musubi")]
    #[fieldx(get(clone))]
    #[garde(skip)]
    pg_user: String,

    #[clap(long, env = "MUSUBI_PG_PASSWORD", hide_env_values = true, default_value = "musubi")]
    #[fieldx(get(clone))]
    #[garde(skip)]
    pg_password: String,

    #[clap(long, env = "MUSUBI_PG_DATABASE", default_value = "musubi")]
    #[fieldx(get(clone))]
    #[garde(skip)]
    pg_database: String,

    /// File to send log into. Logs go to stderr otherwise.
    #[clap(long, env = "MUSUBI_LOG_FILE")]
    #[fieldx(get(clone))]
    #[garde(skip)]
    log_file: Option<PathBuf>,

    /// Flat delivery fee.
    #[clap(long, env = "MUSUBI_DELIVERY_FEE", default_value = "50.00")]
    #[garde(custom(non_negative))]
    delivery_fee: Decimal,

    /// First-order discount as a fraction of the subtotal.
    #[clap(long, env = "MUSUBI_FIRST_ORDER_DISCOUNT_RATE", default_value = "0.10")]
    #[garde(custom(Self::fraction))]
    first_order_discount_rate: Decimal,

    /// Maximum first-order discount.
    #[clap(long, env = "MUSUBI_FIRST_ORDER_DISCOUNT_CAP", default_value = "200.00")]
    #[garde(custom(non_negative))]
    first_order_discount_cap: Decimal,

    /// How many days ahead reservations are accepted.
    #[clap(long, env = "MUSUBI_RESERVATION_WINDOW_DAYS", default_value_t = 30)]
    #[garde(range(min = 0, max = 366))]
    reservation_window_days: u32,

    /// Attempts per checkout when the database reports lock conflicts.
    #[clap(long, env = "MUSUBI_CHECKOUT_RETRIES", default_value_t = 8)]
    #[garde(range(min = 1))]
    checkout_retries: u32,
}

impl Cli {
    fn fraction(value: &Decimal, ctx: &()) -> garde::Result {
        non_negative(value, ctx)?;
        if *value > Decimal::ONE {
            Err(garde::Error::new(format!("{value} is more than 1")))
        }
        else {
            Ok(())
        }
    }

    fn backend_compiled_in(value: &Backend, _: &()) -> garde::Result {
        let (enabled, feature) = match value {
            Backend::Sqlite => (cfg!(feature = "sqlite"), "sqlite"),
            Backend::Pg => (cfg!(feature = "pg"), "pg"),
        };
        if enabled {
            Ok(())
        }
        else {
            Err(garde::Error::new(format!("Build feature '{feature}' must be enabled.")))
        }
    }

    pub fn shop_config(&self) -> ShopConfig {
        ShopConfig {
            delivery_fee: self.delivery_fee(),
            first_order_discount_rate: self.first_order_discount_rate(),
            first_order_discount_cap: self.first_order_discount_cap(),
            reservation_window_days: self.reservation_window_days(),
            checkout_retries: self.checkout_retries(),
            ..ShopConfig::default()
        }
    }
}
