//! brewpos-check: store connectivity check
//!
//! Connects both stores and prints the most recent sales visible in the
//! configured mode, one per line.
//!
//! ## Configuration
//! - BREWPOS_CONFIG: YAML configuration file (optional, `config.yaml` is read if present)
//! - BREWPOS__MODE: `primary`, `secondary` or `dual` (default: dual)
//! - BREWPOS__STORAGE__PRIMARY__URI, BREWPOS__STORAGE__SECONDARY__URI: store URIs
//! - BREWPOS_LOG: tracing filter (default: info)

use tracing::info;

use brewpos::utils::bootstrap::init_tracing;
use brewpos::{Config, DualWriteCoordinator, SalesFilter};

const RECENT_SALES: u32 = 20;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = Config::load(None)?;
    info!(mode = %config.mode, "brewpos-check starting");

    let sales = DualWriteCoordinator::connect(&config.storage).await?;
    let recent = sales
        .list(config.mode, &SalesFilter::all().limit(RECENT_SALES))
        .await?;

    info!(count = recent.len(), "Fetched recent sales");
    for sale in &recent {
        println!(
            "{:>8}  {}  {:<24} {:>4} x {:>8} = {:>9}",
            sale.id.get(),
            sale.sale_date.format("%Y-%m-%d %H:%M:%S"),
            sale.product_name,
            sale.quantity,
            sale.price_per_item.to_string(),
            sale.total_price().to_string()
        );
    }

    Ok(())
}
