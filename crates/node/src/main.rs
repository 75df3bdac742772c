// Deploys one contract instance in-process and logs its notifications.

use std::thread;

use anyhow::Context;
use clap::Parser;

use circles_contract::{CircleContract, ContractConfig};
use circles_events::{EventBus, Subscription};

#[derive(Parser)]
#[command(name = "circles-node")]
#[command(about = "In-process circle contract with notification logging", long_about = None)]
struct Cli {
    /// Run a short create/join/list walkthrough after deployment
    #[arg(long)]
    smoke: bool,

    /// Page size for the walkthrough listings (defaults to CIRCLES_DEFAULT_PAGE_SIZE)
    #[arg(long)]
    page_size: Option<usize>,
}

fn main() -> anyhow::Result<()> {
    circles_observability::init();
    let cli = Cli::parse();

    let mut config = ContractConfig::from_env();
    if let Some(page_size) = cli.page_size {
        config.default_page_size = page_size;
    }

    let contract = CircleContract::new(config);
    let logger = spawn_notification_logger(contract.bus().subscribe())?;

    tracing::info!(
        instance_id = %contract.instance_id(),
        config = ?contract.config(),
        "CircleContract deployed"
    );

    if cli.smoke {
        smoke(&contract)?;
    }

    // Dropping the contract closes the bus, which ends the logger.
    drop(contract);
    logger
        .join()
        .map_err(|_| anyhow::anyhow!("notification logger panicked"))?;
    Ok(())
}

fn spawn_notification_logger<M>(subscription: Subscription<M>) -> anyhow::Result<thread::JoinHandle<()>>
where
    M: serde::Serialize + Send + 'static,
{
    thread::Builder::new()
        .name("notifications".to_string())
        .spawn(move || {
            while let Ok(envelope) = subscription.recv() {
                match serde_json::to_string(&envelope) {
                    Ok(json) => tracing::info!(notification = %json, "notification"),
                    Err(err) => tracing::warn!(error = %err, "notification not serializable"),
                }
            }
        })
        .context("failed to spawn notification logger")
}

fn smoke(contract: &CircleContract) -> anyhow::Result<()> {
    const CIRCLE: &str = "smoke-circle";
    const ADMIN: &str = "did:admin";
    const USER: &str = "did:user1";

    let page = contract.default_page();

    contract.create_circle(CIRCLE, "smoke", ADMIN, "admin-org")?;
    contract.apply_to_join_circle(CIRCLE, USER, "user1-org", "credit-123")?;
    contract.approve_application(CIRCLE, ADMIN, USER)?;

    let (product_id, _) = contract.create_product(CIRCLE, USER, "sample", "10", 0, "ipfs-sample")?;
    contract.approve_product(CIRCLE, ADMIN, product_id)?;
    contract.set_product_on_shelf(product_id, USER, true)?;

    tracing::info!(
        circles = %contract.get_all_circles(page.page, page.page_size).encode(),
        members = %contract.get_circle_members(CIRCLE, page.page, page.page_size).encode(),
        products = %contract.get_all_products(page.page, page.page_size).encode(),
        "smoke run complete"
    );
    Ok(())
}
