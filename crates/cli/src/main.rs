mod cli;
mod health;
mod logging;

use std::sync::Arc;

use anyhow::Context;
use bb_core::{MemoryStorage, Storage};
use bb_scheduler::{BookingScheduler, CdpClientFactory, ClientFactory, SessionManager};
use clap::Parser;
use tracing::{error, info};

use crate::cli::Cli;

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init(cli.verbose);

	if let Err(err) = run(cli).await {
		error!(target = "bb", error = %err, "daemon failed");
		std::process::exit(1);
	}
}

async fn run(cli: Cli) -> anyhow::Result<()> {
	anyhow::ensure!(
		cli.encryption_key.len() == 32,
		"encryption key must be exactly 32 bytes, got {}",
		cli.encryption_key.len()
	);

	let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
	let factory: Arc<dyn ClientFactory> = Arc::new(CdpClientFactory {
		ws_endpoint: cli.cdp_endpoint.clone(),
		base_url: cli.base_url.clone(),
	});
	let sessions = Arc::new(SessionManager::new(
		Arc::clone(&storage),
		factory,
		cli.encryption_key.clone(),
	));
	let scheduler = BookingScheduler::new(storage, Arc::clone(&sessions));

	scheduler.start().context("could not start the booking scheduler")?;
	info!(target = "bb", info = %scheduler.get_schedule_info(), "boxbooker running");

	let health = tokio::spawn(health::serve(cli.health_addr.clone(), scheduler.clone()));

	tokio::signal::ctrl_c()
		.await
		.context("could not listen for the shutdown signal")?;
	info!(target = "bb", "shutdown signal received");

	scheduler.stop();
	sessions.close_all().await;
	health.abort();
	Ok(())
}
