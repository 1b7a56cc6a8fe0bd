use anyhow::{Context, Result};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

use focus_blocker::api::{start_api_server, Dispatcher};
use focus_blocker::config::Config;
use focus_blocker::controller::StateController;
use focus_blocker::engine::{MemoryRuleEngine, RuleEngine, RuleSynchronizer};
use focus_blocker::init::{init_store, setup_logging};
use focus_blocker::passcode::{HttpEmailRelay, PasscodeService, SystemClock};

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load Config
    let config_path = std::env::args().nth(1).unwrap_or("config.toml".to_string());
    let config_exists = std::path::Path::new(&config_path).exists();
    let config = if config_exists {
        Config::load(&config_path).await?
    } else {
        Config::default()
    };

    // 2. Setup Logging
    setup_logging(&config);
    info!("Starting focus-blocker...");
    if !config_exists {
        info!("Config file not found, using defaults.");
    }

    // 3. Shared store
    let store = init_store(&config)?;

    // 4. Rule engine & synchronizer
    let engine = Arc::new(MemoryRuleEngine::new());
    let synchronizer = Arc::new(RuleSynchronizer::new(
        engine.clone() as Arc<dyn RuleEngine>,
        config.rules.clone(),
    ));

    // 5. Passcode lifecycle
    let relay = Arc::new(HttpEmailRelay::new(&config.relay).context("Failed to build relay client")?);
    let passcodes = Arc::new(PasscodeService::new(
        store.clone(),
        relay,
        Arc::new(SystemClock),
        config.passcode.clone(),
        config.relay.product_name.clone(),
    ));

    // 6. Controller: bring rules in line with stored state, then follow changes
    let controller = Arc::new(StateController::new(
        store.clone(),
        synchronizer.clone(),
        passcodes.clone(),
        config.popular_sites.clone(),
    ));
    if let Err(e) = controller.reconcile_from_store().await {
        error!("Initial reconciliation failed: {}", e);
    }
    let watcher = controller.clone().watch();

    // 7. API
    let dispatcher = Arc::new(Dispatcher::new(synchronizer, passcodes));
    let host = config
        .host
        .parse::<IpAddr>()
        .with_context(|| format!("Invalid host '{}'", config.host))?;
    let addr = SocketAddr::new(host, config.port);

    // 8. Serve until Ctrl-C
    tokio::select! {
        res = start_api_server(dispatcher, store, engine, addr) => {
            if let Err(e) = res {
                error!("API server stopped: {:#}", e);
            }
        }
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received.");
        }
    }

    watcher.abort();
    Ok(())
}
