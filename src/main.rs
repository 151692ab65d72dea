//! Gauntlet Runner - autonomous on-chain dungeon-crawler agent
//!
//! 1. Checks the wallet session is active with enough validity left
//! 2. Observes the game through the sensor bridge each tick
//! 3. Infers the game phase and merges feed signals into run state
//! 4. Lets the policy issue at most one rate-limited transaction
//! 5. Stops on death, session expiry, or too many errors

use tracing::info;

use gauntlet_runner::{
    load_config, GameActions, GameRunner, BridgeSensor, RunStore, SurvivalPolicy, TxExecutor,
    TxRateLimiter, WalletCli,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    info!("Starting Gauntlet Runner...");

    let config = load_config()?;
    info!(
        run_id = %config.run_id,
        contract = %config.contract_address,
        adventurer = %config.adventurer_id,
        "configuration loaded"
    );

    let store = RunStore::new(config.state_dir.clone());
    store.init().await?;

    let limiter = TxRateLimiter::new(config.max_tx_per_minute, config.max_tx_per_session);
    let wallet = WalletCli::from_env();
    let mut executor = TxExecutor::new(
        wallet,
        config.contract_address.clone(),
        limiter,
        config.state_dir.clone(),
    )?;

    // Hard stop if the session is missing or about to lapse.
    executor.ensure_active_session(config.min_session_secs).await?;
    info!("wallet session active");

    let actions = GameActions::new(executor, config.adventurer_id.clone());
    let sensor = BridgeSensor::with_url(config.sensor_url.clone())?;
    let policy = SurvivalPolicy::new(config.flee_threshold_pct);

    let runner = GameRunner::new(&config, sensor, store, actions, policy);
    let reason = runner.run().await?;
    info!(?reason, "run finished");

    Ok(())
}
