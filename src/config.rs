//! Runner configuration
//!
//! Everything comes from environment variables with conservative
//! defaults; only the game contract address and adventurer id are
//! required. Caps default low on purpose — this thing spends real
//! transactions.

use std::path::PathBuf;

/// Configuration loaded from the environment
#[derive(Debug, Clone)]
pub struct Config {
    /// Logical run identifier (namespaces persisted state)
    pub run_id: String,

    pub tick_interval_ms: u64,
    pub tick_timeout_ms: u64,
    pub max_ticks: u64,
    pub max_consecutive_errors: u32,

    pub max_tx_per_minute: u32,
    pub max_tx_per_session: u32,
    pub min_session_secs: u64,

    /// Fixed destination contract; never overridden by callers
    pub contract_address: String,
    pub adventurer_id: String,

    pub sensor_url: String,
    pub state_dir: PathBuf,

    pub flee_threshold_pct: u32,
}

/// Load configuration from the environment
///
/// `GAME_CONTRACT_ADDRESS` and `ADVENTURER_ID` are required; an
/// optional run id can be passed as the first CLI argument.
pub fn load_config() -> anyhow::Result<Config> {
    let contract_address = std::env::var("GAME_CONTRACT_ADDRESS")
        .map_err(|_| anyhow::anyhow!("GAME_CONTRACT_ADDRESS environment variable required"))?;
    if !contract_address.starts_with("0x") {
        anyhow::bail!("GAME_CONTRACT_ADDRESS must be a hex 0x... address");
    }

    let adventurer_id = std::env::var("ADVENTURER_ID")
        .map_err(|_| anyhow::anyhow!("ADVENTURER_ID environment variable required"))?;

    let run_id = std::env::args()
        .nth(1)
        .unwrap_or_else(|| format!("run-{}", uuid::Uuid::new_v4()));

    let state_dir = std::env::var("STATE_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("/root"))
                .join(".gauntlet-runner")
                .join("state")
        });

    let sensor_url =
        std::env::var("SENSOR_URL").unwrap_or_else(|_| "http://localhost:9222".to_string());

    Ok(Config {
        run_id,
        tick_interval_ms: env_u64("TICK_INTERVAL_MS", 10_000),
        tick_timeout_ms: env_u64("TICK_TIMEOUT_MS", 30_000),
        max_ticks: env_u64("MAX_TICKS", 500),
        max_consecutive_errors: env_u32("MAX_CONSECUTIVE_ERRORS", 5),
        max_tx_per_minute: env_u32("MAX_TX_PER_MINUTE", 6),
        max_tx_per_session: env_u32("MAX_TX_PER_SESSION", 200),
        min_session_secs: env_u64("MIN_SESSION_SECS", 300),
        contract_address,
        adventurer_id,
        sensor_url,
        state_dir,
        flee_threshold_pct: env_u32("FLEE_THRESHOLD_PCT", 30),
    })
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u32(name: &str, default: u32) -> u32 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_parsers_fall_back_on_garbage() {
        // Unset variables use the default.
        assert_eq!(env_u64("GAUNTLET_TEST_UNSET_VAR", 42), 42);
        assert_eq!(env_u32("GAUNTLET_TEST_UNSET_VAR", 7), 7);

        std::env::set_var("GAUNTLET_TEST_BAD_VAR", "not-a-number");
        assert_eq!(env_u64("GAUNTLET_TEST_BAD_VAR", 42), 42);
        std::env::remove_var("GAUNTLET_TEST_BAD_VAR");
    }

    #[test]
    fn test_env_parsers_read_values() {
        std::env::set_var("GAUNTLET_TEST_GOOD_VAR", "123");
        assert_eq!(env_u64("GAUNTLET_TEST_GOOD_VAR", 42), 123);
        assert_eq!(env_u32("GAUNTLET_TEST_GOOD_VAR", 42), 123);
        std::env::remove_var("GAUNTLET_TEST_GOOD_VAR");
    }
}
