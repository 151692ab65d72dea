//! Gauntlet Runner Library
//!
//! Core functionality for an autonomous agent playing an on-chain
//! dungeon crawler: game-state sensing, phase inference, and a
//! transaction-safety core (rate limiting, bundle capture/replay,
//! session-liveness checks).

pub mod actions;
pub mod bundle;
pub mod config;
pub mod encode;
pub mod executor;
pub mod extractor;
pub mod phase;
pub mod policy;
pub mod rate_limit;
pub mod runner;
pub mod sensor;
pub mod store;
pub mod types;
pub mod wallet;

// Re-export main types for convenience
pub use actions::{ActionError, GameActions, StatIndex};
pub use bundle::{BundleSink, CaptureProxy, CapturedBundle, SubmitOutcome};
pub use config::{load_config, Config};
pub use executor::{ExecError, TxExecutor, WalletChannel};
pub use extractor::{EntitySignal, SignalExtractor};
pub use phase::{classify_phase, UiSignals};
pub use policy::{Policy, PolicyAction, SurvivalPolicy};
pub use rate_limit::{RateLimitExceeded, TxRateLimiter};
pub use runner::{GameRunner, StopReason};
pub use sensor::{BridgeSensor, Observation, Sensor};
pub use store::{advance_tick, merge_signal, phase_changed, RunStore};
pub use types::{Beast, Call, Obstacle, Phase, RunState, Stats, TxOutcome, TxStatus};
pub use wallet::{WalletCli, WalletError};
