//! Core types shared across the runner
//!
//! These types define the canonical run-state record and the contract
//! between the runner and the wallet CLI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Discrete game phase inferred from the sensing surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Explore control visible, nothing demanding attention
    Idle,
    /// An explore transaction is in flight
    Exploring,
    /// A beast is blocking progress
    BeastEncounter,
    /// An obstacle event is on screen
    Obstacle,
    /// Stat points are waiting to be spent
    LevelUp,
    /// Market screen is open
    Market,
    /// Run is over; terminal for the loop
    Dead,
    /// Wallet session is no longer usable
    SessionExpired,
    /// Not enough evidence; blocks transaction-issuing actions
    #[default]
    Unknown,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Phase::Idle => "idle",
            Phase::Exploring => "exploring",
            Phase::BeastEncounter => "beast_encounter",
            Phase::Obstacle => "obstacle",
            Phase::LevelUp => "level_up",
            Phase::Market => "market",
            Phase::Dead => "dead",
            Phase::SessionExpired => "session_expired",
            Phase::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// The seven adventurer attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Stats {
    pub strength: u32,
    pub vitality: u32,
    pub dexterity: u32,
    pub wisdom: u32,
    pub intelligence: u32,
    pub charisma: u32,
    pub luck: u32,
}

/// Beast currently blocking the adventurer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Beast {
    pub name: String,
    pub power: Option<u32>,
    pub hp: Option<u32>,
    pub kind: Option<String>,
}

/// Obstacle event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub name: String,
    pub slot: Option<String>,
    pub damage: Option<u32>,
}

/// Canonical mutable state for one game run
///
/// Created on first reference to a run id, mutated once per tick,
/// persisted by key and never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    pub run_id: String,

    pub hp: u32,
    pub max_hp: u32,
    pub gold: u32,
    pub xp: u32,
    pub level: u32,
    pub stats: Stats,
    pub equipment: HashMap<String, String>,

    pub phase: Phase,
    pub last_phase: Option<Phase>,
    /// Beast named by the feed; cleared once the encounter phase ends
    pub current_beast: Option<Beast>,
    /// Reserved; obstacles resolve on-chain and are not yet sensed
    pub current_obstacle: Option<Obstacle>,
    pub available_upgrades: u32,

    pub tick_count: u64,
    pub consecutive_errors: u32,
    pub last_action: String,
    pub last_action_result: String,

    pub updated_at: DateTime<Utc>,
}

impl RunState {
    /// Fresh state for a new run id
    pub fn new(run_id: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            hp: 0,
            max_hp: 0,
            gold: 0,
            xp: 0,
            level: 1,
            stats: Stats::default(),
            equipment: HashMap::new(),
            phase: Phase::Unknown,
            last_phase: None,
            current_beast: None,
            current_obstacle: None,
            available_upgrades: 0,
            tick_count: 0,
            consecutive_errors: 0,
            last_action: "none".to_string(),
            last_action_result: "none".to_string(),
            updated_at: Utc::now(),
        }
    }

    /// Percentage of health remaining, 0 when max is unknown
    pub fn hp_pct(&self) -> u32 {
        if self.max_hp == 0 {
            return 0;
        }
        // Widened so `hp * 100` cannot overflow on large feed values.
        (u64::from(self.hp) * 100 / u64::from(self.max_hp)) as u32
    }
}

/// One call inside a transaction bundle
///
/// Calldata stays as raw JSON values until encoding so that captured
/// bundles with structured (non-scalar) entries can be detected and
/// refused instead of guessed at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    #[serde(rename = "contractAddress")]
    pub contract_address: String,
    pub entrypoint: String,
    pub calldata: Vec<serde_json::Value>,
}

/// Result of a wallet CLI invocation
///
/// `status == "error"` with an `error_code` other than
/// `SessionExpired` is an application-level outcome the policy layer
/// interprets; `SessionExpired` is always fatal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxOutcome {
    pub status: TxStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recovery_hint: Option<String>,
}

impl TxOutcome {
    pub fn is_success(&self) -> bool {
        self.status == TxStatus::Success
    }
}

/// Wallet invocation status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Success,
    Error,
}
