//! Run-state store
//!
//! Holds the canonical mutable record for each run and persists it as
//! one JSON file per run id under the state directory. Persistence is
//! plain read-modify-write; the runner is the only writer.

use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, warn};

use crate::extractor::EntitySignal;
use crate::types::RunState;

/// File-backed store for [`RunState`] records, keyed by run id
pub struct RunStore {
    state_dir: PathBuf,
}

impl RunStore {
    pub fn new(state_dir: PathBuf) -> Self {
        Self { state_dir }
    }

    /// Create the state directory if missing
    pub async fn init(&self) -> anyhow::Result<()> {
        fs::create_dir_all(&self.state_dir).await?;
        Ok(())
    }

    /// Load the state for `run_id`, seeding defaults on first reference
    pub async fn get_or_create(&self, run_id: &str) -> anyhow::Result<RunState> {
        let path = self.key_path(run_id);
        match fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<RunState>(&bytes) {
                Ok(state) => Ok(state),
                Err(e) => {
                    // A corrupt record is replaced rather than crashing the run.
                    warn!(run_id, error = %e, "corrupt run state on disk, reseeding");
                    let fresh = RunState::new(run_id);
                    self.save(&fresh).await?;
                    Ok(fresh)
                }
            },
            Err(_) => {
                debug!(run_id, "seeding fresh run state");
                let fresh = RunState::new(run_id);
                self.save(&fresh).await?;
                Ok(fresh)
            }
        }
    }

    /// Persist the record under its run-id key
    pub async fn save(&self, state: &RunState) -> anyhow::Result<()> {
        let path = self.key_path(&state.run_id);
        let json = serde_json::to_string_pretty(state)?;
        fs::write(&path, json).await?;
        debug!(run_id = %state.run_id, "wrote run state");
        Ok(())
    }

    fn key_path(&self, run_id: &str) -> PathBuf {
        self.state_dir.join(format!("run-{}.json", run_id))
    }
}

/// Sparse merge of a feed snapshot into the run state
///
/// Only `Some` fields are copied; absent or invalid fields leave
/// known-good data untouched. When both ends of the health pair are
/// known, hp is clamped to max_hp.
pub fn merge_signal(signal: &EntitySignal, state: &mut RunState) {
    if let Some(hp) = signal.hp {
        state.hp = hp;
    }
    if let Some(max_hp) = signal.max_hp {
        state.max_hp = max_hp;
    }
    if state.max_hp > 0 && state.hp > state.max_hp {
        state.hp = state.max_hp;
    }
    if let Some(gold) = signal.gold {
        state.gold = gold;
    }
    if let Some(xp) = signal.xp {
        state.xp = xp;
    }
    if let Some(level) = signal.level {
        state.level = level;
    }
    if let Some(v) = signal.strength {
        state.stats.strength = v;
    }
    if let Some(v) = signal.vitality {
        state.stats.vitality = v;
    }
    if let Some(v) = signal.dexterity {
        state.stats.dexterity = v;
    }
    if let Some(v) = signal.wisdom {
        state.stats.wisdom = v;
    }
    if let Some(v) = signal.intelligence {
        state.stats.intelligence = v;
    }
    if let Some(v) = signal.charisma {
        state.stats.charisma = v;
    }
    if let Some(v) = signal.luck {
        state.stats.luck = v;
    }
    if let Some(beast) = &signal.beast {
        state.current_beast = Some(beast.clone());
    }
    state.updated_at = chrono::Utc::now();
}

/// Advance the tick counter and snapshot the current phase
///
/// Runs before classification each tick so that a subsequent
/// [`phase_changed`] read compares against the pre-tick phase.
pub fn advance_tick(state: &mut RunState) {
    state.tick_count += 1;
    state.last_phase = Some(state.phase);
}

/// True when the classifier moved the phase this tick
pub fn phase_changed(state: &RunState) -> bool {
    state.last_phase != Some(state.phase)
}
