//! Phase-gated game actions
//!
//! Typed, narrow wrappers over the executor: each action checks the
//! current phase before spending a transaction, keeps calldata
//! minimal, and records the attempt on the run state. A wrong-phase
//! request is a typed rejection that never touches the chain.

use serde_json::{json, Value};
use thiserror::Error;
use tracing::info;

use crate::bundle::CapturedBundle;
use crate::executor::{ExecError, TxExecutor, WalletChannel};
use crate::types::{Call, Phase, RunState, TxOutcome};

/// Stat indices for the upgrade entrypoint, in contract order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatIndex {
    Strength = 0,
    Dexterity = 1,
    Vitality = 2,
    Intelligence = 3,
    Wisdom = 4,
    Charisma = 5,
    Luck = 6,
}

/// Why an action request was refused before submission
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("action {action} not valid in phase {phase}")]
    InvalidPhase { action: &'static str, phase: Phase },
    #[error("no captured bundle to replay")]
    NoCapturedBundle,
    #[error("captured bundle for {entrypoint} has non-scalar calldata")]
    StructCalldata { entrypoint: String },
    #[error(transparent)]
    Exec(#[from] ExecError),
}

/// Game action surface bound to one adventurer
pub struct GameActions<C: WalletChannel> {
    executor: TxExecutor<C>,
    adventurer_id: String,
}

impl<C: WalletChannel> GameActions<C> {
    pub fn new(executor: TxExecutor<C>, adventurer_id: String) -> Self {
        Self {
            executor,
            adventurer_id,
        }
    }

    pub fn executor_mut(&mut self) -> &mut TxExecutor<C> {
        &mut self.executor
    }

    /// Explore once; valid from idle or mid-exploration
    ///
    /// Entrypoint shape: `explore(adventurer_id, explore_until_beast)`.
    pub async fn explore(&mut self, state: &mut RunState) -> Result<TxOutcome, ActionError> {
        require_phase("explore", state, &[Phase::Idle, Phase::Exploring])?;
        let calldata = [json!(self.adventurer_id), json!(false)];
        self.submit_and_record("explore", &calldata, state).await
    }

    /// Attack the current beast
    ///
    /// Entrypoint shape: `attack(adventurer_id, attack_until_death)`.
    pub async fn attack(&mut self, state: &mut RunState) -> Result<TxOutcome, ActionError> {
        require_phase("attack", state, &[Phase::BeastEncounter])?;
        let calldata = [json!(self.adventurer_id), json!(false)];
        self.submit_and_record("attack", &calldata, state).await
    }

    /// Flee the current beast
    ///
    /// Entrypoint shape: `flee(adventurer_id, flee_until_death)`.
    pub async fn flee(&mut self, state: &mut RunState) -> Result<TxOutcome, ActionError> {
        require_phase("flee", state, &[Phase::BeastEncounter])?;
        let calldata = [json!(self.adventurer_id), json!(false)];
        self.submit_and_record("flee", &calldata, state).await
    }

    /// Spend upgrade points on one stat
    pub async fn upgrade(
        &mut self,
        state: &mut RunState,
        stat: StatIndex,
        amount: u32,
    ) -> Result<TxOutcome, ActionError> {
        require_phase("upgrade", state, &[Phase::LevelUp])?;
        let calldata = [
            json!(self.adventurer_id),
            json!(stat as u32),
            json!(amount),
        ];
        self.submit_and_record("upgrade", &calldata, state).await
    }

    /// Buy one potion at the market
    pub async fn buy_potion(&mut self, state: &mut RunState) -> Result<TxOutcome, ActionError> {
        require_phase("buy_potion", state, &[Phase::Market])?;
        let calldata = [json!(self.adventurer_id)];
        self.submit_and_record("buy_potion", &calldata, state).await
    }

    /// Re-submit a bundle captured at the browser boundary
    ///
    /// Refuses bundles whose calldata contains structured values
    /// rather than guessing at an encoding.
    pub async fn replay_captured(
        &mut self,
        state: &mut RunState,
        bundle: Option<CapturedBundle>,
    ) -> Result<TxOutcome, ActionError> {
        let bundle = bundle.ok_or(ActionError::NoCapturedBundle)?;
        validate_scalar_calldata(&bundle.calls)?;

        info!(calls = bundle.calls.len(), "replaying captured bundle");
        let result = self.executor.submit_calls(&bundle.calls).await;
        record_attempt(state, "replay_captured", &result);
        Ok(result?)
    }

    async fn submit_and_record(
        &mut self,
        entrypoint: &'static str,
        calldata: &[Value],
        state: &mut RunState,
    ) -> Result<TxOutcome, ActionError> {
        let result = self.executor.submit(entrypoint, calldata).await;
        record_attempt(state, entrypoint, &result);
        Ok(result?)
    }
}

fn require_phase(
    action: &'static str,
    state: &RunState,
    allowed: &[Phase],
) -> Result<(), ActionError> {
    if allowed.contains(&state.phase) {
        Ok(())
    } else {
        Err(ActionError::InvalidPhase {
            action,
            phase: state.phase,
        })
    }
}

fn validate_scalar_calldata(calls: &[Call]) -> Result<(), ActionError> {
    for call in calls {
        let has_structured = call
            .calldata
            .iter()
            .any(|v| v.is_object() || v.is_array());
        if has_structured {
            return Err(ActionError::StructCalldata {
                entrypoint: call.entrypoint.clone(),
            });
        }
    }
    Ok(())
}

fn record_attempt(state: &mut RunState, action: &str, result: &Result<TxOutcome, ExecError>) {
    state.last_action = action.to_string();
    state.last_action_result = match result {
        Ok(outcome) => outcome
            .error_code
            .clone()
            .unwrap_or_else(|| "success".to_string()),
        Err(e) => format!("error: {}", e),
    };
}
