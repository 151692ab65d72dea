//! Game runner - main orchestration loop
//!
//! One tick = observe -> extract -> advance -> classify -> merge ->
//! persist -> at most one policy action. The interval uses delayed
//! missed-tick behavior and each tick is awaited to completion, so a
//! tick never starts while the previous one is still running. Every
//! tick runs under a hard timeout; a timed-out tick counts as a tick
//! error.

use std::time::Duration;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::actions::{ActionError, GameActions};
use crate::config::Config;
use crate::executor::{ExecError, WalletChannel};
use crate::extractor::SignalExtractor;
use crate::phase::classify_phase;
use crate::policy::{Policy, PolicyAction};
use crate::sensor::Sensor;
use crate::store::{advance_tick, merge_signal, phase_changed, RunStore};
use crate::types::Phase;

/// Why the loop ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    Dead,
    MaxTicks,
    MaxConsecutiveErrors,
    SessionExpired,
}

enum TickVerdict {
    Continue,
    Stop(StopReason),
}

/// Drives one game run to completion
pub struct GameRunner<C: WalletChannel, S: Sensor, P: Policy> {
    sensor: S,
    extractor: SignalExtractor,
    store: RunStore,
    actions: GameActions<C>,
    policy: P,
    run_id: String,
    tick_interval: Duration,
    tick_timeout: Duration,
    max_ticks: u64,
    max_consecutive_errors: u32,
}

impl<C: WalletChannel, S: Sensor, P: Policy> GameRunner<C, S, P> {
    pub fn new(config: &Config, sensor: S, store: RunStore, actions: GameActions<C>, policy: P) -> Self {
        Self {
            sensor,
            extractor: SignalExtractor::new(),
            store,
            actions,
            policy,
            run_id: config.run_id.clone(),
            tick_interval: Duration::from_millis(config.tick_interval_ms),
            tick_timeout: Duration::from_millis(config.tick_timeout_ms),
            max_ticks: config.max_ticks,
            max_consecutive_errors: config.max_consecutive_errors,
        }
    }

    /// Run the tick loop until a stop condition fires
    pub async fn run(mut self) -> anyhow::Result<StopReason> {
        info!(run_id = %self.run_id, "game runner starting tick loop");

        let mut ticker = interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut ticks: u64 = 0;
        let mut consecutive_errors: u32 = 0;

        let reason = loop {
            ticker.tick().await;

            if ticks >= self.max_ticks {
                break StopReason::MaxTicks;
            }
            if consecutive_errors >= self.max_consecutive_errors {
                break StopReason::MaxConsecutiveErrors;
            }
            ticks += 1;

            match timeout(self.tick_timeout, self.tick_once(consecutive_errors)).await {
                Ok(Ok(TickVerdict::Continue)) => {
                    consecutive_errors = 0;
                    info!(tick = ticks, "tick ok");
                }
                Ok(Ok(TickVerdict::Stop(reason))) => break reason,
                Ok(Err(e)) => {
                    if is_session_expired(&e) {
                        error!(error = %e, "session expired, stopping run");
                        break StopReason::SessionExpired;
                    }
                    consecutive_errors += 1;
                    warn!(error = %e, consecutive_errors, "tick failed");
                }
                Err(_) => {
                    consecutive_errors += 1;
                    warn!(consecutive_errors, timeout = ?self.tick_timeout, "tick timed out");
                }
            }
        };

        info!(run_id = %self.run_id, ticks, ?reason, "stopping loop");
        Ok(reason)
    }

    /// One full observation/decision cycle
    async fn tick_once(&mut self, consecutive_errors: u32) -> anyhow::Result<TickVerdict> {
        let observation = self.sensor.observe().await?;
        if let Some(feed) = &observation.feed {
            self.extractor.update_from_feed(feed);
        }

        let mut state = self.store.get_or_create(&self.run_id).await?;
        // Every save below persists the post-tick counter: zero on the
        // clean paths, bumped on the error path.
        state.consecutive_errors = 0;

        advance_tick(&mut state);
        if let Some(signal) = self.extractor.latest() {
            merge_signal(signal, &mut state);
        }
        state.phase = classify_phase(&observation.ui);
        // Beast context only lives as long as the encounter on screen.
        if state.phase != Phase::BeastEncounter {
            state.current_beast = None;
        }

        if phase_changed(&state) {
            info!(
                tick = state.tick_count,
                from = %state.last_phase.unwrap_or(Phase::Unknown),
                to = %state.phase,
                "phase transition"
            );
        }

        if state.phase == Phase::Dead {
            self.store.save(&state).await?;
            return Ok(TickVerdict::Stop(StopReason::Dead));
        }

        // At most one transaction-issuing action per tick.
        if let Some(action) = self.policy.decide(&state) {
            match self.apply(action, &mut state).await {
                Ok(()) => {}
                Err(ActionError::Exec(ExecError::RateLimited(e))) => {
                    // Typed rejection; never retried within the tick.
                    warn!(error = %e, "action rate limited");
                }
                Err(ActionError::InvalidPhase { action, phase }) => {
                    warn!(action, %phase, "policy requested action for wrong phase");
                }
                Err(e) => {
                    state.consecutive_errors = consecutive_errors + 1;
                    self.store.save(&state).await?;
                    return Err(e.into());
                }
            }
        }

        self.store.save(&state).await?;
        Ok(TickVerdict::Continue)
    }

    async fn apply(
        &mut self,
        action: PolicyAction,
        state: &mut crate::types::RunState,
    ) -> Result<(), ActionError> {
        let outcome = match action {
            PolicyAction::Explore => self.actions.explore(state).await?,
            PolicyAction::Attack => self.actions.attack(state).await?,
            PolicyAction::Flee => self.actions.flee(state).await?,
            PolicyAction::Upgrade(stat, amount) => {
                self.actions.upgrade(state, stat, amount).await?
            }
            PolicyAction::BuyPotion => self.actions.buy_potion(state).await?,
        };
        info!(
            action = %state.last_action,
            success = outcome.is_success(),
            tx = outcome.transaction_hash.as_deref().unwrap_or("-"),
            "action submitted"
        );
        Ok(())
    }
}

fn is_session_expired(e: &anyhow::Error) -> bool {
    match e.downcast_ref::<ActionError>() {
        Some(ActionError::Exec(ExecError::SessionExpired(_))) => true,
        _ => matches!(
            e.downcast_ref::<ExecError>(),
            Some(ExecError::SessionExpired(_))
        ),
    }
}
