//! Decision policy seam
//!
//! The real decision loop is an external collaborator; the core only
//! defines the seam and ships a baseline survival policy so the
//! runner is usable without one. Whatever the policy, `Unknown`,
//! `Dead` and `SessionExpired` always block actions — acting on
//! ambiguous state is never worth a transaction.

use crate::actions::StatIndex;
use crate::types::{Phase, RunState};

/// At most one of these per tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyAction {
    Explore,
    Attack,
    Flee,
    Upgrade(StatIndex, u32),
    BuyPotion,
}

/// The opaque decision layer
pub trait Policy: Send {
    /// Decide the next action, or `None` to wait
    fn decide(&mut self, state: &RunState) -> Option<PolicyAction>;
}

/// Baseline phase-driven survival policy
///
/// Explore when idle, fight beasts unless health drops below the flee
/// threshold, spend level-up points down a fixed stat priority, and
/// top up health at the market.
pub struct SurvivalPolicy {
    flee_threshold_pct: u32,
    stat_priority: Vec<StatIndex>,
}

impl SurvivalPolicy {
    pub fn new(flee_threshold_pct: u32) -> Self {
        Self {
            flee_threshold_pct,
            stat_priority: vec![StatIndex::Charisma, StatIndex::Dexterity, StatIndex::Vitality],
        }
    }
}

impl Default for SurvivalPolicy {
    fn default() -> Self {
        Self::new(30)
    }
}

impl Policy for SurvivalPolicy {
    fn decide(&mut self, state: &RunState) -> Option<PolicyAction> {
        match state.phase {
            Phase::Idle | Phase::Exploring => Some(PolicyAction::Explore),
            Phase::BeastEncounter => {
                if state.max_hp > 0 && state.hp_pct() < self.flee_threshold_pct {
                    Some(PolicyAction::Flee)
                } else {
                    Some(PolicyAction::Attack)
                }
            }
            Phase::LevelUp => {
                let stat = self.stat_priority.first().copied()?;
                Some(PolicyAction::Upgrade(stat, 1))
            }
            Phase::Market => {
                if state.max_hp > 0 && state.hp < state.max_hp {
                    Some(PolicyAction::BuyPotion)
                } else {
                    None
                }
            }
            // Obstacle resolution happens on-chain as part of explore.
            Phase::Obstacle => None,
            Phase::Dead | Phase::SessionExpired | Phase::Unknown => None,
        }
    }
}
