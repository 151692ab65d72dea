//! Phase classification from UI signals
//!
//! A pure, ordered decision list over the page text blob and the
//! visibility of the three interaction controls. The order is
//! load-bearing: death evidence must beat everything else, and the
//! fallback is always `Unknown` so the policy layer never acts on
//! ambiguous UI state.

use crate::types::Phase;

/// One observation of the UI surface
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UiSignals {
    /// Full-page text blob
    pub body_text: String,
    pub has_attack: bool,
    pub has_flee: bool,
    pub has_explore: bool,
}

/// Classify the current game phase
///
/// Matching is case-insensitive. False `Unknown` is safe (no action);
/// a false positive on any other phase is not, so every rule demands
/// a specific keyword or control combination.
pub fn classify_phase(signals: &UiSignals) -> Phase {
    let t = signals.body_text.to_lowercase();

    if t.contains("you died") || (t.contains("defeated") && t.contains("death")) {
        return Phase::Dead;
    }
    if t.contains("level up") || t.contains("select stats") {
        return Phase::LevelUp;
    }
    if t.contains("market") || t.contains("potions") || t.contains("gold left") {
        return Phase::Market;
    }
    if signals.has_attack && (t.contains("ambushed") || t.contains("power")) {
        return Phase::BeastEncounter;
    }
    if signals.has_explore {
        return Phase::Idle;
    }
    Phase::Unknown
}
