//! Pitch Resolution
//!
//! A pure function from a [`KeyboardState`] and a [`ResolverConfig`] to a
//! [`Decision`]: whether a tone should sound, which pitch, and a diagnostic
//! reason.
//!
//! Two selection strategies are supported:
//!
//! - **Composite**: each held selector key sets one bit of a 0–15 index that
//!   feeds a [`PitchTable`]. The gate key must be held; with the gate held a
//!   pitch is always produced (no selector keys held is index 0).
//! - **Direct**: each mapped key names one pitch. The most recently pressed
//!   mapped key that is still held wins. The gate requirement is optional.
//!
//! Simultaneous holds always resolve by recency, never by fixed key order.
//! The `reason` string is for logs only.

use crate::error::PitchError;
use crate::keyboard::{KeyId, KeyLayout, KeyboardState};
use crate::pitch::{resolve_pitch, Pitch};
use crate::table::PitchTable;

/// Outcome of resolving the keyboard
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub should_play: bool,
    pub pitch: Option<Pitch>,
    /// Human-readable diagnostic; never used for control flow
    pub reason: String,
}

impl Decision {
    fn play(pitch: Pitch, reason: String) -> Self {
        Self {
            should_play: true,
            pitch: Some(pitch),
            reason,
        }
    }

    fn silence(reason: impl Into<String>) -> Self {
        Self {
            should_play: false,
            pitch: None,
            reason: reason.into(),
        }
    }

    /// The audio state this decision leads to
    pub fn audio_state(&self) -> AudioState {
        AudioState {
            active_pitch: if self.should_play {
                self.pitch.clone()
            } else {
                None
            },
        }
    }
}

/// The single voice the engine may be sounding
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AudioState {
    pub active_pitch: Option<Pitch>,
}

impl AudioState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Pitch selection strategy
#[derive(Debug, Clone, PartialEq)]
pub enum Strategy {
    /// Selector bits index into a pitch table; gate required
    Composite { table: PitchTable },
    /// Keys map 1:1 to pitches; most recent held key wins
    Direct {
        pitches: Vec<(KeyId, Pitch)>,
        require_gate: bool,
    },
}

/// Everything the resolver needs besides the keyboard
#[derive(Debug, Clone, PartialEq)]
pub struct ResolverConfig {
    layout: KeyLayout,
    strategy: Strategy,
}

impl ResolverConfig {
    /// Composite strategy using `layout.selector_keys` as bits 0..n
    pub fn composite(layout: KeyLayout, table: PitchTable) -> Self {
        Self {
            layout,
            strategy: Strategy::Composite { table },
        }
    }

    /// Direct strategy using `layout.scale_keys`.
    ///
    /// Every mapped pitch is resolved here so resolution never fails later.
    pub fn direct(layout: KeyLayout, require_gate: bool) -> Result<Self, PitchError> {
        let pitches = layout
            .scale_keys
            .iter()
            .map(|sk| resolve_pitch(sk.pitch, 0).map(|p| (sk.key, p)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            layout,
            strategy: Strategy::Direct {
                pitches,
                require_gate,
            },
        })
    }

    pub fn layout(&self) -> &KeyLayout {
        &self.layout
    }

    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }
}

/// Composite selector index from the held selector keys
pub fn selector_index(state: &KeyboardState, layout: &KeyLayout) -> u8 {
    layout
        .selector_keys
        .iter()
        .enumerate()
        .filter(|(_, key)| state.is_held(**key))
        .fold(0u8, |index, (bit, _)| index | (1 << bit))
}

/// Decide what should sound for the given keyboard state
pub fn resolve(state: &KeyboardState, config: &ResolverConfig) -> Decision {
    let layout = &config.layout;
    let gate_held = state.any_held(&layout.voice_keys);

    match &config.strategy {
        Strategy::Composite { table } => {
            if !gate_held {
                return Decision::silence("gate key not held: stop");
            }
            let index = selector_index(state, layout);
            let sharp = layout.sharp_key.is_some_and(|k| state.is_held(k));
            let pitch = table.pitch_for(index, sharp);
            let reason = format!(
                "gate held: selector {:04b}{} -> {}+{} semitones = {}",
                index,
                if sharp { " (sharp)" } else { "" },
                table.base(),
                pitch.semitone_offset(),
                pitch.name()
            );
            Decision::play(pitch, reason)
        }
        Strategy::Direct {
            pitches,
            require_gate,
        } => {
            if *require_gate && !gate_held {
                return Decision::silence("gate key not held: stop");
            }
            let latest = state.latest_held(|key| pitches.iter().any(|(k, _)| *k == key));
            match latest.and_then(|key| pitches.iter().find(|(k, _)| *k == key)) {
                Some((key, pitch)) => {
                    let reason = format!("latest held scale key {} -> {}", key, pitch.name());
                    Decision::play(pitch.clone(), reason)
                }
                None => Decision::silence("no scale key held"),
            }
        }
    }
}
