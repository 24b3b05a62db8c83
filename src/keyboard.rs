//! Keyboard State Tracking
//!
//! Accumulates which keys are held, the order they were pressed in, and when
//! the last voice (gate) and selector keys went down. Every transition
//! produces a new [`KeyboardState`]; the previous value is left untouched.
//!
//! Press order is history, not state: releasing a key removes it from the held
//! set but keeps its place in the press order, so recency can still break ties
//! between keys that remain held.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Event timestamp in milliseconds
pub type Timestamp = u64;

/// A physical key, normalised to lower case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "char", into = "char")]
pub struct KeyId(char);

impl KeyId {
    pub fn new(c: char) -> Self {
        Self(c.to_lowercase().next().unwrap_or(c))
    }

    pub fn as_char(&self) -> char {
        self.0
    }
}

impl From<char> for KeyId {
    fn from(c: char) -> Self {
        Self::new(c)
    }
}

impl From<KeyId> for char {
    fn from(key: KeyId) -> Self {
        key.0
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            ' ' => write!(f, "space"),
            c => write!(f, "{}", c),
        }
    }
}

/// Key transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Press,
    Release,
}

/// A key bound directly to one base pitch (direct-key strategy)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleKey {
    pub key: KeyId,
    pub pitch: crate::pitch::NoteName,
}

/// Which keys play which role
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct KeyLayout {
    /// Gate keys; any one held enables sound
    pub voice_keys: Vec<KeyId>,
    /// Composite selector keys; position `i` contributes bit `i`
    #[serde(default)]
    pub selector_keys: Vec<KeyId>,
    /// Optional "+1 semitone" modifier for the composite strategy
    #[serde(default)]
    pub sharp_key: Option<KeyId>,
    /// Direct-key mappings
    #[serde(default)]
    pub scale_keys: Vec<ScaleKey>,
}

impl KeyLayout {
    pub fn is_voice_key(&self, key: KeyId) -> bool {
        self.voice_keys.contains(&key)
    }

    /// Selector bit position of a composite key
    pub fn selector_bit(&self, key: KeyId) -> Option<usize> {
        self.selector_keys.iter().position(|&k| k == key)
    }

    /// Base pitch a direct key is bound to
    pub fn scale_pitch(&self, key: KeyId) -> Option<crate::pitch::NoteName> {
        self.scale_keys
            .iter()
            .find(|sk| sk.key == key)
            .map(|sk| sk.pitch)
    }

    /// Selector keys in the broad sense: composite bits and direct mappings
    pub fn is_selector_key(&self, key: KeyId) -> bool {
        self.selector_bit(key).is_some() || self.scale_pitch(key).is_some()
    }

    /// Every key with a role, in declaration order (may contain duplicates)
    pub fn assigned_keys(&self) -> impl Iterator<Item = KeyId> + '_ {
        self.voice_keys
            .iter()
            .copied()
            .chain(self.selector_keys.iter().copied())
            .chain(self.sharp_key)
            .chain(self.scale_keys.iter().map(|sk| sk.key))
    }
}

/// Snapshot of the keyboard
#[derive(Debug, Clone, PartialEq, Default)]
pub struct KeyboardState {
    held: HashSet<KeyId>,
    press_order: Vec<KeyId>,
    last_voice_key_time: Option<Timestamp>,
    last_selector_key_time: Option<Timestamp>,
}

impl KeyboardState {
    /// Empty state for a new session
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one key transition, returning the next state.
    ///
    /// Repeated presses of an already-held key are not filtered here; a
    /// repeat only moves the key to the most-recent end of the press order.
    pub fn apply(
        &self,
        key: KeyId,
        action: KeyAction,
        timestamp: Timestamp,
        layout: &KeyLayout,
    ) -> Self {
        let mut next = self.clone();

        match action {
            KeyAction::Press => {
                next.held.insert(key);
                next.press_order.retain(|&k| k != key);
                next.press_order.push(key);

                if layout.is_voice_key(key) {
                    next.last_voice_key_time = Some(timestamp);
                }
                if layout.is_selector_key(key) {
                    next.last_selector_key_time = Some(timestamp);
                }
            }
            KeyAction::Release => {
                next.held.remove(&key);
            }
        }

        next
    }

    pub fn is_held(&self, key: KeyId) -> bool {
        self.held.contains(&key)
    }

    pub fn held_keys(&self) -> &HashSet<KeyId> {
        &self.held
    }

    /// Keys ever pressed, most recent last
    pub fn press_order(&self) -> &[KeyId] {
        &self.press_order
    }

    pub fn last_voice_key_time(&self) -> Option<Timestamp> {
        self.last_voice_key_time
    }

    pub fn last_selector_key_time(&self) -> Option<Timestamp> {
        self.last_selector_key_time
    }

    /// Whether any of `keys` is currently held
    pub fn any_held(&self, keys: &[KeyId]) -> bool {
        keys.iter().any(|k| self.held.contains(k))
    }

    /// Most recently pressed key that is still held and matches `filter`
    pub fn latest_held<F>(&self, mut filter: F) -> Option<KeyId>
    where
        F: FnMut(KeyId) -> bool,
    {
        self.press_order
            .iter()
            .rev()
            .copied()
            .find(|&k| self.held.contains(&k) && filter(k))
    }
}
