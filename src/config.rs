//! Session Configuration
//!
//! Serializable description of a playing session: which keys do what, how
//! pitches are chosen, and the envelope shape. Configurations are validated
//! once at load time so nothing can fail for configuration reasons while
//! keys are being played.
//!
//! # Example
//!
//! ```
//! use keygate::config::SessionConfig;
//!
//! let config = SessionConfig::binary_keyboard();
//! let json = config.to_json().unwrap();
//! let loaded = SessionConfig::from_json(&json).unwrap();
//! assert_eq!(loaded, config);
//! ```

use crate::envelope::EnvelopeConfig;
use crate::error::ConfigError;
use crate::keyboard::{KeyId, KeyLayout, ScaleKey};
use crate::pitch::{Letter, NoteName};
use crate::resolver::ResolverConfig;
use crate::table::{OffsetScheme, PitchTable};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Most selector keys a composite layout may declare
pub const MAX_SELECTOR_KEYS: usize = 4;

/// Pitch selection strategy as stored in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategyConfig {
    /// Selector bits plus gate, indexing a table built from `base_pitch`
    Composite {
        base_pitch: NoteName,
        #[serde(default)]
        scheme: OffsetScheme,
    },
    /// One key per pitch
    Direct {
        #[serde(default)]
        require_gate: bool,
    },
}

/// Complete session description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub name: String,
    pub layout: KeyLayout,
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub envelope: EnvelopeConfig,
    /// Release automatically this many seconds after each note starts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_release_after: Option<f64>,
}

impl SessionConfig {
    /// Gate `j`, selector bits `a s d f`, sharp on space, C4 major
    pub fn binary_keyboard() -> Self {
        Self {
            name: "binary keyboard".into(),
            layout: KeyLayout {
                voice_keys: vec![KeyId::new('j')],
                selector_keys: "asdf".chars().map(KeyId::new).collect(),
                sharp_key: Some(KeyId::new(' ')),
                scale_keys: Vec::new(),
            },
            strategy: StrategyConfig::Composite {
                base_pitch: NoteName::natural(Letter::C, 4),
                scheme: OffsetScheme::DiatonicMajor,
            },
            envelope: EnvelopeConfig::default(),
            auto_release_after: None,
        }
    }

    /// Same keys as [`binary_keyboard`](Self::binary_keyboard), one
    /// semitone per index and no sharp modifier
    pub fn chromatic_keyboard() -> Self {
        let mut config = Self::binary_keyboard();
        config.name = "chromatic keyboard".into();
        config.layout.sharp_key = None;
        config.strategy = StrategyConfig::Composite {
            base_pitch: NoteName::natural(Letter::C, 4),
            scheme: OffsetScheme::Chromatic,
        };
        config
    }

    /// Gate `j`, `a s d f z x c v` mapped to C4 through C5
    pub fn direct_keyboard() -> Self {
        let notes = [
            ('a', Letter::C, 4),
            ('s', Letter::D, 4),
            ('d', Letter::E, 4),
            ('f', Letter::F, 4),
            ('z', Letter::G, 4),
            ('x', Letter::A, 4),
            ('c', Letter::B, 4),
            ('v', Letter::C, 5),
        ];
        Self {
            name: "direct keyboard".into(),
            layout: KeyLayout {
                voice_keys: vec![KeyId::new('j')],
                selector_keys: Vec::new(),
                sharp_key: None,
                scale_keys: notes
                    .iter()
                    .map(|&(key, letter, octave)| ScaleKey {
                        key: KeyId::new(key),
                        pitch: NoteName::natural(letter, octave),
                    })
                    .collect(),
            },
            strategy: StrategyConfig::Direct { require_gate: true },
            envelope: EnvelopeConfig::default(),
            auto_release_after: None,
        }
    }

    /// Check the whole configuration, stopping at the first problem
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.envelope.validate()?;

        if let Some(after) = self.auto_release_after {
            if !(after >= 0.0) {
                return Err(ConfigError::InvalidEnvelope(vec![
                    "auto_release_after must be >= 0".to_string(),
                ]));
            }
        }

        let mut seen = HashSet::new();
        for key in self.layout.assigned_keys() {
            if !seen.insert(key) {
                return Err(ConfigError::DuplicateKey(key));
            }
        }

        match self.strategy {
            StrategyConfig::Composite { base_pitch, scheme } => {
                if self.layout.voice_keys.is_empty() {
                    return Err(ConfigError::MissingKeyRole(
                        "composite strategy needs at least one voice key".into(),
                    ));
                }
                let n = self.layout.selector_keys.len();
                if n > MAX_SELECTOR_KEYS {
                    return Err(ConfigError::TooManySelectorKeys(n));
                }
                PitchTable::new(base_pitch, scheme)?;
            }
            StrategyConfig::Direct { require_gate } => {
                if require_gate && self.layout.voice_keys.is_empty() {
                    return Err(ConfigError::MissingKeyRole(
                        "gated direct strategy needs at least one voice key".into(),
                    ));
                }
                if self.layout.scale_keys.is_empty() {
                    return Err(ConfigError::MissingKeyRole(
                        "direct strategy needs at least one scale key".into(),
                    ));
                }
                ResolverConfig::direct(self.layout.clone(), require_gate)?;
            }
        }

        Ok(())
    }

    /// Build the resolver for this configuration
    pub fn resolver_config(&self) -> Result<ResolverConfig, ConfigError> {
        self.validate()?;
        let config = match self.strategy {
            StrategyConfig::Composite { base_pitch, scheme } => {
                let table = PitchTable::new(base_pitch, scheme)?;
                ResolverConfig::composite(self.layout.clone(), table)
            }
            StrategyConfig::Direct { require_gate } => {
                ResolverConfig::direct(self.layout.clone(), require_gate)?
            }
        };
        Ok(config)
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse and validate a JSON configuration
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::binary_keyboard()
    }
}
