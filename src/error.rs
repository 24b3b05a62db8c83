//! Error types
//!
//! Every fallible operation in the crate reports one of these enums. Pitch and
//! configuration errors are misconfiguration and surface when a
//! [`SessionConfig`](crate::config::SessionConfig) is loaded. Tone errors come
//! from the backend at play time.

use crate::keyboard::KeyId;
use crate::pitch::NoteName;

/// Errors produced while resolving or parsing pitches
#[derive(Debug, Clone, PartialEq)]
pub enum PitchError {
    /// The note is not one of the supported base pitches (C4..D6 naturals)
    UnknownBasePitch(NoteName),
    /// A note name string could not be parsed (expected e.g. `C4`, `F#5`)
    InvalidNoteName(String),
    /// The offset carries the note name past the representable octaves
    OffsetOutOfRange { base: NoteName, offset: i32 },
}

impl std::fmt::Display for PitchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PitchError::UnknownBasePitch(note) => write!(f, "Unknown base pitch: {}", note),
            PitchError::InvalidNoteName(text) => write!(f, "Invalid note name: {:?}", text),
            PitchError::OffsetOutOfRange { base, offset } => {
                write!(f, "Offset {} from {} is out of the note range", offset, base)
            }
        }
    }
}

impl std::error::Error for PitchError {}

/// Errors reported by a tone backend
#[derive(Debug, Clone, PartialEq)]
pub enum ToneError {
    /// The backend cannot produce sound at all; fatal for the session
    BackendUnavailable,
    /// A single tone could not be created (e.g. resource exhaustion)
    CreationFailed(String),
    /// Stopping a tone failed; callers log and swallow this
    StopFailed(String),
}

impl std::fmt::Display for ToneError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToneError::BackendUnavailable => write!(f, "Tone backend unavailable"),
            ToneError::CreationFailed(msg) => write!(f, "Tone creation failed: {}", msg),
            ToneError::StopFailed(msg) => write!(f, "Tone stop failed: {}", msg),
        }
    }
}

impl std::error::Error for ToneError {}

/// Configuration validation and loading errors
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// One or more envelope bounds are violated; every violation is listed
    InvalidEnvelope(Vec<String>),
    /// A pitch in the configuration is malformed or unsupported
    Pitch(PitchError),
    /// A role the strategy needs has no key assigned (e.g. empty gate set)
    MissingKeyRole(String),
    /// The same key was given two roles
    DuplicateKey(KeyId),
    /// The composite strategy supports at most four selector bits
    TooManySelectorKeys(usize),
    /// The configuration text could not be parsed
    Parse(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidEnvelope(errors) => {
                write!(f, "Invalid envelope config: {}", errors.join(", "))
            }
            ConfigError::Pitch(e) => write!(f, "{}", e),
            ConfigError::MissingKeyRole(msg) => write!(f, "Missing key role: {}", msg),
            ConfigError::DuplicateKey(key) => write!(f, "Key {} is assigned more than once", key),
            ConfigError::TooManySelectorKeys(n) => {
                write!(f, "At most 4 selector keys are supported, got {}", n)
            }
            ConfigError::Parse(msg) => write!(f, "Config parse error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Pitch(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PitchError> for ConfigError {
    fn from(e: PitchError) -> Self {
        ConfigError::Pitch(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Parse(e.to_string())
    }
}

/// Errors surfaced by [`Session`](crate::session::Session)
#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    Tone(ToneError),
    Config(ConfigError),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::Tone(e) => write!(f, "{}", e),
            SessionError::Config(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Tone(e) => Some(e),
            SessionError::Config(e) => Some(e),
        }
    }
}

impl From<ToneError> for SessionError {
    fn from(e: ToneError) -> Self {
        SessionError::Tone(e)
    }
}

impl From<ConfigError> for SessionError {
    fn from(e: ConfigError) -> Self {
        SessionError::Config(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pitch::{Accidental, Letter};

    #[test]
    fn test_error_display() {
        let e = PitchError::UnknownBasePitch(NoteName::new(Letter::C, Accidental::Sharp, 4));
        assert_eq!(e.to_string(), "Unknown base pitch: C#4");

        let e = ConfigError::InvalidEnvelope(vec![
            "attack must be >= 0".into(),
            "sustain must be between 0 and 1".into(),
        ]);
        assert!(e.to_string().contains("attack must be >= 0"));
        assert!(e.to_string().contains("sustain must be between 0 and 1"));

        let e = ConfigError::MissingKeyRole("needs a voice key".into());
        assert_eq!(e.to_string(), "Missing key role: needs a voice key");
    }

    #[test]
    fn test_session_error_from() {
        let e: SessionError = ToneError::BackendUnavailable.into();
        assert_eq!(e, SessionError::Tone(ToneError::BackendUnavailable));

        let e: ConfigError = PitchError::InvalidNoteName("H4".into()).into();
        assert!(std::error::Error::source(&e).is_some());
    }
}
