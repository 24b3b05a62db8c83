//! # Keygate: Key-Gated Monophonic Tone Engine
//!
//! `keygate` turns raw key press/release events into a single sounding tone.
//! A gate key enables sound, selector keys choose the pitch, and an ADSR
//! envelope shapes the gain so that pitch changes and releases never click.
//!
//! ## Architecture
//!
//! The library is organized in three layers:
//!
//! - **Layer 1: Pitch** - Note names, reference frequencies, and the 0–15
//!   selector table
//! - **Layer 2: Decision** - Immutable keyboard snapshots and a pure resolver
//!   from keyboard state to "what should sound"
//! - **Layer 3: Sound** - Envelope controller, cancellable timers, and the
//!   tone backend traits, tied together by a [`Session`](session::Session)
//!
//! ## Pitch Strategies
//!
//! - **Composite** - hold the gate key and combine up to four selector keys
//!   as binary digits; an optional sharp modifier adds a semitone
//! - **Direct** - one key per pitch; the most recently pressed key wins
//!
//! ## Quick Start
//!
//! ```rust
//! use keygate::prelude::*;
//!
//! let clock = ManualClock::new();
//! let backend = VirtualBackend::new(clock.clone());
//! let mut session = Session::new(backend, &SessionConfig::chromatic_keyboard()).unwrap();
//!
//! // Gate plus selector bit 0: one semitone above C4
//! session.on_key_event(KeyId::new('j'), KeyAction::Press, 0).unwrap();
//! let decision = session.on_key_event(KeyId::new('a'), KeyAction::Press, 20).unwrap();
//! assert_eq!(decision.pitch.unwrap().name().to_string(), "C#4");
//!
//! // Release the gate and let the tail ring out
//! session.on_key_event(KeyId::new('j'), KeyAction::Release, 400).unwrap();
//! clock.advance(2.0);
//! let finished = session.poll();
//! assert_eq!(finished.len(), 2);
//! ```

pub mod automation;
pub mod backend;
pub mod config;
pub mod envelope;
pub mod error;
pub mod keyboard;
pub mod pitch;
pub mod resolver;
pub mod scheduler;
pub mod session;
pub mod table;

/// Prelude module for convenient imports
pub mod prelude {
    // Layer 1: Pitch
    pub use crate::pitch::{
        resolve_pitch, same_pitch, supported_base_pitches, Accidental, Letter, NoteName, Pitch,
    };
    pub use crate::table::{fixed_lookup, OffsetScheme, PitchTable, MAX_SELECTOR};

    // Layer 2: Decision
    pub use crate::keyboard::{KeyAction, KeyId, KeyLayout, KeyboardState, ScaleKey, Timestamp};
    pub use crate::resolver::{resolve, selector_index, AudioState, Decision, ResolverConfig, Strategy};

    // Layer 3: Sound
    pub use crate::backend::{ManualClock, ToneBackend, ToneHandle, VirtualBackend, VirtualTone};
    pub use crate::envelope::{
        Completion, CompletionKind, EnvelopeConfig, EnvelopeController, EnvelopePhase, GAIN_FLOOR,
    };
    pub use crate::scheduler::{TimerId, TimerQueue};
    pub use crate::session::{Session, ToneFinished};

    // Configuration
    pub use crate::config::{SessionConfig, StrategyConfig};

    // Errors
    pub use crate::error::{ConfigError, PitchError, SessionError, ToneError};
}

pub use prelude::*;
