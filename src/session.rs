//! Monophonic Session
//!
//! Owns the keyboard state, the resolver, and at most one sounding voice.
//! Every key event runs the same pipeline:
//!
//! ```text
//! key event ─▶ KeyboardState::apply ─▶ resolve ─▶ Decision ─▶ voice update
//! ```
//!
//! Voice updates:
//!
//! - silence while a voice sounds: the voice is released musically and moves
//!   to the retiring list
//! - a different pitch: the old voice and any voice still releasing are
//!   hard-stopped, then a new tone is created and started
//! - the same pitch: nothing changes (no retrigger)
//!
//! At most one voice is audible once a stop fade has run. Retiring voices
//! ring until their envelope completes; [`Session::poll`] tears them down and
//! reports each one as a [`ToneFinished`].

use crate::backend::{ToneBackend, ToneHandle};
use crate::config::SessionConfig;
use crate::envelope::{CompletionKind, EnvelopeConfig, EnvelopeController, EnvelopePhase};
use crate::error::{SessionError, ToneError};
use crate::keyboard::{KeyAction, KeyId, KeyboardState, Timestamp};
use crate::pitch::{same_pitch, Pitch};
use crate::resolver::{resolve, AudioState, Decision, ResolverConfig};

/// Reported when a voice has fully faded and its tone has been released
#[derive(Debug, Clone, PartialEq)]
pub struct ToneFinished {
    pub pitch: Pitch,
    pub kind: CompletionKind,
    pub time: f64,
}

/// Callback invoked for every finished tone
pub type ToneFinishedCallback = Box<dyn FnMut(&ToneFinished)>;

/// One tone and the envelope shaping it
struct Voice<T: ToneHandle> {
    pitch: Pitch,
    envelope: EnvelopeController<T>,
}

/// A single-voice playing session over a tone backend
pub struct Session<B: ToneBackend> {
    backend: B,
    resolver: ResolverConfig,
    envelope: EnvelopeConfig,
    auto_release_after: Option<f64>,
    keyboard: KeyboardState,
    audio: AudioState,
    active: Option<Voice<B::Tone>>,
    retiring: Vec<Voice<B::Tone>>,
    on_tone_finished: Option<ToneFinishedCallback>,
}

impl<B: ToneBackend> Session<B> {
    /// Create a session. Fails if the backend cannot make sound or the
    /// configuration is invalid.
    pub fn new(backend: B, config: &SessionConfig) -> Result<Self, SessionError> {
        if !backend.is_available() {
            log::warn!("tone backend unavailable; session '{}' not created", config.name);
            return Err(ToneError::BackendUnavailable.into());
        }
        let resolver = config.resolver_config()?;

        log::info!(
            "session '{}' ready ({:?}, {} voice key(s))",
            config.name,
            config.strategy,
            config.layout.voice_keys.len()
        );

        Ok(Self {
            backend,
            resolver,
            envelope: config.envelope.clone(),
            auto_release_after: config.auto_release_after,
            keyboard: KeyboardState::new(),
            audio: AudioState::new(),
            active: None,
            retiring: Vec::new(),
            on_tone_finished: None,
        })
    }

    pub fn set_on_tone_finished(&mut self, callback: ToneFinishedCallback) {
        self.on_tone_finished = Some(callback);
    }

    /// Feed one key transition.
    ///
    /// A press of a key that is already held (auto-repeat) changes nothing
    /// and returns the current decision. On a tone creation failure the
    /// keyboard state is still updated, nothing sounds, and the error is
    /// returned; the next event tries again.
    pub fn on_key_event(
        &mut self,
        key: KeyId,
        action: KeyAction,
        timestamp: Timestamp,
    ) -> Result<Decision, SessionError> {
        if action == KeyAction::Press && self.keyboard.is_held(key) {
            log::trace!("ignoring repeat of held key {}", key);
            return Ok(resolve(&self.keyboard, &self.resolver));
        }

        self.keyboard = self
            .keyboard
            .apply(key, action, timestamp, self.resolver.layout());
        let decision = resolve(&self.keyboard, &self.resolver);
        log::debug!("{} {:?} @{}ms: {}", key, action, timestamp, decision.reason);

        self.apply_decision(&decision)?;
        Ok(decision)
    }

    fn apply_decision(&mut self, decision: &Decision) -> Result<(), ToneError> {
        let pitch = match (&decision.pitch, decision.should_play) {
            (Some(pitch), true) => pitch,
            _ => {
                if let Some(mut voice) = self.active.take() {
                    voice.envelope.release(&self.envelope);
                    self.retiring.push(voice);
                }
                self.audio = AudioState::new();
                return Ok(());
            }
        };

        if self.active.is_some() && same_pitch(self.audio.active_pitch.as_ref(), Some(pitch)) {
            return Ok(());
        }

        // A voice still in its musical release would overlap the new note
        self.stop_all();

        match self.backend.create_tone(pitch.frequency_hz()) {
            Ok(tone) => {
                let mut envelope = EnvelopeController::new(tone);
                envelope.start(&self.envelope, self.auto_release_after);
                self.active = Some(Voice {
                    pitch: pitch.clone(),
                    envelope,
                });
                self.audio = decision.audio_state();
                Ok(())
            }
            Err(e) => {
                log::warn!("could not create tone for {}: {}", pitch, e);
                self.audio = AudioState::new();
                Err(e)
            }
        }
    }

    /// Fire due envelope timers and tear down voices that have finished
    pub fn poll(&mut self) -> Vec<ToneFinished> {
        let mut finished = Vec::new();

        // An auto-released active voice can complete on its own
        let done = self.active.as_mut().and_then(|v| v.envelope.poll());
        if let Some(completion) = done {
            if let Some(voice) = self.active.take() {
                finished.push(self.retire(voice, completion.kind, completion.time));
            }
            self.audio = AudioState::new();
        }

        let mut i = 0;
        while i < self.retiring.len() {
            match self.retiring[i].envelope.poll() {
                Some(completion) => {
                    let voice = self.retiring.swap_remove(i);
                    finished.push(self.retire(voice, completion.kind, completion.time));
                }
                None => i += 1,
            }
        }

        finished
    }

    fn retire(&mut self, voice: Voice<B::Tone>, kind: CompletionKind, time: f64) -> ToneFinished {
        let mut tone = voice.envelope.dispose();
        if let Err(e) = tone.stop_after(0.0) {
            log::warn!("stopping {} failed: {}", voice.pitch, e);
        }
        let event = ToneFinished {
            pitch: voice.pitch,
            kind,
            time,
        };
        log::trace!("{} finished ({:?}) at t={:.4}", event.pitch, kind, time);
        if let Some(callback) = self.on_tone_finished.as_mut() {
            callback(&event);
        }
        event
    }

    /// Hard-stop everything that is sounding. The keyboard state is kept.
    pub fn silence(&mut self) {
        self.stop_all();
        self.audio = AudioState::new();
    }

    fn stop_all(&mut self) {
        if let Some(voice) = self.active.take() {
            self.retiring.push(voice);
        }
        for voice in &mut self.retiring {
            voice.envelope.stop();
        }
    }

    /// Earliest time at which [`poll`](Self::poll) has work to do
    pub fn next_deadline(&self) -> Option<f64> {
        self.active
            .iter()
            .chain(&self.retiring)
            .filter_map(|v| v.envelope.next_deadline())
            .min_by(|a, b| a.total_cmp(b))
    }

    /// Every tone still to be rendered, the active one first
    pub fn tones(&self) -> impl Iterator<Item = &B::Tone> + '_ {
        self.active
            .iter()
            .chain(&self.retiring)
            .map(|v| v.envelope.tone())
    }

    /// Voices released or stopped but not yet finished
    pub fn retiring_voices(
        &self,
    ) -> impl Iterator<Item = (&Pitch, &EnvelopeController<B::Tone>)> + '_ {
        self.retiring.iter().map(|v| (&v.pitch, &v.envelope))
    }

    pub fn keyboard(&self) -> &KeyboardState {
        &self.keyboard
    }

    pub fn audio_state(&self) -> &AudioState {
        &self.audio
    }

    pub fn active_pitch(&self) -> Option<&Pitch> {
        self.audio.active_pitch.as_ref()
    }

    pub fn active_tone(&self) -> Option<&B::Tone> {
        self.active.as_ref().map(|v| v.envelope.tone())
    }

    pub fn active_phase(&self) -> Option<EnvelopePhase> {
        self.active.as_ref().map(|v| v.envelope.phase())
    }

    /// Voices released or stopped but not yet finished
    pub fn retiring_count(&self) -> usize {
        self.retiring.len()
    }

    /// Nothing sounding and nothing fading out
    pub fn is_idle(&self) -> bool {
        self.active.is_none() && self.retiring.is_empty()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}
