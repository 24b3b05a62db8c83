//! ADSR Envelope Controller
//!
//! Shapes the gain of one tone over time. Unlike a per-sample envelope
//! generator, the controller schedules ramps on the tone's gain automation and
//! keeps cancellable timers for the transitions that need the engine's
//! attention (auto-release and completion).
//!
//! ```text
//! Idle ──start──▶ Attacking ──(attack+decay)──▶ Sustaining
//!   ▲                 │                            │
//!   │              release/stop               release/stop
//!   │                 ▼                            ▼
//!   └──completion── Releasing ◀────────────────────┘
//! ```
//!
//! Completion fires exactly once per release or stop that is allowed to run
//! to the end. A new `start` cancels it.

use crate::backend::ToneHandle;
use crate::error::ConfigError;
use crate::scheduler::{TimerId, TimerQueue};
use serde::{Deserialize, Serialize};

/// Exponential ramps cannot reach zero; they stop here instead
pub const GAIN_FLOOR: f64 = 0.001;

/// Fade length used by [`EnvelopeController::stop`]
pub const STOP_FADE_SECONDS: f64 = 0.01;

/// Delay before a hard stop reports completion
pub const STOP_COMPLETE_SECONDS: f64 = 0.015;

/// Envelope shape. Times are in seconds, levels in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeConfig {
    pub attack: f64,
    pub decay: f64,
    /// Sustain level as a fraction of `peak`
    pub sustain: f64,
    pub release: f64,
    pub peak: f64,
}

impl Default for EnvelopeConfig {
    /// A plucked shape: fast attack, short decay to a low sustain, long tail
    fn default() -> Self {
        Self {
            attack: 0.005,
            decay: 0.3,
            sustain: 0.2,
            release: 1.5,
            peak: 0.3,
        }
    }
}

impl EnvelopeConfig {
    /// Check every bound, reporting all violations at once
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        // Negated comparisons so NaN is rejected too
        if !(self.attack >= 0.0) {
            errors.push("attack must be >= 0".to_string());
        }
        if !(self.decay >= 0.0) {
            errors.push("decay must be >= 0".to_string());
        }
        if !(0.0..=1.0).contains(&self.sustain) {
            errors.push("sustain must be between 0 and 1".to_string());
        }
        if !(self.release >= 0.0) {
            errors.push("release must be >= 0".to_string());
        }
        if !(0.0..=1.0).contains(&self.peak) {
            errors.push("peak must be between 0 and 1".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::InvalidEnvelope(errors))
        }
    }

    /// Absolute sustain gain
    pub fn sustain_level(&self) -> f64 {
        self.peak * self.sustain
    }
}

/// Where the envelope is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopePhase {
    Idle,
    /// Attack and decay ramps are running
    Attacking,
    Sustaining,
    /// Musical release or hard stop in progress
    Releasing,
}

/// How a completed envelope ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionKind {
    Released,
    Stopped,
}

/// Signal that the tone may be torn down
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Completion {
    pub kind: CompletionKind,
    /// Clock time at which the completion was observed
    pub time: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerAction {
    AutoRelease,
    Complete(CompletionKind),
}

/// Callback invoked when an envelope completes
pub type CompletionCallback = Box<dyn FnMut(&Completion)>;

/// Envelope bound to a single tone
pub struct EnvelopeController<T: ToneHandle> {
    tone: T,
    phase: EnvelopePhase,
    config: EnvelopeConfig,
    timers: TimerQueue<TimerAction>,
    pending: Option<TimerId>,
    stopping: bool,
    sustain_at: f64,
    on_complete: Option<CompletionCallback>,
}

impl<T: ToneHandle> EnvelopeController<T> {
    /// Bind a controller to a tone; nothing sounds until [`start`](Self::start)
    pub fn new(tone: T) -> Self {
        Self {
            tone,
            phase: EnvelopePhase::Idle,
            config: EnvelopeConfig::default(),
            timers: TimerQueue::new(),
            pending: None,
            stopping: false,
            sustain_at: 0.0,
            on_complete: None,
        }
    }

    pub fn set_on_complete(&mut self, callback: CompletionCallback) {
        self.on_complete = Some(callback);
    }

    pub fn tone(&self) -> &T {
        &self.tone
    }

    pub fn tone_mut(&mut self) -> &mut T {
        &mut self.tone
    }

    /// Current phase, accounting for an attack/decay that has finished
    pub fn phase(&self) -> EnvelopePhase {
        if self.phase == EnvelopePhase::Attacking && self.tone.current_time() >= self.sustain_at {
            EnvelopePhase::Sustaining
        } else {
            self.phase
        }
    }

    pub fn is_releasing(&self) -> bool {
        self.phase == EnvelopePhase::Releasing
    }

    /// Whether a hard stop is fading out
    pub fn is_stopping(&self) -> bool {
        self.stopping
    }

    /// When the next timer (auto-release or completion) is due
    pub fn next_deadline(&self) -> Option<f64> {
        self.timers.next_deadline()
    }

    /// Whether a timer (auto-release or completion) is outstanding
    pub fn has_pending_timer(&self) -> bool {
        self.pending.is_some_and(|id| self.timers.is_pending(id))
    }

    /// Begin attack and decay from whatever gain is current.
    ///
    /// Any timer from an earlier `start`/`release`/`stop` is cancelled first,
    /// so a superseded completion never fires.
    pub fn start(&mut self, config: &EnvelopeConfig, auto_release_after: Option<f64>) {
        debug_assert!(config.validate().is_ok(), "envelope config must be validated at load");

        self.cancel_pending();
        let now = self.tone.current_time();
        let current = self.tone.current_gain();

        self.tone.cancel_scheduled(now);
        self.tone.set_gain_immediate(current, now);
        self.tone.ramp_gain_linear(config.peak, config.attack);
        self.tone
            .ramp_gain_exponential(config.sustain_level().max(GAIN_FLOOR), config.decay);

        self.phase = EnvelopePhase::Attacking;
        self.stopping = false;
        self.sustain_at = now + config.attack + config.decay;
        self.config = config.clone();

        if let Some(after) = auto_release_after {
            let id = self.timers.schedule(now + after.max(0.0), TimerAction::AutoRelease);
            self.pending = Some(id);
        }

        log::trace!(
            "envelope start at t={:.4} from gain {:.4} (peak {:.3}, sustain {:.3})",
            now,
            current,
            config.peak,
            config.sustain_level()
        );
    }

    /// Ramp from the current gain to silence over `config.release`.
    ///
    /// No-op when idle or already releasing.
    pub fn release(&mut self, config: &EnvelopeConfig) {
        if matches!(self.phase, EnvelopePhase::Idle | EnvelopePhase::Releasing) {
            return;
        }

        self.cancel_pending();
        let now = self.tone.current_time();
        let current = self.tone.current_gain();

        self.tone.cancel_scheduled(now);
        self.tone.set_gain_immediate(current, now);
        if current > GAIN_FLOOR {
            self.tone.ramp_gain_exponential(GAIN_FLOOR, config.release);
        } else {
            self.tone.ramp_gain_linear(0.0, config.release);
        }

        self.phase = EnvelopePhase::Releasing;
        let id = self.timers.schedule(
            now + config.release,
            TimerAction::Complete(CompletionKind::Released),
        );
        self.pending = Some(id);

        log::trace!("envelope release at t={:.4} from gain {:.4}", now, current);
    }

    /// Fade out over a fixed short time, whatever the phase.
    ///
    /// Idempotent: a second call while a stop is pending does nothing.
    pub fn stop(&mut self) {
        if self.phase == EnvelopePhase::Idle || self.stopping {
            return;
        }

        self.cancel_pending();
        let now = self.tone.current_time();
        let current = self.tone.current_gain();

        self.tone.cancel_scheduled(now);
        self.tone.set_gain_immediate(current, now);
        self.tone.ramp_gain_linear(0.0, STOP_FADE_SECONDS);

        self.phase = EnvelopePhase::Releasing;
        self.stopping = true;
        let id = self.timers.schedule(
            now + STOP_COMPLETE_SECONDS,
            TimerAction::Complete(CompletionKind::Stopped),
        );
        self.pending = Some(id);

        log::trace!("envelope hard stop at t={:.4} from gain {:.4}", now, current);
    }

    /// Fire due timers. Returns the completion if one fired.
    pub fn poll(&mut self) -> Option<Completion> {
        let now = self.tone.current_time();
        if self.phase == EnvelopePhase::Attacking && now >= self.sustain_at {
            self.phase = EnvelopePhase::Sustaining;
        }

        while let Some((id, action)) = self.timers.pop_due(now) {
            if self.pending == Some(id) {
                self.pending = None;
            }
            match action {
                TimerAction::AutoRelease => {
                    let config = self.config.clone();
                    self.release(&config);
                }
                TimerAction::Complete(kind) => {
                    let completion = Completion { kind, time: now };
                    self.phase = EnvelopePhase::Idle;
                    self.stopping = false;
                    if let Some(callback) = self.on_complete.as_mut() {
                        callback(&completion);
                    }
                    return Some(completion);
                }
            }
        }
        None
    }

    /// Cancel all timers, detach the callback and hand back the tone
    pub fn dispose(mut self) -> T {
        let dropped = self.timers.cancel_all();
        if dropped > 0 {
            log::trace!("envelope disposed with {} pending timer(s)", dropped);
        }
        self.pending = None;
        self.on_complete = None;
        self.tone
    }

    fn cancel_pending(&mut self) {
        if let Some(id) = self.pending.take() {
            self.timers.cancel(id);
        }
    }
}

impl<T: ToneHandle + std::fmt::Debug> std::fmt::Debug for EnvelopeController<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvelopeController")
            .field("tone", &self.tone)
            .field("phase", &self.phase)
            .field("pending", &self.pending)
            .field("stopping", &self.stopping)
            .finish_non_exhaustive()
    }
}
