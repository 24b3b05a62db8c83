//! Tone Backend
//!
//! The traits the engine needs from a tone generator, plus a deterministic
//! in-memory implementation driven by a manually advanced clock.
//!
//! # Traits
//!
//! - [`ToneBackend`] creates tones and reports whether sound is possible.
//! - [`ToneHandle`] shapes one tone's gain and stops it.
//!
//! Gain ramps chain: each ramp starts where the previously scheduled
//! automation ends, or at the current time when nothing is scheduled.
//!
//! # Virtual backend
//!
//! [`VirtualBackend`] evaluates gain curves against a [`ManualClock`] shared
//! with the host. It can also render sine samples for offline use and
//! inject failures for testing error paths.

use crate::automation::{GainAutomation, Ramp};
use crate::error::ToneError;
use libm::Libm;
use std::f64::consts::TAU;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// One sounding tone whose gain the engine controls
pub trait ToneHandle {
    /// Current time on the tone's clock (seconds)
    fn current_time(&self) -> f64;

    fn frequency_hz(&self) -> f64;

    /// Gain at the current time
    fn current_gain(&self) -> f64;

    /// Jump to `level` at `at_time`
    fn set_gain_immediate(&mut self, level: f64, at_time: f64);

    /// Linear ramp to `to_level` lasting `over_seconds`
    fn ramp_gain_linear(&mut self, to_level: f64, over_seconds: f64);

    /// Exponential ramp to `to_level` (> 0) lasting `over_seconds`
    fn ramp_gain_exponential(&mut self, to_level: f64, over_seconds: f64);

    /// Drop scheduled gain changes at or after `from_time`
    fn cancel_scheduled(&mut self, from_time: f64);

    /// Stop the tone `seconds` from now. Stopping twice is an error that
    /// callers are expected to swallow.
    fn stop_after(&mut self, seconds: f64) -> Result<(), ToneError>;
}

/// Source of tones
pub trait ToneBackend {
    type Tone: ToneHandle;

    /// Whether the backend can produce sound at all
    fn is_available(&self) -> bool;

    /// Current time on the backend clock (seconds)
    fn current_time(&self) -> f64;

    /// Create a tone at `frequency_hz`, initially silent
    fn create_tone(&mut self, frequency_hz: f64) -> Result<Self::Tone, ToneError>;
}

/// Atomic f64 for lock-free sharing of the clock
///
/// Stored as the bit pattern of an `AtomicU64`.
#[derive(Debug)]
pub struct AtomicF64(AtomicU64);

impl AtomicF64 {
    pub fn new(value: f64) -> Self {
        Self(AtomicU64::new(value.to_bits()))
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Release);
    }
}

impl Default for AtomicF64 {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// Shared clock advanced explicitly by the host
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    seconds: Arc<AtomicF64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> f64 {
        self.seconds.get()
    }

    /// Jump to an absolute time; the clock never goes backwards
    pub fn set(&self, seconds: f64) {
        if seconds > self.now() {
            self.seconds.set(seconds);
        }
    }

    pub fn advance(&self, seconds: f64) {
        self.set(self.now() + seconds.max(0.0));
    }
}

/// In-memory tone backend
#[derive(Debug)]
pub struct VirtualBackend {
    clock: ManualClock,
    available: bool,
    failures_pending: usize,
    created: Vec<f64>,
}

impl VirtualBackend {
    pub fn new(clock: ManualClock) -> Self {
        Self {
            clock,
            available: true,
            failures_pending: 0,
            created: Vec::new(),
        }
    }

    /// A backend that reports itself unavailable
    pub fn unavailable(clock: ManualClock) -> Self {
        Self {
            available: false,
            ..Self::new(clock)
        }
    }

    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }

    /// Make the next `n` tone creations fail
    pub fn fail_next_creations(&mut self, n: usize) {
        self.failures_pending = n;
    }

    /// Frequencies of every tone created so far, in order
    pub fn created_frequencies(&self) -> &[f64] {
        &self.created
    }
}

impl ToneBackend for VirtualBackend {
    type Tone = VirtualTone;

    fn is_available(&self) -> bool {
        self.available
    }

    fn current_time(&self) -> f64 {
        self.clock.now()
    }

    fn create_tone(&mut self, frequency_hz: f64) -> Result<VirtualTone, ToneError> {
        if !self.available {
            return Err(ToneError::BackendUnavailable);
        }
        if self.failures_pending > 0 {
            self.failures_pending -= 1;
            return Err(ToneError::CreationFailed(format!(
                "no tone resources left for {:.2}Hz",
                frequency_hz
            )));
        }
        if !(frequency_hz > 0.0) {
            return Err(ToneError::CreationFailed(format!(
                "invalid frequency {}",
                frequency_hz
            )));
        }
        self.created.push(frequency_hz);
        Ok(VirtualTone::new(self.clock.clone(), frequency_hz))
    }
}

/// A tone whose gain is an automation timeline on a shared clock
#[derive(Debug, Clone)]
pub struct VirtualTone {
    clock: ManualClock,
    frequency_hz: f64,
    gain: GainAutomation,
    stop_at: Option<f64>,
    phase: f64,
}

impl VirtualTone {
    fn new(clock: ManualClock, frequency_hz: f64) -> Self {
        Self {
            clock,
            frequency_hz,
            gain: GainAutomation::new(0.0),
            stop_at: None,
            phase: 0.0,
        }
    }

    /// Gain at an arbitrary time; zero once the tone has stopped
    pub fn gain_at(&self, time: f64) -> f64 {
        match self.stop_at {
            Some(stop) if time >= stop => 0.0,
            _ => self.gain.value_at(time),
        }
    }

    pub fn automation(&self) -> &GainAutomation {
        &self.gain
    }

    /// Whether the tone has stopped as of the current clock time
    pub fn is_stopped(&self) -> bool {
        self.stop_at.is_some_and(|stop| self.clock.now() >= stop)
    }

    /// Render a sine block starting at the current clock time.
    ///
    /// The clock is not advanced; the host does that.
    pub fn render(&mut self, out: &mut [f32], sample_rate: f64) {
        let start = self.clock.now();
        let step = self.frequency_hz / sample_rate;
        for (i, sample) in out.iter_mut().enumerate() {
            let t = start + i as f64 / sample_rate;
            *sample = (self.gain_at(t) * Libm::<f64>::sin(self.phase * TAU)) as f32;
            self.phase = (self.phase + step).fract();
        }
    }
}

impl ToneHandle for VirtualTone {
    fn current_time(&self) -> f64 {
        self.clock.now()
    }

    fn frequency_hz(&self) -> f64 {
        self.frequency_hz
    }

    fn current_gain(&self) -> f64 {
        self.gain_at(self.clock.now())
    }

    fn set_gain_immediate(&mut self, level: f64, at_time: f64) {
        self.gain.set_value_at(level, at_time);
    }

    fn ramp_gain_linear(&mut self, to_level: f64, over_seconds: f64) {
        let now = self.clock.now();
        self.gain.ramp_from_end(Ramp::Linear, to_level, over_seconds, now);
    }

    fn ramp_gain_exponential(&mut self, to_level: f64, over_seconds: f64) {
        let now = self.clock.now();
        self.gain.ramp_from_end(Ramp::Exponential, to_level, over_seconds, now);
    }

    fn cancel_scheduled(&mut self, from_time: f64) {
        self.gain.cancel_from(from_time);
    }

    fn stop_after(&mut self, seconds: f64) -> Result<(), ToneError> {
        if self.stop_at.is_some() {
            return Err(ToneError::StopFailed("tone already stopped".into()));
        }
        self.stop_at = Some(self.clock.now() + seconds.max(0.0));
        Ok(())
    }
}
