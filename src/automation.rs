//! Gain Automation
//!
//! A timeline of gain events evaluated at arbitrary times, modelled on the
//! automation of an audio parameter:
//!
//! - `Set` jumps to a value at a time.
//! - `Linear` / `Exponential` ramp from the previous event to a value,
//!   arriving at the event time.
//!
//! Exponential ramps cannot start or end at zero (or change sign); such a
//! ramp holds the previous value and jumps when it ends.

use libm::Libm;

/// Kind of automation event
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Ramp {
    Set,
    Linear,
    Exponential,
}

/// One automation event
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutomationEvent {
    pub ramp: Ramp,
    pub time: f64,
    pub value: f64,
}

/// Gain timeline for one tone
#[derive(Debug, Clone, PartialEq)]
pub struct GainAutomation {
    initial: f64,
    events: Vec<AutomationEvent>,
}

impl GainAutomation {
    pub fn new(initial: f64) -> Self {
        Self {
            initial,
            events: Vec::new(),
        }
    }

    pub fn events(&self) -> &[AutomationEvent] {
        &self.events
    }

    /// Time at which the last scheduled event completes
    pub fn end_time(&self) -> Option<f64> {
        self.events.last().map(|e| e.time)
    }

    /// Insert an event, keeping the timeline sorted by time.
    ///
    /// Events at the same time keep insertion order.
    pub fn push(&mut self, event: AutomationEvent) {
        let at = self.events.partition_point(|e| e.time <= event.time);
        self.events.insert(at, event);
    }

    /// Jump to `value` at `time`
    pub fn set_value_at(&mut self, value: f64, time: f64) {
        self.push(AutomationEvent {
            ramp: Ramp::Set,
            time,
            value,
        });
    }

    /// Append a ramp lasting `duration` seconds.
    ///
    /// The ramp starts where the timeline currently ends, or at `now` (pinned
    /// to the current value) if the timeline ended in the past.
    pub fn ramp_from_end(&mut self, ramp: Ramp, value: f64, duration: f64, now: f64) {
        let start = match self.end_time() {
            Some(end) if end >= now => end,
            _ => {
                let current = self.value_at(now);
                self.set_value_at(current, now);
                now
            }
        };
        self.push(AutomationEvent {
            ramp,
            time: start + duration.max(0.0),
            value,
        });
    }

    /// Drop every event at or after `time`
    pub fn cancel_from(&mut self, time: f64) {
        self.events.retain(|e| e.time < time);
    }

    /// Gain at `time`
    pub fn value_at(&self, time: f64) -> f64 {
        // Index of the first event strictly after `time`
        let next_idx = self.events.partition_point(|e| e.time <= time);

        let (prev_time, prev_value) = match next_idx.checked_sub(1) {
            Some(i) => (self.events[i].time, self.events[i].value),
            None => return self.initial,
        };

        let Some(next) = self.events.get(next_idx) else {
            return prev_value;
        };

        let span = next.time - prev_time;
        if span <= 0.0 {
            return prev_value;
        }
        let frac = ((time - prev_time) / span).clamp(0.0, 1.0);

        match next.ramp {
            Ramp::Set => prev_value,
            Ramp::Linear => prev_value + (next.value - prev_value) * frac,
            Ramp::Exponential => {
                if prev_value <= 0.0 || next.value <= 0.0 {
                    prev_value
                } else {
                    prev_value * Libm::<f64>::pow(next.value / prev_value, frac)
                }
            }
        }
    }
}

impl Default for GainAutomation {
    fn default() -> Self {
        Self::new(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_initial_value_before_events() {
        let mut a = GainAutomation::new(0.25);
        assert_eq!(a.value_at(0.0), 0.25);
        a.set_value_at(0.5, 1.0);
        assert_eq!(a.value_at(0.5), 0.25);
        assert_eq!(a.value_at(1.0), 0.5);
        assert_eq!(a.value_at(9.0), 0.5);
    }

    #[test]
    fn test_linear_ramp() {
        let mut a = GainAutomation::new(0.0);
        a.set_value_at(0.0, 0.0);
        a.ramp_from_end(Ramp::Linear, 1.0, 2.0, 0.0);

        assert_relative_eq!(a.value_at(0.5), 0.25, epsilon = 1e-9);
        assert_relative_eq!(a.value_at(1.0), 0.5, epsilon = 1e-9);
        assert_relative_eq!(a.value_at(2.0), 1.0, epsilon = 1e-9);
        assert_relative_eq!(a.value_at(3.0), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_exponential_ramp() {
        let mut a = GainAutomation::new(0.0);
        a.set_value_at(1.0, 0.0);
        a.ramp_from_end(Ramp::Exponential, 0.01, 1.0, 0.0);

        // Geometric midpoint
        assert_relative_eq!(a.value_at(0.5), 0.1, epsilon = 1e-9);
        assert_relative_eq!(a.value_at(1.0), 0.01, epsilon = 1e-9);
    }

    #[test]
    fn test_exponential_from_zero_holds_then_jumps() {
        let mut a = GainAutomation::new(0.0);
        a.set_value_at(0.0, 0.0);
        a.ramp_from_end(Ramp::Exponential, 0.5, 1.0, 0.0);
        assert_eq!(a.value_at(0.9), 0.0);
        assert_eq!(a.value_at(1.0), 0.5);
    }

    #[test]
    fn test_ramps_chain_from_end() {
        let mut a = GainAutomation::new(0.0);
        a.set_value_at(0.0, 0.0);
        a.ramp_from_end(Ramp::Linear, 1.0, 0.1, 0.0);
        a.ramp_from_end(Ramp::Linear, 0.5, 0.1, 0.0);

        assert_relative_eq!(a.end_time().unwrap(), 0.2, epsilon = 1e-12);
        assert_relative_eq!(a.value_at(0.1), 1.0, epsilon = 1e-9);
        assert_relative_eq!(a.value_at(0.15), 0.75, epsilon = 1e-9);
    }

    #[test]
    fn test_ramp_after_idle_timeline_starts_now() {
        let mut a = GainAutomation::new(0.0);
        a.set_value_at(0.8, 0.0);
        a.ramp_from_end(Ramp::Linear, 0.0, 1.0, 5.0);

        // No ramp across the idle gap
        assert_relative_eq!(a.value_at(4.0), 0.8, epsilon = 1e-9);
        assert_relative_eq!(a.value_at(5.5), 0.4, epsilon = 1e-9);
    }

    #[test]
    fn test_cancel_from() {
        let mut a = GainAutomation::new(0.0);
        a.set_value_at(0.0, 0.0);
        a.ramp_from_end(Ramp::Linear, 1.0, 1.0, 0.0);
        a.cancel_from(0.5);

        assert_eq!(a.events().len(), 1);
        assert_eq!(a.value_at(0.75), 0.0);
    }
}
