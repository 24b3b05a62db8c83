//! Pitch Table
//!
//! Maps a selector value (0–15) to a [`Pitch`], either by semitone arithmetic
//! from a configurable base pitch or by the fixed 16-entry lookup.
//!
//! The offset scheme is fixed when the table is built:
//!
//! | Scheme          | Offset for index `i`                                  |
//! |-----------------|-------------------------------------------------------|
//! | `Chromatic`     | `i`                                                   |
//! | `DiatonicMajor` | `MAJOR[i % 7] + 12 * (i / 7)` (+1 with sharp modifier) |

use crate::error::PitchError;
use crate::pitch::{resolve_pitch, NoteName, Pitch, BASE_PITCHES};
use serde::{Deserialize, Serialize};

/// Largest selector value produced by four selector bits
pub const MAX_SELECTOR: u8 = 15;

/// How a selector value becomes a semitone offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OffsetScheme {
    /// Offset N is N semitones above the base
    Chromatic,
    /// Offset N is scale degree `N % 7` of the major scale, `N / 7` octaves up
    #[default]
    DiatonicMajor,
}

impl OffsetScheme {
    /// Semitone offsets of the scale degrees within one octave
    fn semitones(&self) -> &'static [i32] {
        match self {
            OffsetScheme::Chromatic => &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11],
            OffsetScheme::DiatonicMajor => &[0, 2, 4, 5, 7, 9, 11],
        }
    }

    /// Semitone offset for a selector value, with an optional +1 sharp
    pub fn offset(&self, selector: u8, sharp: bool) -> i32 {
        let degrees = self.semitones();
        let n = degrees.len();
        let index = selector as usize;
        let octave = (index / n) as i32;
        degrees[index % n] + 12 * octave + i32::from(sharp)
    }
}

/// Selector-to-pitch table bound to one validated base pitch.
///
/// Every selector value, with and without the sharp modifier, is resolved
/// when the table is built, so lookups cannot fail.
#[derive(Debug, Clone, PartialEq)]
pub struct PitchTable {
    base: NoteName,
    scheme: OffsetScheme,
    /// Indexed by `selector * 2 + sharp`
    pitches: Vec<Pitch>,
}

impl PitchTable {
    /// Build a table; fails if `base` is not a supported base pitch
    pub fn new(base: NoteName, scheme: OffsetScheme) -> Result<Self, PitchError> {
        let pitches = (0..=MAX_SELECTOR)
            .flat_map(|selector| [false, true].map(|sharp| scheme.offset(selector, sharp)))
            .map(|offset| resolve_pitch(base, offset))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            base,
            scheme,
            pitches,
        })
    }

    pub fn base(&self) -> NoteName {
        self.base
    }

    pub fn scheme(&self) -> OffsetScheme {
        self.scheme
    }

    /// The offset function `f(selector)` this table applies
    pub fn offset_for(&self, selector: u8, sharp: bool) -> i32 {
        self.scheme.offset(selector, sharp)
    }

    /// Pitch for a selector value; values above 15 are clamped
    pub fn pitch_for(&self, selector: u8, sharp: bool) -> Pitch {
        let index = selector.min(MAX_SELECTOR) as usize * 2 + usize::from(sharp);
        self.pitches[index].clone()
    }
}

/// The fixed selector lookup: 0 → C4, 1 → D4, … 15 → D6.
///
/// Values above 15 are clamped.
pub fn fixed_lookup(selector: u8) -> NoteName {
    let (letter, octave, _) = BASE_PITCHES[selector.min(MAX_SELECTOR) as usize];
    NoteName::natural(letter, octave)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pitch::resolve_pitch;
    use approx::assert_relative_eq;

    fn note(s: &str) -> NoteName {
        s.parse().unwrap()
    }

    #[test]
    fn test_chromatic_offsets() {
        let table = PitchTable::new(note("C4"), OffsetScheme::Chromatic).unwrap();
        for i in 0..=MAX_SELECTOR {
            assert_eq!(table.offset_for(i, false), i as i32);
        }
        assert_eq!(table.pitch_for(1, false).name(), note("C#4"));
        assert_relative_eq!(table.pitch_for(1, false).frequency_hz(), 277.18, epsilon = 0.01);
        assert_eq!(table.pitch_for(8, false).name(), note("G#4"));
        assert_eq!(table.pitch_for(9, false).name(), note("A4"));
    }

    #[test]
    fn test_diatonic_offsets() {
        let table = PitchTable::new(note("C4"), OffsetScheme::DiatonicMajor).unwrap();
        let names: Vec<String> = (0..=MAX_SELECTOR)
            .map(|i| table.pitch_for(i, false).name().to_string())
            .collect();
        assert_eq!(
            names,
            [
                "C4", "D4", "E4", "F4", "G4", "A4", "B4", "C5", "D5", "E5", "F5", "G5", "A5",
                "B5", "C6", "D6"
            ]
        );

        // Sharp modifier raises by one semitone
        assert_eq!(table.pitch_for(0, true).name(), note("C#4"));
        assert_eq!(table.pitch_for(2, true).name(), note("F4"));
        assert_eq!(table.offset_for(7, true), 13);
    }

    #[test]
    fn test_diatonic_from_other_base() {
        let table = PitchTable::new(note("E4"), OffsetScheme::DiatonicMajor).unwrap();
        assert_eq!(table.pitch_for(1, false).name(), note("F#4"));
        assert_eq!(table.pitch_for(2, false).name(), note("G#4"));
        assert_eq!(table.pitch_for(7, false).name(), note("E5"));
    }

    #[test]
    fn test_table_matches_resolve_pitch() {
        for scheme in [OffsetScheme::Chromatic, OffsetScheme::DiatonicMajor] {
            let table = PitchTable::new(note("G4"), scheme).unwrap();
            for i in 0..=MAX_SELECTOR {
                let expected = resolve_pitch(note("G4"), scheme.offset(i, false)).unwrap();
                assert_eq!(table.pitch_for(i, false), expected);
            }
        }
    }

    #[test]
    fn test_selector_above_range_is_clamped() {
        let table = PitchTable::new(note("C4"), OffsetScheme::DiatonicMajor).unwrap();
        assert_eq!(table.pitch_for(200, false), table.pitch_for(MAX_SELECTOR, false));
        assert_eq!(table.pitch_for(200, true).name(), note("D#6"));
    }

    #[test]
    fn test_unknown_base_rejected() {
        assert_eq!(
            PitchTable::new(note("F#4"), OffsetScheme::Chromatic),
            Err(PitchError::UnknownBasePitch(note("F#4")))
        );
    }

    #[test]
    fn test_fixed_lookup() {
        assert_eq!(fixed_lookup(0), note("C4"));
        assert_eq!(fixed_lookup(1), note("D4"));
        assert_eq!(fixed_lookup(7), note("C5"));
        assert_eq!(fixed_lookup(15), note("D6"));
        assert_eq!(fixed_lookup(200), note("D6"));
    }

    #[test]
    fn test_fixed_lookup_agrees_with_diatonic_c4() {
        let table = PitchTable::new(note("C4"), OffsetScheme::DiatonicMajor).unwrap();
        for i in 0..=MAX_SELECTOR {
            assert_eq!(fixed_lookup(i), table.pitch_for(i, false).name());
        }
    }
}
