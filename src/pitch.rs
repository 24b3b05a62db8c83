//! Pitches and Note Names
//!
//! Typed note names (`letter`, `accidental`, `octave`) and the [`Pitch`] value
//! object produced by the pitch table. Strings like `"C#4"` are parsed only at
//! configuration boundaries via [`FromStr`](core::str::FromStr); the hot input
//! path works on [`NoteName`] values directly.
//!
//! Frequencies follow twelve-tone equal temperament relative to a fixed table
//! of supported base pitches:
//!
//! ```text
//! frequency = base_frequency(base) * 2^(offset / 12)
//! ```

use crate::error::PitchError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Semitones from C for each natural letter
const LETTER_SEMITONES: [i32; 7] = [0, 2, 4, 5, 7, 9, 11];

/// Pitch-class spelling used when deriving names from semitone arithmetic
const SHARP_SPELLING: [(Letter, Accidental); 12] = [
    (Letter::C, Accidental::Natural),
    (Letter::C, Accidental::Sharp),
    (Letter::D, Accidental::Natural),
    (Letter::D, Accidental::Sharp),
    (Letter::E, Accidental::Natural),
    (Letter::F, Accidental::Natural),
    (Letter::F, Accidental::Sharp),
    (Letter::G, Accidental::Natural),
    (Letter::G, Accidental::Sharp),
    (Letter::A, Accidental::Natural),
    (Letter::A, Accidental::Sharp),
    (Letter::B, Accidental::Natural),
];

/// Supported base pitches with their reference frequencies (Hz).
///
/// The order doubles as the fixed 0–15 selector lookup.
pub const BASE_PITCHES: [(Letter, i8, f64); 16] = [
    (Letter::C, 4, 261.63),
    (Letter::D, 4, 293.66),
    (Letter::E, 4, 329.63),
    (Letter::F, 4, 349.23),
    (Letter::G, 4, 392.0),
    (Letter::A, 4, 440.0),
    (Letter::B, 4, 493.88),
    (Letter::C, 5, 523.25),
    (Letter::D, 5, 587.33),
    (Letter::E, 5, 659.25),
    (Letter::F, 5, 698.46),
    (Letter::G, 5, 783.99),
    (Letter::A, 5, 880.0),
    (Letter::B, 5, 987.77),
    (Letter::C, 6, 1046.5),
    (Letter::D, 6, 1174.66),
];

/// Natural note letter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Letter {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Letter {
    fn index(self) -> usize {
        match self {
            Letter::C => 0,
            Letter::D => 1,
            Letter::E => 2,
            Letter::F => 3,
            Letter::G => 4,
            Letter::A => 5,
            Letter::B => 6,
        }
    }

    fn from_char(c: char) -> Option<Self> {
        match c {
            'C' => Some(Letter::C),
            'D' => Some(Letter::D),
            'E' => Some(Letter::E),
            'F' => Some(Letter::F),
            'G' => Some(Letter::G),
            'A' => Some(Letter::A),
            'B' => Some(Letter::B),
            _ => None,
        }
    }

    /// Solfège syllable shown to players
    pub fn solfege(self) -> &'static str {
        match self {
            Letter::C => "ド",
            Letter::D => "レ",
            Letter::E => "ミ",
            Letter::F => "ファ",
            Letter::G => "ソ",
            Letter::A => "ラ",
            Letter::B => "シ",
        }
    }
}

impl fmt::Display for Letter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = ['C', 'D', 'E', 'F', 'G', 'A', 'B'][self.index()];
        write!(f, "{}", c)
    }
}

/// Accidental applied to a letter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Accidental {
    #[default]
    Natural,
    Sharp,
}

/// A spelled note: letter, accidental and octave (`C#4`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NoteName {
    pub letter: Letter,
    pub accidental: Accidental,
    pub octave: i8,
}

impl NoteName {
    pub const fn new(letter: Letter, accidental: Accidental, octave: i8) -> Self {
        Self {
            letter,
            accidental,
            octave,
        }
    }

    /// A natural note (no accidental)
    pub const fn natural(letter: Letter, octave: i8) -> Self {
        Self::new(letter, Accidental::Natural, octave)
    }

    /// Absolute semitone count from C0
    pub fn semitones_from_c0(&self) -> i32 {
        let sharp = match self.accidental {
            Accidental::Natural => 0,
            Accidental::Sharp => 1,
        };
        self.octave as i32 * 12 + LETTER_SEMITONES[self.letter.index()] + sharp
    }

    /// Build the sharp-spelled note for an absolute semitone count from C0.
    ///
    /// `None` when the octave does not fit in an `i8`.
    pub fn from_semitones_from_c0(semitones: i32) -> Option<Self> {
        let octave = i8::try_from(semitones.div_euclid(12)).ok()?;
        let (letter, accidental) = SHARP_SPELLING[semitones.rem_euclid(12) as usize];
        Some(Self::new(letter, accidental, octave))
    }

    /// The note `offset` semitones away, wrapping mod 12 and carrying the
    /// octave. `None` past the representable octaves.
    pub fn transpose(&self, offset: i32) -> Option<Self> {
        self.semitones_from_c0()
            .checked_add(offset)
            .and_then(Self::from_semitones_from_c0)
    }

    /// Reference frequency if this is a supported base pitch
    pub fn base_frequency(&self) -> Option<f64> {
        if self.accidental != Accidental::Natural {
            return None;
        }
        BASE_PITCHES
            .iter()
            .find(|(letter, octave, _)| *letter == self.letter && *octave == self.octave)
            .map(|&(_, _, hz)| hz)
    }

    /// Display name in solfège, with `#` for sharps (`ド#`)
    pub fn display_name(&self) -> String {
        match self.accidental {
            Accidental::Natural => self.letter.solfege().to_string(),
            Accidental::Sharp => format!("{}#", self.letter.solfege()),
        }
    }
}

impl fmt::Display for NoteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sharp = match self.accidental {
            Accidental::Natural => "",
            Accidental::Sharp => "#",
        };
        write!(f, "{}{}{}", self.letter, sharp, self.octave)
    }
}

impl FromStr for NoteName {
    type Err = PitchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PitchError::InvalidNoteName(s.to_string());

        let mut chars = s.chars();
        let letter = chars.next().and_then(Letter::from_char).ok_or_else(invalid)?;
        let rest = chars.as_str();
        let (accidental, octave_str) = match rest.strip_prefix('#') {
            Some(octave) => (Accidental::Sharp, octave),
            None => (Accidental::Natural, rest),
        };

        // `i8::from_str` accepts a leading `+`, which is not a valid spelling
        if octave_str.is_empty() || octave_str.starts_with('+') {
            return Err(invalid());
        }
        let octave = octave_str.parse::<i8>().map_err(|_| invalid())?;

        Ok(Self::new(letter, accidental, octave))
    }
}

impl TryFrom<String> for NoteName {
    type Error = PitchError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NoteName> for String {
    fn from(note: NoteName) -> Self {
        note.to_string()
    }
}

/// Iterate the supported base pitches in selector order
pub fn supported_base_pitches() -> impl Iterator<Item = NoteName> {
    BASE_PITCHES
        .iter()
        .map(|&(letter, octave, _)| NoteName::natural(letter, octave))
}

/// Frequency `semitones` away from `base_hz` in equal temperament
#[inline]
pub fn frequency_from_semitones(base_hz: f64, semitones: i32) -> f64 {
    base_hz * libm::Libm::<f64>::pow(2.0, semitones as f64 / 12.0)
}

/// An immutable resolved pitch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pitch {
    base: NoteName,
    semitone_offset: i32,
    frequency_hz: f64,
    name: NoteName,
    display_name: String,
}

impl Pitch {
    /// Base pitch the offset is measured from
    pub fn base(&self) -> NoteName {
        self.base
    }

    pub fn semitone_offset(&self) -> i32 {
        self.semitone_offset
    }

    pub fn frequency_hz(&self) -> f64 {
        self.frequency_hz
    }

    /// Spelled name of the sounding note (`C#4`)
    pub fn name(&self) -> NoteName {
        self.name
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) {:.2}Hz",
            self.name, self.display_name, self.frequency_hz
        )
    }
}

/// Resolve a pitch from a base and a semitone offset.
///
/// Offsets are not clamped; one that carries the name outside the
/// representable octaves is an error rather than a wrapped name.
pub fn resolve_pitch(base: NoteName, semitone_offset: i32) -> Result<Pitch, PitchError> {
    let base_hz = base
        .base_frequency()
        .ok_or(PitchError::UnknownBasePitch(base))?;
    let name = base
        .transpose(semitone_offset)
        .ok_or(PitchError::OffsetOutOfRange {
            base,
            offset: semitone_offset,
        })?;
    Ok(Pitch {
        base,
        semitone_offset,
        frequency_hz: frequency_from_semitones(base_hz, semitone_offset),
        name,
        display_name: name.display_name(),
    })
}

/// Whether two optional pitches sound the same note
pub fn same_pitch(a: Option<&Pitch>, b: Option<&Pitch>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.name == b.name && (a.frequency_hz - b.frequency_hz).abs() < 0.01,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn note(s: &str) -> NoteName {
        s.parse().unwrap()
    }

    #[test]
    fn test_frequency_from_semitones() {
        assert_relative_eq!(frequency_from_semitones(440.0, 12), 880.0, epsilon = 0.1);
        assert_relative_eq!(frequency_from_semitones(440.0, -12), 220.0, epsilon = 0.1);
        assert_relative_eq!(frequency_from_semitones(440.0, 7), 659.25, epsilon = 0.1);
        assert_eq!(frequency_from_semitones(440.0, 0), 440.0);
    }

    #[test]
    fn test_note_name_parse_and_display() {
        assert_eq!(note("C4"), NoteName::natural(Letter::C, 4));
        assert_eq!(note("F#5"), NoteName::new(Letter::F, Accidental::Sharp, 5));
        assert_eq!(note("A-1").octave, -1);
        assert_eq!(note("C#4").to_string(), "C#4");

        for bad in ["", "X4", "C", "c4", "C#", "C+4", "Cb4", "C4x"] {
            assert!(bad.parse::<NoteName>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn test_transpose_names() {
        assert_eq!(note("C4").transpose(0).unwrap().to_string(), "C4");
        assert_eq!(note("C4").transpose(1).unwrap().to_string(), "C#4");
        assert_eq!(note("C4").transpose(5).unwrap().to_string(), "F4");
        assert_eq!(note("C4").transpose(12).unwrap().to_string(), "C5");
        assert_eq!(note("C4").transpose(15).unwrap().to_string(), "D#5");
        assert_eq!(note("C4").transpose(24).unwrap().to_string(), "C6");
        assert_eq!(note("E4").transpose(1).unwrap().to_string(), "F4");
        assert_eq!(note("E4").transpose(8).unwrap().to_string(), "C5");
        assert_eq!(note("B4").transpose(1).unwrap().to_string(), "C5");
        assert_eq!(note("C5").transpose(-1).unwrap().to_string(), "B4");
    }

    #[test]
    fn test_transpose_past_octave_range() {
        assert_eq!(NoteName::natural(Letter::B, 127).transpose(1), None);
        assert_eq!(NoteName::natural(Letter::C, -128).transpose(-1), None);
        assert_eq!(note("C4").transpose(i32::MAX), None);
        assert_eq!(NoteName::from_semitones_from_c0(12 * 200), None);
    }

    #[test]
    fn test_display_names() {
        assert_eq!(note("C4").display_name(), "ド");
        assert_eq!(note("F4").display_name(), "ファ");
        assert_eq!(note("B4").display_name(), "シ");
        assert_eq!(note("C#4").display_name(), "ド#");
        assert_eq!(note("A#3").display_name(), "ラ#");
    }

    #[test]
    fn test_resolve_pitch() {
        let p = resolve_pitch(note("C4"), 5).unwrap();
        assert_eq!(p.base(), note("C4"));
        assert_eq!(p.semitone_offset(), 5);
        assert_relative_eq!(p.frequency_hz(), 349.23, epsilon = 0.1);
        assert_eq!(p.name(), note("F4"));
        assert_eq!(p.display_name(), "ファ");

        let p = resolve_pitch(note("A4"), 3).unwrap();
        assert_relative_eq!(p.frequency_hz(), 523.25, epsilon = 0.1);
        assert_eq!(p.name(), note("C5"));

        let p = resolve_pitch(note("G4"), 0).unwrap();
        assert_eq!(p.frequency_hz(), 392.0);
    }

    #[test]
    fn test_resolve_pitch_unknown_base() {
        assert_eq!(
            resolve_pitch(note("C#4"), 0),
            Err(PitchError::UnknownBasePitch(note("C#4")))
        );
        assert!(resolve_pitch(note("C3"), 0).is_err());
    }

    #[test]
    fn test_resolve_pitch_extreme_offsets() {
        let far = resolve_pitch(note("C4"), 1200).unwrap();
        assert_eq!(far.name().to_string(), "C104");

        assert_eq!(
            resolve_pitch(note("C4"), 1600),
            Err(PitchError::OffsetOutOfRange {
                base: note("C4"),
                offset: 1600
            })
        );
        assert!(resolve_pitch(note("C4"), -2000).is_err());
        assert!(resolve_pitch(note("C4"), i32::MIN).is_err());
    }

    #[test]
    fn test_same_note_from_different_bases() {
        let from_c = resolve_pitch(note("C4"), 5).unwrap();
        let from_d = resolve_pitch(note("D4"), 3).unwrap();
        let from_e = resolve_pitch(note("E4"), 1).unwrap();

        assert_eq!(from_c.name(), note("F4"));
        assert_eq!(from_d.name(), note("F4"));
        assert_eq!(from_e.name(), note("F4"));
        assert!((from_c.frequency_hz() - from_d.frequency_hz()).abs() < 0.1);
        assert!((from_d.frequency_hz() - from_e.frequency_hz()).abs() < 0.1);
    }

    #[test]
    fn test_same_pitch() {
        let a = resolve_pitch(note("C4"), 1).unwrap();
        let b = resolve_pitch(note("C4"), 1).unwrap();
        let c = resolve_pitch(note("C4"), 2).unwrap();

        assert!(same_pitch(Some(&a), Some(&b)));
        assert!(!same_pitch(Some(&a), Some(&c)));
        assert!(same_pitch(None, None));
        assert!(!same_pitch(Some(&a), None));
        assert!(!same_pitch(None, Some(&a)));
    }

    #[test]
    fn test_note_name_serde() {
        let json = serde_json::to_string(&note("C#4")).unwrap();
        assert_eq!(json, "\"C#4\"");
        let back: NoteName = serde_json::from_str(&json).unwrap();
        assert_eq!(back, note("C#4"));
        assert!(serde_json::from_str::<NoteName>("\"H2\"").is_err());
    }

    #[test]
    fn test_supported_base_pitches() {
        let all: Vec<String> = supported_base_pitches().map(|n| n.to_string()).collect();
        assert_eq!(all.len(), 16);
        assert_eq!(all[0], "C4");
        assert_eq!(all[15], "D6");
        for n in supported_base_pitches() {
            assert!(n.base_frequency().unwrap() > 0.0);
        }
    }
}
