//! Musical scale quantizer.
//!
//! Maps an arbitrary frequency to the nearest 12-TET frequency whose pitch
//! class belongs to a selected scale. Only the frequency used to derive
//! filter coefficients passes through here; branch targets keep their raw
//! continuous values.

use serde::{Deserialize, Serialize};

/// Reference tuning: A4 = MIDI 69.
pub const A4_HZ: f64 = 440.0;
pub const A4_MIDI: f64 = 69.0;

/// Selectable scales. `Off` (and any unknown name) yields no pitch-class set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScaleName {
    Chromatic,
    Major,
    NaturalMinor,
    HarmonicMinor,
    MelodicMinor,
    Ionian,
    Dorian,
    Phrygian,
    Lydian,
    Mixolydian,
    Aeolian,
    Locrian,
    MajorPentatonic,
    MinorPentatonic,
    Blues,
    WholeTone,
    /// Half-whole diminished.
    OctatonicHalfWhole,
    /// Whole-half diminished.
    OctatonicWholeHalf,
    #[default]
    #[serde(other)]
    Off,
}

impl ScaleName {
    pub const ALL: [ScaleName; 19] = [
        ScaleName::Off,
        ScaleName::Chromatic,
        ScaleName::Major,
        ScaleName::NaturalMinor,
        ScaleName::HarmonicMinor,
        ScaleName::MelodicMinor,
        ScaleName::Ionian,
        ScaleName::Dorian,
        ScaleName::Phrygian,
        ScaleName::Lydian,
        ScaleName::Mixolydian,
        ScaleName::Aeolian,
        ScaleName::Locrian,
        ScaleName::MajorPentatonic,
        ScaleName::MinorPentatonic,
        ScaleName::Blues,
        ScaleName::WholeTone,
        ScaleName::OctatonicHalfWhole,
        ScaleName::OctatonicWholeHalf,
    ];

    /// Interval pattern in semitones above the root, or `None` for `Off`.
    pub fn intervals(&self) -> Option<&'static [u8]> {
        let intervals: &'static [u8] = match self {
            ScaleName::Off => return None,
            ScaleName::Chromatic => &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11],
            ScaleName::Major | ScaleName::Ionian => &[0, 2, 4, 5, 7, 9, 11],
            ScaleName::NaturalMinor | ScaleName::Aeolian => &[0, 2, 3, 5, 7, 8, 10],
            ScaleName::HarmonicMinor => &[0, 2, 3, 5, 7, 8, 11],
            ScaleName::MelodicMinor => &[0, 2, 3, 5, 7, 9, 11],
            ScaleName::Dorian => &[0, 2, 3, 5, 7, 9, 10],
            ScaleName::Phrygian => &[0, 1, 3, 5, 7, 8, 10],
            ScaleName::Lydian => &[0, 2, 4, 6, 7, 9, 11],
            ScaleName::Mixolydian => &[0, 2, 4, 5, 7, 9, 10],
            ScaleName::Locrian => &[0, 1, 3, 5, 6, 8, 10],
            ScaleName::MajorPentatonic => &[0, 2, 4, 7, 9],
            ScaleName::MinorPentatonic => &[0, 3, 5, 7, 10],
            ScaleName::Blues => &[0, 3, 5, 6, 7, 10],
            ScaleName::WholeTone => &[0, 2, 4, 6, 8, 10],
            ScaleName::OctatonicHalfWhole => &[0, 1, 3, 4, 6, 7, 9, 10],
            ScaleName::OctatonicWholeHalf => &[0, 2, 3, 5, 6, 8, 9, 11],
        };
        Some(intervals)
    }

    /// Look up a scale by host-facing name. Accepts the camelCase serde
    /// names plus a few common spellings; returns `None` when unknown.
    pub fn from_name(name: &str) -> Option<ScaleName> {
        let key: String = name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        let scale = match key.as_str() {
            "off" | "none" | "" => ScaleName::Off,
            "chromatic" => ScaleName::Chromatic,
            "major" => ScaleName::Major,
            "minor" | "naturalminor" => ScaleName::NaturalMinor,
            "harmonicminor" => ScaleName::HarmonicMinor,
            "melodicminor" => ScaleName::MelodicMinor,
            "ionian" => ScaleName::Ionian,
            "dorian" => ScaleName::Dorian,
            "phrygian" => ScaleName::Phrygian,
            "lydian" => ScaleName::Lydian,
            "mixolydian" => ScaleName::Mixolydian,
            "aeolian" => ScaleName::Aeolian,
            "locrian" => ScaleName::Locrian,
            "majorpentatonic" | "pentatonicmajor" => ScaleName::MajorPentatonic,
            "minorpentatonic" | "pentatonicminor" => ScaleName::MinorPentatonic,
            "blues" => ScaleName::Blues,
            "wholetone" => ScaleName::WholeTone,
            "octatonichalfwhole" | "octatonichw" | "diminishedhalfwhole" => {
                ScaleName::OctatonicHalfWhole
            }
            "octatonicwholehalf" | "octatonicwh" | "diminishedwholehalf" => {
                ScaleName::OctatonicWholeHalf
            }
            _ => return None,
        };
        Some(scale)
    }
}

/// Scale selection sent by the host: a scale name and a root pitch class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaleSpec {
    pub name: ScaleName,
    /// Root pitch class, 0 = C. Reduced modulo 12.
    pub root: u8,
}

impl ScaleSpec {
    pub fn new(name: ScaleName, root: u8) -> Self {
        ScaleSpec { name, root: root % 12 }
    }

    /// Build from a host-provided name; unknown names fall back to `Off`.
    pub fn from_name(name: &str, root: i32) -> Self {
        let scale = ScaleName::from_name(name).unwrap_or_else(|| {
            log::debug!("unknown scale name {name:?}, quantizing to 12-TET");
            ScaleName::Off
        });
        ScaleSpec::new(scale, root.rem_euclid(12) as u8)
    }

    pub fn pitch_classes(&self) -> Option<PitchClasses> {
        compute_pitch_classes(self.name, self.root)
    }
}

/// Sorted, de-duplicated set of pitch classes (0..12), stored as a bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PitchClasses {
    mask: u16,
}

impl PitchClasses {
    #[inline]
    pub fn contains(&self, pitch_class: i64) -> bool {
        self.mask & (1 << pitch_class.rem_euclid(12)) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.mask == 0
    }

    /// Pitch classes in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        (0u8..12).filter(move |&pc| self.mask & (1 << pc) != 0)
    }
}

/// Allowed pitch classes for `scale` transposed to `root`, or `None` when
/// quantization to a scale is disabled.
pub fn compute_pitch_classes(scale: ScaleName, root: u8) -> Option<PitchClasses> {
    let intervals = scale.intervals()?;
    let mask = intervals
        .iter()
        .fold(0u16, |m, &i| m | (1 << ((i + root % 12) % 12)));
    Some(PitchClasses { mask })
}

/// Frequency of a (possibly fractional) MIDI note.
#[inline]
pub fn midi_to_frequency(midi: f64) -> f64 {
    A4_HZ * (2.0_f64).powf((midi - A4_MIDI) / 12.0)
}

/// Fractional MIDI note for a frequency.
#[inline]
pub fn frequency_to_midi(freq_hz: f64) -> f64 {
    A4_MIDI + 12.0 * (freq_hz / A4_HZ).log2()
}

/// Snap `freq_hz` to the nearest allowed 12-TET frequency.
///
/// With `None` (or an empty set) this is plain nearest-semitone rounding.
/// Otherwise the search walks outward one semitone at a time, trying the
/// upward neighbour before the downward one, so ties resolve upward.
pub fn quantize_to_scale(freq_hz: f64, pitch_classes: Option<&PitchClasses>) -> f64 {
    if freq_hz <= 0.0 || !freq_hz.is_finite() {
        return freq_hz;
    }

    let note = frequency_to_midi(freq_hz).round() as i64;
    let allowed = match pitch_classes {
        Some(pcs) if !pcs.is_empty() => pcs,
        _ => return midi_to_frequency(note as f64),
    };

    if allowed.contains(note) {
        return midi_to_frequency(note as f64);
    }
    for distance in 1..=12 {
        if allowed.contains(note + distance) {
            return midi_to_frequency((note + distance) as f64);
        }
        if allowed.contains(note - distance) {
            return midi_to_frequency((note - distance) as f64);
        }
    }
    midi_to_frequency(note as f64)
}

/// [`quantize_to_scale`] restricted to `[min_hz, max_hz]`. When the nearest
/// allowed note falls outside the range, the closest allowed note inside it
/// is used instead. Only a range too narrow to hold any allowed note falls
/// back to a plain clamp.
pub fn quantize_within(
    freq_hz: f64,
    pitch_classes: Option<&PitchClasses>,
    min_hz: f64,
    max_hz: f64,
) -> f64 {
    let q = quantize_to_scale(freq_hz.clamp(min_hz, max_hz), pitch_classes);
    if (min_hz..=max_hz).contains(&q) {
        return q;
    }

    let allowed = |note: &i64| match pitch_classes {
        Some(pcs) if !pcs.is_empty() => pcs.contains(*note),
        _ => true,
    };
    let lowest = frequency_to_midi(min_hz).ceil() as i64;
    let highest = frequency_to_midi(max_hz).floor() as i64;
    let note = if q < min_hz {
        (lowest..=highest).find(allowed)
    } else {
        (lowest..=highest).rev().find(allowed)
    };
    match note {
        Some(note) => midi_to_frequency(note as f64),
        None => q.clamp(min_hz, max_hz),
    }
}
