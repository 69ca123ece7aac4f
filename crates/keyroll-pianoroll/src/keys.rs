use serde::{Deserialize, Serialize};

use crate::config::EditorConfig;
use crate::geometry::Point;

// true for black keys, starting at C
const BLACK_KEYS: [bool; 12] = [
    false, true, false, true, false, false, true, false, true, false, true, false,
];

const NOTE_NAMES: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];

pub fn is_black_key(note_number: i32) -> bool {
    BLACK_KEYS[note_number.rem_euclid(12) as usize]
}

/// Name with octave, middle C (60) being `C4`.
pub fn note_name_with_octave(note_number: i32) -> String {
    let name = NOTE_NAMES[note_number.rem_euclid(12) as usize];
    format!("{name}{}", note_number.div_euclid(12) - 1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scale {
    Major,
    Minor,
}

/// Key used to highlight in-scale rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySignature {
    /// Tonic pitch class, 0 = C.
    pub key: u8,
    pub scale: Scale,
}

impl KeySignature {
    /// Pitch classes of the scale, starting at the tonic.
    pub fn intervals(&self) -> [u8; 7] {
        let steps: [u8; 7] = match self.scale {
            Scale::Major => [0, 2, 4, 5, 7, 9, 11],
            Scale::Minor => [0, 2, 3, 5, 7, 8, 10],
        };
        steps.map(|step| (step + self.key % 12) % 12)
    }

    pub fn contains(&self, note_number: i32) -> bool {
        let pitch_class = note_number.rem_euclid(12) as u8;
        self.intervals().contains(&pitch_class)
    }
}

/// Geometry of the piano keyboard column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyboardLayout {
    pub key_height: f64,
    pub number_of_keys: i32,
    pub black_key_width: f64,
    /// Width of the drum name column, when it is shown.
    pub drum_keys_width: Option<f64>,
}

impl KeyboardLayout {
    pub fn from_config(config: &EditorConfig, key_height: f64, show_drum_names: bool) -> Self {
        Self {
            key_height,
            number_of_keys: i32::from(config.number_of_keys),
            black_key_width: config.black_key_width(),
            drum_keys_width: show_drum_names.then_some(config.drum_keys_width),
        }
    }

    /// Horizontal extent where black keys are drawn.
    pub fn black_key_area(&self) -> f64 {
        self.black_key_width + self.drum_keys_width.unwrap_or(0.0)
    }

    /// Key under `point`, in keyboard content coordinates (y = 0 at the top
    /// of the highest key).
    ///
    /// Right of the black keys the column shows only white keys, so a black
    /// row there resolves to the nearest white neighbour: a fractional
    /// position of 0.5 or more goes up a semitone, anything less goes down.
    /// The two white keys drawn there meet at the middle of the black row, so
    /// its upper half belongs to the key above.
    pub fn pos_to_note_number(&self, point: Point) -> i32 {
        let position = self.number_of_keys as f64 - point.y / self.key_height;
        let note_number = position.floor() as i32;
        if point.x > self.black_key_area() && is_black_key(note_number) {
            if position - position.floor() >= 0.5 {
                return note_number + 1;
            }
            return note_number - 1;
        }
        note_number
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> KeyboardLayout {
        KeyboardLayout {
            key_height: 10.0,
            number_of_keys: 88,
            black_key_width: 40.0,
            drum_keys_width: None,
        }
    }

    #[test]
    fn white_key_half_way_resolves_to_floor() {
        // 88 - 275 / 10 = 60.5
        assert_eq!(layout().pos_to_note_number(Point::new(50.0, 275.0)), 60);
        assert_eq!(layout().pos_to_note_number(Point::new(10.0, 275.0)), 60);
    }

    #[test]
    fn black_row_inside_black_key_area_is_the_black_key() {
        // 88 - 265 / 10 = 61.5, C#4
        assert_eq!(layout().pos_to_note_number(Point::new(20.0, 265.0)), 61);
    }

    #[test]
    fn black_row_beside_black_key_snaps_to_nearest_white() {
        let layout = layout();
        // upper half of the C# row, exactly 0.5 goes up
        assert_eq!(layout.pos_to_note_number(Point::new(50.0, 265.0)), 62);
        assert_eq!(layout.pos_to_note_number(Point::new(50.0, 262.0)), 62);
        // lower half
        assert_eq!(layout.pos_to_note_number(Point::new(50.0, 267.5)), 60);
        assert_eq!(layout.pos_to_note_number(Point::new(50.0, 269.9)), 60);
    }

    #[test]
    fn drum_names_widen_the_black_key_area() {
        let layout = KeyboardLayout {
            drum_keys_width: Some(64.0),
            ..layout()
        };
        assert_eq!(layout.black_key_area(), 104.0);
        assert_eq!(layout.pos_to_note_number(Point::new(100.0, 265.0)), 61);
    }

    #[test]
    fn key_signature_membership() {
        let d_major = KeySignature {
            key: 2,
            scale: Scale::Major,
        };
        assert!(d_major.contains(66));
        assert!(!d_major.contains(65));
        let a_minor = KeySignature {
            key: 9,
            scale: Scale::Minor,
        };
        assert!((60..72).filter(|n| a_minor.contains(*n)).all(|n| !is_black_key(n)));
    }

    #[test]
    fn note_names() {
        assert_eq!(note_name_with_octave(60), "C4");
        assert_eq!(note_name_with_octave(61), "C#4");
        assert_eq!(note_name_with_octave(0), "C-1");
        assert!(is_black_key(70));
        assert!(!is_black_key(-1 + 12));
    }
}
