//! Mapping between musical coordinates and pixels.
//!
//! All x/y values are relative to the visible canvas: scroll offsets are
//! subtracted on the way out and added back on the way in. Inputs are never
//! range checked; a note number outside the keyboard still maps to a row.

use crate::geometry::Rect;
use crate::song::NoteEvent;

/// Absorbs floating point error so that `get_tick(get_x(t)) == t`.
const TICK_EPSILON: f64 = 1e-6;

/// Horizontal axis: ticks to pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickTransform {
    pub pixels_per_tick: f64,
    pub scroll_left: f64,
}

impl TickTransform {
    pub fn new(pixels_per_tick: f64, scroll_left: f64) -> Self {
        Self {
            pixels_per_tick,
            scroll_left,
        }
    }

    pub fn get_x(&self, tick: i64) -> f64 {
        tick as f64 * self.pixels_per_tick - self.scroll_left
    }

    /// Tick under canvas x, floored.
    pub fn get_tick(&self, x: f64) -> i64 {
        ((x + self.scroll_left) / self.pixels_per_tick + TICK_EPSILON).floor() as i64
    }

    /// Pixel width of a tick span, ignoring scroll.
    pub fn get_delta_x(&self, ticks: i64) -> f64 {
        ticks as f64 * self.pixels_per_tick
    }

    pub fn get_delta_tick(&self, pixels: f64) -> f64 {
        pixels / self.pixels_per_tick
    }
}

/// Vertical axis: note numbers to pixels, highest pitch at the top.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyTransform {
    pub pixels_per_key: f64,
    pub scroll_top: f64,
    pub number_of_keys: i32,
}

impl KeyTransform {
    pub fn new(pixels_per_key: f64, scroll_top: f64, number_of_keys: i32) -> Self {
        Self {
            pixels_per_key,
            scroll_top,
            number_of_keys,
        }
    }

    /// Top edge of the row of `note_number`.
    pub fn get_y(&self, note_number: i32) -> f64 {
        (self.number_of_keys - note_number - 1) as f64 * self.pixels_per_key - self.scroll_top
    }

    pub fn get_note_number_fractional(&self, y: f64) -> f64 {
        self.number_of_keys as f64 - (y + self.scroll_top) / self.pixels_per_key
    }

    /// Row containing canvas y; a row owns its top edge.
    pub fn get_note_number(&self, y: f64) -> i32 {
        (self.get_note_number_fractional(y) - TICK_EPSILON).ceil() as i32 - 1
    }

    /// Lowest row with pixels above canvas y. Used for the bottom edge of a
    /// span, which does not own the row it touches.
    pub fn get_note_number_above(&self, y: f64) -> i32 {
        (self.get_note_number_fractional(y) + TICK_EPSILON).floor() as i32
    }

    pub fn get_delta_y(&self, keys: i32) -> f64 {
        keys as f64 * self.pixels_per_key
    }
}

/// Both axes of the note grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteCoordTransform {
    pub tick: TickTransform,
    pub key: KeyTransform,
    pub min_note_width: f64,
}

impl NoteCoordTransform {
    pub fn new(tick: TickTransform, key: KeyTransform, min_note_width: f64) -> Self {
        Self {
            tick,
            key,
            min_note_width,
        }
    }

    pub fn pixels_per_tick(&self) -> f64 {
        self.tick.pixels_per_tick
    }

    pub fn pixels_per_key(&self) -> f64 {
        self.key.pixels_per_key
    }

    pub fn get_x(&self, tick: i64) -> f64 {
        self.tick.get_x(tick)
    }

    pub fn get_tick(&self, x: f64) -> i64 {
        self.tick.get_tick(x)
    }

    pub fn get_y(&self, note_number: i32) -> f64 {
        self.key.get_y(note_number)
    }

    pub fn get_note_number(&self, y: f64) -> i32 {
        self.key.get_note_number(y)
    }

    pub fn get_note_number_above(&self, y: f64) -> i32 {
        self.key.get_note_number_above(y)
    }

    pub fn get_delta_x(&self, ticks: i64) -> f64 {
        self.tick.get_delta_x(ticks)
    }

    pub fn get_rect(&self, note: &NoteEvent) -> Rect {
        Rect::new(
            self.get_x(note.tick),
            self.get_y(i32::from(note.note_number)),
            self.get_delta_x(note.duration).max(self.min_note_width),
            self.pixels_per_key(),
        )
    }

    /// Square centred on the note start, used on rhythm tracks.
    pub fn get_drum_rect(&self, note: &NoteEvent) -> Rect {
        let size = self.pixels_per_key();
        Rect::new(
            self.get_x(note.tick) - size / 2.0,
            self.get_y(i32::from(note.note_number)),
            size,
            size,
        )
    }
}
