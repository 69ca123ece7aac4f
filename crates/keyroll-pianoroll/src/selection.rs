use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Rect};
use crate::song::{NoteEvent, NoteId, Track};
use crate::transform::NoteCoordTransform;

/// What the user has selected in the note grid. No selection is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Selection {
    /// Ticks `[start_tick, end_tick)` over the rows `low_note..=high_note`.
    Region {
        start_tick: i64,
        end_tick: i64,
        low_note: u8,
        high_note: u8,
    },
    Notes { ids: Vec<NoteId> },
}

impl Selection {
    /// Region spanned by a drag between two canvas points.
    pub fn from_points(a: Point, b: Point, transform: &NoteCoordTransform) -> Self {
        let rect = Rect::from_points(a, b);
        let start_tick = transform.get_tick(rect.x).max(0);
        let end_tick = transform.get_tick(rect.right()).max(start_tick);
        let clamp = |note_number: i32| note_number.clamp(0, 127) as u8;
        let high_note = clamp(transform.get_note_number(rect.y));
        let low_note = clamp(transform.get_note_number_above(rect.bottom())).min(high_note);
        Selection::Region {
            start_tick,
            end_tick,
            low_note,
            high_note,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Selection::Region {
                start_tick,
                end_tick,
                ..
            } => end_tick <= start_tick,
            Selection::Notes { ids } => ids.is_empty(),
        }
    }

    pub fn contains(&self, note: &NoteEvent) -> bool {
        match self {
            Selection::Region {
                start_tick,
                end_tick,
                low_note,
                high_note,
            } => {
                note.tick >= *start_tick
                    && note.tick < *end_tick
                    && (*low_note..=*high_note).contains(&note.note_number)
            }
            Selection::Notes { ids } => ids.contains(&note.id),
        }
    }

    /// Ids of the notes of `track` covered by the selection.
    pub fn note_ids(&self, track: &Track) -> Vec<NoteId> {
        track
            .notes()
            .filter(|note| self.contains(note))
            .map(|note| note.id)
            .collect()
    }
}

/// Canvas rectangle covered by `selection`.
///
/// Regions project their extent through `transform`. Note lists are the
/// union of the referenced notes' rectangles on `track` (drum squares on a
/// rhythm track); a list that resolves to no note has no bounds.
pub fn get_bounds(
    selection: Option<&Selection>,
    transform: &NoteCoordTransform,
    track: Option<&Track>,
) -> Option<Rect> {
    match selection? {
        Selection::Region {
            start_tick,
            end_tick,
            low_note,
            high_note,
        } => {
            let x = transform.get_x(*start_tick);
            let rows = i32::from(*high_note) - i32::from(*low_note) + 1;
            Some(Rect::new(
                x,
                transform.get_y(i32::from(*high_note)),
                transform.get_x(*end_tick) - x,
                rows as f64 * transform.pixels_per_key(),
            ))
        }
        Selection::Notes { ids } => {
            if ids.is_empty() {
                return None;
            }
            let track = track?;
            let rects: Vec<Rect> = track
                .notes()
                .filter(|note| ids.contains(&note.id))
                .map(|note| {
                    if track.is_rhythm_track() {
                        transform.get_drum_rect(&note)
                    } else {
                        transform.get_rect(&note)
                    }
                })
                .collect();
            Rect::bounding(&rects)
        }
    }
}
