//! Pointer drag state machines for the keyboard and the note grid.

use crate::geometry::Point;
use crate::keys::KeyboardLayout;
use crate::selection::Selection;
use crate::transform::NoteCoordTransform;

/// `Idle` until the pointer goes down, then `Dragging` with the gesture data
/// until it is released.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DragState<T> {
    #[default]
    Idle,
    Dragging(T),
}

impl<T> DragState<T> {
    pub fn is_dragging(&self) -> bool {
        matches!(self, DragState::Dragging(_))
    }

    fn take(&mut self) -> Option<T> {
        match std::mem::take(self) {
            DragState::Dragging(data) => Some(data),
            DragState::Idle => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    Pressed(i32),
    /// The pointer moved onto another key.
    Moved { from: i32, to: i32 },
    Released(i32),
}

/// Dragging over the piano keys.
#[derive(Debug, Clone)]
pub struct KeyboardGesture {
    layout: KeyboardLayout,
    state: DragState<i32>,
}

impl KeyboardGesture {
    pub fn new(layout: KeyboardLayout) -> Self {
        Self {
            layout,
            state: DragState::Idle,
        }
    }

    pub fn set_layout(&mut self, layout: KeyboardLayout) {
        self.layout = layout;
    }

    pub fn state(&self) -> &DragState<i32> {
        &self.state
    }

    /// `point` is in keyboard content coordinates.
    pub fn press(&mut self, point: Point) -> KeyEvent {
        let note_number = self.layout.pos_to_note_number(point);
        self.state = DragState::Dragging(note_number);
        KeyEvent::Pressed(note_number)
    }

    /// Emits only when the key under the pointer changes.
    pub fn drag(&mut self, point: Point) -> Option<KeyEvent> {
        let DragState::Dragging(current) = &mut self.state else {
            return None;
        };
        let note_number = self.layout.pos_to_note_number(point);
        if note_number == *current {
            return None;
        }
        let from = std::mem::replace(current, note_number);
        Some(KeyEvent::Moved {
            from,
            to: note_number,
        })
    }

    pub fn release(&mut self) -> Option<KeyEvent> {
        self.state.take().map(KeyEvent::Released)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Marquee {
    pub origin: Point,
    pub current: Point,
}

/// Rubber band selection over the note grid, in canvas coordinates.
#[derive(Debug, Clone, Default)]
pub struct MarqueeGesture {
    state: DragState<Marquee>,
}

impl MarqueeGesture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DragState<Marquee> {
        &self.state
    }

    pub fn press(&mut self, origin: Point) {
        self.state = DragState::Dragging(Marquee {
            origin,
            current: origin,
        });
    }

    /// Region currently covered by the drag.
    pub fn drag(&mut self, point: Point, transform: &NoteCoordTransform) -> Option<Selection> {
        let DragState::Dragging(marquee) = &mut self.state else {
            return None;
        };
        marquee.current = point;
        Some(Selection::from_points(marquee.origin, marquee.current, transform))
    }

    /// Final region of the drag, or `None` when no drag was in progress.
    pub fn release(&mut self, transform: &NoteCoordTransform) -> Option<Selection> {
        self.state
            .take()
            .map(|marquee| Selection::from_points(marquee.origin, marquee.current, transform))
    }

    pub fn cancel(&mut self) {
        self.state = DragState::Idle;
    }
}
