use std::fmt;

use keyroll_reactive::{Observable, Store};
use serde::{Deserialize, Serialize};

use crate::midi::controller;
use crate::song::{EventId, EventKind, Track};

/// Value lane shown under the note grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlMode {
    Velocity,
    PitchBend,
    Controller { controller_type: u8 },
}

impl ControlMode {
    pub const fn controller(controller_type: u8) -> Self {
        ControlMode::Controller { controller_type }
    }

    /// Whether `kind` is drawn in this lane. Velocity lanes draw notes.
    pub fn matches(&self, kind: &EventKind) -> bool {
        match (self, kind) {
            (ControlMode::Velocity, EventKind::Note { .. }) => true,
            (ControlMode::PitchBend, EventKind::PitchBend { .. }) => true,
            (
                ControlMode::Controller { controller_type },
                EventKind::Controller {
                    controller_type: kind, ..
                },
            ) => controller_type == kind,
            _ => false,
        }
    }
}

impl fmt::Display for ControlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlMode::Velocity => f.write_str("velocity"),
            ControlMode::PitchBend => f.write_str("pitchBend"),
            ControlMode::Controller { controller_type } => {
                write!(f, "controller-{controller_type}")
            }
        }
    }
}

pub fn default_control_modes() -> Vec<ControlMode> {
    vec![
        ControlMode::Velocity,
        ControlMode::PitchBend,
        ControlMode::controller(controller::MAIN_VOLUME),
        ControlMode::controller(controller::PAN),
        ControlMode::controller(controller::EXPRESSION),
        ControlMode::controller(controller::SUSTAIN),
        ControlMode::controller(controller::MODULATION),
    ]
}

/// Ticks `[from_tick, to_tick)` selected in a value lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlSelection {
    pub from_tick: i64,
    pub to_tick: i64,
}

impl ControlSelection {
    /// Orders the two ends of a drag.
    pub fn new(a: i64, b: i64) -> Self {
        Self {
            from_tick: a.min(b),
            to_tick: a.max(b),
        }
    }

    pub fn contains(&self, tick: i64) -> bool {
        tick >= self.from_tick && tick < self.to_tick
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlSnapshot {
    pub control_modes: Vec<ControlMode>,
    pub selection: Option<ControlSelection>,
    pub selected_event_ids: Vec<EventId>,
}

impl Default for ControlSnapshot {
    fn default() -> Self {
        Self {
            control_modes: default_control_modes(),
            selection: None,
            selected_event_ids: Vec::new(),
        }
    }
}

/// State of the control pane.
#[derive(Debug, Clone)]
pub struct ControlStore {
    control_mode: Observable<ControlMode>,
    control_modes: Observable<Vec<ControlMode>>,
    selection: Observable<Option<ControlSelection>>,
    selected_event_ids: Observable<Vec<EventId>>,
}

impl ControlStore {
    pub fn new(store: &Store) -> Self {
        Self {
            control_mode: store.observable(ControlMode::Velocity),
            control_modes: store.observable(default_control_modes()),
            selection: store.observable(None),
            selected_event_ids: store.observable(Vec::new()),
        }
    }

    pub fn control_mode(&self) -> ControlMode {
        self.control_mode.get()
    }

    /// Switching lanes drops the event selection of the previous lane.
    pub fn set_control_mode(&self, mode: ControlMode) {
        if self.control_mode.set(mode) {
            self.selection.set(None);
            self.selected_event_ids.set(Vec::new());
        }
    }

    pub fn control_modes(&self) -> Vec<ControlMode> {
        self.control_modes.get()
    }

    pub fn set_control_modes(&self, modes: Vec<ControlMode>) {
        self.control_modes.set(modes);
    }

    pub fn selection(&self) -> Option<ControlSelection> {
        self.selection.get()
    }

    pub fn set_selection(&self, selection: Option<ControlSelection>) {
        self.selection.set(selection);
    }

    pub fn selected_event_ids(&self) -> Vec<EventId> {
        self.selected_event_ids.get()
    }

    pub fn set_selected_event_ids(&self, ids: Vec<EventId>) {
        self.selected_event_ids.set(ids);
    }

    /// Selects the events of the current lane inside the selection range.
    pub fn select_events_in_selection(&self, track: &Track) -> Vec<EventId> {
        let mode = self.control_mode.get();
        let ids: Vec<EventId> = match self.selection.get() {
            Some(selection) => track
                .events()
                .iter()
                .filter(|event| selection.contains(event.tick) && mode.matches(&event.kind))
                .map(|event| event.id)
                .collect(),
            None => Vec::new(),
        };
        self.selected_event_ids.set(ids.clone());
        ids
    }

    pub fn serialize(&self) -> ControlSnapshot {
        ControlSnapshot {
            control_modes: self.control_modes.get(),
            selection: self.selection.get(),
            selected_event_ids: self.selected_event_ids.get(),
        }
    }

    pub fn restore(&self, snapshot: ControlSnapshot) {
        self.control_modes.set(snapshot.control_modes);
        self.selection.set(snapshot.selection);
        self.selected_event_ids.set(snapshot.selected_event_ids);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_lanes() {
        let modes = default_control_modes();
        assert_eq!(modes.len(), 7);
        let names: Vec<_> = modes.iter().map(ToString::to_string).collect();
        assert_eq!(names[..3], ["velocity", "pitchBend", "controller-7"]);
        assert_eq!(modes[6], ControlMode::controller(1));
    }

    #[test]
    fn lane_selection_picks_matching_events() {
        let store = Store::new();
        let control = ControlStore::new(&store);
        let mut track = Track::new("Lead", 0);
        let note = track.add_note(0, 480, 60, 100);
        let volume = track.set_volume(90, 240);
        track.set_pan(64, 240);
        track.set_volume(80, 960);

        control.set_selection(Some(ControlSelection::new(960, 0)));
        assert_eq!(control.select_events_in_selection(&track), vec![note]);

        control.set_control_mode(ControlMode::controller(controller::MAIN_VOLUME));
        assert_eq!(control.selection(), None);
        control.set_selection(Some(ControlSelection::new(0, 960)));
        assert_eq!(control.select_events_in_selection(&track), vec![volume]);
    }

    #[test]
    fn snapshot_keeps_lanes_and_selection() {
        let store = Store::new();
        let control = ControlStore::new(&store);
        control.set_control_modes(vec![ControlMode::PitchBend]);
        control.set_selection(Some(ControlSelection::new(10, 20)));
        control.set_selected_event_ids(vec![3, 4]);
        let snapshot = control.serialize();

        let other = ControlStore::new(&store);
        other.restore(snapshot.clone());
        assert_eq!(other.serialize(), snapshot);
        assert_eq!(ControlSnapshot::default().control_modes, default_control_modes());
    }
}
