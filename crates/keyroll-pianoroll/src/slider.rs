use std::cell::Cell;

use keyroll_reactive::Observable;
use tracing::trace;

use crate::error::{EditorError, EditorResult};
use crate::history::HistoryStore;
use crate::midi::{controller, MidiMessage};
use crate::piano_roll::PianoRollStore;
use crate::song::Song;

pub const DEFAULT_VOLUME: u8 = 100;
pub const PAN_CENTER: u8 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliderKind {
    Volume,
    Pan,
}

impl SliderKind {
    pub fn controller_type(self) -> u8 {
        match self {
            SliderKind::Volume => controller::MAIN_VOLUME,
            SliderKind::Pan => controller::PAN,
        }
    }

    pub fn default_value(self) -> u8 {
        match self {
            SliderKind::Volume => DEFAULT_VOLUME,
            SliderKind::Pan => PAN_CENTER,
        }
    }
}

/// Volume or pan slider of the selected track.
///
/// A drag records one history entry when the pointer goes down; a change
/// made without dragging (keyboard) records its own entry.
pub struct TrackSlider {
    kind: SliderKind,
    song: Observable<Song>,
    piano_roll: PianoRollStore,
    history: HistoryStore,
    is_dragging: Cell<bool>,
}

impl TrackSlider {
    pub fn new(
        kind: SliderKind,
        song: &Observable<Song>,
        piano_roll: &PianoRollStore,
        history: &HistoryStore,
    ) -> Self {
        Self {
            kind,
            song: song.clone(),
            piano_roll: piano_roll.clone(),
            history: history.clone(),
            is_dragging: Cell::new(false),
        }
    }

    pub fn kind(&self) -> SliderKind {
        self.kind
    }

    /// Value at the player position, or the default when the track has none.
    pub fn value(&self) -> u8 {
        let current = match self.kind {
            SliderKind::Volume => self.piano_roll.current_volume(),
            SliderKind::Pan => self.piano_roll.current_pan(),
        };
        current.unwrap_or(self.kind.default_value())
    }

    pub fn default_value(&self) -> u8 {
        self.kind.default_value()
    }

    pub fn is_dragging(&self) -> bool {
        self.is_dragging.get()
    }

    pub fn pointer_down(&self) {
        self.history.push_history();
        self.is_dragging.set(true);
    }

    pub fn pointer_up(&self) {
        self.is_dragging.set(false);
    }

    /// Writes `value` at the player position and sends it to the track's
    /// channel. Does nothing when no track is selected.
    pub fn set_value(&self, value: u8) -> EditorResult<()> {
        let Some(track_id) = self.piano_roll.selected_track_id() else {
            return Ok(());
        };
        let channel = self
            .song
            .with(|song| song.get_track(track_id).map(|track| track.channel))
            .ok_or(EditorError::UnknownTrack(track_id))?;

        if !self.is_dragging.get() {
            self.history.push_history();
        }

        let value = value.min(127);
        let controller_type = self.kind.controller_type();
        let player = self.piano_roll.player();
        let position = player.position();
        self.song.update(|song| {
            if let Some(track) = song.track_mut(track_id) {
                track.set_controller_at(controller_type, value, position);
            }
        });
        trace!(?track_id, controller_type, value, position, "slider value");

        if let Some(channel) = channel {
            player.send_event(MidiMessage::control_change(channel, controller_type, value));
        }
        Ok(())
    }
}
