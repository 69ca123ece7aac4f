use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::geometry::Range;
use crate::midi::controller;

pub type EventId = u64;
pub type NoteId = EventId;

/// MIDI channel reserved for percussion.
pub const RHYTHM_CHANNEL: u8 = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(pub u32);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    Note {
        duration: i64,
        note_number: u8,
        velocity: u8,
    },
    Controller {
        controller_type: u8,
        value: u8,
    },
    /// 14-bit value, 8192 is centre.
    PitchBend {
        value: u16,
    },
    ProgramChange {
        program: u8,
    },
    SetTempo {
        microseconds_per_beat: u32,
    },
    TimeSignature {
        numerator: u8,
        denominator: u8,
    },
    EndOfTrack,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackEvent {
    pub id: EventId,
    pub tick: i64,
    pub kind: EventKind,
}

impl TrackEvent {
    pub fn as_note(&self) -> Option<NoteEvent> {
        match self.kind {
            EventKind::Note {
                duration,
                note_number,
                velocity,
            } => Some(NoteEvent {
                id: self.id,
                tick: self.tick,
                duration,
                note_number,
                velocity,
            }),
            _ => None,
        }
    }

    pub fn is_note(&self) -> bool {
        matches!(self.kind, EventKind::Note { .. })
    }

    /// Ticks covered by the event. Everything but notes is a point.
    pub fn tick_range(&self) -> Range {
        match self.kind {
            EventKind::Note { duration, .. } => {
                Range::from_length(self.tick as f64, duration.max(0) as f64)
            }
            _ => Range::from_length(self.tick as f64, 0.0),
        }
    }

    /// Whether the event is at least partly inside `range`.
    pub fn overlaps(&self, range: &Range) -> bool {
        match self.kind {
            EventKind::Note { .. } => {
                self.tick_range().intersects(range) || range.contains(self.tick as f64)
            }
            _ => range.contains(self.tick as f64),
        }
    }
}

/// Flattened view of a note event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteEvent {
    pub id: NoteId,
    pub tick: i64,
    pub duration: i64,
    pub note_number: u8,
    pub velocity: u8,
}

impl NoteEvent {
    pub fn end_tick(&self) -> i64 {
        self.tick + self.duration
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub name: String,
    /// `None` for the conductor track.
    pub channel: Option<u8>,
    events: Vec<TrackEvent>,
    next_event_id: EventId,
}

impl Track {
    pub fn new(name: impl Into<String>, channel: u8) -> Self {
        Self {
            id: TrackId::default(),
            name: name.into(),
            channel: Some(channel & 0x0f),
            events: Vec::new(),
            next_event_id: 0,
        }
    }

    /// Tempo and time signature track.
    pub fn conductor() -> Self {
        Self {
            id: TrackId::default(),
            name: String::new(),
            channel: None,
            events: Vec::new(),
            next_event_id: 0,
        }
    }

    pub fn is_conductor_track(&self) -> bool {
        self.channel.is_none()
    }

    pub fn is_rhythm_track(&self) -> bool {
        self.channel == Some(RHYTHM_CHANNEL)
    }

    /// Events sorted by tick.
    pub fn events(&self) -> &[TrackEvent] {
        &self.events
    }

    pub fn notes(&self) -> impl Iterator<Item = NoteEvent> + '_ {
        self.events.iter().filter_map(TrackEvent::as_note)
    }

    pub fn get_event(&self, id: EventId) -> Option<&TrackEvent> {
        self.events.iter().find(|event| event.id == id)
    }

    /// Inserts after any events already at `tick` and returns the new id.
    pub fn add_event(&mut self, tick: i64, kind: EventKind) -> EventId {
        let id = self.next_event_id;
        self.next_event_id += 1;
        let index = self.events.partition_point(|event| event.tick <= tick);
        self.events.insert(index, TrackEvent { id, tick, kind });
        id
    }

    pub fn add_note(&mut self, tick: i64, duration: i64, note_number: u8, velocity: u8) -> NoteId {
        self.add_event(
            tick,
            EventKind::Note {
                duration,
                note_number: note_number.min(127),
                velocity: velocity.min(127),
            },
        )
    }

    pub fn remove_event(&mut self, id: EventId) -> Option<TrackEvent> {
        let index = self.events.iter().position(|event| event.id == id)?;
        Some(self.events.remove(index))
    }

    /// Value of the latest `controller_type` event at or before `tick`.
    pub fn controller_at(&self, controller_type: u8, tick: i64) -> Option<u8> {
        self.events
            .iter()
            .take_while(|event| event.tick <= tick)
            .filter_map(|event| match event.kind {
                EventKind::Controller {
                    controller_type: kind,
                    value,
                } if kind == controller_type => Some(value),
                _ => None,
            })
            .last()
    }

    /// Writes a controller value at `tick`, replacing an event already there.
    pub fn set_controller_at(&mut self, controller_type: u8, value: u8, tick: i64) -> EventId {
        let value = value.min(127);
        let existing = self.events.iter_mut().find(|event| {
            event.tick == tick
                && matches!(
                    event.kind,
                    EventKind::Controller { controller_type: kind, .. } if kind == controller_type
                )
        });
        if let Some(event) = existing {
            event.kind = EventKind::Controller { controller_type, value };
            return event.id;
        }
        self.add_event(tick, EventKind::Controller { controller_type, value })
    }

    pub fn volume_at(&self, tick: i64) -> Option<u8> {
        self.controller_at(controller::MAIN_VOLUME, tick)
    }

    pub fn pan_at(&self, tick: i64) -> Option<u8> {
        self.controller_at(controller::PAN, tick)
    }

    pub fn set_volume(&mut self, value: u8, tick: i64) -> EventId {
        self.set_controller_at(controller::MAIN_VOLUME, value, tick)
    }

    pub fn set_pan(&mut self, value: u8, tick: i64) -> EventId {
        self.set_controller_at(controller::PAN, value, tick)
    }

    /// Tick after the last event, counting note durations.
    pub fn end_tick(&self) -> i64 {
        self.events
            .iter()
            .map(|event| match event.kind {
                EventKind::Note { duration, .. } => event.tick + duration,
                _ => event.tick,
            })
            .max()
            .unwrap_or(0)
    }
}

/// Time signature change on the conductor track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSignature {
    pub tick: i64,
    pub numerator: u8,
    pub denominator: u8,
}

/// Tracks of a song. Tracks are shared so that snapshots stay cheap;
/// edits go through [`Song::track_mut`], which copies a shared track first.
#[derive(Debug, Clone, PartialEq)]
pub struct Song {
    tracks: Vec<Rc<Track>>,
    /// Ticks per quarter note.
    pub timebase: u32,
    next_track_id: u32,
}

impl Default for Song {
    fn default() -> Self {
        Self::new(480)
    }
}

impl Song {
    pub fn new(timebase: u32) -> Self {
        Self {
            tracks: Vec::new(),
            timebase: timebase.max(1),
            next_track_id: 0,
        }
    }

    /// Adds `track` under a fresh id.
    pub fn add_track(&mut self, mut track: Track) -> TrackId {
        let id = TrackId(self.next_track_id);
        self.next_track_id += 1;
        track.id = id;
        self.tracks.push(Rc::new(track));
        id
    }

    pub fn remove_track(&mut self, id: TrackId) -> Option<Rc<Track>> {
        let index = self.track_index(id)?;
        Some(self.tracks.remove(index))
    }

    pub fn tracks(&self) -> &[Rc<Track>] {
        &self.tracks
    }

    pub fn get_track(&self, id: TrackId) -> Option<&Rc<Track>> {
        self.tracks.iter().find(|track| track.id == id)
    }

    pub fn track_index(&self, id: TrackId) -> Option<usize> {
        self.tracks.iter().position(|track| track.id == id)
    }

    pub fn track_mut(&mut self, id: TrackId) -> Option<&mut Track> {
        self.tracks
            .iter_mut()
            .find(|track| track.id == id)
            .map(Rc::make_mut)
    }

    pub fn conductor_track(&self) -> Option<&Rc<Track>> {
        self.tracks.iter().find(|track| track.is_conductor_track())
    }

    pub fn end_of_song(&self) -> i64 {
        self.tracks.iter().map(|track| track.end_tick()).max().unwrap_or(0)
    }

    /// Time signature changes from the conductor track, by tick.
    pub fn time_signatures(&self) -> Vec<TimeSignature> {
        let Some(conductor) = self.conductor_track() else {
            return Vec::new();
        };
        conductor
            .events()
            .iter()
            .filter_map(|event| match event.kind {
                EventKind::TimeSignature {
                    numerator,
                    denominator,
                } => Some(TimeSignature {
                    tick: event.tick,
                    numerator,
                    denominator,
                }),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_stay_sorted_by_tick() {
        let mut track = Track::new("Piano", 0);
        track.add_note(480, 120, 60, 100);
        track.add_note(0, 120, 62, 100);
        let last = track.add_note(480, 60, 64, 100);
        let ticks: Vec<_> = track.events().iter().map(|e| e.tick).collect();
        assert_eq!(ticks, vec![0, 480, 480]);
        assert_eq!(track.events()[2].id, last);
    }

    #[test]
    fn controller_lookup_uses_latest_value_before_tick() {
        let mut track = Track::new("Bass", 1);
        assert_eq!(track.volume_at(0), None);
        track.set_volume(90, 0);
        track.set_volume(60, 960);
        track.set_pan(20, 0);
        assert_eq!(track.volume_at(500), Some(90));
        assert_eq!(track.volume_at(960), Some(60));
        assert_eq!(track.pan_at(5000), Some(20));

        let id = track.set_volume(70, 960);
        assert_eq!(track.volume_at(960), Some(70));
        assert_eq!(track.events().iter().filter(|e| e.id == id).count(), 1);
    }

    #[test]
    fn flags_follow_the_channel() {
        assert!(Track::conductor().is_conductor_track());
        assert!(Track::new("Drums", RHYTHM_CHANNEL).is_rhythm_track());
        assert!(!Track::new("Lead", 2).is_rhythm_track());
    }

    #[test]
    fn editing_a_shared_track_copies_it() {
        let mut song = Song::default();
        let id = song.add_track(Track::new("Piano", 0));
        let snapshot = song.clone();
        if let Some(track) = song.track_mut(id) {
            track.add_note(0, 480, 60, 100);
        }
        assert_eq!(snapshot.get_track(id).unwrap().notes().count(), 0);
        assert_eq!(song.get_track(id).unwrap().notes().count(), 1);
        assert_eq!(song.end_of_song(), 480);
    }

    #[test]
    fn note_overlap_includes_notes_started_earlier() {
        let mut track = Track::new("Piano", 0);
        track.add_note(0, 1000, 60, 100);
        track.set_volume(100, 100);
        let window = Range::from_length(500.0, 200.0);
        let visible: Vec<_> = track.events().iter().filter(|e| e.overlaps(&window)).collect();
        assert_eq!(visible.len(), 1);
        assert!(visible[0].is_note());
    }
}
