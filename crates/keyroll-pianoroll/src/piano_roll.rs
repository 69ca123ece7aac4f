use std::collections::BTreeSet;
use std::rc::Rc;

use keyroll_reactive::{Computed, Equality, Observable, Store, Subscription};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EditorConfig;
use crate::error::{EditorError, EditorResult};
use crate::geometry::{Point, Range, Rect};
use crate::keys::{KeySignature, KeyboardLayout};
use crate::measure::mbt_string;
use crate::player::Player;
use crate::quantizer::{QuantizerSettings, QuantizerStore};
use crate::scroll::{KeyScroll, TickScroll};
use crate::selection::{get_bounds, Selection};
use crate::song::{NoteEvent, NoteId, Song, Track, TrackEvent, TrackId};
use crate::transform::NoteCoordTransform;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseMode {
    #[default]
    Pencil,
    Selection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cursor {
    #[default]
    Auto,
    Crosshair,
    Pencil,
}

/// Canvas rectangle of a note of the selected track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteBounds {
    pub bounds: Rect,
    pub note: NoteEvent,
}

/// Visible note as drawn by the grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteItem {
    pub id: NoteId,
    pub tick: i64,
    pub duration: i64,
    pub note_number: u8,
    pub velocity: u8,
    pub is_selected: bool,
    pub bounds: Rect,
}

/// Part of the piano roll state kept across sessions and history steps.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PianoRollSnapshot {
    pub selection: Option<Selection>,
    pub selected_note_ids: Vec<NoteId>,
    pub selected_track_id: Option<TrackId>,
    #[serde(default)]
    pub quantizer: QuantizerSettings,
}

fn same_track(a: &Option<Rc<Track>>, b: &Option<Rc<Track>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Rc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

/// Editor state of the piano roll of one session.
///
/// Plain fields are observables behind setters; everything derived from them
/// and from the song is a computed value, so the grid and the keyboard only
/// redraw when something they read actually changed.
#[derive(Clone)]
pub struct PianoRollStore {
    store: Store,
    song: Observable<Song>,
    player: Player,
    config: Rc<EditorConfig>,
    tick_scroll: TickScroll,
    key_scroll: KeyScroll,
    quantizer: QuantizerStore,

    mouse_mode: Observable<MouseMode>,
    notes_cursor: Observable<Cursor>,
    selected_track_id: Observable<Option<TrackId>>,
    selection: Observable<Option<Selection>>,
    selected_note_ids: Observable<Vec<NoteId>>,
    last_note_duration: Observable<Option<i64>>,
    not_ghost_track_ids: Observable<BTreeSet<TrackId>>,
    show_track_list: Observable<bool>,
    show_event_list: Observable<bool>,
    new_note_velocity: Observable<u8>,
    key_signature: Observable<Option<KeySignature>>,
    previewing_note_numbers: Observable<BTreeSet<u8>>,

    transform: Computed<NoteCoordTransform>,
    selected_track: Computed<Option<Rc<Track>>>,
    selected_track_index: Computed<Option<usize>>,
    windowed_events: Computed<Rc<Vec<TrackEvent>>>,
    all_note_bounds: Computed<Rc<Vec<NoteBounds>>>,
    notes: Computed<Rc<Vec<NoteItem>>>,
    ghost_track_ids: Computed<Vec<TrackId>>,
    selection_bounds: Computed<Option<Rect>>,
    current_volume: Computed<Option<u8>>,
    current_pan: Computed<Option<u8>>,
    current_mbt_time: Computed<String>,
    control_cursor: Computed<Cursor>,
}

impl PianoRollStore {
    pub fn new(
        store: &Store,
        song: &Observable<Song>,
        player: &Player,
        config: Rc<EditorConfig>,
    ) -> Self {
        let tick_scroll = TickScroll::new(store, song, player, &config);
        let key_scroll = KeyScroll::new(store, &config);
        let quantizer = QuantizerStore::new(store, song, 8);

        let mouse_mode = store.observable(MouseMode::default());
        let selected_track_id = store.observable(None::<TrackId>);
        let selection = store.observable(None::<Selection>);
        let selected_note_ids = store.observable(Vec::<NoteId>::new());
        let not_ghost_track_ids = store.observable(BTreeSet::<TrackId>::new());

        let transform = {
            let (tick_scroll, key_scroll) = (tick_scroll.clone(), key_scroll.clone());
            let min_note_width = config.min_note_width;
            store.computed(move || {
                NoteCoordTransform::new(
                    tick_scroll.transform(),
                    key_scroll.transform(),
                    min_note_width,
                )
            })
        };

        let selected_track = {
            let (song, selected_track_id) = (song.clone(), selected_track_id.clone());
            store.computed_with(Equality::new(same_track), move || {
                let id = selected_track_id.get()?;
                song.with(|song| song.get_track(id).cloned())
            })
        };

        let selected_track_index = {
            let (song, selected_track_id) = (song.clone(), selected_track_id.clone());
            store.computed(move || {
                let id = selected_track_id.get()?;
                song.with(|song| song.track_index(id))
            })
        };

        let windowed_events = {
            let (transform, selected_track, tick_scroll) =
                (transform.clone(), selected_track.clone(), tick_scroll.clone());
            store.computed(move || {
                let Some(track) = selected_track.get() else {
                    return Rc::new(Vec::new());
                };
                let canvas_width = tick_scroll.canvas_width();
                let window = transform.with(|t| {
                    let start = t.get_tick(0.0);
                    Range::from_length(start as f64, (t.get_tick(canvas_width) - start) as f64)
                });
                Rc::new(
                    track
                        .events()
                        .iter()
                        .filter(|event| event.overlaps(&window))
                        .cloned()
                        .collect::<Vec<_>>(),
                )
            })
        };

        let all_note_bounds = {
            let (transform, selected_track) = (transform.clone(), selected_track.clone());
            store.computed(move || {
                let Some(track) = selected_track.get() else {
                    return Rc::new(Vec::new());
                };
                let transform = transform.get();
                let rhythm = track.is_rhythm_track();
                Rc::new(
                    track
                        .notes()
                        .map(|note| NoteBounds {
                            bounds: if rhythm {
                                transform.get_drum_rect(&note)
                            } else {
                                transform.get_rect(&note)
                            },
                            note,
                        })
                        .collect::<Vec<_>>(),
                )
            })
        };

        let notes = {
            let (all_note_bounds, selected_note_ids, tick_scroll) =
                (all_note_bounds.clone(), selected_note_ids.clone(), tick_scroll.clone());
            store.computed(move || {
                let visible = Range::from_length(0.0, tick_scroll.canvas_width());
                selected_note_ids.with(|selected| {
                    all_note_bounds.with(|all| {
                        Rc::new(
                            all.iter()
                                .filter(|n| {
                                    Range::from_length(n.bounds.x, n.bounds.width)
                                        .intersects(&visible)
                                })
                                .map(|n| NoteItem {
                                    id: n.note.id,
                                    tick: n.note.tick,
                                    duration: n.note.duration,
                                    note_number: n.note.note_number,
                                    velocity: n.note.velocity,
                                    is_selected: selected.contains(&n.note.id),
                                    bounds: n.bounds,
                                })
                                .collect::<Vec<_>>(),
                        )
                    })
                })
            })
        };

        let ghost_track_ids = {
            let (song, selected_track_id, not_ghost_track_ids) =
                (song.clone(), selected_track_id.clone(), not_ghost_track_ids.clone());
            store.computed(move || {
                let selected = selected_track_id.get();
                not_ghost_track_ids.with(|not_ghost| {
                    song.with(|song| {
                        song.tracks()
                            .iter()
                            .map(|track| track.id)
                            .filter(|id| Some(*id) != selected && !not_ghost.contains(id))
                            .collect::<Vec<_>>()
                    })
                })
            })
        };

        let selection_bounds = {
            let (selection, transform, selected_track) =
                (selection.clone(), transform.clone(), selected_track.clone());
            store.computed(move || {
                let track = selected_track.get();
                selection.with(|selection| {
                    get_bounds(selection.as_ref(), &transform.get(), track.as_deref())
                })
            })
        };

        let current_volume = {
            let (selected_track, player) = (selected_track.clone(), player.clone());
            store.computed(move || selected_track.get()?.volume_at(player.position()))
        };

        let current_pan = {
            let (selected_track, player) = (selected_track.clone(), player.clone());
            store.computed(move || selected_track.get()?.pan_at(player.position()))
        };

        let current_mbt_time = {
            let (song, player) = (song.clone(), player.clone());
            store.computed(move || {
                let position = player.position();
                song.with(|song| mbt_string(&song.time_signatures(), position, song.timebase))
            })
        };

        let control_cursor = {
            let mouse_mode = mouse_mode.clone();
            store.computed(move || match mouse_mode.get() {
                MouseMode::Pencil => Cursor::Pencil,
                MouseMode::Selection => Cursor::Auto,
            })
        };

        Self {
            store: store.clone(),
            song: song.clone(),
            player: player.clone(),
            tick_scroll,
            key_scroll,
            quantizer,
            mouse_mode,
            notes_cursor: store.observable(Cursor::Auto),
            selected_track_id,
            selection,
            selected_note_ids,
            last_note_duration: store.observable(None),
            not_ghost_track_ids,
            show_track_list: store.observable(false),
            show_event_list: store.observable(false),
            new_note_velocity: store.observable(config.new_note_velocity.clamp(1, 127)),
            key_signature: store.observable(None),
            previewing_note_numbers: store.observable(BTreeSet::new()),
            config,
            transform,
            selected_track,
            selected_track_index,
            windowed_events,
            all_note_bounds,
            notes,
            ghost_track_ids,
            selection_bounds,
            current_volume,
            current_pan,
            current_mbt_time,
            control_cursor,
        }
    }

    /// Starts following the playback position. Hold the subscription for as
    /// long as the piano roll is shown.
    pub fn set_up_autorun(&self) -> Subscription {
        self.tick_scroll.set_up_auto_scroll()
    }

    pub fn tick_scroll(&self) -> &TickScroll {
        &self.tick_scroll
    }

    pub fn key_scroll(&self) -> &KeyScroll {
        &self.key_scroll
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn quantizer(&self) -> &QuantizerStore {
        &self.quantizer
    }

    pub fn serialize(&self) -> PianoRollSnapshot {
        PianoRollSnapshot {
            selection: self.selection.get(),
            selected_note_ids: self.selected_note_ids.get(),
            selected_track_id: self.selected_track_id.get(),
            quantizer: self.quantizer.settings(),
        }
    }

    /// Restores a snapshot as is. An unknown track id is kept; the track
    /// derived values are then simply empty.
    pub fn restore(&self, snapshot: PianoRollSnapshot) {
        self.store.batch(|| {
            self.selection.set(snapshot.selection);
            self.selected_note_ids.set(snapshot.selected_note_ids);
            self.selected_track_id.set(snapshot.selected_track_id);
            self.quantizer.set_settings(snapshot.quantizer);
        });
    }

    pub fn mouse_mode(&self) -> MouseMode {
        self.mouse_mode.get()
    }

    /// Switching modes clears the selection.
    pub fn set_mouse_mode(&self, mode: MouseMode) {
        self.store.batch(|| {
            if self.mouse_mode.set(mode) {
                self.reset_selection();
            }
            self.notes_cursor.set(match mode {
                MouseMode::Pencil => Cursor::Auto,
                MouseMode::Selection => Cursor::Crosshair,
            });
        });
    }

    pub fn toggle_tool(&self) {
        let next = match self.mouse_mode() {
            MouseMode::Pencil => MouseMode::Selection,
            MouseMode::Selection => MouseMode::Pencil,
        };
        self.set_mouse_mode(next);
    }

    pub fn notes_cursor(&self) -> Cursor {
        self.notes_cursor.get()
    }

    pub fn set_notes_cursor(&self, cursor: Cursor) {
        self.notes_cursor.set(cursor);
    }

    pub fn selected_track_id(&self) -> Option<TrackId> {
        self.selected_track_id.get()
    }

    /// Selecting another track clears the selection.
    pub fn set_selected_track_id(&self, id: Option<TrackId>) {
        self.store.batch(|| {
            if self.selected_track_id.set(id) {
                debug!(track = ?id, "selected track changed");
                self.reset_selection();
            }
        });
    }

    pub fn set_selected_track_index(&self, index: usize) -> EditorResult<()> {
        let id = self.song.with(|song| {
            song.tracks()
                .get(index)
                .map(|track| track.id)
                .ok_or(EditorError::TrackIndexOutOfRange {
                    index,
                    len: song.tracks().len(),
                })
        })?;
        self.set_selected_track_id(Some(id));
        Ok(())
    }

    pub fn selection(&self) -> Option<Selection> {
        self.selection.get()
    }

    pub fn set_selection(&self, selection: Option<Selection>) {
        self.selection.set(selection);
    }

    pub fn selected_note_ids(&self) -> Vec<NoteId> {
        self.selected_note_ids.get()
    }

    pub fn set_selected_note_ids(&self, ids: Vec<NoteId>) {
        self.selected_note_ids.set(ids);
    }

    pub fn reset_selection(&self) {
        self.store.batch(|| {
            self.selection.set(None);
            self.selected_note_ids.set(Vec::new());
        });
    }

    /// Selects the notes of the selected track covered by the current
    /// selection and returns their ids.
    pub fn select_notes_in_selection(&self) -> Vec<NoteId> {
        let ids = match (self.selection.get(), self.selected_track.get()) {
            (Some(selection), Some(track)) => selection.note_ids(&track),
            _ => Vec::new(),
        };
        self.selected_note_ids.set(ids.clone());
        ids
    }

    /// Stores the region of a finished marquee drag and selects the notes
    /// it covers.
    pub fn commit_selection(&self, selection: Option<Selection>) -> Vec<NoteId> {
        self.store.batch(|| {
            self.selection.set(selection);
            self.select_notes_in_selection()
        })
    }

    pub fn last_note_duration(&self) -> Option<i64> {
        self.last_note_duration.get()
    }

    pub fn set_last_note_duration(&self, duration: Option<i64>) {
        self.last_note_duration.set(duration);
    }

    pub fn not_ghost_track_ids(&self) -> BTreeSet<TrackId> {
        self.not_ghost_track_ids.get()
    }

    pub fn set_not_ghost_track_ids(&self, ids: BTreeSet<TrackId>) {
        self.not_ghost_track_ids.set(ids);
    }

    pub fn show_track_list(&self) -> bool {
        self.show_track_list.get()
    }

    pub fn set_show_track_list(&self, show: bool) {
        self.show_track_list.set(show);
    }

    pub fn show_event_list(&self) -> bool {
        self.show_event_list.get()
    }

    pub fn set_show_event_list(&self, show: bool) {
        self.show_event_list.set(show);
    }

    pub fn new_note_velocity(&self) -> u8 {
        self.new_note_velocity.get()
    }

    pub fn set_new_note_velocity(&self, velocity: u8) {
        self.new_note_velocity.set(velocity.clamp(1, 127));
    }

    pub fn key_signature(&self) -> Option<KeySignature> {
        self.key_signature.get()
    }

    pub fn set_key_signature(&self, key_signature: Option<KeySignature>) {
        self.key_signature.set(key_signature);
    }

    pub fn previewing_note_numbers(&self) -> BTreeSet<u8> {
        self.previewing_note_numbers.get()
    }

    pub fn add_previewing_note_number(&self, note_number: u8) {
        if self.previewing_note_numbers.with(|set| set.contains(&note_number)) {
            return;
        }
        self.previewing_note_numbers.update(|set| {
            set.insert(note_number);
        });
    }

    pub fn remove_previewing_note_number(&self, note_number: u8) {
        if !self.previewing_note_numbers.with(|set| set.contains(&note_number)) {
            return;
        }
        self.previewing_note_numbers.update(|set| {
            set.remove(&note_number);
        });
    }

    /// Scrolls the grid by a pointer delta; content follows the pointer.
    pub fn scroll_by(&self, dx: f64, dy: f64) {
        self.store.batch(|| {
            self.tick_scroll
                .set_scroll_left_in_pixels(self.tick_scroll.scroll_left() - dx);
            self.key_scroll
                .set_scroll_top_in_pixels(self.key_scroll.scroll_top() - dy);
        });
    }

    /// Converts a canvas point to content coordinates.
    pub fn get_local(&self, point: Point) -> Point {
        point.offset(self.tick_scroll.scroll_left(), self.key_scroll.scroll_top())
    }

    /// Layout of the keyboard column for the selected track.
    pub fn keyboard_layout(&self) -> KeyboardLayout {
        let show_drum_names = self
            .selected_track
            .with(|track| track.as_ref().is_some_and(|track| track.is_rhythm_track()));
        KeyboardLayout::from_config(&self.config, self.key_scroll.pixels_per_key(), show_drum_names)
    }

    /// Visible notes under a canvas point.
    pub fn notes_at(&self, point: Point) -> Vec<NoteItem> {
        self.notes.with(|notes| {
            notes
                .iter()
                .filter(|note| note.bounds.contains_point(point))
                .copied()
                .collect()
        })
    }

    /// Adds a note to the selected track with the current default velocity
    /// and the last used duration. The start is floored to the quantize grid.
    pub fn add_note(&self, tick: i64, note_number: u8) -> Option<NoteId> {
        let track_id = self.selected_track_id.get()?;
        let tick = self.quantizer.floor(tick.max(0));
        let velocity = self.new_note_velocity.get();
        let duration = match self.last_note_duration.get() {
            Some(duration) => duration,
            None => self.song.with(|song| i64::from(song.timebase)),
        };
        let mut added = None;
        self.song.update(|song| {
            if let Some(track) = song.track_mut(track_id) {
                if !track.is_conductor_track() {
                    added = Some(track.add_note(tick, duration, note_number, velocity));
                }
            }
        });
        added
    }

    /// Removes the selected notes from the selected track.
    pub fn remove_selected_notes(&self) -> usize {
        let Some(track_id) = self.selected_track_id.get() else {
            return 0;
        };
        let ids = self.selected_note_ids.get();
        if ids.is_empty() {
            return 0;
        }
        let mut removed = 0;
        self.store.batch(|| {
            self.song.update(|song| {
                if let Some(track) = song.track_mut(track_id) {
                    removed = ids.iter().filter(|id| track.remove_event(**id).is_some()).count();
                }
            });
            self.reset_selection();
        });
        removed
    }

    pub fn transform(&self) -> NoteCoordTransform {
        self.transform.get()
    }

    pub fn selected_track(&self) -> Option<Rc<Track>> {
        self.selected_track.get()
    }

    pub fn selected_track_index(&self) -> Option<usize> {
        self.selected_track_index.get()
    }

    pub fn windowed_events(&self) -> Rc<Vec<TrackEvent>> {
        self.windowed_events.get()
    }

    pub fn all_note_bounds(&self) -> Rc<Vec<NoteBounds>> {
        self.all_note_bounds.get()
    }

    pub fn notes(&self) -> Rc<Vec<NoteItem>> {
        self.notes.get()
    }

    pub fn ghost_track_ids(&self) -> Vec<TrackId> {
        self.ghost_track_ids.get()
    }

    pub fn selection_bounds(&self) -> Option<Rect> {
        self.selection_bounds.get()
    }

    pub fn current_volume(&self) -> Option<u8> {
        self.current_volume.get()
    }

    pub fn current_pan(&self) -> Option<u8> {
        self.current_pan.get()
    }

    /// Player position as `MMMM:BB:TTT`.
    pub fn current_mbt_time(&self) -> String {
        self.current_mbt_time.get()
    }

    pub fn control_cursor(&self) -> Cursor {
        self.control_cursor.get()
    }

    pub fn player(&self) -> &Player {
        &self.player
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::midi::RecordingOutput;
    use crate::song::RHYTHM_CHANNEL;

    struct Fixture {
        store: Store,
        song: Observable<Song>,
        player: Player,
        piano_roll: PianoRollStore,
        piano: TrackId,
        drums: TrackId,
    }

    fn fixture() -> Fixture {
        let store = Store::new();
        let mut song = Song::new(480);
        song.add_track(Track::conductor());
        let piano = song.add_track(Track::new("Piano", 0));
        let drums = song.add_track(Track::new("Drums", RHYTHM_CHANNEL));
        if let Some(track) = song.track_mut(piano) {
            track.add_note(0, 480, 60, 100);
            track.add_note(480, 480, 64, 90);
            track.add_note(9600, 480, 67, 80);
            track.set_volume(100, 0);
            track.set_volume(50, 960);
        }
        if let Some(track) = song.track_mut(drums) {
            track.add_note(0, 10, 36, 127);
        }
        let song = store.observable(song);
        let player = Player::new(&store, Rc::new(RecordingOutput::new()));
        let piano_roll = PianoRollStore::new(
            &store,
            &song,
            &player,
            Rc::new(EditorConfig::default()),
        );
        piano_roll.tick_scroll().set_canvas_width(400.0);
        piano_roll.key_scroll().set_canvas_height(600.0);
        Fixture {
            store,
            song,
            player,
            piano_roll,
            piano,
            drums,
        }
    }

    #[test]
    fn unknown_track_degrades_to_empty() {
        let f = fixture();
        f.piano_roll.restore(PianoRollSnapshot {
            selection: Some(Selection::Notes { ids: vec![0] }),
            selected_note_ids: vec![0],
            selected_track_id: Some(TrackId(42)),
            ..PianoRollSnapshot::default()
        });
        assert!(f.piano_roll.selected_track().is_none());
        assert_eq!(f.piano_roll.selected_track_index(), None);
        assert!(f.piano_roll.notes().is_empty());
        assert!(f.piano_roll.windowed_events().is_empty());
        assert_eq!(f.piano_roll.selection_bounds(), None);
        assert_eq!(f.piano_roll.current_volume(), None);
        assert_eq!(f.piano_roll.selected_note_ids(), vec![0]);
    }

    #[test]
    fn notes_are_limited_to_the_visible_window() {
        let f = fixture();
        f.piano_roll.set_selected_track_id(Some(f.piano));
        let notes = f.piano_roll.notes();
        let numbers: Vec<_> = notes.iter().map(|n| n.note_number).collect();
        assert_eq!(numbers, vec![60, 64]);
        assert_eq!(f.piano_roll.all_note_bounds().len(), 3);

        f.piano_roll.tick_scroll().set_scroll_left_in_ticks(9000);
        let numbers: Vec<_> = f.piano_roll.notes().iter().map(|n| n.note_number).collect();
        assert_eq!(numbers, vec![67]);
    }

    #[test]
    fn windowed_events_include_controllers_in_range() {
        let f = fixture();
        f.piano_roll.set_selected_track_id(Some(f.piano));
        // 400 px at 0.1 px per tick covers ticks 0..4000
        let events = f.piano_roll.windowed_events();
        assert_eq!(events.len(), 4);
        assert!(events.iter().all(|e| e.tick < 4000));
    }

    #[test]
    fn selection_flags_follow_selected_ids() {
        let f = fixture();
        f.piano_roll.set_selected_track_id(Some(f.piano));
        let second = f.piano_roll.notes()[1].id;
        f.piano_roll.set_selected_note_ids(vec![second]);
        let flags: Vec<_> = f.piano_roll.notes().iter().map(|n| n.is_selected).collect();
        assert_eq!(flags, vec![false, true]);
    }

    #[test]
    fn changing_track_or_mode_resets_selection() {
        let f = fixture();
        f.piano_roll.set_selected_track_id(Some(f.piano));
        f.piano_roll.set_selection(Some(Selection::Notes { ids: vec![0] }));
        f.piano_roll.set_selected_note_ids(vec![0]);
        f.piano_roll.set_selected_track_id(Some(f.piano));
        assert_eq!(f.piano_roll.selected_note_ids(), vec![0]);

        f.piano_roll.set_selected_track_id(Some(f.drums));
        assert_eq!(f.piano_roll.selection(), None);
        assert!(f.piano_roll.selected_note_ids().is_empty());

        f.piano_roll.set_selected_note_ids(vec![0]);
        f.piano_roll.toggle_tool();
        assert_eq!(f.piano_roll.mouse_mode(), MouseMode::Selection);
        assert_eq!(f.piano_roll.notes_cursor(), Cursor::Crosshair);
        assert_eq!(f.piano_roll.control_cursor(), Cursor::Auto);
        assert!(f.piano_roll.selected_note_ids().is_empty());
    }

    #[test]
    fn rhythm_tracks_use_drum_rects() {
        let f = fixture();
        f.piano_roll.set_selected_track_id(Some(f.drums));
        let transform = f.piano_roll.transform();
        let bounds = f.piano_roll.all_note_bounds();
        assert_eq!(bounds[0].bounds.width, transform.pixels_per_key());
        assert!(f.piano_roll.keyboard_layout().drum_keys_width.is_some());
    }

    #[test]
    fn derived_values_follow_the_player() {
        let f = fixture();
        f.piano_roll.set_selected_track_index(1).unwrap();
        assert_eq!(f.piano_roll.selected_track_id(), Some(f.piano));
        assert_eq!(f.piano_roll.current_volume(), Some(100));
        assert_eq!(f.piano_roll.current_pan(), None);
        f.player.set_position(960 * 2 + 15);
        assert_eq!(f.piano_roll.current_volume(), Some(50));
        assert_eq!(f.piano_roll.current_mbt_time(), "0002:01:015");
        assert!(matches!(
            f.piano_roll.set_selected_track_index(7),
            Err(EditorError::TrackIndexOutOfRange { index: 7, len: 3 })
        ));
    }

    #[test]
    fn ghost_tracks_exclude_selected_and_pinned() {
        let f = fixture();
        f.piano_roll.set_selected_track_id(Some(f.piano));
        assert_eq!(f.piano_roll.ghost_track_ids(), vec![TrackId(0), f.drums]);
        f.piano_roll.set_not_ghost_track_ids([TrackId(0)].into_iter().collect());
        assert_eq!(f.piano_roll.ghost_track_ids(), vec![f.drums]);
    }

    #[test]
    fn marquee_selection_picks_covered_notes() {
        let f = fixture();
        f.piano_roll.set_selected_track_id(Some(f.piano));
        f.piano_roll.set_mouse_mode(MouseMode::Selection);
        f.piano_roll.set_selection(Some(Selection::Region {
            start_tick: 0,
            end_tick: 960,
            low_note: 62,
            high_note: 70,
        }));
        let ids = f.piano_roll.select_notes_in_selection();
        assert_eq!(ids.len(), 1);
        let bounds = f.piano_roll.selection_bounds().unwrap();
        assert_eq!(bounds.height, 9.0 * 12.0);
        let inside = Point::new(bounds.x + 50.0, f.piano_roll.transform().get_y(64) + 1.0);
        let hit = f.piano_roll.notes_at(inside);
        assert_eq!(hit.len(), 1);
        assert!(hit[0].is_selected);
    }

    #[test]
    fn unrelated_song_edits_keep_derived_notes() {
        let f = fixture();
        f.piano_roll.set_selected_track_id(Some(f.piano));
        let renders = Rc::new(Cell::new(0));
        let _sub = {
            let piano_roll = f.piano_roll.clone();
            let renders = renders.clone();
            f.store.subscribe_with(
                move || piano_roll.notes(),
                Equality::identity(),
                move |_| renders.set(renders.get() + 1),
            )
        };
        let drums = f.drums;
        f.song.update(|song| {
            if let Some(track) = song.track_mut(drums) {
                track.add_note(480, 10, 38, 100);
            }
        });
        assert_eq!(renders.get(), 1);

        f.piano_roll.add_note(0, 72);
        assert_eq!(renders.get(), 2);
    }

    #[test]
    fn previewing_set_ignores_repeats() {
        let f = fixture();
        let changes = Rc::new(Cell::new(0));
        let _sub = {
            let piano_roll = f.piano_roll.clone();
            let changes = changes.clone();
            f.store.reaction(
                move || piano_roll.previewing_note_numbers(),
                move |_| changes.set(changes.get() + 1),
            )
        };
        f.piano_roll.add_previewing_note_number(60);
        f.piano_roll.add_previewing_note_number(60);
        f.piano_roll.remove_previewing_note_number(61);
        f.piano_roll.remove_previewing_note_number(60);
        assert_eq!(changes.get(), 2);
        assert!(f.piano_roll.previewing_note_numbers().is_empty());
    }

    #[test]
    fn remove_selected_notes_edits_the_song() {
        let f = fixture();
        f.piano_roll.set_selected_track_id(Some(f.piano));
        let first = f.piano_roll.notes()[0].id;
        f.piano_roll.set_selected_note_ids(vec![first]);
        assert_eq!(f.piano_roll.remove_selected_notes(), 1);
        assert!(f.piano_roll.selected_note_ids().is_empty());
        assert_eq!(f.piano_roll.all_note_bounds().len(), 2);
    }

    #[test]
    fn new_notes_start_on_the_quantize_grid() {
        let f = fixture();
        f.piano_roll.set_selected_track_id(Some(f.piano));
        let id = f.piano_roll.add_note(1_000, 72).unwrap();
        let added = |id: NoteId| {
            f.song.with(|song| {
                song.get_track(f.piano)
                    .and_then(|track| track.notes().find(|note| note.id == id))
            })
        };
        assert_eq!(added(id).map(|note| note.tick), Some(960));

        f.piano_roll.quantizer().set_denominator(16);
        let id = f.piano_roll.add_note(1_000, 72).unwrap();
        assert_eq!(added(id).map(|note| note.tick), Some(960));
        let id = f.piano_roll.add_note(1_100, 72).unwrap();
        assert_eq!(added(id).map(|note| note.tick), Some(1_080));

        f.piano_roll.quantizer().set_enabled(false);
        let id = f.piano_roll.add_note(1_001, 72).unwrap();
        assert_eq!(added(id).map(|note| note.tick), Some(1_001));
        assert_eq!(
            f.piano_roll.serialize().quantizer,
            QuantizerSettings {
                denominator: 16,
                enabled: false,
            }
        );
    }

    #[test]
    fn zero_velocity_from_config_is_raised_to_one() {
        let store = Store::new();
        let song = store.observable(Song::new(480));
        let player = Player::new(&store, Rc::new(RecordingOutput::new()));
        let config = EditorConfig {
            new_note_velocity: 0,
            ..EditorConfig::default()
        };
        let piano_roll = PianoRollStore::new(&store, &song, &player, Rc::new(config));
        assert_eq!(piano_roll.new_note_velocity(), 1);
    }
}
