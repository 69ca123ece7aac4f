use std::cell::{Cell, RefCell};
use std::rc::Rc;

use keyroll_reactive::{Observable, Store, Subscription};
use tracing::debug;

use crate::config::EditorConfig;
use crate::control::ControlStore;
use crate::gesture::KeyEvent;
use crate::history::HistoryStore;
use crate::midi::{ChannelEvent, MidiInput, MidiListener, MidiMessage, MidiOutput};
use crate::persistence::SessionSnapshot;
use crate::piano_roll::PianoRollStore;
use crate::player::Player;
use crate::slider::{SliderKind, TrackSlider};
use crate::song::Song;

/// Everything one open editor works with.
///
/// Nothing reacts until [`EditorSession::start`]; [`EditorSession::dispose`]
/// (also run on drop) releases every subscription and listener registered
/// by the session.
pub struct EditorSession {
    store: Store,
    config: Rc<EditorConfig>,
    song: Observable<Song>,
    player: Player,
    midi_input: MidiInput,
    monitor_channel: Observable<u8>,
    piano_roll: PianoRollStore,
    control: ControlStore,
    history: HistoryStore,
    subscriptions: RefCell<Vec<Subscription>>,
    listeners: RefCell<Vec<MidiListener>>,
    started: Cell<bool>,
}

impl EditorSession {
    pub fn new(config: EditorConfig, song: Song, output: Rc<dyn MidiOutput>) -> Self {
        let store = Store::new();
        let config = Rc::new(config);
        let song = store.observable(song);
        let player = Player::new(&store, output);
        let piano_roll = PianoRollStore::new(&store, &song, &player, config.clone());
        let control = ControlStore::new(&store);
        let history = HistoryStore::new(&store, &song, &piano_roll, config.history_capacity);
        Self {
            monitor_channel: store.observable(0),
            midi_input: MidiInput::new(),
            subscriptions: RefCell::new(Vec::new()),
            listeners: RefCell::new(Vec::new()),
            started: Cell::new(false),
            store,
            config,
            song,
            player,
            piano_roll,
            control,
            history,
        }
    }

    /// Selects the first non-conductor track and starts the session's
    /// reactions. Calling it again has no effect.
    pub fn start(&self) {
        if self.started.replace(true) {
            return;
        }
        let first_track = self.song.with(|song| {
            song.tracks()
                .iter()
                .find(|track| !track.is_conductor_track())
                .map(|track| track.id)
        });
        self.piano_roll.set_selected_track_id(first_track);

        let mut subscriptions = self.subscriptions.borrow_mut();
        subscriptions.push(self.piano_roll.set_up_autorun());

        let selected_channel = {
            let piano_roll = self.piano_roll.clone();
            move || piano_roll.selected_track().and_then(|track| track.channel).unwrap_or(0)
        };
        let monitor_channel = self.monitor_channel.clone();
        subscriptions.push(self.store.subscribe(selected_channel, move |channel: &u8| {
            monitor_channel.set(*channel);
        }));

        let piano_roll = self.piano_roll.clone();
        let listener = self.midi_input.on_message(move |message| match message.parse() {
            ChannelEvent::NoteOn { note_number, .. } => {
                piano_roll.add_previewing_note_number(note_number)
            }
            ChannelEvent::NoteOff { note_number, .. } => {
                piano_roll.remove_previewing_note_number(note_number)
            }
            _ => {}
        });
        self.listeners.borrow_mut().push(listener);

        debug!(track = ?first_track, "editor session started");
    }

    /// Releases every subscription and listener. Safe to call repeatedly.
    pub fn dispose(&self) {
        let subscriptions = std::mem::take(&mut *self.subscriptions.borrow_mut());
        let listeners = std::mem::take(&mut *self.listeners.borrow_mut());
        if subscriptions.is_empty() && listeners.is_empty() {
            return;
        }
        for subscription in &subscriptions {
            subscription.dispose();
        }
        for listener in &listeners {
            listener.dispose();
        }
        debug!(
            subscriptions = subscriptions.len(),
            listeners = listeners.len(),
            "editor session disposed"
        );
    }

    pub fn is_started(&self) -> bool {
        self.started.get()
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn song(&self) -> &Observable<Song> {
        &self.song
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn midi_input(&self) -> &MidiInput {
        &self.midi_input
    }

    /// Channel the MIDI monitor listens on; follows the selected track.
    pub fn monitor_channel(&self) -> u8 {
        self.monitor_channel.get()
    }

    pub fn piano_roll(&self) -> &PianoRollStore {
        &self.piano_roll
    }

    pub fn control(&self) -> &ControlStore {
        &self.control
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn volume_slider(&self) -> TrackSlider {
        TrackSlider::new(SliderKind::Volume, &self.song, &self.piano_roll, &self.history)
    }

    pub fn pan_slider(&self) -> TrackSlider {
        TrackSlider::new(SliderKind::Pan, &self.song, &self.piano_roll, &self.history)
    }

    pub fn serialize(&self) -> SessionSnapshot {
        SessionSnapshot {
            piano_roll: self.piano_roll.serialize(),
            control: self.control.serialize(),
        }
    }

    pub fn restore(&self, snapshot: SessionSnapshot) {
        self.store.batch(|| {
            self.piano_roll.restore(snapshot.piano_roll);
            self.control.restore(snapshot.control);
        });
    }

    pub fn push_history(&self) {
        self.history.push_history();
    }

    pub fn undo(&self) -> bool {
        self.history.undo()
    }

    pub fn redo(&self) -> bool {
        self.history.redo()
    }

    /// Plays keys pressed on the piano keyboard on the selected track's
    /// channel and marks them as previewing.
    pub fn handle_key_event(&self, event: KeyEvent) {
        let channel = self.monitor_channel.get();
        let velocity = self.piano_roll.new_note_velocity();
        let note_on = |note_number: i32| {
            if let Some(note_number) = midi_note_number(note_number) {
                self.player.send_event(MidiMessage::note_on(channel, note_number, velocity));
                self.piano_roll.add_previewing_note_number(note_number);
            }
        };
        let note_off = |note_number: i32| {
            if let Some(note_number) = midi_note_number(note_number) {
                self.player.send_event(MidiMessage::note_off(channel, note_number));
                self.piano_roll.remove_previewing_note_number(note_number);
            }
        };
        match event {
            KeyEvent::Pressed(note_number) => note_on(note_number),
            KeyEvent::Moved { from, to } => {
                self.store.batch(|| {
                    note_off(from);
                    note_on(to);
                });
            }
            KeyEvent::Released(note_number) => note_off(note_number),
        }
    }
}

impl Drop for EditorSession {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn midi_note_number(note_number: i32) -> Option<u8> {
    u8::try_from(note_number).ok().filter(|n| *n <= 127)
}
