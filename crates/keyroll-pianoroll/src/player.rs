use std::fmt;
use std::rc::Rc;

use keyroll_reactive::{Observable, Store};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::midi::{MidiMessage, MidiOutput};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopRegion {
    pub begin: i64,
    pub end: i64,
    pub enabled: bool,
}

/// Transport state observed by the editor.
#[derive(Clone)]
pub struct Player {
    position: Observable<i64>,
    is_playing: Observable<bool>,
    loop_region: Observable<Option<LoopRegion>>,
    output: Rc<dyn MidiOutput>,
}

impl fmt::Debug for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Player")
            .field("position", &self.position)
            .field("is_playing", &self.is_playing)
            .finish()
    }
}

impl Player {
    pub fn new(store: &Store, output: Rc<dyn MidiOutput>) -> Self {
        Self {
            position: store.observable(0),
            is_playing: store.observable(false),
            loop_region: store.observable(None),
            output,
        }
    }

    pub fn position(&self) -> i64 {
        self.position.get()
    }

    pub fn set_position(&self, tick: i64) {
        self.position.set(tick.max(0));
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing.get()
    }

    pub fn play(&self) {
        if self.is_playing.set(true) {
            debug!(position = self.position.get(), "playback started");
        }
    }

    pub fn stop(&self) {
        if self.is_playing.set(false) {
            debug!(position = self.position.get(), "playback stopped");
        }
    }

    pub fn play_or_pause(&self) {
        if self.is_playing() {
            self.stop();
        } else {
            self.play();
        }
    }

    /// Stops and rewinds to the start.
    pub fn reset(&self) {
        self.stop();
        self.set_position(0);
    }

    pub fn loop_region(&self) -> Option<LoopRegion> {
        self.loop_region.get()
    }

    pub fn set_loop_begin(&self, tick: i64) {
        self.loop_region.update(|region| {
            let current = region.get_or_insert(LoopRegion {
                begin: 0,
                end: tick,
                enabled: false,
            });
            current.begin = tick.min(current.end);
        });
    }

    pub fn set_loop_end(&self, tick: i64) {
        self.loop_region.update(|region| {
            let current = region.get_or_insert(LoopRegion {
                begin: 0,
                end: tick,
                enabled: false,
            });
            current.end = tick.max(current.begin);
        });
    }

    pub fn toggle_enable_loop(&self) {
        self.loop_region.update(|region| {
            if let Some(region) = region {
                region.enabled = !region.enabled;
            }
        });
    }

    /// Sends `message` to the output right away.
    pub fn send_event(&self, message: MidiMessage) {
        self.output.send(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::RecordingOutput;

    #[test]
    fn loop_points_stay_ordered() {
        let store = Store::new();
        let player = Player::new(&store, Rc::new(RecordingOutput::new()));
        player.set_loop_end(1920);
        player.set_loop_begin(3000);
        let region = player.loop_region().unwrap();
        assert_eq!((region.begin, region.end), (1920, 1920));
        player.toggle_enable_loop();
        assert!(player.loop_region().unwrap().enabled);
    }

    #[test]
    fn send_event_reaches_the_output() {
        let store = Store::new();
        let output = Rc::new(RecordingOutput::new());
        let player = Player::new(&store, output.clone());
        player.send_event(MidiMessage::note_on(0, 60, 100));
        assert_eq!(output.sent(), vec![MidiMessage::note_on(0, 60, 100)]);
    }

    #[test]
    fn reset_rewinds_and_stops() {
        let store = Store::new();
        let player = Player::new(&store, Rc::new(RecordingOutput::new()));
        player.set_position(960);
        player.play();
        player.reset();
        assert!(!player.is_playing());
        assert_eq!(player.position(), 0);
    }
}
