//! Three-byte channel messages and the MIDI input listener registry.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};
use tracing::trace;

/// Controller numbers used by the editor.
pub mod controller {
    pub const MODULATION: u8 = 1;
    pub const MAIN_VOLUME: u8 = 7;
    pub const PAN: u8 = 10;
    pub const EXPRESSION: u8 = 11;
    pub const SUSTAIN: u8 = 64;
}

const NOTE_OFF: u8 = 0x80;
const NOTE_ON: u8 = 0x90;
const CONTROL_CHANGE: u8 = 0xb0;

/// Raw channel voice message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MidiMessage {
    pub data: [u8; 3],
}

impl MidiMessage {
    pub const fn new(data: [u8; 3]) -> Self {
        Self { data }
    }

    pub fn note_on(channel: u8, note_number: u8, velocity: u8) -> Self {
        Self::new([NOTE_ON | (channel & 0x0f), note_number & 0x7f, velocity & 0x7f])
    }

    pub fn note_off(channel: u8, note_number: u8) -> Self {
        Self::new([NOTE_OFF | (channel & 0x0f), note_number & 0x7f, 0])
    }

    pub fn control_change(channel: u8, controller: u8, value: u8) -> Self {
        Self::new([CONTROL_CHANGE | (channel & 0x0f), controller & 0x7f, value & 0x7f])
    }

    pub fn channel(&self) -> u8 {
        self.data[0] & 0x0f
    }

    pub fn parse(&self) -> ChannelEvent {
        let [status, first, second] = self.data;
        let channel = status & 0x0f;
        match status & 0xf0 {
            // Note on with zero velocity is a note off.
            NOTE_ON if second == 0 => ChannelEvent::NoteOff {
                channel,
                note_number: first,
            },
            NOTE_ON => ChannelEvent::NoteOn {
                channel,
                note_number: first,
                velocity: second,
            },
            NOTE_OFF => ChannelEvent::NoteOff {
                channel,
                note_number: first,
            },
            CONTROL_CHANGE => ChannelEvent::ControlChange {
                channel,
                controller: first,
                value: second,
            },
            _ => ChannelEvent::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelEvent {
    NoteOn { channel: u8, note_number: u8, velocity: u8 },
    NoteOff { channel: u8, note_number: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
    Other,
}

/// Destination for messages sent immediately, bypassing the sequence.
pub trait MidiOutput {
    fn send(&self, message: MidiMessage);
}

/// Keeps every message it is sent.
#[derive(Debug, Default)]
pub struct RecordingOutput {
    sent: RefCell<Vec<MidiMessage>>,
}

impl RecordingOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<MidiMessage> {
        self.sent.borrow().clone()
    }

    pub fn clear(&self) {
        self.sent.borrow_mut().clear();
    }
}

impl MidiOutput for RecordingOutput {
    fn send(&self, message: MidiMessage) {
        self.sent.borrow_mut().push(message);
    }
}

type Callback = Rc<RefCell<Box<dyn FnMut(&MidiMessage)>>>;

#[derive(Default)]
struct InputInner {
    listeners: RefCell<BTreeMap<u64, Callback>>,
    next_id: Cell<u64>,
}

/// Incoming MIDI messages, delivered to listeners in registration order.
#[derive(Clone, Default)]
pub struct MidiInput {
    inner: Rc<InputInner>,
}

impl fmt::Debug for MidiInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MidiInput")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl MidiInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_message(&self, callback: impl FnMut(&MidiMessage) + 'static) -> MidiListener {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        self.inner
            .listeners
            .borrow_mut()
            .insert(id, Rc::new(RefCell::new(Box::new(callback))));
        MidiListener {
            id,
            input: Rc::downgrade(&self.inner),
            active: Cell::new(true),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    /// Delivers `data` to every listener registered when the call began and
    /// still registered when its turn comes.
    pub fn dispatch(&self, data: [u8; 3]) {
        let message = MidiMessage::new(data);
        trace!(?message, "dispatching midi input");
        let ids: Vec<u64> = self.inner.listeners.borrow().keys().copied().collect();
        for id in ids {
            let callback = self.inner.listeners.borrow().get(&id).cloned();
            if let Some(callback) = callback {
                if let Ok(mut callback) = callback.try_borrow_mut() {
                    callback(&message);
                }
            }
        }
    }
}

/// Registration returned by [`MidiInput::on_message`]. Released on drop.
#[must_use = "dropping a listener unregisters it immediately"]
pub struct MidiListener {
    id: u64,
    input: Weak<InputInner>,
    active: Cell<bool>,
}

impl fmt::Debug for MidiListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MidiListener")
            .field("id", &self.id)
            .field("active", &self.active.get())
            .finish()
    }
}

impl MidiListener {
    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    pub fn dispose(&self) {
        if !self.active.replace(false) {
            return;
        }
        if let Some(input) = self.input.upgrade() {
            let removed = input.listeners.borrow_mut().remove(&self.id);
            drop(removed);
        }
    }
}

impl Drop for MidiListener {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_velocity_note_on_is_note_off() {
        let message = MidiMessage::new([0x93, 60, 0]);
        assert_eq!(
            message.parse(),
            ChannelEvent::NoteOff {
                channel: 3,
                note_number: 60
            }
        );
        assert_eq!(
            MidiMessage::note_on(0, 64, 90).parse(),
            ChannelEvent::NoteOn {
                channel: 0,
                note_number: 64,
                velocity: 90
            }
        );
    }

    #[test]
    fn control_change_encodes_channel() {
        let message = MidiMessage::control_change(9, controller::PAN, 200);
        assert_eq!(message.data, [0xb9, 10, 72]);
        assert_eq!(message.channel(), 9);
    }

    #[test]
    fn listener_release_is_idempotent() {
        let input = MidiInput::new();
        let received = Rc::new(Cell::new(0));
        let listener = {
            let received = received.clone();
            input.on_message(move |_| received.set(received.get() + 1))
        };
        input.dispatch([0x90, 60, 100]);
        listener.dispose();
        listener.dispose();
        input.dispatch([0x80, 60, 0]);
        assert_eq!(received.get(), 1);
        assert_eq!(input.listener_count(), 0);
    }

    #[test]
    fn listener_removed_during_dispatch_is_skipped() {
        let input = MidiInput::new();
        let late: Rc<RefCell<Option<MidiListener>>> = Rc::new(RefCell::new(None));
        let calls = Rc::new(Cell::new(0));
        let _first = {
            let late = late.clone();
            input.on_message(move |_| {
                if let Some(listener) = late.borrow().as_ref() {
                    listener.dispose();
                }
            })
        };
        let second = {
            let calls = calls.clone();
            input.on_message(move |_| calls.set(calls.get() + 1))
        };
        *late.borrow_mut() = Some(second);
        input.dispatch([0x90, 60, 100]);
        assert_eq!(calls.get(), 0);
    }
}
