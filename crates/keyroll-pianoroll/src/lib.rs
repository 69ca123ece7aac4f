//! Editing core of a MIDI piano roll.
//!
//! Coordinates, scrolling and zoom, selection and the editor state all live
//! in a [`keyroll_reactive::Store`]; an [`EditorSession`] ties them to a song,
//! a player and MIDI input for one open editor.

pub mod config;
pub mod control;
pub mod error;
pub mod geometry;
pub mod gesture;
pub mod history;
pub mod keys;
pub mod measure;
pub mod midi;
pub mod persistence;
pub mod piano_roll;
pub mod player;
pub mod quantizer;
pub mod scroll;
pub mod selection;
pub mod session;
pub mod slider;
pub mod song;
pub mod transform;

pub use config::EditorConfig;
pub use control::{ControlMode, ControlStore};
pub use error::{EditorError, EditorResult};
pub use geometry::{Point, Range, Rect};
pub use gesture::{KeyEvent, KeyboardGesture, MarqueeGesture};
pub use persistence::SessionSnapshot;
pub use piano_roll::{MouseMode, NoteItem, PianoRollSnapshot, PianoRollStore};
pub use quantizer::{QuantizerSettings, QuantizerStore};
pub use selection::{get_bounds, Selection};
pub use session::EditorSession;
pub use transform::NoteCoordTransform;
