use serde::{Deserialize, Serialize};

use crate::control::ControlSnapshot;
use crate::error::EditorResult;
use crate::piano_roll::PianoRollSnapshot;

/// Editor state that survives a reload of the song view.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSnapshot {
    pub piano_roll: PianoRollSnapshot,
    pub control: ControlSnapshot,
}

impl SessionSnapshot {
    pub fn to_json(&self) -> EditorResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> EditorResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
