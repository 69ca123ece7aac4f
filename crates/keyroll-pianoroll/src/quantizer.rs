use keyroll_reactive::{Observable, Store};
use serde::{Deserialize, Serialize};

use crate::song::Song;

/// Grid the pencil snaps to: `denominator` divisions of a whole note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuantizerSettings {
    pub denominator: u32,
    pub enabled: bool,
}

impl Default for QuantizerSettings {
    fn default() -> Self {
        Self {
            denominator: 8,
            enabled: true,
        }
    }
}

impl QuantizerSettings {
    /// Grid step in ticks for a song with `timebase` ticks per quarter note.
    pub fn unit(&self, timebase: u32) -> i64 {
        (i64::from(timebase) * 4 / i64::from(self.denominator.max(1))).max(1)
    }

    fn snap(&self, tick: i64, timebase: u32, f: impl Fn(f64) -> f64) -> i64 {
        if !self.enabled {
            return tick;
        }
        let unit = self.unit(timebase);
        f(tick as f64 / unit as f64) as i64 * unit
    }

    pub fn round(&self, tick: i64, timebase: u32) -> i64 {
        self.snap(tick, timebase, f64::round)
    }

    pub fn floor(&self, tick: i64, timebase: u32) -> i64 {
        self.snap(tick, timebase, f64::floor)
    }

    pub fn ceil(&self, tick: i64, timebase: u32) -> i64 {
        self.snap(tick, timebase, f64::ceil)
    }
}

/// Quantizer of one editor, snapping against the song's timebase.
#[derive(Clone)]
pub struct QuantizerStore {
    song: Observable<Song>,
    settings: Observable<QuantizerSettings>,
}

impl QuantizerStore {
    pub fn new(store: &Store, song: &Observable<Song>, denominator: u32) -> Self {
        Self {
            song: song.clone(),
            settings: store.observable(QuantizerSettings {
                denominator: denominator.max(1),
                enabled: true,
            }),
        }
    }

    pub fn settings(&self) -> QuantizerSettings {
        self.settings.get()
    }

    pub fn set_settings(&self, settings: QuantizerSettings) {
        self.settings.set(QuantizerSettings {
            denominator: settings.denominator.max(1),
            ..settings
        });
    }

    pub fn denominator(&self) -> u32 {
        self.settings.with(|s| s.denominator)
    }

    pub fn set_denominator(&self, denominator: u32) {
        self.set_settings(QuantizerSettings {
            denominator,
            ..self.settings()
        });
    }

    pub fn is_enabled(&self) -> bool {
        self.settings.with(|s| s.enabled)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.set_settings(QuantizerSettings {
            enabled,
            ..self.settings()
        });
    }

    pub fn unit(&self) -> i64 {
        let timebase = self.timebase();
        self.settings.with(|s| s.unit(timebase))
    }

    pub fn round(&self, tick: i64) -> i64 {
        let timebase = self.timebase();
        self.settings.with(|s| s.round(tick, timebase))
    }

    pub fn floor(&self, tick: i64) -> i64 {
        let timebase = self.timebase();
        self.settings.with(|s| s.floor(tick, timebase))
    }

    pub fn ceil(&self, tick: i64) -> i64 {
        let timebase = self.timebase();
        self.settings.with(|s| s.ceil(tick, timebase))
    }

    fn timebase(&self) -> u32 {
        self.song.with(|song| song.timebase)
    }
}
