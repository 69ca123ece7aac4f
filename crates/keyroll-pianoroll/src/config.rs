use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::EditorResult;

/// Allowed range and starting value of a zoom factor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleLimits {
    pub min: f64,
    pub max: f64,
    pub initial: f64,
}

impl ScaleLimits {
    pub fn clamp(&self, scale: f64) -> f64 {
        if !scale.is_finite() {
            return self.initial.clamp(self.min, self.max);
        }
        scale.clamp(self.min, self.max)
    }
}

/// Persisted editor layout and behaviour settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Number of rows on the key axis.
    pub number_of_keys: u8,
    /// Key height in pixels at a vertical scale of 1.
    pub key_height: f64,
    /// Width of the piano keyboard column.
    pub key_width: f64,
    /// Black key width as a fraction of `key_width`.
    pub black_key_width_ratio: f64,
    /// Width of the drum name column shown for rhythm tracks.
    pub drum_keys_width: f64,
    /// Pixels per tick at a horizontal scale of 1.
    pub base_pixels_per_tick: f64,
    pub scale_x: ScaleLimits,
    pub scale_y: ScaleLimits,
    pub min_note_width: f64,
    /// Beats of empty space kept after the end of the song.
    pub appendix_beats: u32,
    pub auto_scroll: bool,
    pub new_note_velocity: u8,
    pub history_capacity: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            number_of_keys: 128,
            key_height: 12.0,
            key_width: 64.0,
            black_key_width_ratio: 0.64,
            drum_keys_width: 64.0,
            base_pixels_per_tick: 0.1,
            scale_x: ScaleLimits {
                min: 0.15,
                max: 15.0,
                initial: 1.0,
            },
            scale_y: ScaleLimits {
                min: 0.5,
                max: 4.0,
                initial: 1.0,
            },
            min_note_width: 2.0,
            appendix_beats: 16,
            auto_scroll: true,
            new_note_velocity: 100,
            history_capacity: 200,
        }
    }
}

impl EditorConfig {
    pub fn black_key_width(&self) -> f64 {
        self.key_width * self.black_key_width_ratio
    }

    /// Reads a configuration file.
    pub fn load_from(path: &Path) -> EditorResult<Self> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn save_to(&self, path: &Path) -> EditorResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

fn config_path() -> Option<PathBuf> {
    let mut base = dirs::config_dir()?;
    base.push("Keyroll");
    base.push("editor.json");
    Some(base)
}

/// Load the user configuration. Returns defaults if loading fails.
pub fn load() -> EditorConfig {
    let Some(path) = config_path() else {
        return EditorConfig::default();
    };
    if !path.exists() {
        return EditorConfig::default();
    }
    match EditorConfig::load_from(&path) {
        Ok(config) => {
            debug!(path = %path.display(), "loaded editor config");
            config
        }
        Err(err) => {
            warn!(%err, path = %path.display(), "failed to read editor config, using defaults");
            EditorConfig::default()
        }
    }
}

/// Save the user configuration.
pub fn save(config: &EditorConfig) {
    let Some(path) = config_path() else {
        return;
    };
    if let Err(err) = config.save_to(&path) {
        warn!(%err, "failed to write editor config");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("keyroll-config-{}-{name}", std::process::id()))
            .join("editor.json")
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: EditorConfig = serde_json::from_str(r#"{ "key_height": 10.0 }"#).unwrap();
        assert_eq!(config.key_height, 10.0);
        assert_eq!(config.number_of_keys, 128);
        assert_eq!(config.scale_x, EditorConfig::default().scale_x);
    }

    #[test]
    fn save_then_load_from_disk() {
        let path = temp_path("roundtrip");
        let config = EditorConfig {
            number_of_keys: 88,
            auto_scroll: false,
            ..EditorConfig::default()
        };
        config.save_to(&path).unwrap();
        let loaded = EditorConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn load_from_reports_malformed_files() {
        let path = temp_path("malformed");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{ not json").unwrap();
        assert!(EditorConfig::load_from(&path).is_err());
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn scale_limits_clamp_non_finite_values() {
        let limits = EditorConfig::default().scale_x;
        assert_eq!(limits.clamp(100.0), 15.0);
        assert_eq!(limits.clamp(0.0), 0.15);
        assert_eq!(limits.clamp(f64::NAN), 1.0);
    }
}
