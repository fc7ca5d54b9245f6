//! Persistent application settings (JSON file in app data directory).

use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use morsecast_core::{Mode, OverflowPolicy, PlayerConfig, ToneConfig};
use serde::{Deserialize, Serialize};

/// Playback speed range offered to users.
pub const MIN_WPM: u32 = 5;
pub const MAX_WPM: u32 = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct AppSettings {
    pub wpm: u32,
    pub mode: Mode,
    pub queue_capacity: usize,
    pub overflow_policy: OverflowPolicy,
    pub tone_frequency_hz: f32,
    pub volume: f32,
    pub output_device: Option<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        let player = PlayerConfig::default();
        let tone = ToneConfig::default();
        Self {
            wpm: player.wpm,
            mode: player.mode,
            queue_capacity: player.queue_capacity,
            overflow_policy: player.overflow_policy,
            tone_frequency_hz: tone.frequency_hz,
            volume: tone.volume,
            output_device: None,
        }
    }
}

impl AppSettings {
    pub fn normalize(&mut self) {
        self.wpm = clamp_wpm(self.wpm);
        self.queue_capacity = self.queue_capacity.clamp(1, 10_000);
        self.tone_frequency_hz = if self.tone_frequency_hz.is_finite() {
            self.tone_frequency_hz.clamp(200.0, 2_000.0)
        } else {
            ToneConfig::default().frequency_hz
        };
        self.volume = if self.volume.is_finite() {
            self.volume.clamp(0.0, 1.0)
        } else {
            ToneConfig::default().volume
        };
        self.output_device = self
            .output_device
            .as_ref()
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
    }

    /// Layer command-line / environment values over the loaded file.
    pub fn apply_overrides(&mut self, overrides: &SettingsOverrides) {
        if let Some(wpm) = overrides.wpm {
            self.wpm = wpm;
        }
        if let Some(mode) = overrides.mode {
            self.mode = mode;
        }
        if let Some(device) = &overrides.output_device {
            self.output_device = Some(device.clone());
        }
        self.normalize();
    }

    pub fn player_config(&self) -> PlayerConfig {
        PlayerConfig {
            mode: self.mode,
            wpm: self.wpm,
            queue_capacity: self.queue_capacity,
            overflow_policy: self.overflow_policy,
        }
    }

    pub fn tone_config(&self) -> ToneConfig {
        ToneConfig {
            frequency_hz: self.tone_frequency_hz,
            volume: self.volume,
            output_device: self.output_device.clone(),
        }
    }
}

/// Settings that can be overridden per run, by flag or `MORSECAST_*` variable.
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct SettingsOverrides {
    /// Playback speed in words per minute (clamped to 5..=30)
    #[arg(long, env = "MORSECAST_WPM")]
    pub wpm: Option<u32>,

    /// Encoding mode: "word" spells every letter, "char" plays one symbol per word
    #[arg(long, env = "MORSECAST_MODE", value_parser = mode_arg)]
    pub mode: Option<Mode>,

    /// Preferred output device name
    #[arg(long, env = "MORSECAST_OUTPUT_DEVICE")]
    pub output_device: Option<String>,
}

fn mode_arg(raw: &str) -> Result<Mode, String> {
    parse_mode(raw).ok_or_else(|| format!("expected 'word' or 'char', got '{raw}'"))
}

pub fn clamp_wpm(wpm: u32) -> u32 {
    wpm.clamp(MIN_WPM, MAX_WPM)
}

pub fn parse_mode(raw: &str) -> Option<Mode> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "word" | "w" => Some(Mode::Word),
        "char" | "character" | "c" => Some(Mode::Character),
        _ => None,
    }
}

pub fn default_settings_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("Lattice Labs")
            .join("Morsecast")
            .join("settings.json")
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                std::env::var_os("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("/tmp"))
                    .join(".local")
                    .join("share")
            })
            .join("morsecast")
            .join("settings.json")
    }
}

/// Missing or malformed files yield defaults.
pub fn load_settings(path: &Path) -> AppSettings {
    let mut settings = fs::read_to_string(path)
        .ok()
        .and_then(|raw| serde_json::from_str::<AppSettings>(&raw).ok())
        .unwrap_or_default();
    settings.normalize();
    settings
}

pub fn save_settings(path: &Path, settings: &AppSettings) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings).map_err(std::io::Error::other)?;
    fs::write(path, json)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_settings_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("morsecast-settings-{}-{name}", std::process::id()))
            .join("settings.json")
    }

    #[test]
    fn defaults_match_player_defaults() {
        let settings = AppSettings::default();
        assert_eq!(settings.wpm, 20);
        assert_eq!(settings.mode, Mode::Word);
        assert_eq!(settings.queue_capacity, 130);
        assert_eq!(settings.tone_frequency_hz, 800.0);
        assert_eq!(settings.volume, 0.8);
    }

    #[test]
    fn normalize_clamps_ranges() {
        let mut settings = AppSettings {
            wpm: 90,
            queue_capacity: 0,
            tone_frequency_hz: f32::NAN,
            volume: 4.0,
            output_device: Some("   ".into()),
            ..AppSettings::default()
        };
        settings.normalize();
        assert_eq!(settings.wpm, MAX_WPM);
        assert_eq!(settings.queue_capacity, 1);
        assert_eq!(settings.tone_frequency_hz, 800.0);
        assert_eq!(settings.volume, 1.0);
        assert_eq!(settings.output_device, None);

        settings.wpm = 1;
        settings.normalize();
        assert_eq!(settings.wpm, MIN_WPM);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let settings: AppSettings =
            serde_json::from_str(r#"{"wpm": 12, "mode": "character"}"#).expect("parse");
        assert_eq!(settings.wpm, 12);
        assert_eq!(settings.mode, Mode::Character);
        assert_eq!(settings.queue_capacity, 130);
        assert_eq!(settings.overflow_policy, OverflowPolicy::OverwriteOldest);
    }

    #[test]
    fn overrides_take_precedence_and_are_normalized() {
        let mut settings = AppSettings::default();
        settings.apply_overrides(&SettingsOverrides {
            wpm: Some(99),
            mode: Some(Mode::Character),
            output_device: Some(" USB Speaker ".into()),
        });
        assert_eq!(settings.wpm, MAX_WPM);
        assert_eq!(settings.mode, Mode::Character);
        assert_eq!(settings.output_device.as_deref(), Some("USB Speaker"));
    }

    #[test]
    fn empty_overrides_keep_file_values() {
        let mut settings = AppSettings {
            wpm: 12,
            output_device: Some("Headphones".into()),
            ..AppSettings::default()
        };
        let loaded = settings.clone();
        settings.apply_overrides(&SettingsOverrides::default());
        assert_eq!(settings, loaded);
    }

    #[test]
    fn mode_flag_value_is_validated() {
        assert_eq!(mode_arg("char"), Ok(Mode::Character));
        assert!(mode_arg("semaphore").is_err());
    }

    #[test]
    fn save_then_load_preserves_values() {
        let path = temp_settings_path("persist");
        let settings = AppSettings {
            wpm: 15,
            mode: Mode::Character,
            overflow_policy: OverflowPolicy::RejectNewest,
            output_device: Some("Headphones".into()),
            ..AppSettings::default()
        };
        save_settings(&path, &settings).expect("save");
        assert_eq!(load_settings(&path), settings);

        if let Some(dir) = path.parent() {
            let _ = fs::remove_dir_all(dir);
        }
    }

    #[test]
    fn missing_file_loads_defaults() {
        let path = temp_settings_path("missing");
        assert_eq!(load_settings(&path), AppSettings::default());
    }

    #[test]
    fn mode_names_parse() {
        assert_eq!(parse_mode("Word"), Some(Mode::Word));
        assert_eq!(parse_mode(" c "), Some(Mode::Character));
        assert_eq!(parse_mode("character"), Some(Mode::Character));
        assert_eq!(parse_mode("dots"), None);
    }
}
