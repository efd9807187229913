//! Configuration module for loading TOML settings files.
//!
//! [`Settings`] is process-wide: where templates and transient audio live,
//! which engine voices back each speaker and the base sound-effect setup.
//! Per-request data (organization, speakers, content) lives in
//! [`crate::generation::PodcastRequest`].

use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::PodcastError;
use crate::section::Voice;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub paths: PathsConfig,
    pub voices: VoicesConfig,
    pub effects: EffectsConfig,
    pub weather: WeatherConfig,
}

/// Directories used by the pipeline.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory holding `intros.json`, `outros.json`, `gimmicks.json` and `transitions.json`.
    pub templates_dir: PathBuf,
    /// Pre-rendered section audio consumed in replay mode.
    pub placeholder_dir: PathBuf,
    /// Where live synthesis writes per-section audio.
    pub transient_dir: PathBuf,
    pub exports_dir: PathBuf,
    /// Target directory of the file-share publication backend.
    pub share_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            templates_dir: PathBuf::from("templates"),
            placeholder_dir: PathBuf::from("placeholder"),
            transient_dir: PathBuf::from("placeholder"),
            exports_dir: PathBuf::from("exports"),
            share_dir: PathBuf::from("share"),
        }
    }
}

/// Engine voice IDs backing each speaker.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VoicesConfig {
    pub male: String,
    pub female: String,
}

impl Default for VoicesConfig {
    fn default() -> Self {
        Self {
            male: "am_adam".to_string(),
            female: "af_sky".to_string(),
        }
    }
}

impl VoicesConfig {
    /// Get the engine voice ID for a speaker.
    pub fn voice_id(&self, voice: Voice) -> &str {
        match voice {
            Voice::Male => &self.male,
            Voice::Female => &self.female,
        }
    }
}

/// Sound-effect configuration consumed by the mixer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectsConfig {
    /// Sound played after sections flagged with `has_transition`.
    pub transition_sound: Option<PathBuf>,
    /// Silence inserted instead when no transition sound is configured.
    pub transition_pause_ms: u32,
    /// Background bed looped under news sections.
    pub news_bed: Option<PathBuf>,
    pub bed_gain: f32,
    pub intro_jingle: Option<PathBuf>,
    pub outro_jingle: Option<PathBuf>,
}

impl Default for EffectsConfig {
    fn default() -> Self {
        Self {
            transition_sound: None,
            transition_pause_ms: 600,
            news_bed: None,
            bed_gain: 0.15,
            intro_jingle: None,
            outro_jingle: None,
        }
    }
}

/// Per-request overrides of [`EffectsConfig`]. Unset fields keep the base value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectsOverride {
    pub transition_sound: Option<PathBuf>,
    pub transition_pause_ms: Option<u32>,
    pub news_bed: Option<PathBuf>,
    pub bed_gain: Option<f32>,
    pub intro_jingle: Option<PathBuf>,
    pub outro_jingle: Option<PathBuf>,
}

impl EffectsConfig {
    /// Apply request overrides field by field.
    pub fn merged(&self, over: &EffectsOverride) -> EffectsConfig {
        EffectsConfig {
            transition_sound: over
                .transition_sound
                .clone()
                .or_else(|| self.transition_sound.clone()),
            transition_pause_ms: over.transition_pause_ms.unwrap_or(self.transition_pause_ms),
            news_bed: over.news_bed.clone().or_else(|| self.news_bed.clone()),
            bed_gain: over.bed_gain.unwrap_or(self.bed_gain),
            intro_jingle: over.intro_jingle.clone().or_else(|| self.intro_jingle.clone()),
            outro_jingle: over.outro_jingle.clone().or_else(|| self.outro_jingle.clone()),
        }
    }
}

/// Weather provider settings. The API key comes from the environment.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub api_base: String,
    pub units: String,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.openweathermap.org".to_string(),
            units: "metric".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PodcastError> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| PodcastError::Config(format!("Failed to read settings: {}", e)))?;

        Self::from_str(&content)
    }

    /// Load settings from string content.
    pub fn from_str(content: &str) -> Result<Self, PodcastError> {
        toml::from_str(content)
            .map_err(|e| PodcastError::Config(format!("Failed to parse settings: {}", e)))
    }
}

/// Podcast language. Selects template pools and calendar names.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Es,
    Ca,
    En,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::Es => "es",
            Language::Ca => "ca",
            Language::En => "en",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_lowercase().as_str() {
            "es" => Some(Language::Es),
            "ca" => Some(Language::Ca),
            "en" => Some(Language::En),
            _ => None,
        }
    }

    pub fn weekday_name(&self, day: Weekday) -> &'static str {
        let idx = day.num_days_from_monday() as usize;
        match self {
            Language::Es => [
                "lunes", "martes", "miércoles", "jueves", "viernes", "sábado", "domingo",
            ][idx],
            Language::Ca => [
                "dilluns", "dimarts", "dimecres", "dijous", "divendres", "dissabte", "diumenge",
            ][idx],
            Language::En => [
                "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday",
            ][idx],
        }
    }

    /// Month name for a 1-based month number.
    pub fn month_name(&self, month: u32) -> &'static str {
        let idx = (month.clamp(1, 12) - 1) as usize;
        match self {
            Language::Es => [
                "enero", "febrero", "marzo", "abril", "mayo", "junio", "julio", "agosto",
                "septiembre", "octubre", "noviembre", "diciembre",
            ][idx],
            Language::Ca => [
                "gener", "febrer", "març", "abril", "maig", "juny", "juliol", "agost",
                "setembre", "octubre", "novembre", "desembre",
            ][idx],
            Language::En => [
                "January", "February", "March", "April", "May", "June", "July", "August",
                "September", "October", "November", "December",
            ][idx],
        }
    }
}

/// Display names of the two speakers, used in spoken handoffs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpeakerNames {
    pub male: String,
    pub female: String,
}

impl Default for SpeakerNames {
    fn default() -> Self {
        Self {
            male: "Alberto".to_string(),
            female: "Mónica".to_string(),
        }
    }
}

impl SpeakerNames {
    pub fn name(&self, voice: Voice) -> &str {
        match voice {
            Voice::Male => &self.male,
            Voice::Female => &self.female,
        }
    }
}

/// Default settings embedded in the binary.
pub fn default_settings() -> Settings {
    Settings::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_from_partial_toml() {
        let settings = Settings::from_str(
            r#"
            [paths]
            templates_dir = "/srv/templates"

            [voices]
            male = "bm_george"

            [effects]
            transition_pause_ms = 250
            "#,
        )
        .unwrap();

        assert_eq!(settings.paths.templates_dir, PathBuf::from("/srv/templates"));
        assert_eq!(settings.paths.exports_dir, PathBuf::from("exports"));
        assert_eq!(settings.voices.voice_id(Voice::Male), "bm_george");
        assert_eq!(settings.voices.voice_id(Voice::Female), "af_sky");
        assert_eq!(settings.effects.transition_pause_ms, 250);
    }

    #[test]
    fn test_settings_invalid_toml() {
        let err = Settings::from_str("paths = 3").unwrap_err();
        assert!(matches!(err, PodcastError::Config(_)));
    }

    #[test]
    fn test_effects_override_merge() {
        let base = EffectsConfig {
            news_bed: Some(PathBuf::from("bed.wav")),
            ..EffectsConfig::default()
        };
        let over = EffectsOverride {
            transition_pause_ms: Some(100),
            intro_jingle: Some(PathBuf::from("jingle.wav")),
            ..EffectsOverride::default()
        };

        let merged = base.merged(&over);
        assert_eq!(merged.transition_pause_ms, 100);
        assert_eq!(merged.news_bed, Some(PathBuf::from("bed.wav")));
        assert_eq!(merged.intro_jingle, Some(PathBuf::from("jingle.wav")));
        assert_eq!(merged.bed_gain, base.bed_gain);
    }

    #[test]
    fn test_calendar_names() {
        assert_eq!(Language::Es.weekday_name(Weekday::Wed), "miércoles");
        assert_eq!(Language::Ca.month_name(3), "març");
        assert_eq!(Language::En.month_name(12), "December");
    }

    #[test]
    fn test_speaker_names() {
        let speakers = SpeakerNames::default();
        assert_eq!(speakers.name(Voice::Female), "Mónica");
    }
}
