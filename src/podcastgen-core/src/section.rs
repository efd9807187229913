//! Script sections and speaker voices.
//!
//! A [`Section`] is one spoken unit of the episode. Sections are produced by
//! template selection or content ingestion, ordered by the sequencer and then
//! rendered to audio one at a time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Speaker persona used for synthesis.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Voice {
    Male,
    Female,
}

impl Voice {
    /// The other speaker.
    pub fn opposite(self) -> Self {
        match self {
            Voice::Male => Voice::Female,
            Voice::Female => Voice::Male,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Voice::Male => "male",
            Voice::Female => "female",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "male" => Some(Voice::Male),
            "female" => Some(Voice::Female),
            _ => None,
        }
    }
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structural role of a section in the script.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SectionKind {
    Intro,
    NewsTitle,
    NewsBody,
    Transition,
    Gimmick,
    Outro,
    /// A single fragment rendered outside full episode assembly.
    Preview,
}

impl SectionKind {
    pub fn display_name(&self) -> &str {
        match self {
            SectionKind::Intro => "Intro",
            SectionKind::NewsTitle => "NewsTitle",
            SectionKind::NewsBody => "NewsBody",
            SectionKind::Transition => "Transition",
            SectionKind::Gimmick => "Gimmick",
            SectionKind::Outro => "Outro",
            SectionKind::Preview => "Preview",
        }
    }
}

/// Container format of rendered and exported audio.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Wav,
    Mp3,
}

impl AudioFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
            AudioFormat::Mp3 => "mp3",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "wav" => Some(AudioFormat::Wav),
            "mp3" => Some(AudioFormat::Mp3),
            _ => None,
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Reference to rendered audio for a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioHandle(PathBuf);

impl AudioHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

/// One spoken unit of the podcast script.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Section {
    pub kind: SectionKind,
    /// Spoken text. May still be edited until the section is synthesized.
    pub text: String,
    pub voice: Voice,
    /// Whether the mixer inserts a connective effect after this section.
    pub has_transition: bool,
    /// Whether the mixer applies news-body treatment (background bed).
    pub is_news: bool,
    /// Previously rendered audio. `None` means synthesis is required.
    pub audio: Option<AudioHandle>,
}

impl Section {
    /// Create a section with the default flags for its kind.
    pub fn new(kind: SectionKind, text: impl Into<String>, voice: Voice) -> Self {
        let is_news = matches!(kind, SectionKind::NewsTitle | SectionKind::NewsBody);
        Self {
            kind,
            text: text.into(),
            voice,
            has_transition: is_news,
            is_news,
            audio: None,
        }
    }

    pub fn intro(text: impl Into<String>, voice: Voice) -> Self {
        Self::new(SectionKind::Intro, text, voice)
    }

    pub fn outro(text: impl Into<String>, voice: Voice) -> Self {
        Self::new(SectionKind::Outro, text, voice)
    }

    pub fn gimmick(text: impl Into<String>, voice: Voice) -> Self {
        Self::new(SectionKind::Gimmick, text, voice)
    }

    pub fn transition(text: impl Into<String>, voice: Voice) -> Self {
        Self::new(SectionKind::Transition, text, voice)
    }

    pub fn news_title(text: impl Into<String>, voice: Voice) -> Self {
        Self::new(SectionKind::NewsTitle, text, voice)
    }

    pub fn news_body(text: impl Into<String>, voice: Voice) -> Self {
        Self::new(SectionKind::NewsBody, text, voice)
    }

    /// Attach already rendered audio.
    pub fn with_audio(mut self, audio: AudioHandle) -> Self {
        self.audio = Some(audio);
        self
    }

    pub fn is_transition(&self) -> bool {
        self.kind == SectionKind::Transition
    }

    pub fn needs_synthesis(&self) -> bool {
        self.audio.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voice_opposite() {
        assert_eq!(Voice::Male.opposite(), Voice::Female);
        assert_eq!(Voice::Female.opposite(), Voice::Male);
    }

    #[test]
    fn test_voice_from_name() {
        assert_eq!(Voice::from_name("Female"), Some(Voice::Female));
        assert_eq!(Voice::from_name("robot"), None);
    }

    #[test]
    fn test_news_sections_default_flags() {
        let title = Section::news_title("Headline", Voice::Male);
        assert!(title.is_news);
        assert!(title.has_transition);

        let intro = Section::intro("Hello", Voice::Female);
        assert!(!intro.is_news);
        assert!(!intro.has_transition);
        assert!(intro.needs_synthesis());
    }

    #[test]
    fn test_voice_serde_lowercase() {
        let json = serde_json::to_string(&Voice::Female).unwrap();
        assert_eq!(json, "\"female\"");
    }
}
