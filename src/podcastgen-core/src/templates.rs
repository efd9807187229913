//! Template store.
//!
//! Template documents are JSON objects keyed by language code. Each podcast
//! instance loads the pools of one language; the store is read-only after that.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use crate::config::Language;
use crate::error::PodcastError;
use crate::section::Voice;

pub const INTROS_FILE: &str = "intros.json";
pub const OUTROS_FILE: &str = "outros.json";
pub const GIMMICKS_FILE: &str = "gimmicks.json";
pub const TRANSITIONS_FILE: &str = "transitions.json";

/// A reusable fragment with named placeholders such as `{weekday}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TemplateRecord {
    pub text: String,
    /// Default speaker. Transitions usually leave it unset.
    #[serde(default)]
    pub voice: Option<Voice>,
}

/// Intro pools: weather-conditioned by category, and weatherless.
#[derive(Debug, Clone, Deserialize)]
pub struct IntroPools {
    /// Keyed by weather category name, plus a `default` entry.
    pub weather_intros: BTreeMap<String, Vec<TemplateRecord>>,
    pub no_weather_intros: Vec<TemplateRecord>,
}

/// The four transition pools used by the sequencer.
#[derive(Debug, Clone, Deserialize)]
pub struct TransitionPools {
    pub intro_to_content: Vec<TemplateRecord>,
    pub content_intro_to_content_info: Vec<TemplateRecord>,
    pub to_last_content: Vec<TemplateRecord>,
    pub to_outro: Vec<TemplateRecord>,
}

/// All template pools for one language.
#[derive(Debug, Clone)]
pub struct TemplateStore {
    pub language: Language,
    pub intros: IntroPools,
    pub outros: Vec<TemplateRecord>,
    pub gimmicks: Vec<TemplateRecord>,
    pub transitions: TransitionPools,
}

impl TemplateStore {
    /// Load the four template documents from a directory.
    pub fn load<P: AsRef<Path>>(dir: P, language: Language) -> Result<Self, PodcastError> {
        let dir = dir.as_ref();
        let read = |file: &str| {
            fs::read_to_string(dir.join(file)).map_err(|e| {
                PodcastError::Template(format!(
                    "Failed to read {}: {}",
                    dir.join(file).display(),
                    e
                ))
            })
        };

        Self::from_documents(
            &read(INTROS_FILE)?,
            &read(OUTROS_FILE)?,
            &read(GIMMICKS_FILE)?,
            &read(TRANSITIONS_FILE)?,
            language,
        )
    }

    /// Build a store from the raw JSON of each document.
    pub fn from_documents(
        intros: &str,
        outros: &str,
        gimmicks: &str,
        transitions: &str,
        language: Language,
    ) -> Result<Self, PodcastError> {
        Ok(Self {
            language,
            intros: language_section(intros, INTROS_FILE, language)?,
            outros: language_section(outros, OUTROS_FILE, language)?,
            gimmicks: language_section(gimmicks, GIMMICKS_FILE, language)?,
            transitions: language_section(transitions, TRANSITIONS_FILE, language)?,
        })
    }

    /// Weather intro pool for a category, falling back to `default`.
    pub fn weather_intros(&self, category: &str) -> Option<&[TemplateRecord]> {
        self.intros
            .weather_intros
            .get(category)
            .or_else(|| self.intros.weather_intros.get("default"))
            .map(Vec::as_slice)
    }
}

/// Parse a language-keyed document and extract one language.
fn language_section<T: DeserializeOwned>(
    content: &str,
    document: &str,
    language: Language,
) -> Result<T, PodcastError> {
    let mut by_language: HashMap<String, T> = serde_json::from_str(content)
        .map_err(|e| PodcastError::Template(format!("Failed to parse {}: {}", document, e)))?;

    by_language.remove(language.code()).ok_or_else(|| {
        PodcastError::Template(format!(
            "{} has no templates for language '{}'",
            document,
            language.code()
        ))
    })
}
