//! Content configuration normalization.
//!
//! Callers describe an episode either as an ordered list of typed entries or
//! as a mapping from type tag to entry. Both shapes are converted here into
//! one [`NormalizedContent`]: an immutable [`DirectiveSet`] for the structural
//! slots and the residual content items handed to ingestion.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::PodcastError;
use crate::section::{Section, Voice};

/// Content configuration as supplied by the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ContentConfig {
    List(Vec<Value>),
    /// Keyed by type tag; the key becomes the entry's `type`.
    Map(Map<String, Value>),
}

/// One typed entry of the content configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ContentEntry {
    #[serde(alias = "intro")]
    Intro {
        speaker: Option<Voice>,
        text: Option<String>,
        location: Option<String>,
    },
    #[serde(alias = "outro")]
    Outro {
        speaker: Option<Voice>,
        text: Option<String>,
    },
    #[serde(rename = "gimmick", alias = "Gimmick")]
    Gimmick {
        speaker: Option<Voice>,
        text: Option<String>,
    },
    #[serde(rename = "news", alias = "News")]
    News {
        title: String,
        body: String,
        speaker: Option<Voice>,
        url: Option<String>,
        source: Option<String>,
    },
    #[serde(rename = "transition", alias = "Transition")]
    Transition {
        text: String,
        speaker: Option<Voice>,
    },
    #[serde(rename = "text", alias = "Text")]
    Text {
        text: String,
        speaker: Option<Voice>,
    },
}

/// Residual content after directives are extracted.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentItem {
    News {
        title: String,
        body: String,
        voice: Option<Voice>,
        url: Option<String>,
        source: Option<String>,
    },
    Transition {
        text: String,
        voice: Option<Voice>,
    },
    Text {
        text: String,
        voice: Option<Voice>,
    },
}

/// Caller override for a structural slot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Directive {
    pub voice: Option<Voice>,
    pub text: Option<String>,
}

impl Directive {
    fn new(voice: Option<Voice>, text: Option<String>) -> Self {
        Self {
            voice,
            text: text.filter(|t| !t.trim().is_empty()),
        }
    }

    /// Override the section's voice and text where set.
    pub fn apply(&self, section: &mut Section) {
        if let Some(voice) = self.voice {
            section.voice = voice;
        }
        if let Some(ref text) = self.text {
            section.text = text.clone();
        }
    }
}

/// Directives for the structural slots of one episode.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirectiveSet {
    pub intro: Option<Directive>,
    pub outro: Option<Directive>,
    pub gimmick: Option<Directive>,
    /// Whether the configuration declared a gimmick slot.
    pub has_gimmick: bool,
    /// City named on the intro entry, used for the weather forecast.
    pub location: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedContent {
    pub directives: DirectiveSet,
    pub items: Vec<ContentItem>,
}

impl ContentConfig {
    /// Parse into typed entries, preserving order.
    pub fn entries(&self) -> Result<Vec<ContentEntry>, PodcastError> {
        match self {
            ContentConfig::List(values) => values
                .iter()
                .enumerate()
                .map(|(i, value)| {
                    serde_json::from_value(value.clone()).map_err(|e| {
                        PodcastError::Config(format!("Invalid content entry {}: {}", i, e))
                    })
                })
                .collect(),
            ContentConfig::Map(map) => map
                .iter()
                .map(|(tag, value)| {
                    let mut fields = match value {
                        Value::Object(fields) => fields.clone(),
                        Value::Null => Map::new(),
                        other => {
                            return Err(PodcastError::Config(format!(
                                "Content entry '{}' must be an object, got {}",
                                tag, other
                            )));
                        }
                    };
                    fields.insert("type".to_string(), Value::String(tag.clone()));
                    serde_json::from_value(Value::Object(fields)).map_err(|e| {
                        PodcastError::Config(format!("Invalid content entry '{}': {}", tag, e))
                    })
                })
                .collect(),
        }
    }

    /// Split the configuration into directives and residual content.
    pub fn normalize(&self) -> Result<NormalizedContent, PodcastError> {
        normalize_entries(self.entries()?)
    }
}

/// Two-phase split: collect every directive first, then keep the rest in order.
pub fn normalize_entries(entries: Vec<ContentEntry>) -> Result<NormalizedContent, PodcastError> {
    let mut directives = DirectiveSet::default();
    let mut items = Vec::with_capacity(entries.len());

    for entry in entries {
        match entry {
            ContentEntry::Intro {
                speaker,
                text,
                location,
            } => {
                if directives.intro.is_some() {
                    warn!("Ignoring duplicate Intro entry in content configuration");
                    continue;
                }
                directives.intro = Some(Directive::new(speaker, text));
                directives.location = location.filter(|l| !l.trim().is_empty());
            }
            ContentEntry::Outro { speaker, text } => {
                if directives.outro.is_some() {
                    warn!("Ignoring duplicate Outro entry in content configuration");
                    continue;
                }
                directives.outro = Some(Directive::new(speaker, text));
            }
            ContentEntry::Gimmick { speaker, text } => {
                directives.has_gimmick = true;
                if directives.gimmick.is_none() {
                    directives.gimmick = Some(Directive::new(speaker, text));
                }
            }
            ContentEntry::News {
                title,
                body,
                speaker,
                url,
                source,
            } => items.push(ContentItem::News {
                title,
                body,
                voice: speaker,
                url,
                source,
            }),
            ContentEntry::Transition { text, speaker } => {
                items.push(ContentItem::Transition {
                    text,
                    voice: speaker,
                })
            }
            ContentEntry::Text { text, speaker } => items.push(ContentItem::Text {
                text,
                voice: speaker,
            }),
        }
    }

    Ok(NormalizedContent { directives, items })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::section::SectionKind;
    use serde_json::json;

    fn parse(value: Value) -> ContentConfig {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_list_shape() {
        let config = parse(json!([
            {"type": "Intro", "speaker": "female", "location": "Barcelona"},
            {"type": "news", "title": "T1", "body": "B1", "speaker": "male"},
            {"type": "gimmick"},
            {"type": "transition", "text": "Meanwhile"},
            {"type": "news", "title": "T2", "body": "B2"},
            {"type": "Outro", "text": "Goodbye!"}
        ]));

        let normalized = config.normalize().unwrap();
        let d = &normalized.directives;
        assert_eq!(d.intro.as_ref().unwrap().voice, Some(Voice::Female));
        assert_eq!(d.intro.as_ref().unwrap().text, None);
        assert_eq!(d.location.as_deref(), Some("Barcelona"));
        assert_eq!(d.outro.as_ref().unwrap().text.as_deref(), Some("Goodbye!"));
        assert!(d.has_gimmick);

        assert_eq!(normalized.items.len(), 3);
        assert!(matches!(normalized.items[1], ContentItem::Transition { .. }));
    }

    #[test]
    fn test_map_shape() {
        let config = parse(json!({
            "Intro": {"speaker": "male", "text": "Welcome!"},
            "news": {"title": "Only", "body": "Story"},
            "Outro": null
        }));

        let normalized = config.normalize().unwrap();
        assert_eq!(
            normalized.directives.intro,
            Some(Directive {
                voice: Some(Voice::Male),
                text: Some("Welcome!".to_string()),
            })
        );
        assert_eq!(normalized.directives.outro, Some(Directive::default()));
        assert!(!normalized.directives.has_gimmick);
        assert_eq!(normalized.items.len(), 1);
    }

    #[test]
    fn test_map_shape_keeps_document_order() {
        // Sorted keys would yield news, text, transition.
        let config: ContentConfig = serde_json::from_str(
            r#"{
                "text": {"text": "Opening remarks", "speaker": "female"},
                "Intro": {"location": "Girona"},
                "transition": {"text": "Now the headlines"},
                "gimmick": null,
                "news": {"title": "Headline", "body": "Story"},
                "Outro": {"speaker": "male"}
            }"#,
        )
        .unwrap();

        let normalized = config.normalize().unwrap();
        assert_eq!(
            normalized.items,
            vec![
                ContentItem::Text {
                    text: "Opening remarks".to_string(),
                    voice: Some(Voice::Female),
                },
                ContentItem::Transition {
                    text: "Now the headlines".to_string(),
                    voice: None,
                },
                ContentItem::News {
                    title: "Headline".to_string(),
                    body: "Story".to_string(),
                    voice: None,
                    url: None,
                    source: None,
                },
            ]
        );
        assert_eq!(normalized.directives.location.as_deref(), Some("Girona"));
        assert!(normalized.directives.has_gimmick);
        assert_eq!(normalized.directives.outro.unwrap().voice, Some(Voice::Male));
    }

    #[test]
    fn test_unknown_type_is_config_error() {
        let config = parse(json!([{"type": "podcast"}]));
        assert!(matches!(config.normalize(), Err(PodcastError::Config(_))));
    }

    #[test]
    fn test_missing_type_is_config_error() {
        let config = parse(json!([{"title": "T", "body": "B"}]));
        assert!(matches!(config.normalize(), Err(PodcastError::Config(_))));
    }

    #[test]
    fn test_map_entry_must_be_object() {
        let config = parse(json!({"Intro": "hello"}));
        assert!(matches!(config.normalize(), Err(PodcastError::Config(_))));
    }

    #[test]
    fn test_scalar_is_not_a_content_config() {
        assert!(serde_json::from_value::<ContentConfig>(json!("news")).is_err());
    }

    #[test]
    fn test_directive_apply_keeps_defaults() {
        let mut section = Section::intro("Template text", Voice::Male);
        Directive::new(Some(Voice::Female), Some("  ".to_string())).apply(&mut section);
        assert_eq!(section.voice, Voice::Female);
        assert_eq!(section.text, "Template text");
        assert_eq!(section.kind, SectionKind::Intro);
    }
}
