//! Content ingestion.
//!
//! Turns residual content items into ordered script sections. Scraping
//! sources plug in behind [`ContentSource`]; [`InlineContentSource`] uses the
//! text supplied directly in the request.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::config::Language;
use crate::content::ContentItem;
use crate::error::PodcastError;
use crate::section::{Section, SectionKind, Voice};

/// Source URLs grouped by origin.
pub type SourceUrls = BTreeMap<String, Vec<String>>;

/// Location hint passed to sources that localize content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct GeoMetadata {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn ingest(
        &self,
        items: &[ContentItem],
        geo: GeoMetadata,
        language: Language,
    ) -> Result<(Vec<Section>, SourceUrls), PodcastError>;
}

/// Origin label for news without an explicit source.
pub const INLINE_ORIGIN: &str = "inline";

/// Builds sections from content written into the request.
///
/// News without a speaker alternate voices item by item, starting with the
/// male voice. Transitions and text blocks without a speaker switch to the
/// opposite of the previous section's voice.
#[derive(Debug, Clone, Default)]
pub struct InlineContentSource;

#[async_trait]
impl ContentSource for InlineContentSource {
    async fn ingest(
        &self,
        items: &[ContentItem],
        _geo: GeoMetadata,
        _language: Language,
    ) -> Result<(Vec<Section>, SourceUrls), PodcastError> {
        let mut sections: Vec<Section> = Vec::with_capacity(items.len() * 2);
        let mut urls = SourceUrls::new();
        let mut next_news_voice = Voice::Male;

        for item in items {
            let previous = sections.last().map(|s| s.voice);
            match item {
                ContentItem::News {
                    title,
                    body,
                    voice,
                    url,
                    source,
                } => {
                    if title.trim().is_empty() || body.trim().is_empty() {
                        return Err(PodcastError::Ingestion(
                            "News entries need both a title and a body".to_string(),
                        ));
                    }
                    let voice = voice.unwrap_or(next_news_voice);
                    next_news_voice = voice.opposite();
                    sections.push(Section::news_title(title.clone(), voice));
                    sections.push(Section::news_body(body.clone(), voice));

                    if let Some(url) = url {
                        let origin = source.clone().unwrap_or_else(|| INLINE_ORIGIN.to_string());
                        urls.entry(origin).or_default().push(url.clone());
                    }
                }
                ContentItem::Transition { text, voice } => {
                    let voice = voice
                        .or_else(|| previous.map(Voice::opposite))
                        .unwrap_or(Voice::Male);
                    sections.push(Section::transition(text.clone(), voice));
                }
                ContentItem::Text { text, voice } => {
                    let voice = voice
                        .or_else(|| previous.map(Voice::opposite))
                        .unwrap_or(Voice::Male);
                    sections.push(Section::new(SectionKind::NewsBody, text.clone(), voice));
                }
            }
        }

        Ok((sections, urls))
    }
}
