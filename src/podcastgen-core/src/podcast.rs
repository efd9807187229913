//! Script planning for one podcast episode.
//!
//! A [`Podcast`] owns the normalized request: the directives for the
//! structural slots and the residual content. [`Podcast::plan`] turns it into
//! the ordered script that synthesis will render.

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::config::{Language, SpeakerNames};
use crate::content::{ContentItem, DirectiveSet, NormalizedContent};
use crate::error::PodcastError;
use crate::ingest::{ContentSource, GeoMetadata, SourceUrls};
use crate::section::Section;
use crate::selector::{FragmentSelector, IntroContext};
use crate::sequencer::{Bookends, sequence};
use crate::templates::TemplateStore;
use crate::weather::{Forecast, WeatherProvider};

/// Identity of the podcast being produced.
#[derive(Debug, Clone, PartialEq)]
pub struct PodcastProfile {
    pub org: String,
    pub name: String,
    pub speakers: SpeakerNames,
    pub language: Language,
}

/// An ordered script plus where its content came from.
#[derive(Debug, Clone)]
pub struct Script {
    pub sections: Vec<Section>,
    pub source_urls: SourceUrls,
}

/// Collaborators used while planning.
pub struct PlanContext<'a> {
    pub selector: &'a mut FragmentSelector,
    pub weather: Option<&'a dyn WeatherProvider>,
    pub source: &'a dyn ContentSource,
    pub today: NaiveDate,
}

/// One podcast episode before synthesis.
pub struct Podcast {
    profile: PodcastProfile,
    directives: DirectiveSet,
    items: Vec<ContentItem>,
    templates: TemplateStore,
}

impl Podcast {
    pub fn new(profile: PodcastProfile, content: NormalizedContent, templates: TemplateStore) -> Self {
        info!("Processing podcast with name {}", profile.name);
        Self {
            profile,
            directives: content.directives,
            items: content.items,
            templates,
        }
    }

    pub fn profile(&self) -> &PodcastProfile {
        &self.profile
    }

    pub fn directives(&self) -> &DirectiveSet {
        &self.directives
    }

    pub fn location(&self) -> Option<&str> {
        self.directives.location.as_deref()
    }

    /// Build the full script, or in preview mode just the ingested content.
    pub async fn plan(&self, ctx: PlanContext<'_>, preview: bool) -> Result<Script, PodcastError> {
        let PlanContext {
            selector,
            weather,
            source,
            today,
        } = ctx;

        if preview {
            let (sections, source_urls) = self
                .ingest_content(source, GeoMetadata::default())
                .await?;
            return Ok(Script {
                sections,
                source_urls,
            });
        }

        let (forecast, geo) = match (self.location(), weather) {
            (Some(location), Some(provider)) => {
                match lookup_forecast(provider, location, self.profile.language).await {
                    Ok((forecast, geo)) => (Some(forecast), geo),
                    Err(e) => {
                        warn!("Weather unavailable for '{}', using plain intro: {}", location, e);
                        (None, GeoMetadata::default())
                    }
                }
            }
            _ => (None, GeoMetadata::default()),
        };

        let intro = self.generate_intro(selector, today, forecast.as_ref())?;
        let outro = self.generate_outro(selector, today)?;
        let transitions = selector.transitions(&self.templates)?;
        let gimmick = if self.directives.has_gimmick {
            Some(self.generate_gimmick(selector)?)
        } else {
            None
        };

        let (content, source_urls) = self.ingest_content(source, geo).await?;
        let sections = sequence(
            content,
            Bookends {
                intro,
                outro,
                gimmick,
            },
            transitions,
            &self.profile.speakers,
        )?;

        Ok(Script {
            sections,
            source_urls,
        })
    }

    fn intro_context(&self, today: NaiveDate) -> IntroContext {
        IntroContext {
            date: today,
            language: self.profile.language,
            org: self.profile.org.clone(),
            podcast: self.profile.name.clone(),
        }
    }

    /// Intro from templates, mentioning the weather when a forecast is known.
    pub fn generate_intro(
        &self,
        selector: &mut FragmentSelector,
        today: NaiveDate,
        forecast: Option<&Forecast>,
    ) -> Result<Section, PodcastError> {
        let ctx = self.intro_context(today);
        let mut intro = match (forecast, self.location()) {
            (Some(forecast), Some(location)) => {
                selector.weather_intro(&self.templates, &ctx, location, forecast)?
            }
            _ => selector.plain_intro(&self.templates, &ctx)?,
        };
        if let Some(ref directive) = self.directives.intro {
            directive.apply(&mut intro);
        }
        info!("Generated introduction: '{}'", intro.text);
        Ok(intro)
    }

    pub fn generate_outro(
        &self,
        selector: &mut FragmentSelector,
        today: NaiveDate,
    ) -> Result<Section, PodcastError> {
        let mut outro = selector.outro(&self.templates, &self.intro_context(today))?;
        if let Some(ref directive) = self.directives.outro {
            directive.apply(&mut outro);
        }
        Ok(outro)
    }

    pub fn generate_gimmick(&self, selector: &mut FragmentSelector) -> Result<Section, PodcastError> {
        let mut gimmick = selector.gimmick(&self.templates)?;
        if let Some(ref directive) = self.directives.gimmick {
            directive.apply(&mut gimmick);
        }
        Ok(gimmick)
    }

    pub async fn ingest_content(
        &self,
        source: &dyn ContentSource,
        geo: GeoMetadata,
    ) -> Result<(Vec<Section>, SourceUrls), PodcastError> {
        source.ingest(&self.items, geo, self.profile.language).await
    }
}

/// Geocode `location` and fetch today's forecast.
pub async fn lookup_forecast(
    provider: &dyn WeatherProvider,
    location: &str,
    language: Language,
) -> Result<(Forecast, GeoMetadata), PodcastError> {
    let (lat, lon) = provider.city_to_lat_lon(location).await?;
    let forecast = provider.forecast(lat, lon, language).await?;
    Ok((
        forecast,
        GeoMetadata {
            lat: Some(lat),
            lon: Some(lon),
        },
    ))
}
