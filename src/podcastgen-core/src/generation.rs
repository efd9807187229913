//! Request-level generation.
//!
//! [`GenerationService::submit`] validates and plans an episode on the
//! caller's task, computes where the episode will be published, and defers
//! rendering and publication to a background task. Failures of that task are
//! only visible in the logs and through the returned [`JoinHandle`].

use chrono::Local;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::assembly::{Artifact, ExportOptions, generate_filename, merge_and_export};
use crate::config::{EffectsConfig, EffectsOverride, Language, Settings, SpeakerNames};
use crate::content::{ContentConfig, NormalizedContent};
use crate::error::PodcastError;
use crate::ingest::{ContentSource, GeoMetadata, SourceUrls};
use crate::mixer::Mixer;
use crate::podcast::{PlanContext, Podcast, PodcastProfile};
use crate::publish::{Publisher, StorageParams, UploadIdentity, UploadService};
use crate::section::{AudioFormat, AudioHandle, Section, SectionKind, Voice};
use crate::selector::FragmentSelector;
use crate::synthesis::{SynthesisMode, Synthesizer, render_sections};
use crate::templates::TemplateStore;
use crate::weather::WeatherProvider;

/// A podcast generation request.
#[derive(Debug, Clone, Deserialize)]
pub struct PodcastRequest {
    pub org: String,
    pub name: String,
    #[serde(default)]
    pub speakers: SpeakerNames,
    #[serde(default)]
    pub language: Language,
    pub content: ContentConfig,
    /// Sound-effect overrides for this episode.
    #[serde(default)]
    pub audio: EffectsOverride,
    #[serde(default)]
    pub storage: StorageParams,
}

impl PodcastRequest {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PodcastError> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| PodcastError::Config(format!("Failed to read request: {}", e)))?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, PodcastError> {
        let request: Self = serde_json::from_str(content)
            .map_err(|e| PodcastError::Config(format!("Failed to parse request: {}", e)))?;
        request.validate()?;
        Ok(request)
    }

    /// `org` and `name` end up in export and upload file names, so each must
    /// be a single plain path component.
    pub fn validate(&self) -> Result<(), PodcastError> {
        file_name_component("org", &self.org)?;
        file_name_component("name", &self.name)
    }

    fn profile(&self) -> PodcastProfile {
        PodcastProfile {
            org: self.org.clone(),
            name: self.name.clone(),
            speakers: self.speakers.clone(),
            language: self.language,
        }
    }
}

/// How a submitted episode is rendered and published.
#[derive(Debug, Clone)]
pub struct GenerationOptions {
    /// Publication service name, e.g. `azblobstorage`.
    pub service: String,
    pub format: AudioFormat,
    pub mode: SynthesisMode,
    /// Delete section audio after export and the export after upload.
    pub clean_up: bool,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            service: UploadService::BlobStorage.name().to_string(),
            format: AudioFormat::Wav,
            mode: SynthesisMode::Live,
            clean_up: true,
        }
    }
}

/// Outcome of a completed background unit.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationReport {
    pub request_id: String,
    pub export_path: PathBuf,
    pub url: String,
}

/// Returned as soon as an episode has been planned and scheduled.
#[derive(Debug)]
pub struct Submission {
    pub request_id: String,
    pub filename: String,
    /// Where the episode will be published. Known before it exists.
    pub destination_url: String,
    pub source_urls: SourceUrls,
    pub handle: JoinHandle<Result<GenerationReport, PodcastError>>,
}

/// Everything the background unit needs, owned.
struct BackgroundUnit {
    request_id: String,
    sections: Vec<Section>,
    language: Language,
    options: GenerationOptions,
    effects: EffectsConfig,
    effects_override: EffectsOverride,
    target: PathBuf,
    identity: UploadIdentity,
    storage: StorageParams,
    synthesizer: Arc<dyn Synthesizer>,
    mixer: Arc<dyn Mixer>,
    publisher: Arc<Publisher>,
}

impl BackgroundUnit {
    async fn run(mut self) -> Result<GenerationReport, PodcastError> {
        render_sections(
            &mut self.sections,
            self.synthesizer.as_ref(),
            &self.options.mode,
            self.options.format,
            self.language,
        )
        .await?;

        let artifact = merge_and_export(
            &self.sections,
            self.mixer.as_ref(),
            ExportOptions {
                base_effects: &self.effects,
                effects_override: &self.effects_override,
                preview: false,
                target: &self.target,
                format: self.options.format,
                clean_up: self.options.clean_up,
            },
        )?;

        let url = self
            .publisher
            .publish(
                &self.options.service,
                &artifact,
                &self.identity,
                &self.storage,
                self.options.clean_up,
            )
            .await?;

        Ok(GenerationReport {
            request_id: self.request_id,
            export_path: artifact.path,
            url,
        })
    }
}

/// Entry point for generating, previewing and inspecting episodes.
pub struct GenerationService {
    settings: Settings,
    synthesizer: Option<Arc<dyn Synthesizer>>,
    mixer: Arc<dyn Mixer>,
    publisher: Arc<Publisher>,
    source: Arc<dyn ContentSource>,
    weather: Option<Arc<dyn WeatherProvider>>,
    seed: Option<u64>,
}

impl GenerationService {
    /// A service without a speech backend can still plan and list sources;
    /// attach one with [`GenerationService::with_synthesizer`] to render.
    pub fn new(
        settings: Settings,
        mixer: Arc<dyn Mixer>,
        publisher: Arc<Publisher>,
        source: Arc<dyn ContentSource>,
    ) -> Self {
        Self {
            settings,
            synthesizer: None,
            mixer,
            publisher,
            source,
            weather: None,
            seed: None,
        }
    }

    pub fn with_synthesizer(mut self, synthesizer: Arc<dyn Synthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    /// Enable weather-aware intros.
    pub fn with_weather(mut self, weather: Arc<dyn WeatherProvider>) -> Self {
        self.weather = Some(weather);
        self
    }

    /// Make template selection reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn synthesizer(&self) -> Result<&Arc<dyn Synthesizer>, PodcastError> {
        self.synthesizer
            .as_ref()
            .ok_or_else(|| PodcastError::Config("No synthesis backend configured".to_string()))
    }

    fn selector(&self) -> FragmentSelector {
        match self.seed {
            Some(seed) => FragmentSelector::with_seed(seed),
            None => FragmentSelector::default(),
        }
    }

    fn podcast(&self, request: &PodcastRequest) -> Result<Podcast, PodcastError> {
        request.validate()?;
        let templates = TemplateStore::load(&self.settings.paths.templates_dir, request.language)?;
        let content = request.content.normalize()?;
        Ok(Podcast::new(request.profile(), content, templates))
    }

    /// Plan the episode and schedule its rendering and publication.
    ///
    /// Configuration and sequencing errors are returned here and nothing is
    /// scheduled. Later failures are logged by the background task.
    pub async fn submit(
        &self,
        request: PodcastRequest,
        options: GenerationOptions,
    ) -> Result<Submission, PodcastError> {
        UploadService::from_name(&options.service)?;
        let synthesizer = Arc::clone(self.synthesizer()?);
        let podcast = self.podcast(&request)?;

        let mut selector = self.selector();
        let now = Local::now();
        let script = podcast
            .plan(
                PlanContext {
                    selector: &mut selector,
                    weather: self.weather.as_deref(),
                    source: self.source.as_ref(),
                    today: now.date_naive(),
                },
                false,
            )
            .await?;

        let request_id = Uuid::new_v4().to_string();
        let filename = generate_filename(&request.org, now.naive_local(), &request_id);
        let identity = UploadIdentity::new(&request.name, &request_id, options.format);
        let destination_url =
            self.publisher
                .precompute_url(&options.service, &identity, &request.storage)?;

        let unit = BackgroundUnit {
            request_id: request_id.clone(),
            sections: script.sections,
            language: request.language,
            effects: self.settings.effects.clone(),
            effects_override: request.audio,
            target: self.settings.paths.exports_dir.join(&filename),
            identity,
            storage: request.storage,
            options,
            synthesizer,
            mixer: Arc::clone(&self.mixer),
            publisher: Arc::clone(&self.publisher),
        };

        info!("Scheduled podcast {} for {}", request_id, destination_url);
        let id = request_id.clone();
        let handle = tokio::spawn(async move {
            let result = unit.run().await;
            match &result {
                Ok(report) => info!("Podcast {} published at {}", id, report.url),
                Err(e) => error!("Podcast {} failed: {}", id, e),
            }
            result
        });

        Ok(Submission {
            request_id,
            filename,
            destination_url,
            source_urls: script.source_urls,
            handle,
        })
    }

    /// Render content without episode framing and export it.
    ///
    /// Directive text (a custom intro, outro or gimmick) is previewed as is;
    /// other entries go through ingestion.
    pub async fn preview_section(
        &self,
        content: ContentConfig,
        language: Language,
        audio: &EffectsOverride,
        format: AudioFormat,
    ) -> Result<Artifact, PodcastError> {
        let synthesizer = self.synthesizer()?;
        let normalized = content.normalize()?;
        let mut sections = directive_previews(&normalized);

        let podcast = Podcast::new(
            PodcastProfile {
                org: String::new(),
                name: String::new(),
                speakers: SpeakerNames::default(),
                language,
            },
            normalized,
            TemplateStore::load(&self.settings.paths.templates_dir, language)?,
        );
        let mut selector = self.selector();
        let script = podcast
            .plan(
                PlanContext {
                    selector: &mut selector,
                    weather: None,
                    source: self.source.as_ref(),
                    today: Local::now().date_naive(),
                },
                true,
            )
            .await?;
        sections.extend(script.sections);
        if sections.is_empty() {
            return Err(PodcastError::Config("Nothing to preview".to_string()));
        }

        render_sections(
            &mut sections,
            synthesizer.as_ref(),
            &SynthesisMode::Live,
            format,
            language,
        )
        .await?;

        let target = self
            .settings
            .paths
            .exports_dir
            .join(format!("preview-{}", Uuid::new_v4()));
        merge_and_export(
            &sections,
            self.mixer.as_ref(),
            ExportOptions {
                base_effects: &self.settings.effects,
                effects_override: audio,
                preview: true,
                target: &target,
                format,
                clean_up: true,
            },
        )
    }

    /// Synthesize a single utterance.
    pub async fn preview_voice(
        &self,
        text: &str,
        voice: Voice,
        language: Language,
        format: AudioFormat,
    ) -> Result<AudioHandle, PodcastError> {
        if text.trim().is_empty() {
            return Err(PodcastError::Config("Text to synthesize is empty".to_string()));
        }
        self.synthesizer()?
            .synthesize(text, format, voice, language)
            .await
    }

    /// Ingest a request's content and report its sources.
    pub async fn list_sources(&self, request: &PodcastRequest) -> Result<SourceUrls, PodcastError> {
        let podcast = self.podcast(request)?;
        let geo = match (podcast.location(), self.weather.as_deref()) {
            (Some(location), Some(provider)) => match provider.city_to_lat_lon(location).await {
                Ok((lat, lon)) => GeoMetadata {
                    lat: Some(lat),
                    lon: Some(lon),
                },
                Err(e) => {
                    warn!("Could not locate '{}': {}", location, e);
                    GeoMetadata::default()
                }
            },
            _ => GeoMetadata::default(),
        };
        let (_, urls) = podcast.ingest_content(self.source.as_ref(), geo).await?;
        Ok(urls)
    }
}

fn file_name_component(field: &str, value: &str) -> Result<(), PodcastError> {
    let trimmed = value.trim();
    if trimmed.is_empty()
        || trimmed == "."
        || trimmed.contains("..")
        || value.contains(['/', '\\', '\0'])
    {
        return Err(PodcastError::Config(format!(
            "Request {} '{}' must be a plain name without path separators or '..'",
            field, value
        )));
    }
    Ok(())
}

/// Preview sections for directives that carry their own text.
fn directive_previews(content: &NormalizedContent) -> Vec<Section> {
    let d = &content.directives;
    [&d.intro, &d.outro, &d.gimmick]
        .into_iter()
        .flatten()
        .filter_map(|directive| {
            directive.text.as_ref().map(|text| {
                Section::new(
                    SectionKind::Preview,
                    text.clone(),
                    directive.voice.unwrap_or(Voice::Male),
                )
            })
        })
        .collect()
}
