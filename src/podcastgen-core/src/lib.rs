//! podcastgen Core Library
//!
//! Plans a podcast episode from templates and supplied content, renders each
//! section with a speech backend, mixes and exports the result and publishes
//! it to a storage service.

pub mod assembly;
pub mod config;
pub mod content;
pub mod error;
pub mod generation;
pub mod ingest;
pub mod mixer;
pub mod podcast;
pub mod publish;
pub mod section;
pub mod selector;
pub mod sequencer;
pub mod synthesis;
pub mod templates;
pub mod weather;

pub use assembly::{Artifact, ExportOptions, generate_filename, merge_and_export};
pub use config::{EffectsConfig, EffectsOverride, Language, Settings, SpeakerNames, default_settings};
pub use content::{ContentConfig, ContentEntry, DirectiveSet, NormalizedContent};
pub use error::PodcastError;
pub use generation::{GenerationOptions, GenerationReport, GenerationService, PodcastRequest, Submission};
pub use ingest::{ContentSource, GeoMetadata, InlineContentSource, SourceUrls};
pub use mixer::{Mixer, WavMixer};
pub use podcast::{PlanContext, Podcast, PodcastProfile, Script};
pub use publish::{
    BlobStorageUploader, BuzzsproutUploader, FileShareUploader, Publisher, StorageParams,
    UploadIdentity, UploadService, Uploader,
};
pub use section::{AudioFormat, AudioHandle, Section, SectionKind, Voice};
pub use selector::{FragmentSelector, TemplateCategory};
pub use sequencer::sequence;
pub use synthesis::{KokoroSynthesizer, SynthesisMode, Synthesizer};
pub use templates::TemplateStore;
pub use weather::{Forecast, OpenWeatherClient, WeatherCategory, WeatherProvider};
