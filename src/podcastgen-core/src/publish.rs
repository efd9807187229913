//! Publication of exported episodes.
//!
//! Backends are chosen by service name. Destination URLs can be computed
//! before the episode exists so a caller can hand them out right away.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Url;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::assembly::Artifact;
use crate::error::PodcastError;
use crate::section::AudioFormat;

/// Supported publication services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadService {
    FileShare,
    BlobStorage,
    Buzzsprout,
}

impl UploadService {
    /// Resolve a service name. Unknown names fail before any I/O happens.
    pub fn from_name(name: &str) -> Result<Self, PodcastError> {
        match name.to_lowercase().as_str() {
            "azfileshare" | "fileshare" => Ok(UploadService::FileShare),
            "azblobstorage" | "blob" | "blobstorage" => Ok(UploadService::BlobStorage),
            "buzzsprout" => Ok(UploadService::Buzzsprout),
            other => Err(PodcastError::UnsupportedService(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            UploadService::FileShare => "azfileshare",
            UploadService::BlobStorage => "azblobstorage",
            UploadService::Buzzsprout => "buzzsprout",
        }
    }
}

/// Storage credentials supplied with a request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageParams {
    pub account_name: Option<String>,
    pub container_name: Option<String>,
    /// Shared access signature, without the leading `?`.
    pub sas_token: Option<String>,
    /// Overrides `https://{account}.blob.core.windows.net`.
    pub endpoint: Option<String>,
}

/// Naming of one published episode.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadIdentity {
    /// Podcast name.
    pub name: String,
    /// Request id.
    pub id: String,
    pub format: AudioFormat,
}

impl UploadIdentity {
    pub fn new(name: impl Into<String>, id: impl Into<String>, format: AudioFormat) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            format,
        }
    }

    /// Published object name: `{name}-{id}.{format}`.
    pub fn object_name(&self) -> String {
        format!("{}-{}.{}", self.name, self.id, self.format.extension())
    }

    pub fn episode_title(&self, date: NaiveDate) -> String {
        format!("{} - {}", self.name, date.format("%d/%m/%Y"))
    }
}

/// Upload backend.
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Upload the file and return its public URL.
    async fn upload(
        &self,
        path: &Path,
        identity: &UploadIdentity,
        credentials: &StorageParams,
    ) -> Result<String, PodcastError>;

    /// URL the episode will have once uploaded.
    fn precompute_url(
        &self,
        identity: &UploadIdentity,
        credentials: &StorageParams,
    ) -> Result<String, PodcastError>;
}

fn http_client() -> Result<reqwest::Client, PodcastError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(120))
        .connect_timeout(Duration::from_secs(30))
        .build()
        .map_err(|e| PodcastError::Upload(format!("Failed to create HTTP client: {}", e)))
}

fn mime_type(format: AudioFormat) -> &'static str {
    match format {
        AudioFormat::Wav => "audio/wav",
        AudioFormat::Mp3 => "audio/mpeg",
    }
}

/// Copies episodes into a shared directory.
#[derive(Debug, Clone)]
pub struct FileShareUploader {
    share_dir: PathBuf,
}

impl FileShareUploader {
    pub fn new(share_dir: impl Into<PathBuf>) -> Self {
        Self {
            share_dir: share_dir.into(),
        }
    }

    fn destination(&self, identity: &UploadIdentity) -> PathBuf {
        self.share_dir.join(identity.object_name())
    }
}

#[async_trait]
impl Uploader for FileShareUploader {
    async fn upload(
        &self,
        path: &Path,
        identity: &UploadIdentity,
        credentials: &StorageParams,
    ) -> Result<String, PodcastError> {
        let destination = self.destination(identity);
        tokio::fs::create_dir_all(&self.share_dir).await?;
        tokio::fs::copy(path, &destination).await.map_err(|e| {
            PodcastError::Upload(format!(
                "Failed to copy {} to {}: {}",
                path.display(),
                destination.display(),
                e
            ))
        })?;
        self.precompute_url(identity, credentials)
    }

    fn precompute_url(
        &self,
        identity: &UploadIdentity,
        _credentials: &StorageParams,
    ) -> Result<String, PodcastError> {
        let destination = self.destination(identity);
        let absolute = std::path::absolute(&destination)?;
        Url::from_file_path(&absolute)
            .map(String::from)
            .map_err(|_| PodcastError::Config(format!("Invalid share path {}", absolute.display())))
    }
}

/// Azure Blob Storage via SAS-authorized PUT.
pub struct BlobStorageUploader {
    http: reqwest::Client,
}

impl BlobStorageUploader {
    pub fn new() -> Result<Self, PodcastError> {
        Ok(Self {
            http: http_client()?,
        })
    }

    fn blob_url(identity: &UploadIdentity, credentials: &StorageParams) -> Result<Url, PodcastError> {
        let container = credentials
            .container_name
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| PodcastError::Config("Blob storage needs a container_name".to_string()))?;
        let base = match (&credentials.endpoint, &credentials.account_name) {
            (Some(endpoint), _) => endpoint.clone(),
            (None, Some(account)) if !account.is_empty() => {
                format!("https://{}.blob.core.windows.net", account)
            }
            _ => {
                return Err(PodcastError::Config(
                    "Blob storage needs an account_name or endpoint".to_string(),
                ));
            }
        };

        let mut url = Url::parse(&base)
            .map_err(|e| PodcastError::Config(format!("Invalid blob endpoint '{}': {}", base, e)))?;
        url.path_segments_mut()
            .map_err(|_| PodcastError::Config(format!("Blob endpoint '{}' cannot be a base", base)))?
            .pop_if_empty()
            .push(container)
            .push(&identity.object_name());
        Ok(url)
    }
}

#[async_trait]
impl Uploader for BlobStorageUploader {
    async fn upload(
        &self,
        path: &Path,
        identity: &UploadIdentity,
        credentials: &StorageParams,
    ) -> Result<String, PodcastError> {
        let public = Self::blob_url(identity, credentials)?;
        let mut signed = public.clone();
        if let Some(sas) = credentials.sas_token.as_deref() {
            signed.set_query(Some(sas.trim_start_matches('?')));
        }

        let body = tokio::fs::read(path).await?;
        self.http
            .put(signed)
            .header("x-ms-blob-type", "BlockBlob")
            .header("Content-Type", mime_type(identity.format))
            .body(body)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| PodcastError::Upload(format!("Blob upload rejected: {}", e)))?;

        Ok(public.into())
    }

    fn precompute_url(
        &self,
        identity: &UploadIdentity,
        credentials: &StorageParams,
    ) -> Result<String, PodcastError> {
        Self::blob_url(identity, credentials).map(String::from)
    }
}

/// Buzzsprout podcast hosting.
pub struct BuzzsproutUploader {
    http: reqwest::Client,
    podcast_id: String,
    api_token: String,
}

#[derive(Debug, Deserialize)]
struct BuzzsproutEpisode {
    audio_url: String,
}

impl BuzzsproutUploader {
    pub const API_BASE: &'static str = "https://www.buzzsprout.com/api";

    pub fn new(podcast_id: impl Into<String>, api_token: impl Into<String>) -> Result<Self, PodcastError> {
        Ok(Self {
            http: http_client()?,
            podcast_id: podcast_id.into(),
            api_token: api_token.into(),
        })
    }
}

#[async_trait]
impl Uploader for BuzzsproutUploader {
    async fn upload(
        &self,
        path: &Path,
        identity: &UploadIdentity,
        _credentials: &StorageParams,
    ) -> Result<String, PodcastError> {
        let bytes = tokio::fs::read(path).await?;
        let audio = Part::bytes(bytes)
            .file_name(identity.object_name())
            .mime_str(mime_type(identity.format))?;
        let form = Form::new()
            .text("title", identity.episode_title(chrono::Local::now().date_naive()))
            .text("description", String::new())
            .part("audio_file", audio);

        let episode: BuzzsproutEpisode = self
            .http
            .post(format!("{}/{}/episodes.json", Self::API_BASE, self.podcast_id))
            .header("Authorization", format!("Token token={}", self.api_token))
            .multipart(form)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| PodcastError::Upload(format!("Buzzsprout rejected episode: {}", e)))?
            .json()
            .await?;

        Ok(episode.audio_url)
    }

    /// Episode URLs are assigned by Buzzsprout; the podcast page is known upfront.
    fn precompute_url(
        &self,
        _identity: &UploadIdentity,
        _credentials: &StorageParams,
    ) -> Result<String, PodcastError> {
        Ok(format!("https://www.buzzsprout.com/{}", self.podcast_id))
    }
}

/// Dispatches uploads to the configured backends.
pub struct Publisher {
    file_share: FileShareUploader,
    blob: BlobStorageUploader,
    buzzsprout: Option<BuzzsproutUploader>,
}

impl Publisher {
    pub fn new(
        file_share: FileShareUploader,
        blob: BlobStorageUploader,
        buzzsprout: Option<BuzzsproutUploader>,
    ) -> Self {
        Self {
            file_share,
            blob,
            buzzsprout,
        }
    }

    pub fn uploader(&self, service: UploadService) -> Result<&dyn Uploader, PodcastError> {
        match service {
            UploadService::FileShare => Ok(&self.file_share),
            UploadService::BlobStorage => Ok(&self.blob),
            UploadService::Buzzsprout => self
                .buzzsprout
                .as_ref()
                .map(|u| u as &dyn Uploader)
                .ok_or_else(|| {
                    PodcastError::Config(
                        "Buzzsprout needs BUZZSPROUT_PODCAST_ID and BUZZSPROUT_API_TOKEN".to_string(),
                    )
                }),
        }
    }

    pub fn precompute_url(
        &self,
        service: &str,
        identity: &UploadIdentity,
        credentials: &StorageParams,
    ) -> Result<String, PodcastError> {
        let service = UploadService::from_name(service)?;
        self.uploader(service)?.precompute_url(identity, credentials)
    }

    /// Upload the artifact; on success optionally delete the local export.
    pub async fn publish(
        &self,
        service: &str,
        artifact: &Artifact,
        identity: &UploadIdentity,
        credentials: &StorageParams,
        clean_up: bool,
    ) -> Result<String, PodcastError> {
        let service = UploadService::from_name(service)?;
        let uploader = self.uploader(service)?;

        info!("Uploading podcast to {}.", service.name());
        let url = uploader.upload(&artifact.path, identity, credentials).await?;
        info!("Podcast uploaded to {}", url);

        if clean_up {
            match tokio::fs::remove_file(&artifact.path).await {
                Ok(()) => info!("Deleted internal export."),
                Err(e) => debug!("Could not delete {}: {}", artifact.path.display(), e),
            }
        }
        Ok(url)
    }
}
