//! Merge, export and cleanup of a rendered script.

use chrono::NaiveDateTime;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::{EffectsConfig, EffectsOverride};
use crate::error::PodcastError;
use crate::mixer::Mixer;
use crate::section::{AudioFormat, Section};

/// The exported episode.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub path: PathBuf,
    pub format: AudioFormat,
}

/// Export filename without extension: `{org}-{yyyyMMdd_HHMMSS}-{id}`.
pub fn generate_filename(org: &str, timestamp: NaiveDateTime, id: &str) -> String {
    format!("{}-{}-{}", org, timestamp.format("%Y%m%d_%H%M%S"), id)
}

/// Options for one merge/export run.
#[derive(Debug, Clone)]
pub struct ExportOptions<'a> {
    pub base_effects: &'a EffectsConfig,
    pub effects_override: &'a EffectsOverride,
    pub preview: bool,
    /// Export path without extension.
    pub target: &'a Path,
    pub format: AudioFormat,
    /// Delete per-section audio after a successful export.
    pub clean_up: bool,
}

/// Mix the sections, export the result and optionally remove section audio.
pub fn merge_and_export(
    sections: &[Section],
    mixer: &dyn Mixer,
    options: ExportOptions<'_>,
) -> Result<Artifact, PodcastError> {
    let mixed = mixer.merge_audio(
        sections,
        options.base_effects,
        options.effects_override,
        options.preview,
    )?;
    info!("Merged {} sections into {:.1}s of audio.", sections.len(), mixed.duration_secs());

    let path = mixer.export(&mixed, options.target, options.format)?;
    info!("Exported podcast to {}", path.display());

    if options.clean_up {
        let removed = remove_section_audio(sections);
        info!("Deleted {} placeholder TTS files.", removed);
    }

    Ok(Artifact {
        path,
        format: options.format,
    })
}

/// Best-effort removal of every section's audio file.
///
/// Failures (usually a file that is already gone) are logged and skipped.
/// Returns the number of files removed.
pub fn remove_section_audio(sections: &[Section]) -> usize {
    let mut removed = 0;
    for audio in sections.iter().filter_map(|s| s.audio.as_ref()) {
        match fs::remove_file(audio.path()) {
            Ok(()) => removed += 1,
            Err(e) => debug!("Could not delete {}: {}", audio.path().display(), e),
        }
    }
    removed
}
