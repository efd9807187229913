//! Speech synthesis of script sections.
//!
//! [`render_sections`] walks the script in order and attaches audio to every
//! section that has none, either by calling a [`Synthesizer`] or by replaying
//! placeholder files rendered by an earlier run.

use async_trait::async_trait;
use kokoro_tiny::TtsEngine;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::{Language, VoicesConfig};
use crate::error::PodcastError;
use crate::section::{AudioFormat, AudioHandle, Section, Voice};

/// Speech synthesis backend.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Render `text` and return a handle to the written audio.
    async fn synthesize(
        &self,
        text: &str,
        format: AudioFormat,
        voice: Voice,
        language: Language,
    ) -> Result<AudioHandle, PodcastError>;
}

/// Where section audio comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum SynthesisMode {
    /// Call the synthesis backend for each section.
    Live,
    /// Reuse files from `dir`, oldest first, instead of synthesizing.
    Replay { dir: PathBuf },
}

/// Attach audio to every section that lacks it, in script order.
///
/// Sections that already carry audio are never re-submitted. The first
/// backend failure aborts the run; there is no retry.
pub async fn render_sections(
    sections: &mut [Section],
    synthesizer: &dyn Synthesizer,
    mode: &SynthesisMode,
    format: AudioFormat,
    language: Language,
) -> Result<(), PodcastError> {
    let chars: usize = sections.iter().map(|s| s.text.chars().count()).sum();
    info!("This podcast contains {} chars.", chars);
    for (i, section) in sections.iter().enumerate() {
        info!("{}: {}", i, section.text);
    }

    let mut placeholders = match mode {
        SynthesisMode::Live => Vec::new().into_iter(),
        SynthesisMode::Replay { dir } => placeholder_files(dir)?.into_iter(),
    };

    info!("Processing and synthesizing podcast.");
    for (i, section) in sections.iter_mut().enumerate() {
        if !section.needs_synthesis() {
            continue;
        }
        if section.text.trim().is_empty() {
            return Err(PodcastError::Synthesis(format!(
                "Section {} ({}) has no text",
                i,
                section.kind.display_name()
            )));
        }

        let handle = match mode {
            SynthesisMode::Live => {
                synthesizer
                    .synthesize(&section.text, format, section.voice, language)
                    .await?
            }
            SynthesisMode::Replay { dir } => {
                let path = placeholders.next().ok_or_else(|| {
                    PodcastError::Synthesis(format!(
                        "Ran out of placeholder audio in {} at section {}",
                        dir.display(),
                        i
                    ))
                })?;
                AudioHandle::new(path)
            }
        };
        info!("Generated: {}", handle.path().display());
        section.audio = Some(handle);
    }

    Ok(())
}

/// Files in `dir` ordered by modification time, oldest first.
pub fn placeholder_files(dir: &Path) -> Result<Vec<PathBuf>, PodcastError> {
    let mut files: Vec<(SystemTime, PathBuf)> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }
        files.push((metadata.modified()?, entry.path()));
    }
    files.sort();
    Ok(files.into_iter().map(|(_, path)| path).collect())
}

/// Local synthesis with the kokoro engine. Renders WAV only.
pub struct KokoroSynthesizer {
    engine: Arc<Mutex<TtsEngine>>,
    voices: VoicesConfig,
    available_voices: Vec<String>,
    output_dir: PathBuf,
}

impl KokoroSynthesizer {
    /// Initialize the engine (downloads the model on first run).
    pub async fn new(voices: VoicesConfig, output_dir: impl Into<PathBuf>) -> Result<Self, PodcastError> {
        let engine = TtsEngine::new()
            .await
            .map_err(|e| PodcastError::Synthesis(format!("Failed to initialize TTS: {}", e)))?;

        let available_voices = engine.voices();
        let synthesizer = Self {
            engine: Arc::new(Mutex::new(engine)),
            voices,
            available_voices,
            output_dir: output_dir.into(),
        };
        synthesizer.validate_voice(Voice::Male)?;
        synthesizer.validate_voice(Voice::Female)?;
        fs::create_dir_all(&synthesizer.output_dir)?;
        Ok(synthesizer)
    }

    /// Check that the engine knows the voice configured for a speaker.
    pub fn validate_voice(&self, voice: Voice) -> Result<(), PodcastError> {
        let voice_id = self.voices.voice_id(voice);
        if !self.available_voices.iter().any(|v| v == voice_id) {
            let mut known = self.available_voices.clone();
            known.sort();
            return Err(PodcastError::Synthesis(format!(
                "Unknown voice '{}' for {} speaker. Available voices: {}",
                voice_id,
                voice,
                known.join(", ")
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Synthesizer for KokoroSynthesizer {
    async fn synthesize(
        &self,
        text: &str,
        format: AudioFormat,
        voice: Voice,
        language: Language,
    ) -> Result<AudioHandle, PodcastError> {
        if format != AudioFormat::Wav {
            return Err(PodcastError::Synthesis(format!(
                "Kokoro renders wav only, {} requested",
                format
            )));
        }
        let voice_id = self.voices.voice_id(voice).to_string();
        debug!("Synthesizing {} chars with '{}' ({})", text.len(), voice_id, language.code());

        let path = self
            .output_dir
            .join(format!("{}.{}", Uuid::new_v4(), format.extension()));
        let engine = Arc::clone(&self.engine);
        let text = text.to_string();
        let target = path.clone();
        run_blocking(move || render_wav(&engine, &text, &voice_id, &target)).await?;

        Ok(AudioHandle::new(path))
    }
}

/// Run CPU-bound engine work on the blocking pool.
async fn run_blocking<T, F>(work: F) -> Result<T, PodcastError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, PodcastError> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| PodcastError::Synthesis(format!("Synthesis task failed: {}", e)))?
}

fn render_wav(
    engine: &Mutex<TtsEngine>,
    text: &str,
    voice_id: &str,
    path: &Path,
) -> Result<(), PodcastError> {
    let mut engine = engine
        .lock()
        .map_err(|_| PodcastError::Synthesis("TTS engine lock poisoned".to_string()))?;

    let mut samples = Vec::new();
    for chunk in split_into_chunks(text, 200) {
        let rendered = engine
            .synthesize(&chunk, Some(voice_id))
            .map_err(|e| PodcastError::Synthesis(format!("Synthesis failed: {}", e)))?;
        samples.extend(rendered);
        // 0.3 s pause between chunks at 24 kHz
        samples.extend(std::iter::repeat_n(0.0, 7200));
    }
    samples.extend(std::iter::repeat_n(0.0, 12000));

    let path_str = path
        .to_str()
        .ok_or_else(|| PodcastError::Synthesis(format!("Non UTF-8 path {}", path.display())))?;
    engine
        .save_wav(path_str, &samples)
        .map_err(|e| PodcastError::Synthesis(format!("Failed to save WAV: {}", e)))
}

/// Split text into chunks short enough for the engine.
fn split_into_chunks(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    let mut push = |current: &mut String, part: &str| {
        if current.len() + part.len() > max_chars && !current.trim().is_empty() {
            chunks.push(current.trim().to_string());
            current.clear();
        }
        current.push_str(part);
        current.push(' ');
    };

    for sentence in text.split_inclusive(&['.', '!', '?', ';'][..]) {
        let sentence = sentence.trim();
        if sentence.is_empty() {
            continue;
        }
        if sentence.len() > max_chars {
            for part in sentence.split_inclusive(',') {
                push(&mut current, part.trim());
            }
        } else {
            push(&mut current, sentence);
        }
    }

    if !current.trim().is_empty() {
        chunks.push(current.trim().to_string());
    }
    chunks
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::section::SectionKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Writes a marker file per call and counts invocations.
    pub struct CountingSynthesizer {
        pub dir: PathBuf,
        pub calls: AtomicUsize,
    }

    impl CountingSynthesizer {
        pub fn new(dir: &Path) -> Self {
            Self {
                dir: dir.to_path_buf(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Synthesizer for CountingSynthesizer {
        async fn synthesize(
            &self,
            text: &str,
            format: AudioFormat,
            voice: Voice,
            _language: Language,
        ) -> Result<AudioHandle, PodcastError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            let path = self.dir.join(format!("{}-{}.{}", n, voice, format.extension()));
            fs::write(&path, text)?;
            Ok(AudioHandle::new(path))
        }
    }

    struct FailingSynthesizer;

    #[async_trait]
    impl Synthesizer for FailingSynthesizer {
        async fn synthesize(
            &self,
            _text: &str,
            _format: AudioFormat,
            _voice: Voice,
            _language: Language,
        ) -> Result<AudioHandle, PodcastError> {
            Err(PodcastError::Synthesis("backend unavailable".to_string()))
        }
    }

    #[tokio::test]
    async fn test_live_skips_sections_with_audio() {
        let dir = tempfile::tempdir().unwrap();
        let synth = CountingSynthesizer::new(dir.path());
        let existing = AudioHandle::new(dir.path().join("existing.wav"));
        let mut sections = vec![
            Section::intro("Hello", Voice::Male),
            Section::news_title("Title", Voice::Female).with_audio(existing.clone()),
            Section::news_body("Body", Voice::Female),
        ];

        render_sections(&mut sections, &synth, &SynthesisMode::Live, AudioFormat::Wav, Language::En)
            .await
            .unwrap();

        assert_eq!(synth.calls.load(Ordering::SeqCst), 2);
        assert_eq!(sections[1].audio, Some(existing));
        assert!(sections.iter().all(|s| s.audio.is_some()));
        assert_eq!(
            fs::read_to_string(sections[2].audio.as_ref().unwrap().path()).unwrap(),
            "Body"
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_engine_work_runs_off_the_runtime_thread() {
        let caller = std::thread::current().id();
        let worker = run_blocking(|| Ok(std::thread::current().id())).await.unwrap();
        assert_ne!(worker, caller);
    }

    #[tokio::test]
    async fn test_engine_panic_becomes_synthesis_error() {
        let result: Result<(), PodcastError> = run_blocking(|| panic!("engine crashed")).await;
        assert!(matches!(result, Err(PodcastError::Synthesis(_))));
    }

    #[tokio::test]
    async fn test_failure_is_fatal() {
        let mut sections = vec![
            Section::intro("Hello", Voice::Male),
            Section::outro("Bye", Voice::Male),
        ];
        let result = render_sections(
            &mut sections,
            &FailingSynthesizer,
            &SynthesisMode::Live,
            AudioFormat::Wav,
            Language::En,
        )
        .await;

        assert!(matches!(result, Err(PodcastError::Synthesis(_))));
        assert!(sections.iter().all(|s| s.audio.is_none()));
    }

    #[tokio::test]
    async fn test_empty_text_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let synth = CountingSynthesizer::new(dir.path());
        let mut sections = vec![Section::new(SectionKind::Preview, "   ", Voice::Male)];
        let result =
            render_sections(&mut sections, &synth, &SynthesisMode::Live, AudioFormat::Wav, Language::En)
                .await;
        assert!(matches!(result, Err(PodcastError::Synthesis(_))));
        assert_eq!(synth.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_replay_uses_oldest_first() {
        let dir = tempfile::tempdir().unwrap();
        let now = SystemTime::now();
        for (name, age) in [("b.wav", 10), ("a.wav", 30), ("c.wav", 20)] {
            let path = dir.path().join(name);
            fs::write(&path, name).unwrap();
            let file = fs::File::options().write(true).open(&path).unwrap();
            file.set_modified(now - Duration::from_secs(age)).unwrap();
        }

        let unused = tempfile::tempdir().unwrap();
        let synth = CountingSynthesizer::new(unused.path());
        let mut sections = vec![
            Section::intro("Hello", Voice::Male),
            Section::news_title("Title", Voice::Female),
            Section::news_body("Body", Voice::Female),
        ];
        let mode = SynthesisMode::Replay {
            dir: dir.path().to_path_buf(),
        };

        render_sections(&mut sections, &synth, &mode, AudioFormat::Wav, Language::En)
            .await
            .unwrap();

        let names: Vec<_> = sections
            .iter()
            .map(|s| {
                let path = s.audio.as_ref().unwrap().path();
                path.file_name().unwrap().to_string_lossy().into_owned()
            })
            .collect();
        assert_eq!(names, vec!["a.wav", "c.wav", "b.wav"]);
        assert_eq!(synth.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_replay_runs_out() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("only.wav"), b"x").unwrap();
        let synth = CountingSynthesizer::new(dir.path());
        let mut sections = vec![
            Section::intro("Hello", Voice::Male),
            Section::outro("Bye", Voice::Male),
        ];
        let mode = SynthesisMode::Replay {
            dir: dir.path().to_path_buf(),
        };
        let result = render_sections(&mut sections, &synth, &mode, AudioFormat::Wav, Language::En).await;
        assert!(matches!(result, Err(PodcastError::Synthesis(_))));
    }

    #[test]
    fn test_split_into_chunks() {
        let text = "Hello world. This is a test. Another sentence here.";
        let chunks = split_into_chunks(text, 30);
        assert_eq!(chunks.len(), 2);
        for chunk in &chunks {
            assert!(chunk.len() <= 35);
        }
    }

    #[test]
    fn test_split_long_sentence_on_commas() {
        let text = "one, two, three, four, five, six, seven, eight, nine, ten.";
        let chunks = split_into_chunks(text, 20);
        assert!(chunks.len() > 1);
        assert_eq!(chunks.join(" ").replace("  ", " "), text);
    }
}
