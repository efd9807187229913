//! Audio mixing and export.

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::path::{Path, PathBuf};

use crate::config::{EffectsConfig, EffectsOverride};
use crate::error::PodcastError;
use crate::section::{AudioFormat, Section};

/// A mixed episode held in memory as mono samples.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl ComposedAudio {
    pub fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// Mixing backend.
pub trait Mixer: Send + Sync {
    /// Concatenate section audio, adding connective effects after sections
    /// with `has_transition` and background treatment under `is_news` ones.
    fn merge_audio(
        &self,
        sections: &[Section],
        base: &EffectsConfig,
        over: &EffectsOverride,
        preview: bool,
    ) -> Result<ComposedAudio, PodcastError>;

    /// Write `audio` to `path` plus the format's extension and return the full path.
    fn export(
        &self,
        audio: &ComposedAudio,
        path: &Path,
        format: AudioFormat,
    ) -> Result<PathBuf, PodcastError>;
}

/// WAV mixer. All inputs must share one sample rate.
#[derive(Debug, Clone, Default)]
pub struct WavMixer;

impl Mixer for WavMixer {
    fn merge_audio(
        &self,
        sections: &[Section],
        base: &EffectsConfig,
        over: &EffectsOverride,
        preview: bool,
    ) -> Result<ComposedAudio, PodcastError> {
        let effects = base.merged(over);
        let mut rate: Option<u32> = None;
        let mut load = |path: &Path| -> Result<Vec<f32>, PodcastError> {
            let (samples, sample_rate) = read_wav(path)?;
            match rate {
                None => rate = Some(sample_rate),
                Some(expected) if expected != sample_rate => {
                    return Err(PodcastError::Mixing(format!(
                        "{} is {} Hz, expected {} Hz",
                        path.display(),
                        sample_rate,
                        expected
                    )));
                }
                Some(_) => {}
            }
            Ok(samples)
        };

        let mut rendered = Vec::with_capacity(sections.len());
        for (i, section) in sections.iter().enumerate() {
            let audio = section.audio.as_ref().ok_or_else(|| {
                PodcastError::Mixing(format!(
                    "Section {} ({}) has no audio",
                    i,
                    section.kind.display_name()
                ))
            })?;
            rendered.push(load(audio.path())?);
        }

        let transition = effects.transition_sound.as_deref().map(&mut load).transpose()?;
        let bed = effects.news_bed.as_deref().map(&mut load).transpose()?;
        let (intro_jingle, outro_jingle) = if preview {
            (None, None)
        } else {
            (
                effects.intro_jingle.as_deref().map(&mut load).transpose()?,
                effects.outro_jingle.as_deref().map(&mut load).transpose()?,
            )
        };

        let sample_rate = rate.ok_or_else(|| PodcastError::Mixing("Nothing to mix".to_string()))?;
        let pause = vec![0.0; (effects.transition_pause_ms as usize * sample_rate as usize) / 1000];

        let mut samples = Vec::new();
        if let Some(jingle) = intro_jingle {
            samples.extend(jingle);
        }
        for (section, mut audio) in sections.iter().zip(rendered) {
            if section.is_news {
                if let Some(ref bed) = bed {
                    overlay_looped(&mut audio, bed, effects.bed_gain);
                }
            }
            samples.extend(audio);
            if section.has_transition {
                samples.extend(transition.as_deref().unwrap_or(&pause));
            }
        }
        if let Some(jingle) = outro_jingle {
            samples.extend(jingle);
        }

        Ok(ComposedAudio {
            samples,
            sample_rate,
        })
    }

    fn export(
        &self,
        audio: &ComposedAudio,
        path: &Path,
        format: AudioFormat,
    ) -> Result<PathBuf, PodcastError> {
        if format != AudioFormat::Wav {
            return Err(PodcastError::Mixing(format!(
                "WAV mixer cannot export {}",
                format
            )));
        }
        let mut target = path.as_os_str().to_owned();
        target.push(".");
        target.push(format.extension());
        let target = PathBuf::from(target);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let spec = WavSpec {
            channels: 1,
            sample_rate: audio.sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&target, spec).map_err(wav_error)?;
        for &sample in &audio.samples {
            let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            writer.write_sample(value).map_err(wav_error)?;
        }
        writer.finalize().map_err(wav_error)?;
        Ok(target)
    }
}

/// Read a WAV file as mono f32 samples in `[-1, 1]`.
pub fn read_wav(path: &Path) -> Result<(Vec<f32>, u32), PodcastError> {
    let mut reader = WavReader::open(path)
        .map_err(|e| PodcastError::Mixing(format!("Failed to open {}: {}", path.display(), e)))?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(wav_error)?,
        SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()
                .map_err(wav_error)?
        }
    };

    let channels = spec.channels.max(1) as usize;
    let mono = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect()
    };
    Ok((mono, spec.sample_rate))
}

/// Mix `bed` under `audio`, repeating it as needed.
fn overlay_looped(audio: &mut [f32], bed: &[f32], gain: f32) {
    if bed.is_empty() {
        return;
    }
    for (sample, bed_sample) in audio.iter_mut().zip(bed.iter().cycle()) {
        *sample += bed_sample * gain;
    }
}

fn wav_error(e: hound::Error) -> PodcastError {
    PodcastError::Mixing(format!("WAV error: {}", e))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::section::{AudioHandle, Voice};

    pub fn write_wav(path: &Path, samples: &[i16], rate: u32, channels: u16) {
        let spec = WavSpec {
            channels,
            sample_rate: rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    fn section_with(path: PathBuf, has_transition: bool, is_news: bool) -> Section {
        let mut section = Section::news_body("text", Voice::Male).with_audio(AudioHandle::new(path));
        section.has_transition = has_transition;
        section.is_news = is_news;
        section
    }

    #[test]
    fn test_merge_inserts_pause_after_transition() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.wav");
        let b = dir.path().join("b.wav");
        write_wav(&a, &[1000; 100], 1000, 1);
        write_wav(&b, &[2000; 50], 1000, 1);

        let effects = EffectsConfig {
            transition_pause_ms: 20,
            ..EffectsConfig::default()
        };
        let sections = vec![section_with(a, true, false), section_with(b, false, false)];
        let mixed = WavMixer
            .merge_audio(&sections, &effects, &EffectsOverride::default(), false)
            .unwrap();

        assert_eq!(mixed.sample_rate, 1000);
        assert_eq!(mixed.samples.len(), 100 + 20 + 50);
        assert_eq!(mixed.samples[110], 0.0);
    }

    #[test]
    fn test_merge_uses_transition_sound_and_bed() {
        let dir = tempfile::tempdir().unwrap();
        let speech = dir.path().join("speech.wav");
        let sting = dir.path().join("sting.wav");
        let bed = dir.path().join("bed.wav");
        write_wav(&speech, &[0; 10], 1000, 1);
        write_wav(&sting, &[8192; 5], 1000, 1);
        write_wav(&bed, &[16384; 3], 1000, 1);

        let over = EffectsOverride {
            transition_sound: Some(sting),
            news_bed: Some(bed),
            bed_gain: Some(0.5),
            ..EffectsOverride::default()
        };
        let sections = vec![
            section_with(speech.clone(), true, true),
            section_with(speech, false, false),
        ];
        let mixed = WavMixer
            .merge_audio(&sections, &EffectsConfig::default(), &over, false)
            .unwrap();

        assert_eq!(mixed.samples.len(), 10 + 5 + 10);
        assert!((mixed.samples[0] - 0.25).abs() < 1e-6);
        assert!((mixed.samples[10] - 0.25).abs() < 1e-6);
        assert_eq!(mixed.samples[20], 0.0);
    }

    #[test]
    fn test_preview_skips_jingles() {
        let dir = tempfile::tempdir().unwrap();
        let speech = dir.path().join("speech.wav");
        let jingle = dir.path().join("jingle.wav");
        write_wav(&speech, &[0; 10], 1000, 1);
        write_wav(&jingle, &[0; 7], 1000, 1);

        let effects = EffectsConfig {
            intro_jingle: Some(jingle.clone()),
            outro_jingle: Some(jingle),
            ..EffectsConfig::default()
        };
        let sections = vec![section_with(speech, false, false)];

        let full = WavMixer
            .merge_audio(&sections, &effects, &EffectsOverride::default(), false)
            .unwrap();
        let preview = WavMixer
            .merge_audio(&sections, &effects, &EffectsOverride::default(), true)
            .unwrap();
        assert_eq!(full.samples.len(), 24);
        assert_eq!(preview.samples.len(), 10);
    }

    #[test]
    fn test_merge_requires_audio() {
        let sections = vec![Section::intro("Hello", Voice::Male)];
        let result = WavMixer.merge_audio(
            &sections,
            &EffectsConfig::default(),
            &EffectsOverride::default(),
            false,
        );
        assert!(matches!(result, Err(PodcastError::Mixing(_))));
    }

    #[test]
    fn test_merge_rejects_mixed_sample_rates() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.wav");
        let b = dir.path().join("b.wav");
        write_wav(&a, &[0; 10], 1000, 1);
        write_wav(&b, &[0; 10], 2000, 1);
        let sections = vec![section_with(a, false, false), section_with(b, false, false)];
        let result = WavMixer.merge_audio(
            &sections,
            &EffectsConfig::default(),
            &EffectsOverride::default(),
            false,
        );
        assert!(matches!(result, Err(PodcastError::Mixing(_))));
    }

    #[test]
    fn test_read_wav_downmixes_stereo() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        write_wav(&path, &[16384, 0, 16384, 0], 1000, 2);
        let (samples, rate) = read_wav(&path).unwrap();
        assert_eq!(rate, 1000);
        assert_eq!(samples, vec![0.25, 0.25]);
    }

    #[test]
    fn test_export_appends_extension() {
        let dir = tempfile::tempdir().unwrap();
        let audio = ComposedAudio {
            samples: vec![0.0, 0.5, -0.5, 2.0],
            sample_rate: 8000,
        };
        let path = WavMixer
            .export(&audio, &dir.path().join("exports/Acme-20240306_080000-id"), AudioFormat::Wav)
            .unwrap();

        assert_eq!(path.file_name().unwrap().to_str().unwrap(), "Acme-20240306_080000-id.wav");
        let reader = WavReader::open(&path).unwrap();
        assert_eq!(reader.len(), 4);
    }

    #[test]
    fn test_export_rejects_mp3() {
        let dir = tempfile::tempdir().unwrap();
        let audio = ComposedAudio {
            samples: vec![0.0],
            sample_rate: 8000,
        };
        let result = WavMixer.export(&audio, &dir.path().join("out"), AudioFormat::Mp3);
        assert!(matches!(result, Err(PodcastError::Mixing(_))));
    }
}
