//! podcastgen CLI - Podcast Generator
//!
//! A command-line tool that assembles, renders and publishes podcast episodes.

use clap::{Parser, Subcommand};
use colored::Colorize;
use podcastgen_core::{
    AudioFormat, BlobStorageUploader, BuzzsproutUploader, ContentConfig, EffectsOverride,
    FileShareUploader, GenerationOptions, GenerationService, InlineContentSource, KokoroSynthesizer,
    Language, OpenWeatherClient, PodcastRequest, Publisher, Settings, SynthesisMode, Voice, WavMixer,
    default_settings,
};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "podcastgen",
    version,
    about = "Podcast Generator - Turn news into spoken episodes",
    long_about = "A CLI tool that sequences podcast sections, synthesizes them with a local TTS engine and publishes the mixed episode."
)]
struct Cli {
    /// Settings file (TOML)
    #[arg(long, global = true, default_value = "config/podcastgen.toml", value_name = "FILE")]
    settings: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate and publish an episode from a request file
    Generate {
        /// Request document (JSON)
        #[arg(value_name = "REQUEST")]
        request: PathBuf,

        /// Reuse pre-rendered audio from the placeholder directory
        #[arg(long)]
        replay: bool,

        /// Publication service (azblobstorage, azfileshare, buzzsprout)
        #[arg(long, default_value = "azblobstorage", value_name = "SERVICE")]
        service: String,

        /// Audio format of the export
        #[arg(long, default_value = "wav", value_name = "FORMAT")]
        format: String,

        /// Keep section audio and the local export
        #[arg(long)]
        keep_export: bool,
    },
    /// Render a single section without intro, outro or transitions
    Preview {
        /// Section content (JSON mapping or list)
        #[arg(value_name = "SECTION")]
        section: PathBuf,

        #[arg(long, default_value = "es", value_name = "LANG")]
        lang: String,
    },
    /// Synthesize one utterance
    Voice {
        #[arg(value_name = "TEXT")]
        text: String,

        #[arg(long, default_value = "male", value_name = "VOICE")]
        voice: String,

        #[arg(long, default_value = "es", value_name = "LANG")]
        lang: String,
    },
    /// List the sources behind a request's news
    News {
        #[arg(value_name = "REQUEST")]
        request: PathBuf,
    },
}

impl Command {
    /// Whether the subcommand renders speech and needs the TTS engine.
    fn synthesizes(&self) -> bool {
        !matches!(self, Command::News { .. })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();
    init_tracing()?;

    let cli = Cli::parse();
    let settings = load_settings(&cli.settings)?;
    let service = build_service(settings, cli.command.synthesizes()).await?;

    match cli.command {
        Command::Generate {
            request,
            replay,
            service: upload_service,
            format,
            keep_export,
        } => {
            let request = PodcastRequest::load(&request)?;
            let mode = if replay {
                SynthesisMode::Replay {
                    dir: service.settings().paths.placeholder_dir.clone(),
                }
            } else {
                SynthesisMode::Live
            };
            let options = GenerationOptions {
                service: upload_service,
                format: parse_format(&format)?,
                mode,
                clean_up: !keep_export,
            };

            print_header(&format!("Generating '{}' for {}", request.name, request.org));
            let submission = service.submit(request, options).await?;
            println!("{} {}", "Request:".bold(), submission.request_id.dimmed());
            println!("{} {}", "File:".bold(), submission.filename);
            println!("{} {}", "Destination:".bold(), submission.destination_url.bright_white());
            println!();
            println!("{}", "Rendering in the background...".dimmed());

            match submission.handle.await? {
                Ok(report) => {
                    println!();
                    println!("{}", "  Episode published.".bright_green().bold());
                    println!("  {}", report.url.bright_cyan());
                }
                Err(e) => {
                    eprintln!("{} {}", "Error:".red().bold(), e);
                    std::process::exit(1);
                }
            }
        }
        Command::Preview { section, lang } => {
            let content: ContentConfig = serde_json::from_str(&std::fs::read_to_string(&section)?)?;
            let artifact = service
                .preview_section(
                    content,
                    parse_language(&lang)?,
                    &EffectsOverride::default(),
                    AudioFormat::Wav,
                )
                .await?;
            println!("{} {}", "Preview:".bold(), artifact.path.display().to_string().bright_cyan());
        }
        Command::Voice { text, voice, lang } => {
            let voice = Voice::from_name(&voice)
                .ok_or_else(|| format!("Unknown voice: '{}'. Available voices: male, female", voice))?;
            let audio = service
                .preview_voice(&text, voice, parse_language(&lang)?, AudioFormat::Wav)
                .await?;
            println!("{} {}", "Audio:".bold(), audio.path().display().to_string().bright_cyan());
        }
        Command::News { request } => {
            let request = PodcastRequest::load(&request)?;
            let sources = service.list_sources(&request).await?;
            print_header(&format!("Sources for '{}'", request.name));
            if sources.is_empty() {
                println!("{}", "  No sources.".dimmed());
            }
            for (origin, urls) in &sources {
                println!("{}", origin.yellow().bold());
                for url in urls {
                    println!("  {}", url);
                }
            }
        }
    }

    Ok(())
}

fn init_tracing() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::from_default_env()
        .add_directive("podcastgen=info".parse()?)
        .add_directive("podcastgen_core=info".parse()?);
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false).compact())
        .try_init();
    Ok(())
}

fn load_settings(path: &Path) -> Result<Settings, Box<dyn std::error::Error>> {
    if path.exists() {
        Ok(Settings::load(path)?)
    } else {
        warn!("{} not found, using default settings", path.display());
        Ok(default_settings())
    }
}

async fn build_service(
    settings: Settings,
    with_synthesizer: bool,
) -> Result<GenerationService, Box<dyn std::error::Error>> {
    let synthesizer = if with_synthesizer {
        info!("Loading TTS engine");
        Some(KokoroSynthesizer::new(settings.voices.clone(), settings.paths.transient_dir.clone()).await?)
    } else {
        None
    };

    let buzzsprout = match (env::var("BUZZSPROUT_PODCAST_ID"), env::var("BUZZSPROUT_API_TOKEN")) {
        (Ok(id), Ok(token)) => Some(BuzzsproutUploader::new(id, token)?),
        _ => None,
    };
    let publisher = Publisher::new(
        FileShareUploader::new(settings.paths.share_dir.clone()),
        BlobStorageUploader::new()?,
        buzzsprout,
    );

    let weather = match env::var("OPENWEATHER_API_KEY") {
        Ok(key) => Some(OpenWeatherClient::new(settings.weather.clone(), key)?),
        Err(_) => {
            warn!("OPENWEATHER_API_KEY not set, intros will not mention the weather");
            None
        }
    };

    let mut service = GenerationService::new(
        settings,
        Arc::new(WavMixer),
        Arc::new(publisher),
        Arc::new(InlineContentSource),
    );
    if let Some(synthesizer) = synthesizer {
        service = service.with_synthesizer(Arc::new(synthesizer));
    }
    if let Some(client) = weather {
        service = service.with_weather(Arc::new(client));
    }
    Ok(service)
}

fn parse_language(code: &str) -> Result<Language, String> {
    Language::from_code(code)
        .ok_or_else(|| format!("Unknown language: '{}'. Available languages: es, ca, en", code))
}

fn parse_format(name: &str) -> Result<AudioFormat, String> {
    AudioFormat::from_name(name)
        .ok_or_else(|| format!("Unknown audio format: '{}'. Available formats: wav, mp3", name))
}

fn print_header(title: &str) {
    println!();
    println!("{}", "═".repeat(70).bright_blue());
    println!("{}", format!("  {}", title).bright_blue().bold());
    println!("{}", "═".repeat(70).bright_blue());
    println!();
}
