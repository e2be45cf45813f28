//! wyoming-silero — Silero text-to-speech over the Wyoming protocol.
//!
//! ```text
//! wyoming-silero [--language ru] [--model v5_1_ru] [--speaker kseniya] [--uri tcp://0.0.0.0:10200]
//! wyoming-silero describe [--uri tcp://127.0.0.1:10200]
//! wyoming-silero synthesize "hello world" [--voice en_0] --output hello.wav
//! ```
//!
//! Every server flag falls back to the environment variable of the same
//! setting (`SILERO_*`, `WYOMING_*`).

use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use wyoming_silero_core::catalog::VoiceCatalog;
use wyoming_silero_core::config::{self, Endpoint, RawSettings, ResolvedConfig};
use wyoming_silero_core::types::{DownloadProgress, DownloadStatus};
use wyoming_silero_core::wav;
use wyoming_silero_lib::client::WyomingClient;
use wyoming_silero_lib::download;
use wyoming_silero_lib::engine::{RemoteEngine, Synthesizer};
use wyoming_silero_lib::handler::SynthesisService;
use wyoming_silero_lib::server;

const CLIENT_URI: &str = "tcp://127.0.0.1:10200";

/// wyoming-silero — Wyoming text-to-speech server backed by Silero models
#[derive(Parser)]
#[command(name = "wyoming-silero", version, about)]
struct Cli {
    #[command(flatten)]
    serve: ServeArgs,

    #[command(subcommand)]
    command: Option<Command>,
}

/// Server settings. Values are validated after parsing, not by clap.
#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Model language (en, ru, ua, de, ...)
    #[arg(long, env = config::ENV_LANGUAGE)]
    language: Option<String>,
    /// Model name from the Silero registry
    #[arg(long, env = config::ENV_MODEL)]
    model: Option<String>,
    /// Default speaker [default: first one the model reports]
    #[arg(long, env = config::ENV_SPEAKER)]
    speaker: Option<String>,
    /// Output sample rate in Hz [default: 48000]
    #[arg(long, env = config::ENV_SAMPLE_RATE)]
    sample_rate: Option<String>,
    /// Global prosody rate (x-slow, slow, medium, fast, x-fast)
    #[arg(long, env = config::ENV_PROSODY_RATE)]
    prosody_rate: Option<String>,
    /// Global prosody pitch (x-low, low, medium, high, x-high)
    #[arg(long, env = config::ENV_PROSODY_PITCH)]
    prosody_pitch: Option<String>,
    /// Pause appended to every utterance, e.g. 500ms or 1s
    #[arg(long, env = config::ENV_BREAK_TIME)]
    break_time: Option<String>,
    /// Pause strength, ignored when a break time is set
    #[arg(long, env = config::ENV_BREAK_STRENGTH)]
    break_strength: Option<String>,
    /// Listen host [default: 0.0.0.0]
    #[arg(long, env = config::ENV_HOST)]
    host: Option<String>,
    /// Listen port [default: 10200]
    #[arg(long, env = config::ENV_PORT)]
    port: Option<String>,
    /// Listen URI (tcp://host:port or unix://path), overrides host and port
    #[arg(long, env = config::ENV_URI)]
    uri: Option<String>,
    /// Debug logging (--debug or --debug=<bool>)
    #[arg(
        long,
        env = config::ENV_DEBUG,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    debug: Option<String>,
    /// Model cache directory [default: silero/model]
    #[arg(long, env = config::ENV_CACHE_DIR)]
    cache_dir: Option<String>,
    /// Synthesis engine URL [default: http://127.0.0.1:8013]
    #[arg(long, env = config::ENV_ENGINE_URL)]
    engine_url: Option<String>,
    /// Model registry (models.yml) URL
    #[arg(long, env = config::ENV_REGISTRY_URL)]
    registry_url: Option<String>,
}

impl From<ServeArgs> for RawSettings {
    fn from(args: ServeArgs) -> Self {
        Self {
            language: args.language,
            model: args.model,
            speaker: args.speaker,
            sample_rate: args.sample_rate,
            prosody_rate: args.prosody_rate,
            prosody_pitch: args.prosody_pitch,
            break_time: args.break_time,
            break_strength: args.break_strength,
            host: args.host,
            port: args.port,
            uri: args.uri,
            debug: args.debug,
            cache_dir: args.cache_dir,
            engine_url: args.engine_url,
            registry_url: args.registry_url,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Ask a running server for its voices
    Describe {
        /// Server URI
        #[arg(long, default_value = CLIENT_URI)]
        uri: String,
    },
    /// Synthesize text on a running server and save it as WAV
    Synthesize {
        /// Text to speak
        text: String,
        /// Server URI
        #[arg(long, default_value = CLIENT_URI)]
        uri: String,
        /// Voice name
        #[arg(long)]
        voice: Option<String>,
        /// Output WAV file
        #[arg(long, short)]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        None => serve(cli.serve).await,
        Some(command) => {
            init_logging(false);
            let result = match command {
                Command::Describe { uri } => describe(&uri).await,
                Command::Synthesize {
                    text,
                    uri,
                    voice,
                    output,
                } => synthesize(&uri, &text, voice.as_deref(), &output).await,
            };
            match result {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    eprintln!("error: {e}");
                    ExitCode::FAILURE
                }
            }
        }
    }
}

fn init_logging(debug: bool) {
    let level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn serve(args: ServeArgs) -> ExitCode {
    // logging is not up yet, so configuration errors go straight to stderr
    let config = match ResolvedConfig::resolve(args.into()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_logging(config.debug);
    log_banner(&config);

    match run_server(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn log_banner(config: &ResolvedConfig) {
    info!("wyoming-silero {}", env!("CARGO_PKG_VERSION"));
    info!(
        "language: {} (advertised as {})",
        config.language,
        config.advertised_language()
    );
    info!("model: {}", config.model);
    info!(
        "speaker: {}",
        config.speaker.as_deref().unwrap_or("(first available)")
    );
    info!("sample rate: {} Hz", config.sample_rate);
    if let Some(rate) = config.prosody_rate {
        info!("prosody rate: {rate}");
    }
    if let Some(pitch) = config.prosody_pitch {
        info!("prosody pitch: {pitch}");
    }
    if let Some(time) = &config.break_time {
        info!("break time: {}", time.as_str());
    }
    if let Some(strength) = config.break_strength {
        if config.break_strength_dropped() {
            warn!("break strength {strength} ignored: break time takes priority");
        } else {
            info!("break strength: {strength}");
        }
    }
    if config.host_port_ignored {
        warn!("{} is set; {} and {} are ignored", config::ENV_URI, config::ENV_HOST, config::ENV_PORT);
    }
    info!("cache: {}", config.cache_dir.display());
    info!("engine: {}", config.engine_url);
}

async fn run_server(config: ResolvedConfig) -> wyoming_silero_lib::Result<()> {
    let registry = download::fetch_registry(&config.cache_dir, &config.registry_url).await?;
    let package = registry.resolve(&config.language, &config.model, config.sample_rate)?;
    info!("package: {}", package.url);

    let last_logged = Cell::new(-1i32);
    let package_path = download::download_package(&config.cache_dir, &package, |p| {
        log_progress(&p, &last_logged)
    })
    .await?;

    let engine = RemoteEngine::connect(&config.engine_url, &package, &package_path).await?;
    let catalog = VoiceCatalog::build(
        &config.language,
        &config.model,
        config.speaker.as_deref(),
        engine.speakers(),
    )?;
    info!(
        "{} voice(s), default speaker {}",
        catalog.voices.len(),
        catalog.default_speaker
    );

    let service = Arc::new(SynthesisService::new(
        catalog,
        Arc::new(engine),
        config.overlay(),
        config.sample_rate,
    ));

    let listener = server::bind(&config.endpoint).await?;
    info!("listening on {}", listener.local_addr());

    listener
        .serve(service, async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
}

/// Log download progress every 10%.
fn log_progress(progress: &DownloadProgress, last_logged: &Cell<i32>) {
    match progress.status {
        DownloadStatus::Complete => info!("{} ready ({} bytes)", progress.file, progress.bytes_total),
        DownloadStatus::Downloading => {
            let decile = (progress.percent / 10.0) as i32;
            if decile > last_logged.get() {
                last_logged.set(decile);
                info!("downloading {}: {:.0}%", progress.file, progress.percent);
            }
        }
    }
}

async fn describe(uri: &str) -> wyoming_silero_lib::Result<()> {
    let endpoint = Endpoint::parse(uri)?;
    let mut client = WyomingClient::connect(&endpoint).await?;
    let info = client.describe().await?;

    println!("{}", serde_json::to_string_pretty(&info)?);
    for program in &info.tts {
        println!(
            "{} {}: {} voice(s)",
            program.name,
            program.version.as_deref().unwrap_or("?"),
            program.voices.len()
        );
        for voice in &program.voices {
            println!("  {} [{}]", voice.name, voice.languages.join(", "));
        }
    }
    Ok(())
}

async fn synthesize(
    uri: &str,
    text: &str,
    voice: Option<&str>,
    output: &Path,
) -> wyoming_silero_lib::Result<()> {
    let endpoint = Endpoint::parse(uri)?;
    let mut client = WyomingClient::connect(&endpoint).await?;
    let audio = client.synthesize(text, voice).await?;

    let samples = wav::pcm16_from_le_bytes(&audio.pcm);
    tokio::fs::write(output, wav::write_wav(&samples, audio.format.rate)).await?;
    println!(
        "wrote {}: {:.2}s at {} Hz",
        output.display(),
        wav::duration_secs(audio.pcm.len(), &audio.format),
        audio.format.rate
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn server_flags_read_their_environment_variables() {
        let cmd = Cli::command();
        let env_of = |id: &str| {
            cmd.get_arguments()
                .find(|a| a.get_id() == id)
                .and_then(|a| a.get_env())
                .map(|e| e.to_string_lossy().into_owned())
        };
        assert_eq!(env_of("language").as_deref(), Some("SILERO_LANGUAGE"));
        assert_eq!(env_of("sample_rate").as_deref(), Some("SILERO_SAMPLE_RATE"));
        assert_eq!(env_of("break_strength").as_deref(), Some("SILERO_BREAK_STRENGTH"));
        assert_eq!(env_of("uri").as_deref(), Some("WYOMING_URI"));
        assert_eq!(env_of("debug").as_deref(), Some("WYOMING_DEBUG"));
    }

    #[test]
    fn flags_map_onto_raw_settings() {
        let cli = Cli::try_parse_from([
            "wyoming-silero",
            "--language",
            "ru",
            "--model",
            "v5_1_ru",
            "--speaker",
            "kseniya",
            "--debug",
        ])
        .unwrap();
        assert!(cli.command.is_none());

        let raw = RawSettings::from(cli.serve);
        assert_eq!(raw.language.as_deref(), Some("ru"));
        assert_eq!(raw.speaker.as_deref(), Some("kseniya"));
        assert_eq!(raw.debug.as_deref(), Some("true"));

        let config = ResolvedConfig::resolve(raw).unwrap();
        assert!(config.debug);
        assert_eq!(config.model, "v5_1_ru");
    }

    #[test]
    fn bare_debug_flag_does_not_swallow_the_subcommand() {
        let cli = Cli::try_parse_from(["wyoming-silero", "--debug", "describe"]).unwrap();
        assert_eq!(cli.serve.debug.as_deref(), Some("true"));
        assert!(matches!(cli.command, Some(Command::Describe { .. })));
    }

    #[test]
    fn debug_flag_takes_an_explicit_value() {
        let cli = Cli::try_parse_from(["wyoming-silero", "--debug=false"]).unwrap();
        assert_eq!(cli.serve.debug.as_deref(), Some("false"));
        assert!(!ResolvedConfig::resolve(RawSettings::from(cli.serve)).unwrap().debug);
    }

    #[test]
    fn synthesize_subcommand_parses() {
        let cli = Cli::try_parse_from([
            "wyoming-silero",
            "synthesize",
            "Привет",
            "--voice",
            "kseniya",
            "-o",
            "out.wav",
        ])
        .unwrap();
        match cli.command {
            Some(Command::Synthesize {
                text, voice, output, ..
            }) => {
                assert_eq!(text, "Привет");
                assert_eq!(voice.as_deref(), Some("kseniya"));
                assert_eq!(output, PathBuf::from("out.wav"));
            }
            _ => panic!("expected synthesize"),
        }
    }

    #[test]
    fn progress_logs_once_per_decile() {
        let last = Cell::new(-1);
        let progress = |percent| DownloadProgress {
            file: "v5_1_ru.pt".into(),
            percent,
            bytes_done: 0,
            bytes_total: 0,
            status: DownloadStatus::Downloading,
        };
        log_progress(&progress(3.0), &last);
        log_progress(&progress(7.0), &last);
        assert_eq!(last.get(), 0);
        log_progress(&progress(42.0), &last);
        assert_eq!(last.get(), 4);
    }
}
