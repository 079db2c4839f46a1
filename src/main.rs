use anyhow::Context;
use bleepd::asr::recognizer::Recognizer;
use bleepd::audio::{self, AudioIo};
use bleepd::censor::CensorMode;
use bleepd::config::Config;
use bleepd::engine::{Engine, EngineConfig};
use bleepd::{Lexicon, defaults};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "bleepd", version, about = "Real-time audio profanity filter")]
struct Cli {
    /// Configuration file (default: ~/.config/bleepd/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run the filter between the configured input and output devices
    Run {
        /// Input device name override
        #[arg(long)]
        input_device: Option<String>,
        /// Output device name override
        #[arg(long)]
        output_device: Option<String>,
        /// Whisper model path override
        #[arg(long)]
        model: Option<PathBuf>,
        /// Profanity lexicon path override
        #[arg(long)]
        lexicon: Option<PathBuf>,
        /// Censor mode override (mute or reverse)
        #[arg(long)]
        mode: Option<String>,
        /// Suppress status messages
        #[arg(short, long)]
        quiet: bool,
    },
    /// List available audio devices
    Devices,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    audio::suppress_audio_warnings();

    let config_path = cli.config.unwrap_or_else(Config::default_path);
    let config = Config::load_or_default(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?
        .with_env_overrides();

    match cli.command {
        Some(Commands::Run {
            input_device,
            output_device,
            model,
            lexicon,
            mode,
            quiet,
        }) => {
            let mut config = config;
            if let Some(device) = input_device {
                config.audio.input_device = Some(device);
            }
            if let Some(device) = output_device {
                config.audio.output_device = Some(device);
            }
            if let Some(path) = model {
                config.asr.model = path;
            }
            if let Some(path) = lexicon {
                config.censor.lexicon = path;
            }
            if let Some(mode) = mode {
                config.censor.mode = parse_mode(&mode)?;
            }
            run(config, quiet).await
        }
        Some(Commands::Devices) => list_devices(),
        None => {
            println!("bleepd - Real-time audio profanity filter");
            println!("Run with `bleepd run` or see --help for usage");
            Ok(())
        }
    }
}

fn parse_mode(mode: &str) -> anyhow::Result<CensorMode> {
    match mode {
        "mute" => Ok(CensorMode::Mute),
        "reverse" => Ok(CensorMode::Reverse),
        other => anyhow::bail!("unknown censor mode '{other}' (expected mute or reverse)"),
    }
}

fn list_devices() -> anyhow::Result<()> {
    println!("Input devices:");
    for name in audio::list_input_devices()? {
        println!("  {name}");
    }
    println!("Output devices:");
    for name in audio::list_output_devices()? {
        println!("  {name}");
    }
    Ok(())
}

async fn run(config: Config, quiet: bool) -> anyhow::Result<()> {
    if !quiet {
        eprintln!("bleepd {} ({})", env!("CARGO_PKG_VERSION"), defaults::gpu_backend());
        eprintln!(
            "  input:  {}",
            config.audio.input_device.as_deref().unwrap_or("default")
        );
        eprintln!(
            "  output: {}",
            config.audio.output_device.as_deref().unwrap_or("default")
        );
        eprintln!(
            "  {} Hz, {} ch, {:?} mode, {:.0}s delay",
            config.audio.sample_rate,
            config.audio.channels,
            config.censor.mode,
            config.engine.initial_delay_secs,
        );
        eprintln!("Loading lexicon from {}...", config.censor.lexicon.display());
    }

    let lexicon = Arc::new(Lexicon::load(&config.censor.lexicon)?);
    if !quiet {
        eprintln!("Lexicon loaded: {} entries", lexicon.len());
        eprintln!("Loading model '{}'...", config.asr.model.display());
    }

    let recognizer = build_recognizer(&config)?;
    if !quiet {
        eprintln!("Model loaded.");
    }

    let engine = Arc::new(Engine::new(
        EngineConfig {
            sample_rate: config.audio.sample_rate,
            channels: config.audio.channels,
            chunk_seconds: config.engine.chunk_secs,
            initial_delay_seconds: config.engine.initial_delay_secs,
            delay_headroom_seconds: defaults::DELAY_HEADROOM_SECONDS,
            censor_mode: config.censor.mode,
            enable_vocal_filter: config.asr.vocal_filter,
            enable_timestamp_refiner: config.asr.timestamp_refiner,
            quiet,
        },
        lexicon,
        recognizer,
    )?);
    engine.start()?;

    let mut io = AudioIo::start(
        Arc::clone(&engine),
        config.audio.input_device.as_deref(),
        config.audio.output_device.as_deref(),
    )?;

    if !quiet {
        eprintln!("bleepd running; press Ctrl+C to stop.");
    }

    // Periodic monitor line, cancelled on shutdown.
    let monitor = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(10));
            ticker.tick().await; // immediate first tick
            loop {
                ticker.tick().await;
                if !quiet {
                    let stats = engine.stats();
                    eprintln!(
                        "bleepd: {:?}, {:.1}s buffered, {} hits ({} skipped, {} frames leaked)",
                        stats.gate,
                        stats.fill_seconds,
                        stats.profanity_hits,
                        stats.skipped_hits,
                        stats.leaked_frames,
                    );
                }
            }
        })
    };

    // Wait for SIGTERM or SIGINT
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            if !quiet {
                eprintln!("\nReceived SIGINT, shutting down...");
            }
        }
        res = wait_for_sigterm() => {
            if let Err(e) = res {
                eprintln!("Error setting up signal handler: {}", e);
            } else if !quiet {
                eprintln!("\nReceived SIGTERM, shutting down...");
            }
        }
    }

    monitor.abort();
    io.stop();
    engine.stop();

    if !quiet {
        let stats = engine.stats();
        eprintln!(
            "bleepd stopped: {} chunks transcribed, {} profanities censored",
            stats.chunks_processed, stats.profanity_hits,
        );
    }
    Ok(())
}

/// Wait for SIGTERM (used by systemd).
async fn wait_for_sigterm() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};
    let mut sigterm = signal(SignalKind::terminate())?;
    sigterm.recv().await;
    Ok(())
}

#[cfg(feature = "whisper")]
fn build_recognizer(config: &Config) -> anyhow::Result<Arc<dyn Recognizer>> {
    use bleepd::asr::recognizer::{WhisperRecognizer, WhisperRecognizerConfig};

    let recognizer = WhisperRecognizer::new(WhisperRecognizerConfig {
        model_path: config.asr.model.clone(),
        language: config.asr.language.clone(),
        threads: config.asr.threads,
        use_gpu: config.asr.use_gpu,
    })?;
    Ok(Arc::new(recognizer))
}

#[cfg(not(feature = "whisper"))]
fn build_recognizer(_config: &Config) -> anyhow::Result<Arc<dyn Recognizer>> {
    anyhow::bail!(
        "This binary was built without speech recognition.\n\
         Rebuild with the default features: cargo build --release"
    )
}
