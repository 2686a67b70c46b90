//! flight-sonifier - audible bank angle and vertical rate cues
//!
//! Reads binary telemetry frames from a WebSocket (or the built-in
//! simulator), decodes them, and drives two pulsed tones.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use flight_sonifier::audio::{list_output_devices, AudioEngine};
use flight_sonifier::logging::{default_log_path, init_logging};
use flight_sonifier::sonify::{RollChannel, TelemetryMapper, VerticalChannel};
use flight_sonifier::telemetry::{decode, FrameSimulator};
use flight_sonifier::transport::WebSocketSource;
use flight_sonifier::SonifierConfig;

/// Frames buffered between the source and the mapper
const FRAME_QUEUE: usize = 64;

#[derive(Parser)]
#[command(name = "flight-sonifier")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log filter, overrides the configured level
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log to a file (default location when no path is given)
    #[arg(long, global = true)]
    log_file: Option<Option<PathBuf>>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sonify frames received from the telemetry WebSocket
    Listen {
        /// Server URL, overrides the configured one
        #[arg(long)]
        url: Option<String>,

        #[command(flatten)]
        channels: ChannelArgs,
    },

    /// Sonify frames from the built-in simulator
    Simulate {
        /// Bank angle in degrees
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        roll: f64,

        /// Value fed to the vertical channel
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        vertical: f64,

        /// Stop after this many seconds (runs until Ctrl+C otherwise)
        #[arg(long)]
        seconds: Option<u64>,

        #[command(flatten)]
        channels: ChannelArgs,
    },

    /// Decode one binary frame file and print it as JSON
    Decode {
        file: PathBuf,
    },

    /// List audio output devices
    Devices,
}

#[derive(clap::Args)]
struct ChannelArgs {
    /// Keep the bank-angle tone off
    #[arg(long)]
    no_roll: bool,

    /// Keep the vertical tone off
    #[arg(long)]
    no_vertical: bool,
}

/// Where frames come from
enum Source {
    WebSocket(WebSocketSource),
    Simulator(Arc<FrameSimulator>),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{:#}", e);
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = SonifierConfig::load(cli.config.as_deref())
        .with_context(|| format!("Failed to load config {:?}", cli.config))?;
    if let Some(level) = cli.log_level {
        config.log.level = level;
    }
    if let Some(file) = cli.log_file {
        config.log.file = Some(file.unwrap_or_else(default_log_path));
    }
    init_logging(&config.log).context("Failed to initialize logging")?;

    match cli.command {
        Commands::Listen { url, channels } => {
            if let Some(url) = url {
                config.transport.url = url;
            }
            channels.apply(&mut config);
            let source = Source::WebSocket(WebSocketSource::new(config.transport.clone()));
            run_pipeline(&config, source, None)
        }
        Commands::Simulate {
            roll,
            vertical,
            seconds,
            channels,
        } => {
            channels.apply(&mut config);
            let simulator = FrameSimulator::new(config.vertical.source);
            simulator.set_roll(roll);
            simulator.set_vertical(vertical);
            let source = Source::Simulator(Arc::new(simulator));
            run_pipeline(&config, source, seconds.map(Duration::from_secs))
        }
        Commands::Decode { file } => {
            let bytes = std::fs::read(&file).with_context(|| format!("Failed to read {:?}", file))?;
            let frame = decode(&bytes).with_context(|| format!("Failed to decode {:?}", file))?;
            println!("{}", serde_json::to_string_pretty(&frame)?);
            Ok(())
        }
        Commands::Devices => {
            for device in list_output_devices()? {
                let marker = if device.is_default { " (default)" } else { "" };
                println!("{}{}", device.name, marker);
            }
            Ok(())
        }
    }
}

impl ChannelArgs {
    fn apply(&self, config: &mut SonifierConfig) {
        if self.no_roll {
            config.roll.enabled = false;
        }
        if self.no_vertical {
            config.vertical.enabled = false;
        }
    }
}

/// create engine -> configure voices -> start -> feed frames -> stop -> drop
fn run_pipeline(config: &SonifierConfig, source: Source, limit: Option<Duration>) -> Result<()> {
    let mut engine = AudioEngine::new(&config.audio).context("Failed to open audio output")?;
    let roll_voice = engine.create_voice("roll", RollChannel::new(config.roll.clone()).initial_params())?;
    let vertical_voice = engine.create_voice(
        "vertical",
        VerticalChannel::new(config.vertical.clone()).initial_params(),
    )?;
    engine.start().context("Failed to start audio output")?;
    log::info!(
        "Output running at {} Hz, {} channel(s)",
        engine.sample_rate(),
        engine.channels()
    );

    let mut mapper = TelemetryMapper::new(
        roll_voice,
        vertical_voice,
        config.roll.clone(),
        config.vertical.clone(),
    );
    if config.roll.enabled {
        if let Err(e) = mapper.enable_roll() {
            log::warn!("Roll tone unavailable: {}", e);
        }
    }
    if config.vertical.enabled {
        if let Err(e) = mapper.enable_vertical() {
            log::warn!("Vertical tone unavailable: {}", e);
        }
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    let stats = runtime.block_on(feed_frames(&mut mapper, source, limit));
    log::info!(
        "Processed {} frame(s), rejected {}",
        stats.decoded,
        stats.rejected
    );

    mapper.disable_roll();
    mapper.disable_vertical();
    engine.stop();
    log::debug!("Audio engine {:?}", engine.state());
    Ok(())
}

#[derive(Default)]
struct FeedStats {
    decoded: u64,
    rejected: u64,
}

async fn feed_frames(
    mapper: &mut TelemetryMapper,
    source: Source,
    limit: Option<Duration>,
) -> FeedStats {
    let (tx, mut rx) = mpsc::channel::<Vec<u8>>(FRAME_QUEUE);
    let simulator = match source {
        Source::WebSocket(ws) => {
            tokio::spawn(ws.run(tx));
            None
        }
        Source::Simulator(sim) => {
            tokio::spawn(Arc::clone(&sim).run(tx));
            Some(sim)
        }
    };

    let deadline = async {
        match limit {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);

    let mut stats = FeedStats::default();
    loop {
        tokio::select! {
            buf = rx.recv() => {
                let Some(buf) = buf else { break };
                match decode(&buf) {
                    Ok(frame) => {
                        stats.decoded += 1;
                        mapper.process_frame(&frame);
                    }
                    Err(e) => {
                        stats.rejected += 1;
                        log::warn!("Dropping frame: {}", e);
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("Interrupted, shutting down");
                break;
            }
            _ = &mut deadline => {
                log::info!("Time limit reached");
                break;
            }
        }
    }

    if let Some(sim) = simulator {
        sim.stop();
    }
    stats
}
