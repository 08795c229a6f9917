use std::{
    f32::consts::TAU,
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use clap::{Parser, Subcommand};
use spectral_bands_core::{
    AppConfig, BeatDetection, ChannelSelector, SampleSink, SpectralError, SpectrumAnalyzer,
};
use tracing_subscriber::EnvFilter;

const BAR_GLYPHS: [char; 9] = [' ', '▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

fn main() -> spectral_bands_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    if cli.per_band_beats {
        config.analyzer.beat_detection = BeatDetection::PerBandFallingEdge;
    }

    match cli.command {
        Commands::Demo {
            ticks,
            frequency,
            kick_every,
        } => run_demo(&config, ticks, frequency, kick_every),
        Commands::Analyse { input, output } => run_analyse(&config, &input, &output),
    }
}

fn run_demo(
    config: &AppConfig,
    ticks: usize,
    frequency: f32,
    kick_every: usize,
) -> spectral_bands_core::Result<()> {
    tracing::info!(ticks, frequency, kick_every, "starting synthetic demo");

    let mut analyzer = SpectrumAnalyzer::new(config.analyzer.clone());
    let sample_rate = config.audio.sample_rate.max(1) as f32;
    let block = analyzer.buffer_size();
    let mut block_samples = vec![0.0; block];
    let mut position = 0usize;

    for tick in 0..ticks {
        let kick = kick_every > 0 && tick % kick_every == 0;
        for sample in block_samples.iter_mut() {
            let t = position as f32 / sample_rate;
            let mut value = 0.3 * (TAU * frequency * t).sin();
            if kick {
                value += 0.8 * (TAU * 60.0 * t).sin();
            }
            *sample = value;
            position += 1;
        }

        analyzer.push(&block_samples);
        analyzer.update();
        println!("{}", render_log_bars(&analyzer));
    }

    tracing::info!(
        average_peak = analyzer.average_peak(),
        bands = analyzer.log().band_count(),
        "demo finished"
    );
    Ok(())
}

fn run_analyse(config: &AppConfig, input: &Path, output: &Path) -> spectral_bands_core::Result<()> {
    tracing::info!(?input, ?output, "analysing raw f32 stream");

    let bytes = std::fs::read(input)?;
    if bytes.len() % 4 != 0 {
        return Err(SpectralError::InvalidInput(
            "input must be little-endian f32 samples",
        ));
    }
    let samples: Vec<f32> = bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();

    let mut selector = ChannelSelector::new(config.audio.channels, config.audio.input_channel)?;
    let mono = selector.extract(&samples).to_vec();

    let mut analyzer = SpectrumAnalyzer::new(config.analyzer.clone());
    let mut writer = BufWriter::new(File::create(output)?);

    for chunk in mono.chunks(analyzer.buffer_size()) {
        analyzer.push(chunk);
        analyzer.update();
        serde_json::to_writer(&mut writer, &analyzer.snapshot())?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;

    tracing::info!(ticks = analyzer.ticks(), "analysis written");
    Ok(())
}

/// One text row per tick: a bar glyph per log band, `*` after bands that beat.
fn render_log_bars(analyzer: &SpectrumAnalyzer) -> String {
    let log = analyzer.log();
    let mut line = String::with_capacity(log.band_count() * 2);
    for (norm, beat) in log.norm().iter().zip(log.beats()) {
        let level = (norm.clamp(0.0, 1.0) * (BAR_GLYPHS.len() - 1) as f32).round() as usize;
        line.push(BAR_GLYPHS[level]);
        line.push(if *beat { '*' } else { ' ' });
    }
    line
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Spectral band tracker and beat detector", long_about = None)]
struct Cli {
    /// JSON configuration file with `analyzer` and `audio` sections.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Flag beats per band instead of comparing whole cut sequences.
    #[arg(long, global = true)]
    per_band_beats: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a synthesized tone with periodic kicks and print the log bands.
    Demo {
        /// Number of ticks to run.
        #[arg(short, long, default_value_t = 120)]
        ticks: usize,
        /// Frequency of the steady tone in Hz.
        #[arg(short, long, default_value_t = 440.0)]
        frequency: f32,
        /// Insert a low kick every N ticks; 0 disables it.
        #[arg(short, long, default_value_t = 8)]
        kick_every: usize,
    },
    /// Analyse interleaved little-endian f32 PCM and write JSON lines.
    Analyse {
        /// Path to the raw sample file.
        input: PathBuf,
        /// Output path for one snapshot per line.
        output: PathBuf,
    },
}
