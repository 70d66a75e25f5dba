//! Grit offline host
//!
//! Plays the role of a plugin host and its editor at once: a dedicated
//! audio thread renders a test tone through the signal chain block by
//! block while the main thread moves knobs and prints meter updates.
//!
//! ```text
//! grit-render --drive 0.8 --blend 1.0 --realtime
//! grit-render --sweep-drive --json
//! RUST_LOG=grit_core=debug grit-render --load-state patch.json
//! ```

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use crossbeam_channel::Receiver;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use grit_core::{
    ChainConfig, Event, LevelSnapshot, MeterTimer, ParamId, ParameterState, SignalChain,
};
use grit_dsp::linear_to_db;

/// Render a test tone through the Grit distortion
#[derive(Parser, Debug)]
#[command(name = "grit-render", version, about)]
struct Args {
    /// Drive amount (0.0 - 1.0)
    #[arg(long)]
    drive: Option<f32>,

    /// Drive compensation (0.0 - 1.0)
    #[arg(long)]
    range: Option<f32>,

    /// Dry/wet blend (0.0 = dry, 1.0 = wet)
    #[arg(long)]
    blend: Option<f32>,

    /// Output volume (0.0 - 3.0)
    #[arg(long)]
    volume: Option<f32>,

    /// Ramp drive from 0 to 1 over the render, as if turning the knob
    #[arg(long)]
    sweep_drive: bool,

    /// Length of the render in seconds
    #[arg(long, default_value_t = 2.0)]
    seconds: f32,

    /// Test tone frequency in Hz
    #[arg(long, default_value_t = 220.0)]
    frequency: f32,

    /// Test tone peak amplitude
    #[arg(long, default_value_t = 0.8)]
    amplitude: f32,

    #[arg(long, default_value_t = 48000.0)]
    sample_rate: f32,

    #[arg(long, default_value_t = 512)]
    block_size: usize,

    /// Pace blocks at real time instead of rendering as fast as possible
    #[arg(long)]
    realtime: bool,

    /// Print meter events as JSON lines
    #[arg(long)]
    json: bool,

    /// Load parameter state saved by --save-state before rendering
    #[arg(long)]
    load_state: Option<PathBuf>,

    /// Save the final parameter state
    #[arg(long)]
    save_state: Option<PathBuf>,
}

/// What the audio thread saw
#[derive(Debug, Default)]
struct RenderStats {
    blocks: usize,
    input_peak: f32,
    output_peak: f32,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("grit_core=info,grit_render=info")),
        )
        .init();

    let args = Args::parse();

    let config = ChainConfig {
        sample_rate: args.sample_rate,
        max_block_size: args.block_size,
        ..Default::default()
    };
    let mut chain = SignalChain::with_config(config).context("invalid chain configuration")?;
    chain.prepare(config.sample_rate, config.max_block_size)?;

    let params = chain.parameters();
    if let Some(path) = &args.load_state {
        let bytes = fs::read(path)
            .with_context(|| format!("failed to read state from {}", path.display()))?;
        params.apply_state(&ParameterState::from_bytes(&bytes)?);
        info!("Loaded parameter state from {}", path.display());
    }

    let overrides = [
        (ParamId::Drive, args.drive),
        (ParamId::Range, args.range),
        (ParamId::Blend, args.blend),
        (ParamId::Volume, args.volume),
    ];
    for (id, value) in overrides {
        if let Some(value) = value {
            let (min, max) = id.range();
            if !(min..=max).contains(&value) {
                warn!("{} = {} is outside {}..={}, clamping", id, value, min, max);
            }
            params.write(id, value);
        }
    }
    info!("Rendering with {:?}", params.snapshot());

    let total_frames = (args.seconds.max(0.0) * config.sample_rate) as usize;
    let rendered = Arc::new(AtomicUsize::new(0));

    let (mut timer, events) = MeterTimer::start(chain.meters(), config.meter.refresh_hz)?;

    let tone = Tone {
        frequency: args.frequency,
        amplitude: args.amplitude,
        sample_rate: config.sample_rate,
    };
    let rendered_clone = Arc::clone(&rendered);
    let realtime = args.realtime;
    let audio = thread::Builder::new()
        .name("grit-audio".into())
        .spawn(move || render(chain, tone, total_frames, realtime, &rendered_clone))
        .context("failed to spawn audio thread")?;

    // Control loop: knob automation and meter display
    while !audio.is_finished() {
        if args.sweep_drive && total_frames > 0 {
            let progress = rendered.load(Ordering::Relaxed) as f32 / total_frames as f32;
            params.write(ParamId::Drive, progress);
        }
        drain_events(&events, args.json);
        thread::sleep(Duration::from_millis(5));
    }

    let stats = audio
        .join()
        .map_err(|_| anyhow!("audio thread panicked"))?;

    let final_levels = timer.poll_now();
    timer.stop();
    drain_events(&events, args.json);

    print_summary(&stats, &final_levels, total_frames, config.sample_rate);

    if let Some(path) = &args.save_state {
        fs::write(path, params.state().to_bytes()?)
            .with_context(|| format!("failed to write state to {}", path.display()))?;
        info!("Saved parameter state to {}", path.display());
    }

    Ok(())
}

/// Sine test signal, right channel half a cycle behind the left
#[derive(Debug, Clone, Copy)]
struct Tone {
    frequency: f32,
    amplitude: f32,
    sample_rate: f32,
}

impl Tone {
    fn fill(&self, start_frame: usize, left: &mut [f32], right: &mut [f32]) {
        let step = std::f32::consts::TAU * self.frequency / self.sample_rate;
        for (i, (l, r)) in left.iter_mut().zip(right.iter_mut()).enumerate() {
            let phase = step * (start_frame + i) as f32;
            *l = phase.sin() * self.amplitude;
            *r = (phase + std::f32::consts::PI).sin() * self.amplitude;
        }
    }
}

/// Audio thread body: fill, process and measure one block at a time
fn render(
    mut chain: SignalChain,
    tone: Tone,
    total_frames: usize,
    realtime: bool,
    rendered: &AtomicUsize,
) -> RenderStats {
    let block_size = chain
        .context()
        .map(|c| c.max_block_size)
        .unwrap_or(512);
    let block_duration = Duration::from_secs_f32(block_size as f32 / tone.sample_rate);

    // Allocated once, before the first block
    let mut left = vec![0.0_f32; block_size];
    let mut right = vec![0.0_f32; block_size];
    let mut stats = RenderStats::default();

    let mut frame = 0;
    while frame < total_frames {
        let len = block_size.min(total_frames - frame);
        let (l, r) = (&mut left[..len], &mut right[..len]);

        tone.fill(frame, l, r);
        stats.input_peak = l.iter().chain(r.iter()).fold(stats.input_peak, |p, s| p.max(s.abs()));

        chain.process(&mut [&mut *l, &mut *r]);
        stats.output_peak = l.iter().chain(r.iter()).fold(stats.output_peak, |p, s| p.max(s.abs()));

        frame += len;
        stats.blocks += 1;
        rendered.store(frame, Ordering::Relaxed);

        if realtime {
            thread::sleep(block_duration);
        }
    }

    chain.release();
    stats
}

fn drain_events(events: &Receiver<Event>, json: bool) {
    for event in events.try_iter() {
        match event {
            Event::LevelUpdate(levels) if json => match serde_json::to_string(&levels) {
                Ok(line) => println!("{}", line),
                Err(e) => warn!("Failed to encode levels: {}", e),
            },
            Event::LevelUpdate(levels) => println!("{}", format_levels(&levels)),
            Event::Stopped => {}
        }
    }
}

fn format_levels(levels: &LevelSnapshot) -> String {
    format!(
        "in  L {:6.1} dB  R {:6.1} dB | out L {:6.1} dB  R {:6.1} dB",
        levels.input_left, levels.input_right, levels.output_left, levels.output_right
    )
}

fn print_summary(stats: &RenderStats, levels: &LevelSnapshot, frames: usize, sample_rate: f32) {
    println!(
        "Rendered {} frames ({:.2}s) in {} blocks",
        frames,
        frames as f32 / sample_rate,
        stats.blocks
    );
    println!(
        "Peak in {:.3} ({:.1} dBFS), peak out {:.3} ({:.1} dBFS)",
        stats.input_peak,
        linear_to_db(stats.input_peak, -120.0, 24.0),
        stats.output_peak,
        linear_to_db(stats.output_peak, -120.0, 24.0)
    );
    println!("Final meters: {}", format_levels(levels));
}
