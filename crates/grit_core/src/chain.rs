//! Signal Chain
//!
//! Runs the distortion on the audio thread:
//!
//! ```text
//!            ┌──────────────── dry ────────────────┐
//! input ─▶ sanitize ─▶ boost ─▶ shape ─▶ trim ─▶ blend ─▶ volume ─▶ output
//!            │                                                     │
//!            └─▶ input meters                      output meters ◀─┘
//! ```
//!
//! # Lifecycle
//!
//! `Unprepared` ──prepare()──▶ `Prepared` ──release()──▶ `Unprepared`
//!
//! `prepare` and `release` take `&mut self`, so the borrow checker keeps
//! them from overlapping `process` on the same chain. Calling `process`
//! while unprepared is a host bug caught by a debug assertion.

use std::sync::Arc;

use tracing::{debug, info};

use grit_dsp::{mix, AudioProcessor, GainStage, ProcessContext};

use crate::config::ChainConfig;
use crate::error::GritResult;
use crate::levels::MeterBank;
use crate::params::{ParameterBridge, ParameterSnapshot};

#[derive(Debug, Clone, Copy, PartialEq)]
enum ChainState {
    Unprepared,
    Prepared(ProcessContext),
}

/// The real-time distortion processor
///
/// Owned by the audio thread. The control thread keeps clones of the
/// parameter bridge and meter bank.
pub struct SignalChain {
    params: Arc<ParameterBridge>,
    meters: Arc<MeterBank>,
    config: ChainConfig,
    state: ChainState,
}

impl SignalChain {
    /// Create an unprepared chain with default configuration
    pub fn new() -> GritResult<Self> {
        Self::with_config(ChainConfig::default())
    }

    /// Create an unprepared chain with its own bridge and meters
    pub fn with_config(config: ChainConfig) -> GritResult<Self> {
        config.validate()?;
        let meters = Arc::new(MeterBank::new(config.sample_rate, &config.meter)?);
        Ok(Self::with_shared(
            Arc::new(ParameterBridge::new()),
            meters,
            config,
        ))
    }

    /// Create an unprepared chain around an existing bridge and meter bank
    pub fn with_shared(
        params: Arc<ParameterBridge>,
        meters: Arc<MeterBank>,
        config: ChainConfig,
    ) -> Self {
        Self {
            params,
            meters,
            config,
            state: ChainState::Unprepared,
        }
    }

    /// Handle for the control thread to write parameters
    pub fn parameters(&self) -> Arc<ParameterBridge> {
        Arc::clone(&self.params)
    }

    /// Handle for the control thread to read meters
    pub fn meters(&self) -> Arc<MeterBank> {
        Arc::clone(&self.meters)
    }

    pub fn is_prepared(&self) -> bool {
        matches!(self.state, ChainState::Prepared(_))
    }

    /// Stream metadata of the current session
    pub fn context(&self) -> Option<ProcessContext> {
        match self.state {
            ChainState::Prepared(context) => Some(context),
            ChainState::Unprepared => None,
        }
    }

    /// Enter the prepared state for a new session
    ///
    /// Safe to call again between sessions when the sample rate or block
    /// size changes. Resets every meter to silence.
    pub fn prepare(&mut self, sample_rate: f32, max_block_size: usize) -> GritResult<()> {
        let config = ChainConfig {
            sample_rate,
            max_block_size,
            ..self.config
        };
        config.validate()?;

        self.meters.set_sample_rate(sample_rate)?;
        self.meters.reset();

        let context = ProcessContext::new(sample_rate, config.channels, max_block_size);
        self.config = config;
        self.state = ChainState::Prepared(context);

        info!(
            "Signal chain prepared: {}Hz, {} frames ({:.2}ms), {} channel(s)",
            sample_rate,
            max_block_size,
            config.latency_ms(),
            config.channels
        );
        Ok(())
    }

    /// Leave the prepared state
    pub fn release(&mut self) {
        if self.is_prepared() {
            debug!("Signal chain released");
        }
        self.state = ChainState::Unprepared;
    }

    /// Process one block of planar audio in-place
    ///
    /// One slice per channel, each no longer than the prepared block size.
    ///
    /// # Real-time Safety
    /// No allocations, no locks, O(frames × channels) time.
    pub fn process(&mut self, channels: &mut [&mut [f32]]) {
        let Some(context) = self.ready() else {
            return;
        };
        debug_assert!(
            channels.iter().all(|c| c.len() <= context.max_block_size),
            "block larger than prepared size {}",
            context.max_block_size
        );

        let params = self.params.snapshot();
        let stage = GainStage::new(params.drive, params.range);

        for (channel, samples) in channels.iter_mut().enumerate() {
            for sample in samples.iter_mut() {
                *sample = self.process_sample(&stage, &params, channel, *sample);
            }
        }
    }

    /// Process one block of interleaved audio in-place
    ///
    /// Buffer format is [L0, R0, L1, R1, ...] for stereo.
    pub fn process_interleaved(&mut self, buffer: &mut [f32], channels: usize) {
        let Some(context) = self.ready() else {
            return;
        };
        if channels == 0 {
            return;
        }
        debug_assert!(
            buffer.len() / channels <= context.max_block_size,
            "block larger than prepared size {}",
            context.max_block_size
        );

        let params = self.params.snapshot();
        let stage = GainStage::new(params.drive, params.range);

        for frame in buffer.chunks_mut(channels) {
            for (channel, sample) in frame.iter_mut().enumerate() {
                *sample = self.process_sample(&stage, &params, channel, *sample);
            }
        }
    }

    /// Context of the prepared session, or `None` after flagging misuse
    #[inline]
    fn ready(&self) -> Option<ProcessContext> {
        let context = self.context();
        debug_assert!(context.is_some(), "process() called on an unprepared chain");
        context
    }

    #[inline]
    fn process_sample(
        &self,
        stage: &GainStage,
        params: &ParameterSnapshot,
        channel: usize,
        sample: f32,
    ) -> f32 {
        // Non-finite input is treated as silence before it reaches any stage
        let dry = if sample.is_finite() { sample } else { 0.0 };
        self.meters.update_input(channel, dry);

        let output = mix(dry, stage.apply(dry), params.blend) * params.volume;
        self.meters.update_output(channel, output);
        output
    }
}

impl AudioProcessor for SignalChain {
    fn process(&mut self, buffer: &mut [f32], context: &ProcessContext) {
        self.process_interleaved(buffer, context.channels);
    }

    fn reset(&mut self) {
        self.meters.reset();
    }

    fn name(&self) -> &'static str {
        "Grit Distortion"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::levels::LevelSnapshot;
    use crate::params::ParamId;

    fn prepared_chain() -> SignalChain {
        let mut chain = SignalChain::new().unwrap();
        chain.prepare(48000.0, 512).unwrap();
        chain
    }

    fn sine(len: usize, amplitude: f32) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 48000.0).sin() * amplitude)
            .collect()
    }

    fn peak(buffer: &[f32]) -> f32 {
        buffer.iter().fold(0.0_f32, |acc, s| acc.max(s.abs()))
    }

    #[test]
    fn test_lifecycle() {
        let mut chain = SignalChain::new().unwrap();
        assert!(!chain.is_prepared());
        assert!(chain.context().is_none());

        chain.prepare(44100.0, 256).unwrap();
        assert!(chain.is_prepared());
        assert_eq!(chain.context(), Some(ProcessContext::new(44100.0, 2, 256)));

        // Re-prepare with a new block size between sessions
        chain.prepare(96000.0, 1024).unwrap();
        assert_eq!(chain.context().unwrap().max_block_size, 1024);

        chain.release();
        assert!(!chain.is_prepared());
    }

    #[test]
    fn test_prepare_rejects_invalid() {
        let mut chain = SignalChain::new().unwrap();
        assert!(chain.prepare(0.0, 512).is_err());
        assert!(chain.prepare(48000.0, 0).is_err());
        assert!(!chain.is_prepared());
    }

    #[test]
    fn test_silence_in_silence_out() {
        let mut chain = prepared_chain();
        chain.parameters().write(ParamId::Drive, 1.0);
        chain.parameters().write(ParamId::Volume, 3.0);

        let mut left = vec![0.0; 512];
        let mut right = vec![0.0; 512];
        chain.process(&mut [&mut left, &mut right]);

        assert!(left.iter().chain(right.iter()).all(|&s| s == 0.0));
        assert_eq!(chain.meters().snapshot(), LevelSnapshot::uniform(-60.0));
    }

    #[test]
    fn test_prepare_resets_meters() {
        let mut chain = prepared_chain();
        let mut left = vec![0.9; 64];
        let mut right = vec![0.9; 64];
        chain.process(&mut [&mut left, &mut right]);
        assert!(chain.meters().snapshot().input_left > -60.0);

        chain.prepare(48000.0, 512).unwrap();
        assert_eq!(chain.meters().snapshot(), LevelSnapshot::uniform(-60.0));
    }

    #[test]
    fn test_dry_path_scaled_by_volume_only() {
        let mut chain = prepared_chain();
        let params = chain.parameters();
        params.write(ParamId::Drive, 0.0);
        params.write(ParamId::Blend, 0.0);
        params.write(ParamId::Volume, 0.5);

        let input = sine(512, 0.8);
        let mut left = input.clone();
        let mut right = input.clone();
        chain.process(&mut [&mut left, &mut right]);

        for (out, dry) in left.iter().zip(input.iter()) {
            assert_eq!(*out, dry * 0.5);
        }
        assert_eq!(left, right);
    }

    #[test]
    fn test_full_drive_saturates() {
        let mut chain = prepared_chain();
        let params = chain.parameters();
        params.write(ParamId::Drive, 1.0);
        params.write(ParamId::Range, 0.0);
        params.write(ParamId::Blend, 1.0);
        params.write(ParamId::Volume, 1.0);

        let input = sine(512, 2.0);
        let mut left = input.clone();
        let mut right = input.clone();
        chain.process(&mut [&mut left, &mut right]);

        let out_peak = peak(&left);
        assert!(out_peak <= 1.0 + 1e-5, "Output peak {} above ceiling", out_peak);
        assert!(out_peak > 0.99, "Full drive should sit at the ceiling");
        assert!(out_peak < peak(&input));

        // Quiet parts are pushed up toward the ceiling too
        let loud_fraction = left.iter().filter(|s| s.abs() > 0.9).count() as f32 / 512.0;
        assert!(loud_fraction > 0.8, "Only {} of samples saturated", loud_fraction);
    }

    /// Output peak of a wet-only block at the given drive, with full compensation
    fn compensated_peak(drive: f32, amplitude: f32) -> f32 {
        let mut chain = prepared_chain();
        let params = chain.parameters();
        params.write(ParamId::Drive, drive);
        params.write(ParamId::Range, 1.0);
        params.write(ParamId::Blend, 1.0);
        params.write(ParamId::Volume, 1.0);

        let mut left = sine(512, amplitude);
        let mut right = sine(512, amplitude);
        chain.process(&mut [&mut left, &mut right]);
        peak(&left)
    }

    #[test]
    fn test_full_range_holds_level_across_drive_sweep() {
        let to_db = |x: f32| 20.0 * x.log10();

        // Nominal level stays put
        let reference = compensated_peak(0.0, 0.5);
        for i in 0..=10 {
            let drive = i as f32 / 10.0;
            let out = compensated_peak(drive, 0.5);
            assert!(
                (to_db(out) - to_db(reference)).abs() < 1.0,
                "Peak {} at drive {} vs {} at drive 0",
                out,
                drive,
                reference
            );
        }

        // A hot signal moves by a few dB at most, never tens
        let levels: Vec<f32> = (0..=10)
            .map(|i| compensated_peak(i as f32 / 10.0, 0.8))
            .collect();
        let loudest = levels.iter().cloned().fold(f32::MIN, f32::max);
        let quietest = levels.iter().cloned().fold(f32::MAX, f32::min);
        assert!(
            to_db(loudest) - to_db(quietest) < 4.0,
            "Output spread {}..{} over the drive sweep",
            quietest,
            loudest
        );
    }

    #[test]
    fn test_non_finite_input_becomes_silence() {
        let mut chain = prepared_chain();
        chain.parameters().write(ParamId::Blend, 0.5);

        let mut left = vec![f32::NAN, f32::INFINITY, f32::NEG_INFINITY, 0.0];
        let mut right = vec![0.0; 4];
        chain.process(&mut [&mut left, &mut right]);

        assert!(left.iter().all(|&s| s == 0.0));
        assert_eq!(chain.meters().snapshot(), LevelSnapshot::uniform(-60.0));
    }

    #[test]
    fn test_output_finite_for_extreme_input() {
        let mut chain = prepared_chain();
        let params = chain.parameters();
        params.write(ParamId::Drive, 1.0);
        params.write(ParamId::Blend, 0.7);
        params.write(ParamId::Volume, 3.0);

        let mut left = vec![1.0e30, -1.0e30, f32::MAX, f32::MIN];
        let mut right = vec![1.0e-40, -1.0e-40, 0.0, 0.0];
        chain.process(&mut [&mut left, &mut right]);

        // The dry share of a huge input stays huge, but nothing becomes NaN
        assert!(left.iter().chain(right.iter()).all(|s| !s.is_nan()));
    }

    #[test]
    fn test_snapshot_taken_once_per_block() {
        let mut chain = prepared_chain();
        let params = chain.parameters();
        params.write(ParamId::Blend, 0.0);
        params.write(ParamId::Volume, 1.0);

        let mut left = vec![0.5; 128];
        let mut right = vec![0.5; 128];
        chain.process(&mut [&mut left, &mut right]);
        assert!(left.iter().all(|&s| s == 0.5));

        // A change lands at the next block boundary
        params.write(ParamId::Volume, 2.0);
        let mut left = vec![0.5; 128];
        let mut right = vec![0.5; 128];
        chain.process(&mut [&mut left, &mut right]);
        assert!(left.iter().all(|&s| s == 1.0));
    }

    #[test]
    fn test_meters_track_input_and_output() {
        let mut chain = prepared_chain();
        let params = chain.parameters();
        params.write(ParamId::Blend, 0.0);
        params.write(ParamId::Volume, 0.5);

        let mut left = vec![1.0; 256];
        let mut right = vec![0.0; 256];
        chain.process(&mut [&mut left, &mut right]);

        let levels = chain.meters().snapshot();
        assert!(levels.input_left.abs() < 0.01);
        assert!((levels.output_left - (-6.02)).abs() < 0.01);
        assert_eq!(levels.input_right, -60.0);
        assert_eq!(levels.output_right, -60.0);
    }

    #[test]
    fn test_meters_decay_between_blocks() {
        let mut chain = prepared_chain();
        chain.parameters().write(ParamId::Blend, 0.0);

        let mut left = vec![1.0; 512];
        let mut right = vec![1.0; 512];
        chain.process(&mut [&mut left, &mut right]);
        let loud = chain.meters().snapshot().output_left;

        let mut left = vec![0.0; 512];
        let mut right = vec![0.0; 512];
        chain.process(&mut [&mut left, &mut right]);
        let quieter = chain.meters().snapshot().output_left;

        assert!(quieter < loud);
        assert!(quieter > -60.0, "Release should not drop straight to the floor");
    }

    #[test]
    fn test_interleaved_matches_planar() {
        let params = Arc::new(ParameterBridge::new());
        params.write(ParamId::Drive, 0.7);
        params.write(ParamId::Blend, 0.6);
        let config = ChainConfig::default();

        let make = || {
            let meters = Arc::new(MeterBank::new(48000.0, &config.meter).unwrap());
            let mut chain = SignalChain::with_shared(Arc::clone(&params), meters, config);
            chain.prepare(48000.0, 512).unwrap();
            chain
        };

        let left_in = sine(256, 0.9);
        let right_in: Vec<f32> = left_in.iter().map(|s| -s * 0.5).collect();

        let mut planar = make();
        let mut left = left_in.clone();
        let mut right = right_in.clone();
        planar.process(&mut [&mut left, &mut right]);

        let mut interleaved = make();
        let mut buffer: Vec<f32> = left_in
            .iter()
            .zip(right_in.iter())
            .flat_map(|(l, r)| [*l, *r])
            .collect();
        interleaved.process_interleaved(&mut buffer, 2);

        for (i, frame) in buffer.chunks(2).enumerate() {
            assert_eq!(frame[0], left[i]);
            assert_eq!(frame[1], right[i]);
        }
        assert_eq!(planar.meters().snapshot(), interleaved.meters().snapshot());
    }

    #[test]
    fn test_audio_processor_impl() {
        let mut chain = prepared_chain();
        chain.parameters().write(ParamId::Blend, 0.0);
        let context = chain.context().unwrap();

        let mut buffer = vec![0.25, -0.25, 0.5, -0.5];
        AudioProcessor::process(&mut chain, &mut buffer, &context);
        assert_eq!(buffer, vec![0.25, -0.25, 0.5, -0.5]);
        assert_eq!(chain.name(), "Grit Distortion");

        AudioProcessor::reset(&mut chain);
        assert_eq!(chain.meters().snapshot(), LevelSnapshot::uniform(-60.0));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "unprepared")]
    fn test_process_unprepared_asserts() {
        let mut chain = SignalChain::new().unwrap();
        let mut left = vec![0.0; 16];
        chain.process(&mut [&mut left]);
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn test_process_after_release_is_noop() {
        let mut chain = prepared_chain();
        chain.release();
        let mut left = vec![0.5; 16];
        chain.process(&mut [&mut left]);
        assert!(left.iter().all(|&s| s == 0.5));
    }

    #[test]
    fn test_concurrent_control_and_audio() {
        use std::thread;

        let mut chain = prepared_chain();
        let params = chain.parameters();
        let meters = chain.meters();

        let audio = thread::spawn(move || {
            let mut left = sine(512, 1.5);
            let mut right = sine(512, 0.5);
            for _ in 0..500 {
                chain.process(&mut [&mut left, &mut right]);
                assert!(left.iter().chain(right.iter()).all(|s| s.is_finite()));
                left.copy_from_slice(&sine(512, 1.5));
                right.copy_from_slice(&sine(512, 0.5));
            }
        });

        for i in 0..20_000 {
            let t = i as f32 * 0.001;
            params.write(ParamId::Drive, t.sin().abs());
            params.write(ParamId::Blend, t.cos().abs());
            params.write(ParamId::Volume, 1.0 + t.sin());
            let levels = meters.snapshot();
            assert!((-60.0..=6.0).contains(&levels.output_left));
        }

        audio.join().unwrap();
    }
}
