//! Meter Timer
//!
//! The control side of metering: a thread that wakes at the display
//! refresh rate, reads the meter bank and posts the levels as events.
//!
//! ```text
//! Audio Thread               Timer Thread (30Hz)          UI
//! ┌──────────────┐          ┌───────────────────┐       ┌──────────┐
//! │ process()    │ atomics  │ snapshot()        │ chan  │ recv()   │
//! │ meters.update├─────────▶│ try_send(Level…)  ├──────▶│ draw     │
//! └──────────────┘          └───────────────────┘       └──────────┘
//! ```
//!
//! The channel is bounded. When the UI falls behind, updates are dropped
//! rather than queued: a meter only ever needs the latest reading.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use tracing::{debug, info};

use crate::error::{GritError, GritResult};
use crate::levels::{LevelSnapshot, MeterBank};
use crate::message::Event;

/// Pending meter events kept for a slow UI
const EVENT_CAPACITY: usize = 8;

/// Periodic meter poller running on its own thread
pub struct MeterTimer {
    meters: Arc<MeterBank>,

    /// Handle to the polling thread
    thread: Option<JoinHandle<()>>,

    /// Flag to signal shutdown
    shutdown_flag: Arc<AtomicBool>,
}

impl MeterTimer {
    /// Start polling `meters` every `1 / refresh_hz` seconds
    pub fn start(meters: Arc<MeterBank>, refresh_hz: u32) -> GritResult<(Self, Receiver<Event>)> {
        if refresh_hz == 0 {
            return Err(GritError::ConfigError("Meter refresh rate must be positive".into()));
        }

        let (event_sender, event_receiver) = bounded::<Event>(EVENT_CAPACITY);
        let shutdown_flag = Arc::new(AtomicBool::new(false));
        let interval = Duration::from_secs_f64(1.0 / refresh_hz as f64);

        // Clone for timer thread
        let shutdown_clone = Arc::clone(&shutdown_flag);
        let meters_clone = Arc::clone(&meters);

        let thread = thread::Builder::new()
            .name("grit-meters".into())
            .spawn(move || {
                Self::timer_thread_main(meters_clone, event_sender, shutdown_clone, interval);
            })
            .map_err(|e| GritError::ThreadSpawnError(e.to_string()))?;

        info!("Meter timer started at {}Hz", refresh_hz);

        Ok((
            Self {
                meters,
                thread: Some(thread),
                shutdown_flag,
            },
            event_receiver,
        ))
    }

    fn timer_thread_main(
        meters: Arc<MeterBank>,
        event_sender: Sender<Event>,
        shutdown_flag: Arc<AtomicBool>,
        interval: Duration,
    ) {
        let mut dropped = 0u64;

        while !shutdown_flag.load(Ordering::Acquire) {
            match event_sender.try_send(Event::LevelUpdate(meters.snapshot())) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => dropped += 1,
                // Receiver gone: nobody is drawing, nothing left to do
                Err(TrySendError::Disconnected(_)) => break,
            }
            thread::sleep(interval);
        }

        let _ = event_sender.try_send(Event::Stopped);
        debug!("Meter timer exiting ({} updates dropped)", dropped);
    }

    /// Read the meters immediately, bypassing the timer
    pub fn poll_now(&self) -> LevelSnapshot {
        self.meters.snapshot()
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop the timer thread and wait for it to exit
    pub fn stop(&mut self) {
        self.shutdown_flag.store(true, Ordering::Release);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
            info!("Meter timer stopped");
        }
    }
}

impl Drop for MeterTimer {
    fn drop(&mut self) {
        self.stop();
    }
}
