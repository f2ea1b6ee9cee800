use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam_channel::{Receiver, RecvTimeoutError};

use crate::number_space::normalize_degrees;

#[cfg(test)]
#[path = "heading_source_tests.rs"]
mod heading_source_tests;

/// The time the background reader waits for a sample before it checks for cancellation.
const SAMPLE_WAIT_TIME: Duration = Duration::from_millis(20);

/// Defines the interface for a sensor that reports the heading of the robot relative to
/// the field.
pub trait HeadingSource {
    /// Returns the current heading of the robot in degrees, counter clockwise positive, in
    /// the range (-180, 180].
    fn heading_degrees(&self) -> f64;

    /// Makes the current heading of the robot the zero heading.
    fn reset_heading(&mut self);
}

/// The state shared between a [BackgroundHeadingSource] and its reader thread.
struct SharedHeading {
    /// The bits of the latest raw heading sample in degrees.
    raw_heading_bits: AtomicU64,

    /// A flag indicating whether or not the reader thread should stop.
    cancelled: AtomicBool,
}

/// A [HeadingSource] that is updated by a background thread.
///
/// The thread receives raw heading samples, in degrees, from a gyro driver and stores the
/// latest sample. Reading the heading never waits for the thread, the last stored sample
/// wins. The thread stops when the source is dropped.
pub struct BackgroundHeadingSource {
    /// The state shared with the reader thread
    shared: Arc<SharedHeading>,

    /// The raw heading that is reported as the zero heading
    offset_degrees: f64,

    /// The thread handle for the background reader thread
    background_runner: Option<JoinHandle<()>>,
}

impl BackgroundHeadingSource {
    /// Creates the background reader thread
    fn create_thread<F: FnOnce() + Send + 'static>(f: F) -> JoinHandle<()> {
        thread::spawn(f)
    }

    /// Creates a new [BackgroundHeadingSource] instance.
    ///
    /// Until the first sample arrives the raw heading is zero.
    ///
    /// ## Parameters
    ///
    /// * 'receiver' - The channel on which the gyro driver sends the raw heading samples,
    ///   in degrees, counter clockwise positive.
    #[cfg_attr(test, mutants::skip)]
    pub fn new(receiver: Receiver<f64>) -> Self {
        let shared = Arc::new(SharedHeading {
            raw_heading_bits: AtomicU64::new(0.0f64.to_bits()),
            cancelled: AtomicBool::new(false),
        });
        let shared_copy = shared.clone();

        let background_runner = Self::create_thread(move || {
            Self::run(&shared_copy, &receiver);
        });

        Self {
            shared,
            offset_degrees: 0.0,
            background_runner: Some(background_runner),
        }
    }

    /// Returns the latest raw heading sample in degrees.
    pub fn raw_heading_degrees(&self) -> f64 {
        f64::from_bits(self.shared.raw_heading_bits.load(Ordering::Acquire))
    }

    /// Stores the incoming samples until cancelled or until the sender goes away.
    #[cfg_attr(test, mutants::skip)]
    fn run(shared: &Arc<SharedHeading>, receiver: &Receiver<f64>) {
        loop {
            if shared.cancelled.load(Ordering::Acquire) {
                break;
            }

            match receiver.recv_timeout(SAMPLE_WAIT_TIME) {
                Ok(sample) => {
                    if sample.is_finite() {
                        shared
                            .raw_heading_bits
                            .store(sample.to_bits(), Ordering::Release);
                    } else {
                        log::warn!("Ignoring non-finite heading sample {}", sample);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    log::debug!("Heading sample channel closed. Keeping the last heading.");
                    break;
                }
            }
        }
    }
}

impl HeadingSource for BackgroundHeadingSource {
    fn heading_degrees(&self) -> f64 {
        normalize_degrees(self.raw_heading_degrees() - self.offset_degrees)
    }

    fn reset_heading(&mut self) {
        self.offset_degrees = self.raw_heading_degrees();
    }
}

impl Drop for BackgroundHeadingSource {
    #[cfg_attr(test, mutants::skip)]
    fn drop(&mut self) {
        self.shared.cancelled.store(true, Ordering::Release);
        if let Some(handle) = self.background_runner.take() {
            if handle.join().is_err() {
                log::warn!("The heading reader thread panicked.");
            }
        }
    }
}
