// Upload progress: counts body bytes as the connection pulls them, samples
// throughput once a second and keeps a single status line up to date.
//
// Two activities touch the counters: the runtime feeding the request body
// (`on_bytes`) and the sampler thread (`sample`). Counters are atomics so
// neither needs a lock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

pub const SAMPLE_INTERVAL: Duration = Duration::from_secs(1);
/// Narrowest bar drawn, however long the status text is.
pub const MIN_BAR_WIDTH: usize = 2;
const DEFAULT_TERMINAL_WIDTH: usize = 80;

/// Counters shared between the body reader and the sampler.
#[derive(Debug, Default)]
pub struct ProgressState {
    total_sent: AtomicU64,
    window_sent: AtomicU64,
    // f64 bits
    throughput: AtomicU64,
    total_length: AtomicU64,
}

impl ProgressState {
    pub fn total_sent(&self) -> u64 {
        self.total_sent.load(Ordering::Relaxed)
    }

    pub fn window_sent(&self) -> u64 {
        self.window_sent.load(Ordering::Relaxed)
    }

    pub fn total_length(&self) -> u64 {
        self.total_length.load(Ordering::Relaxed)
    }

    /// Last sampled throughput in megabits per second.
    pub fn throughput_mbps(&self) -> f64 {
        f64::from_bits(self.throughput.load(Ordering::Relaxed))
    }

    /// Percentage of the body sent. An empty body counts as complete.
    pub fn percentage(&self) -> f64 {
        fraction(self.total_sent(), self.total_length()) * 100.0
    }

    fn record(&self, n: u64) {
        self.total_sent.fetch_add(n, Ordering::Relaxed);
        self.window_sent.fetch_add(n, Ordering::Relaxed);
    }

    fn sample(&self) -> f64 {
        let window = self.window_sent.swap(0, Ordering::Relaxed);
        let mbps = window as f64 * 8.0 / 1_048_576.0;
        self.throughput.store(mbps.to_bits(), Ordering::Relaxed);
        mbps
    }
}

fn fraction(sent: u64, total: u64) -> f64 {
    if total == 0 {
        return 1.0;
    }
    (sent as f64 / total as f64).min(1.0)
}

/// Width left for the bar once the status text and the surrounding
/// `" [" .. "]"` are placed on a terminal `terminal_width` columns wide.
pub fn bar_width(terminal_width: usize, status_len: usize) -> usize {
    terminal_width
        .saturating_sub(status_len + 4)
        .max(MIN_BAR_WIDTH)
}

/// Number of filled cells: `floor(width * sent / total)`, full when the body
/// is empty.
pub fn bar_fill(width: usize, sent: u64, total: u64) -> usize {
    if total == 0 {
        return width;
    }
    let filled = (width as u128 * sent.min(total) as u128) / total as u128;
    filled as usize
}

fn terminal_width() -> usize {
    crossterm::terminal::size()
        .map(|(cols, _)| cols as usize)
        .unwrap_or(DEFAULT_TERMINAL_WIDTH)
}

/// Cheap handle given to the request body. Cloning shares the same
/// counters and status line.
#[derive(Clone)]
pub struct ProgressHandle {
    state: Arc<ProgressState>,
    view: Arc<StatusView>,
}

impl ProgressHandle {
    pub fn on_bytes(&self, n: usize) {
        self.state.record(n as u64);
        self.view.redraw(&self.state);
    }
}

struct StatusView {
    file_name: String,
    label: String,
    bar: ProgressBar,
}

impl StatusView {
    fn status_text(&self, state: &ProgressState) -> String {
        format!(
            "Uploading \"{}\" to {}... ({:.2}%) {:.2} Mbps",
            self.file_name,
            self.label,
            state.percentage(),
            state.throughput_mbps()
        )
    }

    fn render(&self, state: &ProgressState, terminal_width: usize) -> String {
        let status = self.status_text(state);
        let width = bar_width(terminal_width, status.chars().count());
        let filled = bar_fill(width, state.total_sent(), state.total_length());
        format!(
            "{status} [{}{}]",
            "#".repeat(filled),
            "-".repeat(width - filled)
        )
    }

    fn redraw(&self, state: &ProgressState) {
        if self.bar.is_hidden() {
            return;
        }
        self.bar.set_position(state.total_sent());
        self.bar.set_message(self.render(state, terminal_width()));
    }
}

/// Stops the sampler thread when dropped, whichever way the upload ends.
pub struct Sampling {
    stop: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl Drop for Sampling {
    fn drop(&mut self) {
        // dropping the sender wakes the sampler immediately
        self.stop.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        debug!("throughput sampler stopped");
    }
}

pub struct ProgressTracker {
    handle: ProgressHandle,
}

impl ProgressTracker {
    /// Tracker drawing on stderr through `indicatif`.
    pub fn new(file_name: impl Into<String>, label: impl Into<String>) -> Self {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template("{msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        Self::with_bar(file_name, label, bar)
    }

    /// Tracker that counts but never draws.
    pub fn hidden(file_name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::with_bar(file_name, label, ProgressBar::hidden())
    }

    fn with_bar(file_name: impl Into<String>, label: impl Into<String>, bar: ProgressBar) -> Self {
        ProgressTracker {
            handle: ProgressHandle {
                state: Arc::new(ProgressState::default()),
                view: Arc::new(StatusView {
                    file_name: file_name.into(),
                    label: label.into(),
                    bar,
                }),
            },
        }
    }

    pub fn state(&self) -> &ProgressState {
        &self.handle.state
    }

    pub fn handle(&self) -> ProgressHandle {
        self.handle.clone()
    }

    pub fn on_bytes(&self, n: usize) {
        self.handle.on_bytes(n);
    }

    /// Take a throughput sample now: converts the bytes seen since the last
    /// sample to Mbps and empties the window.
    pub fn sample(&self) -> f64 {
        let mbps = self.handle.state.sample();
        self.handle.view.redraw(&self.handle.state);
        mbps
    }

    /// Current status line as it would be drawn on a terminal
    /// `terminal_width` columns wide.
    pub fn render(&self, terminal_width: usize) -> String {
        self.handle.view.render(&self.handle.state, terminal_width)
    }

    /// Arm the tracker for a body of `total_length` bytes and start the
    /// once-a-second sampler. The sampler runs until the returned guard is
    /// dropped.
    pub fn start(&self, total_length: u64) -> Sampling {
        let state = &self.handle.state;
        state.total_length.store(total_length, Ordering::Relaxed);
        state.total_sent.store(0, Ordering::Relaxed);
        state.window_sent.store(0, Ordering::Relaxed);
        state.throughput.store(0f64.to_bits(), Ordering::Relaxed);
        self.handle.view.bar.set_length(total_length);
        self.handle.view.redraw(state);

        let (stop, ticks) = mpsc::channel::<()>();
        let handle = self.handle.clone();
        let worker = thread::Builder::new()
            .name("upload-sampler".into())
            .spawn(move || loop {
                match ticks.recv_timeout(SAMPLE_INTERVAL) {
                    Err(RecvTimeoutError::Timeout) => {
                        handle.state.sample();
                        handle.view.redraw(&handle.state);
                    }
                    _ => break,
                }
            });

        let worker = match worker {
            Ok(worker) => Some(worker),
            Err(err) => {
                // without a sampler the line just keeps showing 0.00 Mbps
                debug!(error = %err, "could not start throughput sampler");
                None
            }
        };
        debug!(total_length, "throughput sampler started");
        Sampling {
            stop: Some(stop),
            worker,
        }
    }

    /// Leave the final status line in place.
    pub fn finish(&self) {
        self.handle.view.redraw(&self.handle.state);
        self.handle.view.bar.finish();
    }

    /// Stop drawing without completing the line; the caller prints the
    /// error on a fresh line.
    pub fn abandon(&self) {
        self.handle.view.bar.abandon();
    }
}
