use std::sync::{Mutex, OnceLock};

use indicatif::{ProgressBar, ProgressStyle};
use log::Level;

/// Sink for progress and messages of an import run.
///
/// Every stage receives the observer explicitly. Implementations must be
/// `Sync` because parallel descriptor writing reports from worker threads.
pub trait ImportObserver: Sync {
    fn report_progress(&self, done: usize, total: usize);
    fn log(&self, level: Level, message: &str);
    /// Closes whatever the observer opened. Called once per run, also on failure.
    fn finish(&self) {}
}

/// Forwards messages to the `log` facade and draws an indicatif bar.
#[derive(Default)]
pub struct LogObserver {
    bar: OnceLock<ProgressBar>,
}

impl LogObserver {
    pub fn new() -> Self {
        Self::default()
    }

    fn bar(&self, total: usize) -> &ProgressBar {
        self.bar.get_or_init(|| {
            let pb = ProgressBar::new(total as u64);
            if let Ok(style) =
                ProgressStyle::with_template("{msg} [{bar:40}] {pos}/{len} views ({elapsed})")
            {
                pb.set_style(style.progress_chars("=> "));
            }
            pb.set_message("writing descriptors");
            pb
        })
    }
}

impl ImportObserver for LogObserver {
    fn report_progress(&self, done: usize, total: usize) {
        let pb = self.bar(total);
        pb.set_length(total as u64);
        if done as u64 > pb.position() {
            pb.set_position(done as u64);
        }
    }

    fn log(&self, level: Level, message: &str) {
        match self.bar.get() {
            Some(pb) if !pb.is_finished() => pb.suspend(|| log::log!(level, "{}", message)),
            _ => log::log!(level, "{}", message),
        }
    }

    fn finish(&self) {
        if let Some(pb) = self.bar.get() {
            pb.finish_and_clear();
        }
    }
}

/// Discards everything.
pub struct NullObserver;

impl ImportObserver for NullObserver {
    fn report_progress(&self, _done: usize, _total: usize) {}
    fn log(&self, _level: Level, _message: &str) {}
}

/// Keeps every call in memory, used to inspect a run afterwards.
#[derive(Default)]
pub struct RecordingObserver {
    pub progress: Mutex<Vec<(usize, usize)>>,
    pub messages: Mutex<Vec<(Level, String)>>,
    pub finished: Mutex<usize>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages_at(&self, level: Level) -> Vec<String> {
        self.messages
            .lock()
            .map(|m| {
                m.iter()
                    .filter(|(l, _)| *l == level)
                    .map(|(_, s)| s.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn progress_calls(&self) -> Vec<(usize, usize)> {
        self.progress.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn finish_count(&self) -> usize {
        self.finished.lock().map(|f| *f).unwrap_or_default()
    }
}

impl ImportObserver for RecordingObserver {
    fn report_progress(&self, done: usize, total: usize) {
        if let Ok(mut p) = self.progress.lock() {
            p.push((done, total));
        }
    }

    fn log(&self, level: Level, message: &str) {
        if let Ok(mut m) = self.messages.lock() {
            m.push((level, message.to_string()));
        }
    }

    fn finish(&self) {
        if let Ok(mut f) = self.finished.lock() {
            *f += 1;
        }
    }
}
