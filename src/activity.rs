// Copyright (c) 2024 Mike Tsao. All rights reserved.

//! A short, timestamped history of what the router saw.

use bounded_vec_deque::BoundedVecDeque;
use std::time::Instant;

/// The most recent lines of MIDI traffic and device events, for showing to
/// the user.
///
/// Each line is stamped with milliseconds since the log was created. Lines are
/// also passed to the `log` crate, so `RUST_LOG=info` shows everything, not
/// just the last few.
#[derive(Debug)]
pub struct ActivityLog {
    lines: BoundedVecDeque<String>,
    start: Instant,
}
impl Default for ActivityLog {
    fn default() -> Self {
        Self::new_with(Self::DEFAULT_CAPACITY)
    }
}
impl ActivityLog {
    #[allow(missing_docs)]
    pub const DEFAULT_CAPACITY: usize = 20;

    /// Creates a log that keeps the `capacity` most recent lines.
    pub fn new_with(capacity: usize) -> Self {
        Self {
            lines: BoundedVecDeque::new(capacity.max(1)),
            start: Instant::now(),
        }
    }

    /// Appends a line, dropping the oldest one if the log is full. Returns the
    /// stamped line.
    pub fn push(&mut self, message: &str) -> &str {
        log::info!("{message}");
        let elapsed_ms = self.start.elapsed().as_secs_f64() * 1000.0;
        let line = format!("{:<20}: {message}", format!("{elapsed_ms:.2}"));
        self.lines.push_back(line);
        self.lines.back().map(|s| s.as_str()).unwrap_or_default()
    }

    /// The retained lines, oldest first.
    pub fn lines(&self) -> impl Iterator<Item = &String> {
        self.lines.iter()
    }

    /// The retained lines joined for display.
    pub fn text(&self) -> String {
        self.lines().cloned().collect::<Vec<_>>().join("\n")
    }

    #[allow(missing_docs)]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
