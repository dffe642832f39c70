//! Partitioning of a channel's lifetime into fixed-size crawl windows.

use chrono::{DateTime, Duration, Utc};

/// A half-open time range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Yields consecutive windows of `length` tiling `[origin, until)`.
///
/// The last window may extend past `until`; iteration stops once a window
/// would *start* at or after `until`. `until` is captured by the caller once,
/// so wall-clock drift during a long crawl never reopens finished windows.
pub fn windows(origin: DateTime<Utc>, until: DateTime<Utc>, length: Duration) -> Windows {
    Windows {
        next_start: origin,
        until,
        length,
    }
}

pub struct Windows {
    next_start: DateTime<Utc>,
    until: DateTime<Utc>,
    length: Duration,
}

impl Iterator for Windows {
    type Item = Window;

    fn next(&mut self) -> Option<Window> {
        if self.next_start >= self.until {
            return None;
        }
        let window = Window {
            start: self.next_start,
            end: self.next_start + self.length,
        };
        self.next_start = window.end;
        Some(window)
    }
}
