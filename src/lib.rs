//! Pollable, aggregatable and streamable progress signals for Rust.
//!
//! This crate turns long-running operations (I/O transfers, timed tasks,
//! multi-stage pipelines) into a normalized numeric signal. Sources expose
//! their state through small capability traits, an [`Aggregate`] combines any
//! number of them into one composite view, and a sampler turns any
//! [`Progressor`] into a time-driven [`Stream`](futures_core::Stream) of
//! [`Snapshot`]s.
//!
//! # Features
//!
//! - **Capability traits**: [`Measurable`], [`Faultable`], [`Progressor`] and
//!   [`Stager`] instead of a common base type
//! - **Aggregation**: sum sources in native units or weight each one equally
//!   with [`Strategy`], track the first unfinished source by name
//! - **Fault merging**: notable faults of all sources are kept side by side in
//!   [`Faults`], routine end-of-stream and completion markers are filtered
//! - **Streaming**: cancellable, backpressured sampling on top of tokio
//! - **Thread safe**: counters, labels and the aggregate can be shared freely
//!
//! # Examples
//!
//! ## Aggregating sources
//!
//! ```
//! use std::io::Read;
//! use progress_signal::{Aggregate, Progressor, Reader, Strategy, TimedProgress};
//! use std::time::Duration;
//!
//! let mut download = Reader::with_size(&b"hello world"[..], 11);
//! let timer = TimedProgress::new(Duration::from_secs(60));
//!
//! let aggregate = Aggregate::new()
//!     .with_strategy(Strategy::Normalize)
//!     .with_named("download", download.counter())
//!     .with_named("cooldown", timer);
//!
//! let mut buffer = Vec::new();
//! download.read_to_end(&mut buffer).unwrap();
//!
//! let snapshot = aggregate.progress();
//! assert_eq!(snapshot.size(), 200);
//! assert!(snapshot.percent() >= 50.0);
//! assert_eq!(aggregate.current_name(), Some("cooldown"));
//! ```
//!
//! ## Streaming snapshots
//!
//! ```
//! # #[cfg(feature = "stream")]
//! # {
//! use std::time::Duration;
//! use futures_util::StreamExt;
//! use progress_signal::{CancellationToken, ProgressorExt, Tracker};
//!
//! # async fn example() {
//! let tracker = Tracker::new(100);
//! let token = CancellationToken::new();
//! let mut snapshots = tracker.clone().stream(token.clone(), Duration::from_millis(50));
//!
//! tokio::spawn(async move {
//!     for _ in 0..100 {
//!         tracker.advance(1);
//!         tokio::time::sleep(Duration::from_millis(5)).await;
//!     }
//! });
//!
//! while let Some(snapshot) = snapshots.next().await {
//!     println!("{snapshot}");
//! }
//! # }
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

mod aggregate;
mod error;
mod ext;
mod io;
mod source;
mod stage;
#[cfg(feature = "stream")]
mod stream;
mod task;
mod timed;

pub use aggregate::{Aggregate, Strategy};
pub use error::{Fault, Faults};
pub use ext::ProgressorExt;
pub use io::{ByteCounter, Reader, Writer};
pub use source::{
    Faultable, Measurable, Progressable, Progressor, StageSettable, StagedProgressable,
    StagedProgressor, Stager,
};
pub use stage::AtomicStage;
#[cfg(feature = "stream")]
#[cfg_attr(docsrs, doc(cfg(feature = "stream")))]
pub use stream::{DEFAULT_INTERVAL, Sampler, SnapshotStream, stream};
pub use task::{Tracked, Tracker, track};
pub use timed::TimedProgress;

#[cfg(feature = "stream")]
#[cfg_attr(docsrs, doc(cfg(feature = "stream")))]
pub use tokio_util::sync::CancellationToken;

use core::fmt;

/// An immutable, point-in-time reading of a progress source.
///
/// Snapshots are produced by [`Progressor::progress`] and are plain values:
/// cheap to clone, safe to send across threads and never updated after
/// construction.
///
/// A negative [`size`](Snapshot::size) means the total is unknown. Derived
/// metrics are zero in that case and for an empty total.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    current: i64,
    size: i64,
    error: Option<Faults>,
}

impl Snapshot {
    /// Creates a snapshot without any fault.
    #[must_use]
    pub const fn new(current: i64, size: i64) -> Self {
        Self {
            current,
            size,
            error: None,
        }
    }

    /// Creates a snapshot carrying the given faults.
    ///
    /// An empty fault list is stored as `None`, so it does not mark the
    /// snapshot complete.
    #[must_use]
    pub fn with_error(current: i64, size: i64, error: Option<Faults>) -> Self {
        Self {
            current,
            size,
            error: error.filter(|faults| !faults.is_empty()),
        }
    }

    /// Returns the current progress value.
    #[must_use]
    pub const fn current(&self) -> i64 {
        self.current
    }

    /// Returns the total size, negative when unknown.
    #[must_use]
    pub const fn size(&self) -> i64 {
        self.size
    }

    /// Returns the completion ratio, `current / size`.
    ///
    /// If the size is zero or unknown, returns 0.0. Overshoot is not clamped.
    #[must_use]
    pub fn ratio(&self) -> f64 {
        if self.size <= 0 {
            0.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            {
                self.current as f64 / self.size as f64
            }
        }
    }

    /// Returns the completion percentage, exactly `100 * ratio()`.
    ///
    /// If the size is zero or unknown, returns 0.0. Overshoot is not clamped,
    /// so 12 out of 10 reports 120.
    #[must_use]
    pub fn percent(&self) -> f64 {
        100.0 * self.ratio()
    }

    /// Returns the remaining amount of work.
    ///
    /// Returns `None` when the size is unknown, and saturates at zero if
    /// current exceeds size.
    #[must_use]
    pub const fn remaining(&self) -> Option<i64> {
        if self.size < 0 {
            None
        } else {
            let remaining = self.size.saturating_sub(self.current);
            Some(if remaining < 0 { 0 } else { remaining })
        }
    }

    /// Returns the faults recorded by the source, if any.
    #[must_use]
    pub const fn error(&self) -> Option<&Faults> {
        self.error.as_ref()
    }

    /// Returns `true` if the source finished.
    ///
    /// Any recorded fault counts as finished, including the routine
    /// [`Fault::EndOfStream`] and [`Fault::Completed`] markers. Without
    /// faults, a source is finished once `current >= size > 0`.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.error.is_some() || (self.size > 0 && self.current >= self.size)
    }
}

impl Measurable for Snapshot {
    fn current(&self) -> i64 {
        self.current
    }

    fn size(&self) -> i64 {
        self.size
    }
}

impl Faultable for Snapshot {
    fn error(&self) -> Option<Faults> {
        self.error.clone()
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.size < 0 {
            write!(f, "{}/?", self.current)
        } else {
            write!(f, "{}/{} ({:.1}%)", self.current, self.size, self.percent())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < f64::EPSILON,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_snapshot_new() {
        let snapshot = Snapshot::new(0, 100);
        assert_eq!(snapshot.current(), 0);
        assert_eq!(snapshot.size(), 100);
        assert!(snapshot.error().is_none());
        assert!(!snapshot.is_complete());
    }

    #[test]
    fn test_ratio_and_percent() {
        let cases = [
            (1, 10, 0.1, 10.0),
            (10, 10, 1.0, 100.0),
            (0, 10, 0.0, 0.0),
            (0, -1, 0.0, 0.0),
            (2, -10, 0.0, 0.0),
            (5, 0, 0.0, 0.0),
            (12, 10, 1.2, 120.0),
        ];

        for (current, size, ratio, percent) in cases {
            let snapshot = Snapshot::new(current, size);
            assert_close(snapshot.ratio(), ratio);
            assert_close(snapshot.percent(), percent);
        }
    }

    #[test]
    fn test_percent_is_hundred_times_ratio() {
        for size in -2..50 {
            for current in -1..=size.max(0) + 2 {
                let snapshot = Snapshot::new(current, size);
                assert_eq!(
                    snapshot.percent().to_bits(),
                    (100.0 * snapshot.ratio()).to_bits(),
                    "{current}/{size}"
                );
            }
        }
        assert_eq!(
            Snapshot::new(1, 3).percent().to_bits(),
            (100.0 * (1.0_f64 / 3.0)).to_bits()
        );
    }

    #[test]
    fn test_completion_by_size() {
        assert!(!Snapshot::new(1, 10).is_complete());
        assert!(Snapshot::new(10, 10).is_complete());
        assert!(Snapshot::new(12, 10).is_complete());
        assert!(!Snapshot::new(0, 0).is_complete());
        assert!(!Snapshot::new(7, -1).is_complete());
    }

    #[test]
    fn test_completion_by_any_fault() {
        for fault in [
            Fault::EndOfStream,
            Fault::Completed,
            Fault::other("blerg, err!"),
        ] {
            let snapshot = Snapshot::with_error(2, 10, Some(Faults::from(fault)));
            assert!(snapshot.is_complete());
            assert_close(snapshot.percent(), 20.0);
            assert_close(snapshot.ratio(), 0.2);
        }
    }

    #[test]
    fn test_empty_faults_are_dropped() {
        let snapshot = Snapshot::with_error(2, 10, Some(Faults::new()));
        assert!(snapshot.error().is_none());
        assert!(!snapshot.is_complete());
    }

    #[test]
    fn test_remaining() {
        assert_eq!(Snapshot::new(30, 100).remaining(), Some(70));
        assert_eq!(Snapshot::new(100, 100).remaining(), Some(0));
        // when exceeding size should return 0
        assert_eq!(Snapshot::new(150, 100).remaining(), Some(0));
        assert_eq!(Snapshot::new(150, -1).remaining(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Snapshot::new(1, 4).to_string(), "1/4 (25.0%)");
        assert_eq!(Snapshot::new(7, -1).to_string(), "7/?");
    }
}
