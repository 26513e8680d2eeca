use core::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};
use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicI64, Ordering},
};

use pin_project_lite::pin_project;

use crate::{
    AtomicStage, Fault, Faultable, Faults, Measurable, Progressor, Snapshot, StageSettable,
    Stager,
};

/// A handle for reporting the progress of a user-defined task.
///
/// All clones share the same state, so one clone can be registered with an
/// [`Aggregate`](crate::Aggregate) or sampled while another is moved into the
/// task doing the work.
#[derive(Debug, Clone)]
pub struct Tracker {
    inner: Arc<TrackerInner>,
}

#[derive(Debug)]
struct TrackerInner {
    current: AtomicI64,
    size: AtomicI64,
    faults: Mutex<Faults>,
    stage: AtomicStage,
}

impl Tracker {
    /// Creates a tracker for `size` units of work.
    ///
    /// The stage label starts out empty; use [`Tracker::with_stage`] to give
    /// it a first label.
    #[must_use]
    pub fn new(size: i64) -> Self {
        Self::with_stage(size, String::new())
    }

    /// Creates a tracker for `size` units of work, starting in `stage`.
    #[must_use]
    pub fn with_stage(size: i64, stage: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(TrackerInner {
                current: AtomicI64::new(0),
                size: AtomicI64::new(size),
                faults: Mutex::new(Faults::new()),
                stage: AtomicStage::new(stage),
            }),
        }
    }

    /// Creates a tracker whose total is not known yet.
    #[must_use]
    pub fn unknown() -> Self {
        Self::new(-1)
    }

    /// Sets the amount of work done.
    pub fn set_current(&self, current: i64) {
        self.inner.current.store(current, Ordering::Relaxed);
    }

    /// Adds to the amount of work done.
    pub fn advance(&self, delta: i64) {
        self.inner.current.fetch_add(delta, Ordering::Relaxed);
    }

    /// Sets the total amount of work.
    pub fn set_size(&self, size: i64) {
        self.inner.size.store(size, Ordering::Relaxed);
    }

    /// Records a fault, which also finishes the task.
    pub fn fail(&self, fault: impl Into<Fault>) {
        let fault = fault.into();
        tracing::debug!(error = %fault, stage = %self.inner.stage.load(), "task failed");
        self.push(fault);
    }

    /// Marks the task as done. Repeated calls record a single marker.
    pub fn complete(&self) {
        self.push(Fault::Completed);
    }

    fn push(&self, fault: Fault) {
        self.inner
            .faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record(fault);
    }
}

impl Measurable for Tracker {
    fn current(&self) -> i64 {
        self.inner.current.load(Ordering::Relaxed)
    }

    fn size(&self) -> i64 {
        self.inner.size.load(Ordering::Relaxed)
    }
}

impl Faultable for Tracker {
    fn error(&self) -> Option<Faults> {
        let faults = self
            .inner
            .faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if faults.is_empty() {
            None
        } else {
            Some(faults.clone())
        }
    }
}

impl Stager for Tracker {
    fn stage(&self) -> String {
        self.inner.stage.stage()
    }
}

impl StageSettable for Tracker {
    fn set(&self, stage: impl Into<String>) {
        self.inner.stage.set(stage);
    }
}

pin_project! {
    /// A future whose progress is reported through a [`Tracker`].
    ///
    /// Created by [`track`]. The tracker is marked complete when the future
    /// resolves; dropping the future before that records a fault instead, so
    /// an aggregate never waits on abandoned work.
    pub struct Tracked<Fut> {
        tracker: Tracker,
        finished: bool,
        #[pin]
        fut: Fut,
    }

    impl<Fut> PinnedDrop for Tracked<Fut> {
        fn drop(this: Pin<&mut Self>) {
            let this = this.project();
            if !*this.finished {
                this.tracker.fail(Fault::other("task dropped before completion"));
            }
        }
    }
}

impl<Fut> Tracked<Fut> {
    /// Returns a handle to the tracker of this future.
    #[must_use]
    pub fn tracker(&self) -> Tracker {
        self.tracker.clone()
    }
}

impl<Fut> Future for Tracked<Fut>
where
    Fut: Future,
{
    type Output = Fut::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let output = futures_core::ready!(this.fut.poll(cx));
        if !*this.finished {
            *this.finished = true;
            this.tracker.complete();
        }
        Poll::Ready(output)
    }
}

impl<Fut> Progressor for Tracked<Fut> {
    fn progress(&self) -> Snapshot {
        self.tracker.progress()
    }
}

/// Creates a progress-tracked future from a closure.
///
/// The closure receives a [`Tracker`] for `size` units of work and returns
/// the future doing the work. The returned [`Tracked`] future can be
/// registered with an [`Aggregate`](crate::Aggregate) through
/// [`Tracked::tracker`], or observed directly.
///
/// # Examples
///
/// ```
/// use progress_signal::{Progressor, StageSettable, track};
///
/// # async fn example() {
/// let task = track(100, |tracker| async move {
///     tracker.set("crunching");
///     for _ in 0..100 {
///         tracker.advance(1);
///     }
///     "completed"
/// });
///
/// let tracker = task.tracker();
/// assert_eq!(task.await, "completed");
/// assert!(tracker.progress().is_complete());
/// # }
/// ```
pub fn track<F, Fut>(size: i64, f: F) -> Tracked<Fut>
where
    F: FnOnce(Tracker) -> Fut,
    Fut: Future,
{
    let tracker = Tracker::new(size);
    let fut = f(tracker.clone());
    Tracked {
        tracker,
        finished: false,
        fut,
    }
}
