//! Turning a [`Progressor`] into a time-driven stream of snapshots.

use core::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};

use futures_core::{FusedStream, Stream};
use pin_project_lite::pin_project;
use tokio::{
    sync::mpsc,
    time::{Instant, Sleep},
};
use tokio_util::sync::CancellationToken;

use crate::{Progressor, Snapshot};

/// A sampling interval for callers without a preference.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(200);

/// Samples `progressor` every `interval` on a background task.
///
/// The returned stream yields one [`Snapshot`] per interval and ends when:
///
/// - `token` is cancelled; no further snapshot is sampled or published,
/// - a snapshot is complete; that snapshot is the last item,
/// - the stream is dropped.
///
/// At most one snapshot waits in the stream. A slow consumer throttles the
/// sampling: the next snapshot is only taken once the previous one has been
/// received. If cancellation and a free slot become ready at the same time,
/// cancellation wins.
///
/// Must be called from within a tokio runtime with the time driver enabled.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use futures_util::StreamExt;
/// use progress_signal::{CancellationToken, Snapshot, stream};
///
/// # async fn example() {
/// let token = CancellationToken::new();
/// let snapshots: Vec<Snapshot> = stream(token, Snapshot::new(10, 10), Duration::from_millis(10))
///     .collect()
///     .await;
/// assert_eq!(snapshots.len(), 1);
/// # }
/// ```
pub fn stream<P>(token: CancellationToken, progressor: P, interval: Duration) -> SnapshotStream
where
    P: Progressor + Send + 'static,
{
    let (sender, receiver) = mpsc::channel(1);

    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                () = token.cancelled() => {
                    tracing::debug!("snapshot stream cancelled");
                    return;
                }
                () = tokio::time::sleep(interval) => {}
            }

            let permit = tokio::select! {
                biased;
                () = token.cancelled() => {
                    tracing::debug!("snapshot stream cancelled");
                    return;
                }
                permit = sender.reserve() => match permit {
                    Ok(permit) => permit,
                    Err(_) => {
                        tracing::debug!("snapshot stream dropped by consumer");
                        return;
                    }
                },
            };

            let snapshot = progressor.progress();
            let complete = snapshot.is_complete();
            tracing::trace!(%snapshot, complete, "sampled progress");
            permit.send(snapshot);

            if complete {
                tracing::debug!("snapshot stream finished");
                return;
            }
        }
    });

    SnapshotStream { receiver }
}

/// Snapshots published by a background sampling task.
///
/// Created by [`stream`] or [`ProgressorExt::stream`](crate::ProgressorExt::stream).
#[derive(Debug)]
pub struct SnapshotStream {
    receiver: mpsc::Receiver<Snapshot>,
}

impl SnapshotStream {
    /// Receives the next snapshot, or `None` once the sampling task ended.
    pub async fn recv(&mut self) -> Option<Snapshot> {
        self.receiver.recv().await
    }
}

impl Stream for SnapshotStream {
    type Item = Snapshot;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

pin_project! {
    /// Samples a [`Progressor`] every interval, without a background task.
    ///
    /// Sampling happens while the stream is polled, so nothing is sampled
    /// ahead of the consumer. The stream ends after yielding the first
    /// complete snapshot. To cancel, stop polling it or drop it.
    ///
    /// Created by [`Sampler::new`] or [`ProgressorExt::sample`](crate::ProgressorExt::sample).
    #[derive(Debug)]
    pub struct Sampler<P> {
        progressor: P,
        interval: Duration,
        finished: bool,
        #[pin]
        sleep: Sleep,
    }
}

impl<P: Progressor> Sampler<P> {
    /// Creates a sampler whose first snapshot is taken after `interval`.
    ///
    /// Must be called from within a tokio runtime with the time driver
    /// enabled.
    pub fn new(progressor: P, interval: Duration) -> Self {
        Self {
            progressor,
            interval,
            finished: false,
            sleep: tokio::time::sleep(interval),
        }
    }
}

impl<P: Progressor> Stream for Sampler<P> {
    type Item = Snapshot;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        if *this.finished {
            return Poll::Ready(None);
        }

        futures_core::ready!(this.sleep.as_mut().poll(cx));

        let snapshot = this.progressor.progress();
        if snapshot.is_complete() {
            *this.finished = true;
        } else {
            this.sleep.as_mut().reset(Instant::now() + *this.interval);
        }
        tracing::trace!(%snapshot, "sampled progress");
        Poll::Ready(Some(snapshot))
    }
}

impl<P: Progressor> FusedStream for Sampler<P> {
    fn is_terminated(&self) -> bool {
        self.finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Aggregate, Tracker};
    use futures_util::StreamExt;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    /// Becomes complete on the `complete_on`-th sample and counts samples.
    struct Countdown {
        samples: Arc<AtomicUsize>,
        complete_on: usize,
    }

    impl Progressor for Countdown {
        fn progress(&self) -> Snapshot {
            let sample = self.samples.fetch_add(1, Ordering::SeqCst) + 1;
            let current = if sample >= self.complete_on { 10 } else { 5 };
            Snapshot::new(current, 10)
        }
    }

    fn countdown(complete_on: usize) -> (Countdown, Arc<AtomicUsize>) {
        let samples = Arc::new(AtomicUsize::new(0));
        let countdown = Countdown {
            samples: Arc::clone(&samples),
            complete_on,
        };
        (countdown, samples)
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_ends_on_completion() {
        let (progressor, samples) = countdown(2);
        let snapshots: Vec<Snapshot> =
            stream(CancellationToken::new(), progressor, Duration::from_millis(100))
                .collect()
                .await;

        assert_eq!(snapshots.len(), 2);
        assert!(!snapshots[0].is_complete());
        assert!(snapshots[1].is_complete());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(samples.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_before_first_sample() {
        let (progressor, samples) = countdown(usize::MAX);
        let token = CancellationToken::new();
        token.cancel();

        let snapshots: Vec<Snapshot> = stream(token, progressor, Duration::from_millis(100))
            .collect()
            .await;

        assert!(snapshots.is_empty());
        assert_eq!(samples.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_sampling() {
        let (progressor, samples) = countdown(usize::MAX);
        let token = CancellationToken::new();
        let mut snapshots = stream(token.clone(), progressor, Duration::from_millis(100));

        assert!(snapshots.next().await.is_some());
        assert!(snapshots.next().await.is_some());
        token.cancel();

        // at most one snapshot may already be waiting in the slot
        let mut rest = 0;
        while snapshots.next().await.is_some() {
            rest += 1;
        }
        assert!(rest <= 1);
        assert!(samples.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_consumer_throttles_sampling() {
        let (progressor, samples) = countdown(usize::MAX);
        let token = CancellationToken::new();
        let mut snapshots = stream(token.clone(), progressor, Duration::from_millis(10));

        tokio::time::sleep(Duration::from_secs(1)).await;
        // one snapshot fills the slot, nothing else is sampled
        assert_eq!(samples.load(Ordering::SeqCst), 1);

        assert!(snapshots.next().await.is_some());
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(samples.load(Ordering::SeqCst), 2);

        token.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_of_empty_aggregate() {
        let aggregate = Arc::new(Aggregate::new());
        let mut snapshots = stream(CancellationToken::new(), aggregate, DEFAULT_INTERVAL);

        let snapshot = snapshots.recv().await.unwrap();
        assert!(snapshot.is_complete());
        assert!(snapshots.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sampler_ends_on_completion() {
        let (progressor, samples) = countdown(3);
        let snapshots: Vec<Snapshot> = Sampler::new(progressor, Duration::from_millis(100))
            .collect()
            .await;

        assert_eq!(snapshots.len(), 3);
        assert_eq!(samples.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sampler_waits_for_interval() {
        let tracker = Tracker::new(10);
        let mut sampler = Box::pin(Sampler::new(tracker.clone(), Duration::from_millis(100)));
        let start = Instant::now();

        tracker.set_current(4);
        let snapshot = sampler.next().await.unwrap();
        assert_eq!(snapshot.current(), 4);
        assert!(start.elapsed() >= Duration::from_millis(100));

        tracker.set_current(10);
        assert!(sampler.next().await.unwrap().is_complete());
        assert!(sampler.is_terminated());
        assert!(sampler.next().await.is_none());
    }
}
