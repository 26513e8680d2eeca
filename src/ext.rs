#[cfg(feature = "stream")]
use core::{future::Future, time::Duration};

#[cfg(feature = "stream")]
use futures_util::{FutureExt, StreamExt, pin_mut, select};

use crate::Progressor;
#[cfg(feature = "stream")]
use crate::{Sampler, Snapshot, SnapshotStream, stream::stream};
#[cfg(feature = "stream")]
use tokio_util::sync::CancellationToken;

/// Extension trait providing convenient ways to consume a [`Progressor`].
///
/// Implemented for every [`Progressor`]; sources that are cheap to clone
/// (trackers, byte counters, an `Arc<Aggregate>`) can hand a clone to these
/// methods and keep using the original.
pub trait ProgressorExt: Progressor {
    /// Returns `true` if a fresh snapshot is complete.
    fn is_done(&self) -> bool {
        self.progress().is_complete()
    }

    /// Samples this progressor every `interval` while the returned stream is
    /// polled. See [`Sampler`].
    #[cfg(feature = "stream")]
    #[cfg_attr(docsrs, doc(cfg(feature = "stream")))]
    fn sample(self, interval: Duration) -> Sampler<Self>
    where
        Self: Sized,
    {
        Sampler::new(self, interval)
    }

    /// Samples this progressor every `interval` on a background task until
    /// it completes or `token` is cancelled. See [`stream`](crate::stream()).
    #[cfg(feature = "stream")]
    #[cfg_attr(docsrs, doc(cfg(feature = "stream")))]
    fn stream(self, token: CancellationToken, interval: Duration) -> SnapshotStream
    where
        Self: Sized + Send + 'static,
    {
        stream(token, self, interval)
    }

    /// Drives `future` to completion while calling `receiver` with a snapshot
    /// of this progressor every `interval`.
    ///
    /// Sampling stops early once a snapshot is complete; the future keeps
    /// running until it resolves.
    ///
    /// # Parameters
    ///
    /// - `future`: The work whose output is returned
    /// - `interval`: Time between two snapshots
    /// - `receiver`: A function that will be called with each [`Snapshot`]
    ///
    /// # Returns
    ///
    /// Returns a future that resolves to the output of `future`.
    ///
    /// # Example
    ///
    /// ```
    /// use std::time::Duration;
    /// use progress_signal::{ProgressorExt, track};
    ///
    /// # async fn example() {
    /// let task = track(100, |tracker| async move {
    ///     for _ in 0..100 {
    ///         tracker.advance(1);
    ///         tokio::time::sleep(Duration::from_millis(1)).await;
    ///     }
    ///     "Done"
    /// });
    ///
    /// let result = task
    ///     .tracker()
    ///     .observe(task, Duration::from_millis(10), |snapshot| {
    ///         println!("Progress: {:.0}%", snapshot.percent());
    ///     })
    ///     .await;
    /// assert_eq!(result, "Done");
    /// # }
    /// ```
    #[cfg(feature = "stream")]
    #[cfg_attr(docsrs, doc(cfg(feature = "stream")))]
    fn observe<Fut>(
        self,
        future: Fut,
        interval: Duration,
        receiver: impl Fn(Snapshot),
    ) -> impl Future<Output = Fut::Output>
    where
        Self: Sized,
        Fut: Future,
    {
        async move {
            let snapshots = self.sample(interval).fuse();
            let future = future.fuse();
            pin_mut!(snapshots, future);

            loop {
                select! {
                    result = future => return result,
                    snapshot = snapshots.next() => {
                        if let Some(snapshot) = snapshot {
                            receiver(snapshot);
                        }
                    }
                }
            }
        }
    }
}

impl<T: Progressor + ?Sized> ProgressorExt for T {}
