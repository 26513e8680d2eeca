use std::{
    fmt,
    sync::atomic::{AtomicUsize, Ordering},
};

use crate::{Fault, Faults, Progressor, Snapshot};

/// How an [`Aggregate`] combines the amounts of its sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Strategy {
    /// Adds up the raw amounts and sizes of all sources.
    ///
    /// Sources are summed in their native units, so this only makes sense
    /// when they all count the same thing, e.g. bytes.
    Sum,
    /// Weighs every source equally.
    ///
    /// Each source contributes its percentage, clamped to `0..=100`, to the
    /// current amount and exactly 100 to the size. A source with an unknown
    /// size contributes nothing to the amount but still counts toward the
    /// size.
    #[default]
    Normalize,
}

struct Entry {
    name: Option<String>,
    source: Box<dyn Progressor + Send + Sync>,
}

/// Combines many progress sources into one.
///
/// Sources are kept in registration order; there is no way to remove one.
/// Each call to [`progress`](Progressor::progress) samples every source once
/// and remembers the first source that has not finished yet, whose name is
/// then available through [`current_name`](Aggregate::current_name).
///
/// An aggregate is itself a [`Progressor`], so it can be registered inside
/// another aggregate.
///
/// # Examples
///
/// ```
/// use progress_signal::{Aggregate, Progressor, Snapshot, Strategy};
///
/// let mut aggregate = Aggregate::new();
/// aggregate.set_strategy(Strategy::Sum);
/// aggregate.register_named("fetch", Snapshot::new(10, 10));
/// aggregate.register_named("unpack", Snapshot::new(1, 10));
///
/// let snapshot = aggregate.progress();
/// assert_eq!((snapshot.current(), snapshot.size()), (11, 20));
/// assert_eq!(aggregate.current_name(), Some("unpack"));
/// ```
#[derive(Default)]
pub struct Aggregate {
    entries: Vec<Entry>,
    strategy: Strategy,
    current: AtomicUsize,
}

impl Aggregate {
    /// Creates an empty aggregate using [`Strategy::Normalize`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the strategy, builder style.
    #[must_use]
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Registers an unnamed source, builder style.
    #[must_use]
    pub fn with<P>(mut self, source: P) -> Self
    where
        P: Progressor + Send + Sync + 'static,
    {
        self.register(source);
        self
    }

    /// Registers a named source, builder style.
    #[must_use]
    pub fn with_named<P>(mut self, name: impl Into<String>, source: P) -> Self
    where
        P: Progressor + Send + Sync + 'static,
    {
        self.register_named(name, source);
        self
    }

    /// Selects the strategy used by subsequent snapshots.
    pub fn set_strategy(&mut self, strategy: Strategy) {
        self.strategy = strategy;
    }

    /// Returns the selected strategy.
    #[must_use]
    pub const fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Appends an unnamed source.
    pub fn register<P>(&mut self, source: P)
    where
        P: Progressor + Send + Sync + 'static,
    {
        self.entries.push(Entry {
            name: None,
            source: Box::new(source),
        });
    }

    /// Appends a source under a name.
    pub fn register_named<P>(&mut self, name: impl Into<String>, source: P)
    where
        P: Progressor + Send + Sync + 'static,
    {
        self.entries.push(Entry {
            name: Some(name.into()),
            source: Box::new(source),
        });
    }

    /// Appends every source of the iterator, unnamed.
    pub fn register_all<I>(&mut self, sources: I)
    where
        I: IntoIterator,
        I::Item: Progressor + Send + Sync + 'static,
    {
        for source in sources {
            self.register(source);
        }
    }

    /// Number of registered sources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no source has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Index of the first unfinished source as of the last snapshot.
    ///
    /// Zero before the first snapshot and when every source has finished.
    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current.load(Ordering::Relaxed)
    }

    /// Name of the source at [`current_index`](Aggregate::current_index).
    ///
    /// Returns `None` if that source was registered without a name or if
    /// nothing is registered.
    #[must_use]
    pub fn current_name(&self) -> Option<&str> {
        self.entries
            .get(self.current_index())
            .and_then(|entry| entry.name.as_deref())
    }

    /// Returns the names of all sources in registration order.
    pub fn names(&self) -> impl Iterator<Item = Option<&str>> {
        self.entries.iter().map(|entry| entry.name.as_deref())
    }
}

impl Progressor for Aggregate {
    fn progress(&self) -> Snapshot {
        let mut current: i64 = 0;
        let mut size: i64 = 0;
        let mut faults = Faults::new();
        let mut completed = 0;
        let mut first_unfinished = None;

        for (index, entry) in self.entries.iter().enumerate() {
            let snapshot = entry.source.progress();

            match self.strategy {
                Strategy::Normalize => {
                    current = current.saturating_add(normalized(&snapshot));
                    size = size.saturating_add(100);
                }
                Strategy::Sum => {
                    current = current.saturating_add(snapshot.current());
                    size = size.saturating_add(snapshot.size());
                }
            }

            if let Some(error) = snapshot.error() {
                faults.extend(error.notable().cloned());
            }

            if snapshot.is_complete() {
                completed += 1;
            } else if first_unfinished.is_none() {
                first_unfinished = Some(index);
            }
        }

        if completed == self.entries.len() {
            faults.push(Fault::Completed);
        }

        let index = first_unfinished.unwrap_or(0);
        self.current.store(index, Ordering::Relaxed);

        tracing::trace!(
            completed,
            total = self.entries.len(),
            current_index = index,
            "aggregated progress"
        );

        Snapshot::with_error(current, size, Some(faults))
    }
}

/// Percentage of a single source, truncated and clamped to `0..=100`.
fn normalized(snapshot: &Snapshot) -> i64 {
    let size = snapshot.size();
    if size <= 0 {
        return 0;
    }
    let current = snapshot.current().clamp(0, size);
    let percent = i128::from(current) * 100 / i128::from(size);
    i64::try_from(percent).unwrap_or(100)
}

impl fmt::Debug for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Aggregate")
            .field("names", &self.names().collect::<Vec<_>>())
            .field("strategy", &self.strategy)
            .field("current", &self.current_index())
            .finish()
    }
}

impl<P> Extend<P> for Aggregate
where
    P: Progressor + Send + Sync + 'static,
{
    fn extend<I: IntoIterator<Item = P>>(&mut self, iter: I) {
        self.register_all(iter);
    }
}
