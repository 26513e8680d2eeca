use std::sync::Arc;

use crate::{Faults, Snapshot};

/// Something with a current amount and a total size.
///
/// A negative size means the total is unknown.
pub trait Measurable {
    /// Amount of work done so far.
    fn current(&self) -> i64;

    /// Total amount of work, or a negative value when unknown.
    fn size(&self) -> i64;
}

/// Something that can report faults.
pub trait Faultable {
    /// Returns the faults recorded so far, or `None` if there are none.
    fn error(&self) -> Option<Faults>;
}

/// A source that is both [`Measurable`] and [`Faultable`].
///
/// This trait is implemented automatically. Every `Progressable` is also a
/// [`Progressor`], so it can be registered with an
/// [`Aggregate`](crate::Aggregate) or sampled directly.
pub trait Progressable: Measurable + Faultable {
    /// Applies the completion rule of [`Snapshot::is_complete`] to the live
    /// values of this source.
    fn is_complete(&self) -> bool {
        if self.error().is_some() {
            return true;
        }
        let size = self.size();
        size > 0 && self.current() >= size
    }
}

impl<T: Measurable + Faultable + ?Sized> Progressable for T {}

/// Something that can produce a [`Snapshot`] on demand.
pub trait Progressor {
    /// Takes a snapshot of the current progress.
    fn progress(&self) -> Snapshot;
}

impl<T: Progressable + ?Sized> Progressor for T {
    fn progress(&self) -> Snapshot {
        Snapshot::with_error(self.current(), self.size(), self.error())
    }
}

impl<T: Progressor + ?Sized> Progressor for Arc<T> {
    fn progress(&self) -> Snapshot {
        (**self).progress()
    }
}

/// Something with a human-readable phase label.
pub trait Stager {
    /// Returns the current phase label.
    fn stage(&self) -> String;
}

/// A [`Stager`] whose label can be replaced through a shared reference.
pub trait StageSettable: Stager {
    /// Replaces the current phase label.
    fn set(&self, stage: impl Into<String>);
}

/// A [`Progressable`] source that also exposes a phase label.
pub trait StagedProgressable: Stager + Progressable {}

impl<T: Stager + Progressable + ?Sized> StagedProgressable for T {}

/// A [`Progressor`] that also exposes a phase label.
pub trait StagedProgressor: Stager + Progressor {}

impl<T: Stager + Progressor + ?Sized> StagedProgressor for T {}

impl<T: Stager + ?Sized> Stager for Arc<T> {
    fn stage(&self) -> String {
        (**self).stage()
    }
}
