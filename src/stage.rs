use std::sync::{Arc, PoisonError, RwLock};

use crate::{StageSettable, Stager};

/// A phase label that can be read and replaced from many threads.
///
/// The label is a reference-counted string behind a read-write lock. A store
/// replaces the whole `Arc` while holding the write lock and a load clones it
/// under the read lock, so a reader always observes one complete label that
/// was stored earlier. Neither side holds the lock longer than that.
#[derive(Debug)]
pub struct AtomicStage {
    current: RwLock<Arc<str>>,
}

impl AtomicStage {
    /// Creates a holder with its initial label.
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            current: RwLock::new(Arc::from(initial.into())),
        }
    }

    /// Replaces the label.
    pub fn set(&self, stage: impl Into<String>) {
        let stage: Arc<str> = Arc::from(stage.into());
        // a poisoned lock still holds a whole label
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = stage;
    }

    /// Returns the label without copying the string.
    #[must_use]
    pub fn load(&self) -> Arc<str> {
        let current = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*current)
    }
}

impl Stager for AtomicStage {
    fn stage(&self) -> String {
        self.load().to_string()
    }
}

impl StageSettable for AtomicStage {
    fn set(&self, stage: impl Into<String>) {
        Self::set(self, stage);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_initial_and_set() {
        let stage = AtomicStage::new("resolving");
        assert_eq!(stage.stage(), "resolving");

        stage.set("downloading");
        assert_eq!(stage.stage(), "downloading");
        assert_eq!(&*stage.load(), "downloading");
    }

    #[test]
    fn test_concurrent_readers_see_written_labels() {
        let labels: Vec<String> = (0..8)
            .map(|i| format!("stage-{i}-{}", "x".repeat(i * 64)))
            .collect();
        let stage = Arc::new(AtomicStage::new(labels[0].clone()));

        thread::scope(|scope| {
            for label in &labels {
                let stage = &stage;
                scope.spawn(move || {
                    for _ in 0..500 {
                        stage.set(label.clone());
                    }
                });
            }
            for _ in 0..4 {
                let stage = &stage;
                let labels = &labels;
                scope.spawn(move || {
                    for _ in 0..2_000 {
                        let seen = stage.stage();
                        assert!(labels.contains(&seen), "torn label: {seen}");
                    }
                });
            }
        });
    }
}
