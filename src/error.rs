use std::{error::Error, fmt, io, sync::Arc};

/// A single fault recorded by a progress source.
///
/// Two variants are routine terminal markers rather than failures:
/// [`EndOfStream`](Fault::EndOfStream) and [`Completed`](Fault::Completed).
/// Aggregation drops them from the surfaced error list, but any fault at all
/// still marks a [`Snapshot`](crate::Snapshot) as complete.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Fault {
    /// The underlying stream reached its end.
    #[error("end of stream")]
    EndOfStream,
    /// The source has been explicitly marked as done.
    #[error("progress already completed")]
    Completed,
    /// Any other failure reported by a source.
    #[error(transparent)]
    Other(Arc<dyn Error + Send + Sync>),
}

impl Fault {
    /// Wraps an arbitrary error as a notable fault.
    pub fn other(error: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        Self::Other(Arc::from(error.into()))
    }

    /// Returns `true` for the end-of-stream and completed markers.
    #[must_use]
    pub const fn is_routine(&self) -> bool {
        matches!(self, Self::EndOfStream | Self::Completed)
    }

    /// Returns `true` for anything that should be surfaced to the user.
    #[must_use]
    pub const fn is_notable(&self) -> bool {
        !self.is_routine()
    }
}

/// Every I/O error is notable, `UnexpectedEof` included: a reader reports
/// its end with `Ok(0)`, so an `UnexpectedEof` means truncated input.
impl From<io::Error> for Fault {
    fn from(error: io::Error) -> Self {
        Self::Other(Arc::new(error))
    }
}

/// An ordered collection of faults.
///
/// Sources append to it as failures happen and the aggregate merges the
/// notable faults of all its sources into one, so one error never hides
/// another.
#[derive(Debug, Clone, Default)]
pub struct Faults {
    faults: Vec<Fault>,
}

impl Faults {
    /// Creates an empty collection.
    #[must_use]
    pub const fn new() -> Self {
        Self { faults: Vec::new() }
    }

    /// Appends a fault.
    pub fn push(&mut self, fault: impl Into<Fault>) {
        self.faults.push(fault.into());
    }

    /// Appends a fault unless it is a routine marker that is already present.
    ///
    /// Sources that hit their end repeatedly keep a single marker, so the
    /// collection only grows with notable faults.
    pub fn record(&mut self, fault: impl Into<Fault>) {
        let fault = fault.into();
        let duplicate = match fault {
            Fault::EndOfStream => self.contains_end_of_stream(),
            Fault::Completed => self.contains_completed(),
            Fault::Other(_) => false,
        };
        if !duplicate {
            self.faults.push(fault);
        }
    }

    /// Number of recorded faults.
    #[must_use]
    pub fn len(&self) -> usize {
        self.faults.len()
    }

    /// Returns `true` if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.faults.is_empty()
    }

    /// Iterates over the faults in the order they were recorded.
    pub fn iter(&self) -> std::slice::Iter<'_, Fault> {
        self.faults.iter()
    }

    /// Iterates over the faults that are neither end-of-stream nor completed.
    pub fn notable(&self) -> impl Iterator<Item = &Fault> {
        self.faults.iter().filter(|fault| fault.is_notable())
    }

    /// Returns `true` if the completed sentinel is present.
    #[must_use]
    pub fn contains_completed(&self) -> bool {
        self.faults.iter().any(|fault| matches!(fault, Fault::Completed))
    }

    /// Returns `true` if end of stream has been recorded.
    #[must_use]
    pub fn contains_end_of_stream(&self) -> bool {
        self.faults
            .iter()
            .any(|fault| matches!(fault, Fault::EndOfStream))
    }

    /// Returns `true` if every recorded fault is a routine marker.
    #[must_use]
    pub fn is_routine(&self) -> bool {
        self.faults.iter().all(Fault::is_routine)
    }
}

impl fmt::Display for Faults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.faults.as_slice() {
            [] => f.write_str("no errors"),
            [fault] => write!(f, "1 error occurred:\n\t* {fault}"),
            faults => {
                write!(f, "{} errors occurred:", faults.len())?;
                for fault in faults {
                    write!(f, "\n\t* {fault}")?;
                }
                Ok(())
            }
        }
    }
}

impl Error for Faults {}

impl From<Fault> for Faults {
    fn from(fault: Fault) -> Self {
        Self {
            faults: vec![fault],
        }
    }
}

impl FromIterator<Fault> for Faults {
    fn from_iter<I: IntoIterator<Item = Fault>>(iter: I) -> Self {
        Self {
            faults: iter.into_iter().collect(),
        }
    }
}

impl Extend<Fault> for Faults {
    fn extend<I: IntoIterator<Item = Fault>>(&mut self, iter: I) {
        self.faults.extend(iter);
    }
}

impl IntoIterator for Faults {
    type Item = Fault;
    type IntoIter = std::vec::IntoIter<Fault>;

    fn into_iter(self) -> Self::IntoIter {
        self.faults.into_iter()
    }
}

impl<'a> IntoIterator for &'a Faults {
    type Item = &'a Fault;
    type IntoIter = std::slice::Iter<'a, Fault>;

    fn into_iter(self) -> Self::IntoIter {
        self.faults.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routine_faults() {
        assert!(Fault::EndOfStream.is_routine());
        assert!(Fault::Completed.is_routine());
        assert!(Fault::other("disk full").is_notable());
    }

    #[test]
    fn test_io_errors_are_notable() {
        let fault = Fault::from(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "corrupt archive: truncated",
        ));
        assert!(fault.is_notable());
        assert_eq!(fault.to_string(), "corrupt archive: truncated");

        let fault = Fault::from(io::Error::other("disk full"));
        assert!(fault.is_notable());
        assert_eq!(fault.to_string(), "disk full");
    }

    #[test]
    fn test_notable_filters_markers() {
        let faults: Faults = [
            Fault::EndOfStream,
            Fault::other("disk full"),
            Fault::Completed,
        ]
        .into_iter()
        .collect();

        assert_eq!(faults.len(), 3);
        assert!(faults.contains_completed());
        assert!(faults.contains_end_of_stream());
        assert!(!faults.is_routine());

        let notable: Vec<String> = faults.notable().map(ToString::to_string).collect();
        assert_eq!(notable, ["disk full"]);
    }

    #[test]
    fn test_record_keeps_one_marker() {
        let mut faults = Faults::new();
        for _ in 0..3 {
            faults.record(Fault::EndOfStream);
            faults.record(Fault::Completed);
            faults.record(Fault::other("disk full"));
        }

        assert_eq!(faults.len(), 5);
        assert_eq!(faults.notable().count(), 3);
        assert!(faults.contains_end_of_stream());
        assert!(faults.contains_completed());
    }

    #[test]
    fn test_display() {
        let single = Faults::from(Fault::Completed);
        assert_eq!(
            single.to_string(),
            "1 error occurred:\n\t* progress already completed"
        );

        let mut many = Faults::new();
        many.push(Fault::other("disk full"));
        many.push(io::Error::other("connection reset"));
        assert_eq!(
            many.to_string(),
            "2 errors occurred:\n\t* disk full\n\t* connection reset"
        );
    }
}
