//! Byte-counting pass-through wrappers for [`std::io`].

use std::{
    io::{self, Read, Write},
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicI64, Ordering},
    },
};

use crate::{Fault, Faultable, Faults, Measurable};

/// Shared byte count of a [`Reader`] or [`Writer`].
///
/// Cloning is cheap and every clone observes the same counters, so one clone
/// can be registered with an [`Aggregate`](crate::Aggregate) while the
/// wrapper is moved into the code doing the I/O.
#[derive(Debug, Clone)]
pub struct ByteCounter {
    inner: Arc<CounterInner>,
}

#[derive(Debug)]
struct CounterInner {
    bytes: AtomicI64,
    size: AtomicI64,
    faults: Mutex<Faults>,
}

impl ByteCounter {
    /// Creates a counter for a transfer of `size` bytes; negative means unknown.
    #[must_use]
    pub fn new(size: i64) -> Self {
        Self {
            inner: Arc::new(CounterInner {
                bytes: AtomicI64::new(0),
                size: AtomicI64::new(size),
                faults: Mutex::new(Faults::new()),
            }),
        }
    }

    /// Adds transferred bytes.
    pub fn add(&self, bytes: usize) {
        let bytes = i64::try_from(bytes).unwrap_or(i64::MAX);
        self.inner.bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Updates the expected size, e.g. once a `Content-Length` is known.
    pub fn set_size(&self, size: i64) {
        self.inner.size.store(size, Ordering::Relaxed);
    }

    /// Records a fault. Routine markers are kept once.
    pub fn record(&self, fault: impl Into<Fault>) {
        let fault = fault.into();
        if fault.is_notable() {
            tracing::debug!(error = %fault, "byte counter recorded a fault");
        }
        self.inner
            .faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record(fault);
    }

    /// Marks the transfer as done, for streams without a natural end.
    pub fn set_completed(&self) {
        self.record(Fault::Completed);
    }
}

impl Measurable for ByteCounter {
    fn current(&self) -> i64 {
        self.inner.bytes.load(Ordering::Relaxed)
    }

    fn size(&self) -> i64 {
        self.inner.size.load(Ordering::Relaxed)
    }
}

impl Faultable for ByteCounter {
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

/// A reader that counts the bytes passing through it.
///
/// Reaching the end of the wrapped reader records [`Fault::EndOfStream`];
/// read errors are recorded and returned unchanged.
#[derive(Debug)]
pub struct Reader<R> {
    reader: R,
    counter: ByteCounter,
}

impl<R: Read> Reader<R> {
    /// Wraps a reader of unknown length.
    pub fn new(reader: R) -> Self {
        Self::with_size(reader, -1)
    }

    /// Wraps a reader that is expected to yield `size` bytes.
    pub fn with_size(reader: R, size: i64) -> Self {
        Self {
            reader,
            counter: ByteCounter::new(size),
        }
    }

    /// Replaces the wrapped reader, keeping the counts.
    pub fn set_reader(&mut self, reader: R) {
        self.reader = reader;
    }

    /// Returns a shared handle to the counters.
    #[must_use]
    pub fn counter(&self) -> ByteCounter {
        self.counter.clone()
    }

    /// Unwraps the inner reader.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read> Read for Reader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.reader.read(buf) {
            Ok(0) if !buf.is_empty() => {
                self.counter.record(Fault::EndOfStream);
                Ok(0)
            }
            Ok(n) => {
                self.counter.add(n);
                Ok(n)
            }
            Err(error) if error.kind() == io::ErrorKind::Interrupted => Err(error),
            Err(error) => {
                self.counter.record(clone_io_error(&error));
                Err(error)
            }
        }
    }
}

/// A writer that counts the bytes passing through it.
#[derive(Debug)]
pub struct Writer<W> {
    writer: W,
    counter: ByteCounter,
}

impl Writer<io::Sink> {
    /// A writer that discards everything and only counts.
    #[must_use]
    pub fn sink() -> Self {
        Self::new(io::sink())
    }
}

impl<W: Write> Writer<W> {
    /// Wraps a writer with an unknown total.
    pub fn new(writer: W) -> Self {
        Self::with_size(writer, -1)
    }

    /// Wraps a writer that is expected to receive `size` bytes.
    pub fn with_size(writer: W, size: i64) -> Self {
        Self {
            writer,
            counter: ByteCounter::new(size),
        }
    }

    /// Returns a shared handle to the counters.
    #[must_use]
    pub fn counter(&self) -> ByteCounter {
        self.counter.clone()
    }

    /// Unwraps the inner writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Write for Writer<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.writer.write(buf) {
            Ok(n) => {
                self.counter.add(n);
                Ok(n)
            }
            Err(error) if error.kind() == io::ErrorKind::Interrupted => Err(error),
            Err(error) => {
                self.counter.record(clone_io_error(&error));
                Err(error)
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

// io::Error is not Clone; the caller keeps the original
fn clone_io_error(error: &io::Error) -> io::Error {
    io::Error::new(error.kind(), error.to_string())
}
