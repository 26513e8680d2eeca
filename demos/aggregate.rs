//! Aggregating several downloads and a cooldown timer into one stream of snapshots.

use std::{io::Read, sync::Arc, time::Duration};

use futures_util::StreamExt;
use progress_signal::{
    Aggregate, CancellationToken, ProgressorExt, Reader, Strategy, TimedProgress,
};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Hands out `chunk` bytes per read, pausing between reads.
struct SlowSource {
    remaining: usize,
    chunk: usize,
}

impl Read for SlowSource {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        std::thread::sleep(Duration::from_millis(20));
        let n = self.remaining.min(self.chunk).min(buf.len());
        buf[..n].fill(b'.');
        self.remaining -= n;
        Ok(n)
    }
}

#[tokio::main]
async fn main() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,progress_signal=debug"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut aggregate = Aggregate::new().with_strategy(Strategy::Normalize);
    let mut readers = Vec::new();
    for (name, size, chunk) in [("kernel", 4_096, 256), ("initrd", 16_384, 1_024)] {
        let reader = Reader::with_size(
            SlowSource {
                remaining: size,
                chunk,
            },
            i64::try_from(size).unwrap_or(i64::MAX),
        );
        aggregate.register_named(name, reader.counter());
        readers.push(reader);
    }
    aggregate.register_named("cooldown", TimedProgress::new(Duration::from_secs(2)));
    let aggregate = Arc::new(aggregate);

    for mut reader in readers {
        tokio::task::spawn_blocking(move || {
            let mut sink = Vec::new();
            reader.read_to_end(&mut sink)
        });
    }

    let token = CancellationToken::new();
    let mut snapshots = Arc::clone(&aggregate).stream(token, Duration::from_millis(100));

    while let Some(snapshot) = snapshots.next().await {
        print!(
            "\rProgress: {:.1}% [{}]      ",
            snapshot.percent(),
            aggregate.current_name().unwrap_or("-"),
        );
        if snapshot.is_complete() {
            println!("\n✅ All sources completed!");
        }
    }
}
