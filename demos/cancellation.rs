//! Example demonstrating a snapshot stream that is cancelled before the work finishes.

use std::time::Duration;

use futures_util::StreamExt;
use progress_signal::{CancellationToken, ProgressorExt, StageSettable, Stager, Tracker};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,progress_signal=debug"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    println!("Starting cancellation example...");

    let tracker = Tracker::new(100);
    let worker = tracker.clone();
    tokio::spawn(async move {
        for i in 0..=100 {
            tokio::time::sleep(Duration::from_millis(50)).await;
            if i % 10 == 0 {
                worker.set(format!("Processing step {i}/100"));
            }
            worker.set_current(i);
        }
    });

    let token = CancellationToken::new();
    let mut snapshots = tracker
        .clone()
        .stream(token.clone(), Duration::from_millis(100));

    // Cancel after two seconds, long before the work is done
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(2)).await;
        println!("\n⚠️  Cancelling stream...");
        canceller.cancel();
    });

    while let Some(snapshot) = snapshots.next().await {
        print!(
            "\rProgress: {:.1}% ({}/{}) - {}",
            snapshot.percent(),
            snapshot.current(),
            snapshot.size(),
            tracker.stage()
        );
    }

    if token.is_cancelled() {
        println!("\n❌ Stream was cancelled!");
    } else {
        println!("\n✅ Progress completed!");
    }
}
