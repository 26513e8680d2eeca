//! Example demonstrating the convenient observe extension.

use std::time::Duration;

use progress_signal::{ProgressorExt, StageSettable, Stager, track};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,progress_signal=debug"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    println!("Starting observe extension example...");

    let task = track(100, |tracker| async move {
        for i in 1..=100 {
            // Simulate some work
            tokio::time::sleep(Duration::from_millis(50)).await;

            if i % 10 == 0 {
                tracker.set(format!("Processing step {i}/100"));
            }
            tracker.advance(1);
        }
        "Task completed successfully!"
    });

    let tracker = task.tracker();
    let result = task
        .tracker()
        .observe(task, Duration::from_millis(100), |snapshot| {
            print!(
                "\rProgress: {:.1}% ({}/{})",
                snapshot.percent(),
                snapshot.current(),
                snapshot.size()
            );
            if snapshot.is_complete() {
                println!("\n✅ Progress completed!");
            }
        })
        .await;

    println!("\nTask result: {result} (last stage: {})", tracker.stage());
}
