//! Workers contending for a small pool behind a configured strategy chain.
//!
//! Run with `cargo run -p nebula-pool-strategy --example grow_on_timeout`.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use nebula_pool_strategy::{
    AcquisitionStrategy, BoundedPool, ChainConfig, PoolAdapter, RequestContext, StrategyContext,
};
use nebula_telemetry::MetricsRegistry;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let config: ChainConfig = serde_json::from_str(
        r#"{
            "layers": [
                { "strategy": "retry", "attempts": 2 },
                { "strategy": "grow_on_timeout", "max_overflow_pool_size": 4 }
            ]
        }"#,
    )?;

    let pool = Arc::new(BoundedPool::new(2, Duration::from_millis(50)));
    let metrics = Arc::new(MetricsRegistry::new());
    let context = StrategyContext::new(pool.clone(), metrics.clone());
    let chain = config.build(&context)?;

    thread::scope(|s| {
        for worker in 0..6 {
            let chain = &chain;
            s.spawn(move || {
                let mut request = RequestContext::new();
                match chain.acquire(&mut request) {
                    Ok(lease) => {
                        println!(
                            "worker {worker}: lease #{} after {} retries",
                            lease.id(),
                            request.retry_attempts()
                        );
                        thread::sleep(Duration::from_millis(200));
                    }
                    Err(err) => println!("worker {worker}: gave up: {err}"),
                }
            });
        }
    });

    println!("final max pool size: {}", pool.max_pool_size());
    for (name, samples) in metrics.snapshot() {
        println!("{name}: {samples:?}");
    }
    Ok(())
}
