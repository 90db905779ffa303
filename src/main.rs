//! reqcache - fetch JSON endpoints through a disk-backed response cache
//!
//! Responses are memoized under the cache directory for the requested TTL,
//! so repeated invocations within that window are answered from disk.

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use reqcache::cli::{Action, Cli, RunConfig};
use reqcache::rates::ExchangeRateClient;
use reqcache::RequestCache;

/// Logs go to stderr, filtered by `RUST_LOG` (default `warn`).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(config: RunConfig) -> Result<(), Box<dyn std::error::Error>> {
    let cache = Arc::new(RequestCache::new(config.cache)?);

    match config.action {
        Action::Get { urls, ttl, params } => {
            let results = futures::future::join_all(
                urls.iter().map(|url| cache.get_json(url, ttl, &params)),
            )
            .await;

            let mut failed = 0;
            for (url, result) in urls.iter().zip(results) {
                match result {
                    Ok(value) => println!("{}", serde_json::to_string_pretty(&value)?),
                    Err(e) => {
                        eprintln!("{url}: {e}");
                        failed += 1;
                    }
                }
            }
            if failed > 0 {
                return Err(format!("{failed} of {} requests failed", urls.len()).into());
            }
        }
        Action::Rate {
            symbol,
            endpoint,
            ttl,
        } => {
            let client = ExchangeRateClient::new(cache, endpoint).with_ttl(ttl);
            let rate = client.fetch_rate(&symbol).await?;
            println!("{} {}", rate.symbol, rate.price);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let cli = Cli::parse();
    // Keep the Display form of argument errors in the exit message.
    let config = RunConfig::from_cli(&cli).map_err(|e| e.to_string())?;

    run(config).await
}
