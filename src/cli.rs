//! Command-line interface parsing for reqcache
//!
//! Maps CLI flags onto a [`CacheConfig`] and the action to run: fetching
//! one or more URLs through the cache, or looking up an exchange rate.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::config::CacheConfig;
use crate::rates::RATE_CACHE_TTL_SECS;
use crate::Params;

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// A `--param` value is not of the form KEY=VALUE
    #[error("Invalid parameter: '{0}'. Expected KEY=VALUE with a non-empty key")]
    InvalidParam(String),

    /// The same `--param` key was given twice
    #[error("Duplicate parameter: '{0}'")]
    DuplicateParam(String),
}

/// reqcache - fetch JSON endpoints through a disk-backed response cache
#[derive(Parser, Debug)]
#[command(name = "reqcache")]
#[command(about = "Fetch JSON endpoints through a disk-backed response cache")]
#[command(version)]
pub struct Cli {
    /// Directory holding cache files [default: <system temp>/request-cache]
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Let only one request per cache key go to the network at a time
    #[arg(long, global = true)]
    pub single_flight: bool,

    /// Do not cache responses whose status is not 200
    #[arg(long, global = true)]
    pub no_cache_errors: bool,

    /// Request timeout in seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch one or more URLs and print their JSON bodies
    ///
    /// Examples:
    ///   reqcache get https://api.example.com/ticker --ttl 30 -p symbol=BTC
    ///   reqcache get https://a.example/x https://b.example/y --ttl 60
    Get {
        /// URLs to fetch; all share the same parameters and TTL
        #[arg(required = true, value_name = "URL")]
        urls: Vec<String>,

        /// Cache lifetime in seconds; omit or pass 0 to bypass the cache
        #[arg(long, value_name = "SECS")]
        ttl: Option<u64>,

        /// Query parameter, repeatable
        #[arg(short = 'p', long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,
    },

    /// Look up the price of a symbol on a ticker endpoint
    Rate {
        /// Symbol to look up, sent as the `symbol` query parameter
        symbol: String,

        /// Ticker endpoint answering {"price": ...}
        #[arg(long, value_name = "URL")]
        endpoint: String,

        /// Cache lifetime in seconds
        #[arg(long, value_name = "SECS", default_value_t = RATE_CACHE_TTL_SECS)]
        ttl: u64,
    },
}

/// What to run once the cache is built
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Get {
        urls: Vec<String>,
        ttl: Option<u64>,
        params: Params,
    },
    Rate {
        symbol: String,
        endpoint: String,
        ttl: u64,
    },
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub cache: CacheConfig,
    pub action: Action,
}

/// Parses a `KEY=VALUE` argument into a key/value pair.
///
/// Only the first `=` separates; the value may itself contain `=` or be empty.
pub fn parse_param_arg(s: &str) -> Result<(String, String), CliError> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(CliError::InvalidParam(s.to_string())),
    }
}

impl RunConfig {
    /// Creates a RunConfig from parsed CLI arguments.
    ///
    /// # Returns
    /// * `Ok(RunConfig)` with the cache settings and the action to run
    /// * `Err(CliError)` if a `--param` is malformed or repeated
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let mut cache = CacheConfig::default()
            .with_single_flight(cli.single_flight)
            .with_cache_error_responses(!cli.no_cache_errors);
        if let Some(dir) = &cli.cache_dir {
            cache = cache.with_cache_dir(dir);
        }
        if let Some(secs) = cli.timeout {
            cache = cache.with_timeout(Duration::from_secs(secs));
        }

        let action = match &cli.command {
            Command::Get { urls, ttl, params } => {
                let mut parsed = Params::new();
                for arg in params {
                    let (key, value) = parse_param_arg(arg)?;
                    if parsed.insert(key.clone(), value).is_some() {
                        return Err(CliError::DuplicateParam(key));
                    }
                }
                Action::Get {
                    urls: urls.clone(),
                    ttl: *ttl,
                    params: parsed,
                }
            }
            Command::Rate {
                symbol,
                endpoint,
                ttl,
            } => Action::Rate {
                symbol: symbol.clone(),
                endpoint: endpoint.clone(),
                ttl: *ttl,
            },
        };

        Ok(RunConfig { cache, action })
    }
}
