//! Headless type effectiveness tracker.
//!
//! Reads observed resource URLs (or bare creature ids) from stdin, one per
//! line, and prints the type effectiveness panel of each creature seen.
//!
//! ```bash
//! cargo run -p typedex -- --cache-dir ~/.cache/typedex
//! ```

mod headless;

use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use typedex_core::TrackerConfig;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    let config = config_from_env(&args)?;
    headless::run_headless(config).await?;
    Ok(())
}

/// Build the tracker config from the environment, then command line overrides.
fn config_from_env(args: &[String]) -> Result<TrackerConfig, String> {
    let mut config = TrackerConfig::new().with_cache_dir(".typedex");

    if let Ok(base) = std::env::var("TYPEDEX_API_BASE") {
        config = config.with_api_base(base);
    }
    if let Ok(dir) = std::env::var("TYPEDEX_CACHE_DIR") {
        config = config.with_cache_dir(dir);
    }
    if let Ok(secs) = std::env::var("TYPEDEX_TIMEOUT_SECS") {
        let secs: u64 = secs
            .parse()
            .map_err(|e| format!("TYPEDEX_TIMEOUT_SECS: {e}"))?;
        config = config.with_request_timeout(Duration::from_secs(secs));
    }

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--cache-dir" => {
                let dir = args.get(i + 1).ok_or("--cache-dir needs a path")?;
                config = config.with_cache_dir(PathBuf::from(dir));
                i += 1;
            }
            "--no-cache" => config.cache_dir = None,
            "--api-base" => {
                let base = args.get(i + 1).ok_or("--api-base needs a URL")?;
                config = config.with_api_base(base.clone());
                i += 1;
            }
            other => return Err(format!("unknown argument: {other}")),
        }
        i += 1;
    }

    Ok(config)
}

fn print_help() {
    println!("typedex - type effectiveness for observed creatures");
    println!();
    println!("USAGE:");
    println!("    typedex [OPTIONS] < observed-urls.txt");
    println!();
    println!("OPTIONS:");
    println!("    --cache-dir <DIR>    Persist caches in DIR (default: .typedex)");
    println!("    --no-cache           Keep caches in memory only");
    println!("    --api-base <URL>     REST API base (default: https://pokeapi.co/api/v2)");
    println!("    -h, --help           Show this help");
    println!();
    println!("ENVIRONMENT:");
    println!("    TYPEDEX_API_BASE, TYPEDEX_CACHE_DIR, TYPEDEX_TIMEOUT_SECS, RUST_LOG");
}
