use bundlegrep::cache::Cache;
use bundlegrep::cli::Cli;
use bundlegrep::config::Config;
use bundlegrep::error::{BundleGrepError, Result};
use bundlegrep::request::Request;
use bundlegrep::search::{PatternCache, SearchEngine};
use clap::Parser;
use env_logger::{Builder, Env, Target};
use log::{debug, info};
use std::fs;
use std::process::ExitCode;
use std::time::Instant;

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    setup_logging(cli)?;
    let start_time = Instant::now();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    config.validate()?;
    debug!("Configuration: {config:?}");

    let cache = config.cache.build()?;
    if cli.clear_cache {
        if let Some(cache) = &cache {
            cache.reset()?;
            info!("Query cache cleared");
        }
    }

    let patterns = PatternCache::new(config.search.pattern_cache_size)?;
    let request = cli.to_request(&patterns)?;
    let engine = SearchEngine::from_bundle(&cli.bundle, &config, cache)?;

    let printable = request.execute(&engine)?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&printable.to_json())?);
    } else {
        print!("{}", printable.render());
    }

    info!("Finished in {:.2?}", start_time.elapsed());
    Ok(())
}

fn setup_logging(cli: &Cli) -> Result<()> {
    let mut builder = Builder::from_env(Env::default().default_filter_or("warn"));

    builder.format(|buf, record| {
        use std::io::Write;
        writeln!(
            buf,
            "{} [{}] [{}] {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            record.level(),
            record.module_path().unwrap_or("unknown"),
            record.args()
        )
    });

    if let Some(log_path) = &cli.log {
        if let Some(parent_dir) = log_path.parent() {
            if !parent_dir.as_os_str().is_empty() && !parent_dir.exists() {
                fs::create_dir_all(parent_dir).map_err(BundleGrepError::Io)?;
            }
        }
        let log_file = fs::File::create(log_path).map_err(BundleGrepError::Io)?;
        builder.target(Target::Pipe(Box::new(log_file)));
    } else {
        builder.target(Target::Stderr);
    }

    builder
        .try_init()
        .map_err(|e| BundleGrepError::Other(e.to_string()))?;
    Ok(())
}
