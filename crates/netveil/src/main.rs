//! netveil: traffic classification harness
//!
//! Loads the block lists in the background, prints every traffic event as a
//! JSON line, and feeds stdin commands through the interception adapter.

mod config;
mod harness;

use anyhow::{Context, Result};
use config::{Config, DEFAULT_CONFIG_PATH};
use crossbeam_channel::Receiver;
use harness::{Command, Harness};
use netveil_blocklist::{BlockListStore, FileSource};
use netveil_bodystore::BodyProvider;
use netveil_engine::{
    CallerApp, CategoryFilter, EventBus, GuardAdapter, TrafficEvent, TrafficGuard,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

// Use mimalloc as the global allocator for reduced memory fragmentation
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    config.validate().context("Invalid configuration")?;

    // Initialize logging; RUST_LOG wins over the config file
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .context("Invalid log_level")?;
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    info!("netveil starting...");
    info!("Using mimalloc allocator");

    let store = BlockListStore::new();
    store.start_loading(
        FileSource::new("hosts", &config.blocklist.hosts_path),
        FileSource::new("urls", &config.blocklist.urls_path),
    );

    let bus = Arc::new(EventBus::with_capacity(config.events.channel_capacity));
    let printer = spawn_event_printer(bus.subscribe(CategoryFilter::Any))?;

    let bodies = BodyProvider::global(&config.bodystore.authority)
        .context("Invalid body store authority")?;
    let guard = TrafficGuard::new(store.clone(), bus.clone())
        .with_body_sink(Arc::new(bodies.clone()));
    let caller = CallerApp::new(&config.caller.package_name, &config.caller.display_name);
    let harness = Harness::new(GuardAdapter::new(guard), store, bodies, caller);

    run_commands(&harness)?;

    // Closing the bus disconnects the printer
    drop(harness);
    drop(bus);
    if printer.join().is_err() {
        warn!("Event printer panicked");
    }

    info!("netveil shutting down");
    Ok(())
}

/// Print every event as one JSON line on stdout
fn spawn_event_printer(events: Receiver<TrafficEvent>) -> Result<thread::JoinHandle<()>> {
    let handle = thread::Builder::new()
        .name("event-printer".to_string())
        .spawn(move || {
            for event in events.iter() {
                match serde_json::to_string(&event) {
                    Ok(line) => println!("{}", line),
                    Err(e) => warn!("Failed to serialize event: {}", e),
                }
            }
        })
        .context("Failed to spawn event printer")?;
    Ok(handle)
}

fn run_commands(harness: &Harness) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = line.context("Failed to read stdin")?;
        let output = match Command::parse(&line) {
            Ok(None) => continue,
            Ok(Some(command)) => harness.execute(command),
            Err(e) => Err(e),
        };

        match output {
            Ok(text) => writeln!(stdout, "{}", text)?,
            Err(e) => writeln!(stdout, "error: {}", e)?,
        }
        stdout.flush()?;
    }
    Ok(())
}
