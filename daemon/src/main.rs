//! Tonal daemon
//!
//! Runs the effects service against the in-memory platform host and
//! reads commands from stdin, one per line.

mod commands;
mod config;

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tonal_core::{
    DeviceConfigurationStore, EffectsService, JsonConfigStore, MemoryConfigStore,
};
use tonal_platform::stub::{StubEffectHost, StubRoutingSource};
use tonal_platform::PlatformEffectFactory;

use commands::{Command, Flow, ManualRecording, Session, HELP};
use config::DaemonConfig;

fn main() -> Result<()> {
    let config = DaemonConfig::from_env()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting Tonal effects daemon");

    let mut host = StubEffectHost::new();
    if config.vendor_bundle {
        host = host.with_vendor_bundle();
    }
    let factory = Arc::new(
        PlatformEffectFactory::new(Arc::new(host)).with_vendor_preference(config.prefer_vendor),
    );
    if factory.uses_vendor() {
        info!("Using vendor effect bundle");
    }

    let store = open_store(&config)?;
    let routing = Arc::new(StubRoutingSource::new());
    let recording = Arc::new(ManualRecording::default());

    let service = EffectsService::start(
        factory,
        store,
        routing.clone(),
        recording.clone(),
        config.service.clone(),
    )
    .context("starting effects service")?;

    let session = Session {
        service: &service,
        routing: &routing,
        recording: &recording,
    };

    println!("{}", HELP);
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    for line in stdin.lock().lines() {
        let line = line.context("reading stdin")?;
        match Command::parse(&line).and_then(|cmd| match cmd {
            Some(cmd) => session.execute(cmd),
            None => Ok(Flow::Continue),
        }) {
            Ok(Flow::Continue) => {}
            Ok(Flow::Stop) => break,
            Err(e) => error!("{:#}", e),
        }
        stdout.flush()?;
    }

    service.shutdown();
    info!("Tonal effects daemon stopped");
    Ok(())
}

fn open_store(config: &DaemonConfig) -> Result<Arc<dyn DeviceConfigurationStore>> {
    if config.ephemeral {
        info!("Keeping device settings in memory");
        return Ok(Arc::new(MemoryConfigStore::new()));
    }
    let store = match &config.settings_path {
        Some(path) => JsonConfigStore::open(path.clone()),
        None => JsonConfigStore::open_default().context("locating settings directory")?,
    };
    info!("Device settings at {:?}", store.path());
    Ok(Arc::new(store))
}
