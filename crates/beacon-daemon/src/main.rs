//! Beacon daemon - agent presence over HTTP.
//!
//! Wires the core components together, serves the HTTP surface on
//! 127.0.0.1 and runs the background loops until Ctrl-C.

mod args;
mod fake;

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;

use beacon_core::error::Result;
use beacon_core::event_bus::EventBus;
use beacon_core::hooks::HookNormalizer;
use beacon_core::logging::{open_log_file, run_event_journal};
use beacon_core::platform::{NullPlatformMonitor, PlatformMonitor};
use beacon_core::session::{OrchestratorConfig, SessionOrchestrator, SessionRegistry};
use beacon_core::transcript::TranscriptWatcher;
use beacon_http::SharedState;

use crate::args::Args;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if let Err(e) = run(args).await {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let config = args.load_config()?;
    log::info!(
        "Starting beacon-daemon {} (port={}, target={}, fake={})",
        env!("CARGO_PKG_VERSION"),
        config.port,
        config.target_process_name,
        config.fake_mode
    );

    let cancel = CancellationToken::new();
    let event_bus = Arc::new(EventBus::with_capacity(config.subscriber_capacity));

    log::warn!("No native platform monitor in this build, focus suppression is unavailable");
    let monitor: Arc<dyn PlatformMonitor> = Arc::new(NullPlatformMonitor::new());

    let orchestrator = Arc::new(SessionOrchestrator::new(
        Arc::new(SessionRegistry::new()),
        monitor,
        Arc::clone(&event_bus),
        OrchestratorConfig::from(&config),
    ));
    let transcript_watcher = Arc::new(TranscriptWatcher::new(
        orchestrator.clone(),
        config.approval_delay(),
        config.transcript_poll_interval(),
    ));

    let mut tasks = Vec::new();

    if let Some(dir) = &args.event_log_dir {
        let handle = open_log_file(Some(dir.as_path()), "events");
        tasks.push(tokio::spawn(run_event_journal(
            Arc::clone(&event_bus),
            handle,
            cancel.clone(),
        )));
        log::info!("Journaling events to {}", dir.join("events.log").display());
    }

    if config.fake_mode {
        tasks.push(tokio::spawn(fake::run_fake_events(
            Arc::clone(&event_bus),
            cancel.clone(),
        )));
    } else {
        tasks.push(tokio::spawn(Arc::clone(&orchestrator).run(cancel.clone())));
        tasks.push(tokio::spawn(
            Arc::clone(&transcript_watcher).run(cancel.clone()),
        ));
        tasks.push(tokio::spawn(
            Arc::clone(&transcript_watcher).forget_ended_sessions(
                Arc::clone(&event_bus),
                cancel.clone(),
            ),
        ));
    }

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                log::info!("Shutdown requested");
                shutdown.cancel();
            }
            Err(e) => log::warn!("Cannot listen for Ctrl-C: {}", e),
        }
    });

    let state = Arc::new(SharedState::new(
        event_bus,
        orchestrator,
        transcript_watcher,
        HookNormalizer::new(&config),
    ));
    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let served = beacon_http::serve(state, addr, cancel.clone()).await;

    cancel.cancel();
    for task in tasks {
        let _ = task.await;
    }
    log::info!("beacon-daemon stopped");

    served.map_err(Into::into)
}
