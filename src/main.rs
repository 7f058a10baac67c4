//! Headless driver: ticks a synthetic world through the chunk-update scheduler.

mod config;
mod sim;

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use strata_runtime::{ChunkUpdateManager, SchedulerStats, TickOutcome};

use crate::config::AppConfig;
use crate::sim::SimWorld;

#[derive(Parser, Debug)]
#[command(name = "strata", about = "Drive the chunk-update scheduler against a synthetic world")]
struct Cli {
    /// TOML file with [scheduler] and [sim] sections.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, default_value_t = 600)]
    ticks: u64,
    #[arg(long, default_value_t = 16)]
    tick_ms: u64,
    /// Log scheduler stats every n ticks (0 = only at exit).
    #[arg(long, default_value_t = 60)]
    report_every: u64,
    /// Log filter, e.g. `debug` or `chunk_updates=trace`. Overrides RUST_LOG.
    #[arg(long)]
    log: Option<String>,
    #[arg(long)]
    max_workers: Option<usize>,
}

fn init_logging(filter: Option<&str>) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(filter) = filter {
        builder.parse_filters(filter);
    }
    builder.format_timestamp_millis().init();
}

fn report(tick: u64, stats: &SchedulerStats) {
    log::info!(
        "[tick {}] dirty={} vbo_queue={} in_flight={} active={}/{} peak={} mean_ms={:.3} dispatched={} deferred={} completed={} uploaded={}",
        tick,
        stats.dirty_chunks,
        stats.vbo_queue,
        stats.in_flight,
        stats.active_workers,
        stats.worker_cap,
        stats.peak_workers,
        stats.mean_update_ms,
        stats.dispatched,
        stats.deferred,
        stats.completed,
        stats.uploaded
    );
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(cli.log.as_deref());

    let mut cfg = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => AppConfig::default(),
    };
    if let Some(n) = cli.max_workers {
        cfg.scheduler.max_workers = Some(n);
    }

    let world = Arc::new(SimWorld::new(&cfg.sim));
    log::info!(
        "sim world: {} loaded chunks, radius {}, chunk size {}",
        world.loaded_count(),
        cfg.sim.radius,
        cfg.sim.chunk_size
    );
    let mgr = ChunkUpdateManager::new(Arc::clone(&world), &cfg.scheduler)?;
    mgr.bind_render_thread()?;

    let tick_sleep = Duration::from_millis(cli.tick_ms);
    for tick in 0..cli.ticks {
        world.advance(tick);
        match mgr.process_chunk_updates() {
            TickOutcome::Idle => {
                log::trace!(target: "events", "[tick {}] idle", tick);
            }
            outcome => {
                log::trace!(target: "events", "[tick {}] {:?}", tick, outcome);
            }
        }
        mgr.update_vbos()?;
        if cli.report_every > 0 && tick % cli.report_every == 0 {
            report(tick, &mgr.stats());
        }
        if !tick_sleep.is_zero() {
            thread::sleep(tick_sleep);
        }
    }

    if !mgr.wait_idle(Duration::from_secs(5)) {
        log::warn!("workers still busy at shutdown; abandoning {} chunk(s)", mgr.in_flight().in_flight());
    }
    mgr.update_vbos()?;
    report(cli.ticks, &mgr.stats());

    let unsynced = world.chunks().filter(|c| !c.is_synced()).count();
    let light_steps: u64 = world.chunks().map(|c| c.light_steps()).sum();
    let uploads: u64 = world.chunks().map(|c| c.uploads()).sum();
    log::info!(
        "done: {} chunks edited, {} still pending, {} uploads, {} without uploaded mesh, {} light steps",
        world.edited_count(),
        world.pending_count(),
        uploads,
        unsynced,
        light_steps
    );
    Ok(())
}
