//! Soak command - drives a concurrent session workload against the store.
//!
//! Workers resume or create sessions through the manager, read and write
//! attributes, and occasionally destroy sessions while the sweeper runs.
//! At the end the store is checked for consistency.

use std::time::{Duration, Instant};

use anyhow::{Context as _, Result};
use clap::Args;
use console::{Style, style};
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info};

use satchel_session::{Error as SessionError, MemoryStore, SessionManager, StoreStats};

use super::Context;

/// Chance that a worker resumes one of its earlier sessions.
const RESUME_PROBABILITY: f64 = 0.3;

/// Chance that a worker destroys a session when done with it.
const DESTROY_PROBABILITY: f64 = 0.05;

/// Distinct attribute keys per session.
const KEYS_PER_SESSION: usize = 8;

/// Arguments for the soak command.
#[derive(Args, Debug)]
pub struct SoakArgs {
    /// Number of concurrent workers
    #[arg(short, long, default_value_t = 8)]
    pub workers: usize,

    /// Sessions started per worker
    #[arg(short, long, default_value_t = 200)]
    pub sessions: usize,

    /// Attribute operations per session
    #[arg(long, default_value_t = 20)]
    pub ops: usize,

    /// Session lifetime in seconds (overrides [session].ttl_secs)
    #[arg(long)]
    pub ttl_secs: Option<u64>,

    /// Sweep interval in milliseconds (overrides [session].gc_interval_secs)
    #[arg(long)]
    pub gc_interval_ms: Option<u64>,
}

/// Per-worker counters.
#[derive(Debug, Default, Clone, Copy)]
struct WorkerTally {
    started: u64,
    resumed: u64,
    destroyed: u64,
    rejected_writes: u64,
}

impl WorkerTally {
    fn absorb(&mut self, other: WorkerTally) {
        self.started += other.started;
        self.resumed += other.resumed;
        self.destroyed += other.destroyed;
        self.rejected_writes += other.rejected_writes;
    }
}

/// Soak result for JSON output.
#[derive(Debug, Serialize)]
struct SoakReport {
    workers: usize,
    sessions_started: u64,
    sessions_resumed: u64,
    sessions_destroyed: u64,
    writes_after_expiry: u64,
    gc_sweeps: u64,
    gc_reclaimed: u64,
    elapsed_ms: u64,
    consistent: bool,
    store: StoreStats,
}

/// Run the soak command.
pub async fn run(args: SoakArgs, ctx: &Context) -> Result<()> {
    let mut store_config = ctx.config.session_or_default().to_store_config();
    if let Some(ttl) = args.ttl_secs {
        store_config = store_config.with_ttl(Duration::from_secs(ttl));
    }
    if let Some(ms) = args.gc_interval_ms {
        store_config = store_config.with_gc_interval(Duration::from_millis(ms));
    }
    if store_config.enable_gc_task && store_config.effective_gc_interval().is_zero() {
        anyhow::bail!(
            "sweep interval is zero (a zero TTL needs an explicit interval); \
             pass --gc-interval-ms with a positive value"
        );
    }

    let manager = SessionManager::new(MemoryStore::new(), store_config);
    let gc = manager.spawn_gc()?;

    info!(
        workers = args.workers,
        sessions = args.sessions,
        ops = args.ops,
        ttl = ?manager.config().ttl,
        "Starting soak run"
    );

    let started_at = Instant::now();
    let mut handles = Vec::with_capacity(args.workers);
    for worker in 0..args.workers {
        let manager = manager.clone();
        let sessions = args.sessions;
        let ops = args.ops;
        handles.push(tokio::task::spawn_blocking(move || {
            run_worker(worker, &manager, sessions, ops)
        }));
    }

    let mut tally = WorkerTally::default();
    for handle in handles {
        let worker_tally = handle.await.context("soak worker panicked")??;
        tally.absorb(worker_tally);
    }
    let elapsed = started_at.elapsed();

    let (gc_sweeps, gc_reclaimed) = match gc {
        Some(handle) => {
            let counts = (handle.sweeps(), handle.reclaimed());
            handle.stop().await;
            counts
        }
        None => (0, 0),
    };

    let store = manager.provider();
    let consistent = match store.validate() {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(error = %e, "Store failed consistency check");
            false
        }
    };

    let report = SoakReport {
        workers: args.workers,
        sessions_started: tally.started,
        sessions_resumed: tally.resumed,
        sessions_destroyed: tally.destroyed,
        writes_after_expiry: tally.rejected_writes,
        gc_sweeps,
        gc_reclaimed,
        elapsed_ms: elapsed.as_millis() as u64,
        consistent,
        store: store.stats(),
    };

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, ctx.verbose);
    }

    if !consistent {
        anyhow::bail!("session store ended in an inconsistent state");
    }
    Ok(())
}

fn run_worker(
    worker: usize,
    manager: &SessionManager<MemoryStore>,
    sessions: usize,
    ops: usize,
) -> Result<WorkerTally> {
    let mut rng = rand::rng();
    let mut tally = WorkerTally::default();
    let mut known: Vec<String> = Vec::new();

    for _ in 0..sessions {
        let existing = if !known.is_empty() && rng.random_bool(RESUME_PROBABILITY) {
            Some(known[rng.random_range(0..known.len())].clone())
        } else {
            None
        };

        let started = manager.start(existing.as_deref())?;
        let session = started.session;
        if started.created {
            tally.started += 1;
            known.push(session.id().to_string());
        } else {
            tally.resumed += 1;
        }

        for op in 0..ops {
            let key = format!("k{}", op % KEYS_PER_SESSION);
            let outcome = match rng.random_range(0..3) {
                0 => session.set(key, op as u64),
                1 => {
                    session.get(&key);
                    Ok(())
                }
                _ => session.delete(&key),
            };
            match outcome {
                Ok(()) => {}
                // Swept by the GC task between operations
                Err(SessionError::NotFound(_)) => tally.rejected_writes += 1,
                Err(e) => return Err(e.into()),
            }
        }

        if rng.random_bool(DESTROY_PROBABILITY) {
            manager.destroy(session.id())?;
            known.retain(|id| id != session.id());
            tally.destroyed += 1;
        }
    }

    debug!(worker = worker, ?tally, "Soak worker finished");
    Ok(tally)
}

fn print_report(report: &SoakReport, verbose: bool) {
    let dim = Style::new().dim();
    let status = if report.consistent {
        Style::new().green().apply_to("● consistent")
    } else {
        Style::new().red().apply_to("● inconsistent")
    };

    println!();
    println!("{}", style("Satchel Soak Run").bold());
    println!("{}", dim.apply_to("─".repeat(40)));
    println!();
    println!("  {} {}", dim.apply_to("Store:"), status);
    println!("  {} {}", dim.apply_to("Workers:"), report.workers);
    println!("  {} {}", dim.apply_to("Started:"), report.sessions_started);
    println!("  {} {}", dim.apply_to("Resumed:"), report.sessions_resumed);
    println!("  {} {}", dim.apply_to("Destroyed:"), report.sessions_destroyed);
    println!("  {} {}", dim.apply_to("Live:"), report.store.live);
    println!("  {} {} ms", dim.apply_to("Elapsed:"), report.elapsed_ms);

    if verbose {
        println!();
        println!("{}", dim.apply_to("─".repeat(40)));
        println!();
        println!("  {} {}", dim.apply_to("GC sweeps:"), report.gc_sweeps);
        println!("  {} {}", dim.apply_to("GC reclaimed:"), report.gc_reclaimed);
        println!("  {} {}", dim.apply_to("Expired (store):"), report.store.expired);
        println!(
            "  {} {}",
            dim.apply_to("Writes after expiry:"),
            report.writes_after_expiry
        );
    }

    println!();
}
