//! Synthetic Producer -> Consumer Pipeline
//!
//! Runs the hand-off core end to end:
//! - a producer thread submitting randomly generated market events
//! - a consumer thread running the configured wait strategy
//! - Ctrl+C cancels both sides; remaining events are reported as abandoned
//!
//! Prints rejection, drop and latency statistics on exit.

use anyhow::{Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sluice_bins::common::{init_logging, print_stats, setup_performance, CommonArgs};
use sluice_core::core::{fixed_point, EventFields, EventKind, EventRecord, Rejected, Side};
use sluice_core::engine::{CancelToken, CoreObserver, EventCore, IngestionPort};
use sluice_core::perf::ThreadRole;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(author, version, about = "Synthetic market-event hand-off pipeline")]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    /// Number of events to submit (0 = until Ctrl+C)
    #[arg(short = 'n', long, default_value = "1000000")]
    events: u64,

    /// Number of distinct instruments to simulate
    #[arg(long, default_value = "16")]
    instruments: u32,

    /// RNG seed for reproducible runs
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Producer retries rejected submits instead of discarding them
    #[arg(long)]
    retry: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = args.common.load_config()?;
    init_logging(&config)?;

    tracing::info!("=== Sluice: synthetic pipeline ===");
    tracing::info!(
        "Events: {}, instruments: {}, seed: {}",
        args.events,
        args.instruments,
        args.seed
    );

    let core = EventCore::new(&config.core)?;
    let (port, mut consumer, observer) = core.split();

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || {
            tracing::warn!("Received shutdown signal");
            cancel.cancel();
        })
        .context("Failed to set Ctrl-C handler")?;
    }

    // Consumer
    let consumer_cancel = cancel.clone();
    let consumer_core = args.common.consumer_core;
    let realtime = args.common.realtime;
    let consumer_thread = thread::Builder::new()
        .name("sluice-consumer".to_string())
        .spawn(move || -> Result<_> {
            setup_performance(ThreadRole::Consumer, consumer_core, realtime)?;

            let mut notional: i128 = 0;
            let mut handler = |record: &EventRecord| {
                notional += record.price as i128 * record.quantity as i128;
            };
            let report = consumer.run(&mut handler, &consumer_cancel)?;
            tracing::debug!("Consumer notional checksum: {}", notional);
            Ok(report)
        })
        .context("Failed to spawn consumer thread")?;

    // Producer
    let producer_cancel = cancel.clone();
    let producer_core = args.common.producer_core;
    let producer_thread = thread::Builder::new()
        .name("sluice-producer".to_string())
        .spawn(move || -> Result<()> {
            setup_performance(ThreadRole::Producer, producer_core, realtime)?;
            produce(port, &args, &producer_cancel);
            Ok(())
        })
        .context("Failed to spawn producer thread")?;

    producer_thread
        .join()
        .map_err(|_| anyhow::anyhow!("producer thread panicked"))??;

    wait_for_drain(&observer, &cancel);
    cancel.cancel();

    let report = consumer_thread
        .join()
        .map_err(|_| anyhow::anyhow!("consumer thread panicked"))??;

    print_stats(&observer.snapshot(), &report);
    Ok(())
}

/// Submit synthetic events until the budget is spent or cancellation
fn produce(mut port: IngestionPort, args: &Args, cancel: &CancelToken) {
    let mut rng = StdRng::seed_from_u64(args.seed);
    let clock = Instant::now();
    let instruments = args.instruments.max(1);
    let mut mid = vec![100 * fixed_point::SCALE; instruments as usize];

    let mut produced = 0u64;
    while (args.events == 0 || produced < args.events) && !cancel.is_cancelled() {
        let fields = next_event(&mut rng, &mut mid, clock.elapsed().as_nanos() as u64);

        loop {
            match port.submit(&fields) {
                Ok(_) => break,
                Err(Rejected::Halted) => {
                    tracing::error!("Core halted, producer stopping");
                    return;
                }
                Err(_) if args.retry && !cancel.is_cancelled() => std::hint::spin_loop(),
                Err(_) => break,
            }
        }
        produced += 1;
    }

    tracing::info!("Producer finished after {} events", produced);
}

/// Random walk per instrument with a realistic event mix
fn next_event(rng: &mut StdRng, mid: &mut [i64], now_ns: u64) -> EventFields {
    let instrument = rng.gen_range(0..mid.len());
    let tick = fixed_point::SCALE / 100;
    mid[instrument] = (mid[instrument] + rng.gen_range(-2..=2) * tick).max(tick);

    let kind = match rng.gen_range(0..100) {
        0..=39 => EventKind::QuoteUpdate,
        40..=64 => EventKind::NewOrder,
        65..=84 => EventKind::Cancel,
        85..=94 => EventKind::Modify,
        _ => EventKind::Trade,
    };
    let side = if rng.gen_bool(0.5) { Side::Buy } else { Side::Sell };
    let offset = rng.gen_range(0..10) * tick;
    let price = match side {
        Side::Buy => mid[instrument] - offset,
        Side::Sell => mid[instrument] + offset,
    };

    EventFields {
        kind,
        instrument: instrument as u32,
        price,
        quantity: rng.gen_range(1..=1_000),
        side,
        ingest_ts_ns: now_ns,
    }
}

/// Give the consumer a bounded amount of time to catch up
fn wait_for_drain(observer: &CoreObserver, cancel: &CancelToken) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !cancel.is_cancelled() && Instant::now() < deadline {
        let snapshot = observer.snapshot();
        if snapshot.in_flight() == 0 || snapshot.is_halted() {
            return;
        }
        thread::sleep(Duration::from_millis(1));
    }
    if !cancel.is_cancelled() {
        tracing::warn!("Consumer did not drain before shutdown");
    }
}
