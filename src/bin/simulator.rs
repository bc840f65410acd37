//! planar_route batch simulator
//!
//! Scatters nodes over a canvas, then runs many packets per strategy and
//! reports delivery rate, hop counts and stretch.

use planar_route::config::SimConfig;
use planar_route::logging::{init_logging, LogFormat};
use planar_route::routing::StrategyKind;
use planar_route::simulation::{LossReason, RunOutcome, Simulator};
use planar_route::stats::BatchStats;
use planar_route::topology::Topology;
use rand::prelude::*;
use std::time::Instant;

/// Run `config.num_runs` packets with one strategy over a fixed topology
fn run_batch(topology: &Topology, strategy: StrategyKind, config: &SimConfig) -> BatchStats {
    let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(1));
    let mut sim = Simulator::with_strategy(strategy).with_max_hops(config.max_hops);
    let mut batch = BatchStats::new(strategy.tag());

    for _ in 0..config.num_runs {
        if sim.start(topology, &mut rng).is_err() {
            batch.record_rejection();
            continue;
        }
        match sim.run_to_completion(topology, &mut rng) {
            Ok(RunOutcome::Arrived(stats)) => batch.record_arrival(&stats),
            Ok(RunOutcome::Lost(reason)) => {
                batch.record_loss(matches!(reason, LossReason::HopLimit { .. }))
            }
            Ok(RunOutcome::Cancelled { .. }) | Err(_) => batch.record_loss(false),
        }
    }

    batch
}

fn print_usage() {
    println!("Usage: simulator [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -c, --config FILE     Load settings from a JSON file");
    println!("  -n, --nodes NUM       Number of nodes (default: 50)");
    println!("  -r, --runs NUM        Runs per strategy (default: 200)");
    println!("  -s, --strategy NAME   Only run one strategy (default: all)");
    println!("      --active FRAC     Fraction of nodes with an active address (default: 0.4)");
    println!("      --max-hops NUM    Hop limit per run, 0 for the default (default: 512)");
    println!("      --seed NUM        Random seed (default: 42)");
    println!("      --log-format FMT  human or json (default: human)");
    println!("  -h, --help            Show this help");
}

fn main() {
    let args: Vec<String> = std::env::args().collect();

    let mut config = SimConfig::default();
    let mut only: Option<StrategyKind> = None;
    let mut log_format = LogFormat::Human;

    // Config file first so flags can override it
    if let Some(pos) = args.iter().position(|a| a == "--config" || a == "-c") {
        if let Some(path) = args.get(pos + 1) {
            match SimConfig::from_json_file(path) {
                Ok(loaded) => config = loaded,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }

    let mut i = 1;
    while i < args.len() {
        let value = args.get(i + 1);
        match args[i].as_str() {
            "--config" | "-c" => i += 1,
            "--nodes" | "-n" => {
                if let Some(v) = value {
                    config.num_nodes = v.parse().unwrap_or(config.num_nodes);
                    i += 1;
                }
            }
            "--runs" | "-r" => {
                if let Some(v) = value {
                    config.num_runs = v.parse().unwrap_or(config.num_runs);
                    i += 1;
                }
            }
            "--strategy" | "-s" => {
                if let Some(v) = value {
                    only = Some(StrategyKind::from_tag(v));
                    i += 1;
                }
            }
            "--active" => {
                if let Some(v) = value {
                    config.active_fraction = v.parse().unwrap_or(config.active_fraction);
                    i += 1;
                }
            }
            "--max-hops" => {
                if let Some(v) = value {
                    config.max_hops = match v.parse::<u32>() {
                        Ok(0) | Err(_) => None,
                        Ok(n) => Some(n),
                    };
                    i += 1;
                }
            }
            "--seed" => {
                if let Some(v) = value {
                    config.seed = v.parse().unwrap_or(config.seed);
                    i += 1;
                }
            }
            "--log-format" => {
                if let Some(v) = value {
                    log_format = v.parse().unwrap_or_default();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                print_usage();
                return;
            }
            _ => {}
        }
        i += 1;
    }

    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    if let Err(e) = init_logging(log_format) {
        eprintln!("Warning: {}", e);
    }

    println!("Configuration:");
    println!("  Nodes:     {}", config.num_nodes);
    println!("  Canvas:    {}x{}", config.canvas.width, config.canvas.height);
    println!("  Active:    {:.0}%", config.active_fraction * 100.0);
    println!("  Runs:      {}", config.num_runs);
    println!("  Max hops:  {}", config.max_hops.map_or("default".to_string(), |h| h.to_string()));
    println!("  Seed:      {}", config.seed);
    println!();

    let mut rng = StdRng::seed_from_u64(config.seed);
    let topology = Topology::random(
        config.num_nodes,
        &config.canvas,
        config.active_fraction,
        &mut rng,
    );
    println!("  Active nodes: {}", topology.active_nodes().len());
    println!();

    let strategies: Vec<StrategyKind> = match only {
        Some(kind) => vec![kind],
        None => StrategyKind::ALL.to_vec(),
    };

    for strategy in strategies {
        let start = Instant::now();
        let batch = run_batch(&topology, strategy, &config);
        println!("{}", batch);
        println!("Elapsed time:         {} ms", start.elapsed().as_millis());
        println!();
    }
}
