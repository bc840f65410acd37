//! Export one simulated run as JSON for an external renderer
//!
//! Writes the node list, proximity edges, route and outcome of a single run.

use planar_route::config::SimConfig;
use planar_route::logging::{init_logging, LogFormat};
use planar_route::routing::StrategyKind;
use planar_route::session::Snapshot;
use planar_route::topology::Topology;
use planar_route::Session;
use rand::prelude::*;
use serde::Serialize;
use std::fs::File;
use std::io::Write;

#[derive(Serialize)]
struct RunExport {
    canvas: planar_route::config::CanvasBounds,
    seed: u64,
    attempts: usize,
    snapshot: Snapshot,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();
    let mut config = SimConfig::default();
    let mut output = "route.json".to_string();

    let mut i = 1;
    while i < args.len() {
        let value = args.get(i + 1);
        match args[i].as_str() {
            "--config" | "-c" => {
                if let Some(path) = value {
                    config = SimConfig::from_json_file(path)?;
                    i += 1;
                }
            }
            "--strategy" | "-s" => {
                if let Some(v) = value {
                    config.strategy = StrategyKind::from_tag(v);
                    i += 1;
                }
            }
            "--seed" => {
                if let Some(v) = value {
                    config.seed = v.parse()?;
                    i += 1;
                }
            }
            "--output" | "-o" => {
                if let Some(v) = value {
                    output = v.clone();
                    i += 1;
                }
            }
            _ => {}
        }
        i += 1;
    }

    init_logging(LogFormat::Human)?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let topology = Topology::random(
        config.num_nodes,
        &config.canvas,
        config.active_fraction,
        &mut rng,
    );
    let mut session = Session::from_config(&config).with_topology(topology);

    // Retry until a start succeeds; a random source may have no partner
    let mut attempts = 0;
    while attempts < 32 {
        attempts += 1;
        if session.start_simulation().is_ok() {
            session.run_to_completion()?;
            break;
        }
    }

    let snapshot = session.snapshot();
    println!(
        "{} nodes, {} edges, {} hops: {}",
        snapshot.nodes.len(),
        snapshot.edges.len(),
        snapshot.route.len(),
        snapshot.reason.as_deref().unwrap_or("no run started")
    );

    let export = RunExport {
        canvas: config.canvas,
        seed: config.seed,
        attempts,
        snapshot,
    };
    let json = serde_json::to_string_pretty(&export)?;
    let mut file = File::create(&output)?;
    file.write_all(json.as_bytes())?;
    println!("Saved {}", output);

    Ok(())
}
