//! CLI entry point (spec §6 CLI surface, component J): a single positional
//! scenario path, an optional output directory, and an optional text log.

use std::path::PathBuf;
use std::process::ExitCode;
use trafficsim::error::SimError;
use trafficsim::output;
use trafficsim::scenario;
use trafficsim::simulator;

struct Args {
    scenario_path: PathBuf,
    output_dir: PathBuf,
    log: bool,
}

fn parse_args() -> Result<Args, String> {
    let mut positional = None;
    let mut output_dir = PathBuf::from("../output");
    let mut log = false;

    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--output-dir" => {
                let value = it.next().ok_or("--output-dir requires a value")?;
                output_dir = PathBuf::from(value);
            }
            "--log" => log = true,
            other if positional.is_none() => positional = Some(PathBuf::from(other)),
            other => return Err(format!("unexpected argument: {other}")),
        }
    }

    let scenario_path = positional.ok_or("usage: trafficsim <scenario.json> [--output-dir DIR] [--log]")?;
    Ok(Args { scenario_path, output_dir, log })
}

fn main() -> ExitCode {
    env_logger::init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::from(1);
        }
    };

    match run(&args) {
        Ok(()) => ExitCode::from(0),
        Err(SimError::Config(msg)) => {
            log::error!("config error: {msg}");
            ExitCode::from(2)
        }
        Err(SimError::Topology(msg)) => {
            log::error!("topology error: {msg}");
            ExitCode::from(3)
        }
        Err(SimError::State(msg)) => {
            log::error!("state error: {msg}");
            ExitCode::from(1)
        }
    }
}

fn run(args: &Args) -> Result<(), SimError> {
    let mut loaded = scenario::load(&args.scenario_path, 0)?;
    log::info!("loaded scenario '{}': {} roads, {} cycles", loaded.name, loaded.world.roads.len(), loaded.cycles);

    let stats = simulator::run(&mut loaded);
    log::info!("run complete: {} injected, {} rejected at entry", stats.total_injected, stats.total_rejected);

    std::fs::create_dir_all(&args.output_dir)?;
    let (map_history, road_metrics, vehicles_metrics, text_log) = output::output_paths(&args.output_dir, &loaded.name, loaded.cycles);
    output::write_map_history(&map_history, &loaded)?;
    output::write_road_metrics(&road_metrics, &loaded)?;
    output::write_vehicles_metrics(&vehicles_metrics, &loaded)?;
    if args.log {
        output::write_text_log(&text_log, &loaded)?;
    }

    Ok(())
}
