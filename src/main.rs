//! busarb: weighted round-robin bus arbiter with atomic lock override.
//!
//! Runs a stimulus scenario against the arbitration engine and prints the
//! cycle-by-cycle grant trace. With no arguments a built-in demonstration
//! scenario is used.

use std::env;
use std::path::Path;

use busarb::scenario::Scenario;

fn main() -> anyhow::Result<()> {
    // Initialize logging
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    let no_trace = args.iter().any(|a| a == "--no-trace");
    let path: Option<&str> = args
        .iter()
        .skip(1)
        .find(|a| !a.starts_with('-'))
        .map(|s| s.as_str());

    let scenario = match path {
        Some(p) => {
            println!("Loading: {}", p);
            Scenario::from_path(Path::new(p))?
        }
        None => {
            println!("No scenario given, running the built-in demo");
            Scenario::sample()
        }
    };

    if !scenario.scenario.description.is_empty() {
        println!("{}", scenario.scenario.description);
    }
    println!(
        "{} client(s), weight width {}, weights {:?}",
        scenario.scenario.clients, scenario.scenario.weight_width, scenario.scenario.weights
    );
    println!();

    let result = scenario.run()?;

    if !no_trace {
        result.print_trace();
    }
    result.print_summary();

    if !result.passed {
        anyhow::bail!("scenario '{}' failed", result.name);
    }

    Ok(())
}
