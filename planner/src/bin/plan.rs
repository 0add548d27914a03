use std::{fs::read_to_string, path::PathBuf};

use anyhow::Context;
use clap::Parser;
use survcov_structs::{
    plan::{PlanStrategy, PlannerConfig},
    scenario::Scenario,
};

/// Plan multi-round drone coverage of a scenario and print the plan as JSON.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Scenario JSON file.
    scenario: PathBuf,

    /// Rounds each drone may fly.
    #[arg(short, long, default_value_t = 1)]
    rounds: u32,

    /// Tour scoring: total or cumulative.
    #[arg(short, long, default_value_t = PlanStrategy::Cumulative)]
    strategy: PlanStrategy,

    #[arg(long)]
    pretty: bool,

    /// Also print a per-round summary of the plan to stderr.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let scenario: Scenario = serde_json::from_str(
        &read_to_string(&args.scenario)
            .with_context(|| format!("reading {}", args.scenario.display()))?,
    )
    .with_context(|| format!("parsing scenario {}", args.scenario.display()))?;

    let config = PlannerConfig {
        max_rounds: args.rounds,
        strategy: args.strategy,
    };
    let plan = survcov_planner::plan_scenario(&scenario, &config)
        .with_context(|| format!("planning {}", args.scenario.display()))?;

    if args.verbose {
        eprintln!("{}: {} targets", args.scenario.display(), scenario.targets.len());
        plan.print().context("writing summary")?;
    }

    let json = if args.pretty {
        serde_json::to_string_pretty(&plan)?
    } else {
        serde_json::to_string(&plan)?
    };
    println!("{}", json);
    Ok(())
}
