use std::{fs::read_dir, path::PathBuf};

#[cfg(not(feature = "prof"))]
pub fn main() {
    println!("benchmarks not supported -- enable 'prof' crate feature")
}

/// Parsed from file names like `grid_d3_2.json`: scenario family, number of
/// drones and instance index.
struct InstanceSpec {
    name: String,
    drones: usize,
    idx: usize,
}

#[derive(Debug)]
struct Result {
    time: f32,
    score: usize,
    rounds: usize,
    length: f64,
}

fn get_instance_files() -> anyhow::Result<Vec<(PathBuf, InstanceSpec)>> {
    let mut filenames = read_dir("bench")?
        .map(|e| e.map(|e| e.path()))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    filenames.retain(|e| e.extension().is_some_and(|x| x == "json"));
    filenames.sort();

    let instance_files = filenames
        .into_iter()
        .map(|filename| {
            let stem = filename.file_stem().unwrap_or_default().to_string_lossy().to_string();
            let mut fields = stem.split('_').collect::<Vec<_>>();
            let idx = fields.pop().and_then(|x| x.parse::<usize>().ok()).unwrap_or(0);
            let drones = fields
                .pop()
                .and_then(|x| x.strip_prefix('d'))
                .and_then(|x| x.parse::<usize>().ok())
                .unwrap_or(0);
            let name = fields.join("_");
            (filename, InstanceSpec { name, drones, idx })
        })
        .collect::<Vec<_>>();
    Ok(instance_files)
}

#[cfg(feature = "prof")]
pub fn main() -> anyhow::Result<()> {
    use std::{fs::read_to_string, io::Write, time::Instant};

    use anyhow::Context;
    use survcov_structs::plan::{PlanStrategy, PlannerConfig};

    env_logger::init();
    const MAX_ROUNDS: u32 = 3;
    let solvers = [("total", PlanStrategy::Total), ("cumulative", PlanStrategy::Cumulative)];

    println!("-----------------------------");
    println!("survcov planner benchmarking");
    println!("-----------------------------");
    println!();
    println!(
        "  strategies: {}",
        solvers
            .iter()
            .map(|(name, _)| *name)
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("  rounds per drone: {}", MAX_ROUNDS);
    println!();

    let instance_files = get_instance_files().context("listing bench/*.json")?;
    let mut results: Vec<Vec<Result>> = Vec::new();

    println!("# RUNNING {} INSTANCES", instance_files.len());
    for (filename, _) in instance_files.iter() {
        let _p = hprof::enter("instance");
        let scenario = {
            let _p = hprof::enter("read");
            let scenario: survcov_structs::scenario::Scenario =
                serde_json::from_str(&read_to_string(filename)?)
                    .with_context(|| format!("parsing {}", filename.display()))?;
            println!(
                " * instance {} with {} drones {} targets",
                filename.display(),
                scenario.drones.len(),
                scenario.targets.len()
            );
            scenario
        };

        let mut instance_results = Vec::new();
        for (solver_name, strategy) in &solvers {
            println!("   - solving with: \"{}\"", solver_name);
            let _p0 = hprof::enter("plan");
            let config = PlannerConfig {
                max_rounds: MAX_ROUNDS,
                strategy: *strategy,
            };
            let t0 = Instant::now();
            let plan = survcov_planner::plan_scenario(&scenario, &config)
                .with_context(|| format!("planning {}", filename.display()))?;
            let time = t0.elapsed().as_secs_f32();
            instance_results.push(Result {
                time,
                score: plan.coverage_score,
                rounds: plan.n_rounds(),
                length: plan.drones.iter().flat_map(|d| d.rounds.iter()).map(|r| r.length).sum(),
            });
        }
        results.push(instance_results);
    }
    println!();
    println!("# PROFILER");
    hprof::profiler().print_timing();
    println!();

    println!("# RESULTS");

    let mut tablewriter = tabwriter::TabWriter::new(Vec::new());
    write!(&mut tablewriter, "name\tdrones\tidx")?;
    for (solver_name, _) in &solvers {
        write!(&mut tablewriter, "\t|\t{}\t\t\t", solver_name)?;
    }
    writeln!(&mut tablewriter)?;

    write!(&mut tablewriter, "\t\t")?;
    for _ in &solvers {
        write!(&mut tablewriter, "\t|\ttime\tscore\trounds\tlength")?;
    }
    writeln!(&mut tablewriter)?;

    write!(&mut tablewriter, "---\t---\t---")?;
    for _ in &solvers {
        write!(&mut tablewriter, "\t\t---\t---\t---\t---")?;
    }
    writeln!(&mut tablewriter)?;

    for ((_filename, instance), solver_results) in instance_files.iter().zip(results.iter()) {
        write!(
            &mut tablewriter,
            "{}\t{}\t{}",
            instance.name, instance.drones, instance.idx
        )?;
        for result in solver_results.iter() {
            write!(
                &mut tablewriter,
                "\t|\t{:.3}\t{}\t{}\t{:.0}",
                result.time, result.score, result.rounds, result.length
            )?;
        }
        writeln!(&mut tablewriter)?;
    }

    let table = tablewriter
        .into_inner()
        .map_err(|e| anyhow::anyhow!("writing table: {}", e.error()))?;
    let written = String::from_utf8(table)?;
    println!("{}", written);
    Ok(())
}
