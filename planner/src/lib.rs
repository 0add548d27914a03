use log::{info, warn};
use survcov_structs::{
    plan::{Plan, PlannerConfig},
    scenario::Scenario,
};

use crate::{
    aoi::Aoi,
    drone::{Drone, DroneIdGen},
    error::PlanError,
    greedy::{strategy_for, GreedyPlanner},
    trajectories::TrajectoryGenerator,
};

pub mod aoi;
pub mod christofides;
pub mod drone;
pub mod error;
pub mod greedy;
pub mod matching;
pub mod solution;
pub mod tour;
pub mod trajectories;

/// Drones of the scenario, with ids matching their position in
/// `scenario.drones`.
pub fn scenario_drones(scenario: &Scenario) -> Result<Vec<(Drone, survcov_structs::Point)>, PlanError> {
    let mut ids = DroneIdGen::new();
    scenario
        .drones
        .iter()
        .enumerate()
        .map(|(index, spec)| {
            let bad = |reason: &str| PlanError::BadDrone {
                index,
                reason: reason.to_string(),
            };
            if !(spec.speed.is_finite() && spec.speed > 0.0) {
                return Err(bad("speed must be positive"));
            }
            if !(spec.autonomy.is_finite() && spec.autonomy > 0.0) {
                return Err(bad("autonomy must be positive"));
            }
            let depot = *scenario
                .depots
                .get(spec.depot)
                .ok_or_else(|| bad(&format!("no depot with index {}", spec.depot)))?;
            Ok((ids.drone(spec.autonomy, spec.speed), depot))
        })
        .collect()
}

/// Plans a scenario end to end: candidate tours per drone, greedy selection
/// and pruning. Drones that cannot reach any target are listed in
/// `Plan::infeasible_drones` instead of failing the whole plan.
pub fn plan_scenario(scenario: &Scenario, config: &PlannerConfig) -> Result<Plan, PlanError> {
    #[cfg(feature = "prof")]
    let _p = hprof::enter("plan_scenario");

    let aoi = Aoi::from_scenario(scenario)?;
    let drones = scenario_drones(scenario)?;
    info!(
        "Planning {} for {} drones, {} rounds, {} strategy",
        aoi,
        drones.len(),
        config.max_rounds,
        config.strategy
    );

    let (catalog, infeasible) = TrajectoryGenerator::new(&aoi).candidate_catalog(&drones);
    let mut infeasible_drones = Vec::new();
    for (drone, err) in infeasible {
        match err {
            PlanError::InsufficientEnergy { .. } => {
                warn!("{} is left out: {}", drone, err);
                infeasible_drones.push(drone.id().0 as usize);
            }
            err => return Err(err),
        }
    }

    let planner = GreedyPlanner::new(&aoi, catalog, config.max_rounds, strategy_for(config.strategy))?;
    let solution = planner.solve()?;

    let mut plan = solution.to_plan(&aoi);
    plan.infeasible_drones = infeasible_drones;
    info!(
        "Plan covers {} of {} targets in {} rounds ({} tours, {:.1} m)",
        plan.coverage_score,
        aoi.n_targets(),
        plan.n_rounds(),
        solution.n_tours(),
        solution.total_length()
    );
    Ok(plan)
}
