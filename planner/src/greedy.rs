use std::collections::HashSet;

use log::{debug, trace};
use survcov_structs::plan::PlanStrategy;

use crate::{
    aoi::Aoi,
    drone::Drone,
    error::PlanError,
    solution::{prune, MultiRoundSolution, MultiRoundSolutionBuilder},
    tour::Tour,
};

/// Candidate tours per drone. The order of drones, and of tours within each
/// drone, decides between equally scored candidates.
pub type Catalog = Vec<(Drone, Vec<Tour>)>;

pub trait CoverageStrategy {
    /// Score of flying `tour` next, given the targets visited so far and the
    /// rounds the drone has left including this one.
    fn evaluate(&self, tour: &Tour, residual_rounds: u32, visited: &HashSet<usize>) -> usize;
}

fn new_targets(tour: &Tour, visited: &HashSet<usize>) -> usize {
    tour.targets().iter().filter(|t| !visited.contains(*t)).count()
}

/// Number of targets the tour adds to the visited set.
pub struct TotalCoverage;

impl CoverageStrategy for TotalCoverage {
    fn evaluate(&self, tour: &Tour, _residual_rounds: u32, visited: &HashSet<usize>) -> usize {
        new_targets(tour, visited)
    }
}

/// New targets weighted by the remaining rounds, so early coverage counts
/// toward more rounds of cumulative coverage.
pub struct CumulativeCoverage;

impl CoverageStrategy for CumulativeCoverage {
    fn evaluate(&self, tour: &Tour, residual_rounds: u32, visited: &HashSet<usize>) -> usize {
        residual_rounds as usize * new_targets(tour, visited)
    }
}

pub fn strategy_for(strategy: PlanStrategy) -> Box<dyn CoverageStrategy> {
    match strategy {
        PlanStrategy::Total => Box::new(TotalCoverage),
        PlanStrategy::Cumulative => Box::new(CumulativeCoverage),
    }
}

pub struct GreedyPlanner<'a> {
    aoi: &'a Aoi,
    catalog: Vec<(Drone, usize, Vec<Tour>)>,
    max_rounds: u32,
    strategy: Box<dyn CoverageStrategy>,
}

impl<'a> GreedyPlanner<'a> {
    /// Checks that every drone appears once and that all of its tours start
    /// from the same depot. Drones without candidate tours can never fly and
    /// are left out.
    pub fn new(
        aoi: &'a Aoi,
        catalog: Catalog,
        max_rounds: u32,
        strategy: Box<dyn CoverageStrategy>,
    ) -> Result<Self, PlanError> {
        let mut seen = HashSet::new();
        let mut with_depots = Vec::with_capacity(catalog.len());
        for (drone, tours) in catalog {
            if !seen.insert(drone.id()) {
                return Err(PlanError::DuplicateDrone(drone.id()));
            }
            let Some(first) = tours.first() else {
                debug!("{} has no candidate tours", drone);
                continue;
            };
            let depot = first.depot();
            if tours.iter().any(|t| t.depot() != depot) {
                return Err(PlanError::MixedDepots(drone.id()));
            }
            with_depots.push((drone, depot, tours));
        }

        Ok(GreedyPlanner {
            aoi,
            catalog: with_depots,
            max_rounds,
            strategy,
        })
    }

    /// Targets covered by at least one candidate tour.
    pub fn reachable_targets(&self) -> HashSet<usize> {
        self.catalog
            .iter()
            .flat_map(|(_, _, tours)| tours.iter())
            .flat_map(|t| t.targets().iter().copied())
            .collect()
    }

    /// Greedy choice of one tour per step, without removing repeated visits.
    pub fn solve_unpruned(&self) -> Result<MultiRoundSolution, PlanError> {
        #[cfg(feature = "prof")]
        let _p = hprof::enter("greedy");

        let reachable = self.reachable_targets();
        let mut visited = HashSet::new();
        let mut residual_rounds = vec![self.max_rounds; self.catalog.len()];
        let mut rounds_left = self.max_rounds as usize * self.catalog.len();
        let mut chosen: Vec<Vec<Tour>> = vec![Vec::new(); self.catalog.len()];

        while rounds_left > 0 && !reachable.is_subset(&visited) {
            let mut best: Option<(usize, usize, usize)> = None;
            for (d_idx, (_, _, tours)) in self.catalog.iter().enumerate() {
                if residual_rounds[d_idx] == 0 {
                    continue;
                }
                for (t_idx, tour) in tours.iter().enumerate() {
                    let score = self.strategy.evaluate(tour, residual_rounds[d_idx], &visited);
                    if best.map_or(true, |(s, _, _)| score > s) {
                        best = Some((score, d_idx, t_idx));
                    }
                }
            }

            let Some((score, d_idx, t_idx)) = best else {
                break;
            };
            let tour = &self.catalog[d_idx].2[t_idx];
            trace!(
                "{} round {} takes {} (score {})",
                self.catalog[d_idx].0,
                chosen[d_idx].len(),
                tour,
                score
            );
            residual_rounds[d_idx] -= 1;
            rounds_left -= 1;
            visited.extend(tour.targets().iter().copied());
            chosen[d_idx].push(tour.clone());
        }

        debug!(
            "greedy covered {} of {} reachable targets ({} in the area)",
            visited.len(),
            reachable.len(),
            self.aoi.n_targets()
        );

        let mut builder = MultiRoundSolutionBuilder::new();
        for ((drone, depot, _), tours) in self.catalog.iter().zip(chosen) {
            builder.add_drone_with_tours(*drone, *depot, tours);
        }
        builder.build()
    }

    /// Greedy solution with repeated visits pruned away.
    pub fn solve(&self) -> Result<MultiRoundSolution, PlanError> {
        prune(self.aoi, &self.solve_unpruned()?)
    }
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    use survcov_structs::Point;

    use super::*;
    use crate::{drone::DroneIdGen, trajectories::TrajectoryGenerator};

    fn p(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    /// Depot at the origin (node 8) and eight targets on a line.
    fn line() -> Aoi {
        let targets = (1..=8).map(|i| p(i as f64, 0.0)).collect();
        Aoi::new(vec![p(0.0, 0.0)], targets, 8.0, 1.0, 0.0, None).unwrap()
    }

    fn tour(aoi: &Aoi, targets: &[usize]) -> Tour {
        let nodes = std::iter::once(8).chain(targets.iter().copied()).collect::<Vec<_>>();
        Tour::from_nodes(aoi, &nodes).unwrap()
    }

    fn targets_of(sol: &MultiRoundSolution, drone: &Drone) -> Vec<Vec<usize>> {
        sol.tours(drone)
            .unwrap()
            .iter()
            .map(|t| t.targets().to_vec())
            .collect()
    }

    #[test]
    fn larger_tour_first() {
        let _ = env_logger::try_init();
        let aoi = line();
        let mut ids = DroneIdGen::new();
        let (a, b) = (ids.drone(100.0, 1.0), ids.drone(100.0, 1.0));
        let catalog = vec![
            (a, vec![tour(&aoi, &[0, 1, 2])]),
            (b, vec![tour(&aoi, &[3, 4, 5, 6, 7])]),
        ];
        let planner = GreedyPlanner::new(&aoi, catalog, 2, Box::new(TotalCoverage)).unwrap();
        let sol = planner.solve_unpruned().unwrap();
        assert_eq!(targets_of(&sol, &a), vec![vec![0, 1, 2]]);
        assert_eq!(targets_of(&sol, &b), vec![vec![3, 4, 5, 6, 7]]);
        assert_eq!(sol.coverage_score(), 8);
        assert_eq!(sol.n_rounds(), 1);

        // A single round goes to the five target tour.
        let catalog = vec![(a, vec![tour(&aoi, &[0, 1, 2]), tour(&aoi, &[3, 4, 5, 6, 7])])];
        let planner = GreedyPlanner::new(&aoi, catalog, 1, Box::new(TotalCoverage)).unwrap();
        let sol = planner.solve().unwrap();
        assert_eq!(targets_of(&sol, &a), vec![vec![3, 4, 5, 6, 7]]);
    }

    #[test]
    fn ties_go_to_first_drone_and_tour() {
        let aoi = line();
        let mut ids = DroneIdGen::new();
        let (a, b) = (ids.drone(100.0, 1.0), ids.drone(100.0, 1.0));
        let catalog = || {
            vec![
                (a, vec![tour(&aoi, &[0, 1]), tour(&aoi, &[1, 0])]),
                (b, vec![tour(&aoi, &[1, 0])]),
            ]
        };
        for strategy in [PlanStrategy::Total, PlanStrategy::Cumulative] {
            let planner = GreedyPlanner::new(&aoi, catalog(), 3, strategy_for(strategy)).unwrap();
            let sol = planner.solve_unpruned().unwrap();
            assert_eq!(targets_of(&sol, &a), vec![vec![0, 1]]);
            assert!(targets_of(&sol, &b).is_empty());
        }
    }

    #[test]
    fn cumulative_prefers_fresh_drones() {
        let aoi = line();
        let mut ids = DroneIdGen::new();
        let (a, b) = (ids.drone(100.0, 1.0), ids.drone(100.0, 1.0));
        let catalog = || {
            vec![
                (a, vec![tour(&aoi, &[0, 1, 2, 3]), tour(&aoi, &[4, 5, 6])]),
                (b, vec![tour(&aoi, &[4, 5])]),
            ]
        };

        // Total: a takes both of its tours and b is never needed.
        let planner = GreedyPlanner::new(&aoi, catalog(), 2, Box::new(TotalCoverage)).unwrap();
        let sol = planner.solve_unpruned().unwrap();
        assert_eq!(targets_of(&sol, &a), vec![vec![0, 1, 2, 3], vec![4, 5, 6]]);
        assert!(targets_of(&sol, &b).is_empty());

        // Cumulative: in the second step b scores 2 * 2 against 1 * 3 for a.
        let planner = GreedyPlanner::new(&aoi, catalog(), 2, Box::new(CumulativeCoverage)).unwrap();
        let sol = planner.solve_unpruned().unwrap();
        assert_eq!(targets_of(&sol, &a), vec![vec![0, 1, 2, 3], vec![4, 5, 6]]);
        assert_eq!(targets_of(&sol, &b), vec![vec![4, 5]]);
        assert_eq!(sol.newly_covered_count_per_round(), vec![6, 1]);

        let pruned = planner.solve().unwrap();
        assert_eq!(targets_of(&pruned, &a), vec![vec![0, 1, 2, 3], vec![6]]);
        assert_eq!(targets_of(&pruned, &b), vec![vec![4, 5]]);
    }

    #[test]
    fn scores() {
        let aoi = line();
        let t = tour(&aoi, &[0, 1, 2]);
        let visited = [1].into_iter().collect::<HashSet<_>>();
        assert_eq!(TotalCoverage.evaluate(&t, 4, &visited), 2);
        assert_eq!(CumulativeCoverage.evaluate(&t, 4, &visited), 8);
        assert_eq!(strategy_for(PlanStrategy::Cumulative).evaluate(&t, 0, &visited), 0);
    }

    #[test]
    fn zero_rounds_is_empty() {
        let aoi = line();
        let a = DroneIdGen::new().drone(100.0, 1.0);
        let catalog = vec![(a, vec![tour(&aoi, &[0])])];
        let planner = GreedyPlanner::new(&aoi, catalog, 0, Box::new(TotalCoverage)).unwrap();
        let sol = planner.solve().unwrap();
        assert_eq!(sol.n_drones(), 1);
        assert_eq!(sol.n_rounds(), 0);
        assert_eq!(sol.coverage_score(), 0);
    }

    #[test]
    fn zero_score_rounds_are_pruned() {
        // Once a has spent its round, target 1 is still uncovered and b can
        // only revisit target 0.
        let aoi = line();
        let mut ids = DroneIdGen::new();
        let (a, b) = (ids.drone(100.0, 1.0), ids.drone(100.0, 1.0));
        let catalog = vec![
            (a, vec![tour(&aoi, &[0]), tour(&aoi, &[1])]),
            (b, vec![tour(&aoi, &[0])]),
        ];
        let planner = GreedyPlanner::new(&aoi, catalog, 1, Box::new(TotalCoverage)).unwrap();
        let sol = planner.solve_unpruned().unwrap();
        assert_eq!(targets_of(&sol, &a), vec![vec![0]]);
        assert_eq!(targets_of(&sol, &b), vec![vec![0]]);

        let pruned = planner.solve().unwrap();
        assert_eq!(pruned.coverage_score(), 1);
        assert_eq!(pruned.n_tours(), 1);
        assert!(targets_of(&pruned, &b).is_empty());
    }

    #[test]
    fn solves_viable_path_graphs_without_shortcuts() {
        // A-C has no edge, so the later tour over A, B, C keeps B in between.
        let (d, ta, tb, tc, te) = (p(0.0, 0.0), p(0.0, 10.0), p(10.0, 10.0), p(10.0, 0.0), p(10.0, 20.0));
        let paths = vec![(d, ta), (ta, tb), (tb, tc), (tc, d), (d, tb), (tb, te), (te, d)];
        let aoi = Aoi::new(vec![d], vec![ta, tb, tc, te], 20.0, 20.0, 0.0, Some(&paths)).unwrap();
        let mut ids = DroneIdGen::new();
        let (a, b) = (ids.drone(100.0, 1.0), ids.drone(100.0, 1.0));
        let catalog = vec![
            (a, vec![Tour::from_nodes(&aoi, &[4, 1, 3]).unwrap()]),
            (b, vec![Tour::from_nodes(&aoi, &[4, 0, 1, 2]).unwrap()]),
        ];
        let planner = GreedyPlanner::new(&aoi, catalog, 1, Box::new(TotalCoverage)).unwrap();
        assert_eq!(planner.solve_unpruned().unwrap().coverage_score(), 4);

        let sol = planner.solve().unwrap();
        assert_eq!(sol.coverage_score(), 4);
        assert_eq!(targets_of(&sol, &a), vec![vec![1, 3]]);
        assert_eq!(targets_of(&sol, &b), vec![vec![0, 1, 2]]);
    }

    #[test]
    fn catalog_errors() {
        let aoi = Aoi::new(vec![p(0.0, 0.0), p(0.0, 5.0)], vec![p(1.0, 0.0)], 5.0, 5.0, 0.0, None).unwrap();
        let mut ids = DroneIdGen::new();
        let a = ids.drone(100.0, 1.0);
        let from = |depot: usize| Tour::from_nodes(&aoi, &[depot, 0]).unwrap();

        let mixed = vec![(a, vec![from(1), from(2)])];
        assert_eq!(
            GreedyPlanner::new(&aoi, mixed, 1, Box::new(TotalCoverage)).err(),
            Some(PlanError::MixedDepots(a.id()))
        );

        let duplicated = vec![(a, vec![from(1)]), (a, vec![from(2)])];
        assert_eq!(
            GreedyPlanner::new(&aoi, duplicated, 1, Box::new(TotalCoverage)).err(),
            Some(PlanError::DuplicateDrone(a.id()))
        );

        let b = ids.drone(1.0, 1.0);
        let planner = GreedyPlanner::new(&aoi, vec![(a, vec![from(1)]), (b, vec![])], 1, Box::new(TotalCoverage))
            .unwrap();
        assert_eq!(planner.solve().unwrap().n_drones(), 1);
    }

    #[test]
    fn terminates_within_round_budget() {
        let mut rng = ChaCha8Rng::seed_from_u64(31);
        for _ in 0..10 {
            let targets = (0..25)
                .map(|_| p(rng.gen_range(0.0..200.0), rng.gen_range(0.0..200.0)))
                .collect::<Vec<_>>();
            let depots = vec![p(-1.0, -1.0), p(201.0, 201.0)];
            let aoi = Aoi::new(depots.clone(), targets, 200.0, 200.0, 2.0, None).unwrap();
            let mut ids = DroneIdGen::new();
            let drones = (0..3)
                .map(|i| (ids.drone(rng.gen_range(150.0..400.0), 3.0), depots[i % 2]))
                .collect::<Vec<_>>();
            let (catalog, infeasible) = TrajectoryGenerator::new(&aoi).candidate_catalog(&drones);
            assert!(infeasible.is_empty());

            let max_rounds = rng.gen_range(0..4);
            for strategy in [PlanStrategy::Total, PlanStrategy::Cumulative] {
                let planner = GreedyPlanner::new(&aoi, catalog.clone(), max_rounds, strategy_for(strategy)).unwrap();
                let sol = planner.solve_unpruned().unwrap();
                assert!(sol.n_tours() <= max_rounds as usize * drones.len());
                for d in sol.drones() {
                    assert!(sol.tours(d).unwrap().len() <= max_rounds as usize);
                }

                let pruned = planner.solve().unwrap();
                assert_eq!(pruned.covered_targets(), sol.covered_targets());
                assert!(pruned.n_tours() <= sol.n_tours());
                assert_eq!(pruned.coverage_score(), pruned.newly_covered_count_per_round().iter().sum::<usize>());
            }
        }
    }
}
