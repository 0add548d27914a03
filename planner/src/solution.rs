use std::collections::{BTreeSet, HashSet};

use log::{debug, trace};
use ordered_float::OrderedFloat;
use survcov_structs::plan::{DronePlan, Plan, PlannedRound};

use crate::{aoi::Aoi, drone::Drone, error::PlanError, tour::Tour};

#[derive(Debug, Clone)]
struct DroneRounds {
    drone: Drone,
    depot: usize,
    tours: Vec<Tour>,
}

/// Accumulates per-round tours for each drone before freezing them into a
/// [`MultiRoundSolution`].
#[derive(Debug, Default)]
pub struct MultiRoundSolutionBuilder {
    drones: Vec<DroneRounds>,
    error: Option<PlanError>,
}

impl MultiRoundSolutionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a drone flying from the `depot` node. Drones keep the order
    /// in which they were added.
    pub fn add_drone(&mut self, drone: Drone, depot: usize) -> &mut Self {
        if self.error.is_none() && self.find(&drone).is_some() {
            self.error = Some(PlanError::DuplicateDrone(drone.id()));
        }
        self.drones.push(DroneRounds {
            drone,
            depot,
            tours: Vec::new(),
        });
        self
    }

    /// Adds `tour` as the drone's next round.
    pub fn append_tour(&mut self, drone: &Drone, tour: Tour) -> &mut Self {
        match self.find(drone) {
            Some(i) if self.drones[i].depot != tour.depot() => {
                self.error.get_or_insert(PlanError::MixedDepots(drone.id()));
            }
            Some(i) => self.drones[i].tours.push(tour),
            None => {
                self.error.get_or_insert(PlanError::UnknownDrone(drone.id()));
            }
        }
        self
    }

    pub fn add_drone_with_tours(&mut self, drone: Drone, depot: usize, tours: Vec<Tour>) -> &mut Self {
        self.add_drone(drone, depot);
        for tour in tours {
            self.append_tour(&drone, tour);
        }
        self
    }

    /// Freezes the solution, reporting the first error seen while building.
    pub fn build(self) -> Result<MultiRoundSolution, PlanError> {
        if let Some(e) = self.error {
            return Err(e);
        }
        Ok(MultiRoundSolution { drones: self.drones })
    }

    fn find(&self, drone: &Drone) -> Option<usize> {
        self.drones.iter().position(|d| d.drone == *drone)
    }
}

/// Tours flown by each drone, one per round. Round `r` of the plan is the
/// `r`-th tour of every drone that has one.
#[derive(Debug, Clone)]
pub struct MultiRoundSolution {
    drones: Vec<DroneRounds>,
}

impl MultiRoundSolution {
    pub fn drones(&self) -> impl Iterator<Item = &Drone> {
        self.drones.iter().map(|d| &d.drone)
    }

    pub fn n_drones(&self) -> usize {
        self.drones.len()
    }

    pub fn tours(&self, drone: &Drone) -> Result<&[Tour], PlanError> {
        self.drones
            .iter()
            .find(|d| d.drone == *drone)
            .map(|d| d.tours.as_slice())
            .ok_or(PlanError::UnknownDrone(drone.id()))
    }

    pub fn depot(&self, drone: &Drone) -> Result<usize, PlanError> {
        self.drones
            .iter()
            .find(|d| d.drone == *drone)
            .map(|d| d.depot)
            .ok_or(PlanError::UnknownDrone(drone.id()))
    }

    pub fn n_rounds(&self) -> usize {
        self.drones.iter().map(|d| d.tours.len()).max().unwrap_or(0)
    }

    pub fn n_tours(&self) -> usize {
        self.drones.iter().map(|d| d.tours.len()).sum()
    }

    pub fn total_length(&self) -> f64 {
        self.drones
            .iter()
            .flat_map(|d| d.tours.iter())
            .map(|t| t.length())
            .sum()
    }

    /// Tours of round `r`, in drone order.
    fn round(&self, r: usize) -> impl Iterator<Item = (&Drone, &Tour)> {
        self.drones
            .iter()
            .filter_map(move |d| d.tours.get(r).map(|t| (&d.drone, t)))
    }

    pub fn covered_targets(&self) -> BTreeSet<usize> {
        self.drones
            .iter()
            .flat_map(|d| d.tours.iter())
            .flat_map(|t| t.targets().iter().copied())
            .collect()
    }

    /// Number of distinct targets visited by any drone in any round.
    pub fn coverage_score(&self) -> usize {
        self.covered_targets().len()
    }

    /// Targets visited in each round, by any drone.
    pub fn covered_per_round(&self) -> Vec<BTreeSet<usize>> {
        (0..self.n_rounds())
            .map(|r| {
                self.round(r)
                    .flat_map(|(_, t)| t.targets().iter().copied())
                    .collect()
            })
            .collect()
    }

    /// Targets first visited in each round.
    pub fn newly_covered_count_per_round(&self) -> Vec<usize> {
        let mut seen = HashSet::new();
        self.covered_per_round()
            .into_iter()
            .map(|round| round.into_iter().filter(|t| seen.insert(*t)).count())
            .collect()
    }

    /// Distinct targets visited up to and including each round.
    pub fn cumulative_coverage(&self) -> Vec<usize> {
        self.newly_covered_count_per_round()
            .into_iter()
            .scan(0, |total, n| {
                *total += n;
                Some(*total)
            })
            .collect()
    }

    pub fn to_plan(&self, aoi: &Aoi) -> Plan {
        let drones = self
            .drones
            .iter()
            .map(|d| DronePlan {
                drone: d.drone.id().0 as usize,
                depot: aoi.pos(d.depot),
                rounds: d
                    .tours
                    .iter()
                    .map(|t| PlannedRound {
                        targets: t.targets().to_vec(),
                        nodes: t
                            .nodes()
                            .into_iter()
                            .chain(std::iter::once(t.depot()))
                            .map(|n| aoi.pos(n))
                            .collect(),
                        length: t.length(),
                        time: t.time(d.drone.speed),
                    })
                    .collect(),
            })
            .collect();

        Plan {
            coverage_score: self.coverage_score(),
            newly_covered_per_round: self.newly_covered_count_per_round(),
            drones,
            infeasible_drones: Vec::new(),
        }
    }
}

/// Removes repeated visits from a solution.
///
/// Rounds are walked in order and, within a round, drones in order. Each tour
/// keeps only the targets no earlier tour has visited and is rebuilt through
/// the remaining targets in their original order. Where the graph has no
/// direct edge between two remaining nodes, already visited targets of the
/// tour are kept as pass-through points. Tours left without new targets are
/// dropped, so later rounds of that drone move up and the per-round counts of
/// the result may differ from those of the input.
pub fn prune(aoi: &Aoi, solution: &MultiRoundSolution) -> Result<MultiRoundSolution, PlanError> {
    #[cfg(feature = "prof")]
    let _p = hprof::enter("prune");

    let mut covered = HashSet::new();
    let mut tours: Vec<Vec<Tour>> = vec![Vec::new(); solution.n_drones()];
    let mut n_dropped = 0;

    for r in 0..solution.n_rounds() {
        for (d_idx, d) in solution.drones.iter().enumerate() {
            let Some(tour) = d.tours.get(r) else {
                continue;
            };

            let fresh = tour
                .targets()
                .iter()
                .map(|t| covered.insert(*t))
                .collect::<Vec<_>>();

            if !fresh.iter().any(|f| *f) {
                trace!("{} round {}: nothing new, dropping {}", d.drone, r, tour);
                n_dropped += 1;
            } else if fresh.iter().all(|f| *f) {
                tours[d_idx].push(tour.clone());
            } else {
                let pruned = Tour::from_nodes(aoi, &shortcut_nodes(aoi, tour, &fresh)?)?;
                trace!("{} round {}: {} -> {}", d.drone, r, tour, pruned);
                tours[d_idx].push(pruned);
            }
        }
    }

    let mut builder = MultiRoundSolutionBuilder::new();
    for (d, tours) in solution.drones.iter().zip(tours) {
        builder.add_drone_with_tours(d.drone, d.depot, tours);
    }
    let pruned = builder.build()?;
    debug!(
        "pruning dropped {} tours, length {:.1} -> {:.1}",
        n_dropped,
        solution.total_length(),
        pruned.total_length()
    );
    Ok(pruned)
}

/// Depot followed by a subsequence of `tour`'s targets that contains every
/// target flagged in `keep` and only uses existing edges.
///
/// Unflagged targets are kept as pass-through points only where needed: the
/// route with the fewest of them wins, then the shorter one. The tour itself
/// is always a candidate, so a route exists.
fn shortcut_nodes(aoi: &Aoi, tour: &Tour, keep: &[bool]) -> Result<Vec<usize>, PlanError> {
    let seq = std::iter::once(tour.depot())
        .chain(tour.targets().iter().copied())
        .chain(std::iter::once(tour.depot()))
        .collect::<Vec<_>>();
    let last = seq.len() - 1;
    let required = |i: usize| i == 0 || i == last || keep[i - 1];

    // best[j]: (pass-through targets, length, predecessor) of the best route
    // from the depot ending at position j.
    let mut best: Vec<Option<(usize, OrderedFloat<f64>, usize)>> = vec![None; seq.len()];
    best[0] = Some((0, OrderedFloat(0.0), 0));
    for j in 1..seq.len() {
        let extra = usize::from(!required(j));
        for i in (0..j).rev() {
            if let (Some((n, len, _)), Some(w)) = (best[i], aoi.weight(seq[i], seq[j])) {
                let candidate = (n + extra, OrderedFloat(len.0 + w), i);
                if best[j].map_or(true, |(bn, blen, _)| (candidate.0, candidate.1) < (bn, blen)) {
                    best[j] = Some(candidate);
                }
            }
            // Required nodes cannot be skipped.
            if required(i) {
                break;
            }
        }
    }

    let mut nodes = Vec::new();
    let mut j = last;
    loop {
        let (_, _, prev) = best[j]
            .ok_or_else(|| PlanError::Internal(format!("no route through {} when pruning", tour)))?;
        if j != last {
            nodes.push(seq[j]);
        }
        if j == 0 {
            break;
        }
        j = prev;
    }
    nodes.reverse();
    Ok(nodes)
}
