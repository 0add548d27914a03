use log::{debug, trace, warn};
use survcov_structs::Point;

use crate::{
    aoi::Aoi, christofides::christofides, drone::Drone, error::PlanError, greedy::Catalog,
    tour::Tour,
};

/// Builds the candidate tours a drone can fly from one depot.
pub struct TrajectoryGenerator<'a> {
    aoi: &'a Aoi,
}

impl<'a> TrajectoryGenerator<'a> {
    pub fn new(aoi: &'a Aoi) -> Self {
        TrajectoryGenerator { aoi }
    }

    /// Every maximal sub-tour of one TSP order over the reachable targets.
    ///
    /// For each starting target in the order, tours
    /// `depot -> order[i] -> .. -> order[j] -> depot` are emitted for growing
    /// `j` while they stay strictly within the drone's autonomy.
    pub fn compute_trajectories(&self, drone: &Drone, depot: &Point) -> Result<Vec<Tour>, PlanError> {
        #[cfg(feature = "prof")]
        let _p = hprof::enter("compute_trajectories");

        let depot_idx = self.aoi.depot_index(depot)?;
        let nodes = self.reachable_nodes(drone, depot_idx);
        if nodes.len() < 2 {
            return Err(PlanError::InsufficientEnergy {
                drone: drone.id(),
                depot: *depot,
            });
        }
        debug!(
            "{} reaches {} of {} targets from depot {}",
            drone,
            nodes.len() - 1,
            self.aoi.n_targets(),
            depot
        );

        let order = christofides(&self.aoi.subgraph(&nodes), depot_idx)?;
        debug_assert_eq!(order[0], depot_idx);
        debug_assert_eq!(order.len(), nodes.len());

        let mut tours = Vec::new();
        for first in 1..order.len() {
            let mut path = vec![depot_idx];
            for next in order[first..].iter() {
                path.push(*next);
                let tour = match Tour::from_nodes(self.aoi, &path) {
                    Ok(tour) => tour,
                    Err(PlanError::MissingEdge(a, b)) => {
                        trace!("no viable path {}-{}, stop growing from {}", a, b, order[first]);
                        break;
                    }
                    Err(e) => return Err(e),
                };
                // Longer sub-tours from the same start cannot be cheaper.
                if tour.time(drone.speed) >= drone.autonomy {
                    break;
                }
                tours.push(tour);
            }
        }

        debug!("{} has {} candidate tours", drone, tours.len());
        Ok(tours)
    }

    /// The depot followed by every target whose single-visit round trip
    /// fits strictly within the drone's autonomy. Other depots are left out.
    fn reachable_nodes(&self, drone: &Drone, depot_idx: usize) -> Vec<usize> {
        let mut nodes = vec![depot_idx];
        for t in 0..self.aoi.n_targets() {
            match self.aoi.weight(depot_idx, t) {
                Some(w) if (w + w) / drone.speed + self.aoi.dwell(t) < drone.autonomy => nodes.push(t),
                Some(_) => trace!("target {} too far for {}", t, drone),
                None => trace!("target {} has no viable path to depot {}", t, depot_idx),
            }
        }
        nodes
    }

    /// Candidate tours for every `(drone, depot)` pair, in the given order.
    ///
    /// Drones that cannot fly any tour are returned separately with their
    /// error, so the rest of the fleet can still be planned.
    pub fn candidate_catalog(&self, drones: &[(Drone, Point)]) -> (Catalog, Vec<(Drone, PlanError)>) {
        let mut catalog = Catalog::new();
        let mut infeasible = Vec::new();
        for (drone, depot) in drones.iter() {
            match self.compute_trajectories(drone, depot) {
                Ok(tours) => catalog.push((*drone, tours)),
                Err(e) => {
                    warn!("no trajectories for {}: {}", drone, e);
                    infeasible.push((*drone, e));
                }
            }
        }
        (catalog, infeasible)
    }
}
