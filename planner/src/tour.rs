use std::collections::HashSet;

use survcov_structs::Point;

use crate::{aoi::Aoi, error::PlanError};

/// A closed route from one depot through a sequence of targets.
///
/// Length and dwell time are computed once, on construction. Two tours are
/// equal when their edge sequences are equal.
#[derive(Debug, Clone)]
pub struct Tour {
    edges: Vec<(usize, usize)>,
    depot: usize,
    targets: Vec<usize>,
    length: f64,
    dwell_time: f64,
}

impl PartialEq for Tour {
    fn eq(&self, other: &Self) -> bool {
        self.edges == other.edges
    }
}

impl Eq for Tour {}

impl Tour {
    pub fn from_edges(aoi: &Aoi, edges: Vec<(usize, usize)>) -> Result<Tour, PlanError> {
        if edges.len() < 2 {
            return Err(PlanError::MalformedTour(format!(
                "a tour needs at least two edges, got {}",
                edges.len()
            )));
        }
        for (a, b) in edges.iter() {
            aoi.check_node(*a)?;
            aoi.check_node(*b)?;
        }
        for (i, (_, b)) in edges.iter().enumerate() {
            let next = edges[(i + 1) % edges.len()].0;
            if *b != next {
                return Err(PlanError::MalformedTour(format!(
                    "edge {} ends at node {} but the next edge starts at node {}",
                    i, b, next
                )));
            }
        }

        let mut depot = None;
        let mut seen = HashSet::new();
        for (i, (a, _)) in edges.iter().enumerate() {
            if aoi.is_depot(*a) {
                if let Some((_, d)) = depot {
                    return Err(PlanError::MalformedTour(format!(
                        "visits more than one depot ({} and {})",
                        d, a
                    )));
                }
                depot = Some((i, *a));
            } else if !seen.insert(*a) {
                return Err(PlanError::MalformedTour(format!("target {} visited twice", a)));
            }
        }
        let (depot_pos, depot) =
            depot.ok_or_else(|| PlanError::MalformedTour("no depot in tour".to_string()))?;
        let targets = edges[depot_pos + 1..]
            .iter()
            .chain(edges[..depot_pos].iter())
            .map(|(a, _)| *a)
            .collect::<Vec<_>>();

        let mut length = 0.0;
        let mut dwell_time = 0.0;
        for (a, b) in edges.iter() {
            length += aoi.weight(*a, *b).ok_or(PlanError::MissingEdge(*a, *b))?;
            dwell_time += aoi.dwell(*b);
        }

        Ok(Tour {
            edges,
            depot,
            targets,
            length,
            dwell_time,
        })
    }

    /// Closed tour through `nodes` in order, returning to the first node.
    pub fn from_nodes(aoi: &Aoi, nodes: &[usize]) -> Result<Tour, PlanError> {
        let edges = nodes
            .iter()
            .zip(nodes.iter().cycle().skip(1))
            .map(|(a, b)| (*a, *b))
            .collect();
        Tour::from_edges(aoi, edges)
    }

    pub fn from_coordinates(aoi: &Aoi, edges: &[(Point, Point)]) -> Result<Tour, PlanError> {
        let edges = edges
            .iter()
            .map(|(a, b)| Ok((aoi.node_index(a)?, aoi.node_index(b)?)))
            .collect::<Result<Vec<_>, PlanError>>()?;
        Tour::from_edges(aoi, edges)
    }

    pub fn edges(&self) -> &[(usize, usize)] {
        &self.edges
    }

    pub fn depot(&self) -> usize {
        self.depot
    }

    /// Targets in visiting order, counted from the depot.
    pub fn targets(&self) -> &[usize] {
        &self.targets
    }

    pub fn n_nodes(&self) -> usize {
        self.targets.len() + 1
    }

    /// Meters flown.
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Seconds spent hovering over targets.
    pub fn dwell_time(&self) -> f64 {
        self.dwell_time
    }

    /// Seconds needed to fly the tour at `speed`.
    pub fn time(&self, speed: f64) -> f64 {
        self.length / speed + self.dwell_time
    }

    /// Time at which the inspection of each target ends, in visiting order.
    pub fn inspection_times(&self, aoi: &Aoi, speed: f64) -> Vec<f64> {
        let mut t = 0.0;
        let mut prev = self.depot;
        self.targets
            .iter()
            .map(|next| {
                // Edges were validated on construction.
                t += aoi.weight(prev, *next).unwrap_or(f64::INFINITY) / speed + aoi.dwell(*next);
                prev = *next;
                t
            })
            .collect()
    }

    /// Depot followed by the targets in visiting order, without the closing node.
    pub fn nodes(&self) -> Vec<usize> {
        std::iter::once(self.depot).chain(self.targets.iter().copied()).collect()
    }
}

impl std::fmt::Display for Tour {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Tour(depot={}, targets={:?}, length={:.1})",
            self.depot, self.targets, self.length
        )
    }
}
