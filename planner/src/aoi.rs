use std::collections::{HashMap, HashSet};

use log::{debug, trace};
use ordered_float::OrderedFloat;
use petgraph::{algo::dijkstra, graph::UnGraph};
use survcov_structs::{scenario::Scenario, Point};

use crate::error::PlanError;

type PointKey = (OrderedFloat<f64>, OrderedFloat<f64>);

fn key(p: &Point) -> PointKey {
    (OrderedFloat(p.x), OrderedFloat(p.y))
}

/// The area of interest as a weighted graph.
///
/// Targets are numbered `0..n_targets`, depots follow at
/// `n_targets..n_targets + n_depots`. Edge weights are Euclidean distances,
/// either between every pair of points or only along the given viable paths.
#[derive(Debug, Clone)]
pub struct Aoi {
    width: f64,
    height: f64,
    targets: Vec<Point>,
    depots: Vec<Point>,
    dwell_time: f64,
    index: HashMap<PointKey, usize>,
    weights: Vec<Option<f64>>,
}

impl Aoi {
    pub fn new(
        depots: Vec<Point>,
        targets: Vec<Point>,
        width: f64,
        height: f64,
        dwell_time: f64,
        viable_paths: Option<&[(Point, Point)]>,
    ) -> Result<Aoi, PlanError> {
        #[cfg(feature = "prof")]
        let _p = hprof::enter("build aoi");

        if let Some(p) = targets.iter().chain(depots.iter()).find(|p| !p.is_finite()) {
            return Err(PlanError::NonFinite(*p));
        }
        if !dwell_time.is_finite() || dwell_time < 0.0 {
            return Err(PlanError::NegativeDwell(dwell_time));
        }

        let mut index: HashMap<PointKey, usize> = Default::default();
        for (i, t) in targets.iter().enumerate() {
            if index.insert(key(t), i).is_some() {
                return Err(PlanError::DuplicateTarget(*t));
            }
        }
        let mut depot_keys: HashSet<PointKey> = Default::default();
        for (i, d) in depots.iter().enumerate() {
            if !depot_keys.insert(key(d)) {
                return Err(PlanError::DuplicateDepot(*d));
            }
            if index.insert(key(d), targets.len() + i).is_some() {
                return Err(PlanError::TargetIsDepot(*d));
            }
        }

        let n = targets.len() + depots.len();
        let mut aoi = Aoi {
            width,
            height,
            targets,
            depots,
            dwell_time,
            index,
            weights: vec![None; n * n],
        };

        match viable_paths {
            None => {
                for i in 0..n {
                    for j in (i + 1)..n {
                        aoi.set_edge(i, j);
                    }
                }
            }
            Some(paths) => {
                for (a, b) in paths {
                    let (i, j) = (aoi.node_index(a)?, aoi.node_index(b)?);
                    if i == j {
                        trace!("ignoring self loop at {}", a);
                        continue;
                    }
                    aoi.set_edge(i, j);
                }
            }
        }

        debug!(
            "Constructed {} with {} edges",
            aoi,
            aoi.weights.iter().filter(|w| w.is_some()).count() / 2
        );
        Ok(aoi)
    }

    pub fn from_scenario(scenario: &Scenario) -> Result<Aoi, PlanError> {
        Aoi::new(
            scenario.depots.clone(),
            scenario.targets.clone(),
            scenario.width,
            scenario.height,
            scenario.dwell_time,
            scenario.viable_paths.as_deref(),
        )
    }

    fn set_edge(&mut self, i: usize, j: usize) {
        let n = self.n_nodes();
        let w = self.pos(i).dist(&self.pos(j));
        self.weights[i * n + j] = Some(w);
        self.weights[j * n + i] = Some(w);
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn n_targets(&self) -> usize {
        self.targets.len()
    }

    pub fn n_depots(&self) -> usize {
        self.depots.len()
    }

    pub fn n_nodes(&self) -> usize {
        self.targets.len() + self.depots.len()
    }

    pub fn targets(&self) -> &[Point] {
        &self.targets
    }

    pub fn depots(&self) -> &[Point] {
        &self.depots
    }

    pub fn dwell_time(&self) -> f64 {
        self.dwell_time
    }

    pub fn pos(&self, node: usize) -> Point {
        if node < self.targets.len() {
            self.targets[node]
        } else {
            self.depots[node - self.targets.len()]
        }
    }

    pub fn is_depot(&self, node: usize) -> bool {
        node >= self.targets.len()
    }

    /// Hovering time spent at a node; zero at depots.
    pub fn dwell(&self, node: usize) -> f64 {
        if self.is_depot(node) {
            0.0
        } else {
            self.dwell_time
        }
    }

    pub fn weight(&self, a: usize, b: usize) -> Option<f64> {
        let n = self.n_nodes();
        if a >= n || b >= n {
            return None;
        }
        self.weights[a * n + b]
    }

    pub fn check_node(&self, node: usize) -> Result<usize, PlanError> {
        if node < self.n_nodes() {
            Ok(node)
        } else {
            Err(PlanError::NodeOutOfRange {
                index: node,
                n_nodes: self.n_nodes(),
            })
        }
    }

    pub fn node_index(&self, p: &Point) -> Result<usize, PlanError> {
        self.index
            .get(&key(p))
            .copied()
            .ok_or(PlanError::UnknownPoint(*p))
    }

    pub fn depot_index(&self, p: &Point) -> Result<usize, PlanError> {
        match self.index.get(&key(p)) {
            Some(&i) if self.is_depot(i) => Ok(i),
            _ => Err(PlanError::UnknownDepot(*p)),
        }
    }

    /// Dense copy of the graph restricted to `nodes`, in the given order.
    pub fn subgraph(&self, nodes: &[usize]) -> WeightedGraph {
        let k = nodes.len();
        let mut weights = vec![None; k * k];
        for (a, na) in nodes.iter().enumerate() {
            for (b, nb) in nodes.iter().enumerate() {
                if a != b {
                    weights[a * k + b] = self.weight(*na, *nb);
                }
            }
        }
        WeightedGraph {
            nodes: nodes.to_vec(),
            weights,
        }
    }
}

impl std::fmt::Display for Aoi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}x{} AoI with {} depots and {} targets",
            self.width,
            self.height,
            self.n_depots(),
            self.n_targets()
        )
    }
}

/// Undirected weighted graph over a list of node ids, stored as a dense
/// symmetric matrix indexed by position in `nodes`.
#[derive(Debug, Clone)]
pub struct WeightedGraph {
    nodes: Vec<usize>,
    weights: Vec<Option<f64>>,
}

impl WeightedGraph {
    /// Complete Euclidean graph over `points`, with node ids `0..points.len()`.
    pub fn complete(points: &[Point]) -> WeightedGraph {
        let k = points.len();
        let mut weights = vec![None; k * k];
        for a in 0..k {
            for b in 0..k {
                if a != b {
                    weights[a * k + b] = Some(points[a].dist(&points[b]));
                }
            }
        }
        WeightedGraph {
            nodes: (0..k).collect(),
            weights,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[usize] {
        &self.nodes
    }

    pub fn node(&self, local: usize) -> usize {
        self.nodes[local]
    }

    pub fn position(&self, node: usize) -> Option<usize> {
        self.nodes.iter().position(|n| *n == node)
    }

    /// Weight between two local positions.
    pub fn weight(&self, a: usize, b: usize) -> Option<f64> {
        self.weights[a * self.len() + b]
    }

    pub fn is_complete(&self) -> bool {
        let k = self.len();
        (0..k).all(|a| (0..k).all(|b| a == b || self.weights[a * k + b].is_some()))
    }

    /// Shortest-path distances between every pair of positions, `None` when
    /// unreachable.
    pub fn metric_closure(&self) -> WeightedGraph {
        #[cfg(feature = "prof")]
        let _p = hprof::enter("metric closure");

        let k = self.len();
        let mut graph = UnGraph::<usize, f64>::with_capacity(k, k * k.saturating_sub(1) / 2);
        let idx = self.nodes.iter().map(|n| graph.add_node(*n)).collect::<Vec<_>>();
        for a in 0..k {
            for b in (a + 1)..k {
                if let Some(w) = self.weight(a, b) {
                    graph.add_edge(idx[a], idx[b], w);
                }
            }
        }

        let mut weights = vec![None; k * k];
        for a in 0..k {
            for (v, d) in dijkstra(&graph, idx[a], None, |e| *e.weight()) {
                let b = v.index();
                if a != b {
                    weights[a * k + b] = Some(d);
                }
            }
        }
        WeightedGraph {
            nodes: self.nodes.clone(),
            weights,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    fn square() -> Aoi {
        Aoi::new(
            vec![p(0.0, 0.0)],
            vec![p(10.0, 0.0), p(10.0, 10.0), p(0.0, 10.0)],
            20.0,
            20.0,
            5.0,
            None,
        )
        .unwrap()
    }

    #[test]
    fn node_numbering() {
        let aoi = square();
        assert_eq!(aoi.n_nodes(), 4);
        assert_eq!(aoi.node_index(&p(10.0, 10.0)), Ok(1));
        assert_eq!(aoi.node_index(&p(0.0, 0.0)), Ok(3));
        assert_eq!(aoi.depot_index(&p(0.0, 0.0)), Ok(3));
        assert_eq!(aoi.depot_index(&p(10.0, 0.0)), Err(PlanError::UnknownDepot(p(10.0, 0.0))));
        assert_eq!(aoi.node_index(&p(1.0, 1.0)), Err(PlanError::UnknownPoint(p(1.0, 1.0))));
        assert!(aoi.is_depot(3) && !aoi.is_depot(0));
        assert_eq!(aoi.dwell(0), 5.0);
        assert_eq!(aoi.dwell(3), 0.0);
        assert_eq!(aoi.check_node(4), Err(PlanError::NodeOutOfRange { index: 4, n_nodes: 4 }));
        assert_eq!(aoi.to_string(), "20x20 AoI with 1 depots and 3 targets");
    }

    #[test]
    fn complete_euclidean_weights() {
        let aoi = square();
        assert_eq!(aoi.weight(3, 0), Some(10.0));
        assert_eq!(aoi.weight(0, 3), Some(10.0));
        assert!((aoi.weight(3, 1).unwrap() - 200f64.sqrt()).abs() < 1e-12);
        assert_eq!(aoi.weight(2, 2), None);
        assert_eq!(aoi.weight(2, 9), None);
    }

    #[test]
    fn rejects_bad_points() {
        let dup = Aoi::new(vec![p(0.0, 0.0)], vec![p(1.0, 1.0), p(1.0, 1.0)], 1.0, 1.0, 0.0, None);
        assert_eq!(dup.unwrap_err(), PlanError::DuplicateTarget(p(1.0, 1.0)));

        let dup = Aoi::new(vec![p(0.0, 0.0), p(0.0, 0.0)], vec![p(1.0, 1.0)], 1.0, 1.0, 0.0, None);
        assert_eq!(dup.unwrap_err(), PlanError::DuplicateDepot(p(0.0, 0.0)));

        let both = Aoi::new(vec![p(1.0, 1.0)], vec![p(1.0, 1.0)], 1.0, 1.0, 0.0, None);
        assert_eq!(both.unwrap_err(), PlanError::TargetIsDepot(p(1.0, 1.0)));

        let nan = Aoi::new(vec![p(0.0, 0.0)], vec![p(f64::NAN, 1.0)], 1.0, 1.0, 0.0, None);
        assert!(matches!(nan.unwrap_err(), PlanError::NonFinite(_)));

        let dwell = Aoi::new(vec![p(0.0, 0.0)], vec![p(1.0, 1.0)], 1.0, 1.0, -1.0, None);
        assert_eq!(dwell.unwrap_err(), PlanError::NegativeDwell(-1.0));
    }

    #[test]
    fn viable_paths_restrict_edges() {
        let paths = vec![(p(0.0, 0.0), p(10.0, 0.0)), (p(10.0, 0.0), p(10.0, 10.0))];
        let aoi = Aoi::new(
            vec![p(0.0, 0.0)],
            vec![p(10.0, 0.0), p(10.0, 10.0)],
            10.0,
            10.0,
            0.0,
            Some(&paths),
        )
        .unwrap();
        assert_eq!(aoi.weight(2, 0), Some(10.0));
        assert_eq!(aoi.weight(1, 0), Some(10.0));
        assert_eq!(aoi.weight(2, 1), None);

        let bad = vec![(p(0.0, 0.0), p(5.0, 5.0))];
        let err = Aoi::new(vec![p(0.0, 0.0)], vec![p(10.0, 0.0)], 10.0, 10.0, 0.0, Some(&bad));
        assert_eq!(err.unwrap_err(), PlanError::UnknownPoint(p(5.0, 5.0)));
    }

    #[test]
    fn subgraph_and_closure() {
        let paths = vec![(p(0.0, 0.0), p(10.0, 0.0)), (p(10.0, 0.0), p(10.0, 10.0))];
        let aoi = Aoi::new(
            vec![p(0.0, 0.0)],
            vec![p(10.0, 0.0), p(10.0, 10.0)],
            10.0,
            10.0,
            0.0,
            Some(&paths),
        )
        .unwrap();
        let g = aoi.subgraph(&[2, 0, 1]);
        assert_eq!(g.len(), 3);
        assert_eq!(g.node(0), 2);
        assert_eq!(g.position(1), Some(2));
        assert!(!g.is_complete());

        let closure = g.metric_closure();
        assert!(closure.is_complete());
        assert_eq!(closure.weight(0, 2), Some(20.0));
        assert_eq!(closure.weight(0, 1), Some(10.0));
        assert_eq!(closure.weight(1, 1), None);
        assert_eq!(closure.nodes(), g.nodes());
    }

    #[test]
    fn closure_keeps_unreachable_pairs_empty() {
        let (d, a, b, c) = (p(0.0, 0.0), p(3.0, 4.0), p(6.0, 8.0), p(20.0, 0.0));
        let paths = vec![(d, a), (a, b), (d, b)];
        let aoi = Aoi::new(vec![d], vec![a, b, c], 20.0, 10.0, 0.0, Some(&paths)).unwrap();
        let closure = aoi.subgraph(&[3, 0, 1, 2]).metric_closure();
        assert!(!closure.is_complete());
        // The direct edge d-b is as short as the path through a.
        assert_eq!(closure.weight(0, 2), Some(10.0));
        assert_eq!(closure.weight(1, 2), Some(5.0));
        for x in 0..3 {
            assert_eq!(closure.weight(x, 3), None);
            assert_eq!(closure.weight(3, x), None);
        }
    }
}
