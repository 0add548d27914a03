use log::{debug, trace};
use ordered_float::OrderedFloat;
use petgraph::unionfind::UnionFind;
use tinyvec::TinyVec;

use crate::{aoi::WeightedGraph, error::PlanError, matching::max_weight_matching};

/// Integer resolution used for the matching weights.
const MATCHING_SCALE: f64 = 1e9;

/// Christofides' 1.5-approximation for the metric TSP.
///
/// Returns every node of `graph` exactly once, starting at `start`; the
/// closing edge back to `start` is implied. Graphs that are connected but not
/// complete are solved on their shortest-path closure.
pub fn christofides(graph: &WeightedGraph, start: usize) -> Result<Vec<usize>, PlanError> {
    #[cfg(feature = "prof")]
    let _p = hprof::enter("christofides");

    let local_start = graph.position(start).ok_or(PlanError::NodeOutOfRange {
        index: start,
        n_nodes: graph.len(),
    })?;
    if graph.len() == 1 {
        return Ok(vec![start]);
    }

    let closure;
    let g = if graph.is_complete() {
        graph
    } else {
        closure = graph.metric_closure();
        if !closure.is_complete() {
            return Err(PlanError::Disconnected);
        }
        &closure
    };

    let edges = mst_matching_multigraph(g)?;
    let circuit = eulerian_circuit(g.len(), &edges, local_start);
    if circuit.len() != edges.len() + 1 {
        return Err(PlanError::Internal(format!(
            "eulerian circuit covers {} of {} edges",
            circuit.len().saturating_sub(1),
            edges.len()
        )));
    }
    trace!("eulerian circuit {:?}", circuit);

    // Shortcut repeated visits, keeping first occurrences.
    let mut seen = vec![false; g.len()];
    let order = circuit
        .into_iter()
        .filter(|v| !std::mem::replace(&mut seen[*v], true))
        .map(|v| g.node(v))
        .collect::<Vec<_>>();
    debug_assert_eq!(order.len(), g.len());

    debug!(
        "christofides over {} nodes, tour length {:.2}",
        order.len(),
        tour_length(g, &order).unwrap_or(f64::NAN)
    );
    Ok(order)
}

/// Length of the closed tour visiting `order` (node ids) in sequence.
pub fn tour_length(graph: &WeightedGraph, order: &[usize]) -> Option<f64> {
    let locals = order
        .iter()
        .map(|n| graph.position(*n))
        .collect::<Option<Vec<_>>>()?;
    if locals.len() < 2 {
        return Some(0.0);
    }
    let mut length = 0.0;
    for (a, b) in locals.iter().zip(locals.iter().cycle().skip(1)) {
        length += graph.weight(*a, *b)?;
    }
    Some(length)
}

/// Minimum spanning tree edges (local positions) by Kruskal. Equal weights
/// are taken in `(a, b)` enumeration order.
fn minimum_spanning_tree(g: &WeightedGraph) -> Vec<(usize, usize)> {
    let k = g.len();
    let mut edges = (0..k)
        .flat_map(|a| ((a + 1)..k).filter_map(move |b| g.weight(a, b).map(|w| (a, b, w))))
        .collect::<Vec<_>>();
    edges.sort_by_key(|(_, _, w)| OrderedFloat(*w));

    let mut components = UnionFind::<usize>::new(k);
    let mut tree = Vec::with_capacity(k.saturating_sub(1));
    for (a, b, _) in edges {
        if components.union(a, b) {
            tree.push((a, b));
            if tree.len() + 1 == k {
                break;
            }
        }
    }
    tree
}

/// Minimum weight perfect matching of the odd-degree tree vertices.
fn odd_vertex_matching(
    g: &WeightedGraph,
    tree: &[(usize, usize)],
) -> Result<Vec<(usize, usize)>, PlanError> {
    let mut degree = vec![0usize; g.len()];
    for (a, b) in tree.iter() {
        degree[*a] += 1;
        degree[*b] += 1;
    }
    let odd = (0..g.len()).filter(|v| degree[*v] % 2 == 1).collect::<Vec<_>>();
    if odd.is_empty() {
        return Ok(Vec::new());
    }

    let mut pairs = Vec::new();
    for i in 0..odd.len() {
        for j in (i + 1)..odd.len() {
            let w = g
                .weight(odd[i], odd[j])
                .ok_or(PlanError::MissingEdge(g.node(odd[i]), g.node(odd[j])))?;
            pairs.push((i, j, w));
        }
    }

    // Minimum weight among perfect matchings is maximum weight of
    // (max - w) among maximum cardinality matchings.
    let max_w = pairs.iter().map(|p| p.2).fold(0.0, f64::max);
    let scale = if max_w > 0.0 { MATCHING_SCALE / max_w } else { 0.0 };
    let edges = pairs
        .iter()
        .map(|(i, j, w)| (*i, *j, ((max_w - w) * scale).round() as i64 + 1))
        .collect::<Vec<_>>();

    let mate = max_weight_matching(odd.len(), &edges, true);
    let mut matching = Vec::with_capacity(odd.len() / 2);
    for (i, m) in mate.iter().enumerate() {
        match m {
            Some(j) if i < *j => matching.push((odd[i], odd[*j])),
            Some(_) => {}
            None => {
                return Err(PlanError::Internal(format!(
                    "odd vertex {} left unmatched",
                    g.node(odd[i])
                )))
            }
        }
    }
    trace!("odd vertices {:?} matched {:?}", odd, matching);
    Ok(matching)
}

/// Edges of the tree plus odd-vertex matching, checked to have only
/// even degrees.
fn mst_matching_multigraph(g: &WeightedGraph) -> Result<Vec<(usize, usize)>, PlanError> {
    let mut edges = minimum_spanning_tree(g);
    if edges.len() + 1 != g.len() {
        return Err(PlanError::Disconnected);
    }
    let matching = odd_vertex_matching(g, &edges)?;
    edges.extend(matching);

    let mut degree = vec![0usize; g.len()];
    for (a, b) in edges.iter() {
        degree[*a] += 1;
        degree[*b] += 1;
    }
    if let Some(v) = degree.iter().position(|d| d % 2 == 1) {
        return Err(PlanError::Internal(format!(
            "vertex {} has odd degree {} in the eulerian multigraph",
            g.node(v),
            degree[v]
        )));
    }
    Ok(edges)
}

/// Hierholzer's algorithm. Returns the closed vertex walk, first and last
/// element equal to `start`.
fn eulerian_circuit(n: usize, edges: &[(usize, usize)], start: usize) -> Vec<usize> {
    let mut adjacent: Vec<TinyVec<[(u32, u32); 8]>> = vec![Default::default(); n];
    // Reversed so that popping yields edges in insertion order.
    for (e, (a, b)) in edges.iter().enumerate().rev() {
        adjacent[*a].push((*b as u32, e as u32));
        adjacent[*b].push((*a as u32, e as u32));
    }

    let mut used = vec![false; edges.len()];
    let mut stack = vec![start];
    let mut circuit = Vec::with_capacity(edges.len() + 1);
    while let Some(&v) = stack.last() {
        let next = loop {
            match adjacent[v].pop() {
                Some((_, e)) if used[e as usize] => continue,
                other => break other,
            }
        };
        match next {
            Some((u, e)) => {
                used[e as usize] = true;
                stack.push(u as usize);
            }
            None => {
                stack.pop();
                circuit.push(v);
            }
        }
    }
    circuit.reverse();
    circuit
}
