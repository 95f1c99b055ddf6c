use crate::arrays::PixelImage;
use crate::common::{Config, Heuristic, ThreadingStrategy};
use crate::contour::merge_contours;
use crate::criterion::Criterion;
use crate::error::{Error, InvariantViolation};
use crate::graph::{Edge, Graph, Region, RegionId};
use log::{debug, info, trace};
use rayon::prelude::*;
use std::cmp::Ordering;

/// Result of [`segment`].
#[derive(Debug)]
pub struct Segmentation<A> {
    pub graph: Graph<A>,
    /// `false` when the loop was stopped by `Config::max_iterations` before reaching a pass
    /// without merges.
    pub complete: bool,
    /// Number of passes performed, the final empty pass included.
    pub passes: u32,
}

/// Segments the image by iteratively merging adjacent regions.
///
/// Starts from one region per pixel and performs passes until one of them merges nothing or
/// `config.max_iterations` passes were done.
pub fn segment<C: Criterion>(
    image: &PixelImage,
    config: &Config,
    criterion: &C,
) -> Result<Segmentation<C::Attributes>, Error> {
    config.validate()?;
    image.validate()?;
    let attributes = criterion.init_from_image(image);
    let mut graph = Graph::from_attributes(attributes, image.width, image.height)?;
    let (passes, complete) = iterate(&mut graph, config, criterion)?;
    Ok(Segmentation {
        graph,
        complete,
        passes,
    })
}

/// Runs passes on `graph` until a fixed point or the pass limit.
///
/// Returns the number of passes and whether the fixed point was reached.
pub fn iterate<C: Criterion>(
    graph: &mut Graph<C::Attributes>,
    config: &Config,
    criterion: &C,
) -> Result<(u32, bool), Error> {
    let mut passes = 0u32;
    loop {
        if let Some(max_iterations) = config.max_iterations {
            if passes >= max_iterations {
                info!(
                    "stopped after {passes} passes with {} regions left, limit reached",
                    graph.len()
                );
                return Ok((passes, false));
            }
        }
        let merges = perform_pass(graph, config, criterion)?;
        passes += 1;
        debug!("pass {passes}: {merges} merges, {} regions", graph.len());
        if merges == 0 {
            info!(
                "segmentation converged after {passes} passes with {} regions",
                graph.len()
            );
            return Ok((passes, true));
        }
    }
}

/// One pass: refresh stale costs, select candidate pairs, merge them and drop the absorbed
/// regions. Returns the number of merges.
pub fn perform_pass<C: Criterion>(
    graph: &mut Graph<C::Attributes>,
    config: &Config,
    criterion: &C,
) -> Result<usize, Error> {
    config.validate()?;
    graph
        .regions_mut()
        .iter_mut()
        .for_each(|region| region.valid = true);

    refresh_costs(graph, criterion, config.threading_strategy);
    let best = best_neighbors(graph, config.threading_strategy);
    let pairs = match config.heuristic {
        Heuristic::LocalMutualBestFitting => select_mutual(graph, &best, config.threshold),
        Heuristic::BestFitting => select_best(graph, &best, config.threshold),
    };
    for &(survivor, absorbed) in &pairs {
        merge(graph, criterion, survivor, absorbed)?;
    }
    let removed = graph.remove_expired();
    debug_assert_eq!(removed, pairs.len());
    Ok(pairs.len())
}

/// New cost of every edge of `region`, `None` when the neighbor no longer exists.
fn region_costs<C: Criterion>(
    graph: &Graph<C::Attributes>,
    criterion: &C,
    region: &Region<C::Attributes>,
) -> Vec<Option<f32>> {
    region
        .edges
        .iter()
        .map(|edge| {
            let neighbor = graph.get(edge.target)?;
            if edge.cost_fresh {
                Some(edge.cost)
            } else {
                Some(criterion.cost(region, neighbor, edge.boundary))
            }
        })
        .collect()
}

fn refresh_costs<C: Criterion>(
    graph: &mut Graph<C::Attributes>,
    criterion: &C,
    threading_strategy: ThreadingStrategy,
) {
    let costs: Vec<Vec<Option<f32>>> = {
        let graph = &*graph;
        match threading_strategy {
            ThreadingStrategy::SingleThread => graph
                .regions()
                .iter()
                .map(|region| region_costs(graph, criterion, region))
                .collect(),
            ThreadingStrategy::Rayon => graph
                .regions()
                .par_iter()
                .map(|region| region_costs(graph, criterion, region))
                .collect(),
        }
    };
    for (region, costs) in graph.regions_mut().iter_mut().zip(costs) {
        let id = region.id;
        let mut costs = costs.into_iter();
        region.edges.retain_mut(|edge| match costs.next() {
            Some(Some(cost)) => {
                edge.cost = cost;
                edge.cost_fresh = true;
                true
            }
            _ => {
                trace!("dropping stale edge {id} -> {}", edge.target);
                false
            }
        });
    }
}

/// Cheapest edge, ties broken by the smaller neighbor id.
fn best_edge(edges: &[Edge]) -> Option<(RegionId, f32)> {
    edges.iter().fold(None, |best, edge| match best {
        Some((target, cost)) => match edge.cost.total_cmp(&cost) {
            Ordering::Less => Some((edge.target, edge.cost)),
            Ordering::Equal if edge.target < target => Some((edge.target, edge.cost)),
            _ => best,
        },
        None => Some((edge.target, edge.cost)),
    })
}

fn best_neighbors<A: Send + Sync>(
    graph: &Graph<A>,
    threading_strategy: ThreadingStrategy,
) -> Vec<Option<(RegionId, f32)>> {
    match threading_strategy {
        ThreadingStrategy::SingleThread => graph
            .regions()
            .iter()
            .map(|region| best_edge(&region.edges))
            .collect(),
        ThreadingStrategy::Rayon => graph
            .regions()
            .par_iter()
            .map(|region| best_edge(&region.edges))
            .collect(),
    }
}

/// Pairs of regions that are each other's best neighbor, as `(smaller id, larger id)`.
fn select_mutual<A>(
    graph: &mut Graph<A>,
    best: &[Option<(RegionId, f32)>],
    threshold: f32,
) -> Vec<(RegionId, RegionId)> {
    let mut pairs = Vec::new();
    for pos in 0..graph.len() {
        let id = graph.regions()[pos].id;
        let Some((target, cost)) = best[pos] else {
            continue;
        };
        if id > target || cost > threshold || cost.is_nan() {
            continue;
        }
        let Some(target_pos) = graph.position(target) else {
            continue;
        };
        if !matches!(best[target_pos], Some((back, _)) if back == id) {
            continue;
        }
        let regions = graph.regions_mut();
        if !regions[pos].valid || !regions[target_pos].valid {
            continue;
        }
        regions[pos].valid = false;
        regions[target_pos].valid = false;
        pairs.push((id, target));
    }
    pairs
}

/// Every region claims its best neighbor, scanning by increasing id. A region already claimed
/// or claiming in this pass is skipped.
fn select_best<A>(
    graph: &mut Graph<A>,
    best: &[Option<(RegionId, f32)>],
    threshold: f32,
) -> Vec<(RegionId, RegionId)> {
    let mut pairs = Vec::new();
    for pos in 0..graph.len() {
        let id = graph.regions()[pos].id;
        let Some((target, cost)) = best[pos] else {
            continue;
        };
        if cost > threshold || cost.is_nan() {
            continue;
        }
        let Some(target_pos) = graph.position(target) else {
            continue;
        };
        let regions = graph.regions_mut();
        if !regions[pos].valid || !regions[target_pos].valid {
            continue;
        }
        regions[pos].valid = false;
        regions[target_pos].valid = false;
        pairs.push((id.min(target), id.max(target)));
    }
    pairs
}

/// Merges region `b` into region `a`.
///
/// `b` is marked expired and every adjacency of `b` is moved to `a`. All costs involving `a` are
/// marked stale.
pub(crate) fn merge<C: Criterion>(
    graph: &mut Graph<C::Attributes>,
    criterion: &C,
    a: RegionId,
    b: RegionId,
) -> Result<(), Error> {
    let width = graph.width();
    let absorbed_edges = {
        let (survivor, absorbed) = graph.pair_mut(a, b)?;
        let shared = survivor
            .remove_edge(b)
            .ok_or(InvariantViolation::MissingEdge {
                region: a,
                neighbor: b,
            })?;
        criterion.update_attributes(&mut survivor.attributes, &absorbed.attributes);

        let bbox = survivor.bbox.union(&absorbed.bbox);
        survivor.contour =
            merge_contours(&survivor.contour, a, &absorbed.contour, b, &bbox, width)?;
        survivor.bbox = bbox;
        survivor.area += absorbed.area;
        survivor.perimeter = survivor.perimeter + absorbed.perimeter - 2 * shared.boundary;

        absorbed.expired = true;
        absorbed.valid = false;
        std::mem::take(&mut absorbed.edges)
    };

    for edge in absorbed_edges.iter().filter(|edge| edge.target != a) {
        let neighbor_id = edge.target;
        let survivor = graph
            .get_mut(a)
            .ok_or(InvariantViolation::MissingRegion(a))?;
        match survivor.find_edge_mut(neighbor_id) {
            Some(existing) => {
                existing.boundary += edge.boundary;
                existing.cost_fresh = false;
            }
            None => survivor.edges.push(Edge::stale(neighbor_id, edge.boundary)),
        }

        let neighbor = graph
            .get_mut(neighbor_id)
            .ok_or(InvariantViolation::MissingRegion(neighbor_id))?;
        let to_absorbed = neighbor
            .edge_position(b)
            .ok_or(InvariantViolation::MissingEdge {
                region: neighbor_id,
                neighbor: b,
            })?;
        match neighbor.edge_position(a) {
            Some(to_survivor) => {
                neighbor.edges[to_survivor].boundary += edge.boundary;
                neighbor.edges[to_survivor].cost_fresh = false;
                neighbor.edges.remove(to_absorbed);
            }
            None => {
                neighbor.edges[to_absorbed].target = a;
                neighbor.edges[to_absorbed].cost_fresh = false;
            }
        }
    }

    let neighbors: Vec<RegionId> = {
        let survivor = graph
            .get_mut(a)
            .ok_or(InvariantViolation::MissingRegion(a))?;
        survivor
            .edges
            .iter_mut()
            .map(|edge| {
                edge.cost_fresh = false;
                edge.target
            })
            .collect()
    };
    for neighbor_id in neighbors {
        let neighbor = graph
            .get_mut(neighbor_id)
            .ok_or(InvariantViolation::MissingRegion(neighbor_id))?;
        let edge = neighbor
            .find_edge_mut(a)
            .ok_or(InvariantViolation::MissingEdge {
                region: neighbor_id,
                neighbor: a,
            })?;
        edge.cost_fresh = false;
    }
    Ok(())
}
