//! Bounded, cycle-safe traversal over "up" relations.
//!
//! One breadth-first walk serves both the multi-parent broader expansion and
//! the single-parent hierarchy chain. Every id is resolved at most once per
//! walk: it is marked visited before resolution, whether or not the
//! resolution succeeds, so cycles truncate silently.

use std::collections::HashSet;
use std::thread;

use crossbeam_channel::bounded;

use crate::resource::ResourceId;

/// Bounds for a traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraversalLimits {
    /// Maximum number of hops from the root. `None` walks until the frontier empties.
    pub max_depth: Option<usize>,
    /// Maximum number of neighbors followed per node. `None` follows all.
    pub max_out_degree: Option<usize>,
}

impl TraversalLimits {
    /// Breadth-first walk up to `max_depth` hops, following every neighbor.
    #[must_use]
    pub const fn breadth_first(max_depth: usize) -> Self {
        Self {
            max_depth: Some(max_depth),
            max_out_degree: None,
        }
    }

    /// Single-parent chain walk, bounded only by the visited set.
    #[must_use]
    pub const fn chain() -> Self {
        Self {
            max_depth: None,
            max_out_degree: Some(1),
        }
    }

    fn allows_level(&self, depth: usize) -> bool {
        self.max_depth.map_or(true, |max| depth <= max)
    }
}

/// A node reached by a traversal.
#[derive(Debug, Clone, PartialEq)]
pub struct Visit<V> {
    /// Id of the node.
    pub id: ResourceId,
    /// What the node resolved to.
    pub value: V,
    /// Hops from the root (the root itself is 0).
    pub depth: usize,
}

fn unvisited_neighbors<V, X>(
    neighbors: &mut X,
    value: &V,
    visited: &HashSet<ResourceId>,
    max_out_degree: Option<usize>,
) -> Vec<ResourceId>
where
    X: FnMut(&V) -> Vec<ResourceId>,
{
    neighbors(value)
        .into_iter()
        .filter(|id| !id.is_blank())
        .take(max_out_degree.unwrap_or(usize::MAX))
        .filter(|id| !visited.contains(id))
        .collect()
}

/// Walks from `root` resolving neighbors level by level on the calling thread.
///
/// Returns the root followed by every resolved node in discovery order.
/// Neighbors whose resolution yields `None` are dropped and contribute no
/// further neighbors.
pub fn traverse<V, R, X>(
    root_id: ResourceId,
    root: V,
    limits: TraversalLimits,
    mut resolve: R,
    mut neighbors: X,
) -> Vec<Visit<V>>
where
    R: FnMut(&ResourceId) -> Option<V>,
    X: FnMut(&V) -> Vec<ResourceId>,
{
    let mut visited = HashSet::from([root_id.clone()]);
    let mut frontier = if limits.allows_level(1) {
        unvisited_neighbors(&mut neighbors, &root, &visited, limits.max_out_degree)
    } else {
        Vec::new()
    };
    let mut out = vec![Visit {
        id: root_id,
        value: root,
        depth: 0,
    }];

    let mut depth = 1;
    while !frontier.is_empty() && limits.allows_level(depth) {
        let mut next = Vec::new();
        for id in frontier {
            if !visited.insert(id.clone()) {
                continue;
            }
            let Some(value) = resolve(&id) else {
                tracing::debug!(resource_id = %id, depth, "neighbor did not resolve");
                continue;
            };
            next.extend(unvisited_neighbors(&mut neighbors, &value, &visited, limits.max_out_degree));
            out.push(Visit { id, value, depth });
        }
        frontier = next;
        depth += 1;
    }

    out
}

/// Like [`traverse`], but resolves each level on up to `workers` threads.
///
/// The visited set and result list stay with the calling thread; workers only
/// receive ids over a bounded channel and send back resolved values. Within a
/// level, results are ordered as the level's ids were, so the output matches
/// the sequential walk.
pub fn traverse_parallel<V, R, X>(
    root_id: ResourceId,
    root: V,
    limits: TraversalLimits,
    workers: usize,
    resolve: &R,
    mut neighbors: X,
) -> Vec<Visit<V>>
where
    V: Send,
    R: Fn(&ResourceId) -> Option<V> + Sync,
    X: FnMut(&V) -> Vec<ResourceId>,
{
    if workers <= 1 {
        return traverse(root_id, root, limits, resolve, neighbors);
    }

    let mut visited = HashSet::from([root_id.clone()]);
    let mut frontier = if limits.allows_level(1) {
        unvisited_neighbors(&mut neighbors, &root, &visited, limits.max_out_degree)
    } else {
        Vec::new()
    };
    let mut out = vec![Visit {
        id: root_id,
        value: root,
        depth: 0,
    }];

    let mut depth = 1;
    while !frontier.is_empty() && limits.allows_level(depth) {
        let level: Vec<ResourceId> = frontier
            .into_iter()
            .filter(|id| visited.insert(id.clone()))
            .collect();

        let mut next = Vec::new();
        for (id, resolved) in resolve_level(level, workers, resolve) {
            let Some(value) = resolved else {
                tracing::debug!(resource_id = %id, depth, "neighbor did not resolve");
                continue;
            };
            next.extend(unvisited_neighbors(&mut neighbors, &value, &visited, limits.max_out_degree));
            out.push(Visit { id, value, depth });
        }
        frontier = next;
        depth += 1;
    }

    out
}

fn resolve_level<V, R>(
    level: Vec<ResourceId>,
    workers: usize,
    resolve: &R,
) -> Vec<(ResourceId, Option<V>)>
where
    V: Send,
    R: Fn(&ResourceId) -> Option<V> + Sync,
{
    if level.len() <= 1 {
        return level
            .into_iter()
            .map(|id| {
                let value = resolve(&id);
                (id, value)
            })
            .collect();
    }

    let count = level.len();
    let (job_tx, job_rx) = bounded::<(usize, ResourceId)>(count);
    let (result_tx, result_rx) = bounded::<(usize, ResourceId, Option<V>)>(count);

    for job in level.into_iter().enumerate() {
        // Capacity equals the job count, so this never blocks.
        let _ = job_tx.send(job);
    }
    drop(job_tx);

    let mut results: Vec<(usize, ResourceId, Option<V>)> = thread::scope(|scope| {
        for _ in 0..workers.min(count) {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            scope.spawn(move || {
                while let Ok((idx, id)) = job_rx.recv() {
                    let value = resolve(&id);
                    if result_tx.send((idx, id, value)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(result_tx);
        result_rx.iter().collect()
    });

    results.sort_by_key(|(idx, _, _)| *idx);
    results.into_iter().map(|(_, id, value)| (id, value)).collect()
}
