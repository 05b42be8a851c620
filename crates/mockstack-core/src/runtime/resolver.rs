// crates/mockstack-core/src/runtime/resolver.rs
// ============================================================================
// Module: Mockstack Dependency Resolver
// Description: Topological ordering of requested mocks and their dependencies.
// Purpose: Produce a deterministic initialization order or a minimal cycle.
// Dependencies: crate::core, crate::runtime::registry, thiserror
// ============================================================================

//! ## Overview
//! Resolution is a pure read of the registry. It builds a throwaway graph of
//! the requested mocks plus their transitive dependency closure, then runs
//! Kahn's algorithm. Whenever several mocks are ready at once, the earliest
//! registered goes first, so identical registry state always yields the same
//! order.
//!
//! If nodes remain once no node is ready, they contain at least one cycle. The
//! resolver reports the shortest one, rotated to start at its
//! earliest-registered member. It never returns a partial order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::VecDeque;

use thiserror::Error;

use crate::core::MockEntry;
use crate::core::MockName;
use crate::runtime::registry::MockRegistry;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Dependency resolution errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    /// A requested mock or one of its dependencies is not registered.
    #[error("mock `{name}` is not registered{}", render_chain(.chain))]
    MissingDependency {
        /// Missing mock.
        name: MockName,
        /// Path from a requested mock to the mock declaring `name`.
        chain: Vec<MockName>,
    },
    /// The dependency graph contains a cycle.
    #[error("dependency cycle: {}", render_cycle(.cycle))]
    Cycle {
        /// Shortest cycle, starting at its earliest-registered member.
        cycle: Vec<MockName>,
    },
}

impl ResolutionError {
    /// Returns a stable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MissingDependency {
                ..
            } => "missing_dependency",
            Self::Cycle {
                ..
            } => "dependency_cycle",
        }
    }
}

/// Renders the dependency chain suffix of a missing-dependency message.
fn render_chain(chain: &[MockName]) -> String {
    if chain.is_empty() {
        return String::new();
    }
    let path: Vec<&str> = chain.iter().map(MockName::as_str).collect();
    format!(" (required via {})", path.join(" -> "))
}

/// Renders a cycle as `a -> b -> a`.
fn render_cycle(cycle: &[MockName]) -> String {
    let mut path: Vec<&str> = cycle.iter().map(MockName::as_str).collect();
    if let Some(first) = path.first().copied() {
        path.push(first);
    }
    path.join(" -> ")
}

// ============================================================================
// SECTION: Resolved Order
// ============================================================================

/// Initialization order with the entries it was computed from.
///
/// # Invariants
/// - Every entry appears after all of its dependencies.
/// - Entries are snapshots; later registry changes do not affect them.
/// - `revisions[i]` is the registry revision `entries[i]` was read at.
#[derive(Debug, Clone, Default)]
pub struct ResolvedOrder {
    /// Entries in initialization order.
    entries: Vec<MockEntry>,
    /// Registry revision of each entry.
    revisions: Vec<u64>,
}

impl ResolvedOrder {
    /// Returns entries in initialization order.
    #[must_use]
    pub fn entries(&self) -> &[MockEntry] {
        &self.entries
    }

    /// Returns the registry revision of each entry, parallel to [`Self::entries`].
    #[must_use]
    pub fn revisions(&self) -> &[u64] {
        &self.revisions
    }

    /// Returns mock names in initialization order.
    #[must_use]
    pub fn names(&self) -> Vec<MockName> {
        self.entries.iter().map(|entry| entry.name.clone()).collect()
    }

    /// Returns the ordered entry with the given name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&MockEntry> {
        self.entries.iter().find(|entry| entry.name.as_str() == name)
    }

    /// Returns the number of ordered entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when the order is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// SECTION: Resolution
// ============================================================================

/// Node in the transient dependency graph.
struct Node<'a> {
    /// Registry entry.
    entry: &'a MockEntry,
    /// Registry insertion sequence.
    sequence: u64,
    /// Registry revision of the entry.
    revision: u64,
}

/// Resolves `requested` plus transitive dependencies into initialization order.
///
/// # Errors
///
/// Returns [`ResolutionError::MissingDependency`] when any mock in the
/// closure is not registered and [`ResolutionError::Cycle`] when the closure
/// is cyclic.
pub fn resolve<'n, I>(
    requested: I,
    registry: &MockRegistry,
) -> Result<ResolvedOrder, ResolutionError>
where
    I: IntoIterator<Item = &'n MockName>,
{
    let nodes = collect_closure(requested, registry)?;

    let mut remaining: BTreeMap<&MockName, usize> =
        nodes.iter().map(|(name, node)| (*name, node.entry.declared_dependencies.len())).collect();
    let mut dependents: BTreeMap<&MockName, Vec<&MockName>> = BTreeMap::new();
    for (name, node) in &nodes {
        for dependency in node.entry.dependency_names() {
            dependents.entry(dependency).or_default().push(*name);
        }
    }

    let mut ready: BTreeSet<(u64, &MockName)> = remaining
        .iter()
        .filter(|(_, count)| **count == 0)
        .filter_map(|(name, _)| nodes.get(*name).map(|node| (node.sequence, *name)))
        .collect();
    let mut ordered = Vec::with_capacity(nodes.len());
    let mut revisions = Vec::with_capacity(nodes.len());
    while let Some((_, name)) = ready.pop_first() {
        remaining.remove(name);
        if let Some(node) = nodes.get(name) {
            ordered.push(node.entry.clone());
            revisions.push(node.revision);
        }
        for dependent in dependents.get(name).into_iter().flatten() {
            if let Some(count) = remaining.get_mut(*dependent) {
                *count = count.saturating_sub(1);
                if *count == 0
                    && let Some(node) = nodes.get(*dependent)
                {
                    ready.insert((node.sequence, *dependent));
                }
            }
        }
    }

    if remaining.is_empty() {
        return Ok(ResolvedOrder {
            entries: ordered,
            revisions,
        });
    }
    let leftover: BTreeSet<&MockName> = remaining.keys().copied().collect();
    Err(ResolutionError::Cycle {
        cycle: minimal_cycle(&nodes, &leftover),
    })
}

/// Collects the requested mocks and their transitive dependencies.
fn collect_closure<'r, 'n, I>(
    requested: I,
    registry: &'r MockRegistry,
) -> Result<BTreeMap<&'r MockName, Node<'r>>, ResolutionError>
where
    I: IntoIterator<Item = &'n MockName>,
{
    let mut nodes: BTreeMap<&MockName, Node<'_>> = BTreeMap::new();
    let mut parents: BTreeMap<MockName, MockName> = BTreeMap::new();
    let mut pending: VecDeque<MockName> = requested.into_iter().cloned().collect();
    while let Some(name) = pending.pop_front() {
        if nodes.contains_key(&name) {
            continue;
        }
        let Some(registered) = registry.snapshot(name.as_str()) else {
            let chain = chain_to(&parents, &name);
            return Err(ResolutionError::MissingDependency {
                name,
                chain,
            });
        };
        let entry = &registered.entry;
        for dependency in entry.dependency_names() {
            if !nodes.contains_key(dependency) && !parents.contains_key(dependency) {
                parents.insert(dependency.clone(), name.clone());
            }
            pending.push_back(dependency.clone());
        }
        nodes.insert(
            &entry.name,
            Node {
                entry,
                sequence: registered.sequence,
                revision: registered.revision,
            },
        );
    }
    Ok(nodes)
}

/// Rebuilds the path from a requested mock to the mock that declared `name`.
fn chain_to(parents: &BTreeMap<MockName, MockName>, name: &MockName) -> Vec<MockName> {
    let mut chain = Vec::new();
    let mut cursor = parents.get(name);
    while let Some(parent) = cursor {
        if chain.contains(parent) {
            break;
        }
        chain.push(parent.clone());
        cursor = parents.get(parent);
    }
    chain.reverse();
    chain
}

// ============================================================================
// SECTION: Cycle Search
// ============================================================================

/// Finds the shortest cycle among `leftover`, rotated to its earliest member.
fn minimal_cycle(
    nodes: &BTreeMap<&MockName, Node<'_>>,
    leftover: &BTreeSet<&MockName>,
) -> Vec<MockName> {
    let sequence_of = |name: &MockName| nodes.get(name).map_or(u64::MAX, |node| node.sequence);
    let mut starts: Vec<&MockName> = leftover.iter().copied().collect();
    starts.sort_by_key(|name| sequence_of(*name));

    let mut best: Option<Vec<&MockName>> = None;
    for start in starts {
        let Some(cycle) = shortest_cycle_through(start, nodes, leftover, &sequence_of) else {
            continue;
        };
        if best.as_ref().is_none_or(|current| cycle.len() < current.len()) {
            best = Some(cycle);
        }
    }

    let mut cycle = best.unwrap_or_default();
    if let Some(pivot) = cycle
        .iter()
        .enumerate()
        .min_by_key(|(_, name)| sequence_of(**name))
        .map(|(index, _)| index)
    {
        cycle.rotate_left(pivot);
    }
    cycle.into_iter().cloned().collect()
}

/// Breadth-first search for the shortest path from `start` back to itself.
fn shortest_cycle_through<'a>(
    start: &'a MockName,
    nodes: &BTreeMap<&'a MockName, Node<'a>>,
    leftover: &BTreeSet<&'a MockName>,
    sequence_of: &dyn Fn(&MockName) -> u64,
) -> Option<Vec<&'a MockName>> {
    let mut previous: BTreeMap<&MockName, &MockName> = BTreeMap::new();
    let mut queue: VecDeque<&MockName> = VecDeque::from([start]);
    while let Some(current) = queue.pop_front() {
        let mut neighbors: Vec<&MockName> = nodes
            .get(current)
            .into_iter()
            .flat_map(|node| node.entry.dependency_names())
            .filter_map(|dependency| leftover.get(dependency).copied())
            .collect();
        neighbors.sort_by_key(|name| sequence_of(*name));
        for next in neighbors {
            if next == start {
                let mut path = vec![current];
                let mut cursor = current;
                while let Some(&prior) = previous.get(cursor) {
                    path.push(prior);
                    cursor = prior;
                }
                path.reverse();
                return Some(path);
            }
            if !previous.contains_key(next) {
                previous.insert(next, current);
                queue.push_back(next);
            }
        }
    }
    None
}
