#![forbid(unsafe_code)]

//! Prerequisite graph for incremental recomputation.
//!
//! # Design
//!
//! [`Graph<T>`] is a multi-root DAG over opaque, comparable nodes. It stores
//! no payload: callers keep their own data keyed by `T` and use the graph
//! only to answer "in which order" and "how far".
//!
//! An edge `prerequisite → dependent` means the dependent reads the
//! prerequisite. A node with no prerequisites is a *source*.
//!
//! ## Storage
//!
//! Nodes live in a slot vector with a free list (slots of removed nodes are
//! recycled). Each slot keeps both adjacency directions as index lists so
//! that forward and reverse walks are O(degree). A hash index maps `T` to
//! its slot.
//!
//! ### Complexity
//!
//! | Operation                | Time      |
//! |--------------------------|-----------|
//! | `add_node`               | O(1) amort. |
//! | `remove_node`            | O(degree²) worst case |
//! | `declare_prerequisite`   | O(V + E) cycle check |
//! | `revoke_prerequisite`    | O(degree) |
//! | `iterate[_from]`         | O(V + E)  |
//! | `process[_from]`         | O(V + E)  |
//!
//! # Cycle Rejection
//!
//! Before committing `p → d`, a DFS over prerequisite edges starting at `p`
//! looks for `d`. If `d` is upstream of `p` the edge would close a loop, so
//! the call returns [`CycleError`] and the graph is left untouched.
//!
//! # Early-Stop Traversal
//!
//! [`Graph::process_from`] visits nodes in dependency order and lets the
//! visitor answer [`Flow::DepthStop`] for a node whose output did not change.
//! A stopped node does not count toward its dependents' readiness. A
//! dependent is visited once all of its in-scope prerequisites are resolved
//! and at least one of them answered [`Flow::Continue`]; if every one of
//! them was stopped (or was itself skipped), the dependent is skipped and
//! the rule recurses. Nodes named in the start set are always visited.

use rustc_hash::FxHashMap;
use std::convert::Infallible;
use std::fmt;
use std::hash::Hash;
use thiserror::Error;

// ============================================================================
// Errors and traversal directives
// ============================================================================

/// Error returned when a declared prerequisite would close a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("prerequisite cycle: {prerequisite} cannot feed {dependent}, which it already depends on")]
pub struct CycleError<T: fmt::Debug> {
    /// The node that was offered as an input.
    pub prerequisite: T,
    /// The node that would have read it.
    pub dependent: T,
}

/// Directive returned by a [`Graph::process_from`] visitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flow {
    /// The node produced new output; dependents may need to run.
    #[default]
    Continue,
    /// The node's output is unchanged; do not propagate through it.
    DepthStop,
}

// ============================================================================
// Graph
// ============================================================================

struct Slot<T> {
    node: T,
    /// Slots this node reads.
    prerequisites: Vec<u32>,
    /// Slots that read this node.
    dependents: Vec<u32>,
}

/// Generic prerequisite DAG.
///
/// # Examples
///
/// ```
/// use cellhive_graph::Graph;
///
/// let mut graph = Graph::new();
/// graph.declare_prerequisite("a", "b").unwrap();
/// graph.declare_prerequisite("b", "c").unwrap();
/// assert_eq!(graph.iterate(), vec!["a", "b", "c"]);
///
/// // Closing the loop is rejected and leaves the graph as it was.
/// assert!(graph.declare_prerequisite("c", "a").is_err());
/// assert_eq!(graph.iterate(), vec!["a", "b", "c"]);
/// ```
pub struct Graph<T> {
    slots: Vec<Option<Slot<T>>>,
    index: FxHashMap<T, u32>,
    free_list: Vec<u32>,
}

impl<T: Clone + Eq + Hash> Graph<T> {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            index: FxHashMap::default(),
            free_list: Vec::new(),
        }
    }

    /// Create a graph with room for `node_cap` nodes.
    #[must_use]
    pub fn with_capacity(node_cap: usize) -> Self {
        Self {
            slots: Vec::with_capacity(node_cap),
            index: FxHashMap::with_capacity_and_hasher(node_cap, Default::default()),
            free_list: Vec::new(),
        }
    }

    // ── Node Management ─────────────────────────────────────────────

    /// Add a node. Returns `false` if it was already present.
    pub fn add_node(&mut self, node: T) -> bool {
        if self.index.contains_key(&node) {
            return false;
        }
        self.ensure(node);
        true
    }

    /// Remove a node and every edge touching it.
    ///
    /// Dependents that lose their last prerequisite become sources.
    /// Removing an absent node is a no-op and returns `false`.
    pub fn remove_node(&mut self, node: &T) -> bool {
        let Some(idx) = self.index.remove(node) else {
            return false;
        };
        let Some(slot) = self.slots[idx as usize].take() else {
            return false;
        };
        for p in slot.prerequisites {
            if let Some(prereq) = self.slots[p as usize].as_mut() {
                prereq.dependents.retain(|&d| d != idx);
            }
        }
        for d in slot.dependents {
            if let Some(dependent) = self.slots[d as usize].as_mut() {
                dependent.prerequisites.retain(|&p| p != idx);
            }
        }
        self.free_list.push(idx);
        true
    }

    /// Whether `node` is part of the graph.
    #[must_use]
    pub fn contains(&self, node: &T) -> bool {
        self.index.contains_key(node)
    }

    /// Number of live nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.index.len()
    }

    /// Number of prerequisite edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.slots
            .iter()
            .flatten()
            .map(|slot| slot.prerequisites.len())
            .sum()
    }

    /// Whether the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    // ── Edges ───────────────────────────────────────────────────────

    /// Declare that `dependent` reads `prerequisite`.
    ///
    /// Either node is added if missing. Declaring an existing edge is a
    /// no-op. If the edge would close a cycle (including a self-loop) the
    /// graph is not modified and a [`CycleError`] is returned.
    pub fn declare_prerequisite(&mut self, prerequisite: T, dependent: T) -> Result<(), CycleError<T>>
    where
        T: fmt::Debug,
    {
        if prerequisite == dependent || self.is_upstream(&dependent, &prerequisite) {
            return Err(CycleError {
                prerequisite,
                dependent,
            });
        }

        let p = self.ensure(prerequisite);
        let d = self.ensure(dependent);
        let Some(dep_slot) = self.slots[d as usize].as_mut() else {
            return Ok(());
        };
        if dep_slot.prerequisites.contains(&p) {
            return Ok(());
        }
        dep_slot.prerequisites.push(p);
        if let Some(prereq_slot) = self.slots[p as usize].as_mut() {
            prereq_slot.dependents.push(d);
        }
        Ok(())
    }

    /// Remove the edge `prerequisite → dependent`. Returns whether it existed.
    pub fn revoke_prerequisite(&mut self, prerequisite: &T, dependent: &T) -> bool {
        let (Some(&p), Some(&d)) = (self.index.get(prerequisite), self.index.get(dependent)) else {
            return false;
        };
        let Some(dep_slot) = self.slots[d as usize].as_mut() else {
            return false;
        };
        let before = dep_slot.prerequisites.len();
        dep_slot.prerequisites.retain(|&i| i != p);
        if dep_slot.prerequisites.len() == before {
            return false;
        }
        if let Some(prereq_slot) = self.slots[p as usize].as_mut() {
            prereq_slot.dependents.retain(|&i| i != d);
        }
        true
    }

    /// Direct prerequisites of `node`, in declaration order.
    pub fn prerequisites<'a>(&'a self, node: &T) -> impl Iterator<Item = &'a T> + use<'a, T> {
        self.neighbours(node, true)
    }

    /// Direct dependents of `node`, in declaration order.
    pub fn dependents<'a>(&'a self, node: &T) -> impl Iterator<Item = &'a T> + use<'a, T> {
        self.neighbours(node, false)
    }

    /// Whether `node` is present and has no prerequisites.
    #[must_use]
    pub fn is_source(&self, node: &T) -> bool {
        self.slot_of(node)
            .is_some_and(|slot| slot.prerequisites.is_empty())
    }

    /// All nodes without prerequisites, in slot order.
    #[must_use]
    pub fn sources(&self) -> Vec<T> {
        self.slots
            .iter()
            .flatten()
            .filter(|slot| slot.prerequisites.is_empty())
            .map(|slot| slot.node.clone())
            .collect()
    }

    // ── Traversal ───────────────────────────────────────────────────

    /// Every node, each after all of its transitive prerequisites.
    #[must_use]
    pub fn iterate(&self) -> Vec<T> {
        let sources = self.sources();
        self.iterate_from(sources)
    }

    /// Every node reachable from `starts`, in dependency order.
    ///
    /// Starts that are reachable from other starts are not treated as
    /// independent roots; they are reached through their prerequisites.
    /// Absent starts are ignored.
    pub fn iterate_from(&self, starts: impl IntoIterator<Item = T>) -> Vec<T> {
        let mut order = Vec::new();
        self.process_from(starts, |node| {
            order.push(node.clone());
            Flow::Continue
        });
        order
    }

    /// The subset of `starts` not reachable from any other start.
    pub fn true_sources(&self, starts: impl IntoIterator<Item = T>) -> Vec<T> {
        let seeds = self.resolve(starts);
        let scope = self.scope(&seeds);
        seeds
            .into_iter()
            .filter(|&i| scope.pending[i as usize] == 0)
            .map(|i| self.node_at(i).clone())
            .collect()
    }

    /// Dependency-ordered traversal of the whole graph with early stop.
    pub fn process(&self, visit: impl FnMut(&T) -> Flow) {
        let sources = self.sources();
        self.process_from(sources, visit);
    }

    /// Dependency-ordered traversal of everything reachable from `starts`
    /// with early stop. See the module docs for the visitation rule.
    pub fn process_from(&self, starts: impl IntoIterator<Item = T>, mut visit: impl FnMut(&T) -> Flow) {
        let result: Result<(), Infallible> = self.try_process_from(starts, |node| Ok(visit(node)));
        match result {
            Ok(()) => {}
            Err(never) => match never {},
        }
    }

    /// Fallible form of [`process`](Self::process).
    pub fn try_process<E>(&self, visit: impl FnMut(&T) -> Result<Flow, E>) -> Result<(), E> {
        let sources = self.sources();
        self.try_process_from(sources, visit)
    }

    /// Fallible form of [`process_from`](Self::process_from). The first
    /// error stops the traversal and is returned.
    pub fn try_process_from<E>(
        &self,
        starts: impl IntoIterator<Item = T>,
        mut visit: impl FnMut(&T) -> Result<Flow, E>,
    ) -> Result<(), E> {
        let seeds = self.resolve(starts);
        if seeds.is_empty() {
            return Ok(());
        }

        let mut requested = vec![false; self.slots.len()];
        for &s in &seeds {
            requested[s as usize] = true;
        }

        let Scope {
            in_scope,
            mut pending,
        } = self.scope(&seeds);
        // Prerequisites that resolved with `Continue`.
        let mut live = vec![0u32; self.slots.len()];

        let mut stack: Vec<u32> = seeds
            .iter()
            .rev()
            .copied()
            .filter(|&s| pending[s as usize] == 0)
            .collect();

        while let Some(idx) = stack.pop() {
            let Some(slot) = self.slots[idx as usize].as_ref() else {
                continue;
            };
            let satisfied = requested[idx as usize] || live[idx as usize] > 0;
            let passes = if satisfied {
                visit(&slot.node)? == Flow::Continue
            } else {
                false
            };

            for &d in &slot.dependents {
                let di = d as usize;
                if !in_scope[di] {
                    continue;
                }
                if passes {
                    live[di] += 1;
                }
                pending[di] -= 1;
                if pending[di] == 0 {
                    stack.push(d);
                }
            }
        }
        Ok(())
    }

    // ── Internals ───────────────────────────────────────────────────

    fn ensure(&mut self, node: T) -> u32 {
        if let Some(&idx) = self.index.get(&node) {
            return idx;
        }
        let slot = Slot {
            node: node.clone(),
            prerequisites: Vec::new(),
            dependents: Vec::new(),
        };
        let idx = if let Some(free) = self.free_list.pop() {
            self.slots[free as usize] = Some(slot);
            free
        } else {
            self.slots.push(Some(slot));
            (self.slots.len() - 1) as u32
        };
        self.index.insert(node, idx);
        idx
    }

    fn slot_of(&self, node: &T) -> Option<&Slot<T>> {
        let &idx = self.index.get(node)?;
        self.slots[idx as usize].as_ref()
    }

    fn node_at(&self, idx: u32) -> &T {
        match &self.slots[idx as usize] {
            Some(slot) => &slot.node,
            None => unreachable!("index points at a vacated slot"),
        }
    }

    fn neighbours<'a>(&'a self, node: &T, upstream: bool) -> impl Iterator<Item = &'a T> + use<'a, T> {
        let indices: Vec<u32> = self
            .slot_of(node)
            .map(|s| {
                if upstream {
                    s.prerequisites.clone()
                } else {
                    s.dependents.clone()
                }
            })
            .unwrap_or_default();
        indices
            .into_iter()
            .filter_map(move |i| self.slots[i as usize].as_ref().map(|s| &s.node))
    }

    /// Whether `target` is reachable from `from` by walking prerequisite
    /// edges (i.e. `from` transitively reads `target`).
    fn is_upstream(&self, target: &T, from: &T) -> bool {
        let (Some(&start), Some(&goal)) = (self.index.get(from), self.index.get(target)) else {
            return false;
        };
        let mut visited = vec![false; self.slots.len()];
        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            if current == goal {
                return true;
            }
            let ci = current as usize;
            if visited[ci] {
                continue;
            }
            visited[ci] = true;
            if let Some(slot) = &self.slots[ci] {
                stack.extend(slot.prerequisites.iter().filter(|&&p| !visited[p as usize]));
            }
        }
        false
    }

    /// Map starts to slot indices, dropping absent nodes and duplicates.
    fn resolve(&self, starts: impl IntoIterator<Item = T>) -> Vec<u32> {
        let mut seen = vec![false; self.slots.len()];
        let mut out = Vec::new();
        for node in starts {
            if let Some(&idx) = self.index.get(&node)
                && !seen[idx as usize]
            {
                seen[idx as usize] = true;
                out.push(idx);
            }
        }
        out
    }

    /// Reachable subgraph from `seeds` plus, for each node in it, the number
    /// of its prerequisites that are also in it.
    fn scope(&self, seeds: &[u32]) -> Scope {
        let mut in_scope = vec![false; self.slots.len()];
        let mut members = Vec::new();
        let mut stack: Vec<u32> = seeds.to_vec();
        while let Some(idx) = stack.pop() {
            if in_scope[idx as usize] {
                continue;
            }
            in_scope[idx as usize] = true;
            members.push(idx);
            if let Some(slot) = &self.slots[idx as usize] {
                stack.extend(slot.dependents.iter().filter(|&&d| !in_scope[d as usize]));
            }
        }

        let mut pending = vec![0u32; self.slots.len()];
        for idx in members {
            if let Some(slot) = &self.slots[idx as usize] {
                pending[idx as usize] = slot
                    .prerequisites
                    .iter()
                    .filter(|&&p| in_scope[p as usize])
                    .count() as u32;
            }
        }
        Scope { in_scope, pending }
    }
}

struct Scope {
    in_scope: Vec<bool>,
    pending: Vec<u32>,
}

impl<T: Clone + Eq + Hash> Default for Graph<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for Graph<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for slot in self.slots.iter().flatten() {
            let prereqs: Vec<&T> = slot
                .prerequisites
                .iter()
                .filter_map(|&p| self.slots[p as usize].as_ref().map(|s| &s.node))
                .collect();
            map.entry(&slot.node, &prereqs);
        }
        map.finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
