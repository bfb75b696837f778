//! The orchestrator: owns the region tree, the prerequisite graph, and the
//! root viewport, and runs incremental layout passes.
//!
//! # Design
//!
//! Every coordinate registered with the hive has its `invalidated` and
//! `prerequisites_changed` notifications routed into a shared
//! [`PendingWork`] set. [`Hive::layout`] drains that set:
//!
//! 1. Coordinates that are new or whose prerequisites changed get their
//!    graph edges re-synchronised with their recipe's prerequisite list.
//! 2. New and invalidated coordinates form the starting set.
//! 3. The graph walks everything downstream in dependency order; a
//!    coordinate whose relative value did not change stops propagation.
//!
//! # Failure Modes
//!
//! A failing `calculate()` or a rejected edge aborts the pass. Values
//! already stored in that pass stay; the drained work is put back so the
//! next pass retries it.
//!
//! # Fallback
//!
//! `CELLHIVE_FULL_LAYOUT=1` (or [`HiveConfig::force_full_layout`]) makes
//! every registered coordinate a start on every pass.

use crate::cell::CellTree;
use crate::coordinate::Coordinate;
use crate::entity::{Entities, EntityStore};
use crate::error::{LayoutError, Result};
use crate::length::{Constant, LengthRef, length};
use crate::recipe::{CellBuilder, CellRecipe};
use crate::signal::Subscription;
use crate::{CellId, CoordinateId};
use cellhive_graph::{Flow, Graph};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, field, info_span, trace, warn};

// ============================================================================
// HiveConfig
// ============================================================================

/// Construction-time settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HiveConfig {
    /// Initial root width.
    pub viewport_width: f64,
    /// Initial root height.
    pub viewport_height: f64,
    /// Seed every pass with every registered coordinate.
    pub force_full_layout: bool,
}

impl HiveConfig {
    /// Defaults, with `force_full_layout` taken from `CELLHIVE_FULL_LAYOUT`.
    #[must_use]
    pub fn from_env() -> Self {
        let force = std::env::var("CELLHIVE_FULL_LAYOUT")
            .map(|v| parse_flag(&v))
            .unwrap_or(false);
        Self {
            force_full_layout: force,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_viewport(mut self, width: f64, height: f64) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

// ============================================================================
// LayoutStats
// ============================================================================

/// Counters for one [`Hive::layout`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutStats {
    /// Size of the starting set.
    pub seeded: usize,
    /// `calculate()` invocations.
    pub calculated: usize,
    /// Calculations that left the relative value unchanged.
    pub stopped: usize,
    /// Coordinates whose graph edges were re-synchronised.
    pub rewired: usize,
}

impl LayoutStats {
    /// Share of calculations that stopped propagation (0.0 – 1.0).
    #[must_use]
    pub fn stop_rate(&self) -> f64 {
        if self.calculated == 0 {
            0.0
        } else {
            self.stopped as f64 / self.calculated as f64
        }
    }
}

// ============================================================================
// Pending work
// ============================================================================

/// Work collected from notifications between passes.
#[derive(Debug, Default)]
struct PendingWork {
    fresh: BTreeSet<CoordinateId>,
    invalidated: BTreeSet<CoordinateId>,
    rewired: BTreeSet<CoordinateId>,
}

impl PendingWork {
    fn is_empty(&self) -> bool {
        self.fresh.is_empty() && self.invalidated.is_empty() && self.rewired.is_empty()
    }

    fn merge(&mut self, other: PendingWork) {
        self.fresh.extend(other.fresh);
        self.invalidated.extend(other.invalidated);
        self.rewired.extend(other.rewired);
    }
}

// ============================================================================
// Hive
// ============================================================================

/// Root of a layout: region tree, prerequisite graph and viewport.
pub struct Hive {
    tree: CellTree,
    root: CellId,
    /// X.Alpha, X.Beta, Y.Alpha, Y.Beta of the root.
    viewport: [Rc<Constant>; 4],
    registry: Vec<CoordinateId>,
    graph: Graph<CoordinateId>,
    pending: Rc<RefCell<PendingWork>>,
    subscriptions: Vec<Subscription>,
    store: Box<dyn EntityStore>,
    config: HiveConfig,
    stats: LayoutStats,
}

impl Hive {
    /// A hive with a 0×0 viewport and an in-memory entity store.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(HiveConfig::default())
    }

    #[must_use]
    pub fn with_config(config: HiveConfig) -> Self {
        Self::with_store(config, Box::new(Entities::new()))
    }

    /// A hive registering its regions in `store`.
    #[must_use]
    pub fn with_store(config: HiveConfig, store: Box<dyn EntityStore>) -> Self {
        let viewport = [
            length(0.0),
            length(config.viewport_width),
            length(0.0),
            length(config.viewport_height),
        ];
        let mut tree = CellTree::new();
        let root = tree.create_root(viewport.clone().map(|l| l as LengthRef));
        let named = tree.set_debug_name(root, Some("root".to_string()));
        debug_assert!(named.is_ok(), "root was just created");

        let mut hive = Self {
            tree,
            root,
            viewport,
            registry: Vec::new(),
            graph: Graph::new(),
            pending: Rc::new(RefCell::new(PendingWork::default())),
            subscriptions: Vec::new(),
            store,
            config,
            stats: LayoutStats::default(),
        };
        hive.register(root);
        hive
    }

    // ── Accessors ───────────────────────────────────────────────────

    #[must_use]
    pub fn root(&self) -> CellId {
        self.root
    }

    #[must_use]
    pub fn tree(&self) -> &CellTree {
        &self.tree
    }

    /// Structural edits go through here; the hive still sees every
    /// notification from registered coordinates. Cells created directly on
    /// the tree are not registered.
    pub fn tree_mut(&mut self) -> &mut CellTree {
        &mut self.tree
    }

    #[must_use]
    pub fn coordinate(&self, id: CoordinateId) -> Option<&Coordinate> {
        self.tree.coordinate(id)
    }

    #[must_use]
    pub fn graph(&self) -> &Graph<CoordinateId> {
        &self.graph
    }

    /// Every registered coordinate, in registration order.
    #[must_use]
    pub fn coordinates(&self) -> &[CoordinateId] {
        &self.registry
    }

    #[must_use]
    pub fn entities(&self) -> &dyn EntityStore {
        self.store.as_ref()
    }

    #[must_use]
    pub fn config(&self) -> &HiveConfig {
        &self.config
    }

    /// Counters of the most recent successful pass.
    #[must_use]
    pub fn last_stats(&self) -> LayoutStats {
        self.stats
    }

    /// Whether anything is waiting for the next pass.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        !self.pending.borrow().is_empty()
    }

    // ── Viewport ────────────────────────────────────────────────────

    #[must_use]
    pub fn viewport_size(&self) -> (f64, f64) {
        (self.viewport[1].get(), self.viewport[3].get())
    }

    /// Resize the root. The root's lengths are edited in place and
    /// invalidate themselves when the value actually changes.
    pub fn set_viewport_size(&mut self, width: f64, height: f64) {
        self.viewport[1].set(width);
        self.viewport[3].set(height);
    }

    // ── Regions ─────────────────────────────────────────────────────

    /// Build a recipe with `build` and create the region it describes.
    pub fn new_region(
        &mut self,
        build: impl FnOnce(CellBuilder) -> Result<CellRecipe>,
    ) -> Result<CellId> {
        let recipe = build(CellBuilder::new())?;
        self.spawn(recipe)
    }

    /// Create a region from a finished recipe.
    ///
    /// The recipe's lengths are wired in as is. The region is attached
    /// under its requested parent (the root when none is given), stored as
    /// one entity together with its extra components, and registered for
    /// layout. Placement is validated before anything is created.
    pub fn spawn(&mut self, recipe: CellRecipe) -> Result<CellId> {
        let parent = recipe.parent.unwrap_or(self.root);
        let len = self
            .tree
            .cell(parent)
            .ok_or(LayoutError::UnknownCell(parent))?
            .children()
            .len();
        if let Some(index) = recipe.insertion_index
            && index > len
        {
            return Err(LayoutError::IndexOutOfBounds { parent, index, len });
        }

        let lengths = recipe.lengths();
        let cell = self.tree.create_cell(lengths);
        match recipe.insertion_index {
            Some(index) => self.tree.insert_child(parent, cell, index)?,
            None => self.tree.append_child(parent, cell)?,
        }

        let mut components: Vec<Box<dyn Any>> = Vec::with_capacity(recipe.extra_components.len() + 1);
        components.push(Box::new(cell));
        components.extend(recipe.extra_components);
        let entity = self.store.add_entity(components);
        self.tree.set_entity(cell, entity)?;

        self.register(cell);
        debug!(target: "cellhive.layout", %cell, %parent, %entity, "region created");
        Ok(cell)
    }

    fn register(&mut self, cell: CellId) {
        let Some(node) = self.tree.cell(cell) else {
            return;
        };
        for coordinate in node.coordinates() {
            let id = coordinate.id();

            let pending = Rc::clone(&self.pending);
            self.subscriptions
                .push(coordinate.invalidated().subscribe(move |()| {
                    pending.borrow_mut().invalidated.insert(id);
                }));

            let pending = Rc::clone(&self.pending);
            self.subscriptions
                .push(coordinate.prerequisites_changed().subscribe(move |_| {
                    pending.borrow_mut().rewired.insert(id);
                }));

            self.registry.push(id);
            self.pending.borrow_mut().fresh.insert(id);
        }
    }

    // ── Layout ──────────────────────────────────────────────────────

    /// Run one incremental pass.
    ///
    /// Each coordinate is calculated at most once, after all of its
    /// prerequisites that are calculated in the same pass.
    pub fn layout(&mut self) -> Result<LayoutStats> {
        let span = info_span!(
            "hive.layout",
            seeded = field::Empty,
            calculated = field::Empty,
            stopped = field::Empty,
        );
        let _guard = span.enter();

        let work = std::mem::take(&mut *self.pending.borrow_mut());
        match self.run(&work) {
            Ok(stats) => {
                span.record("seeded", stats.seeded);
                span.record("calculated", stats.calculated);
                span.record("stopped", stats.stopped);
                self.stats = stats;
                Ok(stats)
            }
            Err(err) => {
                warn!(target: "cellhive.layout", error = %err, "layout pass aborted");
                self.pending.borrow_mut().merge(work);
                Err(err)
            }
        }
    }

    fn run(&mut self, work: &PendingWork) -> Result<LayoutStats> {
        let mut stats = LayoutStats::default();

        for &id in &work.fresh {
            self.graph.add_node(id);
        }
        for &id in work.fresh.union(&work.rewired) {
            self.rewire(id)?;
            stats.rewired += 1;
        }

        let starts: Vec<CoordinateId> = if self.config.force_full_layout {
            self.registry.clone()
        } else {
            work.fresh.union(&work.invalidated).copied().collect()
        };
        stats.seeded = starts.len();

        let tree = &mut self.tree;
        self.graph.try_process_from(starts, |&id| -> Result<Flow> {
            let before = tree.relative_value(id);
            let after = tree.calculate(id)?;
            stats.calculated += 1;
            trace!(target: "cellhive.layout", coordinate = %id, ?before, ?after, "calculated");
            if before == after {
                stats.stopped += 1;
                Ok(Flow::DepthStop)
            } else {
                Ok(Flow::Continue)
            }
        })?;
        Ok(stats)
    }

    /// Make `id`'s incoming edges match its recipe's prerequisites.
    fn rewire(&mut self, id: CoordinateId) -> Result<()> {
        let wanted = self
            .tree
            .coordinate(id)
            .ok_or(LayoutError::UnknownCell(id.cell))?
            .recipe()
            .prerequisites();
        let stale: Vec<CoordinateId> = self
            .graph
            .prerequisites(&id)
            .filter(|p| !wanted.contains(p))
            .copied()
            .collect();
        for prerequisite in &stale {
            self.graph.revoke_prerequisite(prerequisite, &id);
        }
        for &prerequisite in &wanted {
            if let Err(cycle) = self.graph.declare_prerequisite(prerequisite, id) {
                warn!(
                    target: "cellhive.layout",
                    prerequisite = %cycle.prerequisite,
                    dependent = %cycle.dependent,
                    "rejected cyclic prerequisite"
                );
                return Err(cycle.into());
            }
        }
        debug!(
            target: "cellhive.layout",
            coordinate = %id,
            prerequisites = wanted.len(),
            revoked = stale.len(),
            "rewired"
        );
        Ok(())
    }
}

impl Default for Hive {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Hive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hive")
            .field("root", &self.root)
            .field("cells", &self.tree.len())
            .field("coordinates", &self.registry.len())
            .field("graph", &self.graph)
            .field("config", &self.config)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::length::{AncestorSpan, Binary, ChildrenMax, Fallback, Sibling};
    use crate::{Axis, Edge};
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::layer::SubscriberExt;

    fn x(cell: CellId, edge: Edge) -> CoordinateId {
        cell.coordinate(Axis::X, edge)
    }

    fn abs(hive: &Hive, id: CoordinateId) -> Option<f64> {
        hive.tree().absolute_value(id)
    }

    /// A child of the root spanning `[left, left + width]` on both axes.
    fn boxed(hive: &mut Hive, left: f64, width: f64) -> CellId {
        hive.new_region(|b| {
            b.x(length(left), Binary::add(length(left), length(width)))
                .y(length(left), Binary::add(length(left), length(width)))
                .finish()
        })
        .unwrap()
    }

    #[test]
    fn first_pass_computes_root() {
        let mut hive = Hive::with_config(HiveConfig::default().with_viewport(800.0, 600.0));
        let stats = hive.layout().unwrap();
        assert_eq!(stats.seeded, 4);
        assert_eq!(stats.calculated, 4);
        assert_eq!(stats.rewired, 4);
        let root = hive.tree().cell(hive.root()).unwrap();
        assert_eq!(root.x_boundary().absolute_range(), Some((0.0, 800.0)));
        assert_eq!(root.y_boundary().absolute_range(), Some((0.0, 600.0)));
        assert_eq!(root.debug_name(), Some("root"));
    }

    #[test]
    fn second_pass_is_idle() {
        let mut hive = Hive::new();
        boxed(&mut hive, 10.0, 20.0);
        hive.layout().unwrap();
        assert!(!hive.is_dirty());
        assert_eq!(hive.layout().unwrap(), LayoutStats::default());
    }

    #[test]
    fn new_region_registers_entity_and_coordinates() {
        let mut hive = Hive::new();
        let cell = hive
            .new_region(|b| {
                b.x(length(0.0), length(1.0))
                    .y(length(0.0), length(1.0))
                    .with_component("payload")
                    .finish()
            })
            .unwrap();

        let entity = hive.tree().cell(cell).unwrap().entity_id().unwrap();
        assert_eq!(hive.entities().component::<CellId>(entity), Some(&cell));
        assert_eq!(
            hive.entities().component::<&str>(entity),
            Some(&"payload")
        );
        assert_eq!(hive.coordinates().len(), 8);
        assert_eq!(&hive.coordinates()[4..], &cell.coordinates());
        assert_eq!(hive.tree().parent(cell), Some(hive.root()));
    }

    #[test]
    fn placement_is_checked_before_creation() {
        let mut hive = Hive::new();
        let err = hive
            .new_region(|b| {
                b.x(length(0.0), length(1.0))
                    .y(length(0.0), length(1.0))
                    .at(3)
                    .finish()
            })
            .unwrap_err();
        let root = hive.root();
        assert_eq!(
            err,
            LayoutError::IndexOutOfBounds {
                parent: root,
                index: 3,
                len: 0
            }
        );
        assert_eq!(hive.tree().len(), 1);

        let ghost = CellId::from_raw(42);
        let err = hive
            .new_region(|b| {
                b.x(length(0.0), length(1.0))
                    .y(length(0.0), length(1.0))
                    .child_of(ghost)
                    .finish()
            })
            .unwrap_err();
        assert_eq!(err, LayoutError::UnknownCell(ghost));

        let err = hive.new_region(CellBuilder::finish).unwrap_err();
        assert_eq!(err, LayoutError::IncompleteRecipe("x boundary"));
        assert_eq!(hive.coordinates().len(), 4);
    }

    #[test]
    fn insertion_index_is_honoured() {
        let mut hive = Hive::new();
        let a = boxed(&mut hive, 0.0, 1.0);
        let b = boxed(&mut hive, 0.0, 1.0);
        let c = hive
            .new_region(|builder| {
                builder
                    .x(length(0.0), length(1.0))
                    .y(length(0.0), length(1.0))
                    .at(1)
                    .finish()
            })
            .unwrap();
        assert_eq!(hive.tree().children(hive.root()), &[a, c, b]);
    }

    #[test]
    fn viewport_change_reaches_percent_children() {
        let mut hive = Hive::with_config(HiveConfig::default().with_viewport(200.0, 100.0));
        let half = hive
            .new_region(|b| {
                b.x(length(0.0), Rc::new(AncestorSpan::percent(50.0)))
                    .y(length(0.0), Rc::new(AncestorSpan::parent()))
                    .finish()
            })
            .unwrap();
        hive.layout().unwrap();
        assert_eq!(abs(&hive, x(half, Edge::Beta)), Some(100.0));

        hive.set_viewport_size(400.0, 100.0);
        assert_eq!(hive.viewport_size(), (400.0, 100.0));
        let stats = hive.layout().unwrap();
        assert_eq!(abs(&hive, x(half, Edge::Beta)), Some(200.0));
        // Root X.Beta and the child's X.Beta; height did not change.
        assert_eq!(stats.seeded, 1);
        assert_eq!(stats.calculated, 2);
    }

    #[test]
    fn unchanged_value_stops_propagation() {
        let mut hive = Hive::with_config(HiveConfig::default().with_viewport(100.0, 100.0));
        let fixed = length(30.0);
        let parent = hive
            .new_region(|b| {
                b.x(length(0.0), Rc::new(Fallback::new(fixed.clone(), length(0.0))))
                    .y(length(0.0), length(10.0))
                    .finish()
            })
            .unwrap();
        let child = hive
            .new_region(|b| {
                b.x(length(0.0), Rc::new(AncestorSpan::parent()))
                    .y(length(0.0), length(10.0))
                    .child_of(parent)
                    .finish()
            })
            .unwrap();
        hive.layout().unwrap();
        assert_eq!(abs(&hive, x(child, Edge::Beta)), Some(30.0));

        // Invalidate without changing the output: the fallback's operand is
        // touched twice and ends where it started.
        fixed.set(31.0);
        fixed.set(30.0);
        let stats = hive.layout().unwrap();
        assert_eq!(stats.calculated, 1);
        assert_eq!(stats.stopped, 1);
        assert_eq!(stats.stop_rate(), 1.0);
    }

    #[test]
    fn children_max_grows_parent() {
        let mut hive = Hive::new();
        let parent = hive
            .new_region(|b| {
                b.x(length(0.0), Rc::new(Fallback::new(Rc::new(ChildrenMax::new()), length(0.0))))
                    .y(length(0.0), length(1.0))
                    .finish()
            })
            .unwrap();
        hive.layout().unwrap();
        assert_eq!(abs(&hive, x(parent, Edge::Beta)), Some(0.0));

        let width = length(25.0);
        hive.new_region(|b| {
            b.x(length(0.0), width.clone())
                .y(length(0.0), length(1.0))
                .child_of(parent)
                .finish()
        })
        .unwrap();
        hive.layout().unwrap();
        assert_eq!(abs(&hive, x(parent, Edge::Beta)), Some(25.0));

        width.set(60.0);
        hive.layout().unwrap();
        assert_eq!(abs(&hive, x(parent, Edge::Beta)), Some(60.0));
    }

    #[test]
    fn force_full_layout_seeds_everything() {
        let config = HiveConfig {
            force_full_layout: true,
            ..HiveConfig::default()
        };
        let mut hive = Hive::with_config(config);
        boxed(&mut hive, 0.0, 5.0);
        hive.layout().unwrap();
        let stats = hive.layout().unwrap();
        assert_eq!(stats.seeded, 8);
        assert_eq!(stats.calculated, 8);
        assert_eq!(stats.stopped, 8);
    }

    #[test]
    fn failed_pass_is_retried() {
        let mut hive = Hive::new();
        let parent = boxed(&mut hive, 0.0, 10.0);
        hive.layout().unwrap();
        let strict = hive
            .new_region(|b| {
                b.x(Rc::new(crate::length::Sibling::after(Edge::Beta)), length(5.0))
                    .y(length(0.0), length(1.0))
                    .child_of(parent)
                    .finish()
            })
            .unwrap();
        assert!(matches!(
            hive.layout(),
            Err(LayoutError::NoPreviousPeer { .. })
        ));
        assert!(hive.is_dirty());
        assert!(hive.layout().is_err());

        hive.tree_mut()
            .set_recipe(x(strict, Edge::Alpha), length(2.0))
            .unwrap();
        hive.layout().unwrap();
        assert_eq!(abs(&hive, x(strict, Edge::Alpha)), Some(2.0));
    }

    #[test]
    fn failed_pass_keeps_values_already_stored() {
        let mut hive = Hive::new();
        let width = length(10.0);
        let parent = hive
            .new_region(|b| {
                b.x(length(0.0), width.clone())
                    .y(length(0.0), length(10.0))
                    .finish()
            })
            .unwrap();
        hive.layout().unwrap();

        // Reads the parent's span, so it runs after the parent's Beta edge.
        width.set(40.0);
        let strict = hive
            .new_region(|b| {
                b.x(
                    length(0.0),
                    Binary::add(
                        Rc::new(AncestorSpan::parent()),
                        Rc::new(Sibling::after(Edge::Beta)),
                    ),
                )
                .y(length(0.0), length(1.0))
                .child_of(parent)
                .finish()
            })
            .unwrap();

        assert_eq!(
            hive.layout(),
            Err(LayoutError::NoPreviousPeer {
                owner: Some(x(strict, Edge::Beta))
            })
        );
        assert_eq!(hive.tree().relative_value(x(parent, Edge::Beta)), Some(40.0));
        assert_eq!(abs(&hive, x(parent, Edge::Beta)), Some(40.0));
        assert_eq!(hive.tree().relative_value(x(strict, Edge::Beta)), None);
        assert!(hive.is_dirty());

        hive.tree_mut()
            .set_recipe(x(strict, Edge::Beta), Rc::new(AncestorSpan::parent()))
            .unwrap();
        hive.layout().unwrap();
        assert_eq!(abs(&hive, x(strict, Edge::Beta)), Some(40.0));
        assert!(!hive.is_dirty());
    }

    #[test]
    fn root_cannot_be_moved_under_a_region() {
        let mut hive = Hive::with_config(HiveConfig::default().with_viewport(300.0, 200.0));
        let region = boxed(&mut hive, 5.0, 10.0);
        let root = hive.root();
        hive.tree_mut().remove_child(root, region).unwrap();
        assert_eq!(
            hive.tree_mut().append_child(region, root),
            Err(LayoutError::PinnedRoot {
                parent: region,
                child: root
            })
        );

        hive.layout().unwrap();
        let cell = hive.tree().cell(root).unwrap();
        assert_eq!(cell.x_boundary().absolute_range(), Some((0.0, 300.0)));
        assert_eq!(cell.y_boundary().absolute_range(), Some((0.0, 200.0)));
        assert_eq!(hive.tree().parent(root), None);
    }

    #[test]
    fn config_round_trips_through_serde() {
        let config: HiveConfig =
            serde_json::from_str(r#"{"viewport_width": 10.0, "force_full_layout": true}"#).unwrap();
        assert_eq!(config.viewport_width, 10.0);
        assert_eq!(config.viewport_height, 0.0);
        assert!(config.force_full_layout);
    }

    #[test]
    fn parse_env_values() {
        assert!(parse_flag("1"));
        assert!(parse_flag("true"));
        assert!(parse_flag("YES"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("no"));
        assert!(!parse_flag(""));
    }

    #[test]
    fn from_env_keeps_default_viewport() {
        let config = HiveConfig::from_env();
        assert_eq!(config.viewport_width, 0.0);
        assert_eq!(config.viewport_height, 0.0);
    }

    // ── Tracing ─────────────────────────────────────────────────────

    #[derive(Clone, Default)]
    struct Capture {
        spans: Arc<Mutex<Vec<String>>>,
        messages: Arc<Mutex<Vec<(tracing::Level, String)>>>,
    }

    struct MessageVisitor(Option<String>);

    impl tracing::field::Visit for MessageVisitor {
        fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
            if field.name() == "message" {
                self.0 = Some(format!("{value:?}"));
            }
        }
    }

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for Capture {
        fn on_new_span(
            &self,
            attrs: &tracing::span::Attributes<'_>,
            _id: &tracing::span::Id,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            self.spans
                .lock()
                .unwrap()
                .push(attrs.metadata().name().to_string());
        }

        fn on_event(
            &self,
            event: &tracing::Event<'_>,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            let mut visitor = MessageVisitor(None);
            event.record(&mut visitor);
            if let Some(message) = visitor.0 {
                self.messages
                    .lock()
                    .unwrap()
                    .push((*event.metadata().level(), message));
            }
        }
    }

    #[test]
    fn pass_runs_inside_layout_span() {
        let capture = Capture::default();
        let subscriber = tracing_subscriber::registry().with(capture.clone());
        tracing::subscriber::with_default(subscriber, || {
            let mut hive = Hive::new();
            boxed(&mut hive, 0.0, 1.0);
            hive.layout().unwrap();
        });

        assert!(capture.spans.lock().unwrap().iter().any(|s| s == "hive.layout"));
        let messages = capture.messages.lock().unwrap();
        assert!(messages.iter().any(|(level, m)| *level == tracing::Level::DEBUG && m == "rewired"));
        assert!(messages.iter().any(|(level, m)| *level == tracing::Level::TRACE && m == "calculated"));
    }

    #[test]
    fn rejected_cycle_is_logged_as_warning() {
        let capture = Capture::default();
        let subscriber = tracing_subscriber::registry().with(capture.clone());
        let result = tracing::subscriber::with_default(subscriber, || {
            let mut hive = Hive::new();
            let parent = hive
                .new_region(|b| {
                    b.x(length(0.0), Rc::new(ChildrenMax::new()))
                        .y(length(0.0), length(1.0))
                        .finish()
                })
                .unwrap();
            hive.new_region(|b| {
                b.x(length(0.0), Rc::new(AncestorSpan::parent()))
                    .y(length(0.0), length(1.0))
                    .child_of(parent)
                    .finish()
            })
            .unwrap();
            hive.layout()
        });

        assert!(matches!(result, Err(LayoutError::Cycle(_))));
        let messages = capture.messages.lock().unwrap();
        assert!(messages
            .iter()
            .any(|(level, m)| *level == tracing::Level::WARN && m == "rejected cyclic prerequisite"));
    }
}
