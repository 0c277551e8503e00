//! Graph collaborator consumed by the find/hide appliers.
//!
//! The engine never owns layout or rendering. It talks to the live graph
//! through [`GraphHandle`]: attribute lookup, visibility, reversible removal,
//! a layout trigger and the pan/zoom viewport. [`memory::MemoryGraph`] is the
//! in-process implementation used by the CLI and the tests.

pub mod memory;
pub mod types;

pub use memory::MemoryGraph;
pub use types::{Attributes, ElementId, ElementKind, ElementSet, GraphInstance, Viewport};

/// Attribute carried by grouping boxes
pub const BOX_KEY: &str = "isBox";

/// Live graph as seen by the appliers
pub trait GraphHandle {
    /// Identity of the loaded graph; changes on every refresh
    fn instance(&self) -> GraphInstance;

    /// Elements of one kind currently in the graph (removed ones excluded)
    fn elements(&self, kind: ElementKind) -> ElementSet;

    fn attributes(&self, id: ElementId) -> Option<&Attributes>;

    /// Source and target of an edge
    fn endpoints(&self, edge: ElementId) -> Option<(ElementId, ElementId)>;

    /// Edges currently in the graph touching `node`
    fn incident_edges(&self, node: ElementId) -> ElementSet;

    /// Direct children of a grouping box currently in the graph
    fn children(&self, parent: ElementId) -> ElementSet;

    fn is_visible(&self, id: ElementId) -> bool;
    fn set_visible(&mut self, ids: &ElementSet, visible: bool);

    /// Elements carrying the find highlight
    fn marked(&self) -> ElementSet;
    fn set_marked(&mut self, ids: &ElementSet, marked: bool);

    /// Remove elements from the graph. Removing a node takes its descendants
    /// and incident edges with it. Returns everything actually removed, which
    /// is what [`GraphHandle::restore`] expects back.
    fn remove(&mut self, ids: &ElementSet) -> ElementSet;

    /// Reinsert previously removed elements
    fn restore(&mut self, ids: &ElementSet);

    fn run_layout(&mut self);

    /// Fit the viewport to the visible elements
    fn fit(&mut self);

    fn viewport(&self) -> Viewport;
    fn set_viewport(&mut self, viewport: Viewport);

    /// Elements of `kind` whose attributes satisfy `predicate`
    fn select(&self, kind: ElementKind, predicate: &dyn Fn(&Attributes) -> bool) -> ElementSet {
        self.elements(kind)
            .iter()
            .filter(|&id| self.attributes(id).is_some_and(predicate))
            .collect()
    }

    /// Elements of `kind` in the graph and not hidden
    fn visible(&self, kind: ElementKind) -> ElementSet {
        self.elements(kind)
            .iter()
            .filter(|&id| self.is_visible(id))
            .collect()
    }

    /// Every edge touching one of `nodes`
    fn connected_edges(&self, nodes: &ElementSet) -> ElementSet {
        let mut edges = ElementSet::new();
        for node in nodes.iter() {
            edges.union_with(&self.incident_edges(node));
        }
        edges
    }

    /// Every endpoint of `edges`
    fn connected_nodes(&self, edges: &ElementSet) -> ElementSet {
        edges
            .iter()
            .filter_map(|edge| self.endpoints(edge))
            .flat_map(|(source, target)| [source, target])
            .collect()
    }

    /// Grouping boxes currently in the graph
    fn boxes(&self) -> ElementSet {
        self.select(ElementKind::Node, &|attrs: &Attributes| {
            types::truthy(attrs, BOX_KEY)
        })
    }
}
