use crate::graph::types::{
    Attributes, ElementId, ElementKind, ElementSet, GraphInstance, Viewport,
};
use crate::graph::GraphHandle;
use anyhow::{Context, Result, bail};
use rustc_hash::FxHashMap;
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// One node or edge. Data is kept after removal so it can be restored.
#[derive(Debug, Clone)]
struct Element {
    key: String,
    kind: ElementKind,
    data: Attributes,
    parent: Option<ElementId>,
    endpoints: Option<(ElementId, ElementId)>,
}

/// Cytoscape-style graph document
#[derive(Debug, Deserialize)]
struct GraphDocument {
    elements: DocumentElements,
}

#[derive(Debug, Default, Deserialize)]
struct DocumentElements {
    #[serde(default)]
    nodes: Vec<DocumentElement>,
    #[serde(default)]
    edges: Vec<DocumentElement>,
}

#[derive(Debug, Deserialize)]
struct DocumentElement {
    data: Attributes,
}

/// In-memory graph implementing [`GraphHandle`].
///
/// Element ids are dense indexes into the element table. Removal only
/// clears the presence bit, so restoring is a set union.
#[derive(Debug)]
pub struct MemoryGraph {
    instance: GraphInstance,
    elements: Vec<Element>,
    by_key: FxHashMap<String, ElementId>,
    children: FxHashMap<ElementId, Vec<ElementId>>,
    incident: FxHashMap<ElementId, Vec<ElementId>>,
    nodes: ElementSet,
    edges: ElementSet,
    present: ElementSet,
    hidden: ElementSet,
    marked: ElementSet,
    viewport: Viewport,
    layout_runs: usize,
}

impl Default for MemoryGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self {
            instance: GraphInstance::next(),
            elements: Vec::new(),
            by_key: FxHashMap::default(),
            children: FxHashMap::default(),
            incident: FxHashMap::default(),
            nodes: ElementSet::new(),
            edges: ElementSet::new(),
            present: ElementSet::new(),
            hidden: ElementSet::new(),
            marked: ElementSet::new(),
            viewport: Viewport::default(),
            layout_runs: 0,
        }
    }

    /// Load a graph from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read graph file {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("Failed to load graph from {}", path.display()))
    }

    /// Parse `{"elements": {"nodes": [{"data": {..}}], "edges": [..]}}`.
    ///
    /// Nodes may reference a `parent` listed after them.
    pub fn from_json(json: &str) -> Result<Self> {
        let doc: GraphDocument = serde_json::from_str(json).context("Invalid graph document")?;
        let mut graph = Self::new();

        let mut parents = Vec::new();
        for node in doc.elements.nodes {
            let key = element_key(&node.data)?;
            let parent = node.data.get("parent").and_then(Value::as_str).map(str::to_string);
            let id = graph.insert(key, ElementKind::Node, node.data)?;
            if let Some(parent) = parent {
                parents.push((id, parent));
            }
        }
        for (child, parent) in parents {
            graph.link_parent(child, &parent)?;
        }

        for edge in doc.elements.edges {
            let key = element_key(&edge.data)?;
            let source = endpoint(&edge.data, "source", &key)?;
            let target = endpoint(&edge.data, "target", &key)?;
            graph.add_edge(&key, &source, &target, Value::Object(edge.data))?;
        }

        Ok(graph)
    }

    /// Add a node. A `parent` attribute must name a node already added.
    pub fn add_node(&mut self, key: &str, data: Value) -> Result<ElementId> {
        let mut attrs = into_attributes(data)?;
        attrs.insert("id".to_string(), Value::String(key.to_string()));
        let parent = match attrs.get("parent").and_then(Value::as_str) {
            Some(parent) => Some(
                self.node_id(parent)
                    .with_context(|| format!("Unknown parent of '{key}'"))?,
            ),
            None => None,
        };

        let id = self.insert(key.to_string(), ElementKind::Node, attrs)?;
        if let Some(parent) = parent {
            self.elements[id as usize].parent = Some(parent);
            self.children.entry(parent).or_default().push(id);
        }
        Ok(id)
    }

    /// Add an edge between two existing nodes
    pub fn add_edge(&mut self, key: &str, source: &str, target: &str, data: Value) -> Result<ElementId> {
        let source_id = self.node_id(source)?;
        let target_id = self.node_id(target)?;

        let mut attrs = into_attributes(data)?;
        attrs.insert("id".to_string(), Value::String(key.to_string()));
        attrs.insert("source".to_string(), Value::String(source.to_string()));
        attrs.insert("target".to_string(), Value::String(target.to_string()));

        let id = self.insert(key.to_string(), ElementKind::Edge, attrs)?;
        self.elements[id as usize].endpoints = Some((source_id, target_id));
        self.incident.entry(source_id).or_default().push(id);
        if target_id != source_id {
            self.incident.entry(target_id).or_default().push(id);
        }
        Ok(id)
    }

    /// Element id for a key
    pub fn id_of(&self, key: &str) -> Option<ElementId> {
        self.by_key.get(key).copied()
    }

    /// Key of an element
    pub fn label(&self, id: ElementId) -> Option<&str> {
        self.elements.get(id as usize).map(|e| e.key.as_str())
    }

    pub fn kind(&self, id: ElementId) -> Option<ElementKind> {
        self.elements.get(id as usize).map(|e| e.kind)
    }

    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.elements.get(id as usize).and_then(|e| e.parent)
    }

    /// Whether an element is in the graph (not removed)
    pub fn is_present(&self, id: ElementId) -> bool {
        self.present.contains(id)
    }

    /// Every element ever added, removed ones included
    pub fn all(&self) -> ElementSet {
        self.nodes.union(&self.edges)
    }

    /// Elements whose visibility is turned off
    pub fn hidden(&self) -> &ElementSet {
        &self.hidden
    }

    /// Number of layouts run so far
    pub fn layout_runs(&self) -> usize {
        self.layout_runs
    }

    fn insert(&mut self, key: String, kind: ElementKind, data: Attributes) -> Result<ElementId> {
        if self.by_key.contains_key(&key) {
            bail!("Duplicate element id '{key}'");
        }
        let id = ElementId::try_from(self.elements.len()).context("Too many graph elements")?;

        self.by_key.insert(key.clone(), id);
        self.elements.push(Element {
            key,
            kind,
            data,
            parent: None,
            endpoints: None,
        });
        match kind {
            ElementKind::Node => self.nodes.insert(id),
            ElementKind::Edge => self.edges.insert(id),
        };
        self.present.insert(id);
        Ok(id)
    }

    fn link_parent(&mut self, child: ElementId, parent: &str) -> Result<()> {
        let parent_id = self
            .node_id(parent)
            .with_context(|| format!("Unknown parent of '{}'", self.elements[child as usize].key))?;
        self.elements[child as usize].parent = Some(parent_id);
        self.children.entry(parent_id).or_default().push(child);
        Ok(())
    }

    fn node_id(&self, key: &str) -> Result<ElementId> {
        match self.by_key.get(key) {
            Some(&id) if self.nodes.contains(id) => Ok(id),
            _ => bail!("Unknown node '{key}'"),
        }
    }

    fn descendants(&self, id: ElementId, out: &mut ElementSet) {
        if let Some(children) = self.children.get(&id) {
            for &child in children {
                if out.insert(child) {
                    self.descendants(child, out);
                }
            }
        }
    }
}

fn element_key(data: &Attributes) -> Result<String> {
    data.get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .context("Graph element without an 'id'")
}

fn endpoint(data: &Attributes, field: &str, key: &str) -> Result<String> {
    data.get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .with_context(|| format!("Edge '{key}' has no '{field}'"))
}

fn into_attributes(data: Value) -> Result<Attributes> {
    match data {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Attributes::new()),
        other => bail!("Element data must be an object, got {other}"),
    }
}

impl GraphHandle for MemoryGraph {
    fn instance(&self) -> GraphInstance {
        self.instance
    }

    fn elements(&self, kind: ElementKind) -> ElementSet {
        match kind {
            ElementKind::Node => self.nodes.intersection(&self.present),
            ElementKind::Edge => self.edges.intersection(&self.present),
        }
    }

    fn attributes(&self, id: ElementId) -> Option<&Attributes> {
        self.elements.get(id as usize).map(|e| &e.data)
    }

    fn endpoints(&self, edge: ElementId) -> Option<(ElementId, ElementId)> {
        self.elements.get(edge as usize).and_then(|e| e.endpoints)
    }

    fn incident_edges(&self, node: ElementId) -> ElementSet {
        self.incident
            .get(&node)
            .into_iter()
            .flatten()
            .copied()
            .filter(|&edge| self.present.contains(edge))
            .collect()
    }

    fn children(&self, parent: ElementId) -> ElementSet {
        self.children
            .get(&parent)
            .into_iter()
            .flatten()
            .copied()
            .filter(|&child| self.present.contains(child))
            .collect()
    }

    fn is_visible(&self, id: ElementId) -> bool {
        self.present.contains(id) && !self.hidden.contains(id)
    }

    fn set_visible(&mut self, ids: &ElementSet, visible: bool) {
        if visible {
            self.hidden.subtract(ids);
        } else {
            self.hidden.union_with(ids);
        }
    }

    fn marked(&self) -> ElementSet {
        self.marked.clone()
    }

    fn set_marked(&mut self, ids: &ElementSet, marked: bool) {
        if marked {
            self.marked.union_with(ids);
        } else {
            self.marked.subtract(ids);
        }
    }

    fn remove(&mut self, ids: &ElementSet) -> ElementSet {
        let mut removed = ids.intersection(&self.present);

        let nodes = removed.intersection(&self.nodes);
        for node in nodes.iter() {
            self.descendants(node, &mut removed);
        }
        let nodes = removed.intersection(&self.nodes);
        removed.union_with(&self.connected_edges(&nodes));

        let removed = removed.intersection(&self.present);
        self.present.subtract(&removed);
        removed
    }

    fn restore(&mut self, ids: &ElementSet) {
        let known = ids.intersection(&self.all());
        self.present.union_with(&known);
    }

    fn run_layout(&mut self) {
        self.layout_runs += 1;
        self.fit();
    }

    fn fit(&mut self) {
        self.viewport = Viewport::default();
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> MemoryGraph {
        let mut g = MemoryGraph::new();
        g.add_node("box", json!({ "isBox": "app" })).unwrap();
        g.add_node("a", json!({ "app": "a", "parent": "box" })).unwrap();
        g.add_node("b", json!({ "app": "b" })).unwrap();
        g.add_edge("ab", "a", "b", json!({ "http": "1.0" })).unwrap();
        g
    }

    #[test]
    fn test_add_and_lookup() {
        let g = sample();
        let a = g.id_of("a").unwrap();
        assert_eq!(g.label(a), Some("a"));
        assert_eq!(g.kind(a), Some(ElementKind::Node));
        assert_eq!(g.parent(a), g.id_of("box"));
        assert_eq!(g.elements(ElementKind::Node).len(), 3);
        assert_eq!(g.elements(ElementKind::Edge).len(), 1);
        let ab = g.id_of("ab").unwrap();
        assert_eq!(g.endpoints(ab), Some((a, g.id_of("b").unwrap())));
        assert_eq!(text_of(&g, ab, "source"), Some("a"));
    }

    fn text_of<'a>(g: &'a MemoryGraph, id: ElementId, key: &str) -> Option<&'a str> {
        g.attributes(id).and_then(|a| a.get(key)).and_then(Value::as_str)
    }

    #[test]
    fn test_rejects_bad_input() {
        let mut g = sample();
        assert!(g.add_node("a", json!({})).is_err());
        assert!(g.add_edge("x", "a", "missing", json!({})).is_err());
        assert!(g.add_edge("y", "a", "ab", json!({})).is_err());
        assert!(g.add_node("c", json!({ "parent": "nope" })).is_err());
        assert!(g.add_node("d", json!([1, 2])).is_err());
    }

    #[test]
    fn test_from_json_parent_after_child() {
        let json = r#"{"elements":{
            "nodes":[
                {"data":{"id":"n1","parent":"box1","app":"x"}},
                {"data":{"id":"box1","isBox":"app"}},
                {"data":{"id":"n2"}}
            ],
            "edges":[{"data":{"id":"e1","source":"n1","target":"n2","protocol":"http"}}]
        }}"#;
        let g = MemoryGraph::from_json(json).unwrap();
        let box1 = g.id_of("box1").unwrap();
        assert_eq!(g.children(box1).len(), 1);
        assert_eq!(g.boxes().iter().collect::<Vec<_>>(), vec![box1]);
    }

    #[test]
    fn test_from_json_errors() {
        assert!(MemoryGraph::from_json("not json").is_err());
        assert!(MemoryGraph::from_json(r#"{"elements":{"nodes":[{"data":{}}]}}"#).is_err());
        assert!(
            MemoryGraph::from_json(r#"{"elements":{"edges":[{"data":{"id":"e","source":"a"}}]}}"#)
                .is_err()
        );
    }

    #[test]
    fn test_remove_takes_edges_and_children() {
        let mut g = sample();
        let boxed: ElementSet = [g.id_of("box").unwrap()].into_iter().collect();
        let removed = g.remove(&boxed);
        // box, its child and the child's edge
        assert_eq!(removed.len(), 3);
        assert_eq!(g.elements(ElementKind::Node).len(), 1);
        assert!(g.elements(ElementKind::Edge).is_empty());

        g.restore(&removed);
        assert_eq!(g.elements(ElementKind::Node).len(), 3);
        assert_eq!(g.elements(ElementKind::Edge).len(), 1);
    }

    #[test]
    fn test_visibility_and_marks() {
        let mut g = sample();
        let a: ElementSet = [g.id_of("a").unwrap()].into_iter().collect();
        g.set_visible(&a, false);
        assert!(!g.is_visible(g.id_of("a").unwrap()));
        assert_eq!(g.visible(ElementKind::Node).len(), 2);
        g.set_visible(&a, true);
        assert_eq!(g.visible(ElementKind::Node).len(), 3);

        g.set_marked(&a, true);
        assert_eq!(g.marked(), a);
        g.set_marked(&a, false);
        assert!(g.marked().is_empty());
    }

    #[test]
    fn test_layout_fits() {
        let mut g = sample();
        g.set_viewport(Viewport { zoom: 3.0, pan_x: 100.0, pan_y: 0.0 });
        g.run_layout();
        assert_eq!(g.viewport(), Viewport::default());
        assert_eq!(g.layout_runs(), 1);
    }

    #[test]
    fn test_each_graph_is_a_new_instance() {
        assert_ne!(sample().instance(), sample().instance());
    }
}
