use roaring::RoaringBitmap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifier of an element within one graph instance
pub type ElementId = u32;

/// Element data as delivered by the topology backend
pub type Attributes = serde_json::Map<String, Value>;

/// Attribute holding a node's Kubernetes labels as a string map
pub const LABELS_KEY: &str = "labels";

/// Node or edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Node,
    Edge,
}

/// Identity of a loaded graph.
///
/// Every refresh of the topology produces a new instance; element ids are
/// only meaningful within the instance that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct GraphInstance(u64);

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

impl GraphInstance {
    pub fn next() -> Self {
        Self(NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed))
    }
}

/// Pan and zoom of the rendered graph
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub zoom: f64,
    pub pan_x: f64,
    pub pan_y: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan_x: 0.0,
            pan_y: 0.0,
        }
    }
}

impl Viewport {
    /// Whether two viewports differ by more than the given tolerances
    pub fn drifted(&self, other: &Viewport, zoom_tolerance: f64, pan_tolerance: f64) -> bool {
        (self.zoom - other.zoom).abs() > zoom_tolerance
            || (self.pan_x - other.pan_x).abs() > pan_tolerance
            || (self.pan_y - other.pan_y).abs() > pan_tolerance
    }
}

/// Set of element ids
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementSet(RoaringBitmap);

impl ElementSet {
    pub fn new() -> Self {
        Self(RoaringBitmap::new())
    }

    pub fn insert(&mut self, id: ElementId) -> bool {
        self.0.insert(id)
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.0.contains(id)
    }

    pub fn len(&self) -> usize {
        self.0.len() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.0.iter()
    }

    /// Add every element of `other`
    pub fn union_with(&mut self, other: &ElementSet) {
        self.0 |= &other.0;
    }

    /// Remove every element of `other`
    pub fn subtract(&mut self, other: &ElementSet) {
        self.0 -= &other.0;
    }

    pub fn union(&self, other: &ElementSet) -> ElementSet {
        ElementSet(&self.0 | &other.0)
    }

    pub fn intersection(&self, other: &ElementSet) -> ElementSet {
        ElementSet(&self.0 & &other.0)
    }

    pub fn difference(&self, other: &ElementSet) -> ElementSet {
        ElementSet(&self.0 - &other.0)
    }
}

impl FromIterator<ElementId> for ElementSet {
    fn from_iter<I: IntoIterator<Item = ElementId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<ElementId> for ElementSet {
    fn extend<I: IntoIterator<Item = ElementId>>(&mut self, iter: I) {
        self.0.extend(iter)
    }
}

/// String value of an attribute
pub fn text<'a>(attrs: &'a Attributes, key: &str) -> Option<&'a str> {
    attrs.get(key).and_then(Value::as_str)
}

/// Value of one Kubernetes label
pub fn label<'a>(attrs: &'a Attributes, name: &str) -> Option<&'a str> {
    attrs.get(LABELS_KEY)?.as_object()?.get(name)?.as_str()
}

/// Numeric value of an attribute. Rates are often delivered as strings.
pub fn number(attrs: &Attributes, key: &str) -> Option<f64> {
    match attrs.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

/// Whether an attribute is set to a truthy value
pub fn truthy(attrs: &Attributes, key: &str) -> bool {
    match attrs.get(key) {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}
