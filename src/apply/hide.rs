use crate::graph::types::{ElementKind, ElementSet, GraphInstance, truthy};
use crate::graph::GraphHandle;
use crate::query::{CompiledQuery, FieldId, Target};
use serde::Serialize;
use tracing::{debug, warn};

/// Viewport tolerances used after a re-layout
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HideOptions {
    /// Zoom drift absorbed instead of restored
    pub zoom_tolerance: f64,
    /// Pan drift, in pixels, absorbed instead of restored
    pub pan_tolerance: f64,
}

impl Default for HideOptions {
    fn default() -> Self {
        Self {
            zoom_tolerance: 0.1,
            pan_tolerance: 20.0,
        }
    }
}

/// What a hide pass did to the graph, kept so the next pass can undo it
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Applied {
    #[default]
    None,
    /// Visibility turned off in place
    Hidden {
        elements: ElementSet,
        /// Grouping boxes left without visible children
        boxes: ElementSet,
    },
    /// Physically removed from the graph
    Removed {
        elements: ElementSet,
        /// Grouping boxes left without children
        boxes: ElementSet,
    },
}

impl Applied {
    /// Every affected element, boxes included
    pub fn all(&self) -> ElementSet {
        match self {
            Applied::None => ElementSet::new(),
            Applied::Hidden { elements, boxes } | Applied::Removed { elements, boxes } => {
                elements.union(boxes)
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.all().is_empty()
    }

    pub fn removed_count(&self) -> usize {
        match self {
            Applied::Removed { .. } => self.all().len(),
            _ => 0,
        }
    }
}

/// How the viewport was handled after a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutOutcome {
    /// Nothing changed that needed a layout
    Skipped,
    /// Layout ran and the view was fitted to the result
    Fitted,
    /// Layout ran and the user's pan/zoom was put back
    ViewportRestored,
}

/// Result of one hide pass, tagged with the graph it was computed against
#[derive(Debug, Clone, PartialEq)]
pub struct HideState {
    pub instance: GraphInstance,
    /// Normalized hide expression; `None` when cleared
    pub expression: Option<String>,
    pub compress: bool,
    pub applied: Applied,
    pub layout: LayoutOutcome,
}

impl HideState {
    /// Elements currently hidden or removed by this state
    pub fn affected(&self) -> ElementSet {
        self.applied.all()
    }
}

/// Computes and applies hide sets
#[derive(Debug, Clone, Default)]
pub struct HideApplier {
    options: HideOptions,
}

impl HideApplier {
    pub fn new(options: HideOptions) -> Self {
        Self { options }
    }

    /// Undo `prior`, then hide what `query` selects.
    ///
    /// A prior state computed against another graph instance is dropped
    /// without restoring: its elements do not exist any more.
    pub fn apply<G: GraphHandle + ?Sized>(
        &self,
        query: Option<&CompiledQuery>,
        compress: bool,
        graph: &mut G,
        prior: Option<HideState>,
    ) -> HideState {
        let instance = graph.instance();

        let mut prior_expression = None;
        let mut prior_compress = None;
        let mut prior_removed = 0;
        let mut refreshed = false;

        if let Some(prior) = prior {
            if prior.instance == instance {
                restore(graph, &prior.applied);
            } else {
                refreshed = true;
                if !prior.applied.is_empty() {
                    warn!(
                        elements = prior.applied.all().len(),
                        "graph was replaced, dropping stale hide record"
                    );
                }
            }
            prior_removed = prior.applied.removed_count();
            prior_expression = prior.expression;
            prior_compress = Some(prior.compress);
        }

        let applied = match query {
            Some(query) => {
                let hide = hide_set(query, &*graph);
                debug!(selector = %query, hide = hide.len(), compress, "hide applied");
                if compress {
                    remove(graph, &hide)
                } else {
                    set_hidden(graph, &hide)
                }
            }
            None => Applied::None,
        };

        let expression = query.map(|q| q.expression.clone());
        let expression_changed = expression != prior_expression;
        let compress_changed = prior_compress.is_some_and(|c| c != compress) && query.is_some();
        let removed = applied.removed_count();
        let removal_changed = removed != prior_removed || (refreshed && removed > 0);

        let layout = if expression_changed || compress_changed || removal_changed {
            self.relayout(graph, expression_changed)
        } else {
            LayoutOutcome::Skipped
        };

        HideState {
            instance,
            expression,
            compress,
            applied,
            layout,
        }
    }

    /// Run the layout. A new expression keeps the fitted view; otherwise a
    /// significant pan/zoom the user had is put back.
    fn relayout<G: GraphHandle + ?Sized>(&self, graph: &mut G, expression_changed: bool) -> LayoutOutcome {
        let before = graph.viewport();
        graph.run_layout();
        let after = graph.viewport();

        if !expression_changed
            && before.drifted(&after, self.options.zoom_tolerance, self.options.pan_tolerance)
        {
            graph.set_viewport(before);
            LayoutOutcome::ViewportRestored
        } else {
            graph.fit();
            LayoutOutcome::Fitted
        }
    }
}

/// Hide with default tolerances
pub fn apply_hide<G: GraphHandle + ?Sized>(
    query: Option<&CompiledQuery>,
    compress: bool,
    graph: &mut G,
    prior: Option<HideState>,
) -> HideState {
    HideApplier::default().apply(query, compress, graph, prior)
}

fn restore<G: GraphHandle + ?Sized>(graph: &mut G, applied: &Applied) {
    match applied {
        Applied::None => {}
        Applied::Hidden { .. } => graph.set_visible(&applied.all(), true),
        Applied::Removed { .. } => graph.restore(&applied.all()),
    }
}

/// Query matches plus the elements that make no sense without them.
///
/// 1. edges of matched nodes
/// 2. visible nodes left without a visible edge, unless flagged unused
/// 3. minus grouping boxes, which are handled once their children are gone
fn hide_set<G: GraphHandle + ?Sized>(query: &CompiledQuery, graph: &G) -> ElementSet {
    let matches = query.select(graph);
    let mut hide = matches.clone();

    if query.target == Target::Node {
        hide.union_with(&graph.connected_edges(&matches));
    }

    let remaining_nodes = graph.visible(ElementKind::Node).difference(&hide);
    let remaining_edges = graph.visible(ElementKind::Edge).difference(&hide);
    let connected = graph.connected_nodes(&remaining_edges);
    let unused_key = FieldId::Unused.key();
    let stranded: ElementSet = remaining_nodes
        .difference(&connected)
        .iter()
        .filter(|&id| !graph.attributes(id).is_some_and(|a| truthy(a, unused_key)))
        .collect();
    hide.union_with(&stranded);

    hide.subtract(&graph.boxes());
    hide
}

fn remove<G: GraphHandle + ?Sized>(graph: &mut G, hide: &ElementSet) -> Applied {
    let elements = graph.remove(hide);

    // nested boxes empty out one level at a time
    let mut boxes = ElementSet::new();
    loop {
        let empty: ElementSet = graph
            .boxes()
            .iter()
            .filter(|&b| graph.children(b).is_empty())
            .collect();
        if empty.is_empty() {
            break;
        }
        boxes.union_with(&graph.remove(&empty));
    }

    Applied::Removed { elements, boxes }
}

fn set_hidden<G: GraphHandle + ?Sized>(graph: &mut G, hide: &ElementSet) -> Applied {
    graph.set_visible(hide, false);

    let mut boxes = ElementSet::new();
    loop {
        let empty: ElementSet = graph
            .boxes()
            .iter()
            .filter(|&b| graph.is_visible(b) && !graph.children(b).iter().any(|c| graph.is_visible(c)))
            .collect();
        if empty.is_empty() {
            break;
        }
        graph.set_visible(&empty, false);
        boxes.union_with(&empty);
    }

    Applied::Hidden {
        elements: hide.clone(),
        boxes,
    }
}
