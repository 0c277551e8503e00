use crate::graph::types::ElementSet;
use crate::graph::GraphHandle;
use crate::query::CompiledQuery;
use tracing::debug;

/// Replace the find highlight with the matches of `query`.
///
/// Every existing mark is cleared first, so applying the same query twice
/// leaves the same marked set. `None` only clears. Hidden elements are never
/// marked: hide wins over find. Returns the new marks.
pub fn apply_find<G: GraphHandle + ?Sized>(query: Option<&CompiledQuery>, graph: &mut G) -> ElementSet {
    let previous = graph.marked();
    graph.set_marked(&previous, false);

    let Some(query) = query else {
        debug!(cleared = previous.len(), "find cleared");
        return ElementSet::new();
    };

    let matches: ElementSet = query
        .select(&*graph)
        .iter()
        .filter(|&id| graph.is_visible(id))
        .collect();
    graph.set_marked(&matches, true);
    debug!(selector = %query, matched = matches.len(), "find applied");
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::MemoryGraph;
    use crate::query::compile;
    use serde_json::json;

    fn graph() -> MemoryGraph {
        let mut g = MemoryGraph::new();
        g.add_node("details", json!({ "app": "details", "version": "v1" })).unwrap();
        g.add_node("reviews-v1", json!({ "app": "reviews", "version": "v1" })).unwrap();
        g.add_node("reviews-v2", json!({ "app": "reviews", "version": "v2" })).unwrap();
        g.add_edge("e1", "details", "reviews-v1", json!({ "protocol": "http" })).unwrap();
        g
    }

    #[test]
    fn test_find_marks_matches() {
        let mut g = graph();
        let q = compile("app != details and version=v1").unwrap();
        let marked = apply_find(q.as_ref(), &mut g);
        assert_eq!(marked.iter().collect::<Vec<_>>(), vec![g.id_of("reviews-v1").unwrap()]);
        assert_eq!(g.marked(), marked);
    }

    #[test]
    fn test_find_is_idempotent() {
        let mut g = graph();
        let q = compile("version = v1").unwrap();
        let once = apply_find(q.as_ref(), &mut g);
        let twice = apply_find(q.as_ref(), &mut g);
        assert_eq!(once, twice);
        assert_eq!(g.marked().len(), 2);
    }

    #[test]
    fn test_find_skips_hidden_elements() {
        let mut g = graph();
        let hidden: ElementSet = [g.id_of("reviews-v1").unwrap()].into_iter().collect();
        g.set_visible(&hidden, false);

        let marked = apply_find(compile("version = v1").unwrap().as_ref(), &mut g);
        assert_eq!(marked.iter().collect::<Vec<_>>(), vec![g.id_of("details").unwrap()]);
        assert!(!g.marked().contains(g.id_of("reviews-v1").unwrap()));

        g.set_visible(&hidden, true);
        let marked = apply_find(compile("version = v1").unwrap().as_ref(), &mut g);
        assert_eq!(marked.len(), 2);
    }

    #[test]
    fn test_find_replaces_previous_marks() {
        let mut g = graph();
        apply_find(compile("app = reviews").unwrap().as_ref(), &mut g);
        apply_find(compile("protocol = http").unwrap().as_ref(), &mut g);
        assert_eq!(g.marked().iter().collect::<Vec<_>>(), vec![g.id_of("e1").unwrap()]);

        apply_find(None, &mut g);
        assert!(g.marked().is_empty());
    }
}
