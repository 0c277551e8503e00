//! End-to-end tests: expression text in, graph state out.

use meshfind::apply::{Applied, LayoutOutcome, apply_find, apply_hide};
use meshfind::config::AppConfig;
use meshfind::graph::{ElementKind, ElementSet, GraphHandle, MemoryGraph};
use meshfind::query::{OptionRequest, Target, ValidationError, compile};
use meshfind::session::{Session, Slot};
use serde_json::json;

const BOOKINFO: &str = include_str!("fixtures/bookinfo.json");

fn bookinfo() -> MemoryGraph {
    MemoryGraph::from_json(BOOKINFO).expect("fixture loads")
}

fn keys(graph: &MemoryGraph, set: &ElementSet) -> Vec<String> {
    let mut keys: Vec<String> = set
        .iter()
        .filter_map(|id| graph.label(id).map(str::to_string))
        .collect();
    keys.sort();
    keys
}

fn find(graph: &mut MemoryGraph, text: &str) -> Vec<String> {
    let query = compile(text).expect("valid expression");
    let marked = apply_find(query.as_ref(), graph);
    keys(graph, &marked)
}

fn visible_keys(graph: &MemoryGraph) -> Vec<String> {
    let all = graph
        .visible(ElementKind::Node)
        .union(&graph.visible(ElementKind::Edge));
    keys(graph, &all)
}

#[test]
fn test_and_expression_selects_one_version() {
    let mut g = MemoryGraph::new();
    g.add_node("productpage", json!({ "app": "productpage" })).unwrap();
    g.add_node("details", json!({ "app": "details", "version": "v1" })).unwrap();
    g.add_node("reviews-v1", json!({ "app": "reviews", "version": "v1" })).unwrap();
    g.add_node("reviews-v2", json!({ "app": "reviews", "version": "v2" })).unwrap();
    g.add_edge("e1", "productpage", "details", json!({})).unwrap();
    g.add_edge("e2", "productpage", "reviews-v1", json!({})).unwrap();
    g.add_edge("e3", "productpage", "reviews-v2", json!({})).unwrap();

    let text = "app != details and version=v1";
    assert_eq!(find(&mut g, text), vec!["reviews-v1"]);

    let query = compile(text).unwrap();
    let state = apply_hide(query.as_ref(), false, &mut g, None);
    let hidden_nodes = state.affected().intersection(&g.elements(ElementKind::Node));
    assert_eq!(keys(&g, &hidden_nodes), vec!["reviews-v1"]);
}

#[test]
fn test_no_traffic_hide() {
    let mut g = bookinfo();
    let query = compile("!traffic").unwrap();
    let state = apply_hide(query.as_ref(), false, &mut g, None);

    assert_eq!(
        keys(&g, &state.affected()),
        vec!["pp-rv2", "ratings", "reviews-v2", "rv2-ratings"]
    );
    // unused node without edges stays, as does the box with a visible child
    assert!(g.is_visible(g.id_of("legacy").unwrap()));
    assert!(g.is_visible(g.id_of("reviews").unwrap()));
}

#[test]
fn test_box_hidden_once_all_children_are() {
    let mut g = bookinfo();
    let query = compile("app = reviews").unwrap();
    let state = apply_hide(query.as_ref(), true, &mut g, None);
    let Applied::Removed { boxes, .. } = &state.applied else {
        panic!("compress mode removes");
    };
    assert_eq!(keys(&g, boxes), vec!["reviews"]);
    // ratings only talked to reviews-v2
    assert!(!g.is_present(g.id_of("ratings").unwrap()));
    assert!(g.is_present(g.id_of("productpage").unwrap()));
}

#[test]
fn test_round_trip_invisible_mode() {
    let mut g = bookinfo();
    let before = visible_keys(&g);
    let query = compile("ns = istio-system OR app = details").unwrap();
    let state = apply_hide(query.as_ref(), false, &mut g, None);
    assert_ne!(visible_keys(&g), before);

    apply_hide(None, false, &mut g, Some(state));
    assert_eq!(visible_keys(&g), before);
}

#[test]
fn test_round_trip_compress_mode() {
    let mut g = bookinfo();
    let before = visible_keys(&g);
    let query = compile("!traffic").unwrap();
    let state = apply_hide(query.as_ref(), true, &mut g, None);
    assert_eq!(state.applied.removed_count(), 4);

    let cleared = apply_hide(None, true, &mut g, Some(state));
    assert_eq!(cleared.applied, Applied::None);
    assert_eq!(visible_keys(&g), before);
}

#[test]
fn test_find_idempotent() {
    let mut g = bookinfo();
    let once = find(&mut g, "rt > 500");
    let twice = find(&mut g, "rt > 500");
    assert_eq!(once, vec!["pp-rv1"]);
    assert_eq!(once, twice);
    assert_eq!(g.marked().len(), 1);
}

#[test]
fn test_empty_input_clears_everything() {
    let mut g = bookinfo();
    let before = visible_keys(&g);
    let mut session = Session::new(&AppConfig::default());
    session.submit(Slot::Find, "app = details", &mut g).unwrap();
    session.submit(Slot::Hide, "!traffic", &mut g).unwrap();

    session.submit(Slot::Find, "", &mut g).unwrap();
    session.submit(Slot::Hide, "   ", &mut g).unwrap();
    assert!(g.marked().is_empty());
    assert!(session.hide_state().is_none());
    assert_eq!(visible_keys(&g), before);
    assert_eq!(session.error(Slot::Find), None);
    assert_eq!(session.error(Slot::Hide), None);
}

#[test]
fn test_refresh_drops_removed_elements() {
    let mut old = bookinfo();
    let mut session = Session::new(&AppConfig::default());
    session.submit(Slot::Hide, "!traffic", &mut old).unwrap();
    let old_state = session.hide_state().unwrap().clone();

    let mut fresh = bookinfo();
    session.graph_replaced(&mut fresh);
    let state = session.hide_state().unwrap();
    assert_ne!(state.instance, old_state.instance);
    assert_eq!(keys(&fresh, &state.affected()), keys(&old, &old_state.affected()));
    assert_eq!(fresh.elements(ElementKind::Node).len(), 6);
    assert_eq!(state.layout, LayoutOutcome::Fitted);
}

#[test]
fn test_sidecar_polarity() {
    let mut g = bookinfo();
    assert_eq!(find(&mut g, "!sidecar"), vec!["reviews-v2"]);
    assert_eq!(find(&mut g, "has om"), vec!["reviews-v2"]);
    let with_sidecar = find(&mut g, "sidecar");
    assert!(!with_sidecar.contains(&"reviews-v2".to_string()));
    assert!(with_sidecar.contains(&"details".to_string()));
}

#[test]
fn test_numeric_absent_versus_zero() {
    let mut g = bookinfo();
    assert_eq!(find(&mut g, "http = NaN"), vec!["pp-ext", "rv2-ratings"]);
    assert_eq!(find(&mut g, "http = 0"), vec!["pp-rv2"]);
    assert_eq!(
        find(&mut g, "http != nan"),
        vec!["pp-details", "pp-rv1", "pp-rv2"]
    );
}

#[test]
fn test_string_and_enum_operands() {
    let mut g = bookinfo();
    assert_eq!(find(&mut g, "node = svc"), vec!["ext"]);
    assert_eq!(find(&mut g, "ns startswith istio"), vec!["ext"]);
    assert_eq!(find(&mut g, "se"), vec!["ext"]);
    assert_eq!(find(&mut g, "is outside"), vec!["ext"]);
    assert_eq!(find(&mut g, "protocol = tcp"), vec!["pp-ext"]);
    assert_eq!(find(&mut g, "%httperr > 50"), vec!["pp-rv2"]);
    assert_eq!(find(&mut g, "root"), vec!["productpage"]);
    assert_eq!(find(&mut g, "!healthy"), vec!["reviews-v2"]);
}

#[test]
fn test_name_operand() {
    let mut g = bookinfo();
    assert_eq!(
        find(&mut g, "name = reviews-v1 OR name = ratings"),
        vec!["ratings", "reviews-v1"]
    );
    let not_reviews = find(&mut g, "name != reviews");
    assert!(!not_reviews.contains(&"reviews-v1".to_string()));
    assert!(not_reviews.contains(&"ext".to_string()));
}

#[test]
fn test_validation_errors() {
    assert_eq!(
        compile("app = foo AND protocol = http").unwrap_err(),
        ValidationError::TargetMismatch
    );
    assert_eq!(
        compile("ns=foo AND ns=bar OR protocol=http").unwrap_err(),
        ValidationError::MixedConnectives
    );
    assert_eq!(
        compile("node = box").unwrap_err(),
        ValidationError::InvalidNodeKind("box".to_string())
    );
    assert_eq!(
        compile("rt > fast").unwrap_err(),
        ValidationError::NotNumeric("fast".to_string())
    );
    assert_eq!(
        compile("name != foo OR app = bar").unwrap_err(),
        ValidationError::NameWithNegatedOr
    );
}

#[test]
fn test_option_requests_are_advisory() {
    let query = compile("mtls").unwrap().unwrap();
    assert_eq!(query.target, Target::Edge);
    assert_eq!(query.requests, vec![OptionRequest::Security]);

    // the predicate works without the host honoring anything
    let mut g = bookinfo();
    assert_eq!(find(&mut g, "mtls"), vec!["pp-details", "pp-rv1"]);
}

#[test]
fn test_hidden_elements_not_highlighted() {
    let mut g = bookinfo();
    let config = AppConfig {
        compress_on_hide: false,
        ..AppConfig::default()
    };
    let mut session = Session::new(&config);
    session.submit(Slot::Find, "app = ratings", &mut g).unwrap();
    session.submit(Slot::Hide, "!traffic", &mut g).unwrap();

    let view = meshfind::output::GraphView::build(&g, &session);
    let ratings = view.elements.iter().find(|e| e.id == "ratings").unwrap();
    assert!(!ratings.matched);
}

#[test]
fn test_label_operands() {
    let mut g = bookinfo();
    assert_eq!(find(&mut g, "label:region = east"), vec!["productpage", "reviews-v1"]);
    assert_eq!(find(&mut g, "label:team"), vec!["productpage"]);
    assert_eq!(
        find(&mut g, "label:region != east AND label:app"),
        vec!["details"]
    );

    let unlabeled = find(&mut g, "!label:region");
    assert!(unlabeled.contains(&"ratings".to_string()));
    assert!(!unlabeled.contains(&"details".to_string()));

    assert_eq!(
        compile("!label:region = east").unwrap_err(),
        ValidationError::NegatedComparison("!label:region = east".to_string())
    );
}

#[test]
fn test_hide_by_label() {
    let mut g = bookinfo();
    let query = compile("label:region = west").unwrap();
    let state = apply_hide(query.as_ref(), false, &mut g, None);
    assert_eq!(keys(&g, &state.affected()), vec!["details", "pp-details"]);
}

#[test]
fn test_keyword_value_and_quoted_errors() {
    let mut g = bookinfo();
    assert!(find(&mut g, "app = is").is_empty());
    assert_eq!(
        compile("app = foo!bar").unwrap_err().to_string(),
        "Invalid value [foo!bar]"
    );
    assert_eq!(
        compile("app = foo AND http > 5 AND bogus").unwrap_err(),
        ValidationError::TargetMismatch
    );
}
