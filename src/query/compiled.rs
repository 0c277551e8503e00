use crate::graph::types::{Attributes, ElementKind, ElementSet};
use crate::graph::GraphHandle;
use crate::query::error::ValidationError;
use crate::query::field::{OptionRequest, Target};
use crate::query::lexer::{lex, render};
use crate::query::operand::{OperandFragment, compile_operand};
use crate::query::splitter::{Connective, split};
use std::fmt;
use tracing::debug;

/// Validated, target-homogeneous query
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub target: Target,
    pub fragments: Vec<OperandFragment>,
    /// `None` for single-fragment queries
    pub connective: Option<Connective>,
    /// Normalized expression text the query was compiled from
    pub expression: String,
    /// Display options the host should enable for this query
    pub requests: Vec<OptionRequest>,
}

/// Compile expression text.
///
/// Blank input is not an error: it yields `Ok(None)`, the cleared state.
/// Fragments are compiled left to right and the first problem is reported,
/// so a node/edge mismatch wins over an error in a later fragment.
pub fn compile(text: &str) -> Result<Option<CompiledQuery>, ValidationError> {
    let lexed = lex(text);
    let split = split(&lexed.tokens)?;

    let mut fragments: Vec<OperandFragment> = Vec::with_capacity(split.fragments.len());
    for range in split.fragments {
        let fragment = compile_operand(&lexed, range, split.connective)?;
        if fragments.first().is_some_and(|first| first.target != fragment.target) {
            return Err(ValidationError::TargetMismatch);
        }
        fragments.push(fragment);
    }

    let query = assemble(fragments, split.connective, render(&lexed.tokens))?;
    if let Some(q) = &query {
        debug!(expression = %q.expression, selector = %q, "compiled query");
    }
    Ok(query)
}

/// Combine compiled fragments into one query.
///
/// The first fragment fixes the target; every other fragment must agree.
pub fn assemble(
    fragments: Vec<OperandFragment>,
    connective: Option<Connective>,
    expression: String,
) -> Result<Option<CompiledQuery>, ValidationError> {
    let Some(first) = fragments.first() else {
        return Ok(None);
    };
    let target = first.target;

    if fragments.iter().any(|f| f.target != target) {
        return Err(ValidationError::TargetMismatch);
    }

    let mut requests = Vec::new();
    for request in fragments.iter().filter_map(|f| f.field.option_request()) {
        if !requests.contains(&request) {
            requests.push(request);
        }
    }

    Ok(Some(CompiledQuery {
        target,
        fragments,
        connective,
        expression,
        requests,
    }))
}

impl CompiledQuery {
    pub fn element_kind(&self) -> ElementKind {
        match self.target {
            Target::Node => ElementKind::Node,
            Target::Edge => ElementKind::Edge,
        }
    }

    /// Evaluate the query against one element's attributes
    pub fn matches(&self, attrs: &Attributes) -> bool {
        match self.connective {
            Some(Connective::Or) => self.fragments.iter().any(|f| f.matches(attrs)),
            Some(Connective::And) | None => self.fragments.iter().all(|f| f.matches(attrs)),
        }
    }

    /// Elements of the query's target kind that match
    pub fn select<G: GraphHandle + ?Sized>(&self, graph: &G) -> ElementSet {
        graph.select(self.element_kind(), &|attrs: &Attributes| self.matches(attrs))
    }
}

/// Selector form: `node[app != "details"][version = "v1"]` for conjunctions,
/// comma-separated alternatives for disjunctions.
impl fmt::Display for CompiledQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.connective {
            Some(Connective::And) => {
                write!(f, "{}", self.target)?;
                self.fragments.iter().try_for_each(|frag| write!(f, "{frag}"))
            }
            Some(Connective::Or) | None => {
                let alternatives = self
                    .fragments
                    .iter()
                    .flat_map(|frag| frag.condition.alternatives());
                for (i, alt) in alternatives.enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}{alt}", self.target)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::field::FieldId;
    use crate::query::lexer::Operator;
    use serde_json::json;

    fn attrs(value: serde_json::Value) -> Attributes {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_empty_is_no_query() {
        assert_eq!(compile("").unwrap(), None);
        assert_eq!(compile("   ").unwrap(), None);
    }

    #[test]
    fn test_single_numeric() {
        let q = compile("httpin > 5.0").unwrap().unwrap();
        assert_eq!(q.target, Target::Node);
        assert_eq!(q.connective, None);
        assert_eq!(q.fragments[0].field, FieldId::HttpIn);
        assert_eq!(q.fragments[0].operator, Some(Operator::Gt));
        assert_eq!(q.to_string(), "node[httpIn > 5.0]");
    }

    #[test]
    fn test_and_selector() {
        let q = compile("app != details and version=v1").unwrap().unwrap();
        assert_eq!(q.connective, Some(Connective::And));
        assert_eq!(q.expression, "app != details AND version = v1");
        assert_eq!(q.to_string(), "node[app != \"details\"][version = \"v1\"]");
    }

    #[test]
    fn test_or_selector() {
        let q = compile("ns = foo or ns = bar").unwrap().unwrap();
        assert_eq!(
            q.to_string(),
            "node[namespace = \"foo\"],node[namespace = \"bar\"]"
        );
    }

    #[test]
    fn test_name_selector() {
        let q = compile("name = foo").unwrap().unwrap();
        assert_eq!(
            q.to_string(),
            "node[workload = \"foo\"],node[app = \"foo\"],node[service = \"foo\"]"
        );
        let q = compile("name != foo").unwrap().unwrap();
        assert_eq!(
            q.to_string(),
            "node[workload != \"foo\"][app != \"foo\"][service != \"foo\"]"
        );
        assert!(compile("name = foo OR app = bar").is_ok());
        assert_eq!(
            compile("name = foo AND app = bar").unwrap_err(),
            ValidationError::NameWithAnd
        );
    }

    #[test]
    fn test_target_mismatch() {
        for text in [
            "app = foo AND protocol = http",
            "http > 5 OR !cb",
            "!traffic and dead",
        ] {
            assert_eq!(
                compile(text).unwrap_err(),
                ValidationError::TargetMismatch,
                "{text}"
            );
        }
    }

    #[test]
    fn test_mixed_connectives_win() {
        // reported even when fragments would also fail
        assert_eq!(
            compile("foo = bar AND x OR y").unwrap_err(),
            ValidationError::MixedConnectives
        );
    }

    #[test]
    fn test_first_fragment_error_reported() {
        assert_eq!(
            compile("app = foo AND bogus").unwrap_err(),
            ValidationError::UnknownFlag("bogus".to_string())
        );
    }

    #[test]
    fn test_target_mismatch_before_later_errors() {
        assert_eq!(
            compile("app = foo AND http > 5 AND bogus").unwrap_err(),
            ValidationError::TargetMismatch
        );
        assert_eq!(
            compile("!traffic OR dead OR rt > fast").unwrap_err(),
            ValidationError::TargetMismatch
        );
    }

    #[test]
    fn test_label_query() {
        let q = compile("label:region = east OR label:team").unwrap().unwrap();
        assert_eq!(q.target, Target::Node);
        assert_eq!(
            q.to_string(),
            "node[label:region = \"east\"],node[?label:team]"
        );
        assert_eq!(
            compile("label:region AND protocol = http").unwrap_err(),
            ValidationError::TargetMismatch
        );
    }

    #[test]
    fn test_option_requests() {
        let q = compile("rt > 500 and mtls and rt < 1000").unwrap().unwrap();
        assert_eq!(
            q.requests,
            vec![OptionRequest::ResponseTimeLabels, OptionRequest::Security]
        );
        let q = compile("unused").unwrap().unwrap();
        assert_eq!(q.requests, vec![OptionRequest::UnusedNodes]);
        assert!(compile("app = foo").unwrap().unwrap().requests.is_empty());
    }

    #[test]
    fn test_matches_connectives() {
        let and = compile("app != details and version=v1").unwrap().unwrap();
        let or = compile("app = details or version = v2").unwrap().unwrap();

        let details = attrs(json!({ "app": "details", "version": "v1" }));
        let reviews_v1 = attrs(json!({ "app": "reviews", "version": "v1" }));
        let reviews_v2 = attrs(json!({ "app": "reviews", "version": "v2" }));

        assert!(!and.matches(&details));
        assert!(and.matches(&reviews_v1));
        assert!(!and.matches(&reviews_v2));

        assert!(or.matches(&details));
        assert!(!or.matches(&reviews_v1));
        assert!(or.matches(&reviews_v2));
    }

    #[test]
    fn test_edge_query() {
        let q = compile("protocol = http AND %httperr > 10").unwrap().unwrap();
        assert_eq!(q.target, Target::Edge);
        assert_eq!(q.element_kind(), ElementKind::Edge);
        assert_eq!(
            q.to_string(),
            "edge[protocol = \"http\"][httpPercentErr > 10]"
        );
    }
}
