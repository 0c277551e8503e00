use crate::graph::types::{Attributes, label, number, text, truthy};
use crate::query::error::ValidationError;
use crate::query::field::{FieldId, LABEL_PREFIX, Target, ValueKind, label_name};
use crate::query::lexer::{Lexed, Operator, Token};
use crate::query::splitter::Connective;
use std::fmt;
use std::ops::Range;

/// Health status values that count as "not unhealthy" for `!healthy`
const HEALTHY: &str = "Healthy";
const HEALTH_NA: &str = "NA";
const HEALTH_NOT_READY: &str = "Not Ready";

/// Predicate over one element's attributes
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// String comparison
    Text {
        key: &'static str,
        op: Operator,
        value: String,
    },
    /// Numeric comparison; `raw` keeps the value as typed
    Number {
        key: &'static str,
        op: Operator,
        value: f64,
        raw: String,
    },
    /// Whether a counter has a recorded value (`= NaN` / `!= NaN`)
    Recorded { key: &'static str, recorded: bool },
    /// Whether a flag attribute is set
    Flag { key: &'static str, set: bool },
    /// String comparison against a Kubernetes label
    Label {
        name: String,
        op: Operator,
        value: String,
    },
    /// Whether a Kubernetes label is present, whatever its value
    HasLabel { name: String, present: bool },
    /// Any of the conditions holds
    Any(Vec<Condition>),
    /// All of the conditions hold
    All(Vec<Condition>),
}

impl Condition {
    pub fn matches(&self, attrs: &Attributes) -> bool {
        match self {
            Condition::Text { key, op, value } => match text(attrs, key) {
                Some(actual) => compare_text(*op, actual, value),
                None => op.is_negated(),
            },
            Condition::Number { key, op, value, .. } => match number(attrs, key) {
                Some(actual) => compare_number(*op, actual, *value),
                None => *op == Operator::Ne,
            },
            Condition::Recorded { key, recorded } => number(attrs, key).is_some() == *recorded,
            Condition::Flag { key, set } => truthy(attrs, key) == *set,
            Condition::Label { name, op, value } => match label(attrs, name) {
                Some(actual) => compare_text(*op, actual, value),
                None => op.is_negated(),
            },
            Condition::HasLabel { name, present } => label(attrs, name).is_some() == *present,
            Condition::Any(conditions) => conditions.iter().any(|c| c.matches(attrs)),
            Condition::All(conditions) => conditions.iter().all(|c| c.matches(attrs)),
        }
    }

    /// Alternatives of this condition, for selector rendering
    pub(crate) fn alternatives(&self) -> Vec<&Condition> {
        match self {
            Condition::Any(conditions) => conditions.iter().collect(),
            other => vec![other],
        }
    }
}

fn compare_text(op: Operator, actual: &str, expected: &str) -> bool {
    match op {
        Operator::Eq => actual == expected,
        Operator::Ne => actual != expected,
        Operator::Contains => actual.contains(expected),
        Operator::StartsWith => actual.starts_with(expected),
        Operator::EndsWith => actual.ends_with(expected),
        Operator::NotContains => !actual.contains(expected),
        Operator::NotStartsWith => !actual.starts_with(expected),
        Operator::NotEndsWith => !actual.ends_with(expected),
        // rejected at compile time
        Operator::Gt | Operator::Lt | Operator::Ge | Operator::Le => false,
    }
}

fn compare_number(op: Operator, actual: f64, expected: f64) -> bool {
    match op {
        Operator::Eq => actual == expected,
        Operator::Ne => actual != expected,
        Operator::Gt => actual > expected,
        Operator::Lt => actual < expected,
        Operator::Ge => actual >= expected,
        Operator::Le => actual <= expected,
        _ => false,
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Text { key, op, value } => write!(f, "[{key} {op} \"{value}\"]"),
            Condition::Number { key, op, raw, .. } => write!(f, "[{key} {op} {raw}]"),
            // `!` is "undefined": a recorded zero does not match
            Condition::Recorded { key, recorded: false } => write!(f, "[!{key}]"),
            Condition::Recorded { key, recorded: true } => write!(f, "[?{key}]"),
            Condition::Flag { key, set: true } => write!(f, "[?{key}]"),
            Condition::Flag { key, set: false } => write!(f, "[^{key}]"),
            Condition::Label { name, op, value } => {
                write!(f, "[{LABEL_PREFIX}{name} {op} \"{value}\"]")
            }
            Condition::HasLabel { name, present: true } => write!(f, "[?{LABEL_PREFIX}{name}]"),
            Condition::HasLabel { name, present: false } => write!(f, "[^{LABEL_PREFIX}{name}]"),
            Condition::Any(conditions) => {
                for (i, c) in conditions.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{c}")?;
                }
                Ok(())
            }
            Condition::All(conditions) => conditions.iter().try_for_each(|c| write!(f, "{c}")),
        }
    }
}

/// One compiled sub-expression
#[derive(Debug, Clone, PartialEq)]
pub struct OperandFragment {
    pub target: Target,
    pub field: FieldId,
    /// Operator of a binary expression; `None` for flags
    pub operator: Option<Operator>,
    /// Comparison value as typed; `None` for flags
    pub value: Option<String>,
    /// Whether a flag was written with `!`
    pub negated: bool,
    pub condition: Condition,
}

impl OperandFragment {
    pub fn matches(&self, attrs: &Attributes) -> bool {
        self.condition.matches(attrs)
    }

    pub fn is_unary(&self) -> bool {
        self.operator.is_none()
    }
}

impl fmt::Display for OperandFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.condition)
    }
}

/// Compile the tokens `range` of a lexed expression as one fragment.
///
/// `connective` is the connective of the whole expression; the `name`
/// field is only legal with some of them. Error messages quote the
/// fragment as typed.
pub fn compile_operand(
    lexed: &Lexed<'_>,
    range: Range<usize>,
    connective: Option<Connective>,
) -> Result<OperandFragment, ValidationError> {
    let tokens = lexed.tokens.get(range.clone()).unwrap_or_default();
    let first_op = tokens.iter().enumerate().find_map(|(i, t)| match t {
        Token::Op(op) => Some((range.start + i, *op)),
        _ => None,
    });

    match first_op {
        Some((at, op)) => compile_binary(lexed, range.start..at, op, at + 1..range.end, connective),
        None => compile_unary(lexed, range),
    }
}

fn compile_binary(
    lexed: &Lexed<'_>,
    lhs: Range<usize>,
    op: Operator,
    rhs: Range<usize>,
    connective: Option<Connective>,
) -> Result<OperandFragment, ValidationError> {
    let name = match lexed.tokens.get(lhs.clone()).unwrap_or_default() {
        [] => return Err(ValidationError::MissingField(op.to_string())),
        [Token::Word(name)] => name.as_str(),
        [Token::Bang, Token::Word(_)] => {
            return Err(ValidationError::NegatedComparison(
                lexed.source(lhs.start..rhs.end).to_string(),
            ));
        }
        _ => return Err(ValidationError::UnknownOperand(lexed.source(lhs).to_string())),
    };
    let field =
        FieldId::from_operand(name).ok_or_else(|| ValidationError::UnknownOperand(name.to_string()))?;

    let rhs_tokens = lexed.tokens.get(rhs.clone()).unwrap_or_default();
    let value = value_text(rhs_tokens).ok_or_else(|| {
        if rhs_tokens.is_empty() {
            ValidationError::MissingValue(name.to_string())
        } else {
            ValidationError::InvalidValue(lexed.source(rhs).to_string())
        }
    })?;

    let condition = match field.kind() {
        ValueKind::Text => {
            require(op.is_textual(), op, "string")?;
            Condition::Text {
                key: field.key(),
                op,
                value: value.clone(),
            }
        }
        ValueKind::Numeric => numeric_condition(field, op, &value)?,
        ValueKind::NodeKind => {
            require(matches!(op, Operator::Eq | Operator::Ne), op, "node type")?;
            Condition::Text {
                key: field.key(),
                op,
                value: node_kind(&value)?.to_string(),
            }
        }
        ValueKind::Name => name_condition(op, &value, connective)?,
        ValueKind::Label => {
            require(op.is_textual(), op, "string")?;
            Condition::Label {
                name: label_of(name)?,
                op,
                value: value.clone(),
            }
        }
        ValueKind::Flag => return Err(ValidationError::UnknownOperand(name.to_string())),
    };

    Ok(OperandFragment {
        target: field.target(),
        field,
        operator: Some(op),
        value: Some(value),
        negated: false,
        condition,
    })
}

fn label_of(operand: &str) -> Result<String, ValidationError> {
    label_name(operand)
        .map(str::to_string)
        .ok_or_else(|| ValidationError::UnknownOperand(operand.to_string()))
}

/// Words after the operator joined by single spaces; `None` when empty or
/// when anything other than words follows
fn value_text(rhs: &[Token]) -> Option<String> {
    if rhs.is_empty() {
        return None;
    }
    let mut words = Vec::with_capacity(rhs.len());
    for token in rhs {
        match token {
            Token::Word(w) => words.push(w.as_str()),
            _ => return None,
        }
    }
    Some(words.join(" "))
}

fn require(ok: bool, op: Operator, kind: &'static str) -> Result<(), ValidationError> {
    if ok {
        Ok(())
    } else {
        Err(ValidationError::OperatorMismatch {
            op: op.to_string(),
            kind,
        })
    }
}

fn numeric_condition(field: FieldId, op: Operator, value: &str) -> Result<Condition, ValidationError> {
    require(op.is_numeric(), op, "numeric")?;
    let key = field.key();

    if matches!(op, Operator::Eq | Operator::Ne) && value.eq_ignore_ascii_case("nan") {
        if field == FieldId::Rank {
            return Err(ValidationError::InvalidRank(value.to_string()));
        }
        return Ok(Condition::Recorded {
            key,
            recorded: op == Operator::Ne,
        });
    }

    let parsed = value
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| ValidationError::NotNumeric(value.to_string()))?;

    if field == FieldId::Rank && !(1.0..=100.0).contains(&parsed) {
        return Err(ValidationError::InvalidRank(value.to_string()));
    }

    Ok(Condition::Number {
        key,
        op,
        value: parsed,
        raw: value.to_string(),
    })
}

fn node_kind(value: &str) -> Result<&'static str, ValidationError> {
    match value.to_lowercase().as_str() {
        "app" => Ok("app"),
        "svc" | "service" => Ok("service"),
        "wl" | "workload" => Ok("workload"),
        "unknown" => Ok("unknown"),
        _ => Err(ValidationError::InvalidNodeKind(value.to_string())),
    }
}

/// `name` matches the workload, app or service name. A negated comparison
/// must fail all three, so it becomes a conjunction.
fn name_condition(
    op: Operator,
    value: &str,
    connective: Option<Connective>,
) -> Result<Condition, ValidationError> {
    let negated = op.is_negated();
    match connective {
        Some(Connective::Or) if negated => return Err(ValidationError::NameWithNegatedOr),
        Some(Connective::And) => return Err(ValidationError::NameWithAnd),
        _ => {}
    }
    require(op.is_textual(), op, "string")?;

    let parts = [FieldId::Workload, FieldId::App, FieldId::Service]
        .into_iter()
        .map(|field| Condition::Text {
            key: field.key(),
            op,
            value: value.to_string(),
        })
        .collect();

    Ok(if negated {
        Condition::All(parts)
    } else {
        Condition::Any(parts)
    })
}

fn compile_unary(lexed: &Lexed<'_>, range: Range<usize>) -> Result<OperandFragment, ValidationError> {
    let (negated, name) = match lexed.tokens.get(range.clone()).unwrap_or_default() {
        [Token::Word(name)] => (false, name.as_str()),
        [Token::Bang, Token::Word(name)] => (true, name.as_str()),
        [Token::Bang] => return Err(ValidationError::UnknownFlag(String::new())),
        other if other.iter().filter(|t| matches!(t, Token::Word(_))).count() > 1 => {
            return Err(ValidationError::NoOperator(lexed.source(range).to_string()));
        }
        _ => return Err(ValidationError::UnknownFlag(lexed.source(range).to_string())),
    };

    let field = FieldId::from_flag(name).ok_or_else(|| ValidationError::UnknownFlag(name.to_string()))?;
    let key = field.key();

    let condition = match field {
        FieldId::Mtls => Condition::Number {
            key,
            op: if negated { Operator::Le } else { Operator::Gt },
            value: 0.0,
            raw: "0".to_string(),
        },
        FieldId::Healthy if !negated => Condition::Text {
            key,
            op: Operator::Eq,
            value: HEALTHY.to_string(),
        },
        FieldId::Healthy => {
            let mut parts = vec![Condition::Flag { key, set: true }];
            parts.extend([HEALTHY, HEALTH_NA, HEALTH_NOT_READY].into_iter().map(|status| {
                Condition::Text {
                    key,
                    op: Operator::Ne,
                    value: status.to_string(),
                }
            }));
            Condition::All(parts)
        }
        FieldId::Label => Condition::HasLabel {
            name: label_of(name)?,
            present: !negated,
        },
        _ => Condition::Flag {
            key,
            set: negated == field.inverted(),
        },
    };

    Ok(OperandFragment {
        target: field.target(),
        field,
        operator: None,
        value: None,
        negated,
        condition,
    })
}
