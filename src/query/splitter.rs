use crate::query::error::ValidationError;
use crate::query::lexer::Token;
use serde::Serialize;
use std::fmt;
use std::ops::Range;

/// Logical connective joining the fragments of one expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Connective {
    And,
    Or,
}

impl Connective {
    fn token(self) -> Token {
        match self {
            Connective::And => Token::And,
            Connective::Or => Token::Or,
        }
    }
}

impl fmt::Display for Connective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Connective::And => f.write_str("AND"),
            Connective::Or => f.write_str("OR"),
        }
    }
}

/// Expression split into fragments
#[derive(Debug)]
pub struct Split {
    /// Token index range of each fragment
    pub fragments: Vec<Range<usize>>,
    /// `None` when the expression is a single fragment
    pub connective: Option<Connective>,
}

/// Split a normalized token stream on its connective.
///
/// An expression uses one connective throughout; seeing both is an error.
/// An empty stream yields no fragments.
pub fn split(tokens: &[Token]) -> Result<Split, ValidationError> {
    let has_and = tokens.contains(&Token::And);
    let has_or = tokens.contains(&Token::Or);

    let connective = match (has_and, has_or) {
        (true, true) => return Err(ValidationError::MixedConnectives),
        (true, false) => Some(Connective::And),
        (false, true) => Some(Connective::Or),
        (false, false) => None,
    };

    if tokens.is_empty() {
        return Ok(Split {
            fragments: Vec::new(),
            connective: None,
        });
    }

    let fragments: Vec<Range<usize>> = match connective {
        Some(c) => {
            let separator = c.token();
            let mut ranges = Vec::new();
            let mut start = 0;
            for (i, token) in tokens.iter().enumerate() {
                if *token == separator {
                    ranges.push(start..i);
                    start = i + 1;
                }
            }
            ranges.push(start..tokens.len());
            ranges
        }
        None => vec![0..tokens.len()],
    };

    if let Some(c) = connective {
        if fragments.iter().any(|f| f.is_empty()) {
            return Err(ValidationError::MissingOperand(match c {
                Connective::And => "AND",
                Connective::Or => "OR",
            }));
        }
    }

    Ok(Split {
        fragments,
        connective,
    })
}
