//! Tokenizer and normalizer for find/hide expressions.
//!
//! Raw input is split into words, operator symbols, negations and
//! connectives. A second pass rewrites the mnemonic keywords users may type:
//!
//! - `is` / `has` are dropped (`has cb` is `cb`, `!has cb` is `!cb`)
//! - `not` becomes `!`
//! - `contains` / `startswith` / `endswith` become `*=` / `^=` / `$=`
//! - a negation directly in front of an operator folds into it
//!   (`not contains` is `!*=`, `not =` is `!=`)
//!
//! Keywords are only rewritten in front of a fragment's operator; on the
//! value side they are plain words (`app = is`).
//!
//! Operators are recognised by longest match while scanning, so `!=` can
//! never be mistaken for a bare `!` followed by `=`.

use std::fmt;
use std::ops::Range;

/// Byte range of a token in the typed text
pub type Span = Range<usize>;

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    Contains,
    StartsWith,
    EndsWith,
    NotContains,
    NotStartsWith,
    NotEndsWith,
}

impl Operator {
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Ge => ">=",
            Operator::Le => "<=",
            Operator::Contains => "*=",
            Operator::StartsWith => "^=",
            Operator::EndsWith => "$=",
            Operator::NotContains => "!*=",
            Operator::NotStartsWith => "!^=",
            Operator::NotEndsWith => "!$=",
        }
    }

    /// True for the `!`-prefixed operators
    pub fn is_negated(self) -> bool {
        matches!(
            self,
            Operator::Ne | Operator::NotContains | Operator::NotStartsWith | Operator::NotEndsWith
        )
    }

    /// Operators valid against numeric fields
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Operator::Eq | Operator::Ne | Operator::Gt | Operator::Lt | Operator::Ge | Operator::Le
        )
    }

    /// Operators valid against string fields
    pub fn is_textual(self) -> bool {
        !matches!(
            self,
            Operator::Gt | Operator::Lt | Operator::Ge | Operator::Le
        )
    }

    /// Negated form, if the operator has one and is not already negated
    pub fn negate(self) -> Option<Operator> {
        match self {
            Operator::Eq => Some(Operator::Ne),
            Operator::Contains => Some(Operator::NotContains),
            Operator::StartsWith => Some(Operator::NotStartsWith),
            Operator::EndsWith => Some(Operator::NotEndsWith),
            _ => None,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Lexical token
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Field name, flag name or (part of) a value
    Word(String),
    /// Binary comparison operator
    Op(Operator),
    /// Standalone negation
    Bang,
    And,
    Or,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Word(w) => f.write_str(w),
            Token::Op(op) => f.write_str(op.symbol()),
            Token::Bang => f.write_str("!"),
            Token::And => f.write_str("AND"),
            Token::Or => f.write_str("OR"),
        }
    }
}

/// Tokenized expression that remembers where each token came from
#[derive(Debug, Clone)]
pub struct Lexed<'a> {
    pub text: &'a str,
    pub tokens: Vec<Token>,
    pub spans: Vec<Span>,
}

impl<'a> Lexed<'a> {
    /// Typed text covering tokens `range`, as the user wrote it
    pub fn source(&self, range: Range<usize>) -> &'a str {
        if range.is_empty() {
            return "";
        }
        match (self.spans.get(range.start), self.spans.get(range.end - 1)) {
            (Some(first), Some(last)) => &self.text[first.start..last.end],
            _ => "",
        }
    }
}

/// Tokenize and normalize an expression, keeping token positions
pub fn lex(input: &str) -> Lexed<'_> {
    let raw = Lexer::new(input).lex();
    let (tokens, spans) = rewrite_keywords(raw).into_iter().unzip();
    Lexed {
        text: input,
        tokens,
        spans,
    }
}

/// Tokenize and normalize an expression
pub fn tokenize(input: &str) -> Vec<Token> {
    lex(input).tokens
}

/// Canonical text form of an expression.
///
/// Whitespace is collapsed, keywords are rewritten and connectives are
/// uppercased. An empty or blank input yields an empty string.
pub fn normalize(input: &str) -> String {
    render(&tokenize(input))
}

/// Render tokens back to text, one space between tokens except after `!`
pub fn render(tokens: &[Token]) -> String {
    let mut out = String::new();
    let mut glue = false;
    for token in tokens {
        if !out.is_empty() && !glue {
            out.push(' ');
        }
        out.push_str(&token.to_string());
        glue = *token == Token::Bang;
    }
    out
}

/// Character scanner
struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn lex(&mut self) -> Vec<(Token, Span)> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace();
            if self.is_eof() {
                break;
            }

            let start = self.pos;
            let token = match self.lex_operator() {
                Some(token) => token,
                None => self.lex_word(),
            };
            tokens.push((token, start..self.pos));
        }

        tokens
    }

    /// Longest-match operator at the current position
    fn lex_operator(&mut self) -> Option<Token> {
        let rest = self.remaining();

        let (token, len) = if let Some(after) = rest.strip_prefix('!') {
            if after.starts_with('=') {
                (Token::Op(Operator::Ne), 2)
            } else if after.starts_with("*=") {
                (Token::Op(Operator::NotContains), 3)
            } else if after.starts_with("^=") {
                (Token::Op(Operator::NotStartsWith), 3)
            } else if after.starts_with("$=") {
                (Token::Op(Operator::NotEndsWith), 3)
            } else {
                (Token::Bang, 1)
            }
        } else if rest.starts_with(">=") {
            (Token::Op(Operator::Ge), 2)
        } else if rest.starts_with("<=") {
            (Token::Op(Operator::Le), 2)
        } else if rest.starts_with("*=") {
            (Token::Op(Operator::Contains), 2)
        } else if rest.starts_with("^=") {
            (Token::Op(Operator::StartsWith), 2)
        } else if rest.starts_with("$=") {
            (Token::Op(Operator::EndsWith), 2)
        } else if rest.starts_with('=') {
            (Token::Op(Operator::Eq), 1)
        } else if rest.starts_with('>') {
            (Token::Op(Operator::Gt), 1)
        } else if rest.starts_with('<') {
            (Token::Op(Operator::Lt), 1)
        } else {
            return None;
        };

        // all operator characters are ASCII
        self.pos += len;
        Some(token)
    }

    fn lex_word(&mut self) -> Token {
        let start = self.pos;

        while !self.is_eof() {
            let ch = self.peek_char().unwrap_or(' ');
            if ch.is_whitespace() || self.at_operator() {
                break;
            }
            self.advance();
        }

        let word = &self.input[start..self.pos];
        if word.eq_ignore_ascii_case("and") {
            Token::And
        } else if word.eq_ignore_ascii_case("or") {
            Token::Or
        } else {
            Token::Word(word.to_string())
        }
    }

    fn at_operator(&self) -> bool {
        let rest = self.remaining();
        rest.starts_with(['!', '=', '<', '>'])
            || rest.starts_with("*=")
            || rest.starts_with("^=")
            || rest.starts_with("$=")
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance(&mut self) {
        if let Some(ch) = self.peek_char() {
            self.pos += ch.len_utf8();
        }
    }

    fn remaining(&self) -> &str {
        &self.input[self.pos..]
    }
}

/// Keyword rewriting pass
fn rewrite_keywords(raw: Vec<(Token, Span)>) -> Vec<(Token, Span)> {
    let mut out: Vec<(Token, Span)> = Vec::with_capacity(raw.len());
    // past the operator of the current fragment
    let mut in_value = false;

    for (token, span) in raw {
        let token = match token {
            Token::Word(word) if !in_value => match word.to_ascii_lowercase().as_str() {
                "is" | "has" => continue,
                "not" => Token::Bang,
                "contains" => Token::Op(Operator::Contains),
                "startswith" => Token::Op(Operator::StartsWith),
                "endswith" => Token::Op(Operator::EndsWith),
                _ => Token::Word(word),
            },
            other => other,
        };

        match token {
            Token::Op(_) => in_value = true,
            Token::And | Token::Or => in_value = false,
            _ => {}
        }

        // fold a preceding negation into the operator
        if let Token::Op(op) = token {
            if let Some((Token::Bang, bang)) = out.last() {
                if let Some(negated) = op.negate() {
                    let span = bang.start..span.end;
                    out.pop();
                    out.push((Token::Op(negated), span));
                    continue;
                }
            }
        }

        out.push((token, span));
    }

    out
}
