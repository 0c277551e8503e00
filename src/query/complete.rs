/// Tab-style completion of the last word of an expression.
///
/// `set_root` records what the user typed; each `next` returns the text with
/// its last word replaced by the next operand that extends it, cycling
/// through the candidates.
#[derive(Debug, Clone)]
pub struct AutoComplete {
    operands: Vec<String>,
    head: String,
    candidates: Vec<usize>,
    cursor: usize,
}

/// Characters that end a word for completion purposes
const DELIMITERS: [char; 2] = [' ', '!'];

impl AutoComplete {
    pub fn new(operands: &[&str]) -> Self {
        let mut operands: Vec<String> = operands.iter().map(|s| s.to_string()).collect();
        operands.sort();
        operands.dedup();
        Self {
            operands,
            head: String::new(),
            candidates: Vec::new(),
            cursor: 0,
        }
    }

    /// Start completing `text`
    pub fn set_root(&mut self, text: &str) {
        let split_at = text.rfind(DELIMITERS).map(|i| i + 1).unwrap_or(0);
        let (head, word) = text.split_at(split_at);
        let word = word.to_lowercase();

        self.head = head.to_string();
        self.cursor = 0;
        self.candidates = if word.is_empty() {
            Vec::new()
        } else {
            self.operands
                .iter()
                .enumerate()
                .filter(|(_, op)| op.starts_with(&word))
                .map(|(i, _)| i)
                .collect()
        };
    }

    /// Operands that extend the current root, in order
    pub fn candidates(&self) -> impl Iterator<Item = &str> + '_ {
        self.candidates.iter().map(|&i| self.operands[i].as_str())
    }

    /// Next completion of the root text, wrapping around
    pub fn next(&mut self) -> Option<String> {
        if self.candidates.is_empty() {
            return None;
        }
        let operand = &self.operands[self.candidates[self.cursor]];
        self.cursor = (self.cursor + 1) % self.candidates.len();
        Some(format!("{}{}", self.head, operand))
    }
}
