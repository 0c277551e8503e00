pub mod compiled;
pub mod complete;
pub mod error;
pub mod field;
pub mod lexer;
pub mod operand;
pub mod splitter;

pub use compiled::{CompiledQuery, assemble, compile};
pub use complete::AutoComplete;
pub use error::ValidationError;
pub use field::{FieldId, OPERANDS, OptionRequest, Target, ValueKind};
pub use lexer::{Lexed, Operator, Span, Token, lex, normalize, tokenize};
pub use operand::{Condition, OperandFragment, compile_operand};
pub use splitter::{Connective, split};
