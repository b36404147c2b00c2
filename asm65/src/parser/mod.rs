//! Source parsing: tokens, numeric literals, operand expressions and
//! statements

pub mod lexer;
pub mod number;
pub mod expression;
pub mod statement;

pub use expression::ExpressionParser;
pub use lexer::{Lexer, Token, TokenKind};
pub use statement::{ParseContext, Statement, StatementParser};
