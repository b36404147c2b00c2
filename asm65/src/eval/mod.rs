//! Expression evaluation

pub mod expression;

pub use expression::{Evaluated, ExpressionEvaluator, PLACEHOLDER, Relocation};
