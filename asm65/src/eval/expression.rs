//! Stack evaluation of postfix expressions with relocation tracking

use crate::assembler::Pass;
use crate::error::SyntaxError;
use crate::parser::lexer::Operator;

/// Value substituted for anything not yet known during pass 1.
pub const PLACEHOLDER: i32 = 0x1000;

/// Whether a value depends on an address, and which byte of it survived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Relocation {
    #[default]
    Absolute,
    Relocatable,
    LowByte,
    HighByte,
}

impl Relocation {
    pub fn is_relocatable(self) -> bool {
        self != Relocation::Absolute
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostfixItem {
    Operand(i32),
    Operator(Operator),
}

/// An expression in evaluation order, with the relocation class the
/// operands gave it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Postfix {
    pub items: Vec<PostfixItem>,
    pub relocation: Relocation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluated {
    pub value: i32,
    pub relocation: Relocation,
}

impl Evaluated {
    pub fn absolute(value: i32) -> Self {
        Self {
            value,
            relocation: Relocation::Absolute,
        }
    }

    pub fn relocatable(value: i32) -> Self {
        Self {
            value,
            relocation: Relocation::Relocatable,
        }
    }
}

pub struct ExpressionEvaluator {
    pass: Pass,
}

impl ExpressionEvaluator {
    pub fn new(pass: Pass) -> Self {
        Self { pass }
    }

    /// Runs the postfix program on a value stack.
    ///
    /// Binary operators pop `a` then `b` and push `b op a`. Exactly one value
    /// must remain at the end.
    pub fn evaluate(&self, postfix: &Postfix) -> Result<Evaluated, SyntaxError> {
        let mut stack: Vec<i32> = Vec::with_capacity(postfix.items.len());
        let mut relocation = postfix.relocation;

        for item in &postfix.items {
            let op = match *item {
                PostfixItem::Operand(value) => {
                    stack.push(value);
                    continue;
                }
                PostfixItem::Operator(op) => op,
            };
            let a = pop(&mut stack)?;
            let result = match op {
                Operator::Negate => a.wrapping_neg(),
                Operator::Tilde => !a,
                Operator::Less => {
                    relocation = match relocation {
                        Relocation::Absolute => Relocation::Absolute,
                        Relocation::HighByte => return Err(SyntaxError::LowByteOfHighByte),
                        _ => Relocation::LowByte,
                    };
                    a & 0xff
                }
                Operator::Greater => {
                    relocation = match relocation {
                        Relocation::Absolute => Relocation::Absolute,
                        Relocation::LowByte => return Err(SyntaxError::HighByteOfLowByte),
                        _ => Relocation::HighByte,
                    };
                    (a >> 8) & 0xff
                }
                _ => {
                    let b = pop(&mut stack)?;
                    self.binary(op, b, a)?
                }
            };
            stack.push(result);
        }

        match stack.as_slice() {
            [value] => Ok(Evaluated {
                value: *value,
                relocation,
            }),
            _ => Err(SyntaxError::Internal(format!(
                "expression left {} values on the stack",
                stack.len()
            ))),
        }
    }

    fn binary(&self, op: Operator, b: i32, a: i32) -> Result<i32, SyntaxError> {
        Ok(match op {
            Operator::Plus => b.wrapping_add(a),
            Operator::Minus => b.wrapping_sub(a),
            Operator::Star => b.wrapping_mul(a),
            Operator::Slash => {
                if a == 0 {
                    if self.pass == Pass::Second {
                        return Err(SyntaxError::DivisionByZero);
                    }
                    tracing::trace!("division by zero in pass 1, using placeholder");
                    PLACEHOLDER
                } else {
                    b.wrapping_div(a)
                }
            }
            Operator::Ampersand => b & a,
            Operator::Pipe => b | a,
            Operator::Caret => b ^ a,
            Operator::ShiftLeft => b.wrapping_shl(a as u32),
            Operator::ShiftRight => b.wrapping_shr(a as u32),
            other => {
                return Err(SyntaxError::Internal(format!(
                    "operator {other:?} in expression"
                )));
            }
        })
    }
}

fn pop(stack: &mut Vec<i32>) -> Result<i32, SyntaxError> {
    stack
        .pop()
        .ok_or_else(|| SyntaxError::Internal("expression stack underflow".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program(items: &[PostfixItem]) -> Postfix {
        Postfix {
            items: items.to_vec(),
            relocation: Relocation::Absolute,
        }
    }

    use PostfixItem::{Operand as N, Operator as Op};

    #[test]
    fn test_evaluate_number() {
        let result = ExpressionEvaluator::new(Pass::Second).evaluate(&program(&[N(42)])).unwrap();
        assert_eq!(result, Evaluated::absolute(42));
    }

    #[test]
    fn test_operand_order() {
        let eval = ExpressionEvaluator::new(Pass::Second);
        // 10 - 3
        let minus = program(&[N(10), N(3), Op(Operator::Minus)]);
        assert_eq!(eval.evaluate(&minus).unwrap().value, 7);
        // 100 / 7
        let div = program(&[N(100), N(7), Op(Operator::Slash)]);
        assert_eq!(eval.evaluate(&div).unwrap().value, 14);
        // 1 << 4
        let shl = program(&[N(1), N(4), Op(Operator::ShiftLeft)]);
        assert_eq!(eval.evaluate(&shl).unwrap().value, 16);
    }

    #[test]
    fn test_unary_operators() {
        let eval = ExpressionEvaluator::new(Pass::Second);
        assert_eq!(eval.evaluate(&program(&[N(5), Op(Operator::Negate)])).unwrap().value, -5);
        assert_eq!(eval.evaluate(&program(&[N(0), Op(Operator::Tilde)])).unwrap().value, -1);
        assert_eq!(eval.evaluate(&program(&[N(0x1234), Op(Operator::Less)])).unwrap().value, 0x34);
        assert_eq!(eval.evaluate(&program(&[N(0x1234), Op(Operator::Greater)])).unwrap().value, 0x12);
    }

    #[test]
    fn test_byte_operators_on_relocatable() {
        let eval = ExpressionEvaluator::new(Pass::Second);
        let mut lo = program(&[N(0x1234), Op(Operator::Less)]);
        lo.relocation = Relocation::Relocatable;
        assert_eq!(eval.evaluate(&lo).unwrap().relocation, Relocation::LowByte);

        let mut hi_of_lo = program(&[N(0x1234), Op(Operator::Less), Op(Operator::Greater)]);
        hi_of_lo.relocation = Relocation::Relocatable;
        assert_eq!(eval.evaluate(&hi_of_lo), Err(SyntaxError::HighByteOfLowByte));

        let mut lo_of_hi = program(&[N(0x1234), Op(Operator::Greater), Op(Operator::Less)]);
        lo_of_hi.relocation = Relocation::Relocatable;
        assert_eq!(eval.evaluate(&lo_of_hi), Err(SyntaxError::LowByteOfHighByte));

        // absolute values may be narrowed freely
        let plain = program(&[N(0x1234), Op(Operator::Greater), Op(Operator::Less)]);
        assert_eq!(eval.evaluate(&plain).unwrap(), Evaluated::absolute(0x12));
    }

    #[test]
    fn test_division_by_zero_per_pass() {
        let div = program(&[N(1), N(0), Op(Operator::Slash)]);
        assert_eq!(
            ExpressionEvaluator::new(Pass::Second).evaluate(&div),
            Err(SyntaxError::DivisionByZero)
        );
        assert_eq!(
            ExpressionEvaluator::new(Pass::First).evaluate(&div).unwrap().value,
            PLACEHOLDER
        );
    }

    #[test]
    fn test_unbalanced_stack_is_internal() {
        let eval = ExpressionEvaluator::new(Pass::Second);
        assert!(matches!(
            eval.evaluate(&program(&[N(1), N(2)])),
            Err(SyntaxError::Internal(_))
        ));
        assert!(matches!(
            eval.evaluate(&program(&[Op(Operator::Plus)])),
            Err(SyntaxError::Internal(_))
        ));
    }
}
