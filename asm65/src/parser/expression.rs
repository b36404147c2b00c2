//! Infix to postfix translation of operand expressions
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! expression := term (('+' | '-' | '|') term)*
//! term       := unary (('*' | '/' | '&' | '^' | '<<' | '>>') unary)*
//! unary      := ('-' | '\' | '~' | '<' | '>') factor | factor
//! factor     := CONSTANT | '*' | IDENTIFIER | LABEL | '(' expression ')'
//! ```
//!
//! Each operator is appended after its right operand has been translated,
//! which yields postfix order with a single token of lookahead.

use crate::assembler::Pass;
use crate::error::{AsmError, SyntaxError};
use crate::eval::expression::{Postfix, PostfixItem};
use crate::eval::{Evaluated, ExpressionEvaluator, PLACEHOLDER, Relocation};
use crate::symbol::{SymbolKind, SymbolTable};

use super::lexer::{Lexer, Operator, TokenKind};

pub struct ExpressionParser<'a> {
    lexer: &'a mut Lexer,
    symbols: &'a mut SymbolTable,
    pass: Pass,
    ip: i32,
    postfix: Postfix,
}

impl<'a> ExpressionParser<'a> {
    pub fn new(lexer: &'a mut Lexer, symbols: &'a mut SymbolTable, pass: Pass, ip: i32) -> Self {
        Self {
            lexer,
            symbols,
            pass,
            ip,
            postfix: Postfix::default(),
        }
    }

    /// Whether a token can begin an expression.
    pub fn starts_expression(kind: &TokenKind) -> bool {
        matches!(
            kind,
            TokenKind::Constant(_)
                | TokenKind::Identifier { .. }
                | TokenKind::Label { .. }
                | TokenKind::Operator(
                    Operator::Minus
                        | Operator::Negate
                        | Operator::Tilde
                        | Operator::Less
                        | Operator::Greater
                        | Operator::Star
                )
        )
    }

    /// Translates one expression, stopping before the first token that
    /// cannot continue it.
    pub fn parse(mut self) -> Result<Postfix, AsmError> {
        self.expression()?;
        Ok(self.postfix)
    }

    /// Translates and evaluates one expression.
    pub fn evaluate(mut self) -> Result<Evaluated, AsmError> {
        self.expression()?;
        ExpressionEvaluator::new(self.pass)
            .evaluate(&self.postfix)
            .map_err(|error| self.lexer.error(error))
    }

    fn emit(&mut self, item: PostfixItem) {
        self.postfix.items.push(item);
    }

    fn peek_operator(&mut self) -> Result<Option<Operator>, AsmError> {
        match self.lexer.peek_token(self.symbols)?.kind {
            TokenKind::Operator(op) => Ok(Some(op)),
            _ => Ok(None),
        }
    }

    fn expression(&mut self) -> Result<(), AsmError> {
        self.term()?;
        while let Some(op @ (Operator::Plus | Operator::Minus | Operator::Pipe)) = self.peek_operator()? {
            self.lexer.next_token(self.symbols)?;
            self.term()?;
            self.emit(PostfixItem::Operator(op));
        }
        Ok(())
    }

    fn term(&mut self) -> Result<(), AsmError> {
        self.unary()?;
        while let Some(
            op @ (Operator::Star
            | Operator::Slash
            | Operator::Ampersand
            | Operator::Caret
            | Operator::ShiftLeft
            | Operator::ShiftRight),
        ) = self.peek_operator()?
        {
            self.lexer.next_token(self.symbols)?;
            self.unary()?;
            self.emit(PostfixItem::Operator(op));
        }
        Ok(())
    }

    fn unary(&mut self) -> Result<(), AsmError> {
        let op = match self.peek_operator()? {
            Some(Operator::Minus | Operator::Negate) => Operator::Negate,
            Some(op @ (Operator::Tilde | Operator::Less | Operator::Greater)) => op,
            _ => return self.factor(),
        };
        self.lexer.next_token(self.symbols)?;
        self.factor()?;
        self.emit(PostfixItem::Operator(op));
        Ok(())
    }

    fn factor(&mut self) -> Result<(), AsmError> {
        let token = self.lexer.next_token(self.symbols)?;
        match token.kind {
            TokenKind::Constant(value) => self.emit(PostfixItem::Operand(value)),
            TokenKind::Operator(Operator::Star) => {
                self.postfix.relocation = Relocation::Relocatable;
                self.emit(PostfixItem::Operand(self.ip));
            }
            TokenKind::Identifier {
                value: Some(value), ..
            } => self.emit(PostfixItem::Operand(value)),
            TokenKind::Label {
                value: Some(value), ..
            } => {
                self.postfix.relocation = Relocation::Relocatable;
                self.emit(PostfixItem::Operand(value));
            }
            TokenKind::Identifier { name, value: None } => self.unbound(&name, false)?,
            TokenKind::Label { name, value: None } => self.unbound(&name, true)?,
            TokenKind::LeftParen => {
                self.expression()?;
                let close = self.lexer.next_token(self.symbols)?;
                if close.kind != TokenKind::RightParen {
                    return Err(self.lexer.error(SyntaxError::Expected("')'")));
                }
            }
            _ => return Err(self.lexer.error(SyntaxError::Expected("expression"))),
        }
        Ok(())
    }

    /// A name without a value: a placeholder in pass 1, resolved through the
    /// scope chain in pass 2.
    fn unbound(&mut self, name: &str, is_label: bool) -> Result<(), AsmError> {
        if self.pass == Pass::First {
            if is_label {
                self.postfix.relocation = Relocation::Relocatable;
            }
            self.emit(PostfixItem::Operand(PLACEHOLDER));
            return Ok(());
        }
        let Some(symbol) = self.symbols.resolve_defined(name) else {
            return Err(self
                .lexer
                .error(SyntaxError::UndefinedIdentifier(name.to_string())));
        };
        if symbol.kind == SymbolKind::Label {
            self.postfix.relocation = Relocation::Relocatable;
        }
        self.emit(PostfixItem::Operand(symbol.value.unwrap_or(PLACEHOLDER)));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::Symbol;

    fn eval_in(src: &str, symbols: &mut SymbolTable, pass: Pass) -> Result<Evaluated, AsmError> {
        let mut lexer = Lexer::from_source("expr.s", src);
        ExpressionParser::new(&mut lexer, symbols, pass, 0x2000).evaluate()
    }

    fn eval(src: &str) -> i32 {
        eval_in(src, &mut SymbolTable::new(), Pass::Second).unwrap().value
    }

    #[test]
    fn test_precedence() {
        assert_eq!(eval("2+3*4"), 14);
        assert_eq!(eval("(2+3)*4"), 20);
        assert_eq!(eval("10-4-3"), 3);
        assert_eq!(eval("1|2&3"), 3);
        assert_eq!(eval("$ff00 >> 8 + 1"), 0x100);
        assert_eq!(eval("100/10/5"), 2);
    }

    #[test]
    fn test_unary() {
        assert_eq!(eval("-5+10"), 5);
        assert_eq!(eval("\\5"), -5);
        assert_eq!(eval("~0 & $ff"), 0xff);
        assert_eq!(eval("<$1234"), 0x34);
        assert_eq!(eval(">$1234"), 0x12);
        assert_eq!(eval("2*-3"), -6);
    }

    #[test]
    fn test_postfix_order() {
        let mut symbols = SymbolTable::new();
        let mut lexer = Lexer::from_source("expr.s", "1-2*3");
        let postfix = ExpressionParser::new(&mut lexer, &mut symbols, Pass::Second, 0)
            .parse()
            .unwrap();
        assert_eq!(
            postfix.items,
            vec![
                PostfixItem::Operand(1),
                PostfixItem::Operand(2),
                PostfixItem::Operand(3),
                PostfixItem::Operator(Operator::Star),
                PostfixItem::Operator(Operator::Minus),
            ]
        );
    }

    #[test]
    fn test_current_address_is_relocatable() {
        let result = eval_in("*+3", &mut SymbolTable::new(), Pass::Second).unwrap();
        assert_eq!(result, Evaluated::relocatable(0x2003));
        assert_eq!(eval("* * 2"), 0x4000);
    }

    #[test]
    fn test_symbols() {
        let mut symbols = SymbolTable::new();
        symbols.insert("width", Symbol::identifier(Some(40)));
        symbols.insert("screen", Symbol::label(Some(0x0400)));

        let result = eval_in("screen+width*2", &mut symbols, Pass::Second).unwrap();
        assert_eq!(result, Evaluated::relocatable(0x0450));

        let result = eval_in("<screen", &mut symbols, Pass::Second).unwrap();
        assert_eq!(result.relocation, Relocation::LowByte);
    }

    #[test]
    fn test_unknown_identifier_per_pass() {
        let mut symbols = SymbolTable::new();
        let first = eval_in("later+1", &mut symbols, Pass::First).unwrap();
        assert_eq!(first, Evaluated::absolute(PLACEHOLDER + 1));

        let err = eval_in("missing", &mut SymbolTable::new(), Pass::Second).unwrap_err();
        assert_eq!(
            err.syntax(),
            Some(&SyntaxError::UndefinedIdentifier("missing".to_string()))
        );
    }

    #[test]
    fn test_outer_label_found_past_placeholder() {
        let mut symbols = SymbolTable::new();
        symbols.insert("done", Symbol::label(Some(0x1234)));
        symbols.step_into("proc");
        symbols.insert("done", Symbol::identifier(None));
        let result = eval_in("done", &mut symbols, Pass::Second).unwrap();
        assert_eq!(result, Evaluated::relocatable(0x1234));
    }

    #[test]
    fn test_stops_before_unrelated_token() {
        let mut symbols = SymbolTable::new();
        let mut lexer = Lexer::from_source("expr.s", "$10,x");
        let value = ExpressionParser::new(&mut lexer, &mut symbols, Pass::Second, 0)
            .evaluate()
            .unwrap();
        assert_eq!(value.value, 0x10);
        assert_eq!(lexer.next_token(&mut symbols).unwrap().kind, TokenKind::Comma);
    }

    #[test]
    fn test_errors() {
        let err = eval_in("(1+2", &mut SymbolTable::new(), Pass::Second).unwrap_err();
        assert_eq!(err.syntax(), Some(&SyntaxError::Expected("')'")));

        let err = eval_in("4/(2-2)", &mut SymbolTable::new(), Pass::Second).unwrap_err();
        assert_eq!(err.syntax(), Some(&SyntaxError::DivisionByZero));

        let err = eval_in("1+,", &mut SymbolTable::new(), Pass::Second).unwrap_err();
        assert_eq!(err.syntax(), Some(&SyntaxError::Expected("expression")));
    }
}
