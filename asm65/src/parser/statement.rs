//! Statement level recursive descent
//!
//! Every statement kind starts with a token category no other kind starts
//! with, so one token of lookahead picks the production. Instruction
//! operands are narrowed further to one of the thirteen addressing modes.

use crate::addressing::AddrMode;
use crate::assembler::Pass;
use crate::codegen::MachineCode;
use crate::error::{AsmError, SyntaxError};
use crate::eval::{Evaluated, PLACEHOLDER};
use crate::opcodes::Mnemonic;
use crate::symbol::SymbolTable;
use crate::temp_labels::{resolve_backward, resolve_forward};
use crate::translate::AsciiTranslation;

use super::expression::ExpressionParser;
use super::lexer::{Directive, Lexer, Operator, Register, Token, TokenKind};

/// One parsed source statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Opcode(MachineCode),
    /// `.org expr` or `*= expr`
    NewOrigin(i32),
    Include(String),
    UndefinedStatement,
    /// `@` or `@:`
    TemporaryLabel,
    ByteSequence(Vec<u8>),
    WordSequence(Vec<u16>),
    Label(String),
    Assign {
        name: String,
        value: i32,
        relocatable: bool,
    },
    Proc(String),
    EndProc,
    Eof,
}

/// Per-statement state the driver hands to the parser.
#[derive(Debug, Clone, Copy)]
pub struct ParseContext<'t> {
    pub pass: Pass,
    pub ip: i32,
    /// Anonymous label addresses of the current nesting level, complete in
    /// pass 2.
    pub temp_labels: &'t [i32],
    pub translation: AsciiTranslation,
}

impl<'t> ParseContext<'t> {
    pub fn new(pass: Pass, ip: i32) -> Self {
        Self {
            pass,
            ip,
            temp_labels: &[],
            translation: AsciiTranslation::None,
        }
    }
}

enum Operand {
    Value(Evaluated),
    Token(Token),
}

fn fits_byte(value: i32) -> bool {
    value & !0xff == 0
}

fn fits_word(value: i32) -> bool {
    value & !0xffff == 0
}

fn has_high_byte(value: i32) -> bool {
    value & 0xff00 != 0
}

pub struct StatementParser<'a, 't> {
    lexer: &'a mut Lexer,
    symbols: &'a mut SymbolTable,
    ctx: ParseContext<'t>,
}

impl<'a, 't> StatementParser<'a, 't> {
    pub fn new(lexer: &'a mut Lexer, symbols: &'a mut SymbolTable, ctx: ParseContext<'t>) -> Self {
        Self {
            lexer,
            symbols,
            ctx,
        }
    }

    /// Consumes exactly one statement, its terminating linefeed included.
    pub fn parse(mut self) -> Result<Statement, AsmError> {
        let mut token = self.lexer.next_token(self.symbols)?;
        while token.kind == TokenKind::Linefeed {
            token = self.lexer.next_token(self.symbols)?;
        }

        match token.kind {
            TokenKind::Mnemonic(mnemonic) => self.instruction(mnemonic),
            TokenKind::Eof => Ok(Statement::Eof),
            TokenKind::Directive(Directive::Org) => self.origin(),
            TokenKind::Operator(Operator::Star) => {
                self.expect(TokenKind::Assign, "assign")?;
                self.origin()
            }
            TokenKind::Directive(Directive::Include) => {
                let TokenKind::CharSequence(chars) = self.lexer.next_token(self.symbols)?.kind else {
                    return Err(self.error(SyntaxError::Expected("file name in quotes")));
                };
                self.end_of_statement()?;
                Ok(Statement::Include(String::from_utf8_lossy(&chars).into_owned()))
            }
            TokenKind::TempLabel => {
                self.skip_linefeed()?;
                Ok(Statement::TemporaryLabel)
            }
            TokenKind::Directive(Directive::Byte) => self.byte_sequence(),
            TokenKind::Directive(Directive::Word) => self.word_sequence(),
            TokenKind::Directive(Directive::Proc) => {
                let name = match self.lexer.next_token(self.symbols)?.kind {
                    TokenKind::Identifier { name, .. } | TokenKind::Label { name, .. } => name,
                    _ => return Err(self.error(SyntaxError::Expected("procedure name"))),
                };
                self.end_of_statement()?;
                Ok(Statement::Proc(name))
            }
            TokenKind::Directive(Directive::EndProc) => {
                self.end_of_statement()?;
                Ok(Statement::EndProc)
            }
            TokenKind::Identifier { name, .. } => self.named(name, false, token.column),
            TokenKind::Label { name, .. } => self.named(name, true, token.column),
            _ => Ok(Statement::UndefinedStatement),
        }
    }

    // ===== Helpers =====

    fn error(&self, error: SyntaxError) -> AsmError {
        self.lexer.error(error)
    }

    /// Fails with `error` in pass 2 when a width check did not hold.
    fn check_width(&self, fits: bool, error: SyntaxError) -> Result<(), AsmError> {
        if self.ctx.pass == Pass::Second && !fits {
            return Err(self.error(error));
        }
        Ok(())
    }

    fn expect(&mut self, kind: TokenKind, what: &'static str) -> Result<(), AsmError> {
        if self.lexer.next_token(self.symbols)?.kind != kind {
            return Err(self.error(SyntaxError::Expected(what)));
        }
        Ok(())
    }

    fn skip_linefeed(&mut self) -> Result<(), AsmError> {
        if self.lexer.peek_token(self.symbols)?.kind == TokenKind::Linefeed {
            self.lexer.next_token(self.symbols)?;
        }
        Ok(())
    }

    /// A linefeed is consumed; end of input is left for the next statement.
    fn end_of_statement(&mut self) -> Result<(), AsmError> {
        match self.lexer.peek_token(self.symbols)?.kind {
            TokenKind::Linefeed => {
                self.lexer.next_token(self.symbols)?;
                Ok(())
            }
            TokenKind::Eof => Ok(()),
            _ => Err(self.error(SyntaxError::ExpectedEndOfStatement)),
        }
    }

    fn expression(&mut self) -> Result<Evaluated, AsmError> {
        ExpressionParser::new(self.lexer, self.symbols, self.ctx.pass, self.ctx.ip).evaluate()
    }

    /// An evaluated value if one starts here, otherwise the next raw token.
    fn operand(&mut self) -> Result<Operand, AsmError> {
        let peeked = self.lexer.peek_token(self.symbols)?;
        if ExpressionParser::starts_expression(&peeked.kind) {
            return self.expression().map(Operand::Value);
        }
        let token = self.lexer.next_token(self.symbols)?;
        match token.kind {
            TokenKind::ForwardReference => self.temp_reference(true).map(Operand::Value),
            TokenKind::BackwardReference => self.temp_reference(false).map(Operand::Value),
            _ => Ok(Operand::Token(token)),
        }
    }

    fn expect_value(&mut self, what: &'static str) -> Result<Evaluated, AsmError> {
        match self.operand()? {
            Operand::Value(value) => Ok(value),
            Operand::Token(_) => Err(self.error(SyntaxError::Expected(what))),
        }
    }

    fn temp_reference(&self, forward: bool) -> Result<Evaluated, AsmError> {
        if self.ctx.pass == Pass::First {
            return Ok(Evaluated::absolute(PLACEHOLDER));
        }
        let (found, error) = if forward {
            (
                resolve_forward(self.ctx.temp_labels, self.ctx.ip),
                SyntaxError::UnresolvedForwardReference,
            )
        } else {
            (
                resolve_backward(self.ctx.temp_labels, self.ctx.ip),
                SyntaxError::UnresolvedBackwardReference,
            )
        };
        found
            .map(Evaluated::relocatable)
            .ok_or_else(|| self.error(error))
    }

    // ===== Directives =====

    fn origin(&mut self) -> Result<Statement, AsmError> {
        let origin = self.expect_value("origin address")?;
        self.check_width(fits_word(origin.value), SyntaxError::NumberTooLarge)?;
        self.end_of_statement()?;
        Ok(Statement::NewOrigin(origin.value))
    }

    /// A sequence element; a parenthesised expression is allowed here.
    fn sequence_value(&mut self) -> Result<i32, AsmError> {
        if self.lexer.peek_token(self.symbols)?.kind == TokenKind::LeftParen {
            return Ok(self.expression()?.value);
        }
        Ok(self.expect_value("constant")?.value)
    }

    /// Consumes the separator after an element; false at end of statement.
    fn next_in_sequence(&mut self) -> Result<bool, AsmError> {
        match self.lexer.next_token(self.symbols)?.kind {
            TokenKind::Comma => Ok(true),
            TokenKind::Linefeed | TokenKind::Eof => Ok(false),
            _ => Err(self.error(SyntaxError::ExpectedEndOfStatement)),
        }
    }

    fn byte_sequence(&mut self) -> Result<Statement, AsmError> {
        let mut bytes = Vec::new();
        loop {
            if let TokenKind::CharSequence(chars) = self.lexer.peek_token(self.symbols)?.kind {
                self.lexer.next_token(self.symbols)?;
                bytes.extend(self.ctx.translation.translate_all(&chars));
            } else {
                let value = self.sequence_value()?;
                self.check_width(fits_byte(value), SyntaxError::NumberTooLarge)?;
                bytes.push(value as u8);
            }
            if !self.next_in_sequence()? {
                return Ok(Statement::ByteSequence(bytes));
            }
        }
    }

    fn word_sequence(&mut self) -> Result<Statement, AsmError> {
        let mut words = Vec::new();
        loop {
            let value = self.sequence_value()?;
            self.check_width(fits_word(value), SyntaxError::NumberTooLarge)?;
            words.push(value as u16);
            if !self.next_in_sequence()? {
                return Ok(Statement::WordSequence(words));
            }
        }
    }

    /// `name = expr`, `name:` or a bare `name` in column 1.
    fn named(&mut self, name: String, is_label: bool, column: usize) -> Result<Statement, AsmError> {
        if self.lexer.peek_token(self.symbols)?.kind == TokenKind::Assign {
            if is_label {
                return Err(self.error(SyntaxError::LabelRedefinition(name)));
            }
            self.lexer.next_token(self.symbols)?;
            let value = self.expect_value("constant or identifier")?;
            self.check_width(fits_word(value.value), SyntaxError::NumberTooLarge)?;
            self.end_of_statement()?;
            return Ok(Statement::Assign {
                name,
                value: value.value,
                relocatable: value.relocation.is_relocatable(),
            });
        }
        if !is_label && column != 1 {
            return Err(self.error(SyntaxError::LabelNotInFirstColumn));
        }
        self.skip_linefeed()?;
        Ok(Statement::Label(name))
    }

    // ===== Instructions =====

    fn instruction(&mut self, mnemonic: Mnemonic) -> Result<Statement, AsmError> {
        let (mode, operand) = match self.operand()? {
            Operand::Value(value) => self.direct_or_indexed(mnemonic, value)?,
            Operand::Token(token) => match token.kind {
                TokenKind::Linefeed | TokenKind::Eof => {
                    let mode = if mnemonic.is_shift() {
                        AddrMode::Accumulator
                    } else {
                        AddrMode::Implied
                    };
                    (mode, Evaluated::absolute(0))
                }
                TokenKind::Register(Register::A) => {
                    self.end_of_statement()?;
                    (AddrMode::Accumulator, Evaluated::absolute(0))
                }
                TokenKind::Operator(Operator::Hash) => {
                    let value = self.expect_value("expression")?;
                    self.check_width(fits_byte(value.value), SyntaxError::NumberTooLarge)?;
                    self.end_of_statement()?;
                    (AddrMode::Immediate, value)
                }
                TokenKind::LeftParen => self.indirect()?,
                _ => return Err(self.error(SyntaxError::Expected("operand"))),
            },
        };
        Ok(Statement::Opcode(MachineCode::new(mnemonic, mode, operand.value)))
    }

    fn direct_or_indexed(
        &mut self,
        mnemonic: Mnemonic,
        value: Evaluated,
    ) -> Result<(AddrMode, Evaluated), AsmError> {
        self.check_width(fits_word(value.value), SyntaxError::NumberTooLarge)?;
        let token = self.lexer.next_token(self.symbols)?;
        let zero_page = match token.kind {
            TokenKind::Linefeed | TokenKind::Eof if mnemonic.is_branch() => {
                return Ok((AddrMode::Relative, Evaluated::absolute(value.value)));
            }
            TokenKind::Linefeed | TokenKind::Eof => AddrMode::ZeroPage,
            TokenKind::Comma => {
                let mode = match self.lexer.next_token(self.symbols)?.kind {
                    TokenKind::Register(Register::X) => AddrMode::ZeroPageX,
                    TokenKind::Register(Register::Y) => AddrMode::ZeroPageY,
                    _ => return Err(self.error(SyntaxError::Expected("x or y"))),
                };
                self.end_of_statement()?;
                mode
            }
            _ => return Err(self.error(SyntaxError::ExpectedEndOfStatement)),
        };
        Ok((page_mode(mnemonic, zero_page, value.value), value))
    }

    /// `(expr)`, `(expr,x)` or `(expr),y`; the left parenthesis is consumed.
    fn indirect(&mut self) -> Result<(AddrMode, Evaluated), AsmError> {
        let value = self.expect_value("address")?;
        self.check_width(fits_word(value.value), SyntaxError::NumberTooLarge)?;
        let mode = match self.lexer.next_token(self.symbols)?.kind {
            TokenKind::Comma => {
                self.expect(TokenKind::Register(Register::X), "x")?;
                self.expect(TokenKind::RightParen, "')'")?;
                AddrMode::IndirectX
            }
            TokenKind::RightParen => {
                if self.lexer.peek_token(self.symbols)?.kind == TokenKind::Comma {
                    self.lexer.next_token(self.symbols)?;
                    self.expect(TokenKind::Register(Register::Y), "y")?;
                    AddrMode::IndirectY
                } else {
                    AddrMode::Indirect
                }
            }
            _ => return Err(self.error(SyntaxError::Expected("')'"))),
        };
        self.end_of_statement()?;
        if mode != AddrMode::Indirect {
            self.check_width(fits_byte(value.value), SyntaxError::NeedZeroPage)?;
        }
        Ok((mode, value))
    }
}

/// Zero page when the operand fits and the mnemonic has the zero-page form,
/// the absolute counterpart otherwise.
fn page_mode(mnemonic: Mnemonic, zero_page: AddrMode, value: i32) -> AddrMode {
    let Some(absolute) = zero_page.widened() else {
        return zero_page;
    };
    let modes = mnemonic.modes();
    if has_high_byte(value) || (!modes.contains(zero_page) && modes.contains(absolute)) {
        absolute
    } else {
        zero_page
    }
}
