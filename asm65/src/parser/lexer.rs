//! Tokenizer for assembly source
//!
//! The lexer hands out one [`Token`] at a time. Lookahead is a snapshot of
//! the small [`Cursor`] struct taken before scanning and restored after, so
//! a peek never changes what the next real read returns.
//!
//! Everything outside double quotes is folded to lowercase. Identifiers are
//! interned into the [`SymbolTable`] the first time they are seen; a name
//! directly followed by `:` becomes a label.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{AsmError, LexError, SourceLocation, SyntaxError};
use crate::opcodes::Mnemonic;
use crate::symbol::{Symbol, SymbolKind, SymbolTable};

use super::number::{NumberFormat, NumberParser};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    Org,
    Byte,
    Word,
    Include,
    Proc,
    EndProc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    A,
    X,
    Y,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Plus,
    Minus,
    Star,
    Slash,
    Ampersand,
    Pipe,
    Caret,
    ShiftLeft,
    ShiftRight,
    Less,
    Greater,
    Tilde,
    /// Unary minus, written `\` or produced from a prefix `-`.
    Negate,
    Hash,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Mnemonic(Mnemonic),
    Directive(Directive),
    Register(Register),
    Operator(Operator),
    Assign,
    LeftParen,
    RightParen,
    Comma,
    Constant(i32),
    Identifier { name: String, value: Option<i32> },
    Label { name: String, value: Option<i32> },
    CharSequence(Vec<u8>),
    TempLabel,
    ForwardReference,
    BackwardReference,
    Linefeed,
    Eof,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
}

/// Complete mutable scan state; copying it out and back is a full rewind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    offset: usize,
    line: usize,
    column: usize,
    radix: NumberFormat,
    /// Set after a linefeed token (and at the start of input); further
    /// blank lines are swallowed while it is set.
    after_linefeed: bool,
    /// Where the statement being scanned began.
    statement_line: usize,
    statement_column: usize,
}

impl Cursor {
    fn start() -> Self {
        Self {
            offset: 0,
            line: 1,
            column: 1,
            radix: NumberFormat::Decimal,
            after_linefeed: true,
            statement_line: 1,
            statement_column: 1,
        }
    }
}

fn keyword(word: &str) -> Option<TokenKind> {
    if let Some(mnemonic) = Mnemonic::from_name(word) {
        return Some(TokenKind::Mnemonic(mnemonic));
    }
    let kind = match word {
        "a" => TokenKind::Register(Register::A),
        "x" => TokenKind::Register(Register::X),
        "y" => TokenKind::Register(Register::Y),
        ".org" | "org" => TokenKind::Directive(Directive::Org),
        ".byte" | "byte" | ".byt" | "byt" | ".asc" | "asc" | ".db" | "db" => {
            TokenKind::Directive(Directive::Byte)
        }
        ".word" | "word" | ".dw" | "dw" => TokenKind::Directive(Directive::Word),
        "include" | ".include" => TokenKind::Directive(Directive::Include),
        ".proc" | ".scope" => TokenKind::Directive(Directive::Proc),
        ".endproc" | ".endscope" => TokenKind::Directive(Directive::EndProc),
        _ => return None,
    };
    Some(kind)
}

fn is_ident_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

pub struct Lexer {
    name: String,
    path: Option<PathBuf>,
    source: Vec<u8>,
    cursor: Cursor,
}

impl Lexer {
    /// Binds the lexer to a file, reading it in full.
    pub fn open(path: &Path) -> io::Result<Self> {
        let source = fs::read(path)?;
        Ok(Self::with_source(
            path.display().to_string(),
            Some(path.to_path_buf()),
            source,
        ))
    }

    /// Binds the lexer to in-memory text reported under `name`.
    pub fn from_source(name: impl Into<String>, text: &str) -> Self {
        Self::with_source(name.into(), None, text.as_bytes().to_vec())
    }

    fn with_source(name: String, path: Option<PathBuf>, source: Vec<u8>) -> Self {
        Self {
            name,
            path,
            source,
            cursor: Cursor::start(),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    // ===== Cursor =====

    pub fn snapshot(&self) -> Cursor {
        self.cursor
    }

    pub fn restore(&mut self, cursor: Cursor) {
        self.cursor = cursor;
    }

    fn current(&self) -> Option<u8> {
        self.source.get(self.cursor.offset).copied()
    }

    fn current_folded(&self) -> Option<u8> {
        self.current().map(|c| c.to_ascii_lowercase())
    }

    fn bump(&mut self) {
        self.cursor.offset += 1;
        self.cursor.column += 1;
    }

    /// Consumes one logical newline: LF, CR or CRLF.
    fn newline(&mut self) {
        if self.current() == Some(b'\r') {
            self.cursor.offset += 1;
            if self.current() == Some(b'\n') {
                self.cursor.offset += 1;
            }
        } else {
            self.cursor.offset += 1;
        }
        self.cursor.line += 1;
        self.cursor.column = 1;
    }

    fn skip_blanks(&mut self) {
        while let Some(c) = self.current() {
            match c {
                b' ' | b'\t' | b'\x0c' => self.bump(),
                b';' | b'!' => {
                    while !matches!(self.current(), None | Some(b'\n' | b'\r')) {
                        self.bump();
                    }
                }
                _ => break,
            }
        }
    }

    /// Skips the rest of a statement that failed, so scanning resumes on
    /// the next line.
    pub fn recover(&mut self) {
        if !self.cursor.after_linefeed {
            while !matches!(self.current(), None | Some(b'\n' | b'\r')) {
                self.bump();
            }
            if self.current().is_some() {
                self.newline();
            }
        }
        self.cursor.radix = NumberFormat::Decimal;
        self.cursor.after_linefeed = true;
    }

    // ===== Tokens =====

    pub fn next_token(&mut self, symbols: &mut SymbolTable) -> Result<Token, AsmError> {
        loop {
            self.skip_blanks();
            if matches!(self.current(), Some(b'\n' | b'\r')) {
                let (line, column) = (self.cursor.line, self.cursor.column);
                self.newline();
                if self.cursor.after_linefeed {
                    continue;
                }
                self.cursor.after_linefeed = true;
                return Ok(Token {
                    kind: TokenKind::Linefeed,
                    line,
                    column,
                });
            }
            break;
        }

        let (line, column) = (self.cursor.line, self.cursor.column);
        if self.cursor.after_linefeed {
            self.cursor.statement_line = line;
            self.cursor.statement_column = column;
        }
        self.cursor.after_linefeed = false;

        let kind = match self.current() {
            None => TokenKind::Eof,
            Some(c) => self.scan(c, line, column, symbols)?,
        };
        Ok(Token { kind, line, column })
    }

    /// The token [`next_token`](Self::next_token) would return, without
    /// consuming it.
    pub fn peek_token(&mut self, symbols: &mut SymbolTable) -> Result<Token, AsmError> {
        let saved = self.snapshot();
        let token = self.next_token(symbols);
        self.restore(saved);
        token
    }

    fn scan(
        &mut self,
        c: u8,
        line: usize,
        column: usize,
        symbols: &mut SymbolTable,
    ) -> Result<TokenKind, AsmError> {
        match c.to_ascii_lowercase() {
            b'"' => self.char_sequence(line, column),
            b'$' | b'%' => self.prefixed_constant(line, column),
            b'0'..=b'9' => self.constant(line, column),
            b'@' => {
                self.bump();
                let kind = match self.current_folded() {
                    Some(b'f' | b'+') => TokenKind::ForwardReference,
                    Some(b'b' | b'-') => TokenKind::BackwardReference,
                    Some(b':') => TokenKind::TempLabel,
                    _ => return Ok(TokenKind::TempLabel),
                };
                self.bump();
                Ok(kind)
            }
            b'#' => {
                if self.matches_word(b"#include") {
                    for _ in 0..b"#include".len() {
                        self.bump();
                    }
                    Ok(TokenKind::Directive(Directive::Include))
                } else {
                    self.single(TokenKind::Operator(Operator::Hash))
                }
            }
            b'<' | b'>' => {
                self.bump();
                let doubled = self.current() == Some(c);
                if doubled {
                    self.bump();
                }
                Ok(TokenKind::Operator(match (c, doubled) {
                    (b'<', true) => Operator::ShiftLeft,
                    (b'<', false) => Operator::Less,
                    (_, true) => Operator::ShiftRight,
                    (_, false) => Operator::Greater,
                }))
            }
            b'+' => self.single(TokenKind::Operator(Operator::Plus)),
            b'-' => self.single(TokenKind::Operator(Operator::Minus)),
            b'*' => self.single(TokenKind::Operator(Operator::Star)),
            b'/' => self.single(TokenKind::Operator(Operator::Slash)),
            b'&' => self.single(TokenKind::Operator(Operator::Ampersand)),
            b'|' => self.single(TokenKind::Operator(Operator::Pipe)),
            b'^' => self.single(TokenKind::Operator(Operator::Caret)),
            b'~' => self.single(TokenKind::Operator(Operator::Tilde)),
            b'\\' => self.single(TokenKind::Operator(Operator::Negate)),
            b'=' => self.single(TokenKind::Assign),
            b'(' => self.single(TokenKind::LeftParen),
            b')' => self.single(TokenKind::RightParen),
            b',' => self.single(TokenKind::Comma),
            b'.' | b'_' | b'a'..=b'z' => self.word(line, column, symbols),
            other => {
                self.bump();
                Err(self.lex_error(LexError::IllegalIdentifierStart(other as char), line, column))
            }
        }
    }

    fn single(&mut self, kind: TokenKind) -> Result<TokenKind, AsmError> {
        self.bump();
        Ok(kind)
    }

    fn matches_word(&self, word: &[u8]) -> bool {
        let start = self.cursor.offset;
        let Some(candidate) = self.source.get(start..start + word.len()) else {
            return false;
        };
        candidate.eq_ignore_ascii_case(word)
            && !self
                .source
                .get(start + word.len())
                .is_some_and(|&c| is_ident_char(c))
    }

    fn folded_slice(&self, start: usize) -> String {
        String::from_utf8_lossy(&self.source[start..self.cursor.offset]).to_ascii_lowercase()
    }

    /// `$` or `%` switch the radix for exactly the following constant.
    fn prefixed_constant(&mut self, line: usize, column: usize) -> Result<TokenKind, AsmError> {
        let format = self
            .current()
            .and_then(NumberFormat::from_prefix)
            .unwrap_or(NumberFormat::Decimal);
        self.bump();
        self.cursor.radix = format;
        while matches!(self.current(), Some(b' ' | b'\t')) {
            self.bump();
        }
        let result = match self.current_folded() {
            Some(c) if format.is_digit(c) => self.constant(line, column),
            _ => Err(self.lex_error(LexError::MissingRadixConstant(format.name()), line, column)),
        };
        self.cursor.radix = NumberFormat::Decimal;
        result
    }

    fn constant(&mut self, line: usize, column: usize) -> Result<TokenKind, AsmError> {
        let format = self.cursor.radix;
        let start = self.cursor.offset;
        while self.current_folded().is_some_and(|c| format.is_digit(c)) {
            self.bump();
        }
        if self.current().is_some_and(is_ident_char) {
            while self.current().is_some_and(is_ident_char) {
                self.bump();
            }
            let text = self.folded_slice(start);
            return Err(self.lex_error(LexError::MalformedNumber(text), line, column));
        }
        let digits = self.folded_slice(start);
        NumberParser::parse(&digits, format)
            .map(TokenKind::Constant)
            .map_err(|error| self.lex_error(error, line, column))
    }

    fn char_sequence(&mut self, line: usize, column: usize) -> Result<TokenKind, AsmError> {
        self.bump();
        let start = self.cursor.offset;
        loop {
            match self.current() {
                None | Some(b'\n' | b'\r') => {
                    return Err(self.lex_error(LexError::UnterminatedCharSequence, line, column));
                }
                Some(b'"') => break,
                Some(_) => self.bump(),
            }
        }
        let chars = self.source[start..self.cursor.offset].to_vec();
        self.bump();
        if chars.is_empty() {
            return Err(self.lex_error(LexError::EmptyCharSequence, line, column));
        }
        Ok(TokenKind::CharSequence(chars))
    }

    fn word(
        &mut self,
        line: usize,
        column: usize,
        symbols: &mut SymbolTable,
    ) -> Result<TokenKind, AsmError> {
        let start = self.cursor.offset;
        self.bump();
        while self.current().is_some_and(is_ident_char) {
            self.bump();
        }
        let word = self.folded_slice(start);
        if let Some(kind) = keyword(&word) {
            return Ok(kind);
        }
        let first = word.as_bytes()[0];
        if first == b'.' {
            return Err(self.lex_error(LexError::IllegalIdentifierStart('.'), line, column));
        }
        Ok(self.identifier(word, symbols))
    }

    /// Classifies a name against the symbol table, interning it when new.
    fn identifier(&mut self, name: String, symbols: &mut SymbolTable) -> TokenKind {
        let existing = symbols.lookup(&name);
        if self.current() == Some(b':') {
            self.bump();
            let value = match existing {
                Some(Symbol {
                    kind: SymbolKind::Label,
                    value,
                }) => value,
                Some(Symbol {
                    kind: SymbolKind::Identifier,
                    value: Some(_),
                }) => None,
                _ => {
                    symbols.remove(&name);
                    symbols.insert(name.clone(), Symbol::label(None));
                    None
                }
            };
            return TokenKind::Label { name, value };
        }
        match existing {
            Some(Symbol {
                kind: SymbolKind::Label,
                value,
            }) => TokenKind::Label { name, value },
            Some(Symbol {
                kind: SymbolKind::Identifier,
                value,
            }) => TokenKind::Identifier { name, value },
            None => {
                symbols.insert(name.clone(), Symbol::identifier(None));
                TokenKind::Identifier { name, value: None }
            }
        }
    }

    // ===== Diagnostics =====

    /// Text of the 1-based line `line`, without its line terminator.
    pub fn source_line(&self, line: usize) -> String {
        let mut current = 1;
        let mut start = 0;
        let mut i = 0;
        while i < self.source.len() {
            match self.source[i] {
                b'\n' | b'\r' => {
                    if current == line {
                        break;
                    }
                    i += if self.source[i] == b'\r' && self.source.get(i + 1) == Some(&b'\n') {
                        2
                    } else {
                        1
                    };
                    current += 1;
                    start = i;
                }
                _ => i += 1,
            }
        }
        if current == line {
            String::from_utf8_lossy(&self.source[start..i]).into_owned()
        } else {
            String::new()
        }
    }

    /// Location of the statement being parsed.
    pub fn location(&self) -> SourceLocation {
        SourceLocation {
            file: self.name.clone(),
            line: self.cursor.statement_line,
            column: self.cursor.statement_column,
            text: self.source_line(self.cursor.statement_line),
        }
    }

    pub fn error(&self, error: SyntaxError) -> AsmError {
        AsmError::Syntax {
            error,
            location: self.location(),
        }
    }

    fn lex_error(&self, error: LexError, line: usize, column: usize) -> AsmError {
        AsmError::Lex {
            error,
            location: SourceLocation {
                file: self.name.clone(),
                line,
                column,
                text: self.source_line(line),
            },
        }
    }
}
