//! Two-pass assembly driver
//!
//! Pass 1 walks every statement to place labels, assignments and anonymous
//! labels without writing anything. Pass 2 walks the same statements again
//! with every address known and writes the encoded bytes. A failing
//! statement is recorded and scanning resumes after it, skipping the rest
//! of the line when the statement could not be parsed; any recorded error
//! fails the run once the pass is over.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, trace, warn};

use crate::codegen;
use crate::error::{AsmError, SourceLocation, SyntaxError};
use crate::output::{Emitter, OutputFormat};
use crate::parser::expression::ExpressionParser;
use crate::parser::lexer::{Lexer, TokenKind};
use crate::parser::statement::{ParseContext, Statement, StatementParser};
use crate::symbol::{LEVEL_LIMIT, Symbol, SymbolKind, SymbolTable};
use crate::temp_labels::TempLabels;
use crate::translate::AsciiTranslation;

/// Origin used until the source sets one.
pub const DEFAULT_ORIGIN: u16 = 0x1000;

/// Maximum depth of nested `.include` files, the main file included.
pub const INCLUDE_LIMIT: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    First,
    Second,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssemblerOptions {
    pub format: OutputFormat,
    pub translation: AsciiTranslation,
    pub origin: u16,
}

impl Default for AssemblerOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::Raw,
            translation: AsciiTranslation::None,
            origin: DEFAULT_ORIGIN,
        }
    }
}

impl AssemblerOptions {
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_translation(mut self, translation: AsciiTranslation) -> Self {
        self.translation = translation;
        self
    }

    pub fn with_origin(mut self, origin: u16) -> Self {
        self.origin = origin;
        self
    }
}

/// Summary of a successful run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssemblyReport {
    /// Address of the first emitted byte, as written into a C64 header.
    pub start_address: u16,
    /// Instruction pointer after the last statement.
    pub end_address: i32,
    /// Bytes emitted, zero fill included and header excluded.
    pub code_size: usize,
}

enum Source<'s> {
    Text { name: &'s str, text: &'s str },
    File(&'s Path),
}

impl Source<'_> {
    fn name(&self) -> String {
        match self {
            Source::Text { name, .. } => name.to_string(),
            Source::File(path) => path.display().to_string(),
        }
    }

    /// A fresh lexer at the start of the source.
    fn lexer(&self) -> Result<Lexer, AsmError> {
        match self {
            Source::Text { name, text } => Ok(Lexer::from_source(*name, text)),
            Source::File(path) => Ok(Lexer::open(path)?),
        }
    }
}

pub struct Assembler {
    options: AssemblerOptions,
    symbols: SymbolTable,
    temp_labels: TempLabels,
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new()
    }
}

impl Assembler {
    pub fn new() -> Self {
        Self::with_options(AssemblerOptions::default())
    }

    pub fn with_options(options: AssemblerOptions) -> Self {
        Self {
            options,
            symbols: SymbolTable::new(),
            temp_labels: TempLabels::new(),
        }
    }

    // ===== Public API =====

    pub fn options(&self) -> &AssemblerOptions {
        &self.options
    }

    pub fn set_format(&mut self, format: OutputFormat) {
        self.options.format = format;
    }

    pub fn set_translation(&mut self, translation: AsciiTranslation) {
        self.options.translation = translation;
    }

    pub fn set_origin(&mut self, origin: u16) {
        self.options.origin = origin;
    }

    pub fn origin(&self) -> u16 {
        self.options.origin
    }

    /// Symbols of the last run.
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Value of a global symbol after a run.
    pub fn lookup(&self, name: &str) -> Option<i32> {
        self.symbols
            .resolve_defined(&name.to_ascii_lowercase())
            .and_then(|symbol| symbol.value)
    }

    pub fn reset(&mut self) {
        self.symbols.clear();
        self.temp_labels = TempLabels::new();
    }

    /// Assembles in-memory source and returns the output bytes.
    pub fn assemble_bytes(&mut self, src: &str) -> Result<Vec<u8>, AsmError> {
        let mut out = Vec::new();
        self.assemble_source("<source>", src, &mut out)?;
        Ok(out)
    }

    /// Assembles in-memory source reported under `name`; includes are
    /// resolved against the working directory.
    pub fn assemble_source<W: Write>(
        &mut self,
        name: &str,
        text: &str,
        writer: W,
    ) -> Result<AssemblyReport, AsmError> {
        self.assemble(&Source::Text { name, text }, || Ok(writer))
    }

    pub fn assemble_file<W: Write>(&mut self, path: &Path, writer: W) -> Result<AssemblyReport, AsmError> {
        self.assemble(&Source::File(path), || Ok(writer))
    }

    /// Assembles `input` into the file `output`.
    ///
    /// The output file is created when pass 2 starts and removed again if
    /// the run fails.
    pub fn assemble_to_path(&mut self, input: &Path, output: &Path) -> Result<AssemblyReport, AsmError> {
        let mut created = false;
        let result = self.assemble(&Source::File(input), || {
            let file = File::create(output)?;
            created = true;
            Ok(BufWriter::new(file))
        });
        if result.is_err() && created {
            if let Err(err) = fs::remove_file(output) {
                warn!(output = %output.display(), %err, "cannot remove partial output");
            }
        }
        result
    }

    /// Evaluates one expression per line in pass 2 arithmetic, with the
    /// current address `*` counting evaluated expressions from zero. Returns the line number
    /// and value of each.
    pub fn evaluate_lines(&mut self, name: &str, text: &str) -> Result<Vec<(usize, i32)>, AsmError> {
        let mut lexer = Lexer::from_source(name, text);
        let mut results = Vec::new();
        let mut ip = 0;
        loop {
            let token = lexer.peek_token(&mut self.symbols)?;
            if token.kind == TokenKind::Eof {
                return Ok(results);
            }
            let value = ExpressionParser::new(&mut lexer, &mut self.symbols, Pass::Second, ip).evaluate()?;
            match lexer.next_token(&mut self.symbols)?.kind {
                TokenKind::Linefeed | TokenKind::Eof => {}
                _ => return Err(lexer.error(SyntaxError::ExpectedEndOfStatement)),
            }
            results.push((token.line, value.value));
            ip += 1;
        }
    }

    #[cfg(feature = "listing")]
    /// Writes every bound symbol as `name = $XXXX`, procedure-local names
    /// qualified with their scope path.
    pub fn write_symbol_listing<W: Write>(&self, mut out: W) -> io::Result<()> {
        for (name, symbol) in self.symbols.entries() {
            if let Some(value) = symbol.value {
                writeln!(out, "{name} = ${value:04X}")?;
            }
        }
        Ok(())
    }

    // ===== Assembly core =====

    fn assemble<W, F>(&mut self, source: &Source, open_output: F) -> Result<AssemblyReport, AsmError>
    where
        W: Write,
        F: FnOnce() -> io::Result<W>,
    {
        self.reset();
        info!(source = %source.name(), format = ?self.options.format, "assembling");

        let first = self.run_pass(Pass::First, source, None::<&mut Emitter<io::Sink>>)?;
        if !first.errors.is_empty() {
            return Err(AsmError::Failed(first.errors));
        }
        let purged: usize = first
            .assigned
            .iter()
            .map(|name| self.symbols.remove_everywhere(name))
            .sum();
        debug!(
            start = format_args!("${:04x}", first.start_address),
            temp_labels = self.temp_labels.count(),
            purged,
            "pass 1 complete"
        );

        let start_address = first.start_address as u16;
        let mut emitter = Emitter::new(open_output()?, self.options.format);
        emitter.begin(start_address)?;
        let second = self.run_pass(Pass::Second, source, Some(&mut emitter))?;
        if !second.errors.is_empty() {
            return Err(AsmError::Failed(second.errors));
        }

        let report = AssemblyReport {
            start_address,
            end_address: second.ip,
            code_size: emitter.size(),
        };
        emitter.finish()?;
        info!(
            start = format_args!("${:04x}", report.start_address),
            size = report.code_size,
            "assembly complete"
        );
        Ok(report)
    }

    fn run_pass<W: Write>(
        &mut self,
        pass: Pass,
        source: &Source,
        emitter: Option<&mut Emitter<W>>,
    ) -> Result<PassOutcome, AsmError> {
        debug!(?pass, "starting pass");
        self.symbols.rewind();
        let origin = i32::from(self.options.origin);
        let mut driver = PassDriver {
            pass,
            translation: self.options.translation,
            symbols: &mut self.symbols,
            temp_labels: &mut self.temp_labels,
            emitter,
            lexers: vec![source.lexer()?],
            ip: origin,
            start_address: origin,
            emitted: false,
            errors: Vec::new(),
            assigned: Vec::new(),
        };
        driver.run()?;
        Ok(PassOutcome {
            ip: driver.ip,
            start_address: driver.start_address,
            errors: driver.errors,
            assigned: driver.assigned,
        })
    }
}

struct PassOutcome {
    ip: i32,
    start_address: i32,
    errors: Vec<AsmError>,
    assigned: Vec<String>,
}

/// State of one pass over the source and its includes.
struct PassDriver<'a, W: Write> {
    pass: Pass,
    translation: AsciiTranslation,
    symbols: &'a mut SymbolTable,
    temp_labels: &'a mut TempLabels,
    emitter: Option<&'a mut Emitter<W>>,
    /// Include stack; the file being read is on top.
    lexers: Vec<Lexer>,
    ip: i32,
    start_address: i32,
    /// Whether any code or data was placed yet.
    emitted: bool,
    errors: Vec<AsmError>,
    /// Names bound by assignments, purged before pass 2.
    assigned: Vec<String>,
}

impl<W: Write> PassDriver<'_, W> {
    fn run(&mut self) -> Result<(), AsmError> {
        loop {
            let open_files = self.lexers.len();
            let Some(lexer) = self.lexers.last_mut() else {
                return Ok(());
            };
            let ctx = ParseContext {
                pass: self.pass,
                ip: self.ip,
                temp_labels: self.temp_labels.level(self.symbols.depth()),
                translation: self.translation,
            };
            // A statement that failed to parse leaves the rest of its line
            // unread. Executed statements were consumed whole, except an
            // undefined one, which stops at its first token.
            let (result, skip_line) = match StatementParser::new(lexer, self.symbols, ctx).parse() {
                Ok(Statement::Eof) if open_files > 1 => {
                    self.lexers.pop();
                    trace!(pass = ?self.pass, "include finished");
                    continue;
                }
                Ok(Statement::Eof) => {
                    if self.pass == Pass::First && self.symbols.depth() != 0 {
                        self.errors.push(lexer.error(SyntaxError::UnclosedScope));
                    }
                    return Ok(());
                }
                Ok(Statement::UndefinedStatement) => (Err(lexer.error(SyntaxError::UndefinedStatement)), true),
                Ok(statement) => (self.execute(statement), false),
                Err(err) => (Err(err), true),
            };
            if let Err(err) = result {
                if err.is_fatal() {
                    return Err(err);
                }
                debug!(pass = ?self.pass, %err, "statement failed");
                self.errors.push(err);
                if skip_line {
                    if let Some(lexer) = self.lexers.last_mut() {
                        lexer.recover();
                    }
                }
            }
        }
    }

    fn error(&self, error: SyntaxError) -> AsmError {
        match self.lexers.last() {
            Some(lexer) => lexer.error(error),
            None => AsmError::Syntax {
                error,
                location: SourceLocation::default(),
            },
        }
    }

    fn execute(&mut self, statement: Statement) -> Result<(), AsmError> {
        trace!(ip = format_args!("${:04x}", self.ip), ?statement);
        match statement {
            Statement::Opcode(code) => {
                let encoding = codegen::encode(&code, self.ip, self.pass).map_err(|err| self.error(err))?;
                if let Some(out) = self.emitter.as_deref_mut() {
                    out.instruction(self.ip, &encoding)?;
                }
                self.ip = self.ip.wrapping_add(i32::from(encoding.size()));
                self.emitted = true;
            }
            Statement::NewOrigin(origin) => self.new_origin(origin)?,
            Statement::Include(name) => self.include(&name)?,
            Statement::UndefinedStatement => return Err(self.error(SyntaxError::UndefinedStatement)),
            Statement::TemporaryLabel => {
                if self.pass == Pass::First {
                    self.temp_labels.record(self.symbols.depth(), self.ip);
                }
            }
            Statement::ByteSequence(bytes) => self.data(&bytes)?,
            Statement::WordSequence(words) => {
                let bytes: Vec<u8> = words.iter().flat_map(|word| word.to_le_bytes()).collect();
                self.data(&bytes)?;
            }
            Statement::Label(name) => {
                if self.pass == Pass::First {
                    self.install_label(name)?;
                }
            }
            Statement::Assign {
                name,
                value,
                relocatable,
            } => {
                let symbol = if relocatable {
                    Symbol::label(Some(value))
                } else {
                    Symbol::identifier(Some(value))
                };
                self.symbols.remove(&name);
                self.symbols.insert(name.clone(), symbol);
                if self.pass == Pass::First {
                    self.assigned.push(name);
                }
            }
            Statement::Proc(name) => {
                if self.pass == Pass::First {
                    self.install_label(name.clone())?;
                }
                if !self.symbols.step_into(&name) {
                    return Err(self.error(SyntaxError::NestingLimit(LEVEL_LIMIT)));
                }
                trace!(pass = ?self.pass, scope = %self.symbols.scope_path(), "entering procedure");
            }
            Statement::EndProc => {
                if !self.symbols.step_out() {
                    return Err(self.error(SyntaxError::UnmatchedEndProc));
                }
            }
            Statement::Eof => {}
        }
        Ok(())
    }

    fn data(&mut self, bytes: &[u8]) -> Result<(), AsmError> {
        if let Some(out) = self.emitter.as_deref_mut() {
            out.data(self.ip, bytes)?;
        }
        self.ip = self.ip.wrapping_add(bytes.len() as i32);
        self.emitted = true;
        Ok(())
    }

    /// Pass 1 fixes the start address until the first byte is placed. Pass 2
    /// zero-fills forward gaps once output has begun.
    fn new_origin(&mut self, origin: i32) -> Result<(), AsmError> {
        match self.pass {
            Pass::First => {
                if origin < 0x100 {
                    return Err(self.error(SyntaxError::ZeroPageOrigin));
                }
                if !self.emitted {
                    self.start_address = origin;
                }
            }
            Pass::Second if self.emitted => {
                if origin < self.ip {
                    return Err(self.error(SyntaxError::BackwardOrigin));
                }
                if let Some(out) = self.emitter.as_deref_mut() {
                    out.fill((origin - self.ip) as usize)?;
                }
            }
            Pass::Second => {}
        }
        debug!(
            pass = ?self.pass,
            from = format_args!("${:04x}", self.ip),
            to = format_args!("${origin:04x}"),
            "new origin"
        );
        self.ip = origin;
        Ok(())
    }

    fn install_label(&mut self, name: String) -> Result<(), AsmError> {
        match self.symbols.lookup_local(&name) {
            Some(Symbol {
                kind: SymbolKind::Label,
                value: Some(_),
            }) => Err(self.error(SyntaxError::LabelRedefinition(name))),
            Some(Symbol {
                kind: SymbolKind::Identifier,
                value: Some(_),
            }) => Err(self.error(SyntaxError::SymbolRedefinition(name))),
            _ => {
                trace!(%name, address = format_args!("${:04x}", self.ip), "label");
                self.symbols.remove(&name);
                self.symbols.insert(name, Symbol::label(Some(self.ip)));
                Ok(())
            }
        }
    }

    /// Include paths are tried as written, then next to the including file.
    fn resolve_include(&self, name: &str) -> Option<PathBuf> {
        let direct = PathBuf::from(name);
        if direct.is_file() {
            return Some(direct);
        }
        let dir = self.lexers.last()?.path()?.parent()?;
        let relative = dir.join(name);
        relative.is_file().then_some(relative)
    }

    fn include(&mut self, name: &str) -> Result<(), AsmError> {
        if self.lexers.len() >= INCLUDE_LIMIT {
            return Err(self.error(SyntaxError::IncludeTooDeep(INCLUDE_LIMIT)));
        }
        let cannot_open = || SyntaxError::CannotOpenFile(name.to_string());
        let path = self.resolve_include(name).ok_or_else(|| self.error(cannot_open()))?;
        let lexer = Lexer::open(&path).map_err(|_| self.error(cannot_open()))?;
        debug!(pass = ?self.pass, file = %path.display(), "including");
        self.lexers.push(lexer);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assemble(src: &str) -> Vec<u8> {
        Assembler::new().assemble_bytes(src).unwrap()
    }

    fn failure(src: &str) -> Vec<AsmError> {
        match Assembler::new().assemble_bytes(src) {
            Err(AsmError::Failed(errors)) => errors,
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn test_simple_program() {
        let src = r#"
            *=$0800
            lda #$42
            sta $0200
        "#;
        assert_eq!(assemble(src), vec![0xA9, 0x42, 0x8D, 0x00, 0x02]);
    }

    #[test]
    fn test_forward_label() {
        let src = "
    jmp end
    nop
end: rts
";
        assert_eq!(assemble(src), vec![0x4C, 0x04, 0x10, 0xEA, 0x60]);
    }

    #[test]
    fn test_labels_and_lookup() {
        let mut asm = Assembler::new();
        asm.assemble_bytes("*=$c000\nstart: nop\nscreen = $0400\n").unwrap();
        assert_eq!(asm.lookup("start"), Some(0xC000));
        assert_eq!(asm.lookup("screen"), Some(0x0400));
        assert_eq!(asm.lookup("nothing"), None);
    }

    #[test]
    fn test_origin_gap_is_zero_filled() {
        let src = "
    nop
    .org $1004
    rts
";
        assert_eq!(assemble(src), vec![0xEA, 0, 0, 0, 0x60]);
    }

    #[test]
    fn test_backward_origin_rejected() {
        let errors = failure("nop\nnop\n*=$1000\nnop\n");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].syntax(), Some(&SyntaxError::BackwardOrigin));
    }

    #[test]
    fn test_zero_page_origin_rejected() {
        let errors = failure("*=$80\nnop\n");
        assert_eq!(errors[0].syntax(), Some(&SyntaxError::ZeroPageOrigin));
    }

    #[test]
    fn test_errors_are_collected() {
        let errors = failure("lda #1\n  foo bar\nsta (1)\n.endproc\n");
        let kinds: Vec<_> = errors.iter().filter_map(AsmError::syntax).collect();
        assert_eq!(
            kinds,
            vec![
                &SyntaxError::LabelNotInFirstColumn,
                &SyntaxError::IllegalAddressingMode,
                &SyntaxError::UnmatchedEndProc,
            ]
        );
    }

    #[test]
    fn test_unclosed_scope() {
        let errors = failure(".proc main\nrts\n");
        assert_eq!(errors[0].syntax(), Some(&SyntaxError::UnclosedScope));
    }

    #[test]
    fn test_label_redefinition() {
        let errors = failure("here: nop\nhere: nop\n");
        assert_eq!(
            errors[0].syntax(),
            Some(&SyntaxError::LabelRedefinition("here".to_string()))
        );
        let errors = failure("n = 1\nn: nop\n");
        assert_eq!(
            errors[0].syntax(),
            Some(&SyntaxError::SymbolRedefinition("n".to_string()))
        );
    }

    #[test]
    fn test_options() {
        let options = AssemblerOptions::default().with_origin(0xC000);
        let mut asm = Assembler::with_options(options);
        assert_eq!(asm.assemble_bytes("jmp *\n").unwrap(), vec![0x4C, 0x00, 0xC0]);

        asm.set_origin(0x2000);
        asm.set_format(OutputFormat::C64);
        asm.set_translation(AsciiTranslation::Upper);
        assert_eq!(asm.origin(), 0x2000);
        assert_eq!(asm.options().translation, AsciiTranslation::Upper);
        assert_eq!(asm.assemble_bytes(".byte \"a\"\n").unwrap(), vec![0x00, 0x20, 1]);
    }

    #[test]
    fn test_evaluate_lines() {
        let mut asm = Assembler::new();
        let results = asm.evaluate_lines("calc", "1+2*3\n\n$10 << 4\n*\n").unwrap();
        assert_eq!(results, vec![(1, 7), (3, 0x100), (4, 2)]);
    }

    #[cfg(feature = "listing")]
    #[test]
    fn test_symbol_listing() {
        let mut asm = Assembler::new();
        asm.assemble_bytes(".proc main\nloop: jmp loop\n.endproc\n").unwrap();
        let mut out = Vec::new();
        asm.write_symbol_listing(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "main = $1000\nmain.loop = $1000\n");
    }
}
