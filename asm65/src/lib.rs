//! Two-pass cross-assembler for the 6502 CPU family
//!
//! Translates assembly source into machine code and writes it as a raw
//! binary, a Commodore 64 program with a load address header, or a hex
//! trace for the screen.
//!
//! ## Features
//! - **Two passes**: labels may be used before they are defined; pass 1
//!   places every label, pass 2 resolves operands and writes the bytes.
//! - **Expressions**: `+ - * / & | ^ << >>`, unary `- \ ~`, low/high byte
//!   `<` and `>`, the current address `*`, parentheses, `$` hex and `%`
//!   binary constants.
//! - **Directives**:
//!   - `.org $xxxx` or `*=$xxxx`: set the origin; forward gaps are zero filled.
//!   - `.byte` / `.byt` / `.db` / `.asc`: bytes and quoted text.
//!   - `.word` / `.dw`: little-endian words.
//!   - `.include "file"`: splice in another source file.
//!   - `.proc name` … `.endproc` (or `.scope` … `.endscope`): nested symbol scopes.
//! - **Labels**: `name:` anywhere, bare `name` in column 1, `name = expr`
//!   assignments and anonymous `@` labels referenced with `@f`/`@+` and
//!   `@b`/`@-`.
//! - **Diagnostics**: every failing statement is reported with file, line
//!   and source text, and assembly continues to find further errors.
//!
//! ## Optional Features
//! - `listing`: enables [`Assembler::write_symbol_listing`].
//!
//! ## Basic Usage
//! ```rust
//! use asm65::Assembler;
//!
//! fn main() -> Result<(), asm65::AsmError> {
//!     let mut assembler = Assembler::new();
//!     let src = r#"
//!         *=$0800
//!         lda #$42
//!         sta $0200
//!     "#;
//!
//!     let bytes = assembler.assemble_bytes(src)?;
//!     assert_eq!(bytes, vec![0xA9, 0x42, 0x8D, 0x00, 0x02]);
//!     Ok(())
//! }
//! ```
//!
//! ## License
//! This project is released under [The Unlicense](https://unlicense.org/).
//! You are free to use it for any purpose, without restriction.

pub mod error;
pub mod opcodes;
pub mod symbol;
pub mod parser;
pub mod addressing;
pub mod eval;
pub mod codegen;
pub mod output;
pub mod translate;
pub mod temp_labels;
pub mod assembler;

// Public exports
pub use addressing::AddrMode;
pub use assembler::{Assembler, AssemblerOptions, AssemblyReport, DEFAULT_ORIGIN, Pass};
pub use codegen::{Encoding, MachineCode, encode};
pub use error::{AsmError, LexError, SourceLocation, SyntaxError};
pub use eval::Relocation;
pub use opcodes::Mnemonic;
pub use output::OutputFormat;
pub use translate::AsciiTranslation;
