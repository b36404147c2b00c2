//! Error types for the assembler
//!
//! Every diagnostic carries a [`SourceLocation`] so it can be rendered as
//! `"<message> in file <file>, line <n>:\n<source line>"`.

use std::fmt;
use std::io;

use thiserror::Error;

/// File, 1-based line/column and text of the line a diagnostic points at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub text: String,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "in file {}, line {}:\n{}", self.file, self.line, self.text)
    }
}

/// Failures while turning characters into tokens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("malformed numeric literal '{0}'")]
    MalformedNumber(String),
    #[error("constant must follow {0} radix")]
    MissingRadixConstant(&'static str),
    #[error("illegal char '{0}' at start of identifier")]
    IllegalIdentifierStart(char),
    #[error("unterminated character sequence")]
    UnterminatedCharSequence,
    #[error("empty character sequence")]
    EmptyCharSequence,
}

/// Syntactic and semantic failures of a statement.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntaxError {
    #[error("illegal addressing mode")]
    IllegalAddressingMode,
    #[error("number too large")]
    NumberTooLarge,
    #[error("need 8 bits for zero page addressing")]
    NeedZeroPage,
    #[error("branch too far (max 126 bytes backwards)")]
    BranchTooFarBackward,
    #[error("branch too far (max 128 bytes forward)")]
    BranchTooFarForward,
    #[error("label redefinition: {0}")]
    LabelRedefinition(String),
    #[error("symbol redefinition: {0}")]
    SymbolRedefinition(String),
    #[error("undefined identifier '{0}'")]
    UndefinedIdentifier(String),
    #[error("found unmatched end of procedure")]
    UnmatchedEndProc,
    #[error("lexical nesting limit of {0} levels reached")]
    NestingLimit(usize),
    #[error("scope is not zero after pass 1, did you forget to end a procedure?")]
    UnclosedScope,
    #[error("cannot set new origin backwards in memory")]
    BackwardOrigin,
    #[error("assembly to zero page not supported")]
    ZeroPageOrigin,
    #[error("division by zero")]
    DivisionByZero,
    #[error("ambiguous byte operator: low byte of a high byte")]
    LowByteOfHighByte,
    #[error("ambiguous byte operator: high byte of a low byte")]
    HighByteOfLowByte,
    #[error("cannot resolve forward reference to temporary label")]
    UnresolvedForwardReference,
    #[error("cannot resolve backward reference to temporary label")]
    UnresolvedBackwardReference,
    #[error("undefined statement")]
    UndefinedStatement,
    #[error("expected end of statement")]
    ExpectedEndOfStatement,
    #[error("expected {0}")]
    Expected(&'static str),
    #[error("label without colon must be on column 1")]
    LabelNotInFirstColumn,
    #[error("cannot open file '{0}'")]
    CannotOpenFile(String),
    #[error("include files nested deeper than {0} levels")]
    IncludeTooDeep(usize),
    #[error("internal assembler error: {0}")]
    Internal(String),
}

#[derive(Debug, Error)]
pub enum AsmError {
    #[error("{error} {location}")]
    Lex {
        error: LexError,
        location: SourceLocation,
    },
    #[error("{error} {location}")]
    Syntax {
        error: SyntaxError,
        location: SourceLocation,
    },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("assembly failed with {} error(s)", .0.len())]
    Failed(Vec<AsmError>),
}

impl AsmError {
    /// Internal invariant breaks and I/O failures stop the run; everything
    /// else is reported and scanning resumes at the next statement.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AsmError::Io(_)
                | AsmError::Syntax {
                    error: SyntaxError::Internal(_),
                    ..
                }
        )
    }

    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            AsmError::Lex { location, .. } | AsmError::Syntax { location, .. } => Some(location),
            _ => None,
        }
    }

    pub fn syntax(&self) -> Option<&SyntaxError> {
        match self {
            AsmError::Syntax { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn lex(&self) -> Option<&LexError> {
        match self {
            AsmError::Lex { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Individual diagnostics of a failed run, or the error itself.
    pub fn diagnostics(&self) -> &[AsmError] {
        match self {
            AsmError::Failed(errors) => errors,
            other => std::slice::from_ref(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location() -> SourceLocation {
        SourceLocation {
            file: "demo.s".to_string(),
            line: 3,
            column: 5,
            text: "    lda #$1234".to_string(),
        }
    }

    #[test]
    fn test_display_carries_context() {
        let err = AsmError::Syntax {
            error: SyntaxError::NumberTooLarge,
            location: location(),
        };
        assert_eq!(
            err.to_string(),
            "number too large in file demo.s, line 3:\n    lda #$1234"
        );
    }

    #[test]
    fn test_fatal_classification() {
        let internal = AsmError::Syntax {
            error: SyntaxError::Internal("stack".into()),
            location: location(),
        };
        let recoverable = AsmError::Lex {
            error: LexError::EmptyCharSequence,
            location: location(),
        };
        assert!(internal.is_fatal());
        assert!(!recoverable.is_fatal());
        assert!(AsmError::from(io::Error::other("disk")).is_fatal());
    }

    #[test]
    fn test_failed_lists_diagnostics() {
        let err = AsmError::Failed(vec![
            AsmError::Syntax {
                error: SyntaxError::UndefinedStatement,
                location: location(),
            },
            AsmError::Syntax {
                error: SyntaxError::DivisionByZero,
                location: location(),
            },
        ]);
        assert_eq!(err.to_string(), "assembly failed with 2 error(s)");
        assert_eq!(err.diagnostics().len(), 2);
        assert_eq!(err.diagnostics()[1].syntax(), Some(&SyntaxError::DivisionByZero));
    }
}
