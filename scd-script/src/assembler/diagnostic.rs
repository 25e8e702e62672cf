use std::fmt;

use strum::Display;

use super::lexer::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Numbered as `SCDnnnn` in messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum DiagnosticCode {
    InvalidSymbol = 0,
    UnknownOpcode = 1,
    ExpectedProcName = 2,
    OpcodeOutsideProc = 3,
    ExpectedOpcode = 4,
    ExpectedComma = 5,
    UnknownSymbol = 6,
    LabelAlreadyDefined = 7,
    UndefinedLabel = 8,
    ExpectedVersion = 9,
    IncorrectOperandCount = 10,
    ScriptAlreadyDefined = 11,
    TooManyOperands = 12,
    UnknownDirective = 13,
    ProcNotSupported = 14,
    LabelOutOfRange = 15,
    ExpectedOperand = 16,
    ValueTruncated = 17,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub path: String,
    /// Zero-based.
    pub line: usize,
    /// Zero-based.
    pub column: usize,
    pub severity: Severity,
    pub code: DiagnosticCode,
    pub message: String,
}

impl Diagnostic {
    pub(crate) fn error(path: &str, token: &Token, code: DiagnosticCode, message: String) -> Self {
        Diagnostic {
            path: path.to_string(),
            line: token.line,
            column: token.column,
            severity: Severity::Error,
            code,
            message,
        }
    }

    pub(crate) fn warning(path: &str, token: &Token, code: DiagnosticCode, message: String) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            ..Diagnostic::error(path, token, code, message)
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({},{}): {} SCD{:04}: {}",
            self.path,
            self.line + 1,
            self.column + 1,
            self.severity,
            self.code as u16,
            self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::lexer::TokenKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn display() {
        let token = Token {
            kind: TokenKind::Opcode,
            text: "foo".to_string(),
            line: 2,
            column: 4,
        };
        let d = Diagnostic::error(
            "room.s",
            &token,
            DiagnosticCode::UnknownOpcode,
            "Unknown opcode 'foo'.".to_string(),
        );
        assert_eq!(d.to_string(), "room.s(3,5): error SCD0001: Unknown opcode 'foo'.");
    }
}
