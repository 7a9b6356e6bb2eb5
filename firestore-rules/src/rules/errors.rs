use std::fmt::Formatter;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rules::exprs::{Location, SourceSpan};
use crate::rules::lexer::{location_of, ParserError};

#[derive(Debug, Error)]
pub enum Error {
    #[error("Error parsing incoming JSON context {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Error parsing incoming YAML context {0}")]
    YamlError(#[from] serde_yaml::Error),
    #[error("Formatting error when writing {0}")]
    FormatError(#[from] std::fmt::Error),
    #[error("I/O error when reading {0}")]
    IoError(#[from] std::io::Error),
    #[error("{0}")]
    ParseError(#[from] Diagnostic),
    #[error("The path `{0}` does not exist")]
    FileNotFoundError(String),
    #[error("{0}")]
    IllegalArguments(String),
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Serialize, Deserialize, Hash)]
pub enum DiagnosticKind {
    /// malformed characters, unterminated strings, out of range numbers
    Lexical,
    /// the token stream does not match the grammar
    Syntax,
    /// well formed tokens in an invalid arrangement, e.g. a function without `return`
    Structural,
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DiagnosticKind::Lexical => f.write_str("Lexical")?,
            DiagnosticKind::Syntax => f.write_str("Syntax")?,
            DiagnosticKind::Structural => f.write_str("Structural")?,
        }
        Ok(())
    }
}

///
/// The first problem found in a rules file. Parsing stops at the first
/// diagnostic, there is no recovery.
///
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize, Error)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub span: SourceSpan,
}

impl Diagnostic {
    pub fn lexical(message: impl Into<String>, span: SourceSpan) -> Self {
        Diagnostic {
            kind: DiagnosticKind::Lexical,
            message: message.into(),
            span,
        }
    }

    pub fn syntax(message: impl Into<String>, span: SourceSpan) -> Self {
        Diagnostic {
            kind: DiagnosticKind::Syntax,
            message: message.into(),
            span,
        }
    }

    pub fn structural(message: impl Into<String>, span: SourceSpan) -> Self {
        Diagnostic {
            kind: DiagnosticKind::Structural,
            message: message.into(),
            span,
        }
    }

    pub fn location(&self) -> Location {
        self.span.start
    }

    ///
    /// Renders the diagnostic together with the offending source line and a
    /// caret marker underneath the start of the span.
    ///
    /// ```text
    /// Syntax error in firestore.rules at line 3, column 12: expected `;` after allow rule
    ///   |
    /// 3 |       allow read
    ///   |            ^
    /// ```
    pub fn render(&self, source: &str, file_name: &str) -> String {
        let start = self.span.start;
        let line_text = source
            .lines()
            .nth(start.line.saturating_sub(1) as usize)
            .unwrap_or("");
        let gutter = start.line.to_string();
        let padding = " ".repeat(gutter.len());
        let caret_offset = " ".repeat(start.column.saturating_sub(1));
        let width = if self.span.end.line == start.line && self.span.end.column > start.column {
            self.span.end.column - start.column
        } else {
            1
        };
        format!(
            "{kind} error in {file} at line {line}, column {column}: {message}\n\
             {padding} |\n\
             {gutter} | {line_text}\n\
             {padding} | {caret_offset}{carets}\n",
            kind = self.kind,
            file = file_name,
            line = start.line,
            column = start.column,
            message = self.message,
            carets = "^".repeat(width),
        )
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} error at line {}, column {}: {}",
            self.kind, self.span.start.line, self.span.start.column, self.message
        )
    }
}

impl<'a> From<ParserError<'a>> for Diagnostic {
    fn from(err: ParserError<'a>) -> Self {
        let at = location_of(&err.span);
        let message = if err.context.is_empty() {
            format!("unexpected input {:?}", err.kind)
        } else {
            err.context
        };
        Diagnostic::lexical(message, SourceSpan::point(at))
    }
}

impl<'a> From<nom::Err<ParserError<'a>>> for Diagnostic {
    fn from(err: nom::Err<ParserError<'a>>) -> Self {
        match err {
            nom::Err::Failure(e) | nom::Err::Error(e) => Diagnostic::from(e),
            nom::Err::Incomplete(_) => {
                Diagnostic::lexical("More bytes required for parsing", SourceSpan::default())
            }
        }
    }
}

impl<'a> From<nom::Err<ParserError<'a>>> for Error {
    fn from(err: nom::Err<ParserError<'a>>) -> Self {
        Error::ParseError(Diagnostic::from(err))
    }
}
