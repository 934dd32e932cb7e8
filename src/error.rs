//! Error types for path parsing, text decoding and flat decoding.

use thiserror::Error;

/// Errors produced when parsing a machine-addressable option path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    /// The path string was empty.
    #[error("path is empty")]
    Empty,

    /// A segment had no name (e.g. `A//B` or `:param`).
    #[error("segment {index} has an empty name")]
    EmptyName {
        /// Zero-based segment index.
        index: usize,
    },

    /// A segment had a `:` but no parameter after it.
    #[error("segment {index} has an empty variant parameter")]
    EmptyParameter {
        /// Zero-based segment index.
        index: usize,
    },
}

/// A non-fatal diagnostic for one line of the human-editable text format.
///
/// The offending line is skipped; decoding continues with the next line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IniError {
    #[error("line {line}: expected a name")]
    MissingName { line: usize },

    #[error("line {line}: expected '=' after the name")]
    MissingAssignment { line: usize },

    #[error("line {line}: expected ']' to close the bracket")]
    UnclosedBracket { line: usize },

    #[error("line {line}: unterminated quoted string")]
    UnterminatedQuote { line: usize },

    #[error("line {line}: unexpected character '{found}'")]
    UnexpectedCharacter { line: usize, found: char },

    #[error("line {line}: unexpected text after closing quote")]
    TrailingText { line: usize },
}

impl IniError {
    /// One-based line number the diagnostic refers to.
    pub fn line(&self) -> usize {
        match self {
            IniError::MissingName { line }
            | IniError::MissingAssignment { line }
            | IniError::UnclosedBracket { line }
            | IniError::UnterminatedQuote { line }
            | IniError::UnexpectedCharacter { line, .. }
            | IniError::TrailingText { line } => *line,
        }
    }
}

/// Errors produced when rebuilding a node tree from its flattened form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlatError {
    /// A node declared more variants/children than remain in the flat list.
    #[error(
        "node '{name}' declares {expected} nested nodes but the flat list ended at offset {offset}"
    )]
    Truncated {
        name: String,
        expected: usize,
        offset: usize,
    },

    /// Nodes were left over after every root consumed its subtree.
    #[error("{remaining} unreferenced nodes after offset {offset}")]
    Leftover { remaining: usize, offset: usize },
}
