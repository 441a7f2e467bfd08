//! Error types for the VDF parser.

use std::fmt;

/// Errors that can occur while tokenizing or parsing VDF text.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    /// A quoted string was opened but never closed.
    UnterminatedString {
        /// Line (1-based) where the string started.
        line: usize,
    },
    /// A `[$CONDITION]` tag was opened but never closed.
    UnterminatedConditional {
        /// Line (1-based) where the tag started.
        line: usize,
    },
    /// Unexpected end of input inside a `{ ... }` block.
    UnexpectedEof {
        /// Position in the token stream where EOF was encountered.
        position: usize,
    },
    /// Encountered an unexpected token.
    UnexpectedToken {
        /// Position in the token stream.
        position: usize,
        /// The token that was found.
        token: String,
        /// What was expected instead.
        expected: String,
    },
    /// Something other than a string where a key belongs.
    InvalidKey {
        /// Position in the token stream.
        position: usize,
        /// What was found in key position.
        found: String,
    },
    /// A key with no value or block after it.
    MissingValue {
        /// Position in the token stream where the value was expected.
        position: usize,
        /// The key left without a value.
        key: String,
    },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::UnterminatedString { line } => {
                write!(f, "Missing closing quote for string starting on line {}", line)
            }
            ParseError::UnterminatedConditional { line } => {
                write!(f, "Missing closing ']' for conditional on line {}", line)
            }
            ParseError::UnexpectedEof { position } => {
                write!(
                    f,
                    "Unexpected end of file at position {} (unbalanced braces)",
                    position
                )
            }
            ParseError::UnexpectedToken {
                position,
                token,
                expected,
            } => {
                write!(
                    f,
                    "Unexpected token '{}' at position {}, expected {}",
                    token, position, expected
                )
            }
            ParseError::InvalidKey { position, found } => {
                write!(
                    f,
                    "Invalid key '{}' at position {} (must be a string)",
                    found, position
                )
            }
            ParseError::MissingValue { position, key } => {
                write!(f, "Missing value for key '{}' at position {}", key, position)
            }
        }
    }
}

impl std::error::Error for ParseError {}
