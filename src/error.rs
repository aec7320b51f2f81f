//! Error handling for schemagen.
//! Defines custom error types and results used throughout the crate.

use std::io;
use thiserror::Error;

/// Custom error types for schema template processing.
///
/// Every error raised while scanning a template carries the origin label of
/// the buffer (a file path or `[memory buffer]`) together with the 1-based
/// line and column of the offending token. The line number is adjusted by
/// the number of fully-commented lines stripped by the loader, so positions
/// always refer to the original file.
#[derive(Error, Debug)]
pub enum Error {
    /// An unrecognized token position, unterminated construct, ill-ordered
    /// conditional tokens, or mismatched `%if`/`%end` pair
    #[error("Invalid syntax in '{origin}' at line {line}, column {column}.")]
    InvalidSyntax {
        origin: String,
        line: usize,
        column: usize,
    },

    /// An attribute name that violates the naming rules
    #[error("Invalid attribute '{attribute}' in '{origin}' at line {line}, column {column}.")]
    InvalidAttribute {
        attribute: String,
        origin: String,
        line: usize,
        column: usize,
    },

    /// A reference to an attribute absent from the environment
    #[error("Unknown attribute '{attribute}' in '{origin}' at line {line}, column {column}.")]
    UnknownAttribute {
        attribute: String,
        origin: String,
        line: usize,
        column: usize,
    },

    /// An emitted attribute whose value is empty
    #[error(
        "Attribute '{attribute}' has no value in '{origin}' at line {line}, column {column}."
    )]
    UndefinedAttributeValue {
        attribute: String,
        origin: String,
        line: usize,
        column: usize,
    },

    /// A `$tok` token absent from the meta-character translation table
    #[error("Invalid metacharacter '{meta}' in '{origin}' at line {line}, column {column}.")]
    InvalidMetaCharacter {
        meta: String,
        origin: String,
        line: usize,
        column: usize,
    },

    /// A comparison operator outside `==`, `!=`, `>`, `<`, `>=`, `<=`
    #[error("Invalid operator '{operator}' in '{origin}' at line {line}, column {column}.")]
    InvalidOperator {
        operator: String,
        origin: String,
        line: usize,
        column: usize,
    },

    /// A `%word` instruction outside the recognized keyword set
    #[error("Invalid instruction '{instruction}' in '{origin}' at line {line}, column {column}.")]
    InvalidInstruction {
        instruction: String,
        origin: String,
        line: usize,
        column: usize,
    },

    /// A target version older than the supported floor
    #[error("Invalid target version '{version}': must be between {minimum} and {maximum}.")]
    InvalidTargetVersion {
        version: String,
        minimum: String,
        maximum: String,
    },

    /// A schema file that could not be opened for reading
    #[error("File '{path}' is not accessible: {source}.")]
    FileNotAccessible {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Convenience type alias for Results with schemagen's Error type.
pub type Result<T> = std::result::Result<T, Error>;
