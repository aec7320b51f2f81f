//! Schemagen is a template processing system for database schema artifacts.
//! It expands parameterized schema files into concrete SQL or XML fragments
//! by resolving attribute references, evaluating conditional blocks, and
//! executing inline directives against an attribute environment.

/// Schema file resolution by object name and kind.
/// Maps an object name to `<root>/<sql|xml>/<name>.sch` and post-processes
/// XML expansions through an entity escaper.
pub mod catalog;

/// Directive evaluation for the template language.
/// Executes `%set` and `%unset` instructions against the attribute
/// environment, including `@` name-from-value indirection.
pub mod directive;

/// Error types and handling for schemagen.
/// Defines custom error types and results used throughout the crate.
pub mod error;

/// Expression evaluation for the template language.
/// Covers boolean conditional expressions (`%and`/`%or`/`%not` over
/// attribute truthiness) and relational comparison expressions with
/// typed coercion.
pub mod expr;

/// Lexer primitives for the template language.
/// Cursor-driven extractors for attribute references, bare words, pure
/// text spans, conditional tokens, and meta-characters.
pub mod lexer;

/// Core expansion engine.
/// Combines all components to produce the final output:
/// - Source buffer loading
/// - Token dispatch
/// - Nested conditional buffering
/// - Attribute substitution
pub mod parser;

/// Source buffer loading.
/// Reads template text, strips comments, normalizes line endings, and
/// keeps the comment count used for diagnostics.
pub mod source;

/// Target version handling.
/// Validates the downstream PostgreSQL version string and exposes it as
/// the implicit `pgsql-version` attribute.
pub mod version;

pub use error::{Error, Result};
pub use parser::{AttributeMap, SchemaParser};
