//! Core expansion engine for schema templates.
//!
//! [`SchemaParser`] owns the loaded source buffer, the `(line, column)`
//! cursor, and the attribute environment, and drives the whole pipeline:
//! lexer primitives pull tokens, `%if` expressions go through the expression
//! evaluator, `%set`/`%unset` through the directive evaluator, and everything
//! else is routed to the active output sink. Output produced inside a
//! conditional block is buffered per frame and only flushed upward at `%end`,
//! so dead branches emit nothing and nested blocks compose.

use crate::error::{Error, Result};
use crate::lexer::{
    char_at, CHR_END_ATTRIB, CHR_END_PURETEXT, CHR_INI_ATTRIB, CHR_INI_CONDITIONAL,
    CHR_INI_METACHAR, CHR_INI_PURETEXT, CHR_LINE_END, CHR_SPACE, CHR_TABULATION, TOKEN_AND,
    TOKEN_ELSE, TOKEN_END, TOKEN_IF, TOKEN_NOT, TOKEN_OR, TOKEN_SET, TOKEN_THEN, TOKEN_UNSET,
};
use crate::source::{SourceBuffer, MEMORY_BUFFER};
use crate::version;
use indexmap::IndexMap;
use log::debug;
use std::path::Path;

/// The attribute environment: attribute names mapped to string values, in
/// insertion order. An empty value makes the attribute "falsy" in
/// conditional expressions.
pub type AttributeMap = IndexMap<String, String>;

/// One captured piece of a conditional branch. Attribute references are
/// kept unresolved until the block's `%end`, so a `%set` earlier in the same
/// live branch still affects them and dead branches never trigger
/// empty-value errors.
#[derive(Debug, Clone)]
enum Fragment {
    Literal(String),
    AttrRef(String),
}

/// One active `%if` block. `cond_true` holds the result of its expression;
/// the two fragment vectors buffer whatever each arm emits.
#[derive(Debug, Default)]
struct Frame {
    cond_true: bool,
    saw_then: bool,
    saw_else: bool,
    if_fragments: Vec<Fragment>,
    else_fragments: Vec<Fragment>,
}

impl Frame {
    fn new(cond_true: bool) -> Self {
        Frame {
            cond_true,
            ..Default::default()
        }
    }

    /// Whether the branch the parser is currently in is the one selected by
    /// the block's expression.
    fn live(&self) -> bool {
        if self.saw_else {
            !self.cond_true
        } else {
            self.cond_true
        }
    }

    /// The fragment vector currently receiving output for this frame.
    fn active_fragments(&mut self) -> &mut Vec<Fragment> {
        if self.saw_else {
            &mut self.else_fragments
        } else {
            &mut self.if_fragments
        }
    }
}

/// Schema template parser and expander.
///
/// A parser instance is a stateful but non-persistent object: it holds a
/// loaded buffer between `load_*` and `expand`, and the expansion consumes
/// it. Distinct instances are fully independent; expansion is strictly
/// single-threaded and must not be re-entered on the same instance.
#[derive(Debug)]
pub struct SchemaParser {
    pub(crate) buffer: SourceBuffer,
    pub(crate) line: usize,
    pub(crate) column: usize,
    pub(crate) attributes: AttributeMap,
    pub(crate) ignore_unknown: bool,
    pub(crate) ignore_empty: bool,
    pgsql_version: String,
}

impl SchemaParser {
    /// Creates a parser with an empty buffer and the default target version.
    pub fn new() -> Self {
        SchemaParser {
            buffer: SourceBuffer::default(),
            line: 0,
            column: 0,
            attributes: AttributeMap::new(),
            ignore_unknown: false,
            ignore_empty: false,
            pgsql_version: version::DEFAULT_VERSION.to_string(),
        }
    }

    /// Records the target version for the downstream artifacts, exposed to
    /// templates as the implicit `pgsql-version` attribute.
    ///
    /// # Errors
    /// * `Error::InvalidTargetVersion` if the version is older than the
    ///   supported floor. Versions newer than the default (or unparseable
    ///   ones) silently clamp to the default.
    pub fn set_version(&mut self, version: &str) -> Result<()> {
        self.pgsql_version = version::validate(version)?;
        Ok(())
    }

    /// The currently configured target version.
    pub fn version(&self) -> &str {
        &self.pgsql_version
    }

    /// Suppresses `unknown-attribute` errors for the next expansion.
    /// Unknown references are registered with an empty value instead.
    /// The flag resets once the expansion succeeds.
    pub fn ignore_unknown_attributes(&mut self, ignore: bool) {
        self.ignore_unknown = ignore;
    }

    /// Suppresses `undefined-attribute-value` errors for the next expansion,
    /// emitting empty attributes as nothing. The flag resets once the
    /// expansion succeeds.
    pub fn ignore_empty_attributes(&mut self, ignore: bool) {
        self.ignore_empty = ignore;
    }

    /// Loads template text from memory, replacing any previous buffer and
    /// resetting the cursor and attribute environment.
    pub fn load_buffer(&mut self, text: &str) {
        self.restart();
        self.buffer = SourceBuffer::from_text(text, MEMORY_BUFFER);
    }

    /// Loads a template from a schema file.
    ///
    /// # Errors
    /// * `Error::FileNotAccessible` if the file cannot be read
    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.restart();
        self.buffer = SourceBuffer::from_file(path)?;
        Ok(())
    }

    /// Returns the deduplicated list of attribute names referenced as
    /// `{name}` anywhere in the loaded buffer, in order of first appearance.
    pub fn extract_attribute_names(&self) -> Vec<String> {
        let mut attribs: Vec<String> = Vec::new();

        for line in self.buffer.lines() {
            let mut search_from = 0;

            while let Some(pos) = line[search_from..].find(CHR_INI_ATTRIB) {
                let start = search_from + pos;
                match line[start..].find(CHR_END_ATTRIB) {
                    Some(pos) => {
                        let end = start + pos;
                        let name = line[start + 1..end].to_string();
                        if !attribs.contains(&name) {
                            attribs.push(name);
                        }
                        search_from = end;
                    }
                    None => break,
                }
            }
        }

        attribs
    }

    /// Expands the loaded buffer against the given attribute environment and
    /// returns the expanded text. On success the parser state is reset and
    /// the single-shot ignore flags are cleared; the buffer must be loaded
    /// again for another expansion.
    ///
    /// # Arguments
    /// * `attribs` - Attribute environment consulted and mutated during
    ///   expansion (the caller's map is not modified)
    ///
    /// # Errors
    /// Any of the template errors of [`crate::error::Error`], positioned at
    /// the offending token with comment-adjusted line numbers.
    pub fn expand(&mut self, attribs: &AttributeMap) -> Result<String> {
        self.attributes = attribs.clone();
        self.expand_loaded()
    }

    /// Loads a schema file and expands it. The implicit `pgsql-version`
    /// attribute is injected before expansion.
    pub fn expand_file<P: AsRef<Path>>(
        &mut self,
        path: P,
        attribs: &AttributeMap,
    ) -> Result<String> {
        self.load_file(path)?;
        let mut attribs = attribs.clone();
        attribs.insert(
            version::VERSION_ATTRIBUTE.to_string(),
            self.pgsql_version.clone(),
        );
        self.attributes = attribs;
        self.expand_loaded()
    }

    /// Walks the buffer dispatching tokens until exhaustion.
    fn expand_loaded(&mut self) -> Result<String> {
        let mut output = String::new();
        let mut stack: Vec<Frame> = Vec::new();
        let mut cond = String::new();
        let mut if_count = 0usize;
        let mut end_count = 0usize;

        debug!(
            "Expanding '{}' with {} attribute(s).",
            self.buffer.source(),
            self.attributes.len()
        );

        while self.line < self.buffer.line_count() {
            let current_line = self.current_chars();
            let chr = char_at(&current_line, self.column);

            match chr {
                CHR_LINE_END => {
                    self.line += 1;
                    self.column = 0;
                }

                // Blanks outside pure text are control characters, not output
                CHR_SPACE | CHR_TABULATION => self.skip_blanks(),

                CHR_INI_METACHAR => {
                    let meta = self.get_meta_character()?;

                    // A metacharacter may not appear inside an `if` expression
                    if stack.last().is_some_and(|frame| !frame.saw_then) {
                        return Err(self.syntax_error());
                    }

                    let literal = self.translate_meta_character(&meta)?;
                    match stack.last_mut() {
                        Some(frame) => frame
                            .active_fragments()
                            .push(Fragment::Literal(literal.to_string())),
                        None => output.push(literal),
                    }
                }

                // A stray `}` lands here too and fails inside get_attribute
                CHR_INI_ATTRIB | CHR_END_ATTRIB => {
                    let attrib = self.get_attribute()?;

                    if !self.attributes.contains_key(&attrib) {
                        if !self.ignore_unknown {
                            return Err(self.unknown_attribute(&attrib));
                        }
                        self.attributes.insert(attrib.clone(), String::new());
                    }

                    match stack.last_mut() {
                        Some(frame) => {
                            // Inside an `if` expression the reference is
                            // legal but contributes nothing; in a branch body
                            // it is captured unresolved until %end.
                            if frame.saw_then {
                                frame.active_fragments().push(Fragment::AttrRef(attrib));
                            }
                        }
                        None => {
                            let value = self.attribute_value(&attrib).to_string();
                            if value.is_empty() && !self.ignore_empty {
                                return Err(self.undefined_attribute(&attrib));
                            }
                            output.push_str(&value);
                        }
                    }
                }

                CHR_INI_CONDITIONAL => {
                    let prev_cond = std::mem::take(&mut cond);
                    cond = self.get_conditional()?;

                    match cond.as_str() {
                        TOKEN_IF | TOKEN_THEN | TOKEN_ELSE | TOKEN_END | TOKEN_OR | TOKEN_AND
                        | TOKEN_NOT | TOKEN_SET | TOKEN_UNSET => {}
                        _ => return Err(self.invalid_instruction(&cond)),
                    }

                    if cond == TOKEN_SET || cond == TOKEN_UNSET {
                        // Directives only run when every enclosing branch is
                        // live; a dead directive skips its whole line
                        if stack.iter().all(Frame::live) {
                            if cond == TOKEN_SET {
                                self.define_attribute()?;
                            } else {
                                self.unset_attribute()?;
                            }
                        } else {
                            self.column = 0;
                            self.line += 1;
                        }
                    } else {
                        match cond.as_str() {
                            TOKEN_IF => {
                                let cond_true = self.evaluate_expression()?;
                                stack.push(Frame::new(cond_true));
                                if_count += 1;
                            }
                            TOKEN_THEN => match stack.last_mut() {
                                Some(frame) => frame.saw_then = true,
                                None => return Err(self.syntax_error()),
                            },
                            TOKEN_ELSE => match stack.last_mut() {
                                Some(frame) => frame.saw_else = true,
                                None => return Err(self.syntax_error()),
                            },
                            TOKEN_END => match stack.pop() {
                                Some(frame) => {
                                    end_count += 1;
                                    let fragments = if frame.cond_true {
                                        frame.if_fragments
                                    } else {
                                        frame.else_fragments
                                    };

                                    match stack.last_mut() {
                                        // A nested block flushes into the
                                        // enclosing branch, still unresolved
                                        Some(parent) => {
                                            parent.active_fragments().extend(fragments)
                                        }
                                        None => self.flush_fragments(fragments, &mut output)?,
                                    }
                                }
                                None => return Err(self.syntax_error()),
                            },
                            // or/and/not are only meaningful inside an
                            // `if` expression
                            _ => return Err(self.syntax_error()),
                        }

                        // IF pairs with THEN, ELSE is followed by a nested IF
                        // or its END, and THEN never repeats
                        if (prev_cond == TOKEN_IF && cond != TOKEN_THEN)
                            || (prev_cond == TOKEN_ELSE && cond != TOKEN_IF && cond != TOKEN_END)
                            || (prev_cond == TOKEN_THEN && cond == TOKEN_THEN)
                        {
                            return Err(self.syntax_error());
                        }
                    }
                }

                _ => {
                    let word = if chr == CHR_INI_PURETEXT || chr == CHR_END_PURETEXT {
                        self.get_pure_text()?
                    } else {
                        self.get_word()
                    };

                    match stack.last_mut() {
                        Some(frame) => {
                            // Only attributes and comparisons may appear in
                            // an `if` expression
                            if !frame.saw_then {
                                return Err(self.syntax_error());
                            }
                            frame.active_fragments().push(Fragment::Literal(word));
                        }
                        None => output.push_str(&word),
                    }
                }
            }
        }

        // Unbalanced blocks: some %if was never closed (or %end has no %if)
        if if_count != end_count {
            return Err(self.syntax_error());
        }

        self.restart();
        self.ignore_unknown = false;
        self.ignore_empty = false;
        Ok(output)
    }

    /// Resolves a popped frame's fragments into the final output. Attribute
    /// references are resolved against the environment as it stands now,
    /// with the same empty-value policy as top-level references.
    fn flush_fragments(&self, fragments: Vec<Fragment>, output: &mut String) -> Result<()> {
        for fragment in fragments {
            match fragment {
                Fragment::Literal(text) => output.push_str(&text),
                Fragment::AttrRef(attrib) => {
                    let value = self.attribute_value(&attrib);
                    if value.is_empty() && !self.ignore_empty {
                        return Err(self.undefined_attribute(&attrib));
                    }
                    output.push_str(value);
                }
            }
        }
        Ok(())
    }

    /// Clears the buffer and resets the cursor, the comment bookkeeping, and
    /// the attribute environment for a new reading.
    fn restart(&mut self) {
        self.buffer = SourceBuffer::default();
        self.attributes.clear();
        self.line = 0;
        self.column = 0;
    }

    /// Current value of an attribute, empty when absent.
    pub(crate) fn attribute_value(&self, attrib: &str) -> &str {
        self.attributes.get(attrib).map(String::as_str).unwrap_or("")
    }

    /// Characters of the line under the cursor; empty once the buffer is
    /// exhausted.
    pub(crate) fn current_chars(&self) -> Vec<char> {
        if self.line < self.buffer.line_count() {
            self.buffer.line(self.line).chars().collect()
        } else {
            Vec::new()
        }
    }

    /// 1-based line number of the cursor in the original file, adjusted for
    /// stripped comment lines.
    pub(crate) fn error_line(&self) -> usize {
        self.line + self.buffer.comment_count() + 1
    }

    pub(crate) fn syntax_error(&self) -> Error {
        Error::InvalidSyntax {
            origin: self.buffer.source().to_string(),
            line: self.error_line(),
            column: self.column + 1,
        }
    }

    pub(crate) fn invalid_attribute(&self, attrib: &str) -> Error {
        self.invalid_attribute_at(attrib, self.column + 1)
    }

    pub(crate) fn invalid_attribute_at(&self, attrib: &str, column: usize) -> Error {
        Error::InvalidAttribute {
            attribute: attrib.to_string(),
            origin: self.buffer.source().to_string(),
            line: self.error_line(),
            column,
        }
    }

    pub(crate) fn unknown_attribute(&self, attrib: &str) -> Error {
        Error::UnknownAttribute {
            attribute: attrib.to_string(),
            origin: self.buffer.source().to_string(),
            line: self.error_line(),
            column: self.column + 1,
        }
    }

    pub(crate) fn undefined_attribute(&self, attrib: &str) -> Error {
        Error::UndefinedAttributeValue {
            attribute: attrib.to_string(),
            origin: self.buffer.source().to_string(),
            line: self.error_line(),
            column: self.column + 1,
        }
    }

    pub(crate) fn invalid_meta_character(&self, meta: &str) -> Error {
        Error::InvalidMetaCharacter {
            meta: meta.to_string(),
            origin: self.buffer.source().to_string(),
            line: self.error_line(),
            column: self.column + 1,
        }
    }

    pub(crate) fn invalid_operator(&self, oper: &str) -> Error {
        Error::InvalidOperator {
            operator: oper.to_string(),
            origin: self.buffer.source().to_string(),
            line: self.error_line(),
            column: self.column + 1,
        }
    }

    fn invalid_instruction(&self, instruction: &str) -> Error {
        Error::InvalidInstruction {
            instruction: instruction.to_string(),
            origin: self.buffer.source().to_string(),
            line: self.error_line(),
            column: self.column + 1,
        }
    }
}

impl Default for SchemaParser {
    fn default() -> Self {
        SchemaParser::new()
    }
}
