//! Lexer primitives for the schema template language.
//!
//! All extractors read at the parser's current `(line, column)` cursor and
//! advance it. None cross line boundaries except [`SchemaParser::get_pure_text`],
//! which is the only construct allowed to span lines.

use crate::error::Result;
use crate::parser::SchemaParser;
use once_cell::sync::Lazy;
use regex::Regex;

pub const CHR_LINE_END: char = '\n';
pub const CHR_TABULATION: char = '\t';
pub const CHR_SPACE: char = ' ';
pub const CHR_INI_ATTRIB: char = '{';
pub const CHR_END_ATTRIB: char = '}';
pub const CHR_INI_CONDITIONAL: char = '%';
pub const CHR_INI_METACHAR: char = '$';
pub const CHR_INI_PURETEXT: char = '[';
pub const CHR_END_PURETEXT: char = ']';
pub const CHR_INI_CEXPR: char = '(';
pub const CHR_END_CEXPR: char = ')';
pub const CHR_VAL_DELIM: char = '"';
pub const CHR_VALUE_OF: char = '@';

pub const TOKEN_IF: &str = "if";
pub const TOKEN_THEN: &str = "then";
pub const TOKEN_ELSE: &str = "else";
pub const TOKEN_END: &str = "end";
pub const TOKEN_OR: &str = "or";
pub const TOKEN_AND: &str = "and";
pub const TOKEN_NOT: &str = "not";
pub const TOKEN_SET: &str = "set";
pub const TOKEN_UNSET: &str = "unset";

pub const TOKEN_META_SP: &str = "sp";
pub const TOKEN_META_BR: &str = "br";
pub const TOKEN_META_TB: &str = "tb";
pub const TOKEN_META_OB: &str = "ob";
pub const TOKEN_META_CB: &str = "cb";
pub const TOKEN_META_OC: &str = "oc";
pub const TOKEN_META_CC: &str = "cc";

/// Valid attribute names: a letter followed by letters, digits, `_` or `-`.
static NAME_REGEXP: Lazy<Regex> =
    Lazy::new(|| Regex::new("^[A-Za-z][A-Za-z0-9_-]*$").unwrap());

/// Returns true when `chr` opens or closes one of the language constructs
/// and therefore terminates a bare word.
pub fn is_special_character(chr: char) -> bool {
    chr == CHR_INI_ATTRIB
        || chr == CHR_END_ATTRIB
        || chr == CHR_INI_CONDITIONAL
        || chr == CHR_INI_METACHAR
        || chr == CHR_INI_PURETEXT
        || chr == CHR_END_PURETEXT
}

/// Validates an attribute name against the naming rules.
pub fn is_valid_name(name: &str) -> bool {
    NAME_REGEXP.is_match(name)
}

/// Reads the character at `column`, treating anything past the end of the
/// line as a line break. Buffered lines always end with `\n`, so this only
/// triggers for cursors parked right after one.
pub(crate) fn char_at(line: &[char], column: usize) -> char {
    line.get(column).copied().unwrap_or(CHR_LINE_END)
}

impl SchemaParser {
    /// Extracts an attribute reference `{name}` at the cursor.
    ///
    /// # Errors
    /// * `Error::InvalidSyntax` if the cursor is not on `{`, or the `}` is
    ///   missing before a blank or the end of the line
    /// * `Error::InvalidAttribute` if the captured name violates the naming
    ///   rules (reported at the opening `{` column)
    pub fn get_attribute(&mut self) -> Result<String> {
        let current_line = self.current_chars();
        let start_column = self.column;
        let mut attrib = String::new();
        let mut end_attrib = false;
        let mut error = char_at(&current_line, self.column) != CHR_INI_ATTRIB;

        if !error {
            self.column += 1;

            loop {
                let chr = char_at(&current_line, self.column);
                if chr == CHR_LINE_END
                    || chr == CHR_SPACE
                    || chr == CHR_TABULATION
                    || end_attrib
                    || error
                {
                    break;
                }

                if chr != CHR_END_ATTRIB {
                    attrib.push(chr);
                } else if !attrib.is_empty() {
                    end_attrib = true;
                } else {
                    error = true;
                }
                self.column += 1;
            }

            // Attribute started but never closed, e.g. `{attr`
            if !end_attrib {
                error = true;
            }
        }

        if error {
            Err(self.syntax_error())
        } else if !is_valid_name(&attrib) {
            Err(self.invalid_attribute_at(&attrib, start_column + 1))
        } else {
            Ok(attrib)
        }
    }

    /// Extracts a bare word: a run of characters that are neither blanks nor
    /// special. Returns an empty string when the cursor is on a special
    /// character.
    pub fn get_word(&mut self) -> String {
        let current_line = self.current_chars();
        let mut word = String::new();

        if !is_special_character(char_at(&current_line, self.column)) {
            loop {
                let chr = char_at(&current_line, self.column);
                if chr == CHR_LINE_END
                    || is_special_character(chr)
                    || chr == CHR_SPACE
                    || chr == CHR_TABULATION
                {
                    break;
                }
                word.push(chr);
                self.column += 1;
            }
        }

        word
    }

    /// Extracts a pure text span `[ … ]`, copied verbatim. Unlike every
    /// other construct, pure text may cross line boundaries, so this method
    /// also handles the line transitions.
    ///
    /// # Errors
    /// * `Error::InvalidSyntax` if the cursor is not on `[`, a nested `[` is
    ///   found, or the buffer ends before the closing `]`
    pub fn get_pure_text(&mut self) -> Result<String> {
        let mut current_line = self.current_chars();
        let mut text = String::new();

        if char_at(&current_line, self.column) != CHR_INI_PURETEXT {
            return Err(self.syntax_error());
        }
        self.column += 1;

        loop {
            let chr = char_at(&current_line, self.column);

            if chr == CHR_END_PURETEXT {
                self.column += 1;
                return Ok(text);
            }
            if chr == CHR_INI_PURETEXT {
                return Err(self.syntax_error());
            }

            text.push(chr);

            if chr == CHR_LINE_END {
                self.line += 1;
                self.column = 0;
                if self.line >= self.buffer.line_count() {
                    return Err(self.syntax_error());
                }
                current_line = self.current_chars();
            } else {
                self.column += 1;
            }
        }
    }

    /// Extracts a conditional token name after `%`. The name is the run of
    /// non-blank characters following the marker; its validity is judged by
    /// the caller.
    ///
    /// # Errors
    /// * `Error::InvalidSyntax` if the cursor is not on `%` or the name is
    ///   empty
    pub fn get_conditional(&mut self) -> Result<String> {
        self.get_marked_token(CHR_INI_CONDITIONAL)
    }

    /// Extracts a meta-character token name after `$`, e.g. `sp` or `br`.
    ///
    /// # Errors
    /// * `Error::InvalidSyntax` if the cursor is not on `$` or the name is
    ///   empty
    pub fn get_meta_character(&mut self) -> Result<String> {
        self.get_marked_token(CHR_INI_METACHAR)
    }

    /// Common extraction for `%`- and `$`-marked tokens: the marker followed
    /// by a run of non-blank characters.
    fn get_marked_token(&mut self, marker: char) -> Result<String> {
        let current_line = self.current_chars();
        let mut token = String::new();

        if char_at(&current_line, self.column) != marker {
            return Err(self.syntax_error());
        }
        self.column += 1;

        loop {
            let chr = char_at(&current_line, self.column);
            if chr == CHR_LINE_END || chr == CHR_SPACE || chr == CHR_TABULATION {
                break;
            }
            token.push(chr);
            self.column += 1;
        }

        if token.is_empty() {
            return Err(self.syntax_error());
        }

        Ok(token)
    }

    /// Advances the cursor over spaces and tabs on the current line.
    pub fn skip_blanks(&mut self) {
        let current_line = self.current_chars();
        while self.column < current_line.len()
            && (current_line[self.column] == CHR_SPACE
                || current_line[self.column] == CHR_TABULATION)
        {
            self.column += 1;
        }
    }

    /// Translates a meta-character token to the literal character it
    /// represents.
    ///
    /// # Errors
    /// * `Error::InvalidMetaCharacter` if the token is not in the table
    pub fn translate_meta_character(&self, meta: &str) -> Result<char> {
        match meta {
            TOKEN_META_SP => Ok(CHR_SPACE),
            TOKEN_META_TB => Ok(CHR_TABULATION),
            TOKEN_META_BR => Ok(CHR_LINE_END),
            TOKEN_META_OB => Ok(CHR_INI_PURETEXT),
            TOKEN_META_CB => Ok(CHR_END_PURETEXT),
            TOKEN_META_OC => Ok(CHR_INI_ATTRIB),
            TOKEN_META_CC => Ok(CHR_END_ATTRIB),
            _ => Err(self.invalid_meta_character(meta)),
        }
    }
}
