//! Directive evaluation: `%set` and `%unset`.
//!
//! Directives mutate the attribute environment mid-expansion. The engine
//! only calls them from a live conditional context; in a dead branch the
//! whole directive line is skipped instead.

use crate::error::Result;
use crate::lexer::{
    char_at, is_valid_name, CHR_INI_ATTRIB, CHR_INI_CONDITIONAL, CHR_INI_METACHAR,
    CHR_INI_PURETEXT, CHR_LINE_END, CHR_VALUE_OF,
};
use crate::parser::SchemaParser;

impl SchemaParser {
    /// Executes a `%set` directive, starting right after the `%set` token.
    ///
    /// The first `{name}` names the attribute to assign; with a leading `@`
    /// the named attribute's *current value* becomes the assignment target
    /// instead. The rest of the line is the value expression: attribute
    /// substitutions, pure text (which may span lines), meta-characters, and
    /// literal words, concatenated in order. The assignment is recorded at
    /// end of line.
    ///
    /// # Errors
    /// * `Error::InvalidSyntax` for a `%` in the value region, a missing
    ///   target name, a repeated `@`, or a stray special character
    /// * `Error::InvalidAttribute` when the target name (possibly taken from
    ///   the `@` source's value) violates the naming rules
    /// * `Error::UnknownAttribute` for substitutions outside the environment
    ///   (unless unknown attributes are ignored)
    pub fn define_attribute(&mut self) -> Result<()> {
        let mut new_attrib = String::new();
        let mut value = String::new();
        let mut use_value_as_name = false;
        let mut end_def = false;

        while !end_def {
            self.skip_blanks();
            let current_line = self.current_chars();
            let chr = char_at(&current_line, self.column);

            match chr {
                CHR_LINE_END => end_def = true,

                CHR_VALUE_OF => {
                    if use_value_as_name {
                        return Err(self.syntax_error());
                    }
                    use_value_as_name = true;
                    self.column += 1;
                    new_attrib = self.get_attribute()?;
                }

                CHR_INI_CONDITIONAL => return Err(self.syntax_error()),

                CHR_INI_ATTRIB => {
                    if new_attrib.is_empty() {
                        new_attrib = self.get_attribute()?;
                    } else {
                        // An attribute in the middle of the value substitutes
                        // its current value
                        let attrib = self.get_attribute()?;
                        if !self.attributes.contains_key(&attrib) && !self.ignore_unknown {
                            return Err(self.unknown_attribute(&attrib));
                        }
                        value.push_str(self.attribute_value(&attrib));
                    }
                }

                CHR_INI_PURETEXT => {
                    let text = self.get_pure_text()?;
                    value.push_str(&text);
                }

                CHR_INI_METACHAR => {
                    let meta = self.get_meta_character()?;
                    value.push(self.translate_meta_character(&meta)?);
                }

                _ => {
                    let word = self.get_word();
                    // A stray `}` or `]` opens no token in the value region
                    if word.is_empty() {
                        return Err(self.syntax_error());
                    }
                    value.push_str(&word);
                }
            }

            // Value tokens are only legal once the target is known
            if new_attrib.is_empty() {
                return Err(self.syntax_error());
            }
        }

        let attrib = if use_value_as_name {
            self.attribute_value(&new_attrib).to_string()
        } else {
            new_attrib
        };

        if !is_valid_name(&attrib) {
            return Err(self.invalid_attribute(&attrib));
        }

        self.attributes.insert(attrib, value);
        Ok(())
    }

    /// Executes an `%unset` directive, resetting every listed attribute to
    /// the empty string. Unknown attributes are registered empty when
    /// unknown attributes are ignored, and rejected otherwise.
    ///
    /// # Errors
    /// * `Error::InvalidSyntax` for any non-attribute token on the line
    /// * `Error::UnknownAttribute` as above
    pub fn unset_attribute(&mut self) -> Result<()> {
        loop {
            self.skip_blanks();
            let current_line = self.current_chars();
            let chr = char_at(&current_line, self.column);

            match chr {
                CHR_LINE_END => return Ok(()),

                CHR_INI_ATTRIB => {
                    let attrib = self.get_attribute()?;
                    if !self.attributes.contains_key(&attrib) && !self.ignore_unknown {
                        return Err(self.unknown_attribute(&attrib));
                    }
                    self.attributes.insert(attrib, String::new());
                }

                _ => return Err(self.syntax_error()),
            }
        }
    }
}
