//! Expression evaluation for `%if` blocks.
//!
//! Boolean conditional expressions combine attribute truthiness (non-empty
//! value) and parenthesized comparison expressions with `%and`/`%or`/`%not`.
//! There is no operator precedence: the running truth value is folded
//! left-to-right, each new operand composing through the binary token that
//! preceded it. Evaluation stops at `%then`, which is left for the engine to
//! re-read.

use crate::error::Result;
use crate::lexer::{
    char_at, CHR_END_CEXPR, CHR_INI_ATTRIB, CHR_INI_CEXPR, CHR_INI_CONDITIONAL, CHR_LINE_END,
    CHR_VAL_DELIM, TOKEN_AND, TOKEN_NOT, TOKEN_OR, TOKEN_THEN,
};
use crate::parser::SchemaParser;

pub const TOKEN_EQ_OP: &str = "==";
pub const TOKEN_NE_OP: &str = "!=";
pub const TOKEN_GT_OP: &str = ">";
pub const TOKEN_LT_OP: &str = "<";
pub const TOKEN_GT_EQ_OP: &str = ">=";
pub const TOKEN_LT_EQ_OP: &str = "<=";

/// Characters a comparison operator may be built from, including the
/// `f`/`i` type-coercion suffixes.
const VALID_OPER_CHRS: &str = "=!<>fi";

const OPERS: [&str; 6] = [
    TOKEN_EQ_OP,
    TOKEN_NE_OP,
    TOKEN_GT_OP,
    TOKEN_LT_OP,
    TOKEN_GT_EQ_OP,
    TOKEN_LT_EQ_OP,
];

/// Applies a relational operator to two comparable values.
fn compare<T: PartialOrd>(left: T, right: T, oper: &str) -> bool {
    match oper {
        TOKEN_EQ_OP => left == right,
        TOKEN_NE_OP => left != right,
        TOKEN_GT_OP => left > right,
        TOKEN_LT_OP => left < right,
        TOKEN_GT_EQ_OP => left >= right,
        TOKEN_LT_EQ_OP => left <= right,
        _ => false,
    }
}

impl SchemaParser {
    /// Evaluates the boolean expression of an `%if` block, starting right
    /// after the `%if` token. The expression may span lines. On return the
    /// cursor is rewound to the `%then` token so the engine consumes it.
    ///
    /// # Errors
    /// * `Error::InvalidSyntax` on any ill-formed token sequence, or when
    ///   the expression runs past the end of the buffer
    /// * `Error::UnknownAttribute` for references outside the environment
    ///   (unless unknown attributes are ignored)
    pub fn evaluate_expression(&mut self) -> Result<bool> {
        let mut cond = String::new();
        let mut prev_cond = String::new();
        let mut expr_is_true = true;
        let mut attrib_count = 0usize;
        let mut and_or_count = 0usize;

        loop {
            self.skip_blanks();
            let current_line = self.current_chars();
            let chr = char_at(&current_line, self.column);

            if chr == CHR_LINE_END {
                self.line += 1;
                if self.line >= self.buffer.line_count() {
                    // The expression may not span past the end of the buffer
                    return Err(self.syntax_error());
                }
                self.column = 0;
                continue;
            }

            match chr {
                CHR_INI_CONDITIONAL => {
                    prev_cond = std::mem::take(&mut cond);
                    cond = self.get_conditional()?;

                    // Ill-formed sequences: %or %or, %and %or, %or %and, or
                    // a binary token with no preceding operand
                    let error = cond == prev_cond
                        || (cond == TOKEN_AND && prev_cond == TOKEN_OR)
                        || (cond == TOKEN_OR && prev_cond == TOKEN_AND)
                        || (attrib_count == 0 && (cond == TOKEN_AND || cond == TOKEN_OR));

                    if cond == TOKEN_THEN {
                        // Rewind so the engine re-reads %then
                        self.column -= cond.len() + 1;

                        // %then directly after %not, before any operand, or
                        // with a binary/operand count mismatch
                        if prev_cond == TOKEN_NOT
                            || attrib_count == 0
                            || and_or_count != attrib_count - 1
                        {
                            return Err(self.syntax_error());
                        }
                        return Ok(expr_is_true);
                    }

                    if error {
                        return Err(self.syntax_error());
                    }

                    if cond == TOKEN_OR || cond == TOKEN_AND {
                        and_or_count += 1;
                    }
                }

                CHR_INI_ATTRIB => {
                    let attrib = self.get_attribute()?;

                    if !self.attributes.contains_key(&attrib) && !self.ignore_unknown {
                        return Err(self.unknown_attribute(&attrib));
                    }

                    // A non-composing token before the operand, a dangling
                    // %not, or two operands with no binary between them
                    let error = (!cond.is_empty()
                        && cond != TOKEN_OR
                        && cond != TOKEN_AND
                        && cond != TOKEN_NOT)
                        || (attrib_count > 0 && cond == TOKEN_NOT && prev_cond.is_empty())
                        || (attrib_count > 0 && cond.is_empty());

                    attrib_count += 1;

                    if error {
                        return Err(self.syntax_error());
                    }

                    let attrib_true = if cond == TOKEN_NOT {
                        self.attribute_value(&attrib).is_empty()
                    } else {
                        !self.attribute_value(&attrib).is_empty()
                    };

                    expr_is_true = fold(expr_is_true, attrib_true, &cond, &prev_cond);
                    cond.clear();
                    prev_cond.clear();
                }

                CHR_INI_CEXPR => {
                    let mut comp_true = self.evaluate_comparison()?;

                    if cond == TOKEN_NOT {
                        comp_true = !comp_true;
                    }

                    expr_is_true = fold(expr_is_true, comp_true, &cond, &prev_cond);

                    // A comparison counts as one operand
                    attrib_count += 1;
                    cond.clear();
                    prev_cond.clear();
                }

                _ => return Err(self.syntax_error()),
            }
        }
    }

    /// Evaluates a relational comparison expression `( {attr} OP "value" )`.
    /// The cursor sits on the opening parenthesis; the whole expression must
    /// sit on one line. `OP` optionally carries a `f` (float) or `i`
    /// (integer) coercion suffix; without one the comparison is
    /// lexicographic.
    ///
    /// # Errors
    /// * `Error::InvalidSyntax` on a missing element or a line break inside
    ///   the expression
    /// * `Error::InvalidOperator` when the operator is not relational or
    ///   grows past three characters
    /// * `Error::UnknownAttribute` as in [`SchemaParser::evaluate_expression`]
    pub fn evaluate_comparison(&mut self) -> Result<bool> {
        let current_line = self.current_chars();
        let mut attrib = String::new();
        let mut oper = String::new();
        let mut value = String::new();

        self.column += 1;

        loop {
            self.skip_blanks();
            let chr = char_at(&current_line, self.column);

            if chr == CHR_LINE_END {
                return Err(self.syntax_error());
            }

            match chr {
                // The attribute is the first element of the expression
                CHR_INI_ATTRIB => {
                    if attrib.is_empty() && oper.is_empty() && value.is_empty() {
                        attrib = self.get_attribute()?;
                    } else {
                        return Err(self.syntax_error());
                    }
                }

                // The quoted value is the last element
                CHR_VAL_DELIM => {
                    if !value.is_empty() || attrib.is_empty() || oper.is_empty() {
                        return Err(self.syntax_error());
                    }

                    value.push(chr);
                    self.column += 1;

                    while self.column < current_line.len() {
                        value.push(current_line[self.column]);
                        self.column += 1;

                        if char_at(&current_line, self.column) == CHR_VAL_DELIM {
                            value.push(CHR_VAL_DELIM);
                            self.column += 1;
                            break;
                        }
                    }
                }

                CHR_END_CEXPR => {
                    self.column += 1;

                    if attrib.is_empty() || oper.is_empty() || value.is_empty() {
                        return Err(self.syntax_error());
                    }

                    let stripped: String =
                        oper.chars().filter(|c| *c != 'f' && *c != 'i').collect();
                    if !OPERS.contains(&stripped.as_str()) {
                        return Err(self.invalid_operator(&oper));
                    }

                    if !self.attributes.contains_key(&attrib) && !self.ignore_unknown {
                        return Err(self.unknown_attribute(&attrib));
                    }

                    let raw = value.replace(CHR_VAL_DELIM, "");
                    let left = self.attribute_value(&attrib);

                    // Coercion failures compare as zero, like the attribute
                    // being absent
                    return Ok(if let Some(op) = oper.strip_suffix('f') {
                        compare(
                            left.parse::<f64>().unwrap_or(0.0),
                            raw.parse::<f64>().unwrap_or(0.0),
                            op,
                        )
                    } else if let Some(op) = oper.strip_suffix('i') {
                        compare(
                            left.parse::<i64>().unwrap_or(0),
                            raw.parse::<i64>().unwrap_or(0),
                            op,
                        )
                    } else {
                        compare(left, raw.as_str(), &oper)
                    });
                }

                // Anything else must be an operator character, between the
                // attribute and the value
                _ => {
                    if attrib.is_empty() || !value.is_empty() || !VALID_OPER_CHRS.contains(chr) {
                        return Err(self.syntax_error());
                    }
                    if oper.len() == 3 {
                        // Operators max out at three characters (e.g. `>=i`)
                        oper.push(chr);
                        return Err(self.invalid_operator(&oper));
                    }
                    oper.push(chr);
                    self.column += 1;
                }
            }
        }
    }
}

/// Folds one operand into the running truth value through the binary token
/// (current or pending) that preceded it.
fn fold(expr_is_true: bool, operand: bool, cond: &str, prev_cond: &str) -> bool {
    if cond == TOKEN_AND || prev_cond == TOKEN_AND {
        expr_is_true && operand
    } else if cond == TOKEN_OR || prev_cond == TOKEN_OR {
        expr_is_true || operand
    } else {
        operand
    }
}
