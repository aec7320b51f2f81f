//! Schema file resolution and artifact post-processing.
//!
//! Schema templates live in a catalog directory laid out by artifact kind:
//! `<root>/sql/<name>.sch` for SQL definitions and `<root>/xml/<name>.sch`
//! for XML ones. XML expansions are post-processed through an entity
//! escaper so attribute values stay well-formed.

use crate::error::Result;
use crate::parser::{AttributeMap, SchemaParser};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

/// Extension shared by all schema template files.
pub const SCHEMA_EXT: &str = ".sch";

/// Catalog subdirectory holding SQL schema templates.
pub const SQL_SCHEMA_DIR: &str = "sql";

/// Catalog subdirectory holding XML schema templates.
pub const XML_SCHEMA_DIR: &str = "xml";

/// Kind of artifact a schema template expands to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    Sql,
    Xml,
}

impl SchemaKind {
    /// Catalog subdirectory for this kind.
    pub fn dir_name(&self) -> &'static str {
        match self {
            SchemaKind::Sql => SQL_SCHEMA_DIR,
            SchemaKind::Xml => XML_SCHEMA_DIR,
        }
    }
}

/// Resolves the schema file for an object by naming convention:
/// `<root>/<kind_dir>/<obj_name>.sch`.
pub fn schema_file_path(root: &Path, kind: SchemaKind, obj_name: &str) -> PathBuf {
    root.join(kind.dir_name())
        .join(format!("{}{}", obj_name, SCHEMA_EXT))
}

/// Post-processor applied to expanded artifacts before they are handed
/// back to the caller.
pub trait EntityEscaper {
    /// Returns the escaped form of `buf`.
    fn escape(&self, buf: &str) -> String;
}

/// Escapes `&`, `<`, `>` and `"` inside XML attribute values, leaving XML
/// headers and comment blocks untouched. Values already carrying entities
/// keep their `&` characters as-is.
pub struct XmlEntityEscaper;

/// Matches an attribute name up to the opening quote of its value.
static ATTR_REGEXP: Lazy<Regex> = Lazy::new(|| Regex::new(r#"([a-z]+|-)+ *=""#).unwrap());

/// Matches the gap between a closing quote and the next attribute.
static NEXT_ATTR_REGEXP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""[ \t]+([a-z]+|-)+ *=""#).unwrap());

impl EntityEscaper for XmlEntityEscaper {
    fn escape(&self, buf: &str) -> String {
        let mut out = String::new();
        let mut in_comment = false;

        for line in buf.lines() {
            let xml_header = line.contains("<?xml");

            if !in_comment {
                in_comment = line.contains("<!--");
            } else if line.contains("-->") {
                in_comment = false;
            }

            if line.is_empty() || xml_header || in_comment {
                out.push_str(line);
            } else {
                out.push_str(&escape_attribute_values(line));
            }
            out.push('\n');
        }

        out
    }
}

/// Escapes the attribute values of one line. Value boundaries cannot be
/// found by scanning for the next quote alone (the values being escaped may
/// contain raw quotes), so each value is taken to run from its opening
/// quote to the start of the next attribute, or to the line's last quote.
fn escape_attribute_values(line: &str) -> String {
    let mut lin = line.to_string();
    let mut search_from = 0;

    while search_from < lin.len() {
        let Some(found) = ATTR_REGEXP.find_at(&lin, search_from) else {
            break;
        };
        let value_start = found.end();

        let value_end = match NEXT_ATTR_REGEXP.find_at(&lin, value_start) {
            Some(next) => next.start(),
            None => lin.rfind('"').unwrap_or(value_start),
        };

        if value_end <= value_start {
            search_from = value_start;
            continue;
        }

        let trimmed = lin[value_start..value_end].trim().to_string();

        if trimmed.contains(&['&', '<', '>', '"'][..]) {
            let escaped = escape_value(&trimmed);
            lin.replace_range(value_start..value_end, &escaped);
            search_from = value_start + escaped.len() + 1;
        } else {
            search_from = value_start + trimmed.len() + 1;
        }
    }

    lin
}

fn escape_value(value: &str) -> String {
    let mut value = value.to_string();

    // A bare & is escaped only when the value carries no entity already
    if !value.contains("&amp;")
        && !value.contains("&lt;")
        && !value.contains("&gt;")
        && !value.contains("&quot;")
        && !value.contains("&apos;")
        && value.contains('&')
    {
        value = value.replace('&', "&amp;");
    }

    value = value.replace('"', "&quot;");
    value = value.replace('<', "&lt;");
    value.replace('>', "&gt;")
}

impl SchemaParser {
    /// Resolves the schema file for `obj_name` by convention, expands it,
    /// and post-processes XML artifacts through [`XmlEntityEscaper`]. The
    /// implicit `pgsql-version` attribute is injected before expansion.
    ///
    /// # Arguments
    /// * `root` - Catalog root directory holding the `sql/` and `xml/` trees
    /// * `obj_name` - Object name, used as the schema file stem
    /// * `attribs` - Attribute environment for the expansion
    /// * `kind` - Artifact kind, selecting the subdirectory and
    ///   post-processing
    ///
    /// # Errors
    /// * `Error::FileNotAccessible` if the resolved file cannot be read,
    ///   plus any template error raised by the expansion
    pub fn expand_object<P: AsRef<Path>>(
        &mut self,
        root: P,
        obj_name: &str,
        attribs: &AttributeMap,
        kind: SchemaKind,
    ) -> Result<String> {
        let path = schema_file_path(root.as_ref(), kind, obj_name);

        debug!(
            "Expanding {:?} definition for object '{}' from '{}'.",
            kind,
            obj_name,
            path.display()
        );

        let code = self.expand_file(&path, attribs)?;

        match kind {
            SchemaKind::Sql => Ok(code),
            SchemaKind::Xml => Ok(XmlEntityEscaper.escape(&code)),
        }
    }
}
