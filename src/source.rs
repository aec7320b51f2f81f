//! Source buffer loading for schema templates.
//! Turns raw template text into the line buffer walked by the parser,
//! stripping comments while keeping enough bookkeeping to report error
//! positions against the original file.

use crate::error::{Error, Result};
use crate::lexer::CHR_LINE_END;
use log::debug;
use std::fs;
use std::path::Path;

/// Comment marker: everything from `#` to the end of the line is discarded.
pub const CHR_COMMENT: char = '#';

/// Origin label used for buffers loaded from memory instead of a file.
pub const MEMORY_BUFFER: &str = "[memory buffer]";

/// A loaded schema template, split into lines ready for scanning.
///
/// Each buffered line is non-empty and terminated by a single `\n`. Lines
/// that are entirely comments are dropped from the buffer but counted, so
/// that `line + comment_count + 1` recovers the 1-based line number of the
/// original file. Originally-empty lines are kept as a bare `"\n"` for the
/// same reason.
#[derive(Debug, Default, Clone)]
pub struct SourceBuffer {
    lines: Vec<String>,
    comment_count: usize,
    source: String,
}

impl SourceBuffer {
    /// Builds a buffer from in-memory template text.
    ///
    /// # Arguments
    /// * `text` - Template text, UTF-8, any line-ending convention
    /// * `source` - Origin label used in diagnostics
    pub fn from_text(text: &str, source: &str) -> Self {
        let mut lines = Vec::new();
        let mut comment_count = 0;

        for raw in text.lines() {
            let mut lin = raw.to_string();

            // An empty line survives as a bare line break so that the
            // buffer index still tracks the original line numbering.
            if lin.is_empty() {
                lin.push(CHR_LINE_END);
            }

            if lin.trim_start().starts_with(CHR_COMMENT) {
                comment_count += 1;
                continue;
            }

            if let Some(pos) = lin.find(CHR_COMMENT) {
                lin.truncate(pos);
            }

            if !lin.is_empty() {
                if !lin.ends_with(CHR_LINE_END) {
                    lin.push(CHR_LINE_END);
                }
                lines.push(lin);
            }
        }

        debug!(
            "Loaded {} line(s) from '{}' ({} comment line(s) stripped).",
            lines.len(),
            source,
            comment_count
        );

        SourceBuffer {
            lines,
            comment_count,
            source: source.to_string(),
        }
    }

    /// Builds a buffer by reading a schema file.
    ///
    /// # Errors
    /// * `Error::FileNotAccessible` if the file cannot be read
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| Error::FileNotAccessible {
            path: path.display().to_string(),
            source: e,
        })?;

        Ok(Self::from_text(&text, &path.display().to_string()))
    }

    /// Returns the buffered line at `index`.
    pub fn line(&self, index: usize) -> &str {
        &self.lines[index]
    }

    /// Returns all buffered lines.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Number of buffered lines.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Number of fully-commented lines stripped during loading.
    pub fn comment_count(&self) -> usize {
        self.comment_count
    }

    /// Origin label of the buffer (file path or `[memory buffer]`).
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
