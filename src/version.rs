//! Target version handling for the downstream database.
//!
//! Templates can branch on the version they are being expanded for, exposed
//! as the implicit `pgsql-version` attribute. Versions below the supported
//! floor are rejected; versions above the default (and unparseable ones)
//! silently clamp to the default.

use crate::error::{Error, Result};

/// Name of the implicit attribute carrying the target version.
pub const VERSION_ATTRIBUTE: &str = "pgsql-version";

/// Oldest target version the schema catalog still supports.
pub const MINIMUM_VERSION: &str = "9.0";

/// Default (and newest supported) target version.
pub const DEFAULT_VERSION: &str = "10.0";

/// Collapses a dotted version into a comparable number, `9.6` -> `96`.
/// Unparseable input collapses to zero.
fn version_code(version: &str) -> u32 {
    version.replace('.', "").parse().unwrap_or(0)
}

/// Validates a target version string and returns the version to record.
///
/// # Errors
/// * `Error::InvalidTargetVersion` if the version parses below the floor
pub fn validate(version: &str) -> Result<String> {
    let code = version_code(version);

    if code != 0 && code < version_code(MINIMUM_VERSION) {
        return Err(Error::InvalidTargetVersion {
            version: version.to_string(),
            minimum: MINIMUM_VERSION.to_string(),
            maximum: DEFAULT_VERSION.to_string(),
        });
    }

    if code > 0 && code <= version_code(DEFAULT_VERSION) {
        Ok(version.to_string())
    } else {
        Ok(DEFAULT_VERSION.to_string())
    }
}
