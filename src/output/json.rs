//! JSON serialization for force-curve fits.

use crate::result::ForceFit;

/// Serialize a ForceFit to a compact JSON string.
///
/// # Errors
///
/// Returns an error if serialization fails. Non-finite floats (e.g. an
/// infinite objective in a start record) serialize as `null`.
pub fn to_json(fit: &ForceFit) -> Result<String, serde_json::Error> {
    serde_json::to_string(fit)
}

/// Serialize a ForceFit to a pretty-printed JSON string.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_json_pretty(fit: &ForceFit) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(fit)
}
