//! Input fingerprinting for idempotent-rebuild auditing.

use sha2::{Digest, Sha256};

use crate::services::timeline::DayInputs;

/// Calculate the SHA-256 fingerprint of a day's normalized inputs.
///
/// # Arguments
/// * `inputs` - The complete input bundle for one technician-day
///
/// # Returns
/// Hexadecimal string representation of the SHA-256 hash over the canonical
/// JSON serialization. Identical inputs always yield identical fingerprints,
/// so a stored timeline whose fingerprint matches a fresh sync's inputs is
/// already current.
pub fn day_input_fingerprint(inputs: &DayInputs) -> String {
    match serde_json::to_vec(inputs) {
        Ok(bytes) => fingerprint_bytes(&bytes),
        Err(err) => {
            // Only reachable with non-finite floats in feed data; fall back
            // to the debug rendering so the fingerprint stays total and
            // deterministic.
            log::warn!("falling back to debug fingerprint: {err}");
            fingerprint_bytes(format!("{inputs:?}").as_bytes())
        }
    }
}

fn fingerprint_bytes(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    let result = hasher.finalize();
    hex::encode(result)
}
