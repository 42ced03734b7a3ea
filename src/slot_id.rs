use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Width of the hex token. Truncation keeps tokens readable; the residual
/// collision risk at 64 bits is accepted as a known limitation.
const TOKEN_HEX_LEN: usize = 16;

/// Render a time in the one canonical form that feeds the digest: UTC,
/// second precision. Two renderings of the same instant must be identical
/// or independent parties will silently disagree about "the same slot".
pub fn canonical_time(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// Derive the opaque token for a (meeting, time) pair. Pure and
/// deterministic: same inputs, same token, in and across processes.
pub fn identify(meeting_id: &str, time: DateTime<Utc>) -> String {
    let data = format!("{}||{}", meeting_id, canonical_time(time));
    let digest = Sha256::digest(data.as_bytes());
    hex::encode(digest)[..TOKEN_HEX_LEN].to_string()
}

/// Tokenize a whole candidate list. Returns the tokens in first-occurrence
/// order plus the token→time map. Duplicate input times collapse to a single
/// token, which is exactly how independent parties agree on a slot.
pub fn identify_all(
    meeting_id: &str,
    times: &[DateTime<Utc>],
) -> (Vec<String>, HashMap<String, DateTime<Utc>>) {
    let mut ordered = Vec::new();
    let mut mapping = HashMap::new();

    for &time in times {
        let token = identify(meeting_id, time);
        if !mapping.contains_key(&token) {
            ordered.push(token.clone());
            mapping.insert(token, time);
        }
    }

    (ordered, mapping)
}
