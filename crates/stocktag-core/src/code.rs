//! # Code Generation & Scan Normalization
//!
//! Pure helpers for the code registry and the scan validator.
//!
//! ## Two Concerns
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  1. Candidate generation (registry side)                            │
//! │                                                                     │
//! │     candidate() ──► "3f2a9c..." (32 hex chars, 122 bits entropy)    │
//! │                                                                     │
//! │     The registry INSERTs the candidate into the codes table; a      │
//! │     UNIQUE violation means "collision, draw again". Uniqueness is   │
//! │     enforced by the store, never by a pre-check.                    │
//! │                                                                     │
//! │  2. Scan input normalization (validator side)                       │
//! │                                                                     │
//! │     Cameras and capture apps deliver codes with URL encoding or     │
//! │     trailing path/query junk. scan_candidates() expands the raw     │
//! │     input into the ordered list of variants to look up:             │
//! │                                                                     │
//! │     "ab%2Fcd/extra?x=1"                                             │
//! │        ├── "ab%2Fcd/extra?x=1"   (raw, trimmed)                     │
//! │        ├── "ab/cd/extra?x=1"     (percent-decoded)                  │
//! │        └── "ab%2Fcd"             (trailing fragments stripped)      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use uuid::Uuid;

/// Returns a fresh random code candidate.
///
/// Uuid v4 in simple format: 32 lowercase hex characters, fixed length,
/// high entropy. The candidate is only a *candidate* until the registry's
/// insert succeeds.
pub fn candidate() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Expands raw scan input into the ordered list of code variants to try.
///
/// Matching tolerates minor encoding damage before concluding no match:
/// 1. the raw input, trimmed
/// 2. percent-decoded once (if it differs)
/// 3. percent-decoded twice (double-encoded input)
/// 4. trailing path/query/fragment components stripped
///
/// Variants are de-duplicated, original order preserved. The first variant
/// that matches a stored code wins.
pub fn scan_candidates(raw: &str) -> Vec<String> {
    let raw = raw.trim();
    let mut candidates: Vec<String> = vec![raw.to_string()];

    let decoded = percent_decode(raw);
    if decoded != raw {
        candidates.push(decoded.clone());
    }

    // At most two decode passes.
    let double_decoded = percent_decode(&decoded);
    if double_decoded != decoded && !candidates.contains(&double_decoded) {
        candidates.push(double_decoded);
    }

    let stripped = strip_trailing(raw);
    if !candidates.iter().any(|c| c == stripped) {
        candidates.push(stripped.to_string());
    }

    candidates
}

/// Decodes `%XX` escape sequences; malformed sequences pass through as-is.
fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hi = hex_value(bytes[i + 1]);
            let lo = hex_value(bytes[i + 2]);
            if let (Some(hi), Some(lo)) = (hi, lo) {
                out.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Strips everything from the first `/`, `?` or `#` onward.
fn strip_trailing(input: &str) -> &str {
    let end = input
        .find(['/', '?', '#'])
        .unwrap_or(input.len());
    &input[..end]
}

// =============================================================================
// Unit Tests
// =============================================================================
