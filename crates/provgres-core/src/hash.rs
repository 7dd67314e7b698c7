//! DJB2 string hashing.
//!
//! Query ids, view names and dedup keys are all derived from this hash, so
//! its output must be stable across calls and always non-negative (the values
//! end up embedded in SQL as bare integer literals).

/// DJB2-variant hash: `h = h * 33 ^ byte`, seeded with 5381, wrapping.
///
/// The result is forced non-negative; `i64::MIN` (which has no absolute
/// value) maps to zero.
pub fn djb2(s: &str) -> i64 {
    let mut hash: i64 = 5381;
    for byte in s.bytes() {
        hash = (hash.wrapping_shl(5).wrapping_add(hash)) ^ i64::from(byte);
    }
    hash.checked_abs().unwrap_or(0)
}
