//! Marker-keyword splitting.

/// Case-insensitive substring search, byte-offset result.
///
/// Markers are plain ASCII keywords; a match can therefore never begin in the
/// middle of a multi-byte character, so the returned offset is always a valid
/// slice boundary.
pub(crate) fn find_ci(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle.as_bytes()))
}

/// Split a statement body on an ordered list of marker keywords.
///
/// Returns `markers.len() + 1` output slots. A cursor walks the body; for
/// each marker in order, the next occurrence past the cursor is searched
/// case-insensitively. When found, the text between the cursor and the
/// marker fills the current slot and the cursor advances past the marker;
/// when absent, the slot the marker would have opened stays empty and the
/// cursor does not move, so the following markers keep searching from the
/// same place. Whatever remains after the last marker lands in the slot the
/// cursor stopped at, with a trailing semicolon stripped. All segments are
/// whitespace-trimmed.
///
/// The absent-marker rule is what makes `INSERT INTO t VALUES (1)` put the
/// values list in slot 1 even though the `returning` marker never matched:
/// slots shift with the cursor, not with the marker index.
pub fn split(body: &str, markers: &[&str]) -> Vec<String> {
    let mut slots = vec![String::new(); markers.len() + 1];
    let mut current = 0usize;
    let mut rest = body;

    for (i, marker) in markers.iter().enumerate() {
        if let Some(pos) = find_ci(rest, marker) {
            slots[current] = rest[..pos].trim().to_string();
            rest = &rest[pos + marker.len()..];
            current = i + 1;
        }
    }

    let tail = rest.trim();
    let tail = tail.strip_suffix(';').map(str::trim_end).unwrap_or(tail);
    slots[current] = tail.to_string();
    slots
}
