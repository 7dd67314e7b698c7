//! Statement classification by leading keyword.

/// The statement families the provenance layer knows how to rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    /// Escape hatch: the caller asked for the rest of the statement to be
    /// forwarded with no provenance machinery at all.
    Bypass,
}

/// Lead keywords in match order. Multi-word keywords must match with exactly
/// one space, as they always have.
const LEAD_KEYWORDS: [(&str, StatementKind); 5] = [
    ("select", StatementKind::Select),
    ("insert into", StatementKind::Insert),
    ("update", StatementKind::Update),
    ("delete from", StatementKind::Delete),
    ("bypass", StatementKind::Bypass),
];

/// Classify a statement by its leading keyword.
///
/// The keyword must be followed by a whitespace separator (or end the
/// statement); `SELECTION ...` is not a SELECT. Returns the kind and the body
/// just past the keyword and one separator character, or `None` when no
/// keyword matches, in which case the caller forwards the statement
/// untouched.
pub fn classify(sql: &str) -> Option<(StatementKind, &str)> {
    for (keyword, kind) in LEAD_KEYWORDS {
        let Some(head) = sql.get(..keyword.len()) else {
            continue;
        };
        if !head.eq_ignore_ascii_case(keyword) {
            continue;
        }
        let rest = &sql[keyword.len()..];
        match rest.as_bytes().first() {
            None => return Some((kind, rest)),
            Some(b) if b.is_ascii_whitespace() => return Some((kind, &rest[1..])),
            Some(_) => continue,
        }
    }
    None
}
