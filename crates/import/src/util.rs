/// Canonical form used on both sides of a keyword comparison: lower-cased, with
/// everything except ASCII word characters and whitespace removed, and runs of
/// whitespace collapsed to a single space.
pub fn normalize(s: &str) -> String {
    let kept: String = s
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}
