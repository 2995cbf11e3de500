/// Rough token count for reporting: a quarter of the character count, never
/// below one for non-empty text.
pub fn estimate_tokens(text: &str) -> u64 {
    if text.is_empty() {
        return 0;
    }
    let chars = text.chars().count() as u64;
    (chars / 4).max(1)
}
