use unicode_normalization::UnicodeNormalization;

/// Normalize a free-text guess for comparison.
///
/// Upper-cases, decomposes (NFD) and keeps letters only, so diacritics,
/// digits, whitespace and punctuation all disappear. Never fails; the worst
/// case is an empty string, which matches no answer.
pub fn canonicalize_answer(text: &str) -> String {
    text.to_uppercase()
        .nfd()
        .filter(|c| c.is_alphabetic())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_strips_case_and_punctuation() {
        assert_eq!(canonicalize_answer("plastic"), "PLASTIC");
        assert_eq!(canonicalize_answer("  Wed-ge! "), "WEDGE");
        assert_eq!(canonicalize_answer("Mr. O'Hare"), "MROHARE");
    }

    #[test]
    fn test_canonicalize_removes_diacritics() {
        assert_eq!(canonicalize_answer("Crème Brûlée"), "CREMEBRULEE");
        assert_eq!(canonicalize_answer("jalapeño"), "JALAPENO");
    }

    #[test]
    fn test_canonicalize_never_fails() {
        assert_eq!(canonicalize_answer(""), "");
        assert_eq!(canonicalize_answer("1234 ?!"), "");
        assert_eq!(canonicalize_answer("🎩"), "");
    }
}
