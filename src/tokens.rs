//! Length-based token estimate.
//!
//! One token is taken to be four characters (UTF-16 code units, matching how
//! export tooling measures string length). Counts are approximate and will differ
//! from a real BPE tokenizer.

const CHARS_PER_TOKEN: usize = 4;

/// Estimate the number of tokens in `text`: `ceil(len / 4)`, 0 for empty input.
pub fn count_tokens(text: &str) -> u64 {
    if text.is_empty() {
        return 0;
    }
    let len: usize = text.chars().map(char::len_utf16).sum();
    len.div_ceil(CHARS_PER_TOKEN) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_has_no_tokens() {
        assert_eq!(count_tokens(""), 0);
    }

    #[test]
    fn rounds_up_partial_tokens() {
        assert_eq!(count_tokens("a"), 1);
        assert_eq!(count_tokens("abcd"), 1);
        assert_eq!(count_tokens("abcde"), 2);
        assert_eq!(count_tokens(&"x".repeat(400)), 100);
    }

    #[test]
    fn measures_utf16_length() {
        // Astral-plane characters count as two units each.
        assert_eq!(count_tokens("😀😀"), 1);
        assert_eq!(count_tokens("😀😀😀"), 2);
        assert_eq!(count_tokens("åäö"), 1);
    }

    #[test]
    fn monotonic_in_length() {
        let mut previous = 0;
        let mut text = String::new();
        for _ in 0..64 {
            text.push('z');
            let count = count_tokens(&text);
            assert!(count >= previous);
            previous = count;
        }
    }
}
