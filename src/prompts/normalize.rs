use std::sync::LazyLock;

use regex::Regex;

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```[\s\S]*?```").expect("valid code fence regex"));
static INLINE_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`[^`]*`").expect("valid inline code regex"));
static URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)https?://\S+").expect("valid url regex"));
static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\S+@\S+\.\S+").expect("valid email regex"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));
/// Everything except digits, Latin letters (with Latin-1 and Latin Extended-A/B), whitespace, `-` and `+`.
static DISALLOWED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^0-9A-Za-z\x{00C0}-\x{024F}\s\-+]").expect("valid character class regex")
});

/// Canonical form of a prompt for phrase counting.
///
/// Drops code, URLs and e-mail addresses, lowercases, keeps only Latin letters,
/// digits, `-` and `+`, and leaves words separated by single spaces.
pub fn normalize(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let text = CODE_FENCE.replace_all(raw, " ");
    let text = INLINE_CODE.replace_all(&text, " ");
    let text = URL.replace_all(&text, " ");
    let text = EMAIL.replace_all(&text, " ");
    let text = WHITESPACE.replace_all(&text, " ");
    let text = text.trim().to_lowercase();
    let text = DISALLOWED.replace_all(&text, "");
    let text = WHITESPACE.replace_all(&text, " ");
    text.trim().to_string()
}

/// Split normalized text into words.
pub fn tokenize(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}
