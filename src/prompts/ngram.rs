use std::collections::HashSet;

use phf::phf_set;
use serde::{Deserialize, Serialize};

static SWEDISH: phf::Set<&'static str> = phf_set! {
    "och", "i", "att", "det", "en", "är", "som", "på", "för", "med", "av", "till",
};

static ENGLISH: phf::Set<&'static str> = phf_set! {
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "in", "is",
    "it", "of", "on", "or", "that", "the", "this", "to", "was", "with",
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopwordLanguage {
    #[default]
    #[serde(rename = "sv")]
    Swedish,
    #[serde(rename = "en")]
    English,
}

/// Function words that do not make a phrase on their own.
#[derive(Debug, Clone, Default)]
pub struct StopWords {
    language: StopwordLanguage,
    extra: HashSet<String>,
}

impl StopWords {
    pub fn new(language: StopwordLanguage) -> Self {
        Self {
            language,
            extra: HashSet::new(),
        }
    }

    /// Add words on top of the built-in list. Words are lowercased.
    pub fn with_extra<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extra
            .extend(words.into_iter().map(|w| w.as_ref().trim().to_lowercase()));
        self
    }

    pub fn contains(&self, word: &str) -> bool {
        let builtin = match self.language {
            StopwordLanguage::Swedish => &SWEDISH,
            StopwordLanguage::English => &ENGLISH,
        };
        builtin.contains(word) || self.extra.contains(word)
    }
}

/// Every window of `n` consecutive tokens, joined by single spaces.
///
/// With `stopwords`, a window is dropped only when all of its tokens are stop words.
pub fn extract_ngrams(tokens: &[&str], n: usize, stopwords: Option<&StopWords>) -> Vec<String> {
    if n == 0 || tokens.len() < n {
        return Vec::new();
    }

    tokens
        .windows(n)
        .filter(|window| match stopwords {
            Some(stopwords) => !window.iter().all(|token| stopwords.contains(token)),
            None => true,
        })
        .map(|window| window.join(" "))
        .collect()
}
