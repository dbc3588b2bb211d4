//! Recurring phrase discovery over a free-text prompt corpus.

use std::collections::{BTreeMap, HashMap};

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

mod ngram;
mod normalize;
mod parser;

pub use ngram::{StopWords, StopwordLanguage, extract_ngrams};
pub use normalize::{normalize, tokenize};
pub use parser::parse_prompts;

const MAX_EXAMPLES: usize = 3;

/// Largest supported n-gram order.
pub const MAX_NGRAM: usize = 10;

#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    pub min_n: usize,
    pub max_n: usize,
    pub min_count: u64,
    pub remove_stopwords: bool,
    pub limit: usize,
    pub stopwords: StopWords,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            min_n: 1,
            max_n: 3,
            min_count: 2,
            remove_stopwords: false,
            limit: 500,
            stopwords: StopWords::default(),
        }
    }
}

/// One ranked phrase. `ngram` is the window size, or 0 for a whole prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhraseEntry {
    pub phrase: String,
    pub count: u64,
    pub examples: Vec<String>,
    pub ngram: usize,
}

/// Rankings keyed by n-gram order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NgramRankings(pub BTreeMap<usize, Vec<PhraseEntry>>);

impl NgramRankings {
    pub fn get(&self, n: usize) -> Option<&[PhraseEntry]> {
        self.0.get(&n).map(Vec::as_slice)
    }
}

impl Serialize for NgramRankings {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (n, entries) in &self.0 {
            map.serialize_entry(&n.to_string(), entries)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResult {
    pub total_prompts: usize,
    pub canonical: Vec<PhraseEntry>,
    pub ngrams: NgramRankings,
}

/// Insertion-ordered phrase counter.
#[derive(Default)]
struct PhraseCounter {
    ngram: usize,
    entries: Vec<PhraseEntry>,
    index: HashMap<String, usize>,
}

impl PhraseCounter {
    fn new(ngram: usize) -> Self {
        Self {
            ngram,
            ..Self::default()
        }
    }

    fn add(&mut self, phrase: String, raw: &str) {
        let slot = match self.index.get(&phrase) {
            Some(&slot) => slot,
            None => {
                let slot = self.entries.len();
                self.index.insert(phrase.clone(), slot);
                self.entries.push(PhraseEntry {
                    phrase,
                    count: 0,
                    examples: Vec::new(),
                    ngram: self.ngram,
                });
                slot
            }
        };

        let entry = &mut self.entries[slot];
        entry.count += 1;
        if entry.examples.len() < MAX_EXAMPLES && !entry.examples.iter().any(|e| e == raw) {
            entry.examples.push(raw.to_string());
        }
    }

    fn rank(mut self, min_count: u64, limit: usize) -> Vec<PhraseEntry> {
        // sort_by is stable: ties keep first-insertion order.
        self.entries.sort_by(|a, b| b.count.cmp(&a.count));
        self.entries
            .into_iter()
            .filter(|entry| entry.count >= min_count)
            .take(limit)
            .collect()
    }
}

/// Count whole-prompt and n-gram phrases across `prompts` and rank them.
///
/// Orders are limited to `1..=MAX_NGRAM`.
pub fn analyze<S: AsRef<str>>(prompts: &[S], options: &AnalyzeOptions) -> AnalyzeResult {
    let min_n = options.min_n.max(1);
    let max_n = options.max_n.min(MAX_NGRAM);
    let stopwords = options.remove_stopwords.then_some(&options.stopwords);

    let mut canonical = PhraseCounter::new(0);
    let mut counters: BTreeMap<usize, PhraseCounter> =
        (min_n..=max_n).map(|n| (n, PhraseCounter::new(n))).collect();

    for raw in prompts {
        let raw = raw.as_ref();
        let normalized = normalize(raw);
        if normalized.is_empty() {
            continue;
        }
        let tokens = tokenize(&normalized);

        for (&n, counter) in counters.iter_mut() {
            for phrase in extract_ngrams(&tokens, n, stopwords) {
                counter.add(phrase, raw);
            }
        }
        canonical.add(normalized, raw);
    }

    let ngrams = counters
        .into_iter()
        .map(|(n, counter)| (n, counter.rank(options.min_count, options.limit)))
        .collect();

    let result = AnalyzeResult {
        total_prompts: prompts.len(),
        canonical: canonical.rank(options.min_count, options.limit),
        ngrams: NgramRankings(ngrams),
    };
    tracing::debug!(
        prompts = result.total_prompts,
        canonical = result.canonical.len(),
        "analyzed prompt corpus"
    );
    result
}
