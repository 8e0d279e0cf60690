use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use url::Url;

use crate::config::Config;
use crate::simhash::{simhash, SimHashIndex};

/// Guards all per-page index state behind a single lock: the visited
/// set, the SimHash buckets, the unique-page set, per-page word
/// counts, and the global token histogram. A lookup-then-insert
/// against the SimHash buckets must be atomic with admission into
/// `unique_pages`, so these live together rather than behind separate
/// locks.
pub struct PageIndex {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    simhash: SimHashIndex,
    visited_urls: HashSet<String>,
    unique_pages: Vec<String>,
    unique_pages_set: HashSet<String>,
    page_word_counts: HashMap<String, usize>,
    token_counts: HashMap<String, u64>,
}

impl Default for PageIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl PageIndex {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Builds an index whose SimHash banding follows `cfg`'s
    /// `simhash_bands`/`simhash_bits`/`duplicate_threshold` instead of
    /// the hardcoded 4/64/0.95 defaults `new()` uses.
    pub fn with_config(cfg: &Config) -> Self {
        Self {
            inner: Mutex::new(Inner {
                simhash: SimHashIndex::with_params(
                    cfg.simhash_bands,
                    cfg.simhash_bits,
                    cfg.duplicate_threshold,
                ),
                ..Inner::default()
            }),
        }
    }

    /// Marks `url` visited, returning true iff it had not been seen
    /// before. Corresponds to content-pipeline step 1.
    pub fn mark_visited(&self, url: &str) -> bool {
        self.inner
            .lock()
            .expect("index lock poisoned")
            .visited_urls
            .insert(url.to_string())
    }

    /// Records the raw word count for a page, regardless of whether it
    /// is later admitted as unique. Corresponds to step 6.
    pub fn record_word_count(&self, url: &str, count: usize) {
        self.inner
            .lock()
            .expect("index lock poisoned")
            .page_word_counts
            .entry(url.to_string())
            .or_insert(count);
    }

    /// Atomically checks the SimHash index for a near-duplicate of
    /// `fingerprint`; if none is found, stores it, admits `url` into
    /// `unique_pages`, and folds `tokens` into the global histogram.
    /// Returns true iff the page was admitted (i.e. was not a
    /// near-duplicate). Corresponds to step 8.
    pub fn admit_if_unique(&self, url: &str, fingerprint: u64, tokens: &[String]) -> bool {
        let mut inner = self.inner.lock().expect("index lock poisoned");
        if inner.simhash.is_near_duplicate(fingerprint) {
            return false;
        }
        inner.simhash.store(fingerprint);
        if inner.unique_pages_set.insert(url.to_string()) {
            inner.unique_pages.push(url.to_string());
        }
        for token in tokens {
            *inner.token_counts.entry(token.clone()).or_insert(0) += 1;
        }
        true
    }

    pub fn unique_page_count(&self) -> usize {
        self.inner.lock().expect("index lock poisoned").unique_pages.len()
    }

    /// Longest page by raw word count, ties broken by first insertion
    /// into `unique_pages`.
    pub fn longest_page(&self) -> Option<(String, usize)> {
        let inner = self.inner.lock().expect("index lock poisoned");
        inner
            .unique_pages
            .iter()
            .filter_map(|url| inner.page_word_counts.get(url).map(|&n| (url.clone(), n)))
            .max_by_key(|(_, n)| *n)
    }

    /// Top `n` tokens by count, ties broken lexicographically
    /// ascending.
    pub fn top_tokens(&self, n: usize) -> Vec<(String, u64)> {
        let inner = self.inner.lock().expect("index lock poisoned");
        let mut entries: Vec<(String, u64)> = inner
            .token_counts
            .iter()
            .map(|(t, c)| (t.clone(), *c))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        entries.truncate(n);
        entries
    }

    /// Per-subdomain page counts over `unique_pages`, restricted to
    /// hosts ending in `.uci.edu`, sorted ascending by host.
    pub fn subdomain_histogram(&self) -> Vec<(String, usize)> {
        let inner = self.inner.lock().expect("index lock poisoned");
        let mut counts: HashMap<String, usize> = HashMap::new();
        for url in &inner.unique_pages {
            if let Some(host) = Url::parse(url).ok().and_then(|u| u.host_str().map(str::to_lowercase)) {
                if host.ends_with(".uci.edu") {
                    *counts.entry(host).or_insert(0) += 1;
                }
            }
        }
        let mut hist: Vec<(String, usize)> = counts.into_iter().collect();
        hist.sort_by(|a, b| a.0.cmp(&b.0));
        hist
    }
}

/// Convenience re-export so callers needn't import `simhash` directly
/// just to compute a fingerprint before calling `admit_if_unique`.
pub fn fingerprint_of(tokens: &[String]) -> u64 {
    simhash(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_first_page_rejects_near_duplicate() {
        let index = PageIndex::new();
        let tokens = vec!["alpha".to_string(), "beta".to_string(), "gamma".to_string()];
        let f = fingerprint_of(&tokens);

        assert!(index.admit_if_unique("http://www.ics.uci.edu/p1", f, &tokens));
        assert!(!index.admit_if_unique("http://www.ics.uci.edu/p2", f, &tokens));
        assert_eq!(index.unique_page_count(), 1);
    }

    #[test]
    fn with_config_honors_tighter_duplicate_threshold() {
        let mut cfg = Config::for_tests(std::path::PathBuf::from("/tmp/unused"), vec![]);
        cfg.duplicate_threshold = 0.99; // max distance 0 at 64 bits: only exact matches dedup
        let index = PageIndex::with_config(&cfg);
        let tokens = vec!["alpha".to_string(), "beta".to_string()];
        let f = fingerprint_of(&tokens);

        assert!(index.admit_if_unique("http://www.ics.uci.edu/p1", f, &tokens));
        // A near (but not identical) fingerprint is no longer rejected
        // under the tighter threshold.
        assert!(index.admit_if_unique("http://www.ics.uci.edu/p2", f ^ 1, &tokens));
        assert_eq!(index.unique_page_count(), 2);
    }

    #[test]
    fn mark_visited_is_once_only() {
        let index = PageIndex::new();
        assert!(index.mark_visited("http://www.ics.uci.edu/a"));
        assert!(!index.mark_visited("http://www.ics.uci.edu/a"));
    }

    #[test]
    fn longest_page_ties_break_by_first_insertion() {
        let index = PageIndex::new();
        let t1 = vec!["x".to_string()];
        let t2 = vec!["y".to_string()];
        index.record_word_count("http://www.ics.uci.edu/a", 100);
        index.record_word_count("http://www.ics.uci.edu/b", 100);
        index.admit_if_unique("http://www.ics.uci.edu/a", fingerprint_of(&t1), &t1);
        index.admit_if_unique("http://www.ics.uci.edu/b", fingerprint_of(&t2), &t2);

        let (longest, words) = index.longest_page().unwrap();
        assert_eq!(longest, "http://www.ics.uci.edu/a");
        assert_eq!(words, 100);
    }

    #[test]
    fn top_tokens_tie_break_lexicographically() {
        let index = PageIndex::new();
        let tokens = vec![
            "stem_x".to_string(),
            "stem_x".to_string(),
            "stem_y".to_string(),
            "stem_y".to_string(),
            "stem_a".to_string(),
        ];
        index.admit_if_unique("http://www.ics.uci.edu/a", fingerprint_of(&tokens), &tokens);

        let top = index.top_tokens(50);
        assert_eq!(top[0].0, "stem_x");
        assert_eq!(top[1].0, "stem_y");
        assert_eq!(top[2].0, "stem_a");
    }

    #[test]
    fn subdomain_histogram_sorted_ascending() {
        let index = PageIndex::new();
        for (url, toks) in [
            ("http://z.ics.uci.edu/", vec!["a".to_string()]),
            ("http://a.cs.uci.edu/", vec!["b".to_string()]),
            ("http://example.com/", vec!["c".to_string()]),
        ] {
            index.admit_if_unique(url, fingerprint_of(&toks), &toks);
        }
        let hist = index.subdomain_histogram();
        assert_eq!(
            hist,
            vec![
                ("a.cs.uci.edu".to_string(), 1),
                ("z.ics.uci.edu".to_string(), 1),
            ]
        );
    }
}
