use once_cell::sync::Lazy;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};

/// Stopwords dropped from the token stream before stemming, checked
/// against lowercased, punctuation-stripped tokens.
pub const STOPWORDS: &[&str] = &[
    "the", "is", "in", "at", "of", "on", "and", "a", "to", "for", "this", "that", "it", "as",
    "an", "by", "be", "from", "with", "or", "are", "was", "were", "but", "not", "can", "will",
    "has", "have", "had", "so", "if", "then", "when", "while", "which",
];

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").expect("static regex is valid"));
static NON_WORD_OR_SPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s]").expect("static regex is valid"));

/// Raw word count over visible text, computed before stopword removal
/// or stemming. Recorded into `page_word_counts` and used for the
/// longest-page statistic.
pub fn raw_word_count(text: &str) -> usize {
    WORD_RE.find_iter(text).count()
}

/// Whitespace-split word count, used only for the minimum-length
/// admission check. Deliberately distinct from `raw_word_count`: a
/// `\w+` match count and a plain whitespace-split length treat runs of
/// punctuation-only "words" differently, and the two measures aren't
/// interchangeable here.
pub fn whitespace_word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Lowercases, strips everything but word characters and whitespace,
/// splits on whitespace, drops stopwords, and stems what remains with
/// a Porter stemmer. This is the token stream fed to `simhash` and the
/// global token histogram.
pub fn parse_text(text: &str) -> Vec<String> {
    let lowercased = text.to_lowercase();
    let stripped = NON_WORD_OR_SPACE_RE.replace_all(&lowercased, "");
    let stemmer = Stemmer::create(Algorithm::English);

    stripped
        .split_whitespace()
        .filter(|t| !STOPWORDS.contains(t))
        .map(|t| stemmer.stem(t).into_owned())
        .collect()
}
