use crate::config::Config;
use crate::fetcher::Response;
use crate::index::PageIndex;
use crate::normalize::defragment;
use crate::parser::parse_html;
use crate::simhash::simhash;
use crate::text::{parse_text, raw_word_count, whitespace_word_count};

/// Runs one fetched response through the content pipeline: dedup by
/// URL and by SimHash, boilerplate stripping, tokenization, and
/// statistics accumulation. Returns the outbound links discovered on
/// the page — unfiltered, since admission (`is_valid`) is the caller's
/// job.
pub fn process(url: &str, response: &Response, index: &PageIndex, cfg: &Config) -> Vec<String> {
    let defrag_url = defragment(url);

    if !index.mark_visited(&defrag_url) {
        return Vec::new();
    }

    if response.status != 200 {
        return Vec::new();
    }
    let Some(raw) = response.raw_response.as_ref() else {
        return Vec::new();
    };

    if raw.content.len() as u64 > cfg.max_content_bytes {
        return Vec::new();
    }

    let text_source = String::from_utf8_lossy(&raw.content);
    let parsed = parse_html(&text_source, &raw.url);

    let raw_words = raw_word_count(&parsed.text);
    index.record_word_count(&defrag_url, raw_words);
    if whitespace_word_count(&parsed.text) < cfg.min_page_words {
        return Vec::new();
    }

    let tokens = parse_text(&parsed.text);
    let fingerprint = simhash(&tokens);
    if !index.admit_if_unique(&defrag_url, fingerprint, &tokens) {
        return Vec::new();
    }

    parsed.links
}
