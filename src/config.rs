use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::CrawlerError;

fn default_max_content_bytes() -> u64 {
    2_500_000
}

fn default_min_page_words() -> usize {
    20
}

fn default_duplicate_threshold() -> f64 {
    0.95
}

fn default_simhash_bits() -> u32 {
    64
}

fn default_simhash_bands() -> u32 {
    4
}

fn default_workers() -> usize {
    4
}

/// Crawl configuration, loadable from a TOML file and overridable from
/// the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub save_file: PathBuf,
    pub seed_urls: Vec<String>,
    pub time_delay: f64,

    #[serde(default = "default_max_content_bytes")]
    pub max_content_bytes: u64,

    #[serde(default = "default_min_page_words")]
    pub min_page_words: usize,

    #[serde(default = "default_duplicate_threshold")]
    pub duplicate_threshold: f64,

    #[serde(default = "default_simhash_bits")]
    pub simhash_bits: u32,

    #[serde(default = "default_simhash_bands")]
    pub simhash_bands: u32,

    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Ignore-list substrings applied to lowercased netloc/path/query
    /// by the validator.
    #[serde(default = "default_ignore_list")]
    pub ignore_list: Vec<String>,

    /// Allowed host suffixes. Defaults to the UCI academic subdomains.
    #[serde(default = "default_allowed_suffixes")]
    pub allowed_suffixes: Vec<String>,
}

fn default_ignore_list() -> Vec<String> {
    [
        "mediamanager.php",
        "eppstein/pix",
        "isg.ics.uci.edu/events/",
        "share=facebook",
        "share=twitter",
        "login",
        "redirect",
        "grape.ics.uci.edu/wiki/public/timeline",
        "grape.ics.uci.edu/wiki/asterix/timeline",
        "ical=",
        "fano.ics.uci.edu/ca/rules",
        "week",
        "month",
        "year",
        "calendar",
        "/doku",
        "ngs.ics",
        "action=diff",
        "version=",
        "format=",
        "entry_point",
        "/r.php",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_allowed_suffixes() -> Vec<String> {
    [
        ".ics.uci.edu",
        ".cs.uci.edu",
        ".informatics.uci.edu",
        ".stat.uci.edu",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Config {
    /// Builds a config from the minimal required fields, filling
    /// everything else with the documented defaults. Used by the CLI
    /// when no `--config` file is given.
    pub fn new(save_file: PathBuf, seed_urls: Vec<String>, time_delay: f64) -> Self {
        Self {
            save_file,
            seed_urls,
            time_delay,
            max_content_bytes: default_max_content_bytes(),
            min_page_words: default_min_page_words(),
            duplicate_threshold: default_duplicate_threshold(),
            simhash_bits: default_simhash_bits(),
            simhash_bands: default_simhash_bands(),
            workers: default_workers(),
            ignore_list: default_ignore_list(),
            allowed_suffixes: default_allowed_suffixes(),
        }
    }

    /// Loads a config from a TOML file on disk.
    pub fn from_file(path: &std::path::Path) -> Result<Self, CrawlerError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| CrawlerError::Config(format!("reading {path:?}: {e}")))?;
        toml::from_str(&raw).map_err(|e| CrawlerError::Config(format!("parsing {path:?}: {e}")))
    }

    #[cfg(test)]
    pub fn for_tests(save_file: PathBuf, seed_urls: Vec<String>) -> Self {
        Self::new(save_file, seed_urls, 0.0)
    }
}
