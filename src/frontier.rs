use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use rocksdb::{BlockBasedOptions, ColumnFamilyDescriptor, Options, DB};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use tokio::sync::{mpsc, Mutex as TokioMutex};
use tokio::time::Instant;
use url::Url;

use crate::config::Config;
use crate::error::CrawlerError;
use crate::normalize::{self, is_valid};

const SEEN_CF: &str = "seen";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SeenRecord {
    url: String,
    completed: bool,
}

fn urlhash(url: &str) -> String {
    let digest = Sha1::digest(url.as_bytes());
    hex::encode(digest)
}

/// Extracts the netloc (host, plus port when one is given) that the
/// politeness clock keys on, per spec.md's glossary. URLs that fail to
/// parse or carry no host get a key derived from the URL itself rather
/// than a shared empty-string bucket, so two unrelated malformed URLs
/// never throttle each other.
fn netloc(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => match parsed.host_str() {
            Some(host) => match parsed.port() {
                Some(port) => format!("{host}:{port}"),
                None => host.to_string(),
            },
            None => format!("no-host:{url}"),
        },
        Err(_) => format!("unparseable:{url}"),
    }
}

/// Persistent, dedup-by-URL work queue with per-domain politeness
/// gating. The `seen` map survives process restarts via rocksdb; the
/// in-memory FIFO queue and domain clock do not.
pub struct Frontier {
    db: Arc<DB>,
    queue_tx: mpsc::UnboundedSender<String>,
    queue_rx: TokioMutex<mpsc::UnboundedReceiver<String>>,
    domain_last_seen: StdMutex<HashMap<String, Instant>>,
    add_lock: StdMutex<()>,
    time_delay: Duration,
}

impl Frontier {
    /// Opens (or creates) the frontier's save file and applies the
    /// startup policy: `restart` wipes any existing save and seeds
    /// from `config.seed_urls`; otherwise the save is loaded and every
    /// incomplete, still-valid URL is re-enqueued, falling back to the
    /// seeds only if the save was empty.
    pub async fn open(config: &Config, restart: bool) -> Result<Self, CrawlerError> {
        if restart && config.save_file.exists() {
            std::fs::remove_dir_all(&config.save_file)
                .map_err(|e| CrawlerError::Config(format!("removing save file: {e}")))?;
        }

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        opts.set_write_buffer_size(64 * 1024 * 1024);
        opts.increase_parallelism(num_cpus::get() as i32);

        let mut block_opts = BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        opts.set_block_based_table_factory(&block_opts);

        let db = DB::open_cf_descriptors(
            &opts,
            &config.save_file,
            vec![ColumnFamilyDescriptor::new(SEEN_CF, opts.clone())],
        )?;

        let (queue_tx, queue_rx) = mpsc::unbounded_channel();

        let frontier = Self {
            db: Arc::new(db),
            queue_tx,
            queue_rx: TokioMutex::new(queue_rx),
            domain_last_seen: StdMutex::new(HashMap::new()),
            add_lock: StdMutex::new(()),
            time_delay: Duration::from_secs_f64(config.time_delay.max(0.0)),
        };

        if restart {
            for seed in &config.seed_urls {
                frontier.add_url(seed).await?;
            }
        } else {
            let (total, tbd) = frontier.load_from_save(config)?;
            log::info!("found {tbd} urls to be downloaded from {total} total urls discovered");
            if total == 0 {
                for seed in &config.seed_urls {
                    frontier.add_url(seed).await?;
                }
            }
        }

        Ok(frontier)
    }

    fn load_from_save(&self, config: &Config) -> Result<(usize, usize), CrawlerError> {
        let mut total = 0;
        let mut tbd = 0;
        let seen_cf = self.db.cf_handle(SEEN_CF).expect("seen column family exists");
        let iter = self.db.iterator_cf(seen_cf, rocksdb::IteratorMode::Start);
        for entry in iter {
            let (_, value) = entry?;
            total += 1;
            let record: SeenRecord = serde_json::from_slice(&value)?;
            if !record.completed && is_valid(&record.url, config) {
                let _ = self.queue_tx.send(record.url);
                tbd += 1;
            }
        }
        Ok((total, tbd))
    }

    /// Normalizes and admits `url` if its urlhash has not been seen
    /// before. Idempotent for already-seen URLs, including completed
    /// ones. Returns true iff the URL was newly admitted.
    pub async fn add_url(&self, url: &str) -> Result<bool, CrawlerError> {
        let normalized =
            normalize::normalize(url).map_err(|source| CrawlerError::UrlParse { url: url.to_string(), source })?;
        let hash = urlhash(&normalized);

        let seen_cf = self.db.cf_handle(SEEN_CF).expect("seen column family exists");
        let _guard = self.add_lock.lock().expect("frontier lock poisoned");
        if self.db.get_cf(seen_cf, hash.as_bytes())?.is_some() {
            return Ok(false);
        }
        let record = SeenRecord {
            url: normalized.clone(),
            completed: false,
        };
        self.db
            .put_cf(seen_cf, hash.as_bytes(), serde_json::to_vec(&record)?)?;
        let _ = self.queue_tx.send(normalized);
        Ok(true)
    }

    /// Marks `url` (after normalization) complete. Logs at error
    /// severity but still upserts the record if no seen-record existed
    /// — completion is never allowed to fail outright.
    pub async fn mark_url_complete(&self, url: &str) -> Result<(), CrawlerError> {
        let normalized =
            normalize::normalize(url).map_err(|source| CrawlerError::UrlParse { url: url.to_string(), source })?;
        let hash = urlhash(&normalized);

        let seen_cf = self.db.cf_handle(SEEN_CF).expect("seen column family exists");
        let _guard = self.add_lock.lock().expect("frontier lock poisoned");
        if self.db.get_cf(seen_cf, hash.as_bytes())?.is_none() {
            log::error!("completed url {normalized}, but have not seen it before");
        }
        let record = SeenRecord {
            url: normalized,
            completed: true,
        };
        self.db
            .put_cf(seen_cf, hash.as_bytes(), serde_json::to_vec(&record)?)?;
        Ok(())
    }

    /// Dequeues the next URL to fetch, enforcing per-domain politeness
    /// delay. Waits up to 10 seconds for a URL to become available;
    /// returns `None` on timeout to signal the worker should retry or
    /// exit.
    pub async fn get_tbd_url(&self) -> Option<String> {
        let url = {
            let mut rx = self.queue_rx.lock().await;
            match tokio::time::timeout(Duration::from_secs(10), rx.recv()).await {
                Ok(Some(url)) => url,
                _ => return None,
            }
        };

        let domain = netloc(&url);

        self.wait_for_domain_turn(&domain).await;
        Some(url)
    }

    async fn wait_for_domain_turn(&self, domain: &str) {
        let now = Instant::now();
        let sleep_needed = {
            let mut clocks = self.domain_last_seen.lock().expect("frontier lock poisoned");
            match clocks.get(domain).copied() {
                Some(last) => {
                    let elapsed = now.saturating_duration_since(last);
                    if elapsed >= self.time_delay {
                        clocks.insert(domain.to_string(), now);
                        None
                    } else {
                        let sleep = self.time_delay - elapsed;
                        // Pre-reserve so a sibling worker racing on the
                        // same domain pushes its own wait further out
                        // instead of waking at the same instant.
                        clocks.insert(domain.to_string(), now + sleep);
                        Some(sleep)
                    }
                }
                None => {
                    clocks.insert(domain.to_string(), now);
                    None
                }
            }
        };

        if let Some(sleep) = sleep_needed {
            tokio::time::sleep(sleep).await;
            let mut clocks = self.domain_last_seen.lock().expect("frontier lock poisoned");
            clocks.insert(domain.to_string(), Instant::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration as StdDuration;

    fn cfg(dir: &tempfile::TempDir, seeds: Vec<String>) -> Config {
        Config::for_tests(dir.path().join("save"), seeds)
    }

    #[tokio::test]
    async fn add_url_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let frontier = Frontier::open(&cfg(&dir, vec![]), true).await.unwrap();
        assert!(frontier.add_url("http://www.ics.uci.edu/a").await.unwrap());
        assert!(!frontier.add_url("http://www.ics.uci.edu/a").await.unwrap());
    }

    #[tokio::test]
    async fn mark_complete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let frontier = Frontier::open(&cfg(&dir, vec![]), true).await.unwrap();
        frontier.add_url("http://www.ics.uci.edu/a").await.unwrap();
        frontier.mark_url_complete("http://www.ics.uci.edu/a").await.unwrap();
        frontier.mark_url_complete("http://www.ics.uci.edu/a").await.unwrap();
    }

    #[tokio::test]
    async fn restart_seeds_fresh_frontier() {
        let dir = tempfile::tempdir().unwrap();
        let seeds = vec!["http://www.ics.uci.edu/".to_string()];
        let frontier = Frontier::open(&cfg(&dir, seeds), true).await.unwrap();
        assert_eq!(frontier.get_tbd_url().await.as_deref(), Some("http://www.ics.uci.edu/"));
    }

    #[tokio::test]
    async fn politeness_delays_second_fetch_to_same_domain() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = cfg(&dir, vec![]);
        config.time_delay = 0.2;
        let frontier = Frontier::open(&config, true).await.unwrap();
        frontier.add_url("http://www.ics.uci.edu/a").await.unwrap();
        frontier.add_url("http://www.ics.uci.edu/b").await.unwrap();

        let start = std::time::Instant::now();
        frontier.get_tbd_url().await.unwrap();
        frontier.get_tbd_url().await.unwrap();
        let elapsed = start.elapsed();
        assert!(elapsed >= StdDuration::from_millis(190), "elapsed={elapsed:?}");
    }

    #[tokio::test]
    async fn restart_false_reloads_only_incomplete_still_valid_urls() {
        let dir = tempfile::tempdir().unwrap();
        let config = cfg(&dir, vec![]);
        {
            let frontier = Frontier::open(&config, true).await.unwrap();
            frontier.add_url("http://www.ics.uci.edu/a").await.unwrap();
            frontier.mark_url_complete("http://www.ics.uci.edu/a").await.unwrap();
            frontier.add_url("http://www.ics.uci.edu/b").await.unwrap();
            // "c" is admitted while valid, then becomes invalid under the
            // current ignore-list (substring "login") by the time of restart.
            frontier.add_url("http://www.ics.uci.edu/login/c").await.unwrap();
        }

        let frontier = Frontier::open(&config, false).await.unwrap();
        assert_eq!(
            frontier.get_tbd_url().await.as_deref(),
            Some("http://www.ics.uci.edu/b")
        );
    }

    #[test]
    fn netloc_distinguishes_ports_on_same_host() {
        let a = netloc("http://www.ics.uci.edu:8080/a");
        let b = netloc("http://www.ics.uci.edu:9090/b");
        let c = netloc("http://www.ics.uci.edu/c");
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(b, c);
    }

    #[test]
    fn netloc_isolates_unparseable_urls_from_each_other() {
        let a = netloc("not a url at all");
        let b = netloc("also not a url");
        assert_ne!(a, b);
    }
}
