use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use academic_crawler::config::Config;
use academic_crawler::fetcher::{Fetcher, HttpFetcher};
use academic_crawler::index::PageIndex;
use academic_crawler::normalize::is_valid;
use academic_crawler::pipeline;
use academic_crawler::report;
use academic_crawler::Frontier;

/// Polite crawler over a bounded set of academic subdomains. The
/// worker loop and CLI here are glue around the crawler core
/// (frontier, content filter, statistics accumulator); fetching and
/// report presentation are intentionally thin.
#[derive(Parser, Debug)]
#[command(name = "academic-crawler")]
struct Cli {
    /// Path to a TOML config file. CLI flags below override its fields.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Wipe the save file and restart from seeds.
    #[arg(long)]
    restart: bool,

    /// Rocksdb save-file directory. Defaults to `crawler_save` when no
    /// `--config` file is given; otherwise overrides the config file's
    /// `save_file` only if passed explicitly.
    #[arg(long)]
    save_file: Option<PathBuf>,

    /// Seed URL (repeatable).
    #[arg(long = "seed")]
    seeds: Vec<String>,

    /// Minimum seconds between requests to the same host. Defaults to
    /// 0.5 when no `--config` file is given; otherwise overrides the
    /// config file's `time_delay` only if passed explicitly.
    #[arg(long)]
    time_delay: Option<f64>,

    /// Number of concurrent worker tasks. Defaults to 4 when no
    /// `--config` file is given; otherwise overrides the config file's
    /// `workers` only if passed explicitly.
    #[arg(long)]
    workers: Option<usize>,

    /// Path to write the crawl report to.
    #[arg(long, default_value = "Logs/crawl_stats.txt")]
    report: PathBuf,
}

fn build_config(cli: &Cli) -> Result<Config, academic_crawler::CrawlerError> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::new(
            cli.save_file.clone().unwrap_or_else(|| PathBuf::from("crawler_save")),
            cli.seeds.clone(),
            cli.time_delay.unwrap_or(0.5),
        ),
    };

    if cli.config.is_some() {
        if !cli.seeds.is_empty() {
            config.seed_urls = cli.seeds.clone();
        }
        if let Some(save_file) = &cli.save_file {
            config.save_file = save_file.clone();
        }
        if let Some(time_delay) = cli.time_delay {
            config.time_delay = time_delay;
        }
        if let Some(workers) = cli.workers {
            config.workers = workers;
        }
    } else {
        config.workers = cli.workers.unwrap_or(4);
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();
    let config = build_config(&cli)?;

    let frontier = Arc::new(Frontier::open(&config, cli.restart).await?);
    let index = Arc::new(PageIndex::with_config(&config));
    let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new()?);

    let mut handles = Vec::new();
    for worker_id in 0..config.workers.max(1) {
        let frontier = frontier.clone();
        let index = index.clone();
        let fetcher = fetcher.clone();
        let config = config.clone();

        handles.push(tokio::spawn(async move {
            loop {
                let Some(url) = frontier.get_tbd_url().await else {
                    log::info!("worker {worker_id} idle timeout, exiting");
                    break;
                };

                log::info!("worker {worker_id} fetching {url}");
                let response = fetcher.fetch(&url).await;
                if let Some(err) = &response.error {
                    log::warn!("fetch failed for {url}: {err}");
                }
                let links = pipeline::process(&url, &response, &index, &config);

                for link in links {
                    if is_valid(&link, &config) {
                        if let Err(e) = frontier.add_url(&link).await {
                            log::error!("failed to enqueue {link}: {e}");
                        }
                    }
                }

                if let Err(e) = frontier.mark_url_complete(&url).await {
                    log::error!("failed to mark {url} complete: {e}");
                }
            }
        }));
    }

    for handle in handles {
        let _ = handle.await;
    }

    report::write_report(&index, &cli.report)?;
    log::info!("crawl stats written to {:?}", cli.report);

    Ok(())
}
