use thiserror::Error;

/// Errors surfaced by the crawler core. Transient per-page problems
/// (bad status, oversize body, malformed link) are handled inline by
/// the content pipeline and never reach this type; only conditions
/// that should abort a run or a single operation do.
#[derive(Debug, Error)]
pub enum CrawlerError {
    #[error("save file error: {0}")]
    SaveFile(#[from] rocksdb::Error),

    #[error("failed to (de)serialize seen record: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("failed to parse url {url:?}: {source}")]
    UrlParse {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("config error: {0}")]
    Config(String),
}

/// Errors from the `Fetcher` collaborator, carried in `Response::error`
/// rather than returned from `Fetcher::fetch` (the fetch always
/// produces a `Response`, per the fetcher contract). Not convertible
/// into `CrawlerError`: a fetch failure is a per-page outcome the
/// content pipeline skips over, never a condition that aborts a run.
/// The crawler core never retries these; the fetcher owns
/// transport-level retry per the non-goals.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("http status {0}")]
    HttpError(u16),

    #[error("unexpected content type: {0}")]
    InvalidContentType(String),

    #[error("response too large: {0} bytes")]
    TooLarge(u64),

    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),
}
